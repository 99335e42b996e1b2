//! Per-pickup-point write serialization within one process.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

use pvz_core::PickupPointId;

/// Concurrent map from point id to a per-point mutex.
///
/// Entries are created on first use and never removed. Reads do not go
/// through the table; only writers for the same point wait on each other.
#[derive(Debug, Default)]
pub struct LockTable {
    locks: DashMap<PickupPointId, Arc<Mutex<()>>>,
}

/// Held for the duration of one atomic write.
#[derive(Debug)]
pub struct PointWriteGuard {
    _guard: OwnedMutexGuard<()>,
}

impl LockTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn acquire(&self, id: PickupPointId) -> PointWriteGuard {
        // Clone the Arc out so the shard lock is released before awaiting.
        let lock = self
            .locks
            .entry(id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();

        PointWriteGuard {
            _guard: lock.lock_owned().await,
        }
    }

    /// Number of points that have ever been written through this table.
    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn same_point_waits_for_release() {
        let table = Arc::new(LockTable::new());
        let id = PickupPointId::new();

        let first = table.acquire(id).await;

        let contender = {
            let table = table.clone();
            tokio::spawn(async move {
                let _guard = table.acquire(id).await;
            })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!contender.is_finished());

        drop(first);
        tokio::time::timeout(Duration::from_secs(1), contender)
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn different_points_do_not_contend() {
        let table = LockTable::new();
        let _a = table.acquire(PickupPointId::new()).await;
        let b = tokio::time::timeout(Duration::from_millis(100), table.acquire(PickupPointId::new())).await;
        assert!(b.is_ok());
        assert_eq!(table.len(), 2);
    }

    #[tokio::test]
    async fn entries_are_kept_after_release() {
        let table = LockTable::new();
        let id = PickupPointId::new();
        drop(table.acquire(id).await);
        drop(table.acquire(id).await);
        assert_eq!(table.len(), 1);
        assert!(!table.is_empty());
    }
}
