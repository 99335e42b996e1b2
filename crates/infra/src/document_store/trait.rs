use std::sync::Arc;

use thiserror::Error;

use pvz_core::{DomainError, PickupPointId};
use pvz_pickup::{PickupPoint, ReceptionEvent, TransitionOutcome};

use super::query::{Pagination, TimeWindow};

/// Document store operation error.
///
/// These are adapter-level failures. A transition the stored state refuses is
/// carried as [`StoreError::Rejected`] with the domain reason, so callers can
/// tell precondition failures apart from storage trouble.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("pickup point {0} not found")]
    NotFound(PickupPointId),

    #[error("pickup point {0} already exists")]
    AlreadyExists(PickupPointId),

    /// The atomic write found the transition invalid for the current document.
    #[error("transition rejected: {0}")]
    Rejected(DomainError),

    /// The stored document violates a structural invariant.
    #[error("corrupt document: {0}")]
    Corrupt(String),

    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

impl From<DomainError> for StoreError {
    fn from(value: DomainError) -> Self {
        match value {
            DomainError::CorruptAggregate(msg) => StoreError::Corrupt(msg),
            other => StoreError::Rejected(other),
        }
    }
}

/// A transition committed by [`DocumentStore::apply`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppliedTransition {
    /// The aggregate as persisted after the write.
    pub point: PickupPoint,
    pub outcome: TransitionOutcome,
}

/// One-document-per-aggregate store for pickup points.
///
/// ## Apply semantics
///
/// `apply()` is the only mutation of an existing document. Implementations must:
/// - re-check the transition against the stored state and mutate in the same
///   atomic step (a check that passes must not be invalidated before the write)
/// - report a failed precondition as `Rejected`, never as success or as a
///   storage error
/// - leave the stored document untouched on any error
///
/// ## Load semantics
///
/// `load()` returns `None` for an unknown id. A document that fails the
/// structural checks is reported as `Corrupt` and never repaired.
#[async_trait::async_trait]
pub trait DocumentStore: Send + Sync {
    /// Persist a freshly registered point.
    async fn insert(&self, point: &PickupPoint) -> Result<(), StoreError>;

    async fn load(&self, id: PickupPointId) -> Result<Option<PickupPoint>, StoreError>;

    /// Conditionally apply one transition to the stored document.
    async fn apply(
        &self,
        id: PickupPointId,
        event: &ReceptionEvent,
    ) -> Result<AppliedTransition, StoreError>;

    /// Points with at least one reception overlapping `window`, ordered by
    /// registration time then id.
    async fn list_in_interval(
        &self,
        window: TimeWindow,
        pagination: Pagination,
    ) -> Result<Vec<PickupPoint>, StoreError>;
}

#[async_trait::async_trait]
impl<S> DocumentStore for Arc<S>
where
    S: DocumentStore + ?Sized,
{
    async fn insert(&self, point: &PickupPoint) -> Result<(), StoreError> {
        (**self).insert(point).await
    }

    async fn load(&self, id: PickupPointId) -> Result<Option<PickupPoint>, StoreError> {
        (**self).load(id).await
    }

    async fn apply(
        &self,
        id: PickupPointId,
        event: &ReceptionEvent,
    ) -> Result<AppliedTransition, StoreError> {
        (**self).apply(id, event).await
    }

    async fn list_in_interval(
        &self,
        window: TimeWindow,
        pagination: Pagination,
    ) -> Result<Vec<PickupPoint>, StoreError> {
        (**self).list_in_interval(window, pagination).await
    }
}
