use std::sync::{Arc, Mutex};

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use serde_json::Value as JsonValue;

use pvz_core::{AggregateRoot, PickupPointId};
use pvz_pickup::{PickupPoint, ReceptionEvent};

use super::query::{Pagination, TimeWindow};
use super::r#trait::{AppliedTransition, DocumentStore, StoreError};

type Slot = Arc<Mutex<JsonValue>>;

/// In-memory document store.
///
/// Keeps each point as its serialized JSON document, so every read goes
/// through the same decoding and structural checks as a real backend.
/// Each document sits behind its own mutex; the map's shard locks are held
/// only long enough to clone a slot out. Intended for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryDocumentStore {
    documents: DashMap<PickupPointId, Slot>,
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a raw document as-is, bypassing all checks.
    pub fn put_raw_document(&self, id: PickupPointId, document: JsonValue) -> Result<(), StoreError> {
        match self.slot(id) {
            Some(slot) => *slot.lock().map_err(|_| poisoned())? = document,
            None => {
                self.documents.insert(id, Arc::new(Mutex::new(document)));
            }
        }
        Ok(())
    }

    fn slot(&self, id: PickupPointId) -> Option<Slot> {
        self.documents.get(&id).map(|entry| entry.value().clone())
    }
}

fn poisoned() -> StoreError {
    StoreError::Unavailable("lock poisoned".to_string())
}

/// Copy the document out; the slot is unlocked before decoding.
fn snapshot(slot: &Slot) -> Result<JsonValue, StoreError> {
    Ok(slot.lock().map_err(|_| poisoned())?.clone())
}

#[async_trait::async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn insert(&self, point: &PickupPoint) -> Result<(), StoreError> {
        let document = point.to_json()?;
        let id = point.id_typed();

        match self.documents.entry(id) {
            Entry::Occupied(_) => Err(StoreError::AlreadyExists(id)),
            Entry::Vacant(vacant) => {
                vacant.insert(Arc::new(Mutex::new(document)));
                Ok(())
            }
        }
    }

    async fn load(&self, id: PickupPointId) -> Result<Option<PickupPoint>, StoreError> {
        match self.slot(id) {
            Some(slot) => Ok(Some(PickupPoint::from_json(snapshot(&slot)?)?)),
            None => Ok(None),
        }
    }

    async fn apply(
        &self,
        id: PickupPointId,
        event: &ReceptionEvent,
    ) -> Result<AppliedTransition, StoreError> {
        let slot = self.slot(id).ok_or(StoreError::NotFound(id))?;

        // Check and write happen under this point's lock only.
        let mut document = slot.lock().map_err(|_| poisoned())?;
        let mut point = PickupPoint::from_json(document.clone())?;
        let outcome = point.transition(event)?;
        *document = point.to_json()?;
        drop(document);

        tracing::trace!(
            pickup_point_id = %id,
            version = point.version(),
            event_type = event.event_type(),
            "document replaced"
        );

        Ok(AppliedTransition { point, outcome })
    }

    async fn list_in_interval(
        &self,
        window: TimeWindow,
        pagination: Pagination,
    ) -> Result<Vec<PickupPoint>, StoreError> {
        let slots: Vec<Slot> = self.documents.iter().map(|entry| entry.value().clone()).collect();

        let mut matching = Vec::new();
        for slot in &slots {
            let point = PickupPoint::from_json(snapshot(slot)?)?;
            if point.has_reception_within(window.start(), window.end()) {
                matching.push(point);
            }
        }
        matching.sort_by_key(|p| (p.registered_at(), p.id_typed()));

        Ok(matching
            .into_iter()
            .skip(pagination.offset as usize)
            .take(pagination.limit as usize)
            .collect())
    }
}
