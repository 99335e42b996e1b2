//! Lifecycle engine: the application-level entry point for every operation.
//!
//! ```text
//! request
//!   ↓
//! 1. Load the point (unlocked read)
//!   ↓
//! 2. Decide the transition against that snapshot (pure, `handle`)
//!   ↓
//! 3. Acquire the point's write lock
//!   ↓
//! 4. Store applies the transition conditionally (re-check + write, atomic)
//!   ↓
//! 5. Release the lock, return the typed result
//! ```
//!
//! A transition decided on a stale snapshot is rejected by step 4 with the
//! precondition that no longer holds; the engine never retries it.

use chrono::{DateTime, SubsecRound, Utc};
use thiserror::Error;
use tracing::instrument;

use pvz_core::{Aggregate, AggregateRoot, DomainError, PickupPointId, Precondition, ProductId, ReceptionId};
use pvz_pickup::{
    AddProduct, Catalog, CloseReception, OpenReception, PickupPoint, Product, Reception,
    ReceptionCommand, RemoveLastProduct, TransitionOutcome,
};

use crate::document_store::{DocumentStore, Pagination, StoreError, TimeWindow};
use crate::lock_table::LockTable;

/// Outward error of every lifecycle operation.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LifecycleError {
    /// Malformed or disallowed input (unknown city/product type, bad id).
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("precondition failed: {0}")]
    PreconditionFailed(Precondition),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("storage unavailable: {0}")]
    StorageUnavailable(String),

    #[error("corrupt aggregate: {0}")]
    CorruptAggregate(String),
}

impl LifecycleError {
    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            LifecycleError::InvalidInput(_) => "invalid_input",
            LifecycleError::PreconditionFailed(p) => p.as_str(),
            LifecycleError::NotFound(_) => "not_found",
            LifecycleError::StorageUnavailable(_) => "storage_unavailable",
            LifecycleError::CorruptAggregate(_) => "corrupt_aggregate",
        }
    }

    pub fn precondition(&self) -> Option<Precondition> {
        match self {
            LifecycleError::PreconditionFailed(p) => Some(*p),
            _ => None,
        }
    }
}

impl From<DomainError> for LifecycleError {
    fn from(value: DomainError) -> Self {
        match value {
            DomainError::Validation(msg) => LifecycleError::InvalidInput(msg),
            DomainError::InvalidId(msg) => LifecycleError::InvalidInput(msg),
            DomainError::Precondition(p) => LifecycleError::PreconditionFailed(p),
            DomainError::CorruptAggregate(msg) => LifecycleError::CorruptAggregate(msg),
        }
    }
}

impl From<StoreError> for LifecycleError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::NotFound(id) => LifecycleError::NotFound(format!("pickup point {id}")),
            StoreError::AlreadyExists(id) => {
                LifecycleError::InvalidInput(format!("pickup point {id} already exists"))
            }
            StoreError::Rejected(err) => err.into(),
            StoreError::Corrupt(msg) => LifecycleError::CorruptAggregate(msg),
            StoreError::Unavailable(msg) => LifecycleError::StorageUnavailable(msg),
        }
    }
}

/// Current time at storage precision (microseconds).
pub fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

/// Runs lifecycle operations against a [`DocumentStore`].
#[derive(Debug)]
pub struct LifecycleEngine<S> {
    store: S,
    locks: LockTable,
    catalog: Catalog,
}

impl<S> LifecycleEngine<S> {
    pub fn new(store: S, catalog: Catalog) -> Self {
        Self {
            store,
            locks: LockTable::new(),
            catalog,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }
}

impl<S> LifecycleEngine<S>
where
    S: DocumentStore,
{
    /// Register a new, empty pickup point in an allowed city.
    #[instrument(skip(self), fields(pickup_point_id))]
    pub async fn register_pickup_point(&self, city: &str) -> Result<PickupPoint, LifecycleError> {
        let city = self.catalog.city(city).inspect_err(log_domain_rejection)?;
        let point = PickupPoint::register(PickupPointId::new(), city, now());
        tracing::Span::current().record("pickup_point_id", tracing::field::display(point.id_typed()));

        self.store.insert(&point).await.map_err(log_store_failure)?;

        tracing::info!(city = %point.city(), "pickup point registered");
        Ok(point)
    }

    #[instrument(skip(self), fields(pickup_point_id = %id))]
    pub async fn pickup_point(&self, id: PickupPointId) -> Result<PickupPoint, LifecycleError> {
        self.load(id).await
    }

    /// Open a new reception; fails if one is already open.
    #[instrument(skip(self), fields(pickup_point_id = %id))]
    pub async fn open_reception(&self, id: PickupPointId) -> Result<Reception, LifecycleError> {
        let command = ReceptionCommand::OpenReception(OpenReception {
            pickup_point_id: id,
            reception_id: ReceptionId::new(),
            opened_at: now(),
        });

        match self.execute(id, command).await? {
            TransitionOutcome::ReceptionOpened(reception) => Ok(reception),
            other => Err(unexpected_outcome("open_reception", &other)),
        }
    }

    /// Push a product onto the open reception.
    #[instrument(skip(self), fields(pickup_point_id = %id))]
    pub async fn add_product(
        &self,
        id: PickupPointId,
        product_type: &str,
    ) -> Result<Product, LifecycleError> {
        let product_type = self
            .catalog
            .product_type(product_type)
            .inspect_err(log_domain_rejection)?;
        let command = ReceptionCommand::AddProduct(AddProduct {
            pickup_point_id: id,
            product_id: ProductId::new(),
            product_type,
            added_at: now(),
        });

        match self.execute(id, command).await? {
            TransitionOutcome::ProductAdded(product) => Ok(product),
            other => Err(unexpected_outcome("add_product", &other)),
        }
    }

    /// Pop the most recently added product of the open reception.
    #[instrument(skip(self), fields(pickup_point_id = %id))]
    pub async fn remove_last_product(&self, id: PickupPointId) -> Result<Product, LifecycleError> {
        let command = ReceptionCommand::RemoveLastProduct(RemoveLastProduct { pickup_point_id: id });

        match self.execute(id, command).await? {
            TransitionOutcome::ProductRemoved(product) => Ok(product),
            other => Err(unexpected_outcome("remove_last_product", &other)),
        }
    }

    /// Close the open reception at `closed_at`. The reception is frozen afterwards.
    #[instrument(skip(self), fields(pickup_point_id = %id))]
    pub async fn close_reception(
        &self,
        id: PickupPointId,
        closed_at: DateTime<Utc>,
    ) -> Result<Reception, LifecycleError> {
        let command = ReceptionCommand::CloseReception(CloseReception {
            pickup_point_id: id,
            closed_at,
        });

        match self.execute(id, command).await? {
            TransitionOutcome::ReceptionClosed(reception) => Ok(reception),
            other => Err(unexpected_outcome("close_reception", &other)),
        }
    }

    /// Points with a reception overlapping `window`, by registration time then id.
    #[instrument(skip(self), fields(start = %window.start(), end = %window.end(), count))]
    pub async fn list_in_interval(
        &self,
        window: TimeWindow,
        pagination: Pagination,
    ) -> Result<Vec<PickupPoint>, LifecycleError> {
        let points = self
            .store
            .list_in_interval(window, pagination)
            .await
            .map_err(log_store_failure)?;

        tracing::Span::current().record("count", points.len());
        Ok(points)
    }

    async fn load(&self, id: PickupPointId) -> Result<PickupPoint, LifecycleError> {
        match self.store.load(id).await.map_err(log_store_failure)? {
            Some(point) => Ok(point),
            None => Err(LifecycleError::NotFound(format!("pickup point {id}"))),
        }
    }

    async fn execute(
        &self,
        id: PickupPointId,
        command: ReceptionCommand,
    ) -> Result<TransitionOutcome, LifecycleError> {
        let current = self.load(id).await?;
        let event = current.handle(&command).inspect_err(log_domain_rejection)?;

        let applied = {
            let _guard = self.locks.acquire(id).await;
            self.store.apply(id, &event).await
        };
        let applied = applied.map_err(log_store_failure)?;

        tracing::info!(
            event_type = event.event_type(),
            version = applied.point.version(),
            "transition applied"
        );
        Ok(applied.outcome)
    }
}

fn log_domain_rejection(err: &DomainError) {
    tracing::debug!(error = %err, "rejected");
}

fn log_store_failure(err: StoreError) -> LifecycleError {
    match &err {
        StoreError::Rejected(reason) => tracing::debug!(error = %reason, "rejected at write"),
        StoreError::NotFound(_) | StoreError::AlreadyExists(_) => {
            tracing::debug!(error = %err, "store lookup failed")
        }
        StoreError::Unavailable(_) => tracing::warn!(error = %err, "storage unavailable"),
        StoreError::Corrupt(_) => tracing::error!(error = %err, "corrupt pickup point document"),
    }
    err.into()
}

fn unexpected_outcome(operation: &str, outcome: &TransitionOutcome) -> LifecycleError {
    LifecycleError::CorruptAggregate(format!("{operation} produced unexpected outcome {outcome:?}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn domain_errors_map_to_outward_taxonomy() {
        assert_eq!(
            LifecycleError::from(DomainError::validation("bad")),
            LifecycleError::InvalidInput("bad".to_string())
        );
        assert_eq!(
            LifecycleError::from(DomainError::no_open_reception()),
            LifecycleError::PreconditionFailed(Precondition::NoOpenReception)
        );
        assert_eq!(
            LifecycleError::from(DomainError::corrupt("x")).code(),
            "corrupt_aggregate"
        );
    }

    #[test]
    fn store_rejection_keeps_precondition() {
        let err = LifecycleError::from(StoreError::Rejected(DomainError::empty_product_stack()));
        assert_eq!(err.precondition(), Some(Precondition::EmptyProductStack));
        assert_eq!(err.code(), "empty_product_stack");

        let err = LifecycleError::from(StoreError::Unavailable("down".to_string()));
        assert!(matches!(err, LifecycleError::StorageUnavailable(_)));
    }

    #[test]
    fn now_is_truncated_to_microseconds() {
        assert_eq!(now().timestamp_subsec_nanos() % 1_000, 0);
    }
}
