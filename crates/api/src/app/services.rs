//! Store selection and engine wiring.

use std::sync::Arc;

use pvz_infra::InfraConfig;
use pvz_infra::db;
use pvz_infra::document_store::{
    DocumentStore, InMemoryDocumentStore, PostgresDocumentStore, StoreError,
};
use pvz_infra::LifecycleEngine;
use pvz_pickup::Catalog;

pub type Engine = LifecycleEngine<Arc<dyn DocumentStore>>;

/// Shared state handed to every handler.
pub struct AppServices {
    pub engine: Engine,
}

impl AppServices {
    pub fn new(store: Arc<dyn DocumentStore>, catalog: Catalog) -> Self {
        Self {
            engine: LifecycleEngine::new(store, catalog),
        }
    }

    pub fn in_memory(catalog: Catalog) -> Self {
        Self::new(Arc::new(InMemoryDocumentStore::new()), catalog)
    }
}

/// Postgres when `DATABASE_URL` is set, in-memory otherwise.
pub async fn build_services(config: &InfraConfig) -> Result<AppServices, StoreError> {
    let catalog = config.catalog();

    if config.database_url.is_none() {
        tracing::warn!("DATABASE_URL not set; using in-memory document store");
        return Ok(AppServices::in_memory(catalog));
    }

    let pool = db::connect_with_retry(config).await?;
    db::ensure_schema(&pool).await?;
    tracing::info!("using postgres document store");

    let store = PostgresDocumentStore::new(pool);
    Ok(AppServices::new(Arc::new(store), catalog))
}
