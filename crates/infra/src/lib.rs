//! Infrastructure layer: document stores, write serialization, lifecycle engine, bootstrap.

pub mod config;
pub mod db;
pub mod document_store;
pub mod lifecycle;
pub mod lock_table;

#[cfg(test)]
mod integration_tests;

pub use config::{ConfigError, InfraConfig};
pub use lifecycle::{LifecycleEngine, LifecycleError};
