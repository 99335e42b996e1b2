//! One-document-per-aggregate store boundary.
//!
//! A pickup point and everything it owns is persisted as one nested document.
//! Stores apply lifecycle transitions as atomic conditional writes; see
//! [`DocumentStore`] for the contract.

pub mod in_memory;
pub mod postgres;
pub mod query;
pub mod r#trait;

pub use in_memory::InMemoryDocumentStore;
pub use postgres::PostgresDocumentStore;
pub use query::{Pagination, TimeWindow};
pub use r#trait::{AppliedTransition, DocumentStore, StoreError};
