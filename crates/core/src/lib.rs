//! `pvz-core`: domain foundation building blocks.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns):
//! identifiers, the domain error model and the aggregate/entity/value-object
//! traits the pickup-point model is built on.

pub mod aggregate;
pub mod entity;
pub mod error;
pub mod id;
pub mod value_object;

pub use aggregate::{Aggregate, AggregateRoot};
pub use entity::{Entity, find_by_id, first_duplicate_id};
pub use error::{DomainError, DomainResult, Precondition};
pub use id::{PickupPointId, ProductId, ReceptionId};
pub use value_object::ValueObject;
