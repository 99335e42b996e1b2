//! Pickup-point domain module.
//!
//! This crate contains the business rules for pickup points, their reception
//! log and the product stack of each reception, implemented purely as
//! deterministic domain logic (no IO, no HTTP, no storage).

pub mod catalog;
pub mod lifecycle;
pub mod point;

pub use catalog::{Catalog, City, ProductType};
pub use lifecycle::{
    AddProduct, CloseReception, LastProductRemoved, OpenReception, ProductAdded,
    ReceptionClosed, ReceptionCommand, ReceptionEvent, ReceptionOpened, RemoveLastProduct,
    TransitionOutcome,
};
pub use point::{PickupPoint, PickupPointDocument, Product, Reception, ReceptionStatus};
