//! Reception lifecycle: commands, transitions and the state machine.
//!
//! ```text
//!   (no open reception) --OpenReception--> OPEN --CloseReception--> CLOSED
//!                                           |  ^
//!                                 AddProduct|  |RemoveLastProduct (tail only)
//!                                           v  |
//!                                          OPEN
//! ```
//!
//! Transitions are decided against the state a caller has read
//! (`handle`) and re-checked against the state at write time (`check`), so
//! a decision made on a stale read is rejected instead of applied.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use pvz_core::{Aggregate, DomainError, PickupPointId, ProductId, ReceptionId, find_by_id};

use crate::catalog::ProductType;
use crate::point::{PickupPoint, Product, Reception};

/// Command: OpenReception.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenReception {
    pub pickup_point_id: PickupPointId,
    pub reception_id: ReceptionId,
    pub opened_at: DateTime<Utc>,
}

/// Command: AddProduct.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddProduct {
    pub pickup_point_id: PickupPointId,
    pub product_id: ProductId,
    pub product_type: ProductType,
    pub added_at: DateTime<Utc>,
}

/// Command: RemoveLastProduct.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoveLastProduct {
    pub pickup_point_id: PickupPointId,
}

/// Command: CloseReception.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CloseReception {
    pub pickup_point_id: PickupPointId,
    pub closed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReceptionCommand {
    OpenReception(OpenReception),
    AddProduct(AddProduct),
    RemoveLastProduct(RemoveLastProduct),
    CloseReception(CloseReception),
}

/// Transition: ReceptionOpened.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceptionOpened {
    pub pickup_point_id: PickupPointId,
    pub reception_id: ReceptionId,
    pub opened_at: DateTime<Utc>,
}

/// Transition: ProductAdded. The owner is whichever reception is open when
/// the transition is applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductAdded {
    pub pickup_point_id: PickupPointId,
    pub product_id: ProductId,
    pub product_type: ProductType,
    pub added_at: DateTime<Utc>,
}

/// Transition: LastProductRemoved. Pops the tail of the open reception.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LastProductRemoved {
    pub pickup_point_id: PickupPointId,
}

/// Transition: ReceptionClosed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceptionClosed {
    pub pickup_point_id: PickupPointId,
    pub closed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReceptionEvent {
    ReceptionOpened(ReceptionOpened),
    ProductAdded(ProductAdded),
    LastProductRemoved(LastProductRemoved),
    ReceptionClosed(ReceptionClosed),
}

impl ReceptionEvent {
    pub fn event_type(&self) -> &'static str {
        match self {
            ReceptionEvent::ReceptionOpened(_) => "pvz.reception.opened",
            ReceptionEvent::ProductAdded(_) => "pvz.reception.product_added",
            ReceptionEvent::LastProductRemoved(_) => "pvz.reception.last_product_removed",
            ReceptionEvent::ReceptionClosed(_) => "pvz.reception.closed",
        }
    }

    pub fn pickup_point_id(&self) -> PickupPointId {
        match self {
            ReceptionEvent::ReceptionOpened(e) => e.pickup_point_id,
            ReceptionEvent::ProductAdded(e) => e.pickup_point_id,
            ReceptionEvent::LastProductRemoved(e) => e.pickup_point_id,
            ReceptionEvent::ReceptionClosed(e) => e.pickup_point_id,
        }
    }
}

/// What a successfully applied transition produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransitionOutcome {
    ReceptionOpened(Reception),
    ProductAdded(Product),
    ProductRemoved(Product),
    ReceptionClosed(Reception),
}

impl TransitionOutcome {
    pub fn reception(&self) -> Option<&Reception> {
        match self {
            TransitionOutcome::ReceptionOpened(r) | TransitionOutcome::ReceptionClosed(r) => Some(r),
            _ => None,
        }
    }

    pub fn product(&self) -> Option<&Product> {
        match self {
            TransitionOutcome::ProductAdded(p) | TransitionOutcome::ProductRemoved(p) => Some(p),
            _ => None,
        }
    }
}

impl Aggregate for PickupPoint {
    type Command = ReceptionCommand;
    type Event = ReceptionEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            ReceptionEvent::ReceptionOpened(e) => {
                self.push_reception(Reception::open(e.reception_id, self.id_typed(), e.opened_at));
            }
            ReceptionEvent::ProductAdded(e) => {
                if let Some(open) = self.open_reception_mut() {
                    let owner = open.id_typed();
                    open.push_product(Product::new(
                        e.product_id,
                        owner,
                        e.product_type.clone(),
                        e.added_at,
                    ));
                }
            }
            ReceptionEvent::LastProductRemoved(_) => {
                if let Some(open) = self.open_reception_mut() {
                    open.pop_product();
                }
            }
            ReceptionEvent::ReceptionClosed(e) => {
                if let Some(open) = self.open_reception_mut() {
                    open.close(e.closed_at);
                }
            }
        }

        // +1 per applied transition.
        self.bump_version();
    }

    fn handle(&self, command: &Self::Command) -> Result<Self::Event, Self::Error> {
        let event = match command {
            ReceptionCommand::OpenReception(cmd) => ReceptionEvent::ReceptionOpened(ReceptionOpened {
                pickup_point_id: cmd.pickup_point_id,
                reception_id: cmd.reception_id,
                opened_at: cmd.opened_at,
            }),
            ReceptionCommand::AddProduct(cmd) => ReceptionEvent::ProductAdded(ProductAdded {
                pickup_point_id: cmd.pickup_point_id,
                product_id: cmd.product_id,
                product_type: cmd.product_type.clone(),
                added_at: cmd.added_at,
            }),
            ReceptionCommand::RemoveLastProduct(cmd) => {
                ReceptionEvent::LastProductRemoved(LastProductRemoved {
                    pickup_point_id: cmd.pickup_point_id,
                })
            }
            ReceptionCommand::CloseReception(cmd) => ReceptionEvent::ReceptionClosed(ReceptionClosed {
                pickup_point_id: cmd.pickup_point_id,
                closed_at: cmd.closed_at,
            }),
        };

        self.check(&event)?;
        Ok(event)
    }

    fn check(&self, event: &Self::Event) -> Result<(), Self::Error> {
        if event.pickup_point_id() != self.id_typed() {
            return Err(DomainError::invalid_id(format!(
                "transition targets pickup point {}, applied to {}",
                event.pickup_point_id(),
                self.id_typed()
            )));
        }

        match event {
            ReceptionEvent::ReceptionOpened(e) => {
                if self.open_reception().is_some() {
                    return Err(DomainError::reception_already_open());
                }
                if self.reception(e.reception_id).is_some() {
                    return Err(DomainError::validation(format!(
                        "reception {} already exists",
                        e.reception_id
                    )));
                }
                Ok(())
            }
            ReceptionEvent::ProductAdded(e) => {
                let open = self.open_reception().ok_or_else(DomainError::no_open_reception)?;
                if find_by_id(open.products(), &e.product_id).is_some() {
                    return Err(DomainError::validation(format!(
                        "product {} already exists",
                        e.product_id
                    )));
                }
                Ok(())
            }
            ReceptionEvent::LastProductRemoved(_) => {
                let open = self.open_reception().ok_or_else(DomainError::no_open_reception)?;
                if open.products().is_empty() {
                    return Err(DomainError::empty_product_stack());
                }
                Ok(())
            }
            ReceptionEvent::ReceptionClosed(e) => {
                let open = self.open_reception().ok_or_else(DomainError::no_open_reception)?;
                if e.closed_at < open.opened_at() {
                    return Err(DomainError::validation(format!(
                        "closed_at {} precedes opened_at {}",
                        e.closed_at,
                        open.opened_at()
                    )));
                }
                Ok(())
            }
        }
    }
}

impl PickupPoint {
    /// Check and apply one transition, returning what it produced.
    ///
    /// On error `self` is left untouched. This is the single step stores run
    /// inside their atomic write.
    pub fn transition(&mut self, event: &ReceptionEvent) -> Result<TransitionOutcome, DomainError> {
        self.check(event)?;

        let removed = match event {
            ReceptionEvent::LastProductRemoved(_) => {
                self.open_reception().and_then(|r| r.last_product()).cloned()
            }
            _ => None,
        };

        self.apply(event);

        let outcome = match event {
            ReceptionEvent::ReceptionOpened(_) => self
                .receptions()
                .last()
                .cloned()
                .map(TransitionOutcome::ReceptionOpened),
            ReceptionEvent::ProductAdded(_) => self
                .open_reception()
                .and_then(|r| r.last_product())
                .cloned()
                .map(TransitionOutcome::ProductAdded),
            ReceptionEvent::LastProductRemoved(_) => removed.map(TransitionOutcome::ProductRemoved),
            ReceptionEvent::ReceptionClosed(_) => self
                .receptions()
                .last()
                .cloned()
                .map(TransitionOutcome::ReceptionClosed),
        };

        outcome.ok_or_else(|| {
            DomainError::corrupt(format!(
                "transition {} left no result on pickup point {}",
                event.event_type(),
                self.id_typed()
            ))
        })
    }
}
