//! Domain error model.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Lifecycle precondition that a transition found violated.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Precondition {
    /// `OpenReception` while another reception is still open.
    ReceptionAlreadyOpen,
    /// Product or close operation while no reception is open.
    NoOpenReception,
    /// `RemoveLastProduct` on an open reception without products.
    EmptyProductStack,
}

impl Precondition {
    pub fn as_str(self) -> &'static str {
        match self {
            Precondition::ReceptionAlreadyOpen => "reception_already_open",
            Precondition::NoOpenReception => "no_open_reception",
            Precondition::EmptyProductStack => "empty_product_stack",
        }
    }
}

impl core::fmt::Display for Precondition {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Domain-level error.
///
/// Keep this focused on deterministic, business/domain failures (validation,
/// state-machine preconditions, invariants). Infrastructure concerns belong
/// elsewhere.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// A value failed validation (malformed or not in an allow-list).
    #[error("validation failed: {0}")]
    Validation(String),

    /// A lifecycle transition was rejected by the current state.
    #[error("precondition failed: {0}")]
    Precondition(Precondition),

    /// A persisted aggregate violates a structural invariant.
    #[error("corrupt aggregate: {0}")]
    CorruptAggregate(String),

    /// An identifier was invalid (e.g. parse failure).
    #[error("invalid identifier: {0}")]
    InvalidId(String),
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn corrupt(msg: impl Into<String>) -> Self {
        Self::CorruptAggregate(msg.into())
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }

    pub fn reception_already_open() -> Self {
        Self::Precondition(Precondition::ReceptionAlreadyOpen)
    }

    pub fn no_open_reception() -> Self {
        Self::Precondition(Precondition::NoOpenReception)
    }

    pub fn empty_product_stack() -> Self {
        Self::Precondition(Precondition::EmptyProductStack)
    }

    /// Returns the violated precondition, if this is a state-machine rejection.
    pub fn precondition(&self) -> Option<Precondition> {
        match self {
            DomainError::Precondition(p) => Some(*p),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn precondition_helpers_carry_kind() {
        assert_eq!(
            DomainError::reception_already_open().precondition(),
            Some(Precondition::ReceptionAlreadyOpen)
        );
        assert_eq!(
            DomainError::no_open_reception().precondition(),
            Some(Precondition::NoOpenReception)
        );
        assert_eq!(
            DomainError::empty_product_stack().precondition(),
            Some(Precondition::EmptyProductStack)
        );
        assert_eq!(DomainError::validation("x").precondition(), None);
    }

    #[test]
    fn display_includes_precondition_code() {
        let err = DomainError::no_open_reception();
        assert_eq!(err.to_string(), "precondition failed: no_open_reception");
    }

    #[test]
    fn precondition_serializes_as_snake_case() {
        let json = serde_json::to_string(&Precondition::EmptyProductStack).unwrap();
        assert_eq!(json, "\"empty_product_stack\"");
    }
}
