//! Value object trait: equality by value, not identity.

/// Marker trait for value objects.
///
/// Value objects have **no identity**: two cities with the same name are the
/// same city. They are immutable; to "change" one, build a new one.
///
/// ```ignore
/// #[derive(Debug, Clone, PartialEq, Eq)]
/// struct City(String);
///
/// impl ValueObject for City {}
/// ```
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}
