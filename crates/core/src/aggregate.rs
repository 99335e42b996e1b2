//! Aggregate root trait for document-backed domain models.

/// Aggregate root marker + minimal interface.
///
/// The aggregate is the unit of atomic update: every state change is applied to
/// one aggregate as a whole, and storage persists one document per aggregate.
pub trait AggregateRoot {
    /// Strongly-typed aggregate identifier.
    type Id: Clone + Eq + core::hash::Hash + core::fmt::Debug;

    /// Returns the aggregate identifier.
    fn id(&self) -> &Self::Id;

    /// Monotonically increasing version of the aggregate's state.
    ///
    /// Incremented by one per applied transition. Stores persist it alongside
    /// the document so readers can tell two snapshots apart.
    fn version(&self) -> u64;
}

/// Aggregate execution semantics (pure, deterministic).
///
/// - **Decision logic**: `handle(&self, cmd)` returns the single transition the
///   command resolves to, or the reason it is not allowed.
/// - **Precondition**: `check(&self, transition)` re-validates a transition
///   against a (possibly newer) state. Stores call it inside their atomic
///   write step.
/// - **State mutation**: `apply(&mut self, transition)` evolves state.
///
/// Aggregates must not perform IO or side effects.
pub trait Aggregate: AggregateRoot {
    type Command: Clone + core::fmt::Debug;
    type Event: Clone + core::fmt::Debug;
    type Error: core::fmt::Debug;

    /// Evolve in-memory state from a single transition.
    ///
    /// Callers must have checked the transition against this exact state.
    fn apply(&mut self, event: &Self::Event);

    /// Decide which transition a command resolves to given the current state.
    ///
    /// This must not mutate state.
    fn handle(&self, command: &Self::Command) -> Result<Self::Event, Self::Error>;

    /// Check that a previously decided transition is still valid for this state.
    fn check(&self, event: &Self::Event) -> Result<(), Self::Error>;
}
