//! Aggregate root trait for domain models that own a consistency boundary.

/// Aggregate root marker + minimal interface.
///
/// An aggregate root is the only entry point for mutating the entities it owns.
/// Child entities are reachable through the root and are never persisted or
/// mutated on their own.
pub trait AggregateRoot {
    /// Strongly-typed aggregate identifier.
    type Id: Clone + Eq + core::hash::Hash + core::fmt::Debug;

    /// Returns the aggregate identifier.
    fn id(&self) -> &Self::Id;

    /// Whether the aggregate reached a state from which no regular transition
    /// is possible.
    fn is_terminal(&self) -> bool;
}
