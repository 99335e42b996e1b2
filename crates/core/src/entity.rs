//! Entities: objects with identity, owned by an aggregate.

use std::collections::HashSet;

/// Identity of a child object inside an aggregate document.
///
/// Receptions and products are entities owned by a pickup point; they are
/// never stored or addressed on their own.
pub trait Entity {
    type Id: Clone + Eq + core::hash::Hash + core::fmt::Debug;

    fn id(&self) -> &Self::Id;
}

/// Look up an entity by id in an owned collection.
pub fn find_by_id<'a, E: Entity>(items: &'a [E], id: &E::Id) -> Option<&'a E> {
    items.iter().find(|item| item.id() == id)
}

/// First id that occurs more than once, in collection order.
pub fn first_duplicate_id<E: Entity>(items: &[E]) -> Option<&E::Id> {
    let mut seen = HashSet::with_capacity(items.len());
    items.iter().map(Entity::id).find(|id| !seen.insert(*id))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Item(u32, &'static str);

    impl Entity for Item {
        type Id = u32;

        fn id(&self) -> &u32 {
            &self.0
        }
    }

    #[test]
    fn finds_by_id() {
        let items = [Item(1, "a"), Item(2, "b")];
        assert_eq!(find_by_id(&items, &2).map(|i| i.1), Some("b"));
        assert!(find_by_id(&items, &3).is_none());
    }

    #[test]
    fn reports_first_repeated_id() {
        assert_eq!(first_duplicate_id(&[Item(1, "a"), Item(2, "b"), Item(1, "c")]), Some(&1));
        assert_eq!(first_duplicate_id::<Item>(&[]), None);
        assert_eq!(first_duplicate_id(&[Item(7, "x")]), None);
    }
}
