//! Insertion-ordered set.
//!
//! Sets that get persisted (visited areas, completed milestones) must
//! round-trip as plain ordered arrays, never as the runtime set type
//! (spec.md §9 "Sets that must be persisted"). This wraps a `HashSet` for
//! cheap membership checks alongside a `Vec` that preserves first-seen
//! order, and serializes as that `Vec`.

use std::collections::HashSet;
use std::hash::Hash;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A set that remembers insertion order. `Serialize`/`Deserialize` round
/// through a plain array.
#[derive(Debug, Clone)]
pub struct OrderedSet<T> {
    order: Vec<T>,
    seen: HashSet<T>,
}

impl<T: Eq + Hash + Clone> Default for OrderedSet<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Eq + Hash + Clone> OrderedSet<T> {
    /// An empty set.
    pub fn new() -> Self {
        Self {
            order: Vec::new(),
            seen: HashSet::new(),
        }
    }

    /// Insert `value`. Returns `true` if it was newly added.
    pub fn insert(&mut self, value: T) -> bool {
        if self.seen.insert(value.clone()) {
            self.order.push(value);
            true
        } else {
            false
        }
    }

    /// True if `value` has already been inserted.
    pub fn contains(&self, value: &T) -> bool {
        self.seen.contains(value)
    }

    /// Number of distinct values inserted.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// True if nothing has been inserted yet.
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Values in first-seen order.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.order.iter()
    }
}

impl<T: Eq + Hash + Clone> FromIterator<T> for OrderedSet<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut set = Self::new();
        for item in iter {
            set.insert(item);
        }
        set
    }
}

impl<T: Eq + Hash + Clone + Serialize> Serialize for OrderedSet<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.order.serialize(serializer)
    }
}

impl<'de, T: Eq + Hash + Clone + Deserialize<'de>> Deserialize<'de> for OrderedSet<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let items: Vec<T> = Vec::deserialize(deserializer)?;
        Ok(items.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preserves_first_seen_order() {
        let mut set = OrderedSet::new();
        set.insert("b".to_string());
        set.insert("a".to_string());
        set.insert("b".to_string());
        assert_eq!(
            set.iter().cloned().collect::<Vec<_>>(),
            vec!["b".to_string(), "a".to_string()]
        );
    }

    #[test]
    fn serializes_as_a_plain_array() {
        let mut set: OrderedSet<String> = OrderedSet::new();
        set.insert("route-1".to_string());
        set.insert("cave-1".to_string());
        let json = serde_json::to_string(&set).unwrap();
        assert_eq!(json, r#"["route-1","cave-1"]"#);
    }

    #[test]
    fn round_trips_through_json() {
        let mut set: OrderedSet<String> = OrderedSet::new();
        set.insert("x".to_string());
        set.insert("y".to_string());
        let json = serde_json::to_string(&set).unwrap();
        let back: OrderedSet<String> = serde_json::from_str(&json).unwrap();
        assert_eq!(back.len(), 2);
        assert!(back.contains(&"x".to_string()));
        assert!(back.contains(&"y".to_string()));
    }
}
