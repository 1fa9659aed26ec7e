//! The map backing hash and object values.

use crate::value::Value;
use indexmap::IndexMap;
use std::rc::Rc;

/// A structure wrapping `indexmap::IndexMap`.
///
/// Storage preserves insertion order, but every built-in iterator walks the
/// keys in lexicographic order so script results are deterministic across
/// runs. Keeping the underlying order around means an insertion-order
/// iteration mode stays a local change.
#[derive(Clone, Debug, Default)]
pub struct VibeMap {
    map: IndexMap<Rc<str>, Value>,
}

impl VibeMap {
    /// Creates an empty map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a map with room for `capacity` entries.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            map: IndexMap::with_capacity(capacity),
        }
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Whether the map holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Inserts a key-value pair, returning the previous value if the key
    /// already existed (the key keeps its original position).
    pub fn insert(&mut self, key: impl Into<Rc<str>>, value: Value) -> Option<Value> {
        self.map.insert(key.into(), value)
    }

    /// Looks up a key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.map.get(key)
    }

    /// Whether a key is present.
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.map.contains_key(key)
    }

    /// Removes a key, preserving the relative order of the remaining
    /// entries, and returns its value.
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.map.shift_remove(key)
    }

    /// Iterates entries in insertion order. Built-in iterators should use
    /// [`VibeMap::sorted_entries`] instead.
    pub fn iter(&self) -> impl Iterator<Item = (&Rc<str>, &Value)> {
        self.map.iter()
    }

    /// The keys in lexicographic order; the iteration order every script-
    /// visible iterator uses.
    #[must_use]
    pub fn sorted_keys(&self) -> Vec<Rc<str>> {
        let mut keys: Vec<Rc<str>> = self.map.keys().cloned().collect();
        keys.sort_unstable();
        keys
    }

    /// Key-value pairs in lexicographic key order.
    #[must_use]
    pub fn sorted_entries(&self) -> Vec<(Rc<str>, Value)> {
        let mut entries: Vec<(Rc<str>, Value)> = self
            .map
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        entries.sort_unstable_by(|a, b| a.0.cmp(&b.0));
        entries
    }
}

impl FromIterator<(Rc<str>, Value)> for VibeMap {
    fn from_iter<T: IntoIterator<Item = (Rc<str>, Value)>>(iter: T) -> Self {
        Self {
            map: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sorted_keys_ignore_insertion_order() {
        let mut map = VibeMap::new();
        map.insert("b", Value::Int(2));
        map.insert("a", Value::Int(1));
        let keys = map.sorted_keys();
        assert_eq!(&*keys[0], "a");
        assert_eq!(&*keys[1], "b");
    }

    #[test]
    fn remove_preserves_order() {
        let mut map = VibeMap::new();
        map.insert("c", Value::Int(3));
        map.insert("a", Value::Int(1));
        map.insert("b", Value::Int(2));
        map.remove("a");
        let order: Vec<_> = map.iter().map(|(k, _)| k.to_string()).collect();
        assert_eq!(order, vec!["c", "b"]);
    }
}
