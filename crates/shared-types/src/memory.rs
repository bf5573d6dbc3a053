//! # Pipeline Memory
//!
//! Ordered multi-map used as the processors' scratch heap (`data`) and as the
//! outgoing notification buffer (`events`).
//!
//! - Keys keep first-insertion order; values keep push order per key.
//! - `get` never fails: an unknown key reads as an empty slice.
//! - `pop` takes the list and leaves the key behind with an empty list.
//!
//! Not shared between dispatches; each worker owns its own pair.

use std::collections::HashMap;

/// Ordered multi-map of opaque values.
#[derive(Debug, Clone)]
pub struct PipelineMemory<T> {
    order: Vec<String>,
    slots: HashMap<String, Vec<T>>,
}

impl<T> PipelineMemory<T> {
    /// Create an empty memory.
    #[must_use]
    pub fn new() -> Self {
        Self {
            order: Vec::new(),
            slots: HashMap::new(),
        }
    }

    fn slot(&mut self, key: &str) -> &mut Vec<T> {
        if !self.slots.contains_key(key) {
            self.order.push(key.to_string());
        }
        self.slots.entry(key.to_string()).or_default()
    }

    /// Append one value under `key`.
    pub fn push(&mut self, key: &str, value: T) {
        self.slot(key).push(value);
    }

    /// Make sure `key` exists without adding a value.
    pub fn touch(&mut self, key: &str) {
        self.slot(key);
    }

    /// Append every element of `values` under `key`.
    pub fn push_list_elements<I>(&mut self, key: &str, values: I)
    where
        I: IntoIterator<Item = T>,
    {
        self.slot(key).extend(values);
    }

    /// Values under `key`, empty if absent.
    #[must_use]
    pub fn get(&self, key: &str) -> &[T] {
        self.slots.get(key).map_or(&[][..], Vec::as_slice)
    }

    /// Remove and return the values under `key`; the key persists.
    pub fn pop(&mut self, key: &str) -> Vec<T> {
        self.slots.get_mut(key).map(std::mem::take).unwrap_or_default()
    }

    /// Keys in first-insertion order.
    #[must_use]
    pub fn properties(&self) -> Vec<String> {
        self.order.clone()
    }

    /// `(key, values)` pairs in key order.
    pub fn items(&self) -> impl Iterator<Item = (&str, &[T])> + '_ {
        self.order
            .iter()
            .map(move |k| (k.as_str(), self.get(k)))
    }

    /// All values, key by key.
    pub fn values(&self) -> impl Iterator<Item = &T> + '_ {
        self.items().flat_map(|(_, v)| v.iter())
    }

    /// Total number of values held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.values().map(Vec::len).sum()
    }

    /// Whether no values are held.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every key and value.
    pub fn empty(&mut self) {
        self.order.clear();
        self.slots.clear();
    }
}

impl<T> Default for PipelineMemory<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pop_returns_in_order_then_get_is_empty() {
        let mut mem = PipelineMemory::new();
        mem.push("k", "a");
        mem.push("k", "b");
        assert_eq!(mem.pop("k"), vec!["a", "b"]);
        assert!(mem.get("k").is_empty());
        assert_eq!(mem.properties(), vec!["k".to_string()]);
    }

    #[test]
    fn test_get_absent_key_is_empty() {
        let mem: PipelineMemory<u8> = PipelineMemory::new();
        assert!(mem.get("nope").is_empty());
        assert!(mem.properties().is_empty());
    }

    #[test]
    fn test_push_list_elements_appends() {
        let mut mem = PipelineMemory::new();
        mem.push("s", 1);
        mem.push_list_elements("s", vec![2, 3]);
        assert_eq!(mem.get("s"), &[1, 2, 3]);
    }

    #[test]
    fn test_touch_creates_empty_key() {
        let mut mem: PipelineMemory<u8> = PipelineMemory::new();
        mem.touch("x");
        assert_eq!(mem.properties(), vec!["x".to_string()]);
        assert!(mem.is_empty());
    }

    #[test]
    fn test_key_order_is_insertion_order() {
        let mut mem = PipelineMemory::new();
        mem.push("b", 1);
        mem.push("a", 2);
        mem.push("b", 3);
        let keys: Vec<&str> = mem.items().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["b", "a"]);
        assert_eq!(mem.values().copied().collect::<Vec<_>>(), vec![1, 3, 2]);
    }

    #[test]
    fn test_empty_clears_everything() {
        let mut mem = PipelineMemory::new();
        mem.push("k", 1);
        mem.empty();
        assert!(mem.properties().is_empty());
        assert_eq!(mem.len(), 0);
    }
}
