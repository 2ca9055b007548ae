//! Validation layer over [`OrderedStore`].
//!
//! Wraps `put` with a caller-supplied validator and tracks a validation
//! message per id, instead of specializing the store through inheritance.

use crate::store::ordered::OrderedStore;
use crate::types::Timestamp;
use std::collections::HashMap;
use std::hash::Hash;

/// Outcome of validating a value before it is stored.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Validation {
    /// Store the value and clear any recorded message for the id.
    Accept,
    /// Store the value but record a validation message for the id.
    Flag(String),
    /// Skip the insert entirely; the store is left unchanged.
    Reject,
}

/// Validation function. Receives the id and the candidate value.
pub type Validator<K, V> = Box<dyn Fn(&K, &V) -> Validation + Send + Sync>;

/// An [`OrderedStore`] whose inserts pass through a validator.
///
/// Flagged entries are still stored (so a consumer can show the value next
/// to its message); the store as a whole is valid only while no messages
/// are recorded.
pub struct ValidatedStore<K, V> {
    inner: OrderedStore<K, V>,
    validator: Validator<K, V>,
    messages: HashMap<K, String>,
}

impl<K, V> ValidatedStore<K, V>
where
    K: Eq + Hash + Clone,
{
    pub fn new(inner: OrderedStore<K, V>, validator: Validator<K, V>) -> Self {
        Self {
            inner,
            validator,
            messages: HashMap::new(),
        }
    }

    /// Validate and insert. Returns the stored value, or `None` when the
    /// validator rejected the value or the inner store refused it.
    pub fn put(&mut self, id: K, value: V, timestamp: Option<Timestamp>) -> Option<&V> {
        match (self.validator)(&id, &value) {
            Validation::Reject => return None,
            Validation::Flag(message) => {
                self.messages.insert(id.clone(), message);
            }
            Validation::Accept => {
                self.messages.remove(&id);
            }
        }
        self.inner.put(id, value, timestamp)
    }

    /// Remove the entry and any recorded message for `id`.
    pub fn remove(&mut self, id: &K) -> Option<V> {
        self.messages.remove(id);
        self.inner.remove(id)
    }

    /// True while no entry carries a validation message.
    pub fn is_valid(&self) -> bool {
        self.messages.is_empty()
    }

    /// The recorded message for `id`, if it failed validation.
    pub fn validation_message(&self, id: &K) -> Option<&str> {
        self.messages.get(id).map(String::as_str)
    }

    /// Read access to the underlying store.
    pub fn store(&self) -> &OrderedStore<K, V> {
        &self.inner
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::ordered::Capacity;

    /// Mirrors an order-quantity check: ids must be known, quantities must
    /// stay within a limit.
    fn quantity_store(limit: u32) -> ValidatedStore<String, u32> {
        let validator: Validator<String, u32> = Box::new(move |id, quantity| {
            if id.starts_with("unknown") {
                Validation::Reject
            } else if *quantity > limit {
                Validation::Flag("Quantity exceeds order limit".to_string())
            } else {
                Validation::Accept
            }
        });
        ValidatedStore::new(OrderedStore::new(Capacity::Unbounded), validator)
    }

    #[test]
    fn test_accept_stores_and_stays_valid() {
        let mut store = quantity_store(10);
        assert_eq!(store.put("p1".to_string(), 5, None), Some(&5));
        assert!(store.is_valid());
        assert_eq!(store.validation_message(&"p1".to_string()), None);
    }

    #[test]
    fn test_flag_stores_but_invalidates() {
        let mut store = quantity_store(10);
        assert_eq!(store.put("p1".to_string(), 11, None), Some(&11));

        assert!(!store.is_valid());
        assert_eq!(
            store.validation_message(&"p1".to_string()),
            Some("Quantity exceeds order limit")
        );
        // The flagged value is still visible.
        assert_eq!(store.store().get(&"p1".to_string()), Some(&11));
    }

    #[test]
    fn test_accept_clears_earlier_flag() {
        let mut store = quantity_store(10);
        store.put("p1".to_string(), 11, None);
        store.put("p1".to_string(), 3, None);

        assert!(store.is_valid());
        assert_eq!(store.store().get(&"p1".to_string()), Some(&3));
    }

    #[test]
    fn test_reject_leaves_store_unchanged() {
        let mut store = quantity_store(10);
        assert_eq!(store.put("unknown-p".to_string(), 1, None), None);
        assert!(store.store().is_empty());
        assert!(store.is_valid());
    }

    #[test]
    fn test_remove_clears_message() {
        let mut store = quantity_store(10);
        store.put("p1".to_string(), 11, None);
        assert_eq!(store.remove(&"p1".to_string()), Some(11));
        assert!(store.is_valid());
    }
}
