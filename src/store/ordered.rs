//! Generic bounded key-value store with a maintained id order and
//! synchronous change notification.

use crate::types::Timestamp;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::hash::Hash;

/// How many entries a store may hold.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Capacity {
    /// No limit.
    Unbounded,
    /// At most `n` entries. `Bounded(0)` turns `put` into a no-op.
    Bounded(usize),
}

impl Capacity {
    fn admits_any(&self) -> bool {
        !matches!(self, Capacity::Bounded(0))
    }

    fn limit(&self) -> Option<usize> {
        match self {
            Capacity::Unbounded => None,
            Capacity::Bounded(n) => Some(*n),
        }
    }
}

impl Default for Capacity {
    fn default() -> Self {
        Capacity::Unbounded
    }
}

/// Observer for store mutations. All methods default to no-ops.
///
/// Each mutating call that changes the store invokes exactly one of these
/// synchronously before returning. Capacity eviction is silent.
pub trait StoreListener<K, V>: Send + Sync {
    fn added(&self, _id: &K, _value: &V) {}
    fn updated(&self, _id: &K, _value: &V) {}
    fn removed(&self, _id: &K, _value: &V) {}
}

/// Id ordering function. Receives two ids and returns their relative order.
pub type Comparator<K> = Box<dyn Fn(&K, &K) -> Ordering + Send + Sync>;

struct Entry<V> {
    value: V,
    inserted_at: Timestamp,
}

/// Bounded, optionally-sorted `id -> value` store.
///
/// The id sequence is kept either in insertion order or under an injected
/// comparator. When capacity is exceeded, the newest insertion evicts the
/// entry currently last in sort order before growing further; with a
/// comparator that is the lowest-ranked id, without one it is the tail of
/// the insertion order, not strictly FIFO.
///
/// Invariants: an id appears in the sequence iff it has a live entry in the
/// value map; the sequence holds no duplicates; its length never exceeds
/// the configured capacity.
pub struct OrderedStore<K, V> {
    capacity: Capacity,
    entries: HashMap<K, Entry<V>>,
    order: Vec<K>,
    comparator: Option<Comparator<K>>,
    listener: Option<Box<dyn StoreListener<K, V>>>,
}

impl<K, V> OrderedStore<K, V>
where
    K: Eq + Hash + Clone,
{
    /// Create a store holding ids in insertion order, with no listener.
    pub fn new(capacity: Capacity) -> Self {
        Self {
            capacity,
            entries: HashMap::new(),
            order: Vec::new(),
            comparator: None,
            listener: None,
        }
    }

    /// Attach a change listener.
    pub fn with_listener(mut self, listener: Box<dyn StoreListener<K, V>>) -> Self {
        self.listener = Some(listener);
        self
    }

    /// Keep the id sequence sorted under `comparator` (stable, re-applied
    /// after every insert).
    pub fn with_comparator(mut self, comparator: Comparator<K>) -> Self {
        self.comparator = Some(comparator);
        self
    }

    /// Insert or update a value.
    ///
    /// A new id is appended to the sequence and fires `added`; an existing
    /// id is replaced in place and fires `updated`. A missing timestamp
    /// defaults to now. Returns the stored value, or `None` when the store
    /// has zero capacity.
    pub fn put(&mut self, id: K, value: V, timestamp: Option<Timestamp>) -> Option<&V> {
        if !self.capacity.admits_any() {
            return None;
        }
        let timestamp = timestamp.unwrap_or_else(Timestamp::now);

        let is_new = !self.entries.contains_key(&id);
        if is_new {
            if let Some(limit) = self.capacity.limit() {
                // Evict the tail of the pre-insert sequence so the new id
                // never pushes the length past capacity.
                if self.order.len() >= limit {
                    if let Some(victim) = self.order.pop() {
                        self.entries.remove(&victim);
                    }
                }
            }
        }

        self.entries.insert(
            id.clone(),
            Entry {
                value,
                inserted_at: timestamp,
            },
        );
        if is_new {
            self.order.push(id.clone());
        }

        if let Some(comparator) = &self.comparator {
            self.order.sort_by(|a, b| comparator(a, b));
        }

        let entry = self.entries.get(&id)?;
        if let Some(listener) = &self.listener {
            if is_new {
                listener.added(&id, &entry.value);
            } else {
                listener.updated(&id, &entry.value);
            }
        }
        Some(&entry.value)
    }

    /// Remove the entry for `id`, firing `removed`. No-op if absent.
    pub fn remove(&mut self, id: &K) -> Option<V> {
        let entry = self.entries.remove(id)?;
        if let Some(position) = self.order.iter().position(|existing| existing == id) {
            self.order.remove(position);
        }
        if let Some(listener) = &self.listener {
            listener.removed(id, &entry.value);
        }
        Some(entry.value)
    }

    /// Remove every entry, visiting a snapshot of the current sequence
    /// (removal mutates the live one).
    pub fn remove_all(&mut self) {
        let snapshot = self.order.clone();
        for id in &snapshot {
            self.remove(id);
        }
    }

    /// Look up a value.
    pub fn get(&self, id: &K) -> Option<&V> {
        self.entries.get(id).map(|entry| &entry.value)
    }

    /// The timestamp recorded when `id` was last put.
    pub fn timestamp_of(&self, id: &K) -> Option<Timestamp> {
        self.entries.get(id).map(|entry| entry.inserted_at)
    }

    /// Position of `id` in the current sequence.
    pub fn index_of(&self, id: &K) -> Option<usize> {
        self.order.iter().position(|existing| existing == id)
    }

    /// Visit every entry in current sequence order.
    pub fn for_each(&self, mut f: impl FnMut(&K, &V)) {
        for id in &self.order {
            if let Some(entry) = self.entries.get(id) {
                f(id, &entry.value);
            }
        }
    }

    /// Ids in current sequence order.
    pub fn ids(&self) -> &[K] {
        &self.order
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}
