//! Ordered, bounded, change-notifying storage for streamed records.

pub mod ordered;
pub mod validated;

pub use ordered::{Capacity, Comparator, OrderedStore, StoreListener};
pub use validated::{ValidatedStore, Validation, Validator};
