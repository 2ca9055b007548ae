//! Meta-event observer interface and the session's listener set.

use crate::transport::MetaMessage;
use std::sync::Arc;

/// Observer of session lifecycle events, one method per meta channel.
/// Every method is optional and defaults to a no-op; each receives the
/// raw meta message that triggered it.
pub trait MetaEventListener: Send + Sync {
    fn on_connected(&self, _message: &MetaMessage) {}
    fn on_disconnected(&self, _message: &MetaMessage) {}
    fn on_handshake(&self, _message: &MetaMessage) {}
    fn on_subscribe(&self, _message: &MetaMessage) {}
    fn on_unsubscribe(&self, _message: &MetaMessage) {}
    fn on_failure(&self, _message: &MetaMessage) {}
}

/// Token identifying an added listener, used for removal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ListenerKey(u64);

/// Ordered set of meta-event listeners. Fan-out preserves insertion order.
pub(crate) struct ListenerSet {
    listeners: Vec<(ListenerKey, Arc<dyn MetaEventListener>)>,
    next_key: u64,
}

impl ListenerSet {
    pub fn new() -> Self {
        Self {
            listeners: Vec::new(),
            next_key: 1,
        }
    }

    pub fn add(&mut self, listener: Arc<dyn MetaEventListener>) -> ListenerKey {
        let key = ListenerKey(self.next_key);
        self.next_key += 1;
        self.listeners.push((key, listener));
        key
    }

    /// Remove by key. Unknown keys are a no-op returning `None`.
    pub fn remove(&mut self, key: ListenerKey) -> Option<Arc<dyn MetaEventListener>> {
        let position = self.listeners.iter().position(|(k, _)| *k == key)?;
        Some(self.listeners.remove(position).1)
    }

    /// Current listeners, cloned so callers can fan out without holding
    /// the session lock.
    pub fn snapshot(&self) -> Vec<Arc<dyn MetaEventListener>> {
        self.listeners
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect()
    }
}
