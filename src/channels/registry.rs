//! Channel registry: descriptors and their live subscriptions.

use crate::channels::dispatch::{dispatch_message, ChangeEventListener};
use crate::transport::{BayeuxTransport, MessageCallback, SubscriptionHandle};
use crate::types::ReplayPosition;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// A registered channel: name, replay position, and an optional listener
/// for decoded change events. At most one descriptor exists per name.
#[derive(Clone)]
pub struct ChannelDescriptor {
    pub name: String,
    pub replay_from: ReplayPosition,
    pub listener: Option<Arc<dyn ChangeEventListener>>,
}

impl ChannelDescriptor {
    pub fn new(name: impl Into<String>, replay_from: ReplayPosition) -> Self {
        Self {
            name: name.into(),
            replay_from,
            listener: None,
        }
    }

    pub fn with_listener(mut self, listener: Arc<dyn ChangeEventListener>) -> Self {
        self.listener = Some(listener);
        self
    }
}

impl fmt::Debug for ChannelDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChannelDescriptor")
            .field("name", &self.name)
            .field("replay_from", &self.replay_from)
            .field("listener", &self.listener.is_some())
            .finish()
    }
}

/// Maps channel names to descriptors and mediates (re)subscription.
///
/// Each channel moves `UNSUBSCRIBED -> SUBSCRIBED -> UNSUBSCRIBED`.
/// Disconnects suspend subscriptions but keep descriptors, so a later
/// reconnect resubscribes automatically; only `unregister` forgets a
/// channel.
pub struct ChannelRegistry {
    descriptors: HashMap<String, ChannelDescriptor>,
    subscriptions: HashMap<String, SubscriptionHandle>,
}

impl ChannelRegistry {
    pub fn new() -> Self {
        Self {
            descriptors: HashMap::new(),
            subscriptions: HashMap::new(),
        }
    }

    /// Store a descriptor, replacing (and unsubscribing) any existing one
    /// with the same name. Subscribes immediately when the session is
    /// connected. Rejects descriptors with an empty name by returning
    /// `None` and making no state change.
    pub fn register(
        &mut self,
        descriptor: ChannelDescriptor,
        transport: &dyn BayeuxTransport,
        connected: bool,
    ) -> Option<&ChannelDescriptor> {
        if descriptor.name.is_empty() {
            return None;
        }
        let name = descriptor.name.clone();
        self.unregister(&name, transport, connected);
        self.descriptors.insert(name.clone(), descriptor);
        if connected {
            self.subscribe_channel(transport, &name);
        }
        self.descriptors.get(&name)
    }

    /// Remove a descriptor, releasing its subscription first. The
    /// transport unsubscribe is only issued while connected; the handle is
    /// dropped either way. Returns the removed descriptor.
    pub fn unregister(
        &mut self,
        name: &str,
        transport: &dyn BayeuxTransport,
        connected: bool,
    ) -> Option<ChannelDescriptor> {
        if let Some(handle) = self.subscriptions.remove(name) {
            if connected {
                transport.unsubscribe(handle);
            }
        }
        self.descriptors.remove(name)
    }

    pub fn is_subscribed(&self, name: &str) -> bool {
        self.subscriptions.contains_key(name)
    }

    pub fn is_registered(&self, name: &str) -> bool {
        self.descriptors.contains_key(name)
    }

    pub fn subscribed_count(&self) -> usize {
        self.subscriptions.len()
    }

    pub fn registered_count(&self) -> usize {
        self.descriptors.len()
    }

    /// Names of every registered channel, in no particular order.
    pub fn channel_names(&self) -> Vec<&str> {
        self.descriptors.keys().map(String::as_str).collect()
    }

    /// Subscribe every registered descriptor. Called after each successful
    /// (re)connect; already-subscribed channels are left alone.
    pub fn resubscribe_all(&mut self, transport: &dyn BayeuxTransport) {
        let names: Vec<String> = self.descriptors.keys().cloned().collect();
        for name in names {
            self.subscribe_channel(transport, &name);
        }
    }

    /// Release every live subscription, keeping the descriptors for a
    /// later reconnect.
    pub fn unsubscribe_all(&mut self, transport: &dyn BayeuxTransport, connected: bool) {
        for (name, handle) in self.subscriptions.drain() {
            if connected {
                transport.unsubscribe(handle);
            }
            debug!(channel = %name, "released subscription");
        }
    }

    fn subscribe_channel(&mut self, transport: &dyn BayeuxTransport, name: &str) {
        if self.subscriptions.contains_key(name) {
            return;
        }
        let Some(descriptor) = self.descriptors.get(name) else {
            return;
        };

        let listener = descriptor.listener.clone();
        let channel = name.to_string();
        let callback: MessageCallback = Arc::new(move |message| {
            if let Some(listener) = &listener {
                dispatch_message(&channel, listener.as_ref(), message);
            }
        });

        let handle = transport.subscribe(name, callback);
        self.subscriptions.insert(name.to_string(), handle);
        debug!(channel = name, "subscribed");
    }
}

impl Default for ChannelRegistry {
    fn default() -> Self {
        Self::new()
    }
}
