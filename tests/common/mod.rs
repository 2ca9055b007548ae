//! Scripted in-memory Bayeux transport for session tests.

// Each test binary uses a different slice of the harness.
#![allow(dead_code)]

use changefeed::{
    BayeuxTransport, ListenerHandle, MessageCallback, MetaCallback, MetaChannel, MetaMessage,
    SubscriptionHandle, TransportExtension, TransportOptions,
};
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::sync::Arc;

#[derive(Default)]
struct State {
    next_id: u64,
    configured: Vec<TransportOptions>,
    listeners: Vec<(ListenerHandle, MetaChannel, MetaCallback)>,
    subscriptions: Vec<(SubscriptionHandle, String, MessageCallback)>,
    extensions: Vec<(String, Arc<dyn TransportExtension>)>,
    handshake_count: u64,
    disconnect_requests: u64,
    reports_disconnected: bool,
    /// Outgoing subscribe messages after extension processing.
    subscribe_messages: Vec<Value>,
}

/// Transport test double. Records every call; nothing happens until the
/// test pumps a message through `deliver_meta`/`deliver_message`.
///
/// Callbacks are invoked with no internal lock held, so listeners may
/// re-enter the transport (remove listeners, subscribe) mid-dispatch,
/// matching the contract real clients provide.
#[derive(Default)]
pub struct MockTransport {
    state: Mutex<State>,
}

impl MockTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    // --- Scripting ---

    /// Deliver a raw message on a meta channel to every matching listener.
    /// Runs extension `incoming` hooks first, as a real client would.
    pub fn deliver_meta(&self, channel: MetaChannel, raw: Value) {
        let (extensions, callbacks) = {
            let state = self.state.lock();
            let extensions: Vec<_> = state.extensions.iter().map(|(_, e)| Arc::clone(e)).collect();
            let callbacks: Vec<_> = state
                .listeners
                .iter()
                .filter(|(_, c, _)| *c == channel)
                .map(|(_, _, callback)| Arc::clone(callback))
                .collect();
            (extensions, callbacks)
        };

        for extension in &extensions {
            extension.incoming(&raw);
        }
        let message = MetaMessage::new(raw);
        for callback in callbacks {
            callback(&message);
        }
    }

    /// Deliver a raw envelope to every subscriber of a data channel.
    pub fn deliver_message(&self, channel: &str, raw: Value) {
        let callbacks: Vec<_> = {
            let state = self.state.lock();
            state
                .subscriptions
                .iter()
                .filter(|(_, name, _)| name == channel)
                .map(|(_, _, callback)| Arc::clone(callback))
                .collect()
        };
        for callback in callbacks {
            callback(&raw);
        }
    }

    /// Deliver a `/meta/handshake` response, optionally granting replay.
    pub fn complete_handshake(&self, successful: bool, replay: bool) {
        self.deliver_meta(
            MetaChannel::Handshake,
            json!({
                "channel": "/meta/handshake",
                "successful": successful,
                "ext": {"replay": replay},
            }),
        );
    }

    /// Deliver a `/meta/connect` response.
    pub fn deliver_connect(&self, successful: bool) {
        self.deliver_meta(
            MetaChannel::Connect,
            json!({"channel": "/meta/connect", "successful": successful}),
        );
    }

    /// Deliver a `/meta/disconnect` confirmation.
    pub fn deliver_disconnect(&self) {
        self.deliver_meta(
            MetaChannel::Disconnect,
            json!({"channel": "/meta/disconnect", "successful": true}),
        );
    }

    pub fn set_reports_disconnected(&self, value: bool) {
        self.state.lock().reports_disconnected = value;
    }

    // --- Inspection ---

    pub fn configured(&self) -> Vec<TransportOptions> {
        self.state.lock().configured.clone()
    }

    pub fn handshake_count(&self) -> u64 {
        self.state.lock().handshake_count
    }

    pub fn disconnect_requests(&self) -> u64 {
        self.state.lock().disconnect_requests
    }

    pub fn listener_count(&self) -> usize {
        self.state.lock().listeners.len()
    }

    pub fn subscribed_channels(&self) -> Vec<String> {
        self.state
            .lock()
            .subscriptions
            .iter()
            .map(|(_, name, _)| name.clone())
            .collect()
    }

    /// Outgoing `/meta/subscribe` messages, extension fields included.
    pub fn subscribe_messages(&self) -> Vec<Value> {
        self.state.lock().subscribe_messages.clone()
    }
}

impl BayeuxTransport for MockTransport {
    fn configure(&self, options: TransportOptions) {
        self.state.lock().configured.push(options);
    }

    fn handshake(&self) {
        self.state.lock().handshake_count += 1;
    }

    fn disconnect(&self) {
        self.state.lock().disconnect_requests += 1;
    }

    fn subscribe(&self, channel: &str, callback: MessageCallback) -> SubscriptionHandle {
        let mut state = self.state.lock();
        state.next_id += 1;
        let handle = SubscriptionHandle(state.next_id);

        let mut outgoing = json!({
            "channel": "/meta/subscribe",
            "subscription": channel,
        });
        let extensions: Vec<_> = state.extensions.iter().map(|(_, e)| Arc::clone(e)).collect();
        drop(state);
        for extension in &extensions {
            extension.outgoing(&mut outgoing);
        }

        let mut state = self.state.lock();
        state.subscribe_messages.push(outgoing);
        state
            .subscriptions
            .push((handle, channel.to_string(), callback));
        handle
    }

    fn unsubscribe(&self, handle: SubscriptionHandle) {
        self.state.lock().subscriptions.retain(|(h, _, _)| *h != handle);
    }

    fn add_listener(&self, channel: MetaChannel, callback: MetaCallback) -> ListenerHandle {
        let mut state = self.state.lock();
        state.next_id += 1;
        let handle = ListenerHandle(state.next_id);
        state.listeners.push((handle, channel, callback));
        handle
    }

    fn remove_listener(&self, handle: ListenerHandle) {
        self.state.lock().listeners.retain(|(h, _, _)| *h != handle);
    }

    fn register_extension(&self, name: &str, extension: Arc<dyn TransportExtension>) {
        let mut state = self.state.lock();
        state.extensions.retain(|(n, _)| n != name);
        state.extensions.push((name.to_string(), extension));
    }

    fn unregister_extension(&self, name: &str) {
        self.state.lock().extensions.retain(|(n, _)| n != name);
    }

    fn is_disconnected(&self) -> bool {
        self.state.lock().reports_disconnected
    }
}
