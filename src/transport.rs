//! Transport abstraction over a Bayeux/CometD long-polling client.
//!
//! The session layer never implements the wire protocol itself; a pluggable
//! client implementing [`BayeuxTransport`] is injected at construction time.
//! Implementations must deliver callbacks *after* the initiating call
//! returns (the session layer assumes the single-threaded, event-driven
//! dispatch model of CometD clients), and must tolerate a listener removing
//! itself or its siblings while a message is being dispatched.

use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// Callback for data-channel messages, invoked with the raw JSON envelope.
pub type MessageCallback = Arc<dyn Fn(&Value) + Send + Sync>;

/// Callback for meta-channel messages.
pub type MetaCallback = Arc<dyn Fn(&MetaMessage) + Send + Sync>;

/// Reserved Bayeux lifecycle channels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MetaChannel {
    Handshake,
    Connect,
    Disconnect,
    Subscribe,
    Unsubscribe,
    Unsuccessful,
}

impl MetaChannel {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetaChannel::Handshake => "/meta/handshake",
            MetaChannel::Connect => "/meta/connect",
            MetaChannel::Disconnect => "/meta/disconnect",
            MetaChannel::Subscribe => "/meta/subscribe",
            MetaChannel::Unsubscribe => "/meta/unsubscribe",
            MetaChannel::Unsuccessful => "/meta/unsuccessful",
        }
    }
}

impl fmt::Display for MetaChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A meta-channel message: a parsed view over the raw Bayeux JSON.
///
/// Listeners receive the full raw message; the accessors cover the fields
/// the session layer itself inspects.
#[derive(Clone, Debug)]
pub struct MetaMessage {
    raw: Value,
}

impl MetaMessage {
    pub fn new(raw: Value) -> Self {
        Self { raw }
    }

    /// The channel this message was published on, if present.
    pub fn channel(&self) -> Option<&str> {
        self.raw.get("channel").and_then(Value::as_str)
    }

    /// Whether the server reported the operation as successful.
    /// A missing `successful` field reads as false.
    pub fn successful(&self) -> bool {
        self.raw
            .get("successful")
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }

    /// Transport-provided error detail, if any.
    pub fn error(&self) -> Option<&str> {
        self.raw.get("error").and_then(Value::as_str)
    }

    /// The protocol extension block, if any.
    pub fn ext(&self) -> Option<&Value> {
        self.raw.get("ext")
    }

    /// True when the handshake extension block grants replay support.
    pub fn replay_granted(&self) -> bool {
        self.ext()
            .and_then(|ext| ext.get("replay"))
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }

    /// The raw message.
    pub fn raw(&self) -> &Value {
        &self.raw
    }
}

/// Opaque token for an active channel subscription.
///
/// Owned exclusively by the channel registry; released on unsubscribe or
/// disconnect.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SubscriptionHandle(pub u64);

/// Opaque token for an installed meta-channel listener.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ListenerHandle(pub u64);

/// Endpoint configuration handed to the transport before a handshake.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransportOptions {
    /// Full endpoint URL (server root plus versioned path).
    pub url: String,

    /// Value for the outbound `Authorization` header.
    pub authorization: String,

    /// Whether the transport may upgrade to websockets. The session layer
    /// pins this to false and relies on long polling.
    pub websocket_enabled: bool,
}

/// A protocol extension hooked into the transport's message pipeline.
pub trait TransportExtension: Send + Sync {
    /// Called once when the extension is registered.
    fn registered(&self, _name: &str) {}

    /// Inspect a message arriving from the server.
    fn incoming(&self, _message: &Value) {}

    /// Amend a message about to be sent to the server.
    fn outgoing(&self, _message: &mut Value) {}
}

/// A Bayeux-style pub/sub client.
///
/// All methods take `&self`; implementations are expected to use interior
/// mutability, as CometD client objects do. No method blocks on a network
/// round-trip; results arrive via the registered callbacks.
pub trait BayeuxTransport: Send + Sync {
    /// Set the endpoint and request headers for subsequent handshakes.
    fn configure(&self, options: TransportOptions);

    /// Initiate the Bayeux handshake. Outcome is reported on
    /// `/meta/handshake` and `/meta/connect`.
    fn handshake(&self);

    /// Ask the server to close the session. Confirmation arrives on
    /// `/meta/disconnect`.
    fn disconnect(&self);

    /// Subscribe to a data channel. Messages are delivered to `callback`.
    fn subscribe(&self, channel: &str, callback: MessageCallback) -> SubscriptionHandle;

    /// Release a channel subscription.
    fn unsubscribe(&self, handle: SubscriptionHandle);

    /// Install a listener on a meta channel.
    fn add_listener(&self, channel: MetaChannel, callback: MetaCallback) -> ListenerHandle;

    /// Remove a meta-channel listener. Unknown handles are a no-op.
    fn remove_listener(&self, handle: ListenerHandle);

    /// Hook an extension into the message pipeline under a unique name.
    fn register_extension(&self, name: &str, extension: Arc<dyn TransportExtension>);

    /// Remove a previously registered extension. Unknown names are a no-op.
    fn unregister_extension(&self, name: &str);

    /// Whether the underlying client considers itself disconnected.
    fn is_disconnected(&self) -> bool;
}
