//! Session manager owning the Bayeux connection state machine.

use crate::channels::registry::{ChannelDescriptor, ChannelRegistry};
use crate::replay::ReplayTracker;
use crate::session::listeners::{ListenerKey, ListenerSet, MetaEventListener};
use crate::transport::{
    BayeuxTransport, ListenerHandle, MetaCallback, MetaChannel, MetaMessage, TransportExtension,
    TransportOptions,
};
use parking_lot::Mutex;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

/// Default protocol/API version for the endpoint path.
pub const DEFAULT_API_VERSION: &str = "41.0";

/// Default name under which the replay extension is registered.
pub const DEFAULT_REPLAY_EXTENSION: &str = "ReplayFrom";

/// Zero-argument function returning the current bearer token. Invoked
/// fresh on every connect; the token is never cached across connect
/// cycles.
pub type TokenProvider = Arc<dyn Fn() -> String + Send + Sync>;

/// Session construction inputs.
#[derive(Clone)]
pub struct SessionConfig {
    /// Server root URL; the transport endpoint becomes
    /// `{server_url}/cometd/{api_version}`.
    pub server_url: String,

    /// Supplies the bearer token for the `Authorization` header.
    pub token_provider: TokenProvider,

    /// Protocol/API version segment of the endpoint path.
    pub api_version: String,

    /// Replay extension registration name; `None` disables replay
    /// negotiation altogether.
    pub replay_extension: Option<String>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            server_url: String::new(),
            token_provider: Arc::new(String::new),
            api_version: DEFAULT_API_VERSION.to_string(),
            replay_extension: Some(DEFAULT_REPLAY_EXTENSION.to_string()),
        }
    }
}

impl fmt::Debug for SessionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionConfig")
            .field("server_url", &self.server_url)
            .field("api_version", &self.api_version)
            .field("replay_extension", &self.replay_extension)
            .finish()
    }
}

/// Connection lifecycle state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionState {
    Disconnected,
    /// A handshake is in flight; re-entrant `connect()` calls are no-ops
    /// so meta listeners are never registered twice.
    Handshaking,
    Connected,
}

struct SessionInner {
    state: SessionState,
    registry: ChannelRegistry,
    listeners: ListenerSet,
    /// Live meta-listener handles; created on connect, drained on
    /// disconnect. Never allowed to leak past a disconnect cycle.
    meta_handles: Vec<ListenerHandle>,
}

/// Reconnection-aware pub/sub session over an injected Bayeux transport.
///
/// Owns the `DISCONNECTED -> HANDSHAKING -> CONNECTED -> DISCONNECTED`
/// state machine, wires meta-channel events to lifecycle callbacks, and
/// resubscribes every registered channel after each successful
/// (re)connect, injecting the latest replay cursors.
///
/// All transport callbacks are expected to arrive sequentially on one
/// event-processing thread; the interior locks exist so transports may
/// deliver from a thread of their own choosing, not for parallel
/// mutation.
pub struct SessionManager {
    config: SessionConfig,
    transport: Arc<dyn BayeuxTransport>,
    inner: Arc<Mutex<SessionInner>>,
    tracker: Arc<Mutex<ReplayTracker>>,
}

impl SessionManager {
    pub fn new(config: SessionConfig, transport: Arc<dyn BayeuxTransport>) -> Self {
        Self {
            config,
            transport,
            inner: Arc::new(Mutex::new(SessionInner {
                state: SessionState::Disconnected,
                registry: ChannelRegistry::new(),
                listeners: ListenerSet::new(),
                meta_handles: Vec::new(),
            })),
            tracker: Arc::new(Mutex::new(ReplayTracker::new())),
        }
    }

    /// Open a session. No-op unless currently disconnected.
    ///
    /// Registers the replay extension, defensively releases any stale
    /// subscriptions, installs the meta listeners exactly once, configures
    /// the endpoint with a freshly fetched token, and initiates the
    /// handshake. The outcome arrives via `/meta/handshake` and
    /// `/meta/connect`.
    pub fn connect(&self) {
        {
            let mut inner = self.inner.lock();
            if inner.state != SessionState::Disconnected {
                debug!(state = ?inner.state, "connect ignored");
                return;
            }

            if let Some(name) = &self.config.replay_extension {
                self.transport.unregister_extension(name);
                self.transport.register_extension(
                    name,
                    Arc::new(ReplayExtension {
                        tracker: Arc::clone(&self.tracker),
                    }),
                );
            }

            // Defensive reset: drop handles left over from a previous cycle.
            inner.registry.unsubscribe_all(self.transport.as_ref(), false);

            if inner.meta_handles.is_empty() {
                inner.meta_handles = self.install_meta_listeners();
            }

            let token = (self.config.token_provider)();
            self.transport.configure(TransportOptions {
                url: format!("{}/cometd/{}", self.config.server_url, self.config.api_version),
                authorization: format!("OAuth {token}"),
                websocket_enabled: false,
            });

            inner.state = SessionState::Handshaking;
            debug!(server_url = %self.config.server_url, "initiating handshake");
        }
        self.transport.handshake();
    }

    /// Close the session. No-op unless currently connected.
    ///
    /// The state flips to disconnected immediately; listener and
    /// subscription teardown happens when the disconnect confirmation
    /// arrives on `/meta/disconnect`.
    pub fn disconnect(&self) {
        {
            let mut inner = self.inner.lock();
            if inner.state != SessionState::Connected {
                return;
            }
            inner.state = SessionState::Disconnected;
        }
        debug!("disconnect requested");
        self.transport.disconnect();
    }

    /// Last known connectivity.
    pub fn is_connected(&self) -> bool {
        self.inner.lock().state == SessionState::Connected
    }

    pub fn state(&self) -> SessionState {
        self.inner.lock().state
    }

    /// Add a meta-event observer.
    pub fn add_listener(&self, listener: Arc<dyn MetaEventListener>) -> ListenerKey {
        self.inner.lock().listeners.add(listener)
    }

    /// Remove a meta-event observer. Unknown keys are a no-op returning
    /// `None`.
    pub fn remove_listener(&self, key: ListenerKey) -> Option<Arc<dyn MetaEventListener>> {
        self.inner.lock().listeners.remove(key)
    }

    /// Register a channel, replacing any descriptor of the same name.
    /// Subscribes immediately while connected; otherwise the subscription
    /// opens on the next successful connect. Returns false for a
    /// descriptor with an empty name, making no state change.
    pub fn register(&self, descriptor: ChannelDescriptor) -> bool {
        if descriptor.name.is_empty() {
            debug!("rejecting channel registration with empty name");
            return false;
        }
        let name = descriptor.name.clone();
        let cursor = descriptor.replay_from;

        let mut inner = self.inner.lock();
        // Cursor first: a connected register subscribes right away and the
        // outgoing subscribe message reads the cursor from the tracker.
        self.tracker.lock().set_cursor(&name, cursor);
        let connected = inner.state == SessionState::Connected;
        inner
            .registry
            .register(descriptor, self.transport.as_ref(), connected)
            .is_some()
    }

    /// Unregister a channel, releasing its subscription. Returns the
    /// removed descriptor, or `None` if the name was never registered.
    pub fn unregister(&self, name: &str) -> Option<ChannelDescriptor> {
        let mut inner = self.inner.lock();
        let connected = inner.state == SessionState::Connected;
        let removed = inner
            .registry
            .unregister(name, self.transport.as_ref(), connected);
        if removed.is_some() {
            self.tracker.lock().forget(name);
        }
        removed
    }

    pub fn is_subscribed(&self, name: &str) -> bool {
        self.inner.lock().registry.is_subscribed(name)
    }

    fn install_meta_listeners(&self) -> Vec<ListenerHandle> {
        let mut handles = Vec::with_capacity(6);

        // /meta/connect drives both directions of the state machine.
        {
            let inner = Arc::downgrade(&self.inner);
            let transport = Arc::clone(&self.transport);
            let callback: MetaCallback = Arc::new(move |message| {
                let Some(inner) = inner.upgrade() else { return };
                if transport.is_disconnected() {
                    handle_disconnected(&inner, transport.as_ref(), message);
                    return;
                }
                let connected = inner.lock().state == SessionState::Connected;
                if !connected && message.successful() {
                    handle_connected(&inner, transport.as_ref(), message);
                } else if connected && !message.successful() {
                    handle_disconnected(&inner, transport.as_ref(), message);
                }
            });
            handles.push(self.transport.add_listener(MetaChannel::Connect, callback));
        }

        {
            let inner = Arc::downgrade(&self.inner);
            let transport = Arc::clone(&self.transport);
            let callback: MetaCallback = Arc::new(move |message| {
                let Some(inner) = inner.upgrade() else { return };
                handle_disconnected(&inner, transport.as_ref(), message);
            });
            handles.push(
                self.transport
                    .add_listener(MetaChannel::Disconnect, callback),
            );
        }

        {
            let inner = Arc::downgrade(&self.inner);
            let tracker = Arc::clone(&self.tracker);
            let callback: MetaCallback = Arc::new(move |message| {
                let Some(inner) = inner.upgrade() else { return };
                let listeners = {
                    let mut guard = inner.lock();
                    // A failed handshake ends the attempt; a later
                    // connect() must be able to start a fresh one.
                    if !message.successful() && guard.state == SessionState::Handshaking {
                        guard.state = SessionState::Disconnected;
                    }
                    guard.listeners.snapshot()
                };
                if message.successful() {
                    tracker.lock().note_handshake(message);
                }
                for listener in listeners {
                    listener.on_handshake(message);
                }
            });
            handles.push(self.transport.add_listener(MetaChannel::Handshake, callback));
        }

        {
            let inner = Arc::downgrade(&self.inner);
            let callback: MetaCallback = Arc::new(move |message| {
                let Some(inner) = inner.upgrade() else { return };
                for listener in inner.lock().listeners.snapshot() {
                    listener.on_subscribe(message);
                }
            });
            handles.push(self.transport.add_listener(MetaChannel::Subscribe, callback));
        }

        {
            let inner = Arc::downgrade(&self.inner);
            let callback: MetaCallback = Arc::new(move |message| {
                let Some(inner) = inner.upgrade() else { return };
                for listener in inner.lock().listeners.snapshot() {
                    listener.on_unsubscribe(message);
                }
            });
            handles.push(
                self.transport
                    .add_listener(MetaChannel::Unsubscribe, callback),
            );
        }

        {
            let inner = Arc::downgrade(&self.inner);
            let callback: MetaCallback = Arc::new(move |message| {
                let Some(inner) = inner.upgrade() else { return };
                warn!(error = ?message.error(), "transport failure");
                for listener in inner.lock().listeners.snapshot() {
                    listener.on_failure(message);
                }
            });
            handles.push(
                self.transport
                    .add_listener(MetaChannel::Unsuccessful, callback),
            );
        }

        handles
    }
}

/// Successful `/meta/connect` while not yet connected: transition,
/// resubscribe every registered channel, then notify observers.
fn handle_connected(
    inner: &Arc<Mutex<SessionInner>>,
    transport: &dyn BayeuxTransport,
    message: &MetaMessage,
) {
    let listeners = {
        let mut guard = inner.lock();
        guard.state = SessionState::Connected;
        guard.registry.resubscribe_all(transport);
        guard.listeners.snapshot()
    };
    debug!("session connected");
    for listener in listeners {
        listener.on_connected(message);
    }
}

/// Terminal connect failure, disconnect confirmation, or a transport
/// reporting itself disconnected: release subscriptions (keeping the
/// descriptors for the next connect), tear down every meta listener, then
/// notify observers.
fn handle_disconnected(
    inner: &Arc<Mutex<SessionInner>>,
    transport: &dyn BayeuxTransport,
    message: &MetaMessage,
) {
    let listeners = {
        let mut guard = inner.lock();
        let was_connected = guard.state == SessionState::Connected;
        guard.registry.unsubscribe_all(transport, was_connected);
        for handle in guard.meta_handles.drain(..) {
            transport.remove_listener(handle);
        }
        guard.state = SessionState::Disconnected;
        guard.listeners.snapshot()
    };
    debug!("session disconnected");
    for listener in listeners {
        listener.on_disconnected(message);
    }
}

/// Replay negotiation hook.
///
/// Outgoing `/meta/subscribe` messages get `ext.replay` populated with the
/// current cursor for every registered channel; incoming handshake
/// responses record whether the server granted replay support.
struct ReplayExtension {
    tracker: Arc<Mutex<ReplayTracker>>,
}

impl TransportExtension for ReplayExtension {
    fn incoming(&self, message: &Value) {
        let channel = message.get("channel").and_then(Value::as_str);
        if channel == Some(MetaChannel::Handshake.as_str()) {
            let meta = MetaMessage::new(message.clone());
            if meta.replay_granted() {
                self.tracker.lock().mark_replay_supported();
            }
        }
    }

    fn outgoing(&self, message: &mut Value) {
        let channel = message.get("channel").and_then(Value::as_str);
        if channel != Some(MetaChannel::Subscribe.as_str()) {
            return;
        }

        let replay: serde_json::Map<String, Value> = {
            let tracker = self.tracker.lock();
            if !tracker.replay_supported() {
                return;
            }
            tracker
                .wire_cursors()
                .map(|(name, cursor)| (name.to_string(), Value::from(cursor)))
                .collect()
        };

        if let Some(object) = message.as_object_mut() {
            let ext = object
                .entry("ext")
                .or_insert_with(|| Value::Object(Default::default()));
            if let Some(ext) = ext.as_object_mut() {
                ext.insert("replay".to_string(), Value::Object(replay));
            }
        }
    }
}
