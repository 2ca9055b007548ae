//! # Changefeed
//!
//! A reconnection-aware publish/subscribe session layer for
//! change-data-capture feeds over Bayeux/CometD long-polling transports.
//!
//! ## Core Concepts
//!
//! - **SessionManager**: owns the handshake/connect/disconnect state
//!   machine and fans meta-channel events out to lifecycle listeners
//! - **ChannelRegistry**: one descriptor per channel name, (re)subscribed
//!   idempotently across reconnects
//! - **ReplayTracker**: per-channel replay cursors attached to outgoing
//!   subscribes once the server grants the replay extension
//! - **OrderedStore**: bounded, optionally-sorted record storage with
//!   synchronous change notification, fed by channel listeners
//!
//! The wire protocol itself is out of scope: a client implementing
//! [`BayeuxTransport`] is injected at construction time.
//!
//! ## Example
//!
//! ```ignore
//! use changefeed::{
//!     ChannelDescriptor, ReplayPosition, SessionConfig, SessionManager,
//! };
//! use std::sync::Arc;
//!
//! let session = SessionManager::new(
//!     SessionConfig {
//!         server_url: "https://example.my.salesforce.com".into(),
//!         token_provider: Arc::new(|| current_session_token()),
//!         ..Default::default()
//!     },
//!     transport,
//! );
//!
//! session.register(
//!     ChannelDescriptor::new("/data/Products__ChangeEvent", ReplayPosition::Last24Hours)
//!         .with_listener(Arc::new(product_listener)),
//! );
//! session.connect();
//! ```

pub mod channels;
pub mod error;
pub mod replay;
pub mod session;
pub mod store;
pub mod transport;
pub mod types;

// Re-exports
pub use channels::{decode_change_event, ChangeEventListener, ChannelDescriptor, ChannelRegistry};
pub use error::{Result, SessionError};
pub use replay::ReplayTracker;
pub use session::{
    ListenerKey, MetaEventListener, SessionConfig, SessionManager, SessionState, TokenProvider,
};
pub use store::{Capacity, Comparator, OrderedStore, StoreListener, ValidatedStore, Validation, Validator};
pub use transport::{
    BayeuxTransport, ListenerHandle, MessageCallback, MetaCallback, MetaChannel, MetaMessage,
    SubscriptionHandle, TransportExtension, TransportOptions,
};
pub use types::{ChangeEvent, ChangeType, ReplayPosition, Timestamp};
