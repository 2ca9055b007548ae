//! Bayeux session state machine and meta-event fan-out.

pub mod listeners;
pub mod manager;

pub use listeners::{ListenerKey, MetaEventListener};
pub use manager::{SessionConfig, SessionManager, SessionState, TokenProvider};
