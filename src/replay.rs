//! Replay cursor tracking for channel resubscription.

use crate::transport::MetaMessage;
use crate::types::ReplayPosition;
use std::collections::HashMap;
use tracing::debug;

/// Tracks, per channel, the replay cursor to send on the next subscribe,
/// and whether the server granted replay support.
///
/// Cursors are fixed at registration time; the server advances its own
/// position once a subscription is live, so nothing here moves them
/// post-subscribe. The grant is a single session-wide flag negotiated on
/// the initial handshake. It starts enabled and a handshake response
/// carrying `ext.replay: true` confirms it.
pub struct ReplayTracker {
    cursors: HashMap<String, ReplayPosition>,
    replay_supported: bool,
}

impl ReplayTracker {
    pub fn new() -> Self {
        Self {
            cursors: HashMap::new(),
            replay_supported: true,
        }
    }

    /// Record the cursor a channel should resubscribe from.
    pub fn set_cursor(&mut self, channel: impl Into<String>, position: ReplayPosition) {
        self.cursors.insert(channel.into(), position);
    }

    /// The cursor for a channel; unknown channels replay nothing.
    pub fn cursor_for(&self, channel: &str) -> ReplayPosition {
        self.cursors.get(channel).copied().unwrap_or_default()
    }

    /// Drop the cursor for an unregistered channel.
    pub fn forget(&mut self, channel: &str) {
        self.cursors.remove(channel);
    }

    /// Channel names with a recorded cursor, with their wire values.
    pub fn wire_cursors(&self) -> impl Iterator<Item = (&str, i64)> {
        self.cursors
            .iter()
            .map(|(name, position)| (name.as_str(), position.as_wire()))
    }

    /// Mark the server as having granted replay support. Set once; never
    /// cleared for the lifetime of the tracker.
    pub fn mark_replay_supported(&mut self) {
        self.replay_supported = true;
    }

    pub fn replay_supported(&self) -> bool {
        self.replay_supported
    }

    /// Inspect a handshake response for the replay grant.
    pub fn note_handshake(&mut self, message: &MetaMessage) {
        if message.successful() && message.replay_granted() {
            debug!("server granted replay support");
            self.mark_replay_supported();
        }
    }
}

impl Default for ReplayTracker {
    fn default() -> Self {
        Self::new()
    }
}
