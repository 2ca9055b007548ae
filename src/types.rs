//! Core types for the change-data-capture session layer.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

/// Milliseconds since Unix epoch.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Timestamp(pub i64);

impl Timestamp {
    /// Current time.
    pub fn now() -> Self {
        let duration = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("Time went backwards");
        Timestamp(duration.as_millis() as i64)
    }
}

impl fmt::Debug for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Timestamp({})", self.0)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Where a channel subscription resumes in the event stream.
///
/// Encoded on the wire as a signed integer: -1 for new events only,
/// -2 for events from the last 24 hours, >= 0 for an explicit cursor.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReplayPosition {
    /// Only events published after the subscription (-1).
    NewOnly,
    /// Events from the retention window, typically 24 hours (-2).
    Last24Hours,
    /// Events after the given replay cursor.
    After(u64),
}

impl ReplayPosition {
    /// Wire integer for this position.
    pub fn as_wire(&self) -> i64 {
        match self {
            ReplayPosition::NewOnly => -1,
            ReplayPosition::Last24Hours => -2,
            ReplayPosition::After(cursor) => *cursor as i64,
        }
    }

    /// Parse a wire integer. Anything below -2 is rejected.
    pub fn from_wire(value: i64) -> Option<Self> {
        match value {
            -1 => Some(ReplayPosition::NewOnly),
            -2 => Some(ReplayPosition::Last24Hours),
            v if v >= 0 => Some(ReplayPosition::After(v as u64)),
            _ => None,
        }
    }
}

impl Default for ReplayPosition {
    fn default() -> Self {
        ReplayPosition::NewOnly
    }
}

/// Kind of change a CDC event describes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChangeType {
    Create,
    Update,
    Delete,
}

impl ChangeType {
    /// Parse the wire header value. Unrecognized types yield `None`
    /// (the dispatcher drops those messages silently).
    pub fn from_wire(value: &str) -> Option<Self> {
        match value {
            "CREATE" => Some(ChangeType::Create),
            "UPDATE" => Some(ChangeType::Update),
            "DELETE" => Some(ChangeType::Delete),
            _ => None,
        }
    }
}

impl fmt::Display for ChangeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChangeType::Create => write!(f, "CREATE"),
            ChangeType::Update => write!(f, "UPDATE"),
            ChangeType::Delete => write!(f, "DELETE"),
        }
    }
}

/// A decoded change-data-capture event.
///
/// Immutable once constructed; lives for the duration of one listener
/// dispatch. The change-event header is stripped from `payload`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChangeEvent {
    /// Commit time of the change.
    pub timestamp: Timestamp,

    /// Name of the backend entity that changed.
    pub entity_name: String,

    /// Id of the first affected record.
    pub record_id: String,

    /// What kind of change happened.
    pub change_type: ChangeType,

    /// Changed field values, header removed.
    pub payload: serde_json::Map<String, serde_json::Value>,
}
