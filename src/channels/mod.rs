//! Channel registration and change-event dispatch.

pub mod dispatch;
pub mod registry;

pub use dispatch::{decode_change_event, ChangeEventListener};
pub use registry::{ChannelDescriptor, ChannelRegistry};
