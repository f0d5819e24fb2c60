//! Outbound diagnostic events.
//!
//! The [`LockController`](super::service::LockController) emits these through
//! the [`EventSink`](super::ports::EventSink) port. They are informational
//! only and never travel over the command channel.

use crate::channel::Line;
use crate::config::DeviceName;
use crate::error::{ActuatorError, ChannelError};

use super::commands::LockCommand;

#[derive(Debug, Clone, PartialEq)]
pub enum LockEvent {
    /// The command channel is up and advertising.
    ChannelStarted { device_name: DeviceName },

    /// The command channel failed to start; the controller stays inert.
    ChannelFailed(ChannelError),

    /// A complete line arrived (already stripped of `\n`, not yet trimmed).
    CommandReceived(Line),

    /// The line was classified.
    CommandClassified(LockCommand),

    /// The solenoid was energized.
    PulseStarted { duration_ms: u32 },

    /// The solenoid was released.
    PulseEnded,

    /// A pin write failed.
    ActuatorFault(ActuatorError),

    /// The reply could not be sent. Not retried.
    ReplyFailed {
        reply: &'static str,
        error: ChannelError,
    },
}
