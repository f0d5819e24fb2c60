//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing controller events to the ESP-IDF
//! logger (UART0 console in production). This is the diagnostic output; it
//! never shares the command channel.

use log::{error, info, warn};

use crate::app::commands::LockCommand;
use crate::app::events::LockEvent;
use crate::app::ports::EventSink;

/// Adapter that logs every [`LockEvent`] to the serial console.
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl Default for LogEventSink {
    fn default() -> Self {
        Self::new()
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &LockEvent) {
        match event {
            LockEvent::ChannelStarted { device_name } => {
                info!("START | channel up as '{}'", device_name);
            }
            LockEvent::ChannelFailed(e) => {
                error!("START | channel failed: {} (controller inert)", e);
            }
            LockEvent::CommandReceived(line) => {
                info!("RECV  | {:?}", line.as_str());
            }
            LockEvent::CommandClassified(LockCommand::Unlock) => {
                info!("CMD   | unlock command received");
            }
            LockEvent::CommandClassified(LockCommand::Unknown) => {
                info!("CMD   | unknown command");
            }
            LockEvent::PulseStarted { duration_ms } => {
                info!("PULSE | energized for {}ms", duration_ms);
            }
            LockEvent::PulseEnded => {
                info!("PULSE | released");
            }
            LockEvent::ActuatorFault(e) => {
                error!("FAULT | {}", e);
            }
            LockEvent::ReplyFailed { reply, error } => {
                warn!("REPLY | '{}' not delivered: {}", reply, error);
            }
        }
    }
}
