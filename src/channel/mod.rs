//! Command channel: line-oriented text over a byte transport.
//!
//! ```text
//!   Transport (SPP / UART / mock) ──bytes──▶ LineBuffer ──lines──▶ LockController
//!                                 ◀──"OK\n" / "ERR\n"──────────────┘
//! ```
//!
//! [`CommandChannel`] is the capability the controller depends on;
//! [`LineChannel`] implements it for any [`Transport`].

pub mod line;
pub mod transport;

use log::{info, warn};

use crate::config::MAX_DEVICE_NAME_LEN;
use crate::error::ChannelError;

pub use line::{Line, LineBuffer};
pub use transport::Transport;

/// Line-delimited command channel.
pub trait CommandChannel {
    /// Start the channel and advertise it under `device_name`.
    /// Not retried by callers; a failure leaves the channel inert.
    fn begin(&mut self, device_name: &str) -> Result<(), ChannelError>;

    /// Whether at least one complete line is waiting.
    fn available(&mut self) -> bool;

    /// Take the next complete line, without its `\n`.
    fn read_line(&mut self) -> Option<Line>;

    /// Send `text` followed by `\n`. Best effort, no acknowledgement.
    fn send_line(&mut self, text: &str) -> Result<(), ChannelError>;
}

/// [`CommandChannel`] over any byte [`Transport`].
pub struct LineChannel<T: Transport> {
    transport: T,
    lines: LineBuffer,
    started: bool,
}

impl<T: Transport> LineChannel<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            lines: LineBuffer::new(),
            started: false,
        }
    }

    pub fn is_started(&self) -> bool {
        self.started
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Move bytes from the transport into the line buffer until a line is
    /// complete. Stops early so unread commands stay queued in the transport.
    fn pump(&mut self) {
        let mut byte = [0u8; 1];
        while !self.lines.has_line() && self.transport.available() {
            match self.transport.read(&mut byte) {
                Ok(0) => break,
                Ok(_) => self.lines.push_byte(byte[0]),
                Err(e) => {
                    warn!("Channel: read failed ({})", e);
                    break;
                }
            }
        }
    }

    fn write_all(&mut self, mut data: &[u8]) -> Result<(), ChannelError> {
        while !data.is_empty() {
            match self.transport.write(data)? {
                0 => return Err(ChannelError::WriteFailed),
                n => data = &data[n.min(data.len())..],
            }
        }
        Ok(())
    }
}

impl<T: Transport> CommandChannel for LineChannel<T> {
    fn begin(&mut self, device_name: &str) -> Result<(), ChannelError> {
        if device_name.is_empty() || device_name.len() > MAX_DEVICE_NAME_LEN {
            return Err(ChannelError::InvalidName);
        }
        self.transport.open(device_name)?;
        self.lines.clear();
        self.started = true;
        info!("Channel: started as '{}'", device_name);
        Ok(())
    }

    fn available(&mut self) -> bool {
        if !self.started {
            return false;
        }
        self.pump();
        self.lines.has_line()
    }

    fn read_line(&mut self) -> Option<Line> {
        if !self.started {
            return None;
        }
        self.pump();
        self.lines.pop_line()
    }

    fn send_line(&mut self, text: &str) -> Result<(), ChannelError> {
        if !self.started {
            return Err(ChannelError::NotStarted);
        }
        self.write_all(text.as_bytes())?;
        self.write_all(b"\n")?;
        self.transport.flush()
    }
}
