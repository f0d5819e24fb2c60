//! Transport abstraction: any byte-oriented serial channel.
//!
//! Concrete implementations:
//! - Bluetooth Classic SPP ([`crate::adapters::spp`])
//! - UART ([`crate::adapters::uart`])
//!
//! [`LineChannel`](super::LineChannel) is generic over `Transport`, so adding
//! a new transport requires zero changes to framing or dispatch.

use crate::error::ChannelError;

/// Byte-oriented transport channel.
pub trait Transport {
    /// Bring the transport up and advertise it as `device_name` where the
    /// medium has a notion of names. Called once.
    fn open(&mut self, device_name: &str) -> Result<(), ChannelError>;

    /// Read up to `buf.len()` bytes into `buf`.
    /// Returns 0 if no data is available (non-blocking).
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, ChannelError>;

    /// Write `data`, returning the number of bytes accepted.
    fn write(&mut self, data: &[u8]) -> Result<usize, ChannelError>;

    /// Flush any buffered output.
    fn flush(&mut self) -> Result<(), ChannelError>;

    /// Check if data is available for reading.
    fn available(&self) -> bool;
}
