//! Unified error types for the lock firmware.
//!
//! A single `Error` enum that every subsystem converts into, keeping the
//! command loop's error handling uniform. All variants are `Copy` so they can
//! be passed through the controller and event sink without allocation.

use core::fmt;

// ---------------------------------------------------------------------------
// Top-level firmware error
// ---------------------------------------------------------------------------

/// Every fallible operation in the firmware funnels into this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// The lock output pin could not be driven.
    Actuator(ActuatorError),
    /// The command channel failed to start or to send.
    Channel(ChannelError),
    /// Configuration is invalid.
    Config(ConfigError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Actuator(e) => write!(f, "actuator: {e}"),
            Self::Channel(e) => write!(f, "channel: {e}"),
            Self::Config(e) => write!(f, "config: {e}"),
        }
    }
}

impl core::error::Error for Error {}

// ---------------------------------------------------------------------------
// Actuator errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActuatorError {
    /// Driving the pin high failed.
    EnergizeFailed,
    /// Driving the pin low failed. The lock may still be powered.
    DeEnergizeFailed,
    /// A pulse was requested while another one is in progress.
    PulseInProgress,
}

impl fmt::Display for ActuatorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EnergizeFailed => write!(f, "GPIO write (energize) failed"),
            Self::DeEnergizeFailed => write!(f, "GPIO write (de-energize) failed"),
            Self::PulseInProgress => write!(f, "pulse already in progress"),
        }
    }
}

impl core::error::Error for ActuatorError {}

impl From<ActuatorError> for Error {
    fn from(e: ActuatorError) -> Self {
        Self::Actuator(e)
    }
}

// ---------------------------------------------------------------------------
// Channel errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelError {
    /// Transport stack initialisation failed (ESP-IDF return code).
    InitFailed(i32),
    /// The advertised device name is empty or too long.
    InvalidName,
    /// `send_line` called before `begin` succeeded.
    NotStarted,
    /// No peer is connected, the write went nowhere.
    NotConnected,
    /// The transport accepted fewer bytes than requested, or failed outright.
    WriteFailed,
    /// Reading from the transport failed.
    ReadFailed,
}

impl fmt::Display for ChannelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InitFailed(rc) => write!(f, "transport init failed (rc={rc})"),
            Self::InvalidName => write!(f, "invalid device name"),
            Self::NotStarted => write!(f, "channel not started"),
            Self::NotConnected => write!(f, "no peer connected"),
            Self::WriteFailed => write!(f, "write failed"),
            Self::ReadFailed => write!(f, "read failed"),
        }
    }
}

impl core::error::Error for ChannelError {}

impl From<ChannelError> for Error {
    fn from(e: ChannelError) -> Self {
        Self::Channel(e)
    }
}

// ---------------------------------------------------------------------------
// Configuration errors
// ---------------------------------------------------------------------------

/// A config field failed range validation. The message names the field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfigError(pub &'static str);

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "validation failed: {}", self.0)
    }
}

impl core::error::Error for ConfigError {}

impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Firmware-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
