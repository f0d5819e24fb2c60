//! System configuration parameters
//!
//! Every tunable of the lock firmware, fixed at compile time. Nothing is
//! read from or written to flash; the running config is logged once at boot.

use serde::{Deserialize, Serialize};

use crate::drivers::watchdog::WATCHDOG_TIMEOUT_MS;
use crate::error::ConfigError;

/// Name advertised by the wireless channel.
pub const DEVICE_NAME: &str = "ESP32_LOCK";

/// How long the solenoid stays energized per unlock command.
pub const UNLOCK_DURATION_MS: u32 = 3000;

/// Longest device name the Bluetooth stack accepts.
pub const MAX_DEVICE_NAME_LEN: usize = 32;

/// Fixed-capacity device name.
pub type DeviceName = heapless::String<MAX_DEVICE_NAME_LEN>;

/// How an unlock pulse holds the loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PulseMode {
    /// Sleep for the whole pulse; the loop does nothing else meanwhile.
    Blocking,
    /// Schedule the de-energize at a deadline checked every loop iteration.
    Deadline,
}

/// Which transport carries the command channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChannelKind {
    /// Bluetooth Classic SPP, advertised under `device_name`.
    Bluetooth,
    /// Wired UART2 at `uart_baud`.
    Uart,
}

/// Core system configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LockConfig {
    /// Transport for the command channel.
    pub channel: ChannelKind,
    /// Advertised name of the command channel.
    pub device_name: DeviceName,
    /// Pulse length for every accepted unlock command (milliseconds).
    pub unlock_duration_ms: u32,
    /// Blocking sleep or deadline-scheduled release.
    pub pulse_mode: PulseMode,
    /// Sleep between loop iterations (milliseconds).
    pub loop_interval_ms: u32,
    /// Baud rate of the wired serial channel.
    pub uart_baud: u32,
}

impl Default for LockConfig {
    fn default() -> Self {
        let mut device_name = DeviceName::new();
        // DEVICE_NAME is shorter than MAX_DEVICE_NAME_LEN.
        let _ = device_name.push_str(DEVICE_NAME);

        Self {
            channel: ChannelKind::Bluetooth,
            device_name,
            unlock_duration_ms: UNLOCK_DURATION_MS,
            pulse_mode: PulseMode::Deadline,
            loop_interval_ms: 10,
            uart_baud: 115_200,
        }
    }
}

impl LockConfig {
    /// Reject values the firmware cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.device_name.is_empty() {
            return Err(ConfigError("device_name must not be empty"));
        }
        if !self.device_name.is_ascii() {
            return Err(ConfigError("device_name must be ASCII"));
        }
        if self.loop_interval_ms == 0 {
            return Err(ConfigError("loop_interval_ms must be > 0"));
        }
        if self.uart_baud == 0 {
            return Err(ConfigError("uart_baud must be > 0"));
        }
        // A blocking pulse holds the only task that feeds the watchdog.
        if self.pulse_mode == PulseMode::Blocking
            && self.unlock_duration_ms >= WATCHDOG_TIMEOUT_MS
        {
            return Err(ConfigError(
                "unlock_duration_ms must be below the watchdog timeout in blocking mode",
            ));
        }
        Ok(())
    }
}
