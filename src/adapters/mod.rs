//! Adapters: concrete implementations of the port and transport traits.
//!
//! | Adapter    | Implements | Connects to                        |
//! |------------|------------|------------------------------------|
//! | `log_sink` | EventSink  | Serial log output                  |
//! | `spp`      | Transport  | Bluedroid SPP server (BT Classic)  |
//! | `time`     | ClockPort  | ESP32 system timer                 |
//! | `uart`     | Transport  | UART2 (ESP-IDF only)               |

pub mod log_sink;
pub mod spp;
pub mod time;
#[cfg(target_os = "espidf")]
pub mod uart;
