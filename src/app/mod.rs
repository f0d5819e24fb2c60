//! Application core: command classification and dispatch, zero direct I/O.
//!
//! All interaction with the outside world happens through the command
//! channel capability, the [`ports`] traits, and the `embedded_hal` pin owned
//! by the actuator, keeping this layer testable without real peripherals.

pub mod commands;
pub mod events;
pub mod ports;
pub mod service;
