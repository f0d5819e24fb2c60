//! Actuator drivers and peripheral helpers.

pub mod lock;
pub mod watchdog;
