//! ESP32 lock firmware library.
//!
//! Exposes the dispatch core, the command channel, and the drivers for
//! integration testing on the host. All ESP-IDF-specific code is guarded by
//! `#[cfg(target_os = "espidf")]` within each module.

#![deny(unused_must_use)]

pub mod adapters;
pub mod app;
pub mod channel;
pub mod config;
pub mod drivers;
pub mod error;
pub mod pins;
