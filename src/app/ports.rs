//! Port traits: the boundary between the dispatch logic and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ LockController
//! ```
//!
//! The controller consumes these via generics, so it never touches the log
//! backend or the system timer directly. The command channel port lives in
//! [`crate::channel`] and the actuator is the concrete
//! [`LockActuator`](crate::drivers::lock::LockActuator) over an
//! `embedded_hal` pin.

use super::events::LockEvent;

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: domain → diagnostics)
// ───────────────────────────────────────────────────────────────

/// One-way diagnostic sink. Adapters decide where events go (serial log,
/// test recorder).
pub trait EventSink {
    fn emit(&mut self, event: &LockEvent);
}

// ───────────────────────────────────────────────────────────────
// Clock port (driven adapter: system timer → domain)
// ───────────────────────────────────────────────────────────────

/// Monotonic time source for deadline-scheduled pulses.
pub trait ClockPort {
    /// Milliseconds since boot. Never goes backwards.
    fn now_ms(&self) -> u64;
}
