//! GPIO / peripheral pin assignments for the lock board.
//!
//! Single source of truth: every driver references this module rather than
//! hard-coding pin numbers.

// ---------------------------------------------------------------------------
// Solenoid driver (logic-level MOSFET / relay)
// ---------------------------------------------------------------------------

/// Digital output: HIGH = solenoid powered (unlocked), LOW = locked.
pub const LOCK_GPIO: i32 = 23;

// ---------------------------------------------------------------------------
// Wired command channel (UART2)
// ---------------------------------------------------------------------------

pub const UART_TX_GPIO: i32 = 17;
pub const UART_RX_GPIO: i32 = 16;
