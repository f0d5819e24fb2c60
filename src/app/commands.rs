//! Inbound command vocabulary and the replies sent back.
//!
//! The vocabulary is fixed: `"1"` (exact) or `"OPEN"` (any ASCII casing)
//! unlock; every other line, the empty one included, is rejected.

/// Reply sent after an unlock pulse completes.
pub const REPLY_OK: &str = "OK";

/// Reply sent for anything that is not an unlock command.
pub const REPLY_ERR: &str = "ERR";

/// Classified inbound line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockCommand {
    Unlock,
    Unknown,
}

impl LockCommand {
    /// Classify a received line. Surrounding whitespace (including a `\r`
    /// left by CRLF senders) is ignored; inner whitespace is not.
    pub fn parse(line: &str) -> Self {
        let cmd = line.trim();
        if cmd == "1" || cmd.eq_ignore_ascii_case("OPEN") {
            Self::Unlock
        } else {
            Self::Unknown
        }
    }

    /// Reply the controller sends once this command has been handled.
    pub fn reply(self) -> &'static str {
        match self {
            Self::Unlock => REPLY_OK,
            Self::Unknown => REPLY_ERR,
        }
    }
}
