//! Events module for remote-control button activity
//!
//! Provides the structured event produced for each line reported by the
//! producer, and the parser turning raw lines into events.

mod parser;

use serde::{Deserialize, Serialize};

pub use parser::{parse_line, ParseError};

/// A single button report from the producer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IrEvent {
    /// Raw scan code, as the hex token reported by the producer
    pub code: String,

    /// Repeat counter: 0 for a fresh press, positive while the button is held
    pub repeat: u64,

    /// Key name from the remote's configuration (e.g. `KEY_OK`)
    pub key: String,

    /// Remote name from the remote's configuration
    pub remote: String,
}

impl IrEvent {
    /// Create a new event
    pub fn new(
        code: impl Into<String>,
        repeat: u64,
        key: impl Into<String>,
        remote: impl Into<String>,
    ) -> Self {
        Self {
            code: code.into(),
            repeat,
            key: key.into(),
            remote: remote.into(),
        }
    }

    /// Check if this event is the initial press of a button
    pub fn is_fresh_press(&self) -> bool {
        self.repeat == 0
    }

    /// Check if this event reports a button still held down
    pub fn is_repeat(&self) -> bool {
        self.repeat > 0
    }
}

impl std::fmt::Display for IrEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} {:02x} {} {}",
            self.code, self.repeat, self.key, self.remote
        )
    }
}
