//! Registration state machine.
//!
//! ```text
//! Connecting ──PASS/NICK/USER──► Registering ──complete──► Registered
//!      │                              │                       │
//!      └──────────────────────────────┴───────────────────────┴──► Disconnecting
//! ```
//!
//! Stages only ever move forward. Disconnecting is terminal.

use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};

/// Lifecycle stage of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum Stage {
    /// Connected, no registration command seen yet.
    Connecting = 0,
    /// PASS, NICK or USER received; waiting for the rest.
    Registering = 1,
    /// Welcome burst sent; all commands available.
    Registered = 2,
    /// Going away; no further input is processed.
    Disconnecting = 3,
}

impl Stage {
    fn from_u8(v: u8) -> Self {
        match v {
            0 => Stage::Connecting,
            1 => Stage::Registering,
            2 => Stage::Registered,
            _ => Stage::Disconnecting,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Connecting => "connecting",
            Stage::Registering => "registering",
            Stage::Registered => "registered",
            Stage::Disconnecting => "disconnecting",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Atomic, forward-only stage holder shared between the receive path and
/// the session's command queue.
#[derive(Debug)]
pub struct StageCell(AtomicU8);

impl Default for StageCell {
    fn default() -> Self {
        Self(AtomicU8::new(Stage::Connecting as u8))
    }
}

impl StageCell {
    #[inline]
    pub fn get(&self) -> Stage {
        Stage::from_u8(self.0.load(Ordering::Acquire))
    }

    /// Move forward to `to` if the session is behind it.
    /// Returns the stage that was current before the call.
    pub fn advance(&self, to: Stage) -> Stage {
        Stage::from_u8(self.0.fetch_max(to as u8, Ordering::AcqRel))
    }

    /// Move from exactly `from` to `to`. Only one caller can win.
    pub fn transition(&self, from: Stage, to: Stage) -> bool {
        from < to
            && self
                .0
                .compare_exchange(from as u8, to as u8, Ordering::AcqRel, Ordering::Acquire)
                .is_ok()
    }
}
