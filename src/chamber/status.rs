//! Decoded status words.
//!
//! The device reports several states as additive bitmasks. Each is decoded
//! once into a named flag set so call sites never test bits themselves.

use std::fmt;

use serde::Serialize;

// ---------------------------------------------------------------------------
// Program run status (GET PRGM STATUS)
// ---------------------------------------------------------------------------

/// Program run status: 0 not running, 1 running, then additive flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RunStatus {
    pub raw: u32,
    pub running: bool,
    pub paused: bool,
    pub waiting_for_value: bool,
    pub stopped: bool,
    pub waiting_for_start_time: bool,
    pub paused_externally: bool,
}

impl RunStatus {
    pub const RUNNING: u32 = 1;
    pub const PAUSED: u32 = 2;
    pub const WAITING_FOR_VALUE: u32 = 4;
    pub const STOPPED: u32 = 8;
    pub const WAITING_FOR_START_TIME: u32 = 16;
    pub const PAUSED_EXTERNALLY: u32 = 32;

    pub fn from_raw(raw: u32) -> Self {
        Self {
            raw,
            running: raw & Self::RUNNING != 0,
            paused: raw & Self::PAUSED != 0,
            waiting_for_value: raw & Self::WAITING_FOR_VALUE != 0,
            stopped: raw & Self::STOPPED != 0,
            waiting_for_start_time: raw & Self::WAITING_FOR_START_TIME != 0,
            paused_externally: raw & Self::PAUSED_EXTERNALLY != 0,
        }
    }

    /// Exact zero: no program is loaded or active.
    pub fn is_idle(&self) -> bool {
        self.raw == 0
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_idle() {
            return f.write_str("not running");
        }
        let labels = [
            (self.running, "running"),
            (self.paused, "paused"),
            (self.waiting_for_value, "waiting for actual value"),
            (self.stopped, "stopped"),
            (self.waiting_for_start_time, "waiting for start time"),
            (self.paused_externally, "paused via external control"),
        ];
        let text: Vec<&str> = labels.iter().filter(|(on, _)| *on).map(|(_, l)| *l).collect();
        if text.is_empty() {
            write!(f, "unknown status ({})", self.raw)
        } else {
            f.write_str(&text.join(", "))
        }
    }
}

// ---------------------------------------------------------------------------
// Chamber status (GET CHAMBER STATUS)
// ---------------------------------------------------------------------------

/// 1: test not running, 3: test running, +4 warnings, +8 alarms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ChamberStatus {
    pub raw: u32,
    pub running: bool,
    pub warnings: bool,
    pub alarms: bool,
}

impl ChamberStatus {
    pub fn from_raw(raw: u32) -> Self {
        Self {
            raw,
            running: raw & 2 != 0,
            warnings: raw & 4 != 0,
            alarms: raw & 8 != 0,
        }
    }
}

// ---------------------------------------------------------------------------
// Messages
// ---------------------------------------------------------------------------

/// Message type bits: 1 alarm, 2 warning, 4 info.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MessageType {
    pub raw: u32,
}

impl MessageType {
    pub fn is_alarm(self) -> bool {
        self.raw & 1 != 0
    }

    pub fn is_warning(self) -> bool {
        self.raw & 2 != 0
    }

    /// Alarms and warnings are reported to the operator; info is not.
    pub fn needs_attention(self) -> bool {
        self.is_alarm() || self.is_warning()
    }
}

/// An active alarm or warning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Message {
    pub index: u32,
    pub kind: MessageType,
    pub text: String,
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = if self.kind.is_alarm() { "ALARM!" } else { "Warning!" };
        write!(f, "{label} {}", self.text)
    }
}

// ---------------------------------------------------------------------------
// Run state summary
// ---------------------------------------------------------------------------

/// What the chamber is doing, for status displays.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum RunState {
    Idle,
    Manual,
    Program { number: u32, name: String },
}

impl RunState {
    pub fn is_running(&self) -> bool {
        !matches!(self, Self::Idle)
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => f.write_str("Not running"),
            Self::Manual => f.write_str("Manual run"),
            Self::Program { name, .. } => write!(f, "Program '{name}'"),
        }
    }
}

// ---------------------------------------------------------------------------
// Snapshot
// ---------------------------------------------------------------------------

/// Point-in-time view for status displays.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChamberSnapshot {
    pub run_state: RunState,
    pub temperature_c: f64,
    pub setpoint_c: f64,
    pub compressed_air: bool,
    pub dryer: bool,
}
