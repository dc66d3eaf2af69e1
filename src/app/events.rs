//! Outbound monitor events.
//!
//! The [`Monitor`](super::monitor::Monitor) emits these through the
//! [`EventSink`](super::ports::EventSink) port. Adapters on the other side
//! decide what to do with them: log, append to the tick log, display.

use chrono::NaiveDateTime;
use serde::Serialize;

use crate::chamber::status::RunState;
use crate::safety::{InterlockOutcome, InterlockState};
use crate::sensors::{AmbientReading, MAX_AUX_SENSORS};

/// Structured events emitted by the monitor.
#[derive(Debug, Clone)]
pub enum MonitorEvent {
    /// A chamber session was opened.
    Connected,
    /// The session was dropped after a transport failure.
    Disconnected { reason: String },
    /// One completed tick.
    Tick(TickRecord),
    /// The tick was abandoned; the loop continues.
    TickFailed { tick: u64, reason: String },
    /// The interlock could not carry out its action.
    InterlockFailed { reason: String },
}

/// Everything read during one tick.
#[derive(Debug, Clone, Serialize)]
pub struct TickRecord {
    pub tick: u64,
    pub timestamp: NaiveDateTime,
    pub temperature_c: f64,
    pub setpoint_c: f64,
    /// One slot per configured auxiliary sensor.
    pub ambient: [Option<AmbientReading>; MAX_AUX_SENSORS],
    pub compressed_air: bool,
    pub dryer: bool,
    pub run_state: RunState,
    pub active_warnings: usize,
    pub interlock: InterlockOutcome,
    pub interlock_state: InterlockState,
}

impl TickRecord {
    pub fn dewpoint_c(&self, slot: usize) -> Option<f64> {
        self.ambient.get(slot).copied().flatten().map(|r| r.dewpoint_c)
    }
}
