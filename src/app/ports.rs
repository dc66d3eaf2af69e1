//! Port traits: the boundary between the polling core and the outside world.
//!
//! ```text
//!   Connector ──▶ Monitor ──▶ EventSink
//!                   │
//!                   ▼
//!             ChamberControl  (interlock writes)
//! ```
//!
//! The [`Monitor`](super::monitor::Monitor) consumes these via generics, so
//! the tick logic is testable against in-memory fakes.

use crate::chamber::ChamberSession;
use crate::error::Result;
use crate::protocol::transport::Transport;

// ───────────────────────────────────────────────────────────────
// Chamber control (domain → chamber writes)
// ───────────────────────────────────────────────────────────────

/// The one write the interlock is allowed to issue on its own.
pub trait ChamberControl {
    /// Start a forced warm-up to `target_c` at `gradient` K/min.
    fn force_warm_up(&mut self, target_c: f64, gradient: f64) -> Result<()>;
}

// ───────────────────────────────────────────────────────────────
// Connector (opens chamber sessions)
// ───────────────────────────────────────────────────────────────

/// Opens a fresh session. Called at start-up and on the tick after a
/// transport failure.
pub trait Connector {
    type Transport: Transport;

    fn connect(&mut self) -> Result<ChamberSession<Self::Transport>>;
}

// ───────────────────────────────────────────────────────────────
// Event sink (domain → logging / tick log / display)
// ───────────────────────────────────────────────────────────────

/// The monitor emits structured [`MonitorEvent`](super::events::MonitorEvent)s
/// through this port. Adapters decide where they go.
pub trait EventSink {
    fn emit(&mut self, event: &super::events::MonitorEvent);
}

impl<A: EventSink, B: EventSink> EventSink for (A, B) {
    fn emit(&mut self, event: &super::events::MonitorEvent) {
        self.0.emit(event);
        self.1.emit(event);
    }
}
