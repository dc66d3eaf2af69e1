//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing one structured line per monitor
//! event through the `log` facade. The binary routes these to stderr via
//! `tracing-subscriber`; the tick log adapter handles the data file.

use log::{info, warn};

use crate::app::events::MonitorEvent;
use crate::app::ports::EventSink;

/// Adapter that logs every [`MonitorEvent`].
#[derive(Debug, Default)]
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

fn opt(v: Option<f64>) -> String {
    v.map_or_else(|| "-".into(), |v| format!("{v:.2}"))
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &MonitorEvent) {
        match event {
            MonitorEvent::Tick(t) => {
                info!(
                    "TICK {} | T={:.5}\u{00b0}C setp={:.3}\u{00b0}C | dew={}/{} | \
                     air={} dry={} | run={} | warnings={} | interlock={:?}",
                    t.tick,
                    t.temperature_c,
                    t.setpoint_c,
                    opt(t.dewpoint_c(0)),
                    opt(t.dewpoint_c(1)),
                    if t.compressed_air { "ON" } else { "OFF" },
                    if t.dryer { "ON" } else { "OFF" },
                    t.run_state,
                    t.active_warnings,
                    t.interlock_state,
                );
                if t.active_warnings > 0 {
                    warn!("Chamber reports {} active warning(s)", t.active_warnings);
                }
            }
            MonitorEvent::Connected => info!("LINK | connected"),
            MonitorEvent::Disconnected { reason } => warn!("LINK | dropped: {reason}"),
            MonitorEvent::TickFailed { tick, reason } => {
                warn!("TICK {tick} | abandoned: {reason}");
            }
            MonitorEvent::InterlockFailed { reason } => {
                warn!("INTERLOCK | warm-up not applied: {reason}");
            }
        }
    }
}
