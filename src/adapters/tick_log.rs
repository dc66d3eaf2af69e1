//! Append-only tick log.
//!
//! One comma-delimited line per completed tick:
//!
//! ```text
//! 19-10-2026 14:03:10,22.50000,24.0,18.0,,1,1,1
//! │                   │        │    │   │ │ │ └ running (manual or program)
//! │                   │        │    │   │ │ └ dryer
//! │                   │        │    │   │ └ compressed air
//! │                   │        │    │   └ dewpoint, sensor 2 (empty if absent)
//! │                   │        │    └ dewpoint, sensor 1
//! │                   │        └ setpoint
//! │                   └ temperature
//! └ local time
//! ```
//!
//! Other events are ignored. A failed write is logged and the loop goes on;
//! losing one line must never stop the interlock.

use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::Path;

use log::warn;

use crate::app::events::{MonitorEvent, TickRecord};
use crate::app::ports::EventSink;
use crate::sensors::MAX_AUX_SENSORS;

pub const TIMESTAMP_FORMAT: &str = "%d-%m-%Y %H:%M:%S";

/// Render one tick as a log line, without the line terminator.
pub fn format_line(t: &TickRecord) -> String {
    let mut line = format!(
        "{},{:.5},{:?}",
        t.timestamp.format(TIMESTAMP_FORMAT),
        t.temperature_c,
        t.setpoint_c
    );
    for slot in 0..MAX_AUX_SENSORS {
        line.push(',');
        if let Some(d) = t.dewpoint_c(slot) {
            line.push_str(&format!("{d:?}"));
        }
    }
    let running = t.run_state.is_running();
    line.push_str(&format!(
        ",{},{},{}",
        u8::from(t.compressed_air),
        u8::from(t.dryer),
        u8::from(running)
    ));
    line
}

pub struct TickLogWriter<W: Write> {
    out: W,
}

impl TickLogWriter<BufWriter<File>> {
    /// Open `path` for appending, creating it if needed.
    pub fn append(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self::new(BufWriter::new(file)))
    }
}

impl<W: Write> TickLogWriter<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn write_tick(&mut self, tick: &TickRecord) -> io::Result<()> {
        writeln!(self.out, "{}", format_line(tick))?;
        self.out.flush()
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> EventSink for TickLogWriter<W> {
    fn emit(&mut self, event: &MonitorEvent) {
        if let MonitorEvent::Tick(t) = event {
            if let Err(e) = self.write_tick(t) {
                warn!("Tick log write failed: {e}");
            }
        }
    }
}
