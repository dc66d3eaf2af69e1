//! Status report rendering.
//!
//! Pull-based: the caller takes a [`ChamberSnapshot`] from the session and
//! hands it here. Nothing in this module talks to the chamber.

use std::fmt::Write as _;

use serde::Serialize;

use crate::chamber::status::{ChamberSnapshot, Message};

const COLUMN: usize = 38;

fn on_off(v: bool) -> &'static str {
    if v { "ON" } else { "OFF" }
}

fn row(out: &mut String, left: &str, right: &str) {
    let _ = write!(out, "\n    {left:<COLUMN$}  {right:<COLUMN$}");
}

/// Two-column quick-status block.
///
/// ```text
/// Climate chamber's current status: Manual run
///     Setpoint:      24.000                  Compr. air:    ON
///     Temperature:   22.500                  Dryer:        OFF
/// ```
pub fn render_text(snapshot: Option<&ChamberSnapshot>) -> String {
    let mut out = String::new();
    match snapshot {
        Some(s) => {
            let _ = write!(out, "Climate chamber's current status: {}", s.run_state);
            row(
                &mut out,
                &format!("Setpoint:    {:8.3}", s.setpoint_c),
                &format!("Compr. air:  {:>4}", on_off(s.compressed_air)),
            );
            row(
                &mut out,
                &format!("Temperature: {:8.3}", s.temperature_c),
                &format!("Dryer:       {:>4}", on_off(s.dryer)),
            );
        }
        None => {
            out.push_str("  Climate chamber not found in network.");
            row(&mut out, "Setpoint:    ", "Compr. air:  ");
            row(&mut out, "Temperature: ", "Dryer:       ");
        }
    }
    out.trim_end().to_string()
}

/// Active warnings, one per line, or a note that there are none.
pub fn render_warnings(messages: &[Message]) -> String {
    if messages.is_empty() {
        return "No active warnings.".into();
    }
    let mut out = format!("{} active warning(s):", messages.len());
    for m in messages {
        let _ = write!(out, "\n  {m}");
    }
    out
}

#[derive(Serialize)]
struct Report<'a> {
    #[serde(flatten)]
    snapshot: &'a ChamberSnapshot,
    run_state_text: String,
}

/// The same snapshot as pretty JSON.
pub fn render_json(snapshot: &ChamberSnapshot) -> serde_json::Result<String> {
    serde_json::to_string_pretty(&Report {
        snapshot,
        run_state_text: snapshot.run_state.to_string(),
    })
}
