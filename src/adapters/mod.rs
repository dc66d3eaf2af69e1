//! Adapters: concrete implementations of the port traits.
//!
//! | Adapter         | Implements | Connects to                  |
//! |-----------------|------------|------------------------------|
//! | `tcp_connector` | Connector  | Chamber over TCP             |
//! | `log_sink`      | EventSink  | `log` facade (stderr)        |
//! | `tick_log`      | EventSink  | Append-only tick log file    |
//! | `status_report` | n/a        | Text / JSON status rendering |

pub mod log_sink;
pub mod status_report;
pub mod tcp_connector;
pub mod tick_log;
