//! Command table and status-code descriptions.
//!
//! Every command the chamber understands is one row of a flat table keyed
//! by its normalized path (`"GET CTRL_VAR VAL"`). A row carries the numeric
//! identifier and the number of arguments the device expects after the
//! chamber index, so a bad call is rejected before any byte hits the wire.
//!
//! Identifiers are not unique. The device multiplexes some of them by
//! argument position: `SET DIGI_OUT VAL` and `START MANUAL` share 14001,
//! `GET ERROR *` and `RESET ERROR` share 17012, and the digital-output
//! read (14003) sits one above its name query (14010 is `No.`, 14003 is
//! `No.+1`). The table keeps those collisions exactly as the device does.

use std::collections::HashMap;
use std::fmt;
use std::sync::LazyLock;

/// The only status code that means success.
pub const SUCCESS: i32 = 1;

/// Arguments expected after the chamber index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    Exact(usize),
    /// Device documentation gives no fixed count.
    Unchecked,
}

/// One row of the command table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Command {
    pub path: &'static str,
    pub id: u32,
    pub arity: Arity,
}

impl Command {
    const fn new(path: &'static str, id: u32, arity: Arity) -> Self {
        Self { path, id, arity }
    }

    /// Commands outside the `GET` family change chamber state.
    pub fn is_write(&self) -> bool {
        !self.path.starts_with("GET ")
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.path, self.id)
    }
}

use Arity::{Exact, Unchecked};

#[rustfmt::skip]
static COMMANDS: &[Command] = &[
    // ── GET ───────────────────────────────────────────────────
    Command::new("GET CHAMBER INFO",            99997, Unchecked),
    // 1: not running, 3: running, +4: warnings, +8: alarms
    Command::new("GET CHAMBER STATUS",          10012, Exact(0)),

    Command::new("GET CTRL_VAR NUM",            11018, Exact(0)),
    Command::new("GET CTRL_VAR NAME",           11026, Exact(1)),
    Command::new("GET CTRL_VAR UNIT",           11023, Exact(1)),
    Command::new("GET CTRL_VAR SETPOINT",       11002, Exact(1)),
    Command::new("GET CTRL_VAR VAL",            11004, Exact(1)),
    Command::new("GET CTRL_VAR INPUT_LIM_MIN",  11007, Exact(1)),
    Command::new("GET CTRL_VAR INPUT_LIM_MAX",  11009, Exact(1)),
    Command::new("GET CTRL_VAR WARN_LIM_MIN",   11016, Exact(1)),
    Command::new("GET CTRL_VAR WARN_LIM_MAX",   11017, Exact(1)),
    Command::new("GET CTRL_VAR ALARM_LIM_MIN",  11014, Exact(1)),
    Command::new("GET CTRL_VAR ALARM_LIM_MAX",  11015, Exact(1)),

    Command::new("GET CTRL_VAL NUM",            13007, Exact(0)),
    Command::new("GET CTRL_VAL NAME",           13011, Exact(1)),
    Command::new("GET CTRL_VAL UNIT",           13010, Exact(1)),
    Command::new("GET CTRL_VAL SETPOINT",       13005, Exact(1)),
    Command::new("GET CTRL_VAL INPUT_LIM_MIN",  13002, Exact(1)),
    Command::new("GET CTRL_VAL INPUT_LIM_MAX",  13004, Exact(1)),

    Command::new("GET MEAS_VAL NUM",            12012, Exact(0)),
    Command::new("GET MEAS_VAL NAME",           12019, Exact(1)),
    Command::new("GET MEAS_VAL UNIT",           12016, Exact(1)),
    Command::new("GET MEAS_VAL VAL",            12002, Exact(1)),
    Command::new("GET MEAS_VAL WARN_LIM_MIN",   12010, Exact(1)),
    Command::new("GET MEAS_VAL WARN_LIM_MAX",   12011, Exact(1)),
    Command::new("GET MEAS_VAL ALARM_LIM_MIN",  12008, Exact(1)),
    Command::new("GET MEAS_VAL ALARM_LIM_MAX",  12009, Exact(1)),

    Command::new("GET DIGI_IN NUM",             15004, Exact(0)),
    Command::new("GET DIGI_IN NAME",            15005, Exact(1)),
    Command::new("GET DIGI_IN VAL",             15002, Exact(1)),

    Command::new("GET DIGI_OUT NUM",            14007, Exact(0)),
    Command::new("GET DIGI_OUT NAME",           14010, Exact(1)),
    Command::new("GET DIGI_OUT VAL",            14003, Exact(1)),

    Command::new("GET MSG NUM",                 17002, Exact(0)),
    // 1: alarm, 2: warning, 4: info
    Command::new("GET MSG TYPE",                17005, Exact(1)),
    // 1: AlarmStop
    Command::new("GET MSG CATEGORY",            17111, Exact(1)),
    Command::new("GET MSG TEXT",                17007, Exact(1)),
    // 0: not active, 1: active
    Command::new("GET MSG STATUS",              17009, Exact(1)),

    Command::new("GET ERROR PLC_LIST",          17012, Exact(0)),
    Command::new("GET ERROR ID_LIST",           17012, Exact(0)),

    Command::new("GET GRAD_UP VAL",             11066, Exact(1)),
    Command::new("GET GRAD_DWN VAL",            11070, Exact(1)),

    Command::new("GET PRGM NUM",                19204, Exact(0)),
    Command::new("GET PRGM NAME",               19031, Exact(1)),
    Command::new("GET PRGM LOOPS",              19004, Exact(1)),
    Command::new("GET PRGM LOOPS_DONE",         19006, Exact(1)),
    // YYYY-MM-DD-hh-mm-ss
    Command::new("GET PRGM START_DATE",         19207, Unchecked),
    Command::new("GET PRGM LEAD_TIME",          19009, Unchecked),
    Command::new("GET PRGM ACTIVE_TIME",        19021, Unchecked),
    Command::new("GET PRGM STATUS",             19210, Exact(0)),

    // ── SET ───────────────────────────────────────────────────
    Command::new("SET CTRL_VAR SETPOINT",       11001, Exact(2)),
    Command::new("SET CTRL_VAL SETPOINT",       13006, Exact(2)),
    Command::new("SET DIGI_OUT VAL",            14001, Exact(2)),
    Command::new("SET GRAD_UP VAL",             11068, Exact(2)),
    Command::new("SET GRAD_DWN VAL",            11072, Exact(2)),
    Command::new("SET PRGM NUM",                19204, Unchecked),
    // 1 + <2: pause, 4: resume>
    Command::new("SET PRGM CTRL",               19209, Exact(2)),
    Command::new("SET PRGM LOOPS",              19003, Exact(2)),
    Command::new("SET PRGM START_DATE",         19208, Exact(2)),
    Command::new("SET PRGM LEAD_TIME",          19010, Exact(2)),
    Command::new("SET PRGM NAME",               19031, Unchecked),

    // ── START ─────────────────────────────────────────────────
    // 1 + <0: off, 1: on>
    Command::new("START MANUAL",                14001, Exact(2)),
    // <No.> + <number of runthroughs>
    Command::new("START PRGM_NUM",              19014, Exact(2)),
    Command::new("START PRGM",                  19015, Unchecked),

    // ── RESET ─────────────────────────────────────────────────
    Command::new("RESET ERROR",                 17012, Unchecked),
];

static INDEX: LazyLock<HashMap<&'static str, &'static Command>> =
    LazyLock::new(|| COMMANDS.iter().map(|c| (c.path, c)).collect());

/// Command lookup failure.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LookupError {
    /// A token is absent from the level it was looked up in.
    #[error("unknown command '{0}'")]
    UnknownCommand(String),
    /// The path ends on a command group rather than a command.
    #[error("incomplete command path '{0}'")]
    IncompletePath(String),
}

/// Collapse whitespace between tokens. Tokens are matched exactly.
fn normalize(path: &str) -> String {
    path.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Find the table row for a command path.
pub fn lookup(path: &str) -> Result<&'static Command, LookupError> {
    let key = normalize(path);
    if let Some(cmd) = INDEX.get(key.as_str()) {
        return Ok(cmd);
    }
    let group = format!("{key} ");
    if !key.is_empty() && COMMANDS.iter().any(|c| c.path.starts_with(&group)) {
        Err(LookupError::IncompletePath(key))
    } else {
        Err(LookupError::UnknownCommand(key))
    }
}

/// Resolve a command path to its numeric identifier.
pub fn resolve(path: &str) -> Result<u32, LookupError> {
    lookup(path).map(|c| c.id)
}

/// Every command the table knows, in declaration order.
pub fn commands() -> &'static [Command] {
    COMMANDS
}

/// Human-readable meaning of a status code.
pub fn describe(code: i32) -> &'static str {
    match code {
        1 => "Command is accepted and executed.",
        -5 => "Command number transmitted is unidentified!",
        -6 => "Too few or incorrect parameters entered!",
        -8 => "Data could not be read!",
        _ => "Unknown error!",
    }
}
