//! Unified error types for the ClimateBox client.
//!
//! A single `Error` enum that every subsystem converts into, keeping the
//! polling loop's error handling uniform. Registry and codec failures are
//! module-local types ([`LookupError`], [`CodecError`]) and only reach
//! callers through the `From` conversions below.

use std::io;

use thiserror::Error as ThisError;

use crate::config::ConfigError;
use crate::protocol::codec::CodecError;
use crate::protocol::registry::LookupError;

// ---------------------------------------------------------------------------
// Top-level error
// ---------------------------------------------------------------------------

/// Every fallible operation in the crate funnels into this type.
#[derive(Debug, ThisError)]
pub enum Error {
    /// A command path token is absent from the command table.
    #[error("unknown command '{0}'")]
    UnknownCommand(String),

    /// A command path stops at a command group instead of a command.
    #[error("incomplete command path '{0}'")]
    IncompletePath(String),

    /// Argument count does not match the table entry for the command.
    #[error("'{command}' expects {expected} argument(s), got {got}")]
    ArgumentCount {
        command: &'static str,
        expected: usize,
        got: usize,
    },

    /// An argument cannot be put on the wire.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The response violated the framing rules or a field did not parse.
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    /// The chamber answered with a failure status code.
    #[error("chamber reported {description} ({code})")]
    Protocol {
        code: i32,
        description: &'static str,
        /// Fields that accompanied the failure code.
        fields: Vec<String>,
    },

    /// Connection refused, reset, closed or timed out.
    #[error("transport: {0}")]
    Transport(#[from] io::Error),

    /// An automated action was requested while the chamber runs a program.
    #[error("unsupported while {0}")]
    UnsupportedState(String),

    /// An auxiliary sensor could not be read.
    #[error("sensor '{name}': {reason}")]
    Sensor { name: String, reason: String },

    /// Configuration is invalid or could not be loaded.
    #[error("config: {0}")]
    Config(#[from] ConfigError),
}

impl Error {
    /// Registry failures are programming errors and end the run.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::UnknownCommand(_) | Self::IncompletePath(_))
    }

    /// The connection is unusable; reconnect on the next tick.
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_))
    }

    /// Device status code, if the chamber reported a failure.
    pub fn protocol_code(&self) -> Option<i32> {
        match self {
            Self::Protocol { code, .. } => Some(*code),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Conversions from module-local errors
// ---------------------------------------------------------------------------

impl From<LookupError> for Error {
    fn from(e: LookupError) -> Self {
        match e {
            LookupError::UnknownCommand(path) => Self::UnknownCommand(path),
            LookupError::IncompletePath(path) => Self::IncompletePath(path),
        }
    }
}

impl From<CodecError> for Error {
    fn from(e: CodecError) -> Self {
        match e {
            CodecError::InvalidArgument(msg) => Self::InvalidArgument(msg),
            CodecError::Malformed(msg) => Self::MalformedResponse(msg),
        }
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Crate-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
