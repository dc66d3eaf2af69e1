//! Separator-delimited line codec.
//!
//! Wire format:
//! ```text
//! request:  <id> SEP <chamber> [SEP <arg>]* CR
//! response: <status> [SEP <field>]* CR [LF]
//! ```
//!
//! `SEP` is byte 182 (`¶` in Latin-1). Arguments travel as their decimal
//! or ASCII text form, never binary. Response fields are decoded as
//! Latin-1 so that every byte maps to exactly one character.
//!
//! [`LineAccumulator`] collects bytes from a stream until a complete
//! response line is available. A single transport read may return part
//! of a line or more than one. CR or a bare LF ends a line; the LF of a
//! CR LF pair is swallowed even when it arrives in a later read.

use std::fmt;

/// Field separator (ASCII code 182).
pub const SEP: u8 = 0xB6;
/// Carriage return, terminates every request.
pub const CR: u8 = b'\r';
/// Line feed, terminates every response after CR.
pub const LF: u8 = b'\n';

/// Most arguments the device accepts after the chamber index.
pub const MAX_ARGS: usize = 4;

/// Upper bound on a response line (protects against a runaway peer).
pub const MAX_RESPONSE_LEN: usize = 4096;

// ───────────────────────────────────────────────────────────────
// Errors
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CodecError {
    /// An argument cannot be encoded.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    /// Response bytes violate the framing rules.
    #[error("malformed response: {0}")]
    Malformed(String),
}

// ───────────────────────────────────────────────────────────────
// Arguments
// ───────────────────────────────────────────────────────────────

/// One scalar request argument.
#[derive(Debug, Clone, PartialEq)]
pub enum Arg {
    Int(i64),
    Float(f64),
    Text(String),
}

impl Arg {
    fn validate(&self) -> Result<(), CodecError> {
        match self {
            Self::Int(_) => Ok(()),
            Self::Float(v) if v.is_finite() => Ok(()),
            Self::Float(v) => Err(CodecError::InvalidArgument(format!("non-finite number {v}"))),
            Self::Text(s) => {
                if s.is_empty() {
                    return Err(CodecError::InvalidArgument("empty text".into()));
                }
                if s.bytes().any(|b| b == CR || b == LF) {
                    return Err(CodecError::InvalidArgument(format!("{s:?} contains a terminator")));
                }
                if s.contains('\u{b6}') || s.bytes().any(|b| b == SEP) {
                    return Err(CodecError::InvalidArgument(format!("{s:?} contains the separator")));
                }
                if !s.is_ascii() {
                    return Err(CodecError::InvalidArgument(format!("{s:?} is not ASCII")));
                }
                Ok(())
            }
        }
    }
}

impl fmt::Display for Arg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

macro_rules! int_arg {
    ($($t:ty),*) => {$(
        impl From<$t> for Arg {
            fn from(v: $t) -> Self {
                Self::Int(i64::from(v))
            }
        }
    )*};
}

int_arg!(u8, u16, u32, i8, i16, i32, i64);

impl From<bool> for Arg {
    fn from(v: bool) -> Self {
        Self::Int(i64::from(v))
    }
}

impl From<f64> for Arg {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<&str> for Arg {
    fn from(v: &str) -> Self {
        Self::Text(v.to_owned())
    }
}

impl From<String> for Arg {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

// ───────────────────────────────────────────────────────────────
// Requests
// ───────────────────────────────────────────────────────────────

/// A validated request, ready to be written.
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    pub id: u32,
    pub chamber: u8,
    pub args: heapless::Vec<Arg, MAX_ARGS>,
}

impl Request {
    pub fn new(id: u32, chamber: u8, args: &[Arg]) -> Result<Self, CodecError> {
        let mut list = heapless::Vec::new();
        for arg in args {
            arg.validate()?;
            list.push(arg.clone()).map_err(|_| {
                CodecError::InvalidArgument(format!(
                    "{} arguments given, at most {MAX_ARGS} allowed",
                    args.len()
                ))
            })?;
        }
        Ok(Self { id, chamber, args: list })
    }

    /// Serialize into wire bytes, including the CR terminator.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(16 + self.args.len() * 8);
        out.extend_from_slice(self.id.to_string().as_bytes());
        out.push(SEP);
        out.extend_from_slice(self.chamber.to_string().as_bytes());
        for arg in &self.args {
            out.push(SEP);
            out.extend_from_slice(arg.to_string().as_bytes());
        }
        out.push(CR);
        out
    }
}

/// Encode a command identifier, chamber index and arguments into a frame.
pub fn encode(id: u32, chamber: u8, args: &[Arg]) -> Result<Vec<u8>, CodecError> {
    Request::new(id, chamber, args).map(|r| r.to_bytes())
}

// ───────────────────────────────────────────────────────────────
// Responses
// ───────────────────────────────────────────────────────────────

/// A decoded response line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseFrame {
    pub status: i32,
    pub fields: Vec<String>,
}

impl ResponseFrame {
    pub fn is_success(&self) -> bool {
        self.status == super::registry::SUCCESS
    }
}

fn latin1(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| char::from(b)).collect()
}

/// Decode one response line.
///
/// Trailing CR/LF bytes are stripped before splitting. A single empty
/// token left by a trailing separator is not a field. Field count is
/// not checked here.
pub fn decode(raw: &[u8]) -> Result<ResponseFrame, CodecError> {
    let end = raw
        .iter()
        .rposition(|&b| b != CR && b != LF)
        .map_or(0, |i| i + 1);
    let line = &raw[..end];
    if line.is_empty() {
        return Err(CodecError::Malformed("empty frame".into()));
    }

    let mut tokens: Vec<&[u8]> = line.split(|&b| b == SEP).collect();
    if tokens.len() > 1 && tokens.last().is_some_and(|t| t.is_empty()) {
        tokens.pop();
    }

    let head = latin1(tokens[0]);
    let status = head
        .trim()
        .parse::<i32>()
        .map_err(|_| CodecError::Malformed(format!("status {head:?} is not an integer")))?;

    let fields = tokens[1..].iter().map(|t| latin1(t)).collect();
    Ok(ResponseFrame { status, fields })
}

// ───────────────────────────────────────────────────────────────
// Streaming accumulator
// ───────────────────────────────────────────────────────────────

/// Collects stream bytes into CR- or LF-terminated response lines.
#[derive(Debug, Default)]
pub struct LineAccumulator {
    buf: Vec<u8>,
    /// The last line ended on CR; an LF at the start of the next read
    /// belongs to it.
    skip_lf: bool,
}

impl LineAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed bytes in. Returns the first complete line, terminator
    /// included, as soon as its CR (or bare LF) arrives; bytes after it
    /// stay buffered.
    pub fn feed(&mut self, mut data: &[u8]) -> Result<Option<Vec<u8>>, CodecError> {
        if self.skip_lf && !data.is_empty() {
            self.skip_lf = false;
            if data[0] == LF {
                data = &data[1..];
            }
        }
        self.buf.extend_from_slice(data);
        match self.buf.iter().position(|&b| b == CR || b == LF) {
            // Leave room for a CR LF pair inside the cap.
            Some(pos) if pos + 1 < MAX_RESPONSE_LEN => {
                let mut end = pos + 1;
                if self.buf[pos] == CR {
                    match self.buf.get(end) {
                        Some(&LF) => end += 1,
                        Some(_) => {}
                        None => self.skip_lf = true,
                    }
                }
                let line: Vec<u8> = self.buf.drain(..end).collect();
                Ok(Some(line))
            }
            None if self.buf.len() <= MAX_RESPONSE_LEN => Ok(None),
            _ => {
                let len = self.buf.len();
                self.buf.clear();
                Err(CodecError::Malformed(format!(
                    "response exceeds {MAX_RESPONSE_LEN} bytes ({len} buffered)"
                )))
            }
        }
    }

    /// Hand out an unterminated remainder once the stream has gone quiet.
    pub fn finish(&mut self) -> Option<Vec<u8>> {
        if self.buf.is_empty() {
            None
        } else {
            Some(std::mem::take(&mut self.buf))
        }
    }

    /// Bytes received but not yet returned as a line.
    pub fn pending(&self) -> usize {
        self.buf.len()
    }

    /// Drop buffered bytes (e.g. after a reconnect).
    pub fn reset(&mut self) {
        self.buf.clear();
        self.skip_lf = false;
    }
}
