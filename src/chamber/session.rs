//! Chamber session: one exclusive connection, one request at a time.
//!
//! The protocol has no request identifiers, so a response can only be
//! matched to the request that preceded it. Every operation here is a
//! blocking round trip (or a fixed sequence of them) on `&mut self`,
//! which makes overlapping requests impossible by construction.
//!
//! Nothing is retried. A failed round trip is returned to the caller,
//! who decides whether to reconnect before the next tick.

use std::io;
use std::str::FromStr;

use log::{debug, info, warn};

use crate::app::ports::ChamberControl;
use crate::config::ConnectionConfig;
use crate::error::{Error, Result};
use crate::protocol::codec::{self, Arg, LineAccumulator, Request};
use crate::protocol::registry;
use crate::protocol::transport::{TcpTransport, Transport};

use super::status::{ChamberSnapshot, ChamberStatus, Message, MessageType, RunState, RunStatus};

/// Chamber index used when none is configured.
pub const DEFAULT_CHAMBER: u8 = 1;

/// Control variable 1 is the chamber temperature.
pub const TEMPERATURE_VAR: u8 = 1;

/// Digital output that switches manual mode.
pub const MANUAL_RUN_OUTPUT: u8 = 1;

/// Utility digital outputs, by device convention.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Utility {
    CompressedAir,
    Dryer,
}

impl Utility {
    pub const fn channel(self) -> u8 {
        match self {
            Self::CompressedAir => 7,
            Self::Dryer => 8,
        }
    }
}

/// Parse the first field of a response.
fn first<V: FromStr>(path: &str, fields: &[String]) -> Result<V> {
    let raw = fields
        .first()
        .ok_or_else(|| Error::MalformedResponse(format!("'{path}' returned no fields")))?;
    raw.trim()
        .parse()
        .map_err(|_| Error::MalformedResponse(format!("'{path}' returned {raw:?}")))
}

/// One open connection to a chamber.
pub struct ChamberSession<T: Transport> {
    transport: T,
    chamber: u8,
    rx: LineAccumulator,
}

impl ChamberSession<TcpTransport> {
    /// Open a TCP session using the configured endpoint and deadlines.
    pub fn connect(cfg: &ConnectionConfig) -> Result<Self> {
        let transport = TcpTransport::connect(&cfg.host, cfg.port, cfg.timeouts())?;
        Ok(Self::with_chamber(transport, cfg.chamber_index))
    }
}

impl<T: Transport> ChamberSession<T> {
    pub fn new(transport: T) -> Self {
        Self::with_chamber(transport, DEFAULT_CHAMBER)
    }

    pub fn with_chamber(transport: T, chamber: u8) -> Self {
        Self {
            transport,
            chamber,
            rx: LineAccumulator::new(),
        }
    }

    pub fn chamber(&self) -> u8 {
        self.chamber
    }

    /// Close the connection. The session cannot be used afterwards.
    pub fn disconnect(mut self) -> Result<()> {
        info!("Closing chamber connection");
        self.transport.shutdown()?;
        Ok(())
    }

    // ── Raw execution ─────────────────────────────────────────

    /// Run one command and return its fields.
    ///
    /// A non-success status becomes [`Error::Protocol`], which still
    /// carries the decoded fields.
    pub fn execute(&mut self, path: &str, args: &[Arg]) -> Result<Vec<String>> {
        let cmd = registry::lookup(path)?;
        if let registry::Arity::Exact(expected) = cmd.arity {
            if expected != args.len() {
                return Err(Error::ArgumentCount {
                    command: cmd.path,
                    expected,
                    got: args.len(),
                });
            }
        }
        let request = Request::new(cmd.id, self.chamber, args)?;

        if self.rx.pending() > 0 {
            warn!("Discarding {} stale bytes before '{}'", self.rx.pending(), cmd.path);
            self.rx.reset();
        }

        if cmd.is_write() {
            info!("-> {} {:?}", cmd, request.args);
        } else {
            debug!("-> {} {:?}", cmd, request.args);
        }
        self.transport.send(&request.to_bytes())?;
        let line = self.read_line()?;
        let frame = codec::decode(&line)?;
        debug!("<- {} {:?}", frame.status, frame.fields);

        if frame.is_success() {
            Ok(frame.fields)
        } else {
            let description = registry::describe(frame.status);
            warn!("'{}' failed: {} ({})", cmd.path, description, frame.status);
            Err(Error::Protocol {
                code: frame.status,
                description,
                fields: frame.fields,
            })
        }
    }

    /// Read until the first terminated line. A peer that goes quiet (EOF
    /// or read timeout) after an unterminated reply still yields that
    /// reply; going quiet with nothing buffered is a transport error.
    fn read_line(&mut self) -> Result<Vec<u8>> {
        let mut buf = [0u8; 512];
        loop {
            let n = match self.transport.receive(&mut buf) {
                Ok(n) => n,
                Err(e)
                    if self.rx.pending() > 0
                        && matches!(e.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut) =>
                {
                    0
                }
                Err(e) => return Err(e.into()),
            };
            if n == 0 {
                return match self.rx.finish() {
                    Some(line) => {
                        debug!("Unterminated reply of {} bytes", line.len());
                        Ok(line)
                    }
                    None => Err(io::Error::new(
                        io::ErrorKind::UnexpectedEof,
                        "chamber closed the connection",
                    )
                    .into()),
                };
            }
            if let Some(line) = self.rx.feed(&buf[..n])? {
                return Ok(line);
            }
        }
    }

    fn query<V: FromStr>(&mut self, path: &str, args: &[Arg]) -> Result<V> {
        let fields = self.execute(path, args)?;
        first(path, &fields)
    }

    // ── Reads ─────────────────────────────────────────────────

    /// Identification fields reported by the chamber.
    pub fn info(&mut self) -> Result<Vec<String>> {
        self.execute("GET CHAMBER INFO", &[])
    }

    /// Actual chamber temperature in °C.
    pub fn temperature(&mut self) -> Result<f64> {
        self.query("GET CTRL_VAR VAL", &[TEMPERATURE_VAR.into()])
    }

    /// Temperature setpoint in °C.
    pub fn setpoint(&mut self) -> Result<f64> {
        self.query("GET CTRL_VAR SETPOINT", &[TEMPERATURE_VAR.into()])
    }

    pub fn digital_output(&mut self, channel: u8) -> Result<bool> {
        let v: u32 = self.query("GET DIGI_OUT VAL", &[channel.into()])?;
        Ok(v != 0)
    }

    pub fn utility(&mut self, utility: Utility) -> Result<bool> {
        self.digital_output(utility.channel())
    }

    /// Warm-up (up) and cool-down (down) gradients in K/min.
    pub fn gradients(&mut self) -> Result<(f64, f64)> {
        let up = self.query("GET GRAD_UP VAL", &[TEMPERATURE_VAR.into()])?;
        let down = self.query("GET GRAD_DWN VAL", &[TEMPERATURE_VAR.into()])?;
        Ok((up, down))
    }

    pub fn chamber_status(&mut self) -> Result<ChamberStatus> {
        self.query("GET CHAMBER STATUS", &[]).map(ChamberStatus::from_raw)
    }

    pub fn program_status(&mut self) -> Result<RunStatus> {
        self.query("GET PRGM STATUS", &[]).map(RunStatus::from_raw)
    }

    /// Number of the running program, 0 when none.
    pub fn program_number(&mut self) -> Result<u32> {
        self.query("GET PRGM NUM", &[])
    }

    pub fn program_name(&mut self, number: u32) -> Result<String> {
        self.query("GET PRGM NAME", &[number.into()])
    }

    /// Program, manual run or idle.
    pub fn run_state(&mut self) -> Result<RunState> {
        let number = self.program_number()?;
        if number > 0 {
            let name = self.program_name(number)?;
            return Ok(RunState::Program { number, name });
        }
        if self.chamber_status()?.running {
            Ok(RunState::Manual)
        } else {
            Ok(RunState::Idle)
        }
    }

    pub fn message_count(&mut self) -> Result<u32> {
        self.query("GET MSG NUM", &[])
    }

    /// Whether message `index` (1-based) is active.
    pub fn message_status(&mut self, index: u32) -> Result<bool> {
        let v: u32 = self.query("GET MSG STATUS", &[index.into()])?;
        Ok(v == 1)
    }

    pub fn message_type(&mut self, index: u32) -> Result<MessageType> {
        self.query("GET MSG TYPE", &[index.into()])
            .map(|raw| MessageType { raw })
    }

    pub fn message_text(&mut self, index: u32) -> Result<String> {
        let fields = self.execute("GET MSG TEXT", &[index.into()])?;
        fields
            .into_iter()
            .next()
            .ok_or_else(|| Error::MalformedResponse("'GET MSG TEXT' returned no fields".into()))
    }

    /// Indices and types of active alarms and warnings.
    fn active_message_kinds(&mut self) -> Result<Vec<(u32, MessageType)>> {
        let count = self.message_count()?;
        let mut active = Vec::new();
        for index in 1..=count {
            if !self.message_status(index)? {
                continue;
            }
            let kind = self.message_type(index)?;
            if kind.needs_attention() {
                active.push((index, kind));
            }
        }
        Ok(active)
    }

    /// Number of active alarms and warnings.
    pub fn active_warning_count(&mut self) -> Result<usize> {
        self.active_message_kinds().map(|v| v.len())
    }

    /// Active alarms and warnings with their text.
    pub fn active_messages(&mut self) -> Result<Vec<Message>> {
        let kinds = self.active_message_kinds()?;
        let mut out = Vec::with_capacity(kinds.len());
        for (index, kind) in kinds {
            let text = self.message_text(index)?;
            out.push(Message { index, kind, text });
        }
        Ok(out)
    }

    /// Everything the status reporter shows.
    pub fn snapshot(&mut self) -> Result<ChamberSnapshot> {
        Ok(ChamberSnapshot {
            run_state: self.run_state()?,
            temperature_c: self.temperature()?,
            setpoint_c: self.setpoint()?,
            compressed_air: self.utility(Utility::CompressedAir)?,
            dryer: self.utility(Utility::Dryer)?,
        })
    }

    // ── Writes ────────────────────────────────────────────────

    pub fn set_control_setpoint(&mut self, target_c: f64) -> Result<()> {
        self.execute("SET CTRL_VAR SETPOINT", &[TEMPERATURE_VAR.into(), target_c.into()])
            .map(drop)
    }

    pub fn set_digital_output(&mut self, channel: u8, on: bool) -> Result<()> {
        self.execute("SET DIGI_OUT VAL", &[channel.into(), on.into()])
            .map(drop)
    }

    pub fn set_utility(&mut self, utility: Utility, on: bool) -> Result<()> {
        self.set_digital_output(utility.channel(), on)
    }

    pub fn start_manual_run(&mut self) -> Result<()> {
        self.execute("START MANUAL", &[MANUAL_RUN_OUTPUT.into(), true.into()])
            .map(drop)
    }

    pub fn stop_manual_run(&mut self) -> Result<()> {
        self.execute("START MANUAL", &[MANUAL_RUN_OUTPUT.into(), false.into()])
            .map(drop)
    }

    /// Set both the up and down gradient (K/min).
    pub fn set_warm_up_gradients(&mut self, gradient: f64) -> Result<()> {
        self.execute("SET GRAD_UP VAL", &[TEMPERATURE_VAR.into(), gradient.into()])?;
        self.execute("SET GRAD_DWN VAL", &[TEMPERATURE_VAR.into(), gradient.into()])?;
        Ok(())
    }

    /// Acknowledge all device errors.
    pub fn reset_errors(&mut self) -> Result<()> {
        self.execute("RESET ERROR", &[]).map(drop)
    }

    // ── Compound operations ───────────────────────────────────

    fn ensure_no_program(&mut self, action: &str) -> Result<()> {
        let status = self.program_status()?;
        if status.is_idle() {
            Ok(())
        } else {
            warn!("Refusing to {action}: a program is active ({status})");
            Err(Error::UnsupportedState(format!("a program is active ({status})")))
        }
    }

    /// Drive the chamber to `target_c` at `gradient` K/min in manual mode
    /// with compressed air and dryer on.
    ///
    /// Refused while a program is active. The first failing step aborts
    /// the sequence. The run keeps going until an operator stops it.
    pub fn force_warm_up(&mut self, target_c: f64, gradient: f64) -> Result<()> {
        if !target_c.is_finite() {
            return Err(Error::InvalidArgument(format!("target temperature {target_c}")));
        }
        if !(gradient.is_finite() && gradient > 0.0) {
            return Err(Error::InvalidArgument(format!("gradient {gradient} K/min")));
        }
        self.ensure_no_program("force warm-up")?;

        warn!(
            "Force warm-up to {:.1} \u{00b0}C with a gradient of {:.1} K/min",
            target_c, gradient
        );
        self.set_control_setpoint(target_c)?;
        self.set_warm_up_gradients(gradient)?;

        info!("Turning on compressed air and dryer");
        self.set_utility(Utility::CompressedAir, true)?;
        self.set_utility(Utility::Dryer, true)?;

        info!("Starting forced warm-up");
        self.start_manual_run()?;
        warn!("Warm-up runs until the chamber is stopped by an operator");
        Ok(())
    }

    /// Switch manual run off without warming up.
    ///
    /// Refused while a program is active.
    pub fn stop(&mut self) -> Result<()> {
        self.ensure_no_program("stop")?;
        let temp = self.temperature()?;
        warn!("Stop running at temperature {:.1} \u{00b0}C; no warm-up!", temp);
        self.stop_manual_run()
    }
}

impl<T: Transport> ChamberControl for ChamberSession<T> {
    fn force_warm_up(&mut self, target_c: f64, gradient: f64) -> Result<()> {
        ChamberSession::force_warm_up(self, target_c, gradient)
    }
}
