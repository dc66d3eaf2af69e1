//! In-memory chamber fakes for integration tests.
//!
//! * [`ScriptedTransport`] replays canned raw replies and records every
//!   frame the session sends.
//! * [`FakeChamber`] speaks the wire protocol against a small stateful
//!   device model, so multi-step sequences can be asserted end to end.
//!
//! Both keep their state behind an `Rc<RefCell<..>>` handle because the
//! session takes ownership of the transport.

use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::io;
use std::rc::Rc;

use climatebox::app::events::MonitorEvent;
use climatebox::app::ports::{Connector, EventSink};
use climatebox::chamber::ChamberSession;
use climatebox::protocol::codec::SEP;
use climatebox::protocol::transport::Transport;

// ── Scripted transport ────────────────────────────────────────

#[derive(Default)]
pub struct Script {
    pub replies: VecDeque<Vec<u8>>,
    pub sent: Vec<Vec<u8>>,
}

#[derive(Clone, Default)]
pub struct ScriptedTransport {
    pub script: Rc<RefCell<Script>>,
}

#[allow(dead_code)]
impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue one raw reply chunk. An exhausted script reads as EOF.
    pub fn reply(&self, bytes: &[u8]) -> &Self {
        self.script.borrow_mut().replies.push_back(bytes.to_vec());
        self
    }

    pub fn sent(&self) -> Vec<Vec<u8>> {
        self.script.borrow().sent.clone()
    }
}

impl Transport for ScriptedTransport {
    fn send(&mut self, frame: &[u8]) -> io::Result<()> {
        self.script.borrow_mut().sent.push(frame.to_vec());
        Ok(())
    }

    fn receive(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut script = self.script.borrow_mut();
        let Some(mut chunk) = script.replies.pop_front() else {
            return Ok(0);
        };
        let n = chunk.len().min(buf.len());
        buf[..n].copy_from_slice(&chunk[..n]);
        if n < chunk.len() {
            script.replies.push_front(chunk.split_off(n));
        }
        Ok(n)
    }
}

// ── Fake chamber ──────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct FakeMessage {
    pub kind: u32,
    pub active: bool,
    pub text: String,
}

/// One decoded request as the device saw it.
#[derive(Debug, Clone, PartialEq)]
pub struct SeenRequest {
    pub id: u32,
    pub chamber: String,
    pub args: Vec<String>,
}

#[derive(Debug)]
pub struct ChamberState {
    pub temperature: f64,
    pub setpoint: f64,
    pub grad_up: f64,
    pub grad_down: f64,
    pub outputs: HashMap<u32, bool>,
    pub program_status: u32,
    pub program_number: u32,
    pub program_name: String,
    pub messages: Vec<FakeMessage>,
    pub requests: Vec<SeenRequest>,
    /// Next `receive` fails with this error kind (one shot).
    pub fail_next_receive: Option<io::ErrorKind>,
    /// Next request is answered with this status code (one shot).
    pub reject_next: Option<i32>,
    /// The n-th request overall (1-based) is answered with this status code.
    pub reject_nth: Option<(usize, i32)>,
    /// Connector refuses new connections.
    pub refuse_connect: bool,
    pub connects: usize,
}

impl Default for ChamberState {
    fn default() -> Self {
        Self {
            temperature: 22.0,
            setpoint: -20.0,
            grad_up: 3.0,
            grad_down: 3.0,
            outputs: HashMap::new(),
            program_status: 0,
            program_number: 0,
            program_name: String::new(),
            messages: Vec::new(),
            requests: Vec::new(),
            fail_next_receive: None,
            reject_next: None,
            reject_nth: None,
            refuse_connect: false,
            connects: 0,
        }
    }
}

#[allow(dead_code)]
impl ChamberState {
    pub fn output(&self, channel: u32) -> bool {
        self.outputs.get(&channel).copied().unwrap_or(false)
    }

    pub fn request_ids(&self) -> Vec<u32> {
        self.requests.iter().map(|r| r.id).collect()
    }

    pub fn count(&self, id: u32) -> usize {
        self.requests.iter().filter(|r| r.id == id).count()
    }

    /// Start the running program `number`.
    pub fn run_program(&mut self, number: u32, name: &str) {
        self.program_number = number;
        self.program_name = name.into();
        self.program_status = 1;
    }

    fn chamber_status(&self) -> u32 {
        let mut raw = 1;
        if self.output(1) || self.program_number > 0 {
            raw |= 2;
        }
        if self.messages.iter().any(|m| m.active && m.kind & 2 != 0) {
            raw |= 4;
        }
        if self.messages.iter().any(|m| m.active && m.kind & 1 != 0) {
            raw |= 8;
        }
        raw
    }

    fn message(&self, args: &[String]) -> Option<&FakeMessage> {
        let index: usize = args.first()?.parse().ok()?;
        self.messages.get(index.checked_sub(1)?)
    }

    fn respond(&mut self, req: &SeenRequest) -> Vec<String> {
        let arg = |i: usize| req.args.get(i).cloned().unwrap_or_default();
        let num = |i: usize| arg(i).parse::<f64>().unwrap_or(f64::NAN);
        let ok = |fields: Vec<String>| {
            let mut v = vec!["1".to_string()];
            v.extend(fields);
            v
        };
        match req.id {
            99997 => ok(vec!["ClimateBox fake".into(), "1.0".into()]),
            10012 => ok(vec![self.chamber_status().to_string()]),
            11004 => ok(vec![self.temperature.to_string()]),
            11002 => ok(vec![self.setpoint.to_string()]),
            11001 => {
                self.setpoint = num(1);
                ok(vec![])
            }
            11066 => ok(vec![self.grad_up.to_string()]),
            11070 => ok(vec![self.grad_down.to_string()]),
            11068 => {
                self.grad_up = num(1);
                ok(vec![])
            }
            11072 => {
                self.grad_down = num(1);
                ok(vec![])
            }
            14003 => {
                let on = arg(0).parse().map(|ch| self.output(ch)).unwrap_or(false);
                ok(vec![u8::from(on).to_string()])
            }
            14001 => match (arg(0).parse::<u32>(), arg(1).as_str()) {
                (Ok(ch), "1") => {
                    self.outputs.insert(ch, true);
                    ok(vec![])
                }
                (Ok(ch), "0") => {
                    self.outputs.insert(ch, false);
                    ok(vec![])
                }
                _ => vec!["-6".into()],
            },
            19210 => ok(vec![self.program_status.to_string()]),
            19204 => ok(vec![self.program_number.to_string()]),
            19031 => ok(vec![self.program_name.clone()]),
            17002 => ok(vec![self.messages.len().to_string()]),
            17009 => match self.message(&req.args) {
                Some(m) => ok(vec![u8::from(m.active).to_string()]),
                None => vec!["-6".into()],
            },
            17005 => match self.message(&req.args) {
                Some(m) => ok(vec![m.kind.to_string()]),
                None => vec!["-6".into()],
            },
            17007 => match self.message(&req.args) {
                Some(m) => ok(vec![m.text.clone()]),
                None => vec!["-6".into()],
            },
            17012 => {
                for m in &mut self.messages {
                    m.active = false;
                }
                ok(vec![])
            }
            _ => vec!["-5".into()],
        }
    }
}

fn latin1(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| char::from(b)).collect()
}

pub struct FakeChamber {
    pub state: Rc<RefCell<ChamberState>>,
    outbox: Vec<u8>,
}

impl FakeChamber {
    pub fn new(state: Rc<RefCell<ChamberState>>) -> Self {
        Self {
            state,
            outbox: Vec::new(),
        }
    }
}

impl Transport for FakeChamber {
    fn send(&mut self, frame: &[u8]) -> io::Result<()> {
        let body = frame.strip_suffix(b"\r").unwrap_or(frame);
        let mut tokens = body.split(|&b| b == SEP).map(latin1);
        let id = tokens.next().and_then(|t| t.parse().ok()).unwrap_or(0);
        let chamber = tokens.next().unwrap_or_default();
        let req = SeenRequest {
            id,
            chamber,
            args: tokens.collect(),
        };

        let mut state = self.state.borrow_mut();
        let nth = state.requests.len() + 1;
        let scheduled = match state.reject_nth {
            Some((n, code)) if n == nth => Some(code),
            _ => None,
        };
        let reply = match state.reject_next.take().or(scheduled) {
            Some(code) => vec![code.to_string()],
            None => state.respond(&req),
        };
        state.requests.push(req);

        for (i, field) in reply.iter().enumerate() {
            if i > 0 {
                self.outbox.push(SEP);
            }
            self.outbox.extend(field.chars().map(|c| c as u8));
        }
        self.outbox.extend_from_slice(b"\r\n");
        Ok(())
    }

    fn receive(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if let Some(kind) = self.state.borrow_mut().fail_next_receive.take() {
            self.outbox.clear();
            return Err(io::Error::new(kind, "injected failure"));
        }
        let n = self.outbox.len().min(buf.len());
        buf[..n].copy_from_slice(&self.outbox[..n]);
        self.outbox.drain(..n);
        Ok(n)
    }
}

// ── Connector and sink ────────────────────────────────────────

pub struct FakeConnector {
    pub state: Rc<RefCell<ChamberState>>,
}

impl Connector for FakeConnector {
    type Transport = FakeChamber;

    fn connect(&mut self) -> climatebox::Result<ChamberSession<FakeChamber>> {
        let mut state = self.state.borrow_mut();
        if state.refuse_connect {
            return Err(io::Error::new(io::ErrorKind::ConnectionRefused, "refused").into());
        }
        state.connects += 1;
        Ok(ChamberSession::new(FakeChamber::new(Rc::clone(&self.state))))
    }
}

/// Shared fake device plus a connector and a direct session onto it.
#[allow(dead_code)]
pub fn fake_chamber() -> (Rc<RefCell<ChamberState>>, ChamberSession<FakeChamber>) {
    let state = Rc::new(RefCell::new(ChamberState::default()));
    let session = ChamberSession::new(FakeChamber::new(Rc::clone(&state)));
    (state, session)
}

#[derive(Default)]
pub struct RecordingSink {
    pub events: Vec<MonitorEvent>,
}

#[allow(dead_code)]
impl RecordingSink {
    pub fn count(&self, pred: impl Fn(&MonitorEvent) -> bool) -> usize {
        self.events.iter().filter(|e| pred(e)).count()
    }
}

impl EventSink for RecordingSink {
    fn emit(&mut self, event: &MonitorEvent) {
        self.events.push(event.clone());
    }
}
