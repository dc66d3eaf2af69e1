//! Transport abstraction: any blocking byte stream to the chamber.
//!
//! The session is generic over `Transport`, so tests drive it with
//! in-memory fakes and production uses [`TcpTransport`].

use std::io::{self, Read, Write};
use std::net::{Shutdown, TcpStream, ToSocketAddrs};
use std::time::Duration;

use log::{debug, info};

/// Blocking byte-oriented channel.
pub trait Transport {
    /// Write the whole frame.
    fn send(&mut self, frame: &[u8]) -> io::Result<()>;

    /// Read up to `buf.len()` bytes. Blocks until data arrives, the peer
    /// closes (`Ok(0)`) or the read timeout elapses.
    fn receive(&mut self, buf: &mut [u8]) -> io::Result<usize>;

    /// Close the channel. Further calls may fail.
    fn shutdown(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Connect and read/write deadlines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    pub connect: Duration,
    pub io: Duration,
}

/// TCP stream to the chamber's protocol server.
pub struct TcpTransport {
    stream: TcpStream,
}

impl TcpTransport {
    /// Connect to `host:port`, trying each resolved address in turn.
    ///
    /// Both deadlines are applied; a zero duration is rejected by the
    /// standard library and surfaces as `InvalidInput`.
    pub fn connect(host: &str, port: u16, timeouts: Timeouts) -> io::Result<Self> {
        let mut last_err = None;
        for addr in (host, port).to_socket_addrs()? {
            debug!("TCP: connecting to {addr}");
            match TcpStream::connect_timeout(&addr, timeouts.connect) {
                Ok(stream) => {
                    stream.set_read_timeout(Some(timeouts.io))?;
                    stream.set_write_timeout(Some(timeouts.io))?;
                    stream.set_nodelay(true)?;
                    info!("TCP: connected to {addr}");
                    return Ok(Self { stream });
                }
                Err(e) => last_err = Some(e),
            }
        }
        Err(last_err.unwrap_or_else(|| {
            io::Error::new(io::ErrorKind::NotFound, format!("{host}:{port} did not resolve"))
        }))
    }
}

impl Transport for TcpTransport {
    fn send(&mut self, frame: &[u8]) -> io::Result<()> {
        self.stream.write_all(frame)?;
        self.stream.flush()
    }

    fn receive(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.stream.read(buf)
    }

    fn shutdown(&mut self) -> io::Result<()> {
        match self.stream.shutdown(Shutdown::Both) {
            Err(e) if e.kind() != io::ErrorKind::NotConnected => Err(e),
            _ => Ok(()),
        }
    }
}
