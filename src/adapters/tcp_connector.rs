//! TCP connector adapter.
//!
//! Implements [`Connector`] by opening a fresh [`TcpTransport`] to the
//! configured chamber endpoint. The monitor calls it once at start-up and
//! again on the tick after a transport failure.

use log::info;

use crate::app::ports::Connector;
use crate::chamber::ChamberSession;
use crate::config::ConnectionConfig;
use crate::error::Result;
use crate::protocol::transport::TcpTransport;

pub struct TcpConnector {
    config: ConnectionConfig,
}

impl TcpConnector {
    pub fn new(config: ConnectionConfig) -> Self {
        Self { config }
    }
}

impl Connector for TcpConnector {
    type Transport = TcpTransport;

    fn connect(&mut self) -> Result<ChamberSession<TcpTransport>> {
        info!(
            "Connecting to climate chamber at {}:{}",
            self.config.host, self.config.port
        );
        ChamberSession::connect(&self.config)
    }
}
