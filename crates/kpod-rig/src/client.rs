//! rigctld client implementation.

use std::time::Duration;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tracing::{debug, info, warn};

use crate::Rig;
use crate::error::{RigError, RigResult};
use crate::response::{RigResponse, is_terminator};

/// A bidirectional line stream to the daemon.
trait RigStream: AsyncBufRead + AsyncWrite + Unpin + Send {}

impl<S: AsyncBufRead + AsyncWrite + Unpin + Send> RigStream for S {}

/// Client for a rigctld daemon.
///
/// The connection is opened lazily on the first request. Any I/O failure
/// drops it, and the next request opens a fresh one.
pub struct RigClient {
    addr: String,
    stream: Option<Box<dyn RigStream>>,
    read_timeout: Option<Duration>,
}

impl RigClient {
    /// Create a client for the daemon at `server:port`. No connection is made
    /// until the first request.
    #[must_use]
    pub fn new(server: &str, port: u16) -> Self {
        Self { addr: format!("{server}:{port}"), stream: None, read_timeout: None }
    }

    /// Bound the duration of a single request/response round trip.
    ///
    /// Without a timeout a daemon that stops answering blocks the caller
    /// indefinitely.
    #[must_use]
    pub fn with_read_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.read_timeout = timeout;
        self
    }

    /// The daemon address.
    #[must_use]
    pub fn addr(&self) -> &str {
        &self.addr
    }

    /// Whether a connection is currently open.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.stream.is_some()
    }

    /// Send a command and wait for its complete response.
    ///
    /// # Errors
    /// Returns a connection error if the daemon cannot be reached or the
    /// exchange fails midway (the connection is discarded), or a
    /// [`RigError::ReturnCode`] / [`RigError::Protocol`] error for a
    /// response the daemon completed but which reports failure.
    pub async fn send(&mut self, command: &str) -> RigResult<RigResponse> {
        let mut stream = match self.stream.take() {
            Some(stream) => stream,
            None => self.connect().await?,
        };

        let text = match self.exchange(&mut stream, command).await {
            Ok(text) => {
                self.stream = Some(stream);
                text
            }
            Err(e) => {
                warn!(addr = %self.addr, command, error = %e, "Rig connection lost");
                return Err(e);
            }
        };

        debug!(command, response = ?text, "Rig response received");
        RigResponse::parse(command, &text)
    }

    async fn connect(&self) -> RigResult<Box<dyn RigStream>> {
        let stream = TcpStream::connect(&self.addr)
            .await
            .map_err(|source| RigError::Connect { addr: self.addr.clone(), source })?;
        stream.set_nodelay(true)?;
        info!(addr = %self.addr, "Connected to rig daemon");
        Ok(Box::new(BufReader::new(stream)))
    }

    async fn exchange(&self, stream: &mut Box<dyn RigStream>, command: &str) -> RigResult<String> {
        match self.read_timeout {
            Some(limit) => tokio::time::timeout(limit, round_trip(stream, command))
                .await
                .map_err(|_| RigError::Timeout)?,
            None => round_trip(stream, command).await,
        }
    }
}

/// Write one command line and read lines until a complete terminator line.
async fn round_trip<S>(stream: &mut S, command: &str) -> RigResult<String>
where
    S: AsyncBufRead + AsyncWrite + Unpin,
{
    let request = format!("{command}\n");
    debug!(command, "Sending rig command");

    let mut pending = request.as_bytes();
    while !pending.is_empty() {
        let written = stream.write(pending).await?;
        if written == 0 {
            return Err(RigError::WriteZero);
        }
        pending = &pending[written..];
    }

    let mut text = String::new();
    loop {
        let start = text.len();
        if stream.read_line(&mut text).await? == 0 {
            return Err(RigError::ConnectionClosed);
        }
        let line = &text[start..];
        if line.ends_with('\n') && is_terminator(line) {
            return Ok(text);
        }
    }
}

impl Rig for RigClient {
    async fn get_frequency(&mut self) -> RigResult<i64> {
        self.send("+f").await?.frequency()
    }

    async fn set_frequency(&mut self, hz: i64) -> RigResult<()> {
        self.send(&format!("+F{hz}")).await.map(|_| ())
    }
}
