//! Rig link error types.

use thiserror::Error;

/// Rig link error type.
#[derive(Debug, Error)]
pub enum RigError {
    #[error("Failed to connect to {addr}: {source}")]
    Connect {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Connection closed by rig daemon")]
    ConnectionClosed,

    #[error("Write to rig daemon sent zero bytes")]
    WriteZero,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Request timeout")]
    Timeout,

    #[error("Command {command:?} failed with return code {code}")]
    ReturnCode { command: String, code: i32 },

    #[error("Protocol error: {0}")]
    Protocol(String),
}

impl RigError {
    /// Whether this error means the connection is unusable.
    ///
    /// Connection errors discard the socket; the next request reconnects.
    #[must_use]
    pub fn is_connection(&self) -> bool {
        matches!(
            self,
            Self::Connect { .. } | Self::ConnectionClosed | Self::WriteZero | Self::Io(_) | Self::Timeout
        )
    }
}

/// Result type for rig operations.
pub type RigResult<T> = Result<T, RigError>;
