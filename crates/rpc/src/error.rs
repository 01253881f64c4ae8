//! Error types for remote calls.

use std::time::Duration;

use thiserror::Error;

/// Result type alias for the RPC layer.
pub type Result<T> = std::result::Result<T, RpcError>;

/// Typed outcome of a failed remote call.
#[derive(Debug, Error)]
pub enum RpcError {
    /// The peer did not answer within the call timeout.
    #[error("call {call} to {peer} timed out after {after:?}")]
    Timeout {
        peer: String,
        call: &'static str,
        after: Duration,
    },
    /// No connection could be opened.
    #[error("peer {peer} unreachable: {reason}")]
    Unreachable { peer: String, reason: String },
    /// The connection dropped before a response arrived.
    #[error("connection to {peer} closed mid-call")]
    Closed { peer: String },
    /// The peer handled the call and reported a failure.
    #[error("peer {peer} failed {call}: {message}")]
    Remote {
        peer: String,
        call: &'static str,
        message: String,
    },
    #[error("unexpected response to {call}: {got}")]
    UnexpectedResponse { call: &'static str, got: String },
    #[error("codec error: {0}")]
    Codec(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    /// A wire value could not be turned into a ring entity.
    #[error(transparent)]
    Invalid(#[from] corelib::Error),
}

impl RpcError {
    /// Whether the peer could not be reached or dropped the connection.
    pub fn is_connection_failure(&self) -> bool {
        matches!(self, RpcError::Unreachable { .. } | RpcError::Closed { .. })
    }
}

impl From<bincode::Error> for RpcError {
    fn from(e: bincode::Error) -> Self {
        RpcError::Codec(e.to_string())
    }
}
