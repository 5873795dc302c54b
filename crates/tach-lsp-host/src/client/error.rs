//! Error types for the process-based language client.

use std::io;
use std::sync::Arc;

use thiserror::Error;

use super::jsonrpc::JsonRpcError;

/// Errors raised while driving a language-server process.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The interpreter binary was not found.
    #[error("language server binary not found: {command}")]
    BinaryNotFound {
        /// Command that was not found.
        command: String,
        /// Underlying I/O error.
        #[source]
        source: Arc<io::Error>,
    },

    /// The process could not be spawned.
    #[error("failed to spawn language server process: {message}")]
    SpawnFailed {
        /// Description of the spawn failure.
        message: String,
        /// Underlying I/O error.
        #[source]
        source: Arc<io::Error>,
    },

    /// Framing or stream failure.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// JSON serialisation failure.
    #[error("JSON codec error: {0}")]
    Codec(#[from] serde_json::Error),

    /// The server answered with an error object.
    #[error("server returned error: {message} (code: {code})")]
    ServerError {
        /// JSON-RPC error code.
        code: i64,
        /// Server-provided message.
        message: String,
    },

    /// No response arrived in time.
    #[error("{method} request timed out after {timeout_secs}s")]
    Timeout {
        /// Method awaiting a response.
        method: String,
        /// Timeout in seconds.
        timeout_secs: u64,
    },

    /// The initialisation handshake failed.
    #[error("initialization failed: {message}")]
    InitializationFailed {
        /// Description of the failure.
        message: String,
    },

    /// Too many unrelated responses arrived while waiting for one request.
    #[error("gave up waiting for response to request {request_id}")]
    MaxResponseIterations {
        /// Request that never received a response.
        request_id: i64,
    },

    /// The server process is not running.
    #[error("language server process exited unexpectedly")]
    ProcessExited,
}

impl ClientError {
    /// Creates a server error from a JSON-RPC error object.
    #[must_use]
    pub fn from_jsonrpc(error: JsonRpcError) -> Self {
        Self::ServerError {
            code: error.code,
            message: error.message,
        }
    }
}

/// Transport-layer errors.
#[derive(Debug, Error)]
pub enum TransportError {
    /// I/O error during read or write.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Missing Content-Length header.
    #[error("missing Content-Length header")]
    MissingContentLength,

    /// Header line that could not be interpreted.
    #[error("invalid header: {line}")]
    InvalidHeader {
        /// Offending header line.
        line: String,
    },
}

impl TransportError {
    /// Returns `true` when the peer closed the stream.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        matches!(self, Self::Io(error) if error.kind() == io::ErrorKind::UnexpectedEof)
    }
}
