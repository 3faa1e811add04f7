//! Session-level error types.
//!
//! Tool failures are not errors at this level: they travel inside a
//! successful reply as [`ToolOutcome`](crate::tools::ToolOutcome) with
//! `is_error = true`. What remains here is the transport tier (the session is
//! gone) and the protocol tier (one request was rejected).

use crate::protocol::{RequestId, RpcError};
use std::io;
use std::time::Duration;

/// Failure of the framed byte stream. Fatal to the session.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The peer closed its side of the stream.
    #[error("peer closed the stream")]
    Closed,

    /// No frame arrived within the configured read timeout.
    #[error("no frame received within {0:?}")]
    Timeout(Duration),

    /// A line was read but could not be decoded as a frame. `id` is the
    /// request id when it could still be recovered from the raw JSON.
    #[error("malformed frame: {message}")]
    Parse {
        message: String,
        id: Option<RequestId>,
    },

    /// A frame could not be serialized.
    #[error("failed to encode frame: {0}")]
    Encode(#[source] serde_json::Error),

    /// The peer broke the request/reply contract (mismatched id, empty reply).
    #[error("protocol violation: {0}")]
    Protocol(String),

    #[error("I/O error on protocol stream: {0}")]
    Io(#[source] io::Error),
}

impl From<io::Error> for TransportError {
    fn from(e: io::Error) -> Self {
        match e.kind() {
            io::ErrorKind::BrokenPipe
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::UnexpectedEof => TransportError::Closed,
            _ => TransportError::Io(e),
        }
    }
}

/// Errors surfaced by [`Client`](crate::client::Client).
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The host executable could not be started.
    #[error("failed to spawn tool host `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: io::Error,
    },

    /// `initialize` was rejected, timed out, or returned garbage.
    #[error("handshake with tool host failed: {0}")]
    Handshake(String),

    /// The host answered a request with a protocol-level error.
    #[error("`{method}` rejected by tool host: {error}")]
    Invocation { method: String, error: RpcError },

    #[error(transparent)]
    Transport(#[from] TransportError),
}

impl ClientError {
    /// Whether the session is unusable after this error.
    ///
    /// Only [`ClientError::Invocation`] leaves the session intact; the
    /// request failed but the next one may succeed.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, ClientError::Invocation { .. })
    }
}
