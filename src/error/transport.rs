//! Transport-level error variants and classification.

use thiserror::Error;

/// Errors surfaced by a [`StreamTransport`](crate::traits::StreamTransport)
/// while opening or reading a streaming request.
#[derive(Debug, Clone, Error)]
pub enum TransportError {
    /// Connection to the server failed.
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// Request or read timed out at the transport layer.
    #[error("request timeout: {0}")]
    Timeout(String),

    /// Server returned a non-success status.
    #[error("unexpected HTTP status {status}")]
    HttpStatus { status: u16 },

    /// Response content-type does not indicate an event stream.
    #[error("unexpected content type: {0}")]
    ContentType(String),

    /// The body stream failed mid-read.
    #[error("stream read failed: {0}")]
    Io(String),

    /// The body stream ended without a `[DONE]` sentinel.
    #[error("stream ended")]
    StreamEnded,

    /// Generic transport error.
    #[error("transport error: {0}")]
    Other(String),
}

impl TransportError {
    /// Check if this error is likely transient and worth retrying.
    ///
    /// The connection actor retries every error up to its cap regardless;
    /// this is informational, surfaced for logging and callers.
    pub fn is_retryable(&self) -> bool {
        match self {
            TransportError::ConnectionFailed(_) => true,
            TransportError::Timeout(_) => true,
            TransportError::HttpStatus { status } => {
                *status >= 500 || *status == 429 || *status == 408
            }
            TransportError::ContentType(_) => false,
            TransportError::Io(_) => true,
            TransportError::StreamEnded => true,
            TransportError::Other(_) => false,
        }
    }

    /// Get a short error code for logging.
    pub fn error_code(&self) -> &'static str {
        match self {
            TransportError::ConnectionFailed(_) => "E_TRANSPORT_CONN",
            TransportError::Timeout(_) => "E_TRANSPORT_TIMEOUT",
            TransportError::HttpStatus { .. } => "E_TRANSPORT_HTTP",
            TransportError::ContentType(_) => "E_TRANSPORT_CTYPE",
            TransportError::Io(_) => "E_TRANSPORT_IO",
            TransportError::StreamEnded => "E_TRANSPORT_EOF",
            TransportError::Other(_) => "E_TRANSPORT_OTHER",
        }
    }
}

/// Why the current connection attempt was torn down.
///
/// Both variants are funneled into the same error path: notify subscribers,
/// tear down, increment the retry counter, schedule backoff.
#[derive(Debug, Clone)]
pub enum DisconnectReason {
    /// The transport failed (connect, validation, or mid-stream).
    Transport(TransportError),
    /// No data arrived within the heartbeat timeout.
    HeartbeatTimeout,
}

impl std::fmt::Display for DisconnectReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DisconnectReason::Transport(err) => write!(f, "{}", err),
            DisconnectReason::HeartbeatTimeout => write!(f, "heartbeat timeout"),
        }
    }
}

/// Convert a reqwest error into the transport taxonomy.
pub fn classify_reqwest_error(err: reqwest::Error) -> TransportError {
    if err.is_timeout() {
        TransportError::Timeout(err.to_string())
    } else if err.is_connect() {
        TransportError::ConnectionFailed(err.to_string())
    } else if let Some(status) = err.status() {
        TransportError::HttpStatus {
            status: status.as_u16(),
        }
    } else if err.is_body() || err.is_decode() {
        TransportError::Io(err.to_string())
    } else {
        TransportError::Other(err.to_string())
    }
}
