//! Error types for the streaming client.
//!
//! Every failure source converges on the connection actor's single error
//! path, which decides retry vs. terminal. Nothing here is fatal by itself:
//! transport errors and heartbeat timeouts feed the backoff schedule, and
//! parse anomalies (a malformed `retry:` value) are tolerated silently.

mod transport;

pub use transport::{classify_reqwest_error, DisconnectReason, TransportError};
