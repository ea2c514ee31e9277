//! Streaming transport trait abstraction.
//!
//! Provides a trait-based abstraction over the long-lived streaming GET
//! request, enabling dependency injection and mocking in tests. The
//! connection state machine owns exactly one open handle per attempt and
//! discards it on every reconnect.

use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;
use std::collections::HashMap;
use std::pin::Pin;

use crate::error::TransportError;

/// Request headers represented as a key-value map.
pub type Headers = HashMap<String, String>;

/// A stream of raw body chunks.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, TransportError>> + Send>>;

/// An open streaming response.
///
/// `status` and `content_type` are optional: a transport that cannot surface
/// them (or a scripted mock that chooses not to) skips the corresponding
/// validation in the connection state machine, best-effort.
pub struct StreamHandle {
    /// HTTP status code, if the transport surfaces one.
    pub status: Option<u16>,
    /// Response content-type header, if the transport surfaces one.
    pub content_type: Option<String>,
    /// The body chunks, delivered as the server sends them.
    pub stream: ByteStream,
}

/// Trait for opening a streaming request.
///
/// Implementations include the production reqwest-based transport and a
/// scripted mock for testing reconnect and watchdog behavior.
///
/// # Example
///
/// ```ignore
/// use trickle::traits::{StreamTransport, Headers};
///
/// async fn open_stream<T: StreamTransport>(transport: &T) {
///     let handle = transport
///         .open("https://api.example.com/stream", &Headers::new())
///         .await
///         .unwrap();
///     println!("status: {:?}", handle.status);
/// }
/// ```
#[async_trait]
pub trait StreamTransport: Send + Sync {
    /// Open a streaming GET request.
    ///
    /// # Arguments
    /// * `url` - The URL to request
    /// * `headers` - Request headers
    ///
    /// # Returns
    /// An open handle whose `stream` yields body chunks, or an error if the
    /// request could not be opened at all.
    async fn open(&self, url: &str, headers: &Headers) -> Result<StreamHandle, TransportError>;
}

impl std::fmt::Debug for StreamHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamHandle")
            .field("status", &self.status)
            .field("content_type", &self.content_type)
            .finish_non_exhaustive()
    }
}
