//! Reqwest-based streaming transport.
//!
//! Production implementation of the [`StreamTransport`] trait. Validation
//! of status and content-type happens in the connection state machine, not
//! here; this adapter only surfaces what the response carries.

use async_trait::async_trait;
use futures_util::StreamExt;

use crate::error::{classify_reqwest_error, TransportError};
use crate::traits::{Headers, StreamHandle, StreamTransport};

/// Streaming transport backed by a `reqwest::Client`.
#[derive(Debug, Clone, Default)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    /// Create a transport with default reqwest settings.
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }

    /// Create a transport from a custom `reqwest::Client`.
    ///
    /// Allows advanced configuration like proxies, connect timeouts, or
    /// TLS settings. Do not set a read timeout: the stream is long-lived
    /// by design, and silence is the heartbeat watchdog's job.
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }

    /// Get a reference to the underlying `reqwest::Client`.
    pub fn inner(&self) -> &reqwest::Client {
        &self.client
    }
}

#[async_trait]
impl StreamTransport for ReqwestTransport {
    async fn open(&self, url: &str, headers: &Headers) -> Result<StreamHandle, TransportError> {
        let mut builder = self.client.get(url);
        for (name, value) in headers {
            builder = builder.header(name, value);
        }

        let response = builder.send().await.map_err(classify_reqwest_error)?;

        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(|value| value.to_string());

        let stream = response
            .bytes_stream()
            .map(|result| result.map_err(classify_reqwest_error));

        Ok(StreamHandle {
            status: Some(status),
            content_type,
            stream: Box::pin(stream),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_construction() {
        let transport = ReqwestTransport::new();
        let _ = transport.inner();
        let _ = ReqwestTransport::default();
    }

    #[tokio::test]
    async fn test_open_connection_refused() {
        let transport = ReqwestTransport::new();
        let result = transport
            .open("http://127.0.0.1:59999/stream", &Headers::new())
            .await;
        match result {
            Err(TransportError::ConnectionFailed(msg)) => assert!(!msg.is_empty()),
            other => panic!("expected ConnectionFailed, got {:?}", other.map(|_| ())),
        }
    }
}
