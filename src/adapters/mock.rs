//! Scripted mock transport for testing.
//!
//! Each call to `open()` consumes the next scripted connection, so a test
//! can describe an entire reconnect history up front: a failure, then a
//! stream that errors mid-body, then a stream that completes. Requests are
//! recorded for verification (e.g. the `Last-Event-ID` header).

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::StreamExt;

use crate::error::TransportError;
use crate::traits::{ByteStream, Headers, StreamHandle, StreamTransport};

/// A recorded `open()` call.
#[derive(Debug, Clone)]
pub struct RecordedOpen {
    pub url: String,
    pub headers: Headers,
}

/// One step of a scripted stream body.
#[derive(Debug, Clone)]
pub enum MockChunk {
    /// Deliver these bytes.
    Data(Bytes),
    /// Wait before delivering the next step (drives the watchdog in
    /// paused-time tests).
    Delay(Duration),
    /// Fail the stream mid-body.
    Error(TransportError),
}

impl MockChunk {
    /// Convenience constructor for text chunks.
    pub fn data(text: &str) -> Self {
        MockChunk::Data(Bytes::copy_from_slice(text.as_bytes()))
    }
}

/// One scripted connection attempt.
#[derive(Debug, Clone)]
pub enum MockConnection {
    /// `open()` itself fails.
    Failure(TransportError),
    /// `open()` succeeds with this response shape and body script.
    Stream {
        status: Option<u16>,
        content_type: Option<String>,
        chunks: Vec<MockChunk>,
        /// Keep the stream open (silent) after the last chunk instead of
        /// ending it.
        hang_after: bool,
    },
}

impl MockConnection {
    /// A healthy event-stream connection delivering the given body chunks
    /// and then hanging open, like a real idle stream.
    pub fn stream(chunks: Vec<MockChunk>) -> Self {
        MockConnection::Stream {
            status: Some(200),
            content_type: Some("text/event-stream".to_string()),
            chunks,
            hang_after: true,
        }
    }

    /// Like [`stream`](MockConnection::stream), but the body ends after
    /// the last chunk.
    pub fn stream_then_eof(chunks: Vec<MockChunk>) -> Self {
        MockConnection::Stream {
            status: Some(200),
            content_type: Some("text/event-stream".to_string()),
            chunks,
            hang_after: false,
        }
    }
}

/// Mock transport serving scripted connections in FIFO order.
///
/// When the script runs out, `open()` fails with a connection error, which
/// keeps an unexpectedly-retrying client on its error path instead of
/// hanging the test.
#[derive(Debug, Clone, Default)]
pub struct MockTransport {
    connections: Arc<Mutex<VecDeque<MockConnection>>>,
    opens: Arc<Mutex<Vec<RecordedOpen>>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a scripted connection.
    pub fn push_connection(&self, connection: MockConnection) {
        self.connections.lock().unwrap().push_back(connection);
    }

    /// All `open()` calls recorded so far.
    pub fn recorded_opens(&self) -> Vec<RecordedOpen> {
        self.opens.lock().unwrap().clone()
    }

    /// Number of `open()` calls so far.
    pub fn open_count(&self) -> usize {
        self.opens.lock().unwrap().len()
    }

    fn build_stream(chunks: Vec<MockChunk>, hang_after: bool) -> ByteStream {
        let body = futures::stream::iter(chunks).filter_map(|chunk| async move {
            match chunk {
                MockChunk::Data(bytes) => Some(Ok(bytes)),
                MockChunk::Error(err) => Some(Err(err)),
                MockChunk::Delay(duration) => {
                    tokio::time::sleep(duration).await;
                    None
                }
            }
        });
        if hang_after {
            Box::pin(body.chain(futures::stream::pending()))
        } else {
            Box::pin(body)
        }
    }
}

#[async_trait]
impl StreamTransport for MockTransport {
    async fn open(&self, url: &str, headers: &Headers) -> Result<StreamHandle, TransportError> {
        self.opens.lock().unwrap().push(RecordedOpen {
            url: url.to_string(),
            headers: headers.clone(),
        });

        let next = self.connections.lock().unwrap().pop_front();
        match next {
            Some(MockConnection::Failure(err)) => Err(err),
            Some(MockConnection::Stream {
                status,
                content_type,
                chunks,
                hang_after,
            }) => Ok(StreamHandle {
                status,
                content_type,
                stream: Self::build_stream(chunks, hang_after),
            }),
            None => Err(TransportError::ConnectionFailed(
                "no scripted connection left".to_string(),
            )),
        }
    }
}
