//! Incremental SSE decoder.
//!
//! Converts a byte stream into logical lines, lines into field records, and
//! field records into complete events at blank-line boundaries. Bytes after
//! the last line feed stay buffered, which makes framing correct no matter
//! how the transport splits bytes across delivery callbacks.

use std::time::Duration;

use tracing::debug;

use super::record::{SseFrame, SseRecord};

const LF: u8 = b'\n';
const DONE_SENTINEL: &str = "[DONE]";

/// Incremental decoder for one connection attempt.
///
/// A fresh decoder is created per attempt; partial state never survives a
/// reconnect. The harvested `last_event_id` does, via
/// [`last_event_id`](SseDecoder::last_event_id).
#[derive(Debug, Default)]
pub struct SseDecoder {
    /// Raw bytes not yet consumed (no LF seen after them).
    buffer: Vec<u8>,
    /// Data lines accumulated for the record being assembled, each followed
    /// by the `\n` separator appended at accumulation time.
    data_buf: String,
    /// Pending `event:` name for the record being assembled.
    event_name: Option<String>,
    /// The `id:` field of the record being assembled.
    record_id: Option<String>,
    /// Most recent `id:` seen on this stream.
    last_event_id: Option<String>,
    /// Server-requested retry interval, if a valid `retry:` field arrived.
    retry_hint: Option<Duration>,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one chunk of bytes, returning any records completed by it.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<SseFrame> {
        self.buffer.extend_from_slice(chunk);

        let mut frames = Vec::new();
        let mut pos = 0;
        while let Some(offset) = self.buffer[pos..].iter().position(|&b| b == LF) {
            let lf_index = pos + offset;
            let line = String::from_utf8_lossy(&self.buffer[pos..lf_index]).into_owned();
            pos = lf_index + 1;

            let line = line.strip_suffix('\r').unwrap_or(&line).to_string();
            self.parse_line(&line, &mut frames);
        }
        self.buffer.drain(..pos);

        frames
    }

    /// The most recent `id:` field seen, for the `Last-Event-ID` header.
    pub fn last_event_id(&self) -> Option<&str> {
        self.last_event_id.as_deref()
    }

    /// Take the server-requested retry interval, if one arrived since the
    /// last call.
    pub fn take_retry_hint(&mut self) -> Option<Duration> {
        self.retry_hint.take()
    }

    fn parse_line(&mut self, line: &str, frames: &mut Vec<SseFrame>) {
        if line.is_empty() {
            self.finalize_record(frames);
            return;
        }

        // Comment/keepalive line. The arrival of its bytes already counted
        // for the heartbeat at the chunk level.
        if line.starts_with(':') {
            return;
        }

        let (field, value) = match line.find(':') {
            Some(index) => {
                let value = &line[index + 1..];
                // At most one leading space is removed, so meaningful
                // payload whitespace survives.
                (&line[..index], value.strip_prefix(' ').unwrap_or(value))
            }
            None => (line, ""),
        };

        match field {
            "data" => {
                self.data_buf.push_str(value);
                self.data_buf.push('\n');
            }
            "id" => {
                self.record_id = Some(value.to_string());
                self.last_event_id = Some(value.to_string());
            }
            "retry" => match value.parse::<u64>() {
                Ok(ms) => self.retry_hint = Some(Duration::from_millis(ms)),
                // Malformed values keep the previous interval, never fatal.
                Err(_) => debug!("ignoring malformed retry field: {:?}", value),
            },
            "event" => self.event_name = Some(value.to_string()),
            _ => {}
        }
    }

    fn finalize_record(&mut self, frames: &mut Vec<SseFrame>) {
        if self.data_buf.is_empty() {
            // Blank line with nothing accumulated: reset the pending event
            // name and id, emit nothing. The stream-level last_event_id
            // persists.
            self.event_name = None;
            self.record_id = None;
            return;
        }

        let mut data = std::mem::take(&mut self.data_buf);
        // Strip exactly the one separator appended during accumulation.
        // Not a trim: interior and other trailing whitespace are payload.
        if data.ends_with('\n') {
            data.pop();
        }

        let event = self.event_name.take().unwrap_or_else(|| "message".to_string());
        let id = self.record_id.take();

        if data == DONE_SENTINEL {
            frames.push(SseFrame::Done);
            return;
        }

        frames.push(SseFrame::Record(SseRecord {
            event,
            data,
            id,
            last_event_id: self.last_event_id.clone(),
        }));
    }
}
