//! Decoded event record types.

use serde::{Deserialize, Serialize};

/// A complete decoded event record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SseRecord {
    /// Event name, defaulting to `"message"` when the record carried no
    /// `event:` field.
    pub event: String,
    /// The payload. Multi-line payloads are joined by `\n`; exactly the one
    /// trailing separator appended during assembly is stripped, so interior
    /// and other trailing whitespace survive.
    pub data: String,
    /// The record's own `id:` field, when present. Dedup-by-id keys on this.
    pub id: Option<String>,
    /// The most recent id seen on the stream at the time this record was
    /// finalized (may come from an earlier record).
    pub last_event_id: Option<String>,
}

impl SseRecord {
    /// Parse the payload as JSON.
    pub fn json<T: serde::de::DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_str(&self.data)
    }
}

/// Output of the decoder: either a complete record or the in-band
/// completion sentinel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SseFrame {
    /// A complete event record.
    Record(SseRecord),
    /// The `[DONE]` sentinel: the server finished this stream.
    Done,
}
