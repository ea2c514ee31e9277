//! SSE (Server-Sent Events) wire-format decoding.
//!
//! Implements the subset of the text/event-stream format needed for
//! field-based event framing:
//! - `data: <payload>` - data line, multi-line payloads joined by `\n`
//! - `event: <name>` - event name line (default "message")
//! - `id: <id>` - last-event-id, persisted for resumption
//! - `retry: <ms>` - server-adjusted reconnect interval
//! - Empty line - signals end of a record
//! - Lines starting with `:` - comments (ignored)
//! - `[DONE]` payload - in-band stream-completion sentinel
//!
//! # Module structure
//! - `decoder` - byte buffer, line framing, field classification (`SseDecoder`)
//! - `record` - decoded record type (`SseRecord`, `SseFrame`)

mod decoder;
mod record;

pub use decoder::SseDecoder;
pub use record::{SseFrame, SseRecord};
