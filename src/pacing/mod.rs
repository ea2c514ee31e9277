//! Backpressure-aware pacing of arriving text.
//!
//! Bursty upstream arrivals (decoded `message` payloads) are queued and
//! drained at a fixed cadence up to a per-tick budget, producing smoothed
//! output independent of arrival bursts. The queue is bounded: under
//! sustained overload it evicts the oldest backlog, never the newest
//! input, and it never errors.
//!
//! # Module structure
//! - `core` - the pure queue state machine (`PacerCore`), timer-free
//! - `pacer` - actor + handle driving the core on a tokio interval
//! - `tokenizer` - word/punctuation/CJK-character unit splitter
//! - `throttle` - latest-value coalescer for full-document re-renders

mod core;
mod pacer;
mod throttle;
mod tokenizer;

pub use self::core::{FlushUpdate, PacerConfig, PacerCore, PacingMode};
pub use pacer::Pacer;
pub use throttle::RenderThrottler;
pub use tokenizer::tokenize;
