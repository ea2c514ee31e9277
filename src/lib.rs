//! trickle - a resilient SSE client with backpressure-aware text pacing.
//!
//! Receives bursty server-push text over a long-lived streaming request and
//! lets it trickle out to a slower consumer at a smooth cadence, without
//! losing data, reordering it, or blocking the network reader.
//!
//! # Module structure
//! - `sse` - wire-format decoding (lines, fields, records, `[DONE]` sentinel)
//! - `client` - connection state machine (backoff, heartbeat watchdog)
//! - `dispatch` - typed fan-out of records and lifecycle notifications
//! - `pacing` - bounded order-preserving queue, tokenizer, render throttler
//! - `traits` - transport abstraction for dependency injection
//! - `adapters` - production (reqwest) and mock transport implementations
//! - `error` - transport error taxonomy and classification

pub mod adapters;
pub mod client;
pub mod dispatch;
pub mod error;
pub mod pacing;
pub mod sse;
pub mod traits;
