//! Trait abstractions for dependency injection and testability.
//!
//! # Traits
//!
//! - [`StreamTransport`] - opening a long-lived streaming GET request

pub mod transport;

pub use transport::{ByteStream, Headers, StreamHandle, StreamTransport};
