//! Transport implementations.
//!
//! - [`ReqwestTransport`] - production HTTP transport
//! - [`mock`] - scripted in-process transport for tests

pub mod mock;
mod reqwest_transport;

pub use reqwest_transport::ReqwestTransport;
