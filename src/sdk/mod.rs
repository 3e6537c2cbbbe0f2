/// Client SDK for the VCU relay.
///
/// This module provides an async [`Client`] that speaks the relay's framing over TLS
/// or plain TCP, plus environment-driven connection setup.
pub mod client;
/// Connection setup from environment variables.
pub mod discovery;

pub use client::Client;
pub use discovery::{connect, connect_from_env, ClientConfig};
