//! VCU Relay is a real-time command relay.
//!
//! Clients hold persistent TLS connections to a central node and submit addressed
//! command envelopes on the `send_cmd` tag. The node never interprets a command: it
//! forwards `{ data }` under the envelope's `dest` tag to every *other* connected client.
//!
//! ## Core Components
//! - [`relay`]: The connection registry and the broadcast router.
//! - [`protocol`]: Newline-delimited JSON framing shared by server and clients.
//! - [`server`]: TLS/TCP listener that feeds connections into a [`CommandRelay`].
//! - [`sdk`]: Async client for submitting commands and receiving deliveries.
//! - [`tls`]: PEM loading for the server acceptor and the client connector.

pub mod protocol;
pub mod relay;
pub mod sdk;
pub mod server;
pub mod tls;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use crate::protocol::Frame;
use crate::relay::{Connection, ConnectionId, Envelope};

/// Errors returned by the relay library.
#[derive(Error, Debug)]
pub enum Error {
    /// An I/O error occurred on a socket or while reading key material.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// Error during JSON serialization or deserialization.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    /// TLS setup or handshake failed.
    #[error("TLS error: {0}")]
    Tls(String),
    /// A configuration value could not be used.
    #[error("invalid config: {0}")]
    InvalidConfig(String),
    /// The peer closed the connection before the exchange completed.
    #[error("connection closed")]
    ConnectionClosed,
    /// The peer sent something the protocol does not allow at this point.
    #[error("protocol error: {0}")]
    Protocol(String),
}

/// A specialized Result type for relay operations.
pub type Result<T> = std::result::Result<T, Error>;

/// The single tag clients use to submit command envelopes.
pub const SEND_CMD: &str = "send_cmd";

/// Tag of the handshake frame the server writes once a connection is registered.
pub const CONNECT: &str = "connect";

/// Port the relay listens on unless configured otherwise.
pub const DEFAULT_PORT: u16 = 39562;

/// Default location of the PEM private key.
pub const DEFAULT_KEY_PATH: &str = "./cert/key.pem";

/// Default location of the PEM certificate chain.
pub const DEFAULT_CERT_PATH: &str = "./cert/cert.pem";

/// Connection lifecycle hooks and the routing step.
///
/// The transport calls these; none of them can fail. Implementations must be safe to
/// call from many connection tasks at once.
pub trait CommandRelay: Send + Sync {
    /// Registers a newly established connection.
    fn on_connect(&self, conn: Connection);
    /// Removes a connection. Removing an unknown or already removed id is a no-op.
    fn on_disconnect(&self, id: ConnectionId);
    /// Routes a `send_cmd` payload from `from` to every other registered connection.
    fn on_command(&self, from: ConnectionId, payload: Option<Value>);
}

/// Submits command envelopes to a relay.
#[async_trait]
pub trait CommandSender: Send + Sync {
    /// Sends `envelope` on the `send_cmd` tag. Nothing is returned by the relay.
    async fn send_cmd(&self, envelope: &Envelope) -> Result<()>;
}

/// Receives deliveries pushed by a relay.
#[async_trait]
pub trait EventSource: Send + Sync {
    /// Returns the next frame, or `None` once the relay closed the connection.
    async fn next_event(&self) -> Result<Option<Frame>>;
}
