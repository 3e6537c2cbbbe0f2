/// TLS/TCP server for the relay daemon.
///
/// [`RelayServer`] accepts connections and hands each one to [`handle_connection`],
/// which registers it with a [`CommandRelay`](crate::CommandRelay) and pumps frames
/// in both directions.
pub mod connection;
pub mod listener;

pub use connection::handle_connection;
pub use listener::RelayServer;
