/// Connection registry and broadcast routing.
///
/// [`RelayRouter`] owns the [`Registry`] of open connections and forwards each
/// submitted [`Envelope`] to every connection except the one that sent it.
pub mod connection;
pub mod envelope;
pub mod registry;
pub mod router;

pub use connection::{Connection, ConnectionId, ConnectionState};
pub use envelope::{Delivery, Envelope};
pub use registry::Registry;
pub use router::RelayRouter;
