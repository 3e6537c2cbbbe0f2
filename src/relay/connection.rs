use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::mpsc;

use crate::protocol::Frame;

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

/// Opaque identifier of one live session. Never reused within a process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(u64);

impl ConnectionId {
    pub fn next() -> Self {
        Self(NEXT_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Open,
    /// Terminal. A closed connection is never reopened.
    Closed,
}

/// Handle to one client's delivery channel.
///
/// The transport keeps the receiving half and writes whatever arrives to the socket.
/// Once that receiver is dropped the connection is [`ConnectionState::Closed`] and
/// further deliveries are discarded.
#[derive(Debug, Clone)]
pub struct Connection {
    id: ConnectionId,
    outbox: mpsc::UnboundedSender<Frame>,
}

impl Connection {
    /// Allocates a fresh id and delivery channel.
    pub fn open() -> (Self, mpsc::UnboundedReceiver<Frame>) {
        let (outbox, rx) = mpsc::unbounded_channel();
        let conn = Self {
            id: ConnectionId::next(),
            outbox,
        };
        (conn, rx)
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn state(&self) -> ConnectionState {
        if self.outbox.is_closed() {
            ConnectionState::Closed
        } else {
            ConnectionState::Open
        }
    }

    /// Queues `frame` for the client. Returns `false` if the connection is closed.
    pub fn deliver(&self, frame: Frame) -> bool {
        self.outbox.send(frame).is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_are_unique() {
        let (a, _rx_a) = Connection::open();
        let (b, _rx_b) = Connection::open();
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn test_closed_when_receiver_dropped() {
        let (conn, rx) = Connection::open();
        assert_eq!(conn.state(), ConnectionState::Open);
        assert!(conn.deliver(Frame::new("x", None)));

        drop(rx);
        assert_eq!(conn.state(), ConnectionState::Closed);
        assert!(!conn.deliver(Frame::new("x", None)));
    }
}
