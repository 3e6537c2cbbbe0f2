use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use super::{Connection, ConnectionId};
use crate::protocol::Frame;

/// The set of currently open connections.
///
/// Membership changes take the write lock; broadcasts iterate under the read lock, so
/// concurrent broadcasts from different senders never block each other.
#[derive(Default)]
pub struct Registry {
    connections: RwLock<HashMap<ConnectionId, Connection>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, conn: Connection) {
        let mut connections = self.connections.write().unwrap_or_else(PoisonError::into_inner);
        connections.insert(conn.id(), conn);
    }

    /// Returns whether `id` was present.
    pub fn remove(&self, id: ConnectionId) -> bool {
        let mut connections = self.connections.write().unwrap_or_else(PoisonError::into_inner);
        connections.remove(&id).is_some()
    }

    pub fn contains(&self, id: ConnectionId) -> bool {
        let connections = self.connections.read().unwrap_or_else(PoisonError::into_inner);
        connections.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        let connections = self.connections.read().unwrap_or_else(PoisonError::into_inner);
        connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Queues `frame` for every connection except `except`.
    ///
    /// Returns how many deliveries were accepted. A peer whose channel is already closed
    /// is skipped without affecting the others.
    pub fn broadcast_except(&self, except: ConnectionId, frame: &Frame) -> usize {
        let connections = self.connections.read().unwrap_or_else(PoisonError::into_inner);
        let mut delivered = 0;
        for (id, conn) in connections.iter() {
            if *id == except {
                continue;
            }
            if conn.deliver(frame.clone()) {
                delivered += 1;
            } else {
                log::debug!("Dropped delivery to closed connection {}", id);
            }
        }
        delivered
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_remove() {
        let registry = Registry::new();
        let (a, _rx_a) = Connection::open();
        let id = a.id();

        registry.insert(a);
        assert!(registry.contains(id));
        assert_eq!(registry.len(), 1);

        assert!(registry.remove(id));
        assert!(!registry.remove(id));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_broadcast_skips_closed_peer() {
        let registry = Registry::new();
        let (a, _rx_a) = Connection::open();
        let (b, rx_b) = Connection::open();
        let (c, mut rx_c) = Connection::open();
        let sender = a.id();
        registry.insert(a);
        registry.insert(b);
        registry.insert(c);

        drop(rx_b);
        let delivered = registry.broadcast_except(sender, &Frame::new("B", None));

        assert_eq!(delivered, 1);
        assert!(rx_c.try_recv().is_ok());
    }
}
