//! Connection registry: every live socket and its session flags.

use std::collections::HashMap;

use pointshare_common::ClientId;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, warn};

use crate::protocol::ServerMessage;

/// One live transport link.
#[derive(Debug)]
pub struct Connection {
    pub id: ClientId,
    pub authorized: bool,
    pub is_host: bool,
    pub is_controller: bool,
    /// Outbound text frames, drained by the connection's socket task.
    outbound: mpsc::Sender<String>,
}

impl Connection {
    /// Whether the socket task is still draining this connection's queue.
    pub fn is_open(&self) -> bool {
        !self.outbound.is_closed()
    }

    /// Encode and queue a message. Never blocks; returns false if dropped.
    pub fn send(&self, msg: &ServerMessage) -> bool {
        match msg.encode() {
            Ok(text) => self.send_text(text),
            Err(e) => {
                warn!(client = %self.id, error = %e, "Failed to encode message");
                false
            }
        }
    }

    /// Queue an already-encoded frame. Never blocks; returns false if dropped.
    pub fn send_text(&self, text: String) -> bool {
        match self.outbound.try_send(text) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                warn!(client = %self.id, "Outbound queue full, dropping message");
                false
            }
            Err(TrySendError::Closed(_)) => {
                debug!(client = %self.id, "Outbound queue closed");
                false
            }
        }
    }

    pub(crate) fn clear_flags(&mut self) {
        self.authorized = false;
        self.is_host = false;
        self.is_controller = false;
    }
}

/// All live connections keyed by their generated id.
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    connections: HashMap<ClientId, Connection>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a fresh connection with every flag cleared.
    pub fn register(&mut self, outbound: mpsc::Sender<String>) -> ClientId {
        let mut id = ClientId::new();
        while self.connections.contains_key(&id) {
            id = ClientId::new();
        }
        self.connections.insert(
            id.clone(),
            Connection {
                id: id.clone(),
                authorized: false,
                is_host: false,
                is_controller: false,
                outbound,
            },
        );
        id
    }

    /// Remove a connection. Removing an unknown id is a no-op.
    pub fn unregister(&mut self, id: &str) -> Option<Connection> {
        self.connections.remove(id)
    }

    pub fn get(&self, id: &str) -> Option<&Connection> {
        self.connections.get(id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut Connection> {
        self.connections.get_mut(id)
    }

    pub fn count(&self) -> usize {
        self.connections.len()
    }

    /// Call `f` on every connection accepted by `filter`, in no particular order.
    pub fn for_each(
        &self,
        mut filter: impl FnMut(&Connection) -> bool,
        mut f: impl FnMut(&Connection),
    ) {
        for conn in self.connections.values() {
            if filter(conn) {
                f(conn);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn channel() -> (mpsc::Sender<String>, mpsc::Receiver<String>) {
        mpsc::channel(8)
    }

    #[test]
    fn register_starts_with_all_flags_cleared() {
        let mut registry = ConnectionRegistry::new();
        let (tx, _rx) = channel();
        let id = registry.register(tx);

        let conn = registry.get(id.as_str()).unwrap();
        assert_eq!(conn.id, id);
        assert!(!conn.authorized);
        assert!(!conn.is_host);
        assert!(!conn.is_controller);
        assert_eq!(registry.count(), 1);
    }

    #[test]
    fn register_allocates_distinct_ids() {
        let mut registry = ConnectionRegistry::new();
        let (tx, _rx) = channel();
        let a = registry.register(tx.clone());
        let b = registry.register(tx);
        assert_ne!(a, b);
        assert_eq!(registry.count(), 2);
    }

    #[test]
    fn unregister_is_idempotent() {
        let mut registry = ConnectionRegistry::new();
        let (tx, _rx) = channel();
        let id = registry.register(tx);

        assert!(registry.unregister(id.as_str()).is_some());
        assert!(registry.unregister(id.as_str()).is_none());
        assert_eq!(registry.count(), 0);
        assert!(registry.get(id.as_str()).is_none());
    }

    #[test]
    fn lookup_unknown_id_is_none() {
        let registry = ConnectionRegistry::new();
        assert!(registry.get("nope").is_none());
    }

    #[test]
    fn closed_receiver_marks_connection_not_open() {
        let mut registry = ConnectionRegistry::new();
        let (tx, rx) = channel();
        let id = registry.register(tx);
        assert!(registry.get(id.as_str()).unwrap().is_open());

        drop(rx);
        let conn = registry.get(id.as_str()).unwrap();
        assert!(!conn.is_open());
        assert!(!conn.send(&ServerMessage::Pong));
    }

    #[test]
    fn send_encodes_json() {
        let mut registry = ConnectionRegistry::new();
        let (tx, mut rx) = channel();
        let id = registry.register(tx);

        assert!(registry.get(id.as_str()).unwrap().send(&ServerMessage::Pong));
        assert_eq!(rx.try_recv().unwrap(), r#"{"type":"pong"}"#);
    }

    #[test]
    fn full_queue_drops_without_blocking() {
        let mut registry = ConnectionRegistry::new();
        let (tx, _rx) = mpsc::channel(1);
        let id = registry.register(tx);
        let conn = registry.get(id.as_str()).unwrap();

        assert!(conn.send(&ServerMessage::Pong));
        assert!(!conn.send(&ServerMessage::Pong));
    }

    #[test]
    fn for_each_respects_filter() {
        let mut registry = ConnectionRegistry::new();
        let (tx, _rx) = channel();
        let a = registry.register(tx.clone());
        let _b = registry.register(tx.clone());
        let _c = registry.register(tx);
        registry.get_mut(a.as_str()).unwrap().is_host = true;

        let mut visited = Vec::new();
        registry.for_each(|c| !c.is_host, |c| visited.push(c.id.clone()));
        assert_eq!(visited.len(), 2);
        assert!(!visited.contains(&a));
    }
}
