//! Fan-out of state changes to connected clients.
//!
//! Called explicitly by the dispatcher right after each session transition,
//! so every notification can be traced back to the change that caused it.

use pointshare_common::ClientId;
use tracing::warn;

use crate::protocol::{ServerMessage, SystemStatus};
use crate::registry::{Connection, ConnectionRegistry};
use crate::session::SessionAuthority;

/// Current externally observable snapshot.
pub fn system_status(session: &SessionAuthority, registry: &ConnectionRegistry) -> SystemStatus {
    SystemStatus {
        is_sharing: session.is_active(),
        connected_clients: registry.count(),
        has_controller: session.controller().is_some(),
    }
}

/// Send `msg` to every open connection except `exclude` that `filter`
/// accepts. Returns how many connections accepted the message.
///
/// A failed send to one connection never affects the others.
pub fn broadcast(
    registry: &ConnectionRegistry,
    msg: &ServerMessage,
    exclude: Option<&ClientId>,
    filter: Option<&dyn Fn(&Connection) -> bool>,
) -> usize {
    let text = match msg.encode() {
        Ok(text) => text,
        Err(e) => {
            warn!(error = %e, "Failed to encode broadcast");
            return 0;
        }
    };

    let mut delivered = 0;
    registry.for_each(
        |conn| {
            conn.is_open()
                && exclude != Some(&conn.id)
                && filter.map_or(true, |accept| accept(conn))
        },
        |conn| {
            if conn.send_text(text.clone()) {
                delivered += 1;
            }
        },
    );
    delivered
}

/// Send the current snapshot to one connection.
pub fn send_system_status(
    session: &SessionAuthority,
    registry: &ConnectionRegistry,
    id: &ClientId,
) -> bool {
    match registry.get(id.as_str()) {
        Some(conn) => conn.send(&ServerMessage::SystemStatus(system_status(session, registry))),
        None => false,
    }
}

/// Send the current snapshot to everyone.
pub fn broadcast_system_status(session: &SessionAuthority, registry: &ConnectionRegistry) -> usize {
    broadcast(
        registry,
        &ServerMessage::SystemStatus(system_status(session, registry)),
        None,
        None,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;
    use tokio::sync::mpsc;

    fn drain(rx: &mut mpsc::Receiver<String>) -> Vec<Value> {
        let mut out = Vec::new();
        while let Ok(text) = rx.try_recv() {
            out.push(serde_json::from_str(&text).unwrap());
        }
        out
    }

    #[test]
    fn broadcast_skips_excluded_and_filtered() {
        let mut registry = ConnectionRegistry::new();
        let (tx_a, mut rx_a) = mpsc::channel(8);
        let (tx_b, mut rx_b) = mpsc::channel(8);
        let (tx_c, mut rx_c) = mpsc::channel(8);
        let a = registry.register(tx_a);
        let _b = registry.register(tx_b);
        let c = registry.register(tx_c);
        registry.get_mut(c.as_str()).unwrap().authorized = true;

        let only_unauthorized = |conn: &Connection| !conn.authorized;
        let delivered = broadcast(
            &registry,
            &ServerMessage::Pong,
            Some(&a),
            Some(&only_unauthorized),
        );

        assert_eq!(delivered, 1);
        assert!(drain(&mut rx_a).is_empty());
        assert_eq!(drain(&mut rx_b).len(), 1);
        assert!(drain(&mut rx_c).is_empty());
    }

    #[test]
    fn broadcast_survives_a_dead_connection() {
        let mut registry = ConnectionRegistry::new();
        let (tx_a, rx_a) = mpsc::channel(8);
        let (tx_b, mut rx_b) = mpsc::channel(8);
        registry.register(tx_a);
        registry.register(tx_b);
        drop(rx_a);

        assert_eq!(broadcast(&registry, &ServerMessage::Pong, None, None), 1);
        assert_eq!(drain(&mut rx_b).len(), 1);
    }

    #[test]
    fn system_status_reflects_session_and_registry() {
        let mut registry = ConnectionRegistry::new();
        let mut session = SessionAuthority::new();
        let (tx, _rx) = mpsc::channel(8);
        let host = registry.register(tx.clone());
        let c = registry.register(tx);

        assert_eq!(
            system_status(&session, &registry),
            SystemStatus {
                is_sharing: false,
                connected_clients: 2,
                has_controller: false
            }
        );

        let password = session.start_sharing(&mut registry, &host).unwrap();
        session.authorize(&mut registry, &c, &password).unwrap();
        assert_eq!(
            system_status(&session, &registry),
            SystemStatus {
                is_sharing: true,
                connected_clients: 2,
                has_controller: true
            }
        );
    }

    #[test]
    fn send_system_status_targets_one_connection() {
        let mut registry = ConnectionRegistry::new();
        let session = SessionAuthority::new();
        let (tx_a, mut rx_a) = mpsc::channel(8);
        let (tx_b, mut rx_b) = mpsc::channel(8);
        let a = registry.register(tx_a);
        registry.register(tx_b);

        assert!(send_system_status(&session, &registry, &a));
        let got = drain(&mut rx_a);
        assert_eq!(got.len(), 1);
        assert_eq!(got[0]["type"], "systemStatus");
        assert_eq!(got[0]["connectedClients"], 2);
        assert!(drain(&mut rx_b).is_empty());

        assert!(!send_system_status(&session, &registry, &ClientId::from("gone")));
    }

    #[test]
    fn broadcast_system_status_reaches_everyone() {
        let mut registry = ConnectionRegistry::new();
        let session = SessionAuthority::new();
        let (tx_a, mut rx_a) = mpsc::channel(8);
        let (tx_b, mut rx_b) = mpsc::channel(8);
        registry.register(tx_a);
        registry.register(tx_b);

        assert_eq!(broadcast_system_status(&session, &registry), 2);
        assert_eq!(drain(&mut rx_a)[0]["isSharing"], false);
        assert_eq!(drain(&mut rx_b)[0]["hasController"], false);
    }
}
