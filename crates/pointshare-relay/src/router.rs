//! Best-effort forwarding of WebRTC negotiation payloads between clients.

use pointshare_common::ClientId;
use tracing::debug;

use crate::protocol::ServerMessage;
use crate::registry::ConnectionRegistry;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayOutcome {
    Delivered,
    /// No connection has the target id.
    UnknownTarget,
    /// The target exists but its socket is closed or its queue is full.
    Undeliverable,
}

/// Forward `signal` to `to`, stamped with the sender's id.
///
/// Failures are only logged: the peers' WebRTC stacks time out and retry on
/// their own, so the sender is never told.
pub fn relay(
    registry: &ConnectionRegistry,
    from: &ClientId,
    to: &str,
    signal: serde_json::Value,
) -> RelayOutcome {
    let Some(target) = registry.get(to) else {
        debug!(from = %from, to, "Signal target not found, dropping");
        return RelayOutcome::UnknownTarget;
    };

    if !target.is_open() {
        debug!(from = %from, to, "Signal target closed, dropping");
        return RelayOutcome::Undeliverable;
    }

    let envelope = ServerMessage::WebRtc {
        signal,
        from: from.clone(),
    };
    if target.send(&envelope) {
        RelayOutcome::Delivered
    } else {
        RelayOutcome::Undeliverable
    }
}
