//! Listener configuration: the signaling WebSocket and the `/status` export.

use serde::{Deserialize, Serialize};

/// Signaling WebSocket listener.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_address: String,
    /// Valid range: 1-65535.
    pub port: u32,
    /// Per-connection outbound queue depth (valid range: 8-4096).
    pub outbound_buffer: u32,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0".into(),
            port: 8080,
            outbound_buffer: 256,
        }
    }
}

/// Read-only HTTP status endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StatusConfig {
    pub enabled: bool,
    /// Valid range: 1-65535, must differ from `server.port`.
    pub port: u32,
}

impl Default for StatusConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            port: 8081,
        }
    }
}
