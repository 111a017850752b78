//! Signaling wire protocol: JSON text frames tagged by a `type` field.
//!
//! WebRTC payloads (`signal`) are carried as opaque JSON values; the server
//! never looks inside them.

use pointshare_common::ClientId;
use pointshare_config::IceServer;
use serde::{Deserialize, Serialize};

/// Messages a browser sends to the server.
#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
pub enum ClientMessage {
    #[serde(rename = "startSharing")]
    StartSharing,

    #[serde(rename = "stopSharing")]
    StopSharing,

    /// `password` is taken as any JSON value; only a matching string
    /// authorizes.
    #[serde(rename = "authenticate")]
    Authenticate {
        #[serde(default)]
        password: serde_json::Value,
    },

    /// A `to` that is missing or not a string addresses nobody.
    #[serde(rename = "webrtc")]
    WebRtc {
        #[serde(default)]
        to: serde_json::Value,
        #[serde(default)]
        signal: serde_json::Value,
    },

    #[serde(rename = "move")]
    Move { x: f64, y: f64 },

    #[serde(rename = "click")]
    Click,

    #[serde(rename = "getPosition")]
    GetPosition,

    #[serde(rename = "ping")]
    Ping,

    /// Any `type` this server does not know. Ignored.
    #[serde(other)]
    Unknown,
}

impl ClientMessage {
    pub fn decode(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}

/// Snapshot of global session state, pushed over the socket and served on
/// `GET /status`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemStatus {
    pub is_sharing: bool,
    pub connected_clients: usize,
    pub has_controller: bool,
}

/// Messages the server sends to a browser.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum ServerMessage {
    #[serde(rename = "connected", rename_all = "camelCase")]
    Connected {
        client_id: ClientId,
        is_sharing: bool,
        share_password: Option<String>,
        #[serde(skip_serializing_if = "Vec::is_empty")]
        ice_servers: Vec<IceServer>,
    },

    #[serde(rename = "systemStatus")]
    SystemStatus(SystemStatus),

    #[serde(rename = "sharingStarted", rename_all = "camelCase")]
    SharingStarted { password: String, is_sharing: bool },

    #[serde(rename = "sharingStopped")]
    SharingStopped,

    #[serde(rename = "sharingStatusChanged", rename_all = "camelCase")]
    SharingStatusChanged { is_sharing: bool },

    #[serde(rename = "authenticated", rename_all = "camelCase")]
    Authenticated { sharing_client_id: ClientId },

    #[serde(rename = "position")]
    Position { x: i32, y: i32 },

    #[serde(rename = "pong")]
    Pong,

    #[serde(rename = "error")]
    Error { message: String },

    #[serde(rename = "webrtc")]
    WebRtc {
        signal: serde_json::Value,
        from: ClientId,
    },
}

impl ServerMessage {
    pub fn error(err: impl std::fmt::Display) -> Self {
        Self::Error {
            message: err.to_string(),
        }
    }

    pub fn encode(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
