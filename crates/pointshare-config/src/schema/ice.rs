//! STUN/TURN servers advertised to clients for WebRTC negotiation.
//!
//! The signaling server never contacts these itself.

use serde::{Deserialize, Serialize};

/// One entry of an `RTCConfiguration.iceServers` list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IceServer {
    pub urls: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credential: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct IceConfig {
    pub servers: Vec<IceServer>,
}
