//! Configuration schema types for the pointshare signaling server.
//!
//! All structs use `serde(default)` so partial configs work correctly.
//! Missing fields are filled with the defaults the server ships with.

mod ice;
mod input;
mod server;
mod system;

pub use ice::*;
pub use input::*;
pub use server::*;
pub use system::*;

use serde::{Deserialize, Serialize};

/// Current config schema version.
pub const CONFIG_SCHEMA_VERSION: u32 = 1;

/// Root configuration.
///
/// Only override what you want to change.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PointshareConfig {
    pub server: ServerConfig,
    pub status: StatusConfig,
    pub input: InputConfig,
    pub ice: IceConfig,
    pub logging: LoggingConfig,
}
