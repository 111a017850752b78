//! pointshare configuration system.
//!
//! Provides TOML-based configuration for the signaling server with full
//! validation. All config sections use sensible defaults so partial configs
//! work out of the box.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use pointshare_config::{config_to_json, load_config};
//!
//! let config = load_config(None).expect("failed to load config");
//! let json = config_to_json(&config);
//! println!("{json}");
//! ```

pub mod schema;
pub mod toml_loader;
pub mod validation;

pub use schema::{
    IceServer, InputDriverKind, InputGating, LogLevel, PointshareConfig, CONFIG_SCHEMA_VERSION,
};

use std::path::Path;

use pointshare_common::ConfigError;

/// Load config from an explicit path, or from the platform default path when
/// `path` is `None` (creating a commented default file if none exists).
pub fn load_config(path: Option<&Path>) -> Result<PointshareConfig, ConfigError> {
    match path {
        Some(path) => toml_loader::load_from_path(path),
        None => toml_loader::load_default(),
    }
}

/// Serialize a config to a pretty-printed JSON string.
pub fn config_to_json(config: &PointshareConfig) -> String {
    serde_json::to_string_pretty(config)
        .unwrap_or_else(|e| format!("{{\"error\": \"failed to serialize config: {e}\"}}"))
}
