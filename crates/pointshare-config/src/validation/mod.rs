//! Full configuration validation.
//!
//! Each domain has its own submodule; this orchestrator calls them all
//! and collects errors into a single `ConfigError`.

mod helpers;
mod input;
mod network;


use crate::schema::PointshareConfig;
use pointshare_common::ConfigError;

/// Run all validations on a config, collecting all errors.
pub fn validate(config: &PointshareConfig) -> Result<(), ConfigError> {
    let mut errors: Vec<String> = Vec::new();

    network::validate_server(&mut errors, config);
    network::validate_status(&mut errors, config);
    network::validate_ice(&mut errors, config);
    input::validate_input(&mut errors, config);

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ConfigError::ValidationError(errors.join("; ")))
    }
}
