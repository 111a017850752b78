//! Validation for listeners and advertised ICE servers.

use std::net::IpAddr;

use crate::schema::PointshareConfig;

use super::helpers::validate_range;

const ICE_SCHEMES: [&str; 3] = ["stun:", "turn:", "turns:"];

pub(crate) fn validate_server(errors: &mut Vec<String>, config: &PointshareConfig) {
    validate_range(errors, "server.port", config.server.port, 1, 65535);
    validate_range(
        errors,
        "server.outbound_buffer",
        config.server.outbound_buffer,
        8,
        4096,
    );

    if config.server.bind_address.parse::<IpAddr>().is_err() {
        errors.push(format!(
            "server.bind_address = {:?} is not an IP address",
            config.server.bind_address
        ));
    }
}

pub(crate) fn validate_status(errors: &mut Vec<String>, config: &PointshareConfig) {
    if !config.status.enabled {
        return;
    }
    validate_range(errors, "status.port", config.status.port, 1, 65535);
    if config.status.port == config.server.port {
        errors.push(format!(
            "status.port = {} collides with server.port",
            config.status.port
        ));
    }
}

pub(crate) fn validate_ice(errors: &mut Vec<String>, config: &PointshareConfig) {
    for (i, server) in config.ice.servers.iter().enumerate() {
        if server.urls.is_empty() {
            errors.push(format!("ice.servers[{i}].urls is empty"));
        }
        for url in &server.urls {
            if !ICE_SCHEMES.iter().any(|scheme| url.starts_with(scheme)) {
                errors.push(format!(
                    "ice.servers[{i}].urls entry {url:?} must start with stun:, turn: or turns:"
                ));
            }
        }
    }
}
