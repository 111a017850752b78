//! Default TOML config template with inline documentation comments.

/// Generate the default TOML config content with comments.
pub(crate) fn default_config_toml() -> String {
    r##"# pointshare signaling server configuration
# Schema version 1
# Only override what you want to change -- missing fields use defaults.

[server]
# bind_address = "0.0.0.0"
# port = 8080            # 1-65535
# outbound_buffer = 256  # 8-4096 queued messages per client

[status]
# enabled = true
# port = 8081            # 1-65535, GET /status

[input]
# driver = "virtual"     # virtual
# gating = "controller"  # controller, any_active_session
# screen_width = 1920    # 1-16384
# screen_height = 1080   # 1-16384

# STUN/TURN servers handed to browsers in the `connected` message.
# [[ice.servers]]
# urls = ["stun:stun.l.google.com:19302"]
# username = ""
# credential = ""

[logging]
# level = "info"         # trace, debug, info, warn, error
"##
    .to_string()
}
