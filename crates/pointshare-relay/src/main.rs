//! pointshare-relay: signaling and session-authority server for remote
//! pointer control.
//!
//! Accepts WebSocket connections, lets one client share its pointer behind a
//! one-time password, relays WebRTC signaling between peers, and forwards
//! the authorized controller's move/click commands to the input driver.

mod connection;
mod dispatcher;
mod input;
mod notifier;
mod protocol;
mod registry;
mod router;
mod session;
mod status;

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::Parser;
use pointshare_common::ConfigError;
use pointshare_config::{LogLevel, PointshareConfig};
use tokio::net::TcpListener;
use tokio_tungstenite::accept_async;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::EnvFilter;

use crate::connection::handle_connection;
use crate::dispatcher::{Dispatcher, DispatcherOptions};

#[derive(Parser)]
#[command(
    name = "pointshare-relay",
    version,
    about = "Signaling and session server for remote pointer control"
)]
struct Args {
    /// WebSocket port (overrides config).
    #[arg(short, long, env = "PORT")]
    port: Option<u16>,

    /// HTTP status port (overrides config).
    #[arg(long, env = "STATUS_PORT")]
    status_port: Option<u16>,

    /// Address to bind both listeners on (overrides config).
    #[arg(long)]
    bind: Option<String>,

    /// Path to a config file instead of the platform default.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Tracing filter directive, e.g. "debug" or "pointshare_relay=trace".
    #[arg(long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    // The configured level is not known until the file is read, so loading
    // runs under a provisional subscriber at the default level.
    let loaded = load_config_logged(
        args.config.as_deref(),
        log_filter(args.log_level.as_deref(), LogLevel::default()),
        std::io::stdout,
    );
    let level = loaded
        .as_ref()
        .map(|c| c.logging.level)
        .unwrap_or_default();

    tracing_subscriber::fmt()
        .with_env_filter(log_filter(args.log_level.as_deref(), level))
        .init();

    tracing::info!("pointshare-relay v{} starting...", env!("CARGO_PKG_VERSION"));

    let mut config = match loaded {
        Ok(config) => config,
        Err(e) if args.config.is_some() => {
            tracing::error!("Config load failed: {e}");
            std::process::exit(1);
        }
        Err(e) => {
            tracing::warn!("Config load failed, using defaults: {e}");
            PointshareConfig::default()
        }
    };
    apply_overrides(&mut config, &args);
    if let Err(e) = pointshare_config::validation::validate(&config) {
        tracing::error!("Invalid configuration: {e}");
        std::process::exit(1);
    }
    tracing::debug!("Effective config:\n{}", pointshare_config::config_to_json(&config));

    let dispatcher = Arc::new(Dispatcher::new(
        input::from_config(&config.input),
        DispatcherOptions {
            gating: config.input.gating,
            ice_servers: config.ice.servers.clone(),
        },
    ));

    let addr = socket_addr(&config.server.bind_address, config.server.port);
    let listener = match TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!(addr = %addr, error = %e, "Failed to bind WebSocket listener");
            std::process::exit(1);
        }
    };

    tracing::info!("pointshare-relay listening on {}", addr);
    tracing::info!(
        "Clients on this network can connect to ws://{}:{}",
        lan_address(),
        config.server.port
    );
    tracing::info!(gating = ?config.input.gating, "Input gating");

    if config.status.enabled {
        let status_addr = socket_addr(&config.server.bind_address, config.status.port);
        match TcpListener::bind(&status_addr).await {
            Ok(status_listener) => {
                tracing::info!("Status endpoint on http://{}/status", status_addr);
                let dispatcher = dispatcher.clone();
                tokio::spawn(async move {
                    if let Err(e) = status::serve(status_listener, dispatcher).await {
                        tracing::warn!(error = %e, "Status server stopped");
                    }
                });
            }
            Err(e) => {
                tracing::warn!(addr = %status_addr, error = %e, "Status endpoint disabled");
            }
        }
    }

    let outbound_buffer = config.server.outbound_buffer as usize;

    // Accept loop.
    let accept = async {
        loop {
            match listener.accept().await {
                Ok((stream, peer)) => {
                    let dispatcher = dispatcher.clone();
                    tokio::spawn(async move {
                        match accept_async(stream).await {
                            Ok(ws) => handle_connection(ws, peer, dispatcher, outbound_buffer).await,
                            Err(e) => {
                                tracing::warn!(peer = %peer, error = %e, "WS handshake failed");
                            }
                        }
                    });
                }
                Err(e) => {
                    tracing::warn!(error = %e, "TCP accept error");
                }
            }
        }
    };

    tokio::select! {
        _ = accept => {}
        _ = shutdown_signal() => {
            tracing::info!("Shutdown signal received, stopping");
        }
    }
}

/// Resolves on Ctrl-C, or SIGTERM on unix.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}

fn apply_overrides(config: &mut PointshareConfig, args: &Args) {
    if let Some(port) = args.port {
        config.server.port = u32::from(port);
    }
    if let Some(port) = args.status_port {
        config.status.port = u32::from(port);
    }
    if let Some(ref bind) = args.bind {
        config.server.bind_address = bind.clone();
    }
}

/// Bind address and port are validated at load time; an unparsable address
/// falls back to all interfaces.
fn socket_addr(bind: &str, port: u32) -> SocketAddr {
    let ip = bind.parse().unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED));
    SocketAddr::new(ip, u16::try_from(port).unwrap_or_default())
}

/// `RUST_LOG` wins; otherwise the CLI directive, otherwise `level` for this
/// workspace's crates.
fn log_filter(cli: Option<&str>, level: LogLevel) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_directive(cli, level)))
}

fn log_directive(cli: Option<&str>, level: LogLevel) -> String {
    match cli {
        Some(directive) => directive.to_string(),
        None => {
            let level = level.as_filter();
            format!("pointshare_relay={level},pointshare_config={level}")
        }
    }
}

/// Load config with a scoped subscriber installed, so messages emitted while
/// loading (such as creating the default file) are not lost.
fn load_config_logged<W>(
    path: Option<&Path>,
    filter: EnvFilter,
    writer: W,
) -> Result<PointshareConfig, ConfigError>
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let provisional = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .finish();
    tracing::subscriber::with_default(provisional, || pointshare_config::load_config(path))
}

/// Address other machines on the LAN can reach us at, found by walking the
/// network interfaces. Falls back to loopback.
fn lan_address() -> IpAddr {
    match if_addrs::get_if_addrs() {
        Ok(interfaces) => pick_lan_address(
            interfaces
                .iter()
                .filter(|iface| !iface.is_loopback())
                .map(|iface| iface.ip()),
        ),
        Err(e) => {
            tracing::debug!(error = %e, "Failed to list network interfaces");
            IpAddr::V4(Ipv4Addr::LOCALHOST)
        }
    }
}

/// First private IPv4 address, else the first usable IPv4 address, else
/// loopback.
fn pick_lan_address(candidates: impl IntoIterator<Item = IpAddr>) -> IpAddr {
    let usable: Vec<Ipv4Addr> = candidates
        .into_iter()
        .filter_map(|ip| match ip {
            IpAddr::V4(v4)
                if !v4.is_loopback() && !v4.is_unspecified() && !v4.is_link_local() =>
            {
                Some(v4)
            }
            _ => None,
        })
        .collect();

    usable
        .iter()
        .find(|ip| ip.is_private())
        .or_else(|| usable.first())
        .map(|ip| IpAddr::V4(*ip))
        .unwrap_or(IpAddr::V4(Ipv4Addr::LOCALHOST))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(argv: &[&str]) -> Args {
        Args::try_parse_from(argv).unwrap()
    }

    #[test]
    fn cli_overrides_replace_config_values() {
        let args = parse(&[
            "pointshare-relay",
            "--port",
            "9000",
            "--status-port",
            "9001",
            "--bind",
            "127.0.0.1",
        ]);
        let mut config = PointshareConfig::default();
        apply_overrides(&mut config, &args);
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.status.port, 9001);
        assert_eq!(config.server.bind_address, "127.0.0.1");
    }

    #[test]
    fn absent_flags_keep_config_values() {
        let args = Args {
            port: None,
            status_port: None,
            bind: None,
            config: None,
            log_level: None,
        };
        let mut config = PointshareConfig::default();
        apply_overrides(&mut config, &args);
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.status.port, 8081);
        assert_eq!(config.server.bind_address, "0.0.0.0");
    }

    #[test]
    fn socket_addr_handles_ipv6() {
        assert_eq!(socket_addr("::1", 8080).to_string(), "[::1]:8080");
        assert_eq!(socket_addr("0.0.0.0", 8081).to_string(), "0.0.0.0:8081");
    }

    #[test]
    fn lan_address_prefers_private_ipv4() {
        let picked = pick_lan_address([
            "fe80::1".parse::<IpAddr>().unwrap(),
            "169.254.3.4".parse::<IpAddr>().unwrap(),
            "203.0.113.7".parse::<IpAddr>().unwrap(),
            "192.168.1.20".parse::<IpAddr>().unwrap(),
        ]);
        assert_eq!(picked, "192.168.1.20".parse::<IpAddr>().unwrap());
    }

    #[test]
    fn lan_address_without_private_uses_first_usable() {
        let picked = pick_lan_address([
            "127.0.0.1".parse::<IpAddr>().unwrap(),
            "203.0.113.7".parse::<IpAddr>().unwrap(),
        ]);
        assert_eq!(picked, "203.0.113.7".parse::<IpAddr>().unwrap());
    }

    #[test]
    fn lan_address_falls_back_to_loopback() {
        assert_eq!(pick_lan_address(Vec::<IpAddr>::new()), IpAddr::V4(Ipv4Addr::LOCALHOST));
        assert_eq!(
            pick_lan_address(["::1".parse::<IpAddr>().unwrap()]),
            IpAddr::V4(Ipv4Addr::LOCALHOST)
        );
    }

    #[test]
    fn default_directive_covers_config_crate() {
        assert_eq!(
            log_directive(None, LogLevel::Debug),
            "pointshare_relay=debug,pointshare_config=debug"
        );
        assert_eq!(log_directive(Some("trace"), LogLevel::Info), "trace");
    }

    #[derive(Clone, Default)]
    struct Captured(Arc<std::sync::Mutex<Vec<u8>>>);

    impl std::io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl<'w> MakeWriter<'w> for Captured {
        type Writer = Captured;

        fn make_writer(&'w self) -> Self::Writer {
            self.clone()
        }
    }

    #[test]
    fn config_loading_messages_reach_the_provisional_subscriber() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[server]\nport = 9100\n").unwrap();

        let captured = Captured::default();
        let config = load_config_logged(
            Some(&path),
            EnvFilter::new("pointshare_config=info"),
            captured.clone(),
        )
        .unwrap();

        assert_eq!(config.server.port, 9100);
        let output = String::from_utf8(captured.0.lock().unwrap().clone()).unwrap();
        assert!(output.contains("loaded config from"), "got: {output}");
    }

    #[test]
    fn rejects_out_of_range_port() {
        assert!(Args::try_parse_from(["pointshare-relay", "--port", "70000"]).is_err());
    }
}
