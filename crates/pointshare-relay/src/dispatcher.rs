//! Per-connection message handling and lifecycle.
//!
//! The registry and the session live together behind one lock, so every
//! transition and the notifications it causes happen atomically with
//! respect to other connections. Socket I/O never happens under the lock:
//! outbound messages are queued with `try_send`.

use std::sync::Arc;

use pointshare_common::{ClientId, Result};
use pointshare_config::{IceServer, InputGating};
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, info, warn};

use crate::input::{to_coordinate, InputDriver};
use crate::notifier;
use crate::protocol::{ClientMessage, ServerMessage, SystemStatus};
use crate::registry::ConnectionRegistry;
use crate::router::{self, RelayOutcome};
use crate::session::{DisconnectOutcome, SessionAuthority};

#[derive(Debug, Clone, Default)]
pub struct DispatcherOptions {
    pub gating: InputGating,
    /// Advertised to every client on connect.
    pub ice_servers: Vec<IceServer>,
}

#[derive(Debug, Default)]
struct Hub {
    registry: ConnectionRegistry,
    session: SessionAuthority,
}

impl Hub {
    fn reply(&self, id: &ClientId, msg: &ServerMessage) {
        if let Some(conn) = self.registry.get(id.as_str()) {
            conn.send(msg);
        }
    }
}

enum InputCommand {
    Move { x: i32, y: i32 },
    Click,
    GetPosition,
}

pub struct Dispatcher {
    hub: Mutex<Hub>,
    driver: Arc<dyn InputDriver>,
    options: DispatcherOptions,
}

impl Dispatcher {
    pub fn new(driver: Arc<dyn InputDriver>, options: DispatcherOptions) -> Self {
        Self {
            hub: Mutex::new(Hub::default()),
            driver,
            options,
        }
    }

    /// Register a new connection and greet it with its id and the current
    /// system status.
    pub async fn connect(&self, outbound: mpsc::Sender<String>) -> ClientId {
        let mut hub = self.hub.lock().await;
        let id = hub.registry.register(outbound);

        // Only re-delivered if this id is already hosting.
        let share_password = match hub.session.host() {
            Some(host) if *host == id => hub.session.password().map(str::to_string),
            _ => None,
        };
        hub.reply(
            &id,
            &ServerMessage::Connected {
                client_id: id.clone(),
                is_sharing: hub.session.is_active(),
                share_password,
                ice_servers: self.options.ice_servers.clone(),
            },
        );
        notifier::send_system_status(&hub.session, &hub.registry, &id);

        info!(client = %id, clients = hub.registry.count(), "Client connected");
        id
    }

    /// Handle one inbound text frame. Failures are reported to this client
    /// only and never end the connection.
    pub async fn handle_text(&self, id: &ClientId, text: &str) {
        if let Err(e) = self.dispatch(id, text).await {
            warn!(client = %id, error = %e, "Message rejected");
            self.hub.lock().await.reply(id, &ServerMessage::error(&e));
        }
    }

    /// Tear down a connection and release any session role it held.
    /// Safe to call more than once.
    pub async fn disconnect(&self, id: &ClientId) {
        let mut guard = self.hub.lock().await;
        let Hub { registry, session } = &mut *guard;

        if registry.unregister(id.as_str()).is_none() {
            return;
        }

        if session.handle_disconnect(registry, id) == DisconnectOutcome::SessionEnded {
            notifier::broadcast(
                registry,
                &ServerMessage::SharingStatusChanged { is_sharing: false },
                None,
                None,
            );
        }
        notifier::broadcast_system_status(session, registry);

        debug!(state = ?session.state(), "Session state after disconnect");
        info!(client = %id, clients = registry.count(), "Client disconnected");
    }

    pub async fn status(&self) -> SystemStatus {
        let hub = self.hub.lock().await;
        notifier::system_status(&hub.session, &hub.registry)
    }

    async fn dispatch(&self, id: &ClientId, text: &str) -> Result<()> {
        match ClientMessage::decode(text)? {
            ClientMessage::StartSharing => self.start_sharing(id).await,
            ClientMessage::StopSharing => self.stop_sharing(id).await,
            ClientMessage::Authenticate { password } => {
                // A non-string password can never match.
                self.authenticate(id, password.as_str().unwrap_or_default())
                    .await
            }
            ClientMessage::WebRtc { to, signal } => {
                match to.as_str() {
                    Some(to) => self.relay_signal(id, to, signal).await,
                    None => debug!(
                        from = %id,
                        outcome = ?RelayOutcome::UnknownTarget,
                        "Signal without a target dropped"
                    ),
                }
                Ok(())
            }
            ClientMessage::Move { x, y } => {
                self.input(
                    id,
                    InputCommand::Move {
                        x: to_coordinate(x),
                        y: to_coordinate(y),
                    },
                )
                .await
            }
            ClientMessage::Click => self.input(id, InputCommand::Click).await,
            ClientMessage::GetPosition => self.input(id, InputCommand::GetPosition).await,
            ClientMessage::Ping => {
                self.hub.lock().await.reply(id, &ServerMessage::Pong);
                Ok(())
            }
            ClientMessage::Unknown => {
                debug!(client = %id, "Ignoring unknown message type");
                Ok(())
            }
        }
    }

    async fn start_sharing(&self, id: &ClientId) -> Result<()> {
        let mut guard = self.hub.lock().await;
        let Hub { registry, session } = &mut *guard;

        let password = session.start_sharing(registry, id)?;
        if let Some(conn) = registry.get(id.as_str()) {
            conn.send(&ServerMessage::SharingStarted {
                password,
                is_sharing: true,
            });
        }
        notifier::broadcast(
            registry,
            &ServerMessage::SharingStatusChanged { is_sharing: true },
            Some(id),
            None,
        );
        notifier::broadcast_system_status(session, registry);
        debug!(client = %id, state = ?session.state(), "Session transition");
        Ok(())
    }

    async fn stop_sharing(&self, id: &ClientId) -> Result<()> {
        let mut guard = self.hub.lock().await;
        let Hub { registry, session } = &mut *guard;

        session.stop_sharing(registry, id)?;
        if let Some(conn) = registry.get(id.as_str()) {
            conn.send(&ServerMessage::SharingStopped);
        }
        notifier::broadcast(
            registry,
            &ServerMessage::SharingStatusChanged { is_sharing: false },
            Some(id),
            None,
        );
        notifier::broadcast_system_status(session, registry);
        debug!(client = %id, state = ?session.state(), "Session transition");
        Ok(())
    }

    async fn authenticate(&self, id: &ClientId, password: &str) -> Result<()> {
        let mut guard = self.hub.lock().await;
        let Hub { registry, session } = &mut *guard;

        let host = session.authorize(registry, id, password)?;
        if let Some(conn) = registry.get(id.as_str()) {
            conn.send(&ServerMessage::Authenticated {
                sharing_client_id: host,
            });
        }
        notifier::broadcast_system_status(session, registry);
        debug!(client = %id, state = ?session.state(), "Session transition");
        Ok(())
    }

    async fn relay_signal(&self, id: &ClientId, to: &str, signal: serde_json::Value) {
        let hub = self.hub.lock().await;
        let outcome = router::relay(&hub.registry, id, to, signal);
        if outcome != RelayOutcome::Delivered {
            debug!(from = %id, to, ?outcome, "Signal not delivered");
        }
    }

    async fn input(&self, id: &ClientId, command: InputCommand) -> Result<()> {
        let allowed = {
            let hub = self.hub.lock().await;
            hub.session.may_control(&hub.registry, id, self.options.gating)
        };
        if !allowed {
            debug!(client = %id, "Input command from unauthorized client dropped");
            return Ok(());
        }

        match command {
            InputCommand::Move { x, y } => self.driver.move_to(x, y)?,
            InputCommand::Click => self.driver.click()?,
            InputCommand::GetPosition => {
                let (x, y) = self.driver.position()?;
                self.hub
                    .lock()
                    .await
                    .reply(id, &ServerMessage::Position { x, y });
            }
        }
        Ok(())
    }
}
