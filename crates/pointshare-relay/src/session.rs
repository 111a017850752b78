//! The single sharing session: who hosts, who controls, and the password.
//!
//! At most one host shares at a time and at most one controller is
//! authorized. Host and controller are referenced by id only; the registry
//! owns the connections, and every transition here keeps the registry's
//! flags in step with the state.

use pointshare_common::{ClientId, SessionError};
use pointshare_config::InputGating;
use rand::Rng;
use tracing::info;

use crate::registry::ConnectionRegistry;

/// Inclusive range of generated share passwords. Always six digits, never a
/// leading zero.
pub const PASSWORD_RANGE: std::ops::RangeInclusive<u32> = 100_000..=999_999;

/// Generate a fresh six-digit share password.
pub fn generate_password() -> String {
    rand::thread_rng().gen_range(PASSWORD_RANGE).to_string()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Sharing {
        host: ClientId,
        password: String,
    },
    Controlled {
        host: ClientId,
        password: String,
        controller: ClientId,
    },
}

/// What a disconnect did to the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisconnectOutcome {
    /// The connection held no session role.
    Unaffected,
    /// The host left; the session is gone and any controller was released.
    SessionEnded,
    /// The controller left; the host keeps sharing.
    ControllerReleased,
}

#[derive(Debug)]
pub struct SessionAuthority {
    state: SessionState,
}

impl Default for SessionAuthority {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionAuthority {
    pub fn new() -> Self {
        Self {
            state: SessionState::Idle,
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn is_active(&self) -> bool {
        !matches!(self.state, SessionState::Idle)
    }

    pub fn host(&self) -> Option<&ClientId> {
        match &self.state {
            SessionState::Idle => None,
            SessionState::Sharing { host, .. } | SessionState::Controlled { host, .. } => {
                Some(host)
            }
        }
    }

    pub fn controller(&self) -> Option<&ClientId> {
        match &self.state {
            SessionState::Controlled { controller, .. } => Some(controller),
            _ => None,
        }
    }

    pub fn password(&self) -> Option<&str> {
        match &self.state {
            SessionState::Idle => None,
            SessionState::Sharing { password, .. }
            | SessionState::Controlled { password, .. } => Some(password),
        }
    }

    /// Open a session hosted by `host`. Returns the generated password.
    pub fn start_sharing(
        &mut self,
        registry: &mut ConnectionRegistry,
        host: &ClientId,
    ) -> Result<String, SessionError> {
        self.start_sharing_with(registry, host, generate_password())
    }

    pub(crate) fn start_sharing_with(
        &mut self,
        registry: &mut ConnectionRegistry,
        host: &ClientId,
        password: String,
    ) -> Result<String, SessionError> {
        if self.is_active() {
            return Err(SessionError::AlreadySharing);
        }

        if let Some(conn) = registry.get_mut(host.as_str()) {
            conn.is_host = true;
            conn.authorized = true;
        }
        self.state = SessionState::Sharing {
            host: host.clone(),
            password: password.clone(),
        };

        info!(host = %host, password = %password, "Sharing started");
        Ok(password)
    }

    /// Close the session. Only the host may do this.
    pub fn stop_sharing(
        &mut self,
        registry: &mut ConnectionRegistry,
        requester: &ClientId,
    ) -> Result<(), SessionError> {
        if self.host() != Some(requester) {
            return Err(SessionError::NotHost);
        }

        self.collapse(registry);
        info!(host = %requester, "Sharing stopped");
        Ok(())
    }

    /// Grant control to `requester` if `supplied` matches the password.
    ///
    /// Re-authorizing the current controller succeeds; a second controller is
    /// turned away. A wrong password leaves the state untouched. Returns the
    /// host id so the controller knows whom to negotiate WebRTC with.
    pub fn authorize(
        &mut self,
        registry: &mut ConnectionRegistry,
        requester: &ClientId,
        supplied: &str,
    ) -> Result<ClientId, SessionError> {
        let (host, password) = match &self.state {
            SessionState::Idle => return Err(SessionError::NoActiveSession),
            SessionState::Sharing { host, password } => (host, password),
            SessionState::Controlled {
                host,
                password,
                controller,
            } => {
                if controller != requester {
                    return Err(SessionError::ControllerBusy);
                }
                (host, password)
            }
        };

        if supplied != password {
            return Err(SessionError::InvalidPassword);
        }

        let host = host.clone();
        let password = password.clone();

        if let Some(conn) = registry.get_mut(requester.as_str()) {
            conn.authorized = true;
            conn.is_controller = true;
        }
        self.state = SessionState::Controlled {
            host: host.clone(),
            password,
            controller: requester.clone(),
        };

        info!(host = %host, controller = %requester, "Controller authorized");
        Ok(host)
    }

    /// Apply the session consequences of `id` going away. Call after the
    /// connection has been unregistered.
    pub fn handle_disconnect(
        &mut self,
        registry: &mut ConnectionRegistry,
        id: &ClientId,
    ) -> DisconnectOutcome {
        if self.host() == Some(id) {
            self.collapse(registry);
            info!(host = %id, "Host disconnected, sharing ended");
            return DisconnectOutcome::SessionEnded;
        }

        if self.controller() == Some(id) {
            let state = std::mem::replace(&mut self.state, SessionState::Idle);
            if let SessionState::Controlled { host, password, .. } = state {
                self.state = SessionState::Sharing { host, password };
            }
            info!(controller = %id, "Controller disconnected");
            return DisconnectOutcome::ControllerReleased;
        }

        DisconnectOutcome::Unaffected
    }

    /// Whether `id` may drive the input device under `gating`.
    pub fn may_control(
        &self,
        registry: &ConnectionRegistry,
        id: &ClientId,
        gating: InputGating,
    ) -> bool {
        let Some(conn) = registry.get(id.as_str()) else {
            return false;
        };
        match gating {
            InputGating::Controller => {
                conn.is_controller && self.controller() == Some(id)
            }
            InputGating::AnyActiveSession => conn.authorized || self.is_active(),
        }
    }

    /// Back to idle, clearing the flags of every former participant.
    fn collapse(&mut self, registry: &mut ConnectionRegistry) {
        let state = std::mem::replace(&mut self.state, SessionState::Idle);
        let participants = match state {
            SessionState::Idle => Vec::new(),
            SessionState::Sharing { host, .. } => vec![host],
            SessionState::Controlled {
                host, controller, ..
            } => vec![host, controller],
        };
        for id in participants {
            if let Some(conn) = registry.get_mut(id.as_str()) {
                conn.clear_flags();
            }
        }
    }
}
