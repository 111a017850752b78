//! Input driver configuration.

use serde::{Deserialize, Serialize};

/// Which input driver backs `move`/`click`/`getPosition`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputDriverKind {
    /// In-memory pointer clamped to the configured screen size.
    #[default]
    Virtual,
}

/// Who may send input commands.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputGating {
    /// Only the connection currently holding control.
    #[default]
    Controller,
    /// Any authorized connection, or any connection at all while a session
    /// is active.
    AnyActiveSession,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InputConfig {
    pub driver: InputDriverKind,
    pub gating: InputGating,
    /// Valid range: 1-16384.
    pub screen_width: u32,
    /// Valid range: 1-16384.
    pub screen_height: u32,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            driver: InputDriverKind::Virtual,
            gating: InputGating::Controller,
            screen_width: 1920,
            screen_height: 1080,
        }
    }
}
