use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("config file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("config parse error: {0}")]
    ParseError(String),

    #[error("config validation error: {0}")]
    ValidationError(String),
}

/// Rejections produced by the sharing-session state machine.
///
/// None of these end the connection; the dispatcher turns them into an
/// `error` envelope for the requesting client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    #[error("sharing already in progress")]
    AlreadySharing,

    #[error("only the sharing host can stop the session")]
    NotHost,

    #[error("no active sharing session")]
    NoActiveSession,

    #[error("another client is already in control")]
    ControllerBusy,

    #[error("invalid password")]
    InvalidPassword,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DriverError {
    #[error("input driver failed: {0}")]
    Failed(String),
}

#[derive(Debug, thiserror::Error)]
pub enum PointshareError {
    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Driver(#[from] DriverError),

    #[error("malformed message: {0}")]
    Malformed(String),
}

impl From<serde_json::Error> for PointshareError {
    fn from(err: serde_json::Error) -> Self {
        Self::Malformed(err.to_string())
    }
}
