pub mod errors;
pub mod id;

pub use errors::{ConfigError, DriverError, PointshareError, SessionError};
pub use id::ClientId;

pub type Result<T> = std::result::Result<T, PointshareError>;
