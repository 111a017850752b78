//! Input driver seam: the only path from a controller's commands to the
//! host's pointer.

use std::sync::{Arc, Mutex};

use pointshare_common::DriverError;
use pointshare_config::schema::InputConfig;
use pointshare_config::InputDriverKind;
use tracing::debug;

/// Executes pointer actions on the host machine.
pub trait InputDriver: Send + Sync {
    fn move_to(&self, x: i32, y: i32) -> Result<(), DriverError>;
    fn click(&self) -> Result<(), DriverError>;
    fn position(&self) -> Result<(i32, i32), DriverError>;
}

/// Build the driver selected in config.
pub fn from_config(config: &InputConfig) -> Arc<dyn InputDriver> {
    match config.driver {
        InputDriverKind::Virtual => Arc::new(VirtualPointer::new(
            config.screen_width as i32,
            config.screen_height as i32,
        )),
    }
}

/// In-memory pointer clamped to a fixed screen size.
///
/// Useful headless and in tests; OS-level injection backends implement
/// [`InputDriver`] themselves.
#[derive(Debug)]
pub struct VirtualPointer {
    width: i32,
    height: i32,
    position: Mutex<(i32, i32)>,
}

impl VirtualPointer {
    pub fn new(width: i32, height: i32) -> Self {
        Self {
            width: width.max(1),
            height: height.max(1),
            position: Mutex::new((0, 0)),
        }
    }
}

impl InputDriver for VirtualPointer {
    fn move_to(&self, x: i32, y: i32) -> Result<(), DriverError> {
        let clamped = (x.clamp(0, self.width - 1), y.clamp(0, self.height - 1));
        let mut pos = self
            .position
            .lock()
            .map_err(|_| DriverError::Failed("pointer state poisoned".into()))?;
        *pos = clamped;
        debug!(x = clamped.0, y = clamped.1, "Pointer moved");
        Ok(())
    }

    fn click(&self) -> Result<(), DriverError> {
        let (x, y) = self.position()?;
        debug!(x, y, "Pointer clicked");
        Ok(())
    }

    fn position(&self) -> Result<(i32, i32), DriverError> {
        self.position
            .lock()
            .map(|pos| *pos)
            .map_err(|_| DriverError::Failed("pointer state poisoned".into()))
    }
}

/// Convert a JSON coordinate to a driver coordinate, truncating toward zero.
/// Out-of-range and NaN values saturate.
pub fn to_coordinate(value: f64) -> i32 {
    value as i32
}
