use serde::{Deserialize, Serialize};

use super::geometry::SensorRect;

/// Static capability snapshot for one physical camera device.
///
/// Captured by device enumeration and handed to the controller together
/// with the device identifier; never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CameraCharacteristics {
    /// Maximum digital zoom the sensor supports (1.0 = fixed).
    pub max_zoom: f64,

    /// Native active-pixel rectangle of the sensor.
    pub active_array: SensorRect,

    pub has_auto_focus: bool,

    pub has_flash: bool,

    /// Auto-exposure compensation range in steps (min, max).
    pub ae_compensation_range: (i32, i32),

    /// Exposure-compensation step size in EV.
    pub ae_compensation_step: f64,
}

impl CameraCharacteristics {
    pub fn validate(&self) -> Result<(), String> {
        if self.max_zoom < 1.0 {
            return Err(format!("max zoom must be at least 1.0, got {}", self.max_zoom));
        }
        if self.active_array.is_empty() {
            return Err("active array rectangle is empty".into());
        }
        if self.ae_compensation_range.0 > self.ae_compensation_range.1 {
            return Err("AE compensation range is inverted".into());
        }
        Ok(())
    }
}
