use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Caller-facing flash policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlashMode {
    /// Flash never fires.
    None,
    /// Flash fires on every still capture.
    On,
    /// Hardware decides per scene.
    Auto,
    /// Flash unit held on continuously (torch).
    Always,
}

impl Default for FlashMode {
    fn default() -> Self {
        Self::None
    }
}

/// Clockwise image orientation stamped on every request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Orientation {
    Deg0,
    Deg90,
    Deg180,
    Deg270,
}

impl Orientation {
    pub fn degrees(self) -> u16 {
        match self {
            Self::Deg0 => 0,
            Self::Deg90 => 90,
            Self::Deg180 => 180,
            Self::Deg270 => 270,
        }
    }

    pub fn from_degrees(degrees: u16) -> Option<Self> {
        match degrees {
            0 => Some(Self::Deg0),
            90 => Some(Self::Deg90),
            180 => Some(Self::Deg180),
            270 => Some(Self::Deg270),
            _ => None,
        }
    }
}

impl Default for Orientation {
    fn default() -> Self {
        Self::Deg270
    }
}

/// Immutable snapshot of the caller-requested live configuration.
///
/// Holds requested values only. The effective autofocus mode and the crop
/// rectangle are derived at request-build time from the device capability
/// snapshot, so a stale config can never carry a stale crop.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RequestConfig {
    pub flash_mode: FlashMode,

    /// Whether the caller wants autofocus; only honored on capable devices.
    pub auto_focus: bool,

    /// Normalized zoom factor in `[0, 1]`, where 0 means no zoom.
    pub zoom: f64,

    pub orientation: Orientation,
}

impl Default for RequestConfig {
    fn default() -> Self {
        Self {
            flash_mode: FlashMode::None,
            auto_focus: true,
            zoom: 0.0,
            orientation: Orientation::Deg270,
        }
    }
}

/// Tunables for the controller's device lifecycle.
#[derive(Debug, Clone)]
pub struct ControllerOptions {
    /// Bound on waiting for exclusive device access around open and close.
    pub lock_timeout: Duration,

    /// Automatic reopen attempts after a disconnect event.
    pub disconnect_retry_limit: u32,
}

impl Default for ControllerOptions {
    fn default() -> Self {
        Self {
            lock_timeout: Duration::from_millis(2500),
            disconnect_retry_limit: 1,
        }
    }
}

impl ControllerOptions {
    pub fn validate(&self) -> Result<(), String> {
        if self.lock_timeout.is_zero() {
            return Err("device lock timeout must be positive".into());
        }
        Ok(())
    }
}
