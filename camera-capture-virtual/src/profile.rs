//! Behavior scripts for virtual camera devices.

use std::time::Duration;

use camera_capture_core::{CameraCharacteristics, SensorRect, Size};

/// How a scripted device converges exposure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AeBehavior {
    /// Exposure is always reported converged; captures skip precapture.
    AlwaysConverged,
    /// Exposure converges only after a precapture trigger, taking this
    /// many frames to settle.
    RequiresPrecapture { frames: u32 },
}

/// Script for one virtual device: static characteristics plus the timing
/// of its focus and exposure convergence.
#[derive(Debug, Clone)]
pub struct VirtualDeviceProfile {
    pub characteristics: CameraCharacteristics,
    /// Wall-clock spacing of synthesized preview frames.
    pub frame_interval: Duration,
    /// Frames between a focus trigger and the lock report.
    pub af_lock_frames: u32,
    /// Whether the focus sweep ends locked on the subject. A failed sweep
    /// still locks, reporting `NotFocusedLocked`.
    pub af_succeeds: bool,
    pub ae: AeBehavior,
    /// Dimensions of synthesized still images.
    pub still_size: Size,
}

impl Default for VirtualDeviceProfile {
    fn default() -> Self {
        Self {
            characteristics: CameraCharacteristics {
                max_zoom: 4.0,
                active_array: SensorRect::new(0, 0, 4032, 3024),
                has_auto_focus: true,
                has_flash: true,
                ae_compensation_range: (-12, 12),
                ae_compensation_step: 1.0 / 6.0,
            },
            frame_interval: Duration::from_millis(33),
            af_lock_frames: 2,
            af_succeeds: true,
            ae: AeBehavior::AlwaysConverged,
            still_size: Size {
                width: 4032,
                height: 3024,
            },
        }
    }
}

impl VirtualDeviceProfile {
    /// Profile tuned for fast test runs: millisecond frames, quick lock.
    pub fn fast() -> Self {
        Self {
            frame_interval: Duration::from_millis(5),
            ..Self::default()
        }
    }
}
