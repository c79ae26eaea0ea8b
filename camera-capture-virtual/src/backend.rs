//! Backend over a registry of scripted virtual devices.

use std::collections::HashMap;
use std::sync::Arc;

use log::{debug, info};
use parking_lot::Mutex;

use camera_capture_core::{
    CameraBackend, CameraDevice, CameraError, CaptureRequest, DeviceEvents,
};

use crate::device::{Inner, VirtualDevice};
use crate::profile::VirtualDeviceProfile;

/// In-process camera backend. Devices are registered up front with a
/// behavior profile; opening an unknown id fails the way a missing piece
/// of hardware would.
pub struct VirtualCameraBackend {
    devices: HashMap<String, Arc<Mutex<Inner>>>,
}

impl VirtualCameraBackend {
    pub fn new() -> Self {
        Self {
            devices: HashMap::new(),
        }
    }

    /// Registers a scripted device and returns the handle tests use to
    /// inject faults and inspect what the pipeline submitted.
    pub fn add_device(
        &mut self,
        id: impl Into<String>,
        profile: VirtualDeviceProfile,
    ) -> VirtualDeviceHandle {
        let id = id.into();
        let inner = Arc::new(Mutex::new(Inner::new(profile)));
        debug!("registered virtual device {}", id);
        self.devices.insert(id, Arc::clone(&inner));
        VirtualDeviceHandle { inner }
    }
}

impl Default for VirtualCameraBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl CameraBackend for VirtualCameraBackend {
    fn open(
        &mut self,
        device_id: &str,
        events: DeviceEvents,
    ) -> Result<Box<dyn CameraDevice>, CameraError> {
        let inner = self.devices.get(device_id).ok_or_else(|| {
            CameraError::DeviceOpenFailure(format!("unknown virtual device {}", device_id))
        })?;
        inner.lock().reset_for_open(events);
        info!("opened virtual device {}", device_id);
        Ok(Box::new(VirtualDevice {
            inner: Arc::clone(inner),
        }))
    }
}

/// Test-side handle to a registered virtual device.
///
/// Stays valid across open cycles; fault injections apply to the current
/// cycle.
#[derive(Clone)]
pub struct VirtualDeviceHandle {
    inner: Arc<Mutex<Inner>>,
}

impl VirtualDeviceHandle {
    /// Simulates the device dropping off the bus: frames stop, pending
    /// work fails, and the disconnect is reported upstream.
    pub fn disconnect(&self) {
        let events = {
            let mut inner = self.inner.lock();
            inner.disconnected = true;
            inner.repeating = None;
            inner.pending_still = None;
            inner.device_events.clone()
        };
        if let Some(events) = events {
            events.disconnected();
        }
    }

    /// Makes the next submitted still fail at the hardware layer.
    pub fn fail_next_capture(&self) {
        self.inner.lock().fail_next_capture = true;
    }

    /// The repeating request currently installed, if any.
    pub fn last_repeating(&self) -> Option<CaptureRequest> {
        self.inner.lock().repeating.clone()
    }

    /// Frames synthesized in the current open cycle.
    pub fn frames_emitted(&self) -> u64 {
        self.inner.lock().frame_number
    }
}
