//! Device handle ownership across open, close, and recovery cycles.

use std::time::Duration;

use log::{info, warn};

use crate::device::guard::DeviceLock;
use crate::models::characteristics::CameraCharacteristics;
use crate::models::error::CameraError;
use crate::traits::backend::{CameraBackend, CameraDevice, DeviceEvents};

/// Identity of the device the caller selected.
pub(crate) struct SelectedDevice {
    pub id: String,
    pub characteristics: CameraCharacteristics,
}

/// Owns the backend and the open device handle.
///
/// Every open bumps a generation counter; event sinks created for an open
/// cycle carry that generation so the worker can discard events from a
/// handle that has since been closed.
pub(crate) struct DeviceSupervisor {
    backend: Box<dyn CameraBackend>,
    selected: Option<SelectedDevice>,
    device: Option<Box<dyn CameraDevice>>,
    generation: u64,
}

impl DeviceSupervisor {
    pub fn new(backend: Box<dyn CameraBackend>) -> Self {
        Self {
            backend,
            selected: None,
            device: None,
            generation: 0,
        }
    }

    pub fn select(&mut self, id: String, characteristics: CameraCharacteristics) {
        self.selected = Some(SelectedDevice {
            id,
            characteristics,
        });
    }

    pub fn selected(&self) -> Option<&SelectedDevice> {
        self.selected.as_ref()
    }

    pub fn characteristics(&self) -> Option<&CameraCharacteristics> {
        self.selected.as_ref().map(|device| &device.characteristics)
    }

    pub fn is_open(&self) -> bool {
        self.device.is_some()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn device_mut(&mut self) -> Option<&mut dyn CameraDevice> {
        match self.device.as_mut() {
            Some(device) => Some(&mut **device),
            None => None,
        }
    }

    /// Opens the selected device. The access guard brackets exactly the
    /// backend open call.
    pub fn open(
        &mut self,
        lock: &DeviceLock,
        timeout: Duration,
        make_events: impl FnOnce(u64) -> DeviceEvents,
    ) -> Result<(), CameraError> {
        if self.device.is_some() {
            return Err(CameraError::InvalidState("device already open".into()));
        }
        let selected = self
            .selected
            .as_ref()
            .ok_or_else(|| CameraError::InvalidState("no device selected".into()))?;

        self.generation += 1;
        let events = make_events(self.generation);

        let device = {
            let _guard = lock.acquire(timeout)?;
            self.backend.open(&selected.id, events)?
        };

        info!("opened camera device {}", selected.id);
        self.device = Some(device);
        Ok(())
    }

    /// Closes the device handle. Teardown always completes: guard timeouts
    /// and close faults are logged, never propagated.
    pub fn close(&mut self, lock: &DeviceLock, timeout: Duration) {
        let Some(mut device) = self.device.take() else {
            return;
        };
        self.generation += 1;

        match lock.acquire(timeout) {
            Ok(_guard) => {
                if let Err(e) = device.close() {
                    warn!("device close failed: {}", e);
                }
            }
            Err(e) => {
                warn!("device access guard unavailable during close ({}), closing anyway", e);
                if let Err(e) = device.close() {
                    warn!("device close failed: {}", e);
                }
            }
        }
        info!("closed camera device");
    }
}
