//! Scripted virtual camera device and session.
//!
//! A virtual device synthesizes the event stream a hardware binding would
//! produce: per-frame metadata while a repeating request is installed,
//! staged focus and exposure convergence after triggers, and a still
//! payload one frame after a still request. All state lives in a shared
//! `Inner` so the backend can reset it across open cycles and tests can
//! inject faults through [`crate::backend::VirtualDeviceHandle`].

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use log::{debug, error, warn};
use parking_lot::Mutex;

use camera_capture_core::{
    AeState, AfMode, AfState, AfTrigger, CameraDevice, CameraError, CameraSession, CaptureRequest,
    DeviceEvents, FrameMetadata, PrecaptureTrigger, RequestId, RequestTemplate, SessionEvents,
    Size, StillImage, TargetSurface,
};

use crate::profile::{AeBehavior, VirtualDeviceProfile};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum AfPhase {
    Inactive,
    Sweeping { remaining: u32 },
    Locked { focused: bool },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum AePhase {
    Idle,
    Precapture { remaining: u32 },
    Converged,
}

/// Mutable device state shared between the backend (for open-cycle
/// resets), the device, its session, and the test handle.
pub(crate) struct Inner {
    pub(crate) profile: VirtualDeviceProfile,
    pub(crate) device_events: Option<DeviceEvents>,
    pub(crate) session_events: Option<SessionEvents>,
    pub(crate) repeating: Option<CaptureRequest>,
    pub(crate) frame_number: u64,
    pub(crate) af: AfPhase,
    pub(crate) ae: AePhase,
    pub(crate) pending_still: Option<RequestId>,
    pub(crate) next_request: u64,
    pub(crate) fail_next_capture: bool,
    pub(crate) disconnected: bool,
}

impl Inner {
    pub(crate) fn new(profile: VirtualDeviceProfile) -> Self {
        Self {
            profile,
            device_events: None,
            session_events: None,
            repeating: None,
            frame_number: 0,
            af: AfPhase::Inactive,
            ae: AePhase::Idle,
            pending_still: None,
            next_request: 1,
            fail_next_capture: false,
            disconnected: false,
        }
    }

    /// Rewinds the script for a fresh open cycle.
    pub(crate) fn reset_for_open(&mut self, events: DeviceEvents) {
        self.device_events = Some(events);
        self.session_events = None;
        self.repeating = None;
        self.frame_number = 0;
        self.af = AfPhase::Inactive;
        self.ae = AePhase::Idle;
        self.pending_still = None;
        self.next_request = 1;
        self.fail_next_capture = false;
        self.disconnected = false;
    }

    /// One frame interval elapsed: advance convergence, emit metadata,
    /// and resolve any still submitted on an earlier frame.
    pub(crate) fn tick(&mut self) {
        if self.disconnected {
            return;
        }
        let Some(request) = self.repeating.as_ref() else {
            return;
        };
        let af_mode = request.af_mode;
        self.frame_number += 1;

        if let AfPhase::Sweeping { remaining } = &mut self.af {
            if *remaining == 0 {
                self.af = AfPhase::Locked {
                    focused: self.profile.af_succeeds,
                };
            } else {
                *remaining -= 1;
            }
        }
        if let AePhase::Precapture { remaining } = &mut self.ae {
            if *remaining == 0 {
                self.ae = AePhase::Converged;
            } else {
                *remaining -= 1;
            }
        }

        let Some(events) = self.session_events.clone() else {
            return;
        };
        let mut metadata = FrameMetadata::new(self.frame_number);
        if let Some(af) = self.af_report(af_mode) {
            metadata = metadata.with_af(af);
        }
        if let Some(ae) = self.ae_report() {
            metadata = metadata.with_ae(ae);
        }
        events.frame_result(metadata);

        if let Some(pending) = self.pending_still.take() {
            if self.fail_next_capture {
                self.fail_next_capture = false;
                events.capture_failed(pending, "injected still failure");
            } else {
                events.capture_completed(
                    pending,
                    synthesize_still(&self.profile, self.frame_number),
                );
            }
        }
    }

    pub(crate) fn capture(&mut self, request: &CaptureRequest) -> Result<RequestId, CameraError> {
        if self.disconnected {
            return Err(CameraError::DeviceDisconnected);
        }
        let id = RequestId(self.next_request);
        self.next_request += 1;

        match request.af_trigger {
            AfTrigger::Start => {
                self.af = AfPhase::Sweeping {
                    remaining: self.profile.af_lock_frames,
                };
            }
            AfTrigger::Cancel => self.af = AfPhase::Inactive,
            AfTrigger::Idle => {}
        }
        if request.precapture_trigger == PrecaptureTrigger::Start {
            self.ae = match self.profile.ae {
                AeBehavior::AlwaysConverged => AePhase::Converged,
                AeBehavior::RequiresPrecapture { frames } => {
                    AePhase::Precapture { remaining: frames }
                }
            };
        }
        if request.template == RequestTemplate::StillCapture {
            self.pending_still = Some(id);
        }
        Ok(id)
    }

    pub(crate) fn abort_captures(&mut self) {
        if let (Some(pending), Some(events)) =
            (self.pending_still.take(), self.session_events.clone())
        {
            events.capture_failed(pending, "capture aborted");
        }
    }

    fn af_report(&self, af_mode: AfMode) -> Option<AfState> {
        if af_mode == AfMode::Off {
            return None;
        }
        Some(match self.af {
            AfPhase::Inactive => AfState::PassiveScan,
            AfPhase::Sweeping { .. } => AfState::ActiveScan,
            AfPhase::Locked { focused: true } => AfState::FocusedLocked,
            AfPhase::Locked { focused: false } => AfState::NotFocusedLocked,
        })
    }

    fn ae_report(&self) -> Option<AeState> {
        Some(match self.ae {
            AePhase::Idle => match self.profile.ae {
                AeBehavior::AlwaysConverged => AeState::Converged,
                AeBehavior::RequiresPrecapture { .. } => AeState::Searching,
            },
            AePhase::Precapture { .. } => AeState::Precapture,
            AePhase::Converged => AeState::Converged,
        })
    }
}

/// Stand-in still payload with valid JPEG start and end markers.
pub(crate) fn synthesize_still(profile: &VirtualDeviceProfile, frame_number: u64) -> StillImage {
    let Size { width, height } = profile.still_size;
    let payload = ((width as usize * height as usize) / 64).max(64);
    let mut data = Vec::with_capacity(payload + 4);
    data.extend_from_slice(&[0xFF, 0xD8]);
    data.resize(payload + 2, (frame_number % 251) as u8);
    data.extend_from_slice(&[0xFF, 0xD9]);
    StillImage {
        data,
        width,
        height,
    }
}

/// One open virtual camera device.
pub struct VirtualDevice {
    pub(crate) inner: Arc<Mutex<Inner>>,
}

impl CameraDevice for VirtualDevice {
    fn create_session(
        &mut self,
        targets: &[TargetSurface],
        events: SessionEvents,
    ) -> Result<(), CameraError> {
        let mut inner = self.inner.lock();
        if inner.disconnected {
            return Err(CameraError::DeviceDisconnected);
        }
        if targets.is_empty() {
            warn!("rejecting virtual session over empty target set");
            events.configure_failed();
            return Ok(());
        }
        inner.session_events = Some(events.clone());
        inner.repeating = None;
        inner.pending_still = None;
        let interval = inner.profile.frame_interval;
        drop(inner);

        let running = Arc::new(AtomicBool::new(true));
        let pump_running = Arc::clone(&running);
        let pump_inner = Arc::clone(&self.inner);
        let pump = thread::Builder::new()
            .name("virtual-camera-pump".into())
            .spawn(move || {
                while pump_running.load(Ordering::SeqCst) {
                    thread::sleep(interval);
                    pump_inner.lock().tick();
                }
            })
            .map_err(|e| {
                error!("failed to spawn frame pump: {}", e);
                CameraError::SessionConfigureFailure
            })?;

        debug!("virtual session configured over {} target(s)", targets.len());
        events.configured(Box::new(VirtualSession {
            inner: Arc::clone(&self.inner),
            running,
            pump: Some(pump),
        }));
        Ok(())
    }

    fn close(&mut self) -> Result<(), CameraError> {
        let mut inner = self.inner.lock();
        inner.device_events = None;
        inner.session_events = None;
        inner.repeating = None;
        inner.pending_still = None;
        debug!("virtual device closed");
        Ok(())
    }
}

/// Configured session over a virtual device. Owns the frame pump thread.
pub struct VirtualSession {
    inner: Arc<Mutex<Inner>>,
    running: Arc<AtomicBool>,
    pump: Option<thread::JoinHandle<()>>,
}

impl VirtualSession {
    fn stop_pump(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(pump) = self.pump.take() {
            let _ = pump.join();
        }
    }
}

impl CameraSession for VirtualSession {
    fn set_repeating(&mut self, request: &CaptureRequest) -> Result<(), CameraError> {
        let mut inner = self.inner.lock();
        if inner.disconnected {
            return Err(CameraError::DeviceDisconnected);
        }
        inner.repeating = Some(request.clone());
        Ok(())
    }

    fn stop_repeating(&mut self) -> Result<(), CameraError> {
        self.inner.lock().repeating = None;
        Ok(())
    }

    fn capture(&mut self, request: &CaptureRequest) -> Result<RequestId, CameraError> {
        self.inner.lock().capture(request)
    }

    fn abort_captures(&mut self) -> Result<(), CameraError> {
        self.inner.lock().abort_captures();
        Ok(())
    }

    fn close(&mut self) {
        self.stop_pump();
        let mut inner = self.inner.lock();
        inner.repeating = None;
        inner.pending_still = None;
        inner.session_events = None;
    }
}

impl Drop for VirtualSession {
    fn drop(&mut self) {
        self.stop_pump();
    }
}
