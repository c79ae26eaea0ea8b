//! Shared fakes for exercising the session layer without hardware.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::models::capture_result::{PhotoCallback, PhotoCaptureResult};
use crate::models::characteristics::CameraCharacteristics;
use crate::models::error::{CameraError, CaptureFailureKind};
use crate::models::geometry::SensorRect;
use crate::models::request::{CaptureRequest, RequestId, TargetSurface};
use crate::traits::backend::{
    CameraBackend, CameraDevice, CameraSession, DeviceEvents, SessionEvents,
};

pub fn test_characteristics() -> CameraCharacteristics {
    CameraCharacteristics {
        max_zoom: 4.0,
        active_array: SensorRect::new(0, 0, 4032, 3024),
        has_auto_focus: true,
        has_flash: true,
        ae_compensation_range: (-12, 12),
        ae_compensation_step: 1.0 / 6.0,
    }
}

/// Call record shared by every session a fake device hands out.
#[derive(Default)]
pub struct SessionLog {
    pub repeating: Vec<CaptureRequest>,
    pub one_shots: Vec<CaptureRequest>,
    pub stop_repeating_calls: usize,
    pub abort_calls: usize,
    pub close_calls: usize,
}

pub struct FakeSession {
    log: Arc<Mutex<SessionLog>>,
    fail_capture: Arc<AtomicBool>,
    next_request: u64,
}

impl FakeSession {
    pub fn new(log: Arc<Mutex<SessionLog>>, fail_capture: Arc<AtomicBool>) -> Self {
        Self {
            log,
            fail_capture,
            next_request: 1,
        }
    }
}

impl CameraSession for FakeSession {
    fn set_repeating(&mut self, request: &CaptureRequest) -> Result<(), CameraError> {
        self.log.lock().repeating.push(request.clone());
        Ok(())
    }

    fn stop_repeating(&mut self) -> Result<(), CameraError> {
        self.log.lock().stop_repeating_calls += 1;
        Ok(())
    }

    fn capture(&mut self, request: &CaptureRequest) -> Result<RequestId, CameraError> {
        if self.fail_capture.load(Ordering::SeqCst) {
            return Err(CameraError::CaptureFailure(CaptureFailureKind::Hardware(
                "injected capture fault".into(),
            )));
        }
        self.log.lock().one_shots.push(request.clone());
        let id = RequestId(self.next_request);
        self.next_request += 1;
        Ok(id)
    }

    fn abort_captures(&mut self) -> Result<(), CameraError> {
        self.log.lock().abort_calls += 1;
        Ok(())
    }

    fn close(&mut self) {
        self.log.lock().close_calls += 1;
    }
}

pub struct FakeDevice {
    session_log: Arc<Mutex<SessionLog>>,
    fail_capture: Arc<AtomicBool>,
    create_calls: Arc<Mutex<Vec<Vec<TargetSurface>>>>,
    closes: Arc<AtomicUsize>,
    fail_configure: bool,
    fail_close: bool,
}

impl CameraDevice for FakeDevice {
    fn create_session(
        &mut self,
        targets: &[TargetSurface],
        events: SessionEvents,
    ) -> Result<(), CameraError> {
        self.create_calls.lock().push(targets.to_vec());
        if self.fail_configure {
            events.configure_failed();
        } else {
            events.configured(Box::new(FakeSession::new(
                Arc::clone(&self.session_log),
                Arc::clone(&self.fail_capture),
            )));
        }
        Ok(())
    }

    fn close(&mut self) -> Result<(), CameraError> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        if self.fail_close {
            return Err(CameraError::DeviceOpenFailure("injected close fault".into()));
        }
        Ok(())
    }
}

/// Backend whose devices configure sessions synchronously by pushing the
/// configured/configure-failed event straight onto the worker channel.
pub struct FakeBackend {
    pub fail_open: bool,
    /// Fail every open once this many have succeeded.
    pub fail_opens_after: Option<usize>,
    pub fail_configure: bool,
    pub fail_device_close: bool,
    opens: Arc<Mutex<Vec<String>>>,
    device_closes: Arc<AtomicUsize>,
    session_log: Arc<Mutex<SessionLog>>,
    create_calls: Arc<Mutex<Vec<Vec<TargetSurface>>>>,
    fail_capture: Arc<AtomicBool>,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self {
            fail_open: false,
            fail_opens_after: None,
            fail_configure: false,
            fail_device_close: false,
            opens: Arc::new(Mutex::new(Vec::new())),
            device_closes: Arc::new(AtomicUsize::new(0)),
            session_log: Arc::new(Mutex::new(SessionLog::default())),
            create_calls: Arc::new(Mutex::new(Vec::new())),
            fail_capture: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn opens(&self) -> Arc<Mutex<Vec<String>>> {
        Arc::clone(&self.opens)
    }

    pub fn device_closes(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.device_closes)
    }

    pub fn session_log(&self) -> Arc<Mutex<SessionLog>> {
        Arc::clone(&self.session_log)
    }

    pub fn create_calls(&self) -> Arc<Mutex<Vec<Vec<TargetSurface>>>> {
        Arc::clone(&self.create_calls)
    }

    /// Shared flag: while set, every session capture call fails.
    pub fn capture_fault_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.fail_capture)
    }
}

impl CameraBackend for FakeBackend {
    fn open(
        &mut self,
        device_id: &str,
        _events: DeviceEvents,
    ) -> Result<Box<dyn CameraDevice>, CameraError> {
        let prior_opens = self.opens.lock().len();
        self.opens.lock().push(device_id.to_string());

        let budget_exhausted = self
            .fail_opens_after
            .map(|limit| prior_opens >= limit)
            .unwrap_or(false);
        if self.fail_open || budget_exhausted {
            return Err(CameraError::DeviceOpenFailure("injected open fault".into()));
        }

        Ok(Box::new(FakeDevice {
            session_log: Arc::clone(&self.session_log),
            fail_capture: Arc::clone(&self.fail_capture),
            create_calls: Arc::clone(&self.create_calls),
            closes: Arc::clone(&self.device_closes),
            fail_configure: self.fail_configure,
            fail_close: self.fail_device_close,
        }))
    }
}

pub type PhotoResults = Arc<Mutex<Vec<Result<PhotoCaptureResult, CameraError>>>>;

pub fn photo_result_store() -> PhotoResults {
    Arc::new(Mutex::new(Vec::new()))
}

pub fn recording_photo_callback(store: &PhotoResults) -> PhotoCallback {
    let store = Arc::clone(store);
    Box::new(move |result| store.lock().push(result))
}
