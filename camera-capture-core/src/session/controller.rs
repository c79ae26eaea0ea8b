//! Controller facade and its serialized worker.
//!
//! The facade is a thin thread-safe handle: every operation is marshaled
//! onto one owned worker thread, which holds all mutable capture state.
//! Hardware bindings feed the same channel through the event handles in
//! [`crate::traits::backend`], so caller intents and hardware events are
//! interleaved into a single ordered stream.

use std::path::PathBuf;
use std::sync::Arc;
use std::thread;

use crossbeam_channel::{unbounded, Receiver, Sender};
use log::{debug, info, trace, warn};
use parking_lot::Mutex;

use crate::device::guard::DeviceLock;
use crate::device::supervisor::DeviceSupervisor;
use crate::models::capture_result::{PhotoCallback, PhotoCaptureResult, StartCallback, StillImage};
use crate::models::characteristics::CameraCharacteristics;
use crate::models::config::{ControllerOptions, FlashMode, Orientation};
use crate::models::error::{CameraError, CaptureFailureKind};
use crate::models::geometry::Size;
use crate::models::metadata::{CaptureDiagnostics, FrameMetadata};
use crate::models::request::{RequestId, SurfaceId, TargetRole, TargetSet, TargetSurface};
use crate::models::state::{FocusCaptureState, RunState};
use crate::session::manager::{CaptureSessionManager, SubscriberId};
use crate::session::picture::StillCaptureOrchestrator;
use crate::session::preview::PreviewController;
use crate::traits::backend::{CameraBackend, CameraSession, DeviceEvents, SessionEvents};
use crate::traits::delegate::CameraDelegate;
use crate::traits::session_observer::{ActiveSession, SessionObserver};

/// Message marshaled onto the worker: caller intents plus hardware events.
pub(crate) enum ControlMessage {
    // Caller intents.
    SelectDevice {
        id: String,
        characteristics: CameraCharacteristics,
    },
    SetTarget(TargetSurface),
    RemoveTarget(TargetRole),
    SetTargets(TargetSet),
    ClearTargets,
    Start {
        on_result: StartCallback,
    },
    Stop,
    SetZoom(f64),
    SetFlashMode(FlashMode),
    SetAutoFocus(bool),
    SetOrientation(Orientation),
    SetPreviewSize(Size),
    TakePhoto {
        destination: PathBuf,
        on_result: PhotoCallback,
    },
    SetDelegate(Arc<dyn CameraDelegate>),
    Shutdown,

    // Hardware events, tagged with the generation of their origin.
    DeviceLost {
        generation: u64,
    },
    DeviceFault {
        generation: u64,
        reason: String,
    },
    SessionConfigured {
        generation: u64,
        session: Box<dyn CameraSession>,
    },
    SessionConfigureFailed {
        generation: u64,
    },
    Frame {
        generation: u64,
        metadata: FrameMetadata,
    },
    CaptureCompleted {
        generation: u64,
        request: RequestId,
        image: StillImage,
    },
    CaptureFailed {
        generation: u64,
        request: RequestId,
        reason: String,
    },
}

/// Observable snapshot mirrored out of the worker for synchronous reads.
struct SharedState {
    run_state: RunState,
    focus_state: FocusCaptureState,
    preview_size: Option<Size>,
    diagnostics: CaptureDiagnostics,
}

impl SharedState {
    fn new() -> Self {
        Self {
            run_state: RunState::Stopped,
            focus_state: FocusCaptureState::Idle,
            preview_size: None,
            diagnostics: CaptureDiagnostics::default(),
        }
    }
}

/// Thread-safe handle to a camera capture controller.
///
/// All operations are non-blocking sends to the worker; results come back
/// through per-call callbacks and the registered [`CameraDelegate`].
/// Dropping the controller stops the camera and joins the worker.
pub struct CameraController {
    tx: Sender<ControlMessage>,
    shared: Arc<Mutex<SharedState>>,
    worker: Option<thread::JoinHandle<()>>,
}

impl CameraController {
    /// Spawns a controller over `backend`.
    pub fn new(
        backend: Box<dyn CameraBackend>,
        options: ControllerOptions,
    ) -> Result<Self, CameraError> {
        options.validate().map_err(CameraError::InvalidState)?;

        let (tx, rx) = unbounded();
        let shared = Arc::new(Mutex::new(SharedState::new()));

        let worker_tx = tx.clone();
        let worker_shared = Arc::clone(&shared);
        let handle = thread::Builder::new()
            .name("camera-controller".into())
            .spawn(move || worker_loop(backend, options, worker_tx, worker_shared, rx))
            .expect("failed to spawn controller worker thread");

        Ok(Self {
            tx,
            shared,
            worker: Some(handle),
        })
    }

    pub fn set_delegate(&self, delegate: Arc<dyn CameraDelegate>) {
        self.send(ControlMessage::SetDelegate(delegate));
    }

    /// Selects the device subsequent `start` calls open. Switching devices
    /// while running tears the current pipeline down first.
    pub fn select_device(
        &self,
        id: impl Into<String>,
        characteristics: CameraCharacteristics,
    ) {
        self.send(ControlMessage::SelectDevice {
            id: id.into(),
            characteristics,
        });
    }

    /// Registers or replaces a single target surface.
    pub fn set_target(&self, surface: TargetSurface) {
        self.send(ControlMessage::SetTarget(surface));
    }

    pub fn remove_target(&self, role: TargetRole) {
        self.send(ControlMessage::RemoveTarget(role));
    }

    /// Replaces the whole target set in one session rebuild.
    pub fn set_targets(
        &self,
        preview: Option<SurfaceId>,
        still: Option<SurfaceId>,
        stream: Option<SurfaceId>,
    ) {
        self.send(ControlMessage::SetTargets(TargetSet::from_roles(
            preview, still, stream,
        )));
    }

    pub fn clear_targets(&self) {
        self.send(ControlMessage::ClearTargets);
    }

    /// Opens the selected device and starts configuring the session. The
    /// callback resolves once the device is open; preview startup is
    /// reported through the delegate run state.
    pub fn start(&self, on_result: impl FnOnce(Result<(), CameraError>) + Send + 'static) {
        self.send(ControlMessage::Start {
            on_result: Box::new(on_result),
        });
    }

    /// Stops preview and releases the device. Any in-flight capture is
    /// aborted first.
    pub fn stop(&self) {
        self.send(ControlMessage::Stop);
    }

    /// Stages a normalized zoom factor in `[0, 1]` (values outside are
    /// clamped) and refreshes the live stream.
    pub fn set_zoom(&self, factor: f64) {
        self.send(ControlMessage::SetZoom(factor));
    }

    /// Stages the flash policy. Ignored on devices without a flash unit.
    pub fn set_flash_mode(&self, mode: FlashMode) {
        self.send(ControlMessage::SetFlashMode(mode));
    }

    pub fn set_auto_focus(&self, enabled: bool) {
        self.send(ControlMessage::SetAutoFocus(enabled));
    }

    pub fn set_orientation(&self, orientation: Orientation) {
        self.send(ControlMessage::SetOrientation(orientation));
    }

    /// Stages the requested preview size; the applied value (clamped to
    /// the pipeline limit) appears in [`CameraController::preview_size`].
    pub fn set_preview_size(&self, size: Size) {
        self.send(ControlMessage::SetPreviewSize(size));
    }

    /// Captures a still photo to `destination`, converging focus and
    /// exposure first on devices that support it. One capture at a time;
    /// the destination must not exist.
    pub fn capture_photo(
        &self,
        destination: impl Into<PathBuf>,
        on_result: impl FnOnce(Result<PhotoCaptureResult, CameraError>) + Send + 'static,
    ) {
        self.send(ControlMessage::TakePhoto {
            destination: destination.into(),
            on_result: Box::new(on_result),
        });
    }

    pub fn run_state(&self) -> RunState {
        self.shared.lock().run_state
    }

    pub fn focus_state(&self) -> FocusCaptureState {
        self.shared.lock().focus_state
    }

    pub fn preview_size(&self) -> Option<Size> {
        self.shared.lock().preview_size
    }

    pub fn diagnostics(&self) -> CaptureDiagnostics {
        self.shared.lock().diagnostics
    }

    fn send(&self, message: ControlMessage) {
        if self.tx.send(message).is_err() {
            warn!("controller worker is gone; operation dropped");
        }
    }
}

impl Drop for CameraController {
    fn drop(&mut self) {
        let _ = self.tx.send(ControlMessage::Shutdown);
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

fn worker_loop(
    backend: Box<dyn CameraBackend>,
    options: ControllerOptions,
    tx: Sender<ControlMessage>,
    shared: Arc<Mutex<SharedState>>,
    rx: Receiver<ControlMessage>,
) {
    let mut worker = Worker {
        options,
        lock: DeviceLock::new(),
        supervisor: DeviceSupervisor::new(backend),
        manager: CaptureSessionManager::new(),
        preview: PreviewController::new(),
        picture: StillCaptureOrchestrator::new(),
        delegate: None,
        shared,
        tx,
    };

    while let Ok(message) = rx.recv() {
        if matches!(message, ControlMessage::Shutdown) {
            worker.handle_stop();
            break;
        }
        worker.handle(message);
    }
    debug!("controller worker exited");
}

/// Owns every piece of mutable capture state; lives on the worker thread.
struct Worker {
    options: ControllerOptions,
    lock: DeviceLock,
    supervisor: DeviceSupervisor,
    manager: CaptureSessionManager,
    preview: PreviewController,
    picture: StillCaptureOrchestrator,
    delegate: Option<Arc<dyn CameraDelegate>>,
    shared: Arc<Mutex<SharedState>>,
    tx: Sender<ControlMessage>,
}

impl Worker {
    fn handle(&mut self, message: ControlMessage) {
        match message {
            ControlMessage::SelectDevice {
                id,
                characteristics,
            } => self.handle_select_device(id, characteristics),
            ControlMessage::SetTarget(surface) => self.handle_set_target(surface),
            ControlMessage::RemoveTarget(role) => self.handle_remove_target(role),
            ControlMessage::SetTargets(targets) => self.handle_set_targets(targets),
            ControlMessage::ClearTargets => self.handle_clear_targets(),
            ControlMessage::Start { on_result } => self.handle_start(on_result),
            ControlMessage::Stop => self.handle_stop(),
            ControlMessage::SetZoom(factor) => {
                self.preview.set_zoom(factor);
                self.refresh_preview();
            }
            ControlMessage::SetFlashMode(mode) => self.handle_set_flash_mode(mode),
            ControlMessage::SetAutoFocus(enabled) => {
                self.preview.set_auto_focus(enabled);
                self.refresh_preview();
            }
            ControlMessage::SetOrientation(orientation) => {
                self.preview.set_orientation(orientation);
                self.refresh_preview();
            }
            ControlMessage::SetPreviewSize(size) => {
                let clamped = self.preview.set_preview_size(size);
                self.shared.lock().preview_size = Some(clamped);
            }
            ControlMessage::TakePhoto {
                destination,
                on_result,
            } => self.handle_take_photo(destination, on_result),
            ControlMessage::SetDelegate(delegate) => self.delegate = Some(delegate),
            ControlMessage::DeviceLost { generation } => {
                self.handle_device_loss(generation, CameraError::DeviceDisconnected)
            }
            ControlMessage::DeviceFault { generation, reason } => self.handle_device_loss(
                generation,
                CameraError::CaptureFailure(CaptureFailureKind::Hardware(reason)),
            ),
            ControlMessage::SessionConfigured {
                generation,
                session,
            } => self.handle_session_configured(generation, session),
            ControlMessage::SessionConfigureFailed { generation } => {
                self.handle_session_configure_failed(generation)
            }
            ControlMessage::Frame {
                generation,
                metadata,
            } => self.handle_frame(generation, metadata),
            ControlMessage::CaptureCompleted {
                generation,
                request,
                image,
            } => self.handle_still_result(generation, request, Ok(image)),
            ControlMessage::CaptureFailed {
                generation,
                request,
                reason,
            } => self.handle_still_result(
                generation,
                request,
                Err(CaptureFailureKind::Hardware(reason)),
            ),
            ControlMessage::Shutdown => {}
        }
    }

    // --- Caller intents ---

    fn handle_select_device(&mut self, id: String, characteristics: CameraCharacteristics) {
        if let Err(reason) = characteristics.validate() {
            warn!("device {} reports suspect characteristics: {}", id, reason);
        }
        if self.supervisor.is_open() || self.manager.has_session() {
            info!("tearing down running pipeline for device switch");
            self.abort_capture(CameraError::CaptureFailure(CaptureFailureKind::Aborted));
            self.manager.clear_targets();
            self.preview.session_lost();
            self.supervisor.close(&self.lock, self.options.lock_timeout);
            self.set_run_state(RunState::Stopped);
        }
        info!("selected camera device {}", id);
        self.supervisor.select(id, characteristics);
    }

    fn handle_set_target(&mut self, surface: TargetSurface) {
        self.abort_for_session_rebuild();
        let tx = self.tx.clone();
        let device = self.supervisor.device_mut();
        let result = self.manager.set_target(surface, device, move |generation| SessionEvents {
            tx,
            generation,
        });
        self.finish_target_update(result);
    }

    fn handle_remove_target(&mut self, role: TargetRole) {
        self.abort_for_session_rebuild();
        let tx = self.tx.clone();
        let device = self.supervisor.device_mut();
        let result = self.manager.remove_target(role, device, move |generation| SessionEvents {
            tx,
            generation,
        });
        self.finish_target_update(result);
    }

    fn handle_set_targets(&mut self, targets: TargetSet) {
        self.abort_for_session_rebuild();
        let tx = self.tx.clone();
        let device = self.supervisor.device_mut();
        let result = self
            .manager
            .apply_target_set(targets, device, move |generation| SessionEvents {
                tx,
                generation,
            });
        self.finish_target_update(result);
    }

    fn handle_clear_targets(&mut self) {
        self.abort_for_session_rebuild();
        self.manager.clear_targets();
        self.preview.session_lost();
    }

    fn handle_start(&mut self, on_result: StartCallback) {
        if self.supervisor.is_open() {
            on_result(Err(CameraError::InvalidState(
                "controller already started".into(),
            )));
            return;
        }
        if !self.manager.targets().has(TargetRole::Preview) {
            on_result(Err(CameraError::InvalidState(
                "no preview target registered".into(),
            )));
            return;
        }

        self.set_run_state(RunState::Opening);
        match self.open_device_and_configure() {
            Ok(()) => on_result(Ok(())),
            Err(e) => {
                self.supervisor.close(&self.lock, self.options.lock_timeout);
                self.set_run_state(RunState::Stopped);
                on_result(Err(e));
            }
        }
    }

    fn handle_stop(&mut self) {
        if !self.supervisor.is_open() && !self.manager.has_session() {
            debug!("stop with nothing running");
            self.set_run_state(RunState::Stopped);
            return;
        }
        self.abort_capture(CameraError::CaptureFailure(CaptureFailureKind::Aborted));
        self.manager.close_session();
        self.preview.session_lost();
        self.supervisor.close(&self.lock, self.options.lock_timeout);
        self.set_run_state(RunState::Stopped);
        info!("camera controller stopped");
    }

    fn handle_set_flash_mode(&mut self, mode: FlashMode) {
        let has_flash = self
            .supervisor
            .characteristics()
            .map_or(true, |characteristics| characteristics.has_flash);
        if !has_flash {
            debug!("flash mode {:?} ignored: device has no flash unit", mode);
            return;
        }
        self.preview.set_flash_mode(mode);
        self.refresh_preview();
    }

    fn handle_take_photo(&mut self, destination: PathBuf, on_result: PhotoCallback) {
        if !self.manager.has_session() {
            on_result(Err(CameraError::InvalidState(
                "no active capture session".into(),
            )));
            return;
        }
        if !self.manager.targets().has(TargetRole::Still) {
            on_result(Err(CameraError::InvalidState(
                "no still target configured".into(),
            )));
            return;
        }
        if !self.picture.is_idle() {
            on_result(Err(CameraError::InvalidState(
                "a capture is already in flight".into(),
            )));
            return;
        }
        if destination.exists() {
            on_result(Err(CameraError::CaptureFailure(CaptureFailureKind::Io(
                format!("destination already exists: {}", destination.display()),
            ))));
            return;
        }

        let auto_focus = self.preview.config().auto_focus
            && self
                .supervisor
                .characteristics()
                .map_or(false, |characteristics| characteristics.has_auto_focus);
        let first = self.picture.begin(destination, on_result, auto_focus);
        self.broadcast_focus_state(first);
    }

    // --- Hardware events ---

    fn handle_device_loss(&mut self, generation: u64, error: CameraError) {
        if generation != self.supervisor.generation() {
            debug!("stale device event for generation {} ignored", generation);
            return;
        }
        warn!("device lost ({}), attempting recovery", error);
        self.abort_capture(error.clone());
        self.manager.close_session();
        self.preview.session_lost();
        self.supervisor.close(&self.lock, self.options.lock_timeout);

        self.set_run_state(RunState::Restarting);
        let limit = self.options.disconnect_retry_limit;
        for attempt in 1..=limit {
            info!("device reopen attempt {}/{}", attempt, limit);
            match self.open_device_and_configure() {
                Ok(()) => {
                    self.shared.lock().diagnostics.device_restarts += 1;
                    return;
                }
                Err(e) => {
                    warn!("device reopen failed: {}", e);
                    self.supervisor.close(&self.lock, self.options.lock_timeout);
                }
            }
        }
        self.set_run_state(RunState::Stopped);
        self.notify_error(&error);
    }

    fn handle_session_configured(&mut self, generation: u64, session: Box<dyn CameraSession>) {
        if !self.manager.install_session(session, generation) {
            return;
        }
        info!("capture session configured (generation {})", generation);
        self.shared.lock().diagnostics.session_rebuilds += 1;
        self.dispatch_configured();
        self.set_run_state(RunState::Previewing);
    }

    fn handle_session_configure_failed(&mut self, generation: u64) {
        if !self.manager.configure_failed(generation) {
            return;
        }
        warn!("session configuration failed (generation {})", generation);
        self.preview.on_configure_failed();
        self.picture.on_configure_failed();
        self.publish_focus_state(self.picture.state());
        self.notify_error(&CameraError::SessionConfigureFailure);
        if self.supervisor.is_open() {
            self.set_run_state(RunState::Opening);
        } else {
            self.set_run_state(RunState::Stopped);
        }
    }

    fn handle_frame(&mut self, generation: u64, metadata: FrameMetadata) {
        if generation != self.manager.generation() {
            trace!("frame for stale session generation {} dropped", generation);
            return;
        }
        self.shared.lock().diagnostics.frames_processed += 1;
        if let Some(next) = self.picture.advance(&metadata) {
            self.broadcast_focus_state(next);
        }
    }

    fn handle_still_result(
        &mut self,
        generation: u64,
        request: RequestId,
        outcome: Result<StillImage, CaptureFailureKind>,
    ) {
        if generation != self.manager.generation() {
            debug!(
                "still result for stale session generation {} dropped",
                generation
            );
            return;
        }
        let config = self.preview.config();
        if let Some(next) = self.picture.on_still_completed(request, outcome, &config) {
            self.broadcast_focus_state(next);
        }
    }

    // --- Internal helpers ---

    fn open_device_and_configure(&mut self) -> Result<(), CameraError> {
        let tx = self.tx.clone();
        self.supervisor
            .open(&self.lock, self.options.lock_timeout, move |generation| {
                DeviceEvents { tx, generation }
            })?;
        self.create_session()
    }

    fn create_session(&mut self) -> Result<(), CameraError> {
        let tx = self.tx.clone();
        let Some(device) = self.supervisor.device_mut() else {
            return Err(CameraError::InvalidState("device not open".into()));
        };
        self.manager
            .create_session(device, move |generation| SessionEvents { tx, generation })
    }

    /// Target updates rebuild the session; anything mid-capture cannot
    /// survive that and is aborted first.
    fn abort_for_session_rebuild(&mut self) {
        if self.manager.has_session() && !self.picture.is_idle() {
            self.abort_capture(CameraError::CaptureFailure(CaptureFailureKind::Aborted));
        }
    }

    fn finish_target_update(&mut self, result: Result<bool, CameraError>) {
        match result {
            Ok(recreated) => {
                if recreated {
                    debug!("session recreate started after target update");
                }
            }
            Err(e) => {
                warn!("target update failed: {}", e);
                self.notify_error(&e);
            }
        }
    }

    fn abort_capture(&mut self, error: CameraError) {
        self.picture.abort(error);
        self.publish_focus_state(FocusCaptureState::Idle);
    }

    /// Broadcasts a focus state to the snapshot, the delegate, and the
    /// session observers, then drains any transitions the observers
    /// staged. Within one worker turn the session cannot disappear
    /// between rounds, so the drain loop always dispatches consistently.
    fn broadcast_focus_state(&mut self, first: FocusCaptureState) {
        let mut state = first;
        loop {
            self.publish_focus_state(state);
            self.dispatch_state_to_observers(state);
            if let Some(result) = self.picture.take_delivery() {
                self.finish_photo_delivery(&result);
            }
            match self.picture.take_deferred() {
                Some(next) => state = next,
                None => break,
            }
        }
    }

    fn dispatch_state_to_observers(&mut self, state: FocusCaptureState) {
        let subscribers = self.manager.subscribers();
        let config = self.preview.config();
        let Some(characteristics) = self.supervisor.characteristics() else {
            return;
        };
        let (session, targets) = self.manager.active_parts();
        let Some(session) = session else {
            debug!("no live session for {:?} notification", state);
            return;
        };
        for subscriber in subscribers {
            let active = ActiveSession {
                session: &mut *session,
                targets,
                characteristics,
                config,
            };
            match subscriber {
                SubscriberId::Preview => self.preview.on_capture_state_changed(state, active),
                SubscriberId::StillCapture => self.picture.on_capture_state_changed(state, active),
            }
        }
    }

    fn dispatch_configured(&mut self) {
        let subscribers = self.manager.subscribers();
        let config = self.preview.config();
        let Some(characteristics) = self.supervisor.characteristics() else {
            return;
        };
        let (session, targets) = self.manager.active_parts();
        let Some(session) = session else {
            return;
        };
        for subscriber in subscribers {
            let active = ActiveSession {
                session: &mut *session,
                targets,
                characteristics,
                config,
            };
            match subscriber {
                SubscriberId::Preview => self.preview.on_configured(active),
                SubscriberId::StillCapture => self.picture.on_configured(active),
            }
        }
    }

    fn refresh_preview(&mut self) {
        if !self.manager.has_session() {
            return;
        }
        let config = self.preview.config();
        let Some(characteristics) = self.supervisor.characteristics() else {
            return;
        };
        let (session, targets) = self.manager.active_parts();
        let Some(session) = session else {
            return;
        };
        let result = self.preview.refresh(ActiveSession {
            session: &mut *session,
            targets,
            characteristics,
            config,
        });
        if let Err(e) = result {
            warn!("failed to resubmit repeating request: {}", e);
        }
    }

    fn finish_photo_delivery(&mut self, result: &Result<PhotoCaptureResult, CameraError>) {
        match result {
            Ok(photo) => {
                self.shared.lock().diagnostics.stills_completed += 1;
                info!("photo captured to {}", photo.destination.display());
                if let Some(delegate) = &self.delegate {
                    delegate.on_photo_captured(photo);
                }
            }
            Err(e) => debug!("capture resolved with error: {}", e),
        }
    }

    fn publish_focus_state(&mut self, state: FocusCaptureState) {
        let changed = {
            let mut shared = self.shared.lock();
            if shared.focus_state != state {
                shared.focus_state = state;
                true
            } else {
                false
            }
        };
        if changed {
            if let Some(delegate) = &self.delegate {
                delegate.on_focus_state_changed(state);
            }
        }
    }

    fn set_run_state(&mut self, state: RunState) {
        let changed = {
            let mut shared = self.shared.lock();
            if shared.run_state != state {
                shared.run_state = state;
                true
            } else {
                false
            }
        };
        if changed {
            debug!("run state -> {:?}", state);
            if let Some(delegate) = &self.delegate {
                delegate.on_run_state_changed(state);
            }
        }
    }

    fn notify_error(&self, error: &CameraError) {
        if let Some(delegate) = &self.delegate {
            delegate.on_error(error);
        }
    }
}
