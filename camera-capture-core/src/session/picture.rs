//! Still capture orchestration: focus lock, exposure precapture, still
//! trigger, focus release.

use std::path::PathBuf;

use log::{debug, warn};

use crate::models::capture_result::{PhotoCallback, PhotoCaptureResult, StillImage};
use crate::models::config::RequestConfig;
use crate::models::error::{CameraError, CaptureFailureKind};
use crate::models::metadata::{AeState, FrameMetadata};
use crate::models::request::RequestId;
use crate::models::state::FocusCaptureState;
use crate::processing::request_builder;
use crate::storage::photo_writer;
use crate::traits::session_observer::{ActiveSession, SessionObserver};

/// A capture intent accepted but not yet resolved.
struct PendingCapture {
    destination: PathBuf,
    on_result: PhotoCallback,
    request: Option<RequestId>,
    result: Option<Result<PhotoCaptureResult, CameraError>>,
}

/// Drives one still capture at a time through the focus/exposure state
/// machine, advancing only on worker-delivered frame metadata.
///
/// Transitions that need another broadcast round (submission failure,
/// release completion) are staged in `deferred` rather than dispatched
/// inline, keeping observer notification non-reentrant.
pub(crate) struct StillCaptureOrchestrator {
    state: FocusCaptureState,
    pending: Option<PendingCapture>,
    deferred: Option<FocusCaptureState>,
    delivered: Option<Result<PhotoCaptureResult, CameraError>>,
}

impl StillCaptureOrchestrator {
    pub fn new() -> Self {
        Self {
            state: FocusCaptureState::Idle,
            pending: None,
            deferred: None,
            delivered: None,
        }
    }

    pub fn state(&self) -> FocusCaptureState {
        self.state
    }

    pub fn is_idle(&self) -> bool {
        self.state.is_idle() && self.pending.is_none()
    }

    /// Accepts a capture intent and returns the state to broadcast.
    /// Callers guarantee no capture is currently in flight.
    ///
    /// Without autofocus there is nothing to converge, so the machine
    /// goes straight to the still submission.
    pub fn begin(
        &mut self,
        destination: PathBuf,
        on_result: PhotoCallback,
        auto_focus: bool,
    ) -> FocusCaptureState {
        self.pending = Some(PendingCapture {
            destination,
            on_result,
            request: None,
            result: None,
        });
        self.state = if auto_focus {
            FocusCaptureState::WaitingFocusLock
        } else {
            FocusCaptureState::CaptureRequested
        };
        debug!("capture accepted, entering {:?}", self.state);
        self.state
    }

    /// Advances on one frame of metadata. Returns the state to broadcast,
    /// or None when the frame does not move the machine.
    pub fn advance(&mut self, metadata: &FrameMetadata) -> Option<FocusCaptureState> {
        let next = Self::next_state(self.state, metadata)?;
        debug!(
            "focus state {:?} -> {:?} (frame {})",
            self.state, next, metadata.frame_number
        );
        self.state = next;
        Some(next)
    }

    /// Frame-driven transition table.
    fn next_state(state: FocusCaptureState, metadata: &FrameMetadata) -> Option<FocusCaptureState> {
        match state {
            FocusCaptureState::WaitingFocusLock => {
                // No AF state on this frame: keep waiting.
                let af = metadata.af_state?;
                if !af.is_locked() {
                    return None;
                }
                match metadata.ae_state {
                    // Exposure already converged, or the pipeline reports
                    // no AE at all: go straight to the still.
                    None | Some(AeState::Converged) => Some(FocusCaptureState::CaptureRequested),
                    Some(_) => Some(FocusCaptureState::Precapture),
                }
            }
            FocusCaptureState::Precapture => match metadata.ae_state {
                None
                | Some(AeState::Precapture)
                | Some(AeState::FlashRequired)
                | Some(AeState::Converged) => Some(FocusCaptureState::WaitingPrecaptureReady),
                Some(_) => None,
            },
            FocusCaptureState::WaitingPrecaptureReady => match metadata.ae_state {
                Some(AeState::Precapture) => None,
                _ => Some(FocusCaptureState::CaptureRequested),
            },
            _ => None,
        }
    }

    /// Hardware resolved the submitted still. Returns the state to
    /// broadcast, or None when the completion belongs to a request this
    /// orchestrator no longer tracks.
    pub fn on_still_completed(
        &mut self,
        request: RequestId,
        outcome: Result<StillImage, CaptureFailureKind>,
        config: &RequestConfig,
    ) -> Option<FocusCaptureState> {
        if self.state != FocusCaptureState::CaptureRequested {
            debug!("still completion in {:?} ignored", self.state);
            return None;
        }
        let pending = self.pending.as_mut()?;
        if pending.request != Some(request) {
            warn!("still completion for unknown request {:?} ignored", request);
            return None;
        }

        let result = match outcome {
            Ok(image) => photo_writer::write_photo(&pending.destination, &image, config),
            Err(kind) => Err(CameraError::CaptureFailure(kind)),
        };
        pending.result = Some(result);
        self.state = FocusCaptureState::ReleasingFocus;
        Some(self.state)
    }

    /// Resolves any outstanding capture with `error` and resets to idle.
    /// Used on stop, device switch, target replacement, and disconnect.
    /// Returns true when a capture was actually aborted.
    pub fn abort(&mut self, error: CameraError) -> bool {
        self.deferred = None;
        self.state = FocusCaptureState::Idle;
        match self.pending.take() {
            Some(pending) => {
                warn!("aborting in-flight capture: {}", error);
                (pending.on_result)(Err(error));
                true
            }
            None => false,
        }
    }

    /// Pops a transition staged during the last notification round. The
    /// caller broadcasts the returned state.
    pub fn take_deferred(&mut self) -> Option<FocusCaptureState> {
        let next = self.deferred.take()?;
        self.state = next;
        Some(next)
    }

    /// Pops the result delivered during the last notification round, for
    /// delegate fan-out.
    pub fn take_delivery(&mut self) -> Option<Result<PhotoCaptureResult, CameraError>> {
        self.delivered.take()
    }

    // --- Internal helpers ---

    fn submit_still(&mut self, active: ActiveSession<'_>) {
        let Some(pending) = self.pending.as_mut() else {
            warn!("capture requested with no pending capture");
            return;
        };
        let request = request_builder::still_request(&active.config, active.characteristics);
        match active.session.capture(&request) {
            Ok(id) => {
                pending.request = Some(id);
                debug!("still request {:?} submitted", id);
            }
            Err(e) => {
                warn!("still submission failed: {}", e);
                let failure = match e {
                    CameraError::CaptureFailure(kind) => kind,
                    other => CaptureFailureKind::Hardware(other.to_string()),
                };
                pending.result = Some(Err(CameraError::CaptureFailure(failure)));
                self.deferred = Some(FocusCaptureState::ReleasingFocus);
            }
        }
    }

    fn deliver_result(&mut self) {
        let Some(pending) = self.pending.take() else {
            return;
        };
        let result = pending.result.unwrap_or_else(|| {
            Err(CameraError::CaptureFailure(CaptureFailureKind::Aborted))
        });
        self.delivered = Some(result.clone());
        (pending.on_result)(result);
    }
}

impl SessionObserver for StillCaptureOrchestrator {
    fn on_configured(&mut self, _active: ActiveSession<'_>) {}

    fn on_configure_failed(&mut self) {
        if self.pending.is_some() {
            self.abort(CameraError::SessionConfigureFailure);
        }
    }

    fn on_capture_state_changed(&mut self, state: FocusCaptureState, active: ActiveSession<'_>) {
        match state {
            FocusCaptureState::CaptureRequested => self.submit_still(active),
            FocusCaptureState::ReleasingFocus => {
                // Preview has already restored the repeating stream in
                // this round; deliver and finish in the next.
                self.deliver_result();
                self.deferred = Some(FocusCaptureState::Idle);
            }
            _ => {}
        }
    }
}
