//! Live preview stream maintenance and focus/exposure trigger one-shots.

use log::{debug, warn};

use crate::models::config::{FlashMode, Orientation, RequestConfig};
use crate::models::error::CameraError;
use crate::models::geometry::Size;
use crate::models::state::FocusCaptureState;
use crate::processing::request_builder;
use crate::traits::session_observer::{ActiveSession, SessionObserver};

/// Largest preview surface some pipelines can feed without stalling.
pub const MAX_PREVIEW_WIDTH: u32 = 1920;
pub const MAX_PREVIEW_HEIGHT: u32 = 1080;

/// Maintains the repeating request that realizes the current
/// [`RequestConfig`], and issues the focus and exposure trigger one-shots
/// on behalf of the still-capture orchestrator.
///
/// Config mutations stage immediately; they only reach the hardware when
/// the worker refreshes the repeating request against a live session.
pub(crate) struct PreviewController {
    config: RequestConfig,
    preview_size: Option<Size>,
    streaming: bool,
}

impl PreviewController {
    pub fn new() -> Self {
        Self {
            config: RequestConfig::default(),
            preview_size: None,
            streaming: false,
        }
    }

    pub fn config(&self) -> RequestConfig {
        self.config
    }

    pub fn is_streaming(&self) -> bool {
        self.streaming
    }

    pub fn preview_size(&self) -> Option<Size> {
        self.preview_size
    }

    /// Clamps and stages the preview size; callers size their surface off
    /// the returned value.
    pub fn set_preview_size(&mut self, requested: Size) -> Size {
        let clamped = if requested.width > MAX_PREVIEW_WIDTH || requested.height > MAX_PREVIEW_HEIGHT
        {
            Size::new(MAX_PREVIEW_WIDTH, MAX_PREVIEW_HEIGHT)
        } else {
            requested
        };
        if clamped != requested {
            debug!(
                "preview size {}x{} clamped to {}x{}",
                requested.width, requested.height, clamped.width, clamped.height
            );
        }
        self.preview_size = Some(clamped);
        clamped
    }

    /// Stages a normalized zoom factor, clamped to `[0, 1]`.
    pub fn set_zoom(&mut self, factor: f64) {
        self.config.zoom = factor.clamp(0.0, 1.0);
    }

    pub fn set_flash_mode(&mut self, mode: FlashMode) {
        self.config.flash_mode = mode;
    }

    pub fn set_auto_focus(&mut self, enabled: bool) {
        self.config.auto_focus = enabled;
    }

    pub fn set_orientation(&mut self, orientation: Orientation) {
        self.config.orientation = orientation;
    }

    pub fn session_lost(&mut self) {
        self.streaming = false;
    }

    /// Rebuilds the repeating request from the current config and
    /// resubmits it.
    pub fn refresh(&mut self, active: ActiveSession<'_>) -> Result<(), CameraError> {
        let request = request_builder::preview_request(
            &self.config,
            active.characteristics,
            active.targets.repeating_roles(),
        );
        active.session.set_repeating(&request)?;
        self.streaming = true;
        Ok(())
    }

    /// Issues the one-shot request that starts an autofocus lock sweep.
    pub fn lock_focus(&mut self, active: ActiveSession<'_>) -> Result<(), CameraError> {
        let request = request_builder::focus_trigger_request(
            &self.config,
            active.characteristics,
            active.targets.repeating_roles(),
        );
        active.session.capture(&request)?;
        Ok(())
    }

    /// Issues the one-shot request that starts an auto-exposure precapture
    /// sweep.
    pub fn run_precapture(&mut self, active: ActiveSession<'_>) -> Result<(), CameraError> {
        let request = request_builder::precapture_request(
            &self.config,
            active.characteristics,
            active.targets.repeating_roles(),
        );
        active.session.capture(&request)?;
        Ok(())
    }

    /// Cancels any held focus lock, then restores the plain repeating
    /// request.
    pub fn unlock_focus(&mut self, active: ActiveSession<'_>) -> Result<(), CameraError> {
        if self.config.auto_focus && active.characteristics.has_auto_focus {
            let cancel = request_builder::focus_cancel_request(
                &self.config,
                active.characteristics,
                active.targets.repeating_roles(),
            );
            active.session.capture(&cancel)?;
        }
        self.refresh(active)
    }
}

impl SessionObserver for PreviewController {
    fn on_configured(&mut self, active: ActiveSession<'_>) {
        if let Err(e) = self.refresh(active) {
            warn!("failed to start repeating request: {}", e);
        }
    }

    fn on_configure_failed(&mut self) {
        self.streaming = false;
    }

    fn on_capture_state_changed(&mut self, state: FocusCaptureState, active: ActiveSession<'_>) {
        // Trigger submission faults leave convergence to the frame stream;
        // the capture either completes off a later frame or the caller
        // aborts it. Logged, not escalated.
        let outcome = match state {
            FocusCaptureState::WaitingFocusLock => self.lock_focus(active),
            FocusCaptureState::Precapture => self.run_precapture(active),
            FocusCaptureState::ReleasingFocus => self.unlock_focus(active),
            _ => Ok(()),
        };
        if let Err(e) = outcome {
            warn!("focus sequence request failed in {:?}: {}", state, e);
        }
    }
}
