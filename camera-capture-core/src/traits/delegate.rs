use crate::models::capture_result::PhotoCaptureResult;
use crate::models::error::CameraError;
use crate::models::state::{FocusCaptureState, RunState};

/// Event delegate for controller notifications.
///
/// All methods are called from the controller worker thread, not the UI
/// thread. Implementations should marshal to the UI thread if needed.
pub trait CameraDelegate: Send + Sync {
    /// Called when the run lifecycle changes.
    fn on_run_state_changed(&self, state: RunState);

    /// Called when the per-capture focus/exposure machine advances.
    fn on_focus_state_changed(&self, state: FocusCaptureState);

    /// Called when an error occurs outside any per-call completion.
    fn on_error(&self, error: &CameraError);

    /// Called when a photo capture completes and its file is written.
    fn on_photo_captured(&self, result: &PhotoCaptureResult);
}
