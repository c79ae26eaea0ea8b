use crate::models::characteristics::CameraCharacteristics;
use crate::models::config::RequestConfig;
use crate::models::request::TargetSet;
use crate::models::state::FocusCaptureState;
use crate::traits::backend::CameraSession;

/// Borrowed view of the live session plus the inputs needed to build
/// requests against it. Valid only for the duration of one notification.
pub struct ActiveSession<'a> {
    pub session: &'a mut dyn CameraSession,
    pub targets: &'a TargetSet,
    pub characteristics: &'a CameraCharacteristics,
    pub config: RequestConfig,
}

/// Session lifecycle subscriber.
///
/// The controller notifies subscribers synchronously on the worker, in
/// registration order: the preview pipeline first, still capture second.
/// Ordering matters on focus release, where the repeating stream must be
/// restored before the capture result is delivered.
pub trait SessionObserver {
    /// A new session finished configuring and accepts requests.
    fn on_configured(&mut self, active: ActiveSession<'_>);

    /// Session configuration failed; no session exists until the next
    /// successful configure.
    fn on_configure_failed(&mut self);

    /// The focus/capture state machine advanced.
    fn on_capture_state_changed(&mut self, state: FocusCaptureState, active: ActiveSession<'_>);
}
