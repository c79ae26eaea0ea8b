use crossbeam_channel::Sender;

use crate::models::capture_result::StillImage;
use crate::models::error::CameraError;
use crate::models::metadata::FrameMetadata;
use crate::models::request::{CaptureRequest, RequestId, TargetSurface};
use crate::session::controller::ControlMessage;

/// Handle a hardware binding uses to report device-level events.
///
/// Cheap to clone. Events are marshaled onto the controller worker; the
/// worker discards events whose originating open cycle has been
/// superseded, so a binding may report from any thread without worrying
/// about teardown races.
#[derive(Clone)]
pub struct DeviceEvents {
    pub(crate) tx: Sender<ControlMessage>,
    pub(crate) generation: u64,
}

impl DeviceEvents {
    /// The device dropped off the bus.
    pub fn disconnected(&self) {
        let _ = self.tx.send(ControlMessage::DeviceLost {
            generation: self.generation,
        });
    }

    /// The device hit an unrecoverable fault.
    pub fn device_error(&self, reason: impl Into<String>) {
        let _ = self.tx.send(ControlMessage::DeviceFault {
            generation: self.generation,
            reason: reason.into(),
        });
    }
}

/// Handle a hardware binding uses to report session-level events.
///
/// Same delivery contract as [`DeviceEvents`]: cloneable, thread-safe,
/// stale generations dropped by the worker.
#[derive(Clone)]
pub struct SessionEvents {
    pub(crate) tx: Sender<ControlMessage>,
    pub(crate) generation: u64,
}

impl SessionEvents {
    /// Session configuration finished; hand over the session handle.
    pub fn configured(&self, session: Box<dyn CameraSession>) {
        let _ = self.tx.send(ControlMessage::SessionConfigured {
            generation: self.generation,
            session,
        });
    }

    /// Session configuration failed.
    pub fn configure_failed(&self) {
        let _ = self.tx.send(ControlMessage::SessionConfigureFailed {
            generation: self.generation,
        });
    }

    /// One frame of any request completed with the given metadata.
    pub fn frame_result(&self, metadata: FrameMetadata) {
        let _ = self.tx.send(ControlMessage::Frame {
            generation: self.generation,
            metadata,
        });
    }

    /// A submitted still request produced its encoded payload.
    pub fn capture_completed(&self, request: RequestId, image: StillImage) {
        let _ = self.tx.send(ControlMessage::CaptureCompleted {
            generation: self.generation,
            request,
            image,
        });
    }

    /// A submitted still request failed at the hardware layer.
    pub fn capture_failed(&self, request: RequestId, reason: impl Into<String>) {
        let _ = self.tx.send(ControlMessage::CaptureFailed {
            generation: self.generation,
            request,
            reason: reason.into(),
        });
    }
}

/// Factory for camera devices.
///
/// Implemented by hardware bindings (and by the virtual backend used in
/// tests). The open call runs under the controller's device access guard
/// and must return synchronously; later device faults flow back through
/// the supplied [`DeviceEvents`] handle.
pub trait CameraBackend: Send + 'static {
    fn open(
        &mut self,
        device_id: &str,
        events: DeviceEvents,
    ) -> Result<Box<dyn CameraDevice>, CameraError>;
}

/// One open camera device.
pub trait CameraDevice: Send {
    /// Begins configuring a capture session over `targets`. Completion is
    /// asynchronous: the binding calls `configured` or `configure_failed`
    /// on `events` when the hardware answers.
    fn create_session(
        &mut self,
        targets: &[TargetSurface],
        events: SessionEvents,
    ) -> Result<(), CameraError>;

    /// Releases the device handle. Called at most once, after any sessions
    /// created from this device have been closed.
    fn close(&mut self) -> Result<(), CameraError>;
}

/// One configured capture session bound to a fixed target set.
pub trait CameraSession: Send {
    /// Installs or replaces the continuously repeating request.
    fn set_repeating(&mut self, request: &CaptureRequest) -> Result<(), CameraError>;

    /// Halts the repeating request without tearing the session down.
    fn stop_repeating(&mut self) -> Result<(), CameraError>;

    /// Submits a one-shot request. Per-frame metadata, and for still
    /// requests the completion payload, arrive on the session's event
    /// handle tagged with the returned id.
    fn capture(&mut self, request: &CaptureRequest) -> Result<RequestId, CameraError>;

    /// Drops all queued and in-flight one-shot requests.
    fn abort_captures(&mut self) -> Result<(), CameraError>;

    /// Tears the session down. After this returns the binding must not
    /// deliver further events for requests submitted against it.
    fn close(&mut self);
}
