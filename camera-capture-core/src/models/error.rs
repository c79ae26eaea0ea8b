use thiserror::Error;

/// Errors that can occur across the capture pipeline.
///
/// Host bindings map variants to their own error surface via [`CameraError::code`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CameraError {
    #[error("timed out waiting for exclusive device access")]
    DeviceLockTimeout,

    #[error("failed to open camera device: {0}")]
    DeviceOpenFailure(String),

    #[error("capture session configuration failed")]
    SessionConfigureFailure,

    #[error("still capture failed: {0}")]
    CaptureFailure(#[from] CaptureFailureKind),

    #[error("camera device disconnected")]
    DeviceDisconnected,

    #[error("invalid state: {0}")]
    InvalidState(String),
}

/// Reason an individual still capture failed.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CaptureFailureKind {
    #[error("i/o error: {0}")]
    Io(String),

    #[error("hardware error: {0}")]
    Hardware(String),

    #[error("capture aborted before completion")]
    Aborted,
}

impl CameraError {
    /// Stable taxonomy name, independent of the display message.
    pub fn code(&self) -> &'static str {
        match self {
            Self::DeviceLockTimeout => "DeviceLockTimeout",
            Self::DeviceOpenFailure(_) => "DeviceOpenFailure",
            Self::SessionConfigureFailure => "SessionConfigureFailure",
            Self::CaptureFailure(_) => "CaptureFailure",
            Self::DeviceDisconnected => "DeviceDisconnected",
            Self::InvalidState(_) => "InvalidState",
        }
    }
}
