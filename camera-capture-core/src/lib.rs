//! # camera-capture-core
//!
//! Platform-agnostic camera capture core library.
//!
//! Provides capture request building, zoom crop math, focus and exposure
//! convergence, and session orchestration over a serialized worker.
//! Platform-specific backends (Android camera2, test doubles) implement
//! the `CameraBackend` trait family and plug into the generic
//! `CameraController`.
//!
//! ## Architecture
//!
//! ```text
//! camera-capture-core (this crate)
//! ├── traits/       ← CameraBackend, CameraDevice, CameraSession, CameraDelegate
//! ├── models/       ← CameraError, FocusCaptureState, RequestConfig, FrameMetadata, etc.
//! ├── processing/   ← capture request builder, zoom crop math
//! ├── device/       ← DeviceLock access guard, device open/close supervision
//! ├── session/      ← CameraController (serialized orchestrator), preview + still units
//! └── storage/      ← photo files with JSON metadata sidecars
//! ```

pub mod device;
pub mod models;
pub mod processing;
pub mod session;
pub mod storage;
pub mod traits;

#[cfg(test)]
pub(crate) mod test_support;

// Re-export key types at crate root for convenience.
pub use models::capture_result::{PhotoCaptureResult, PhotoMetadata, StillImage};
pub use models::characteristics::CameraCharacteristics;
pub use models::config::{ControllerOptions, FlashMode, Orientation, RequestConfig};
pub use models::error::{CameraError, CaptureFailureKind};
pub use models::geometry::{SensorRect, Size};
pub use models::metadata::{AeState, AfState, CaptureDiagnostics, FrameMetadata};
pub use models::request::{
    AeMode, AfMode, AfTrigger, CaptureRequest, FlashUnitMode, PrecaptureTrigger, RequestId,
    RequestTemplate, SurfaceId, TargetRole, TargetSet, TargetSurface,
};
pub use models::state::{FocusCaptureState, RunState};
pub use session::controller::CameraController;
pub use traits::backend::{CameraBackend, CameraDevice, CameraSession, DeviceEvents, SessionEvents};
pub use traits::delegate::CameraDelegate;
