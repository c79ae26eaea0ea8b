//! # camera-capture-virtual
//!
//! Scripted virtual camera backend for camera-capture-kit.
//!
//! Provides:
//! - `VirtualCameraBackend` — in-process backend over registered devices
//! - `VirtualDeviceProfile` — script for convergence timing and sensor data
//! - `VirtualDeviceHandle` — fault injection and request inspection for tests
//!
//! Devices synthesize the full event stream a hardware binding would:
//! per-frame metadata while previewing, staged focus and exposure
//! convergence after triggers, and a still payload one frame after a
//! still request. Used by the integration tests and as a development
//! stand-in where no camera hardware is present.
//!
//! ## Usage
//! ```ignore
//! use camera_capture_core::{CameraController, ControllerOptions};
//! use camera_capture_virtual::{VirtualCameraBackend, VirtualDeviceProfile};
//!
//! let mut backend = VirtualCameraBackend::new();
//! let handle = backend.add_device("cam0", VirtualDeviceProfile::default());
//! let controller =
//!     CameraController::new(Box::new(backend), ControllerOptions::default()).unwrap();
//! ```

pub mod backend;
pub mod device;
pub mod profile;

pub use backend::{VirtualCameraBackend, VirtualDeviceHandle};
pub use device::{VirtualDevice, VirtualSession};
pub use profile::{AeBehavior, VirtualDeviceProfile};
