use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::config::{FlashMode, Orientation};
use super::error::CameraError;

/// Encoded still payload handed over by the hardware binding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StillImage {
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

/// Descriptive metadata for one captured photo.
///
/// Serializable for the JSON sidecar written next to the image file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhotoMetadata {
    pub capture_id: String,
    pub captured_at: String,
    pub width: u32,
    pub height: u32,
    pub orientation_degrees: u16,
    pub flash_mode: FlashMode,
    pub zoom: f64,
    pub byte_size: u64,
}

impl PhotoMetadata {
    /// Creates metadata stamped with a fresh capture id and the current time.
    pub fn new(image: &StillImage, orientation: Orientation, flash_mode: FlashMode, zoom: f64) -> Self {
        Self {
            capture_id: uuid::Uuid::new_v4().to_string(),
            captured_at: chrono::Utc::now().to_rfc3339(),
            width: image.width,
            height: image.height,
            orientation_degrees: orientation.degrees(),
            flash_mode,
            zoom,
            byte_size: image.data.len() as u64,
        }
    }
}

/// Result delivered when a photo capture completes successfully.
#[derive(Debug, Clone, PartialEq)]
pub struct PhotoCaptureResult {
    pub destination: PathBuf,
    pub metadata: PhotoMetadata,
}

/// Completion callback for `capture_photo`.
pub type PhotoCallback = Box<dyn FnOnce(Result<PhotoCaptureResult, CameraError>) + Send + 'static>;

/// Completion callback for `start`.
pub type StartCallback = Box<dyn FnOnce(Result<(), CameraError>) + Send + 'static>;
