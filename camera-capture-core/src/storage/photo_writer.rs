//! Persists captured photos and their metadata sidecars.

use std::fs;
use std::path::{Path, PathBuf};

use log::debug;

use crate::models::capture_result::{PhotoCaptureResult, PhotoMetadata, StillImage};
use crate::models::config::RequestConfig;
use crate::models::error::{CameraError, CaptureFailureKind};

/// Path of the metadata sidecar written next to `destination`.
pub fn sidecar_path(destination: &Path) -> PathBuf {
    let mut name = destination.file_name().unwrap_or_default().to_os_string();
    name.push(".metadata.json");
    destination.with_file_name(name)
}

/// Writes the image bytes to `destination` and a JSON metadata sidecar
/// next to it. The destination must not already exist; existing files are
/// never overwritten.
pub fn write_photo(
    destination: &Path,
    image: &StillImage,
    config: &RequestConfig,
) -> Result<PhotoCaptureResult, CameraError> {
    if destination.exists() {
        return Err(io_error(format!(
            "destination already exists: {}",
            destination.display()
        )));
    }
    if let Some(parent) = destination.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .map_err(|e| io_error(format!("failed to create {}: {}", parent.display(), e)))?;
        }
    }

    fs::write(destination, &image.data)
        .map_err(|e| io_error(format!("failed to write {}: {}", destination.display(), e)))?;

    let metadata = PhotoMetadata::new(image, config.orientation, config.flash_mode, config.zoom);
    let sidecar = sidecar_path(destination);
    let json = serde_json::to_string_pretty(&metadata)
        .map_err(|e| io_error(format!("failed to encode metadata: {}", e)))?;
    fs::write(&sidecar, json)
        .map_err(|e| io_error(format!("failed to write {}: {}", sidecar.display(), e)))?;

    debug!(
        "wrote {} byte photo and sidecar {}",
        metadata.byte_size,
        sidecar.display()
    );
    Ok(PhotoCaptureResult {
        destination: destination.to_path_buf(),
        metadata,
    })
}

/// Reads back the metadata sidecar of a previously captured photo.
pub fn read_metadata(destination: &Path) -> Result<PhotoMetadata, CameraError> {
    let sidecar = sidecar_path(destination);
    let json = fs::read_to_string(&sidecar)
        .map_err(|e| io_error(format!("failed to read {}: {}", sidecar.display(), e)))?;
    serde_json::from_str(&json)
        .map_err(|e| io_error(format!("failed to decode {}: {}", sidecar.display(), e)))
}

fn io_error(message: String) -> CameraError {
    CameraError::CaptureFailure(CaptureFailureKind::Io(message))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::config::{FlashMode, Orientation};

    fn temp_file_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("camera_capture_test_{}", name))
    }

    fn test_image() -> StillImage {
        StillImage {
            data: vec![0x11; 256],
            width: 1600,
            height: 1200,
        }
    }

    #[test]
    fn photo_and_sidecar_round_trip() {
        let destination = temp_file_path("photo_writer_round_trip.jpg");
        fs::remove_file(&destination).ok();
        fs::remove_file(sidecar_path(&destination)).ok();

        let config = RequestConfig {
            flash_mode: FlashMode::Auto,
            zoom: 0.25,
            orientation: Orientation::Deg90,
            ..RequestConfig::default()
        };
        let result = write_photo(&destination, &test_image(), &config).unwrap();

        assert_eq!(fs::read(&destination).unwrap(), vec![0x11; 256]);
        assert_eq!(result.destination, destination);
        assert_eq!(result.metadata.byte_size, 256);
        assert_eq!(result.metadata.width, 1600);
        assert_eq!(result.metadata.height, 1200);

        let decoded = read_metadata(&destination).unwrap();
        assert_eq!(decoded, result.metadata);
        assert_eq!(decoded.flash_mode, FlashMode::Auto);
        assert_eq!(decoded.orientation_degrees, 90);

        fs::remove_file(&destination).ok();
        fs::remove_file(sidecar_path(&destination)).ok();
    }

    #[test]
    fn refuses_to_overwrite_existing_destination() {
        let destination = temp_file_path("photo_writer_existing.jpg");
        fs::write(&destination, b"occupied").unwrap();

        let result = write_photo(&destination, &test_image(), &RequestConfig::default());
        assert!(matches!(
            result,
            Err(CameraError::CaptureFailure(CaptureFailureKind::Io(_)))
        ));
        assert_eq!(fs::read(&destination).unwrap(), b"occupied");

        fs::remove_file(&destination).ok();
    }

    #[test]
    fn sidecar_name_extends_the_file_name() {
        let destination = PathBuf::from("/photos/holiday/img_0042.jpg");
        assert_eq!(
            sidecar_path(&destination),
            PathBuf::from("/photos/holiday/img_0042.jpg.metadata.json")
        );
    }

    #[test]
    fn creates_missing_parent_directories() {
        let root = temp_file_path("photo_writer_nested_dir");
        fs::remove_dir_all(&root).ok();
        let destination = root.join("a").join("b").join("photo.jpg");

        let result = write_photo(&destination, &test_image(), &RequestConfig::default());
        assert!(result.is_ok());
        assert!(destination.is_file());
        assert!(sidecar_path(&destination).is_file());

        fs::remove_dir_all(&root).ok();
    }
}
