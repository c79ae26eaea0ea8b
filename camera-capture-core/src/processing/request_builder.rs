//! Pure construction of hardware requests from configuration values.
//!
//! Every submission gets a freshly built request, so a one-shot trigger
//! can never leak onto the repeating stream.

use crate::models::characteristics::CameraCharacteristics;
use crate::models::config::{FlashMode, RequestConfig};
use crate::models::request::{
    AeMode, AfMode, AfTrigger, CaptureRequest, FlashUnitMode, PrecaptureTrigger, RequestTemplate,
    TargetRole,
};
use crate::processing::zoom;

/// Auto-exposure mode and flash unit drive, always produced as a pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExposureControls {
    pub ae_mode: AeMode,
    pub flash: FlashUnitMode,
}

/// Maps a caller-facing flash mode onto the AE mode / flash unit pair.
pub fn exposure_controls(mode: FlashMode) -> ExposureControls {
    match mode {
        FlashMode::On => ExposureControls {
            ae_mode: AeMode::OnAlwaysFlash,
            flash: FlashUnitMode::Off,
        },
        FlashMode::Auto => ExposureControls {
            ae_mode: AeMode::OnAutoFlash,
            flash: FlashUnitMode::Off,
        },
        FlashMode::Always => ExposureControls {
            ae_mode: AeMode::On,
            flash: FlashUnitMode::Torch,
        },
        FlashMode::None => ExposureControls {
            ae_mode: AeMode::On,
            flash: FlashUnitMode::Off,
        },
    }
}

/// Repeating request for the live preview stream.
pub fn preview_request(
    config: &RequestConfig,
    characteristics: &CameraCharacteristics,
    targets: Vec<TargetRole>,
) -> CaptureRequest {
    base_request(RequestTemplate::Preview, targets, config, characteristics)
}

/// One-shot request that starts an autofocus lock sweep.
pub fn focus_trigger_request(
    config: &RequestConfig,
    characteristics: &CameraCharacteristics,
    targets: Vec<TargetRole>,
) -> CaptureRequest {
    let mut request = base_request(RequestTemplate::Preview, targets, config, characteristics);
    request.af_trigger = AfTrigger::Start;
    request
}

/// One-shot request that cancels a held focus lock.
pub fn focus_cancel_request(
    config: &RequestConfig,
    characteristics: &CameraCharacteristics,
    targets: Vec<TargetRole>,
) -> CaptureRequest {
    let mut request = base_request(RequestTemplate::Preview, targets, config, characteristics);
    request.af_trigger = AfTrigger::Cancel;
    request
}

/// One-shot request that starts an auto-exposure precapture sweep.
pub fn precapture_request(
    config: &RequestConfig,
    characteristics: &CameraCharacteristics,
    targets: Vec<TargetRole>,
) -> CaptureRequest {
    let mut request = base_request(RequestTemplate::Preview, targets, config, characteristics);
    request.precapture_trigger = PrecaptureTrigger::Start;
    request
}

/// One-shot still request aimed at the still sink.
pub fn still_request(
    config: &RequestConfig,
    characteristics: &CameraCharacteristics,
) -> CaptureRequest {
    base_request(
        RequestTemplate::StillCapture,
        vec![TargetRole::Still],
        config,
        characteristics,
    )
}

fn base_request(
    template: RequestTemplate,
    targets: Vec<TargetRole>,
    config: &RequestConfig,
    characteristics: &CameraCharacteristics,
) -> CaptureRequest {
    // A flash mode staged before device selection is dropped here if the
    // selected device turns out to have no flash unit.
    let flash_mode = if characteristics.has_flash {
        config.flash_mode
    } else {
        FlashMode::None
    };
    let controls = exposure_controls(flash_mode);
    let af_capable = config.auto_focus && characteristics.has_auto_focus;

    CaptureRequest {
        template,
        targets,
        ae_mode: controls.ae_mode,
        flash: controls.flash,
        af_mode: if af_capable {
            AfMode::ContinuousPicture
        } else {
            AfMode::Off
        },
        af_trigger: AfTrigger::Idle,
        precapture_trigger: PrecaptureTrigger::Idle,
        crop_region: zoom::compute_crop(
            characteristics.active_array,
            characteristics.max_zoom,
            config.zoom,
        ),
        orientation: config.orientation,
    }
}
