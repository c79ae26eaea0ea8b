//! Digital zoom crop computation.

use crate::models::geometry::SensorRect;

/// Effective scale for a normalized factor: `zoom * (max_zoom - 1) + 1`.
///
/// Maps `[0, 1]` onto `[1, max_zoom]` linearly.
pub fn scaled_zoom(max_zoom: f64, zoom: f64) -> f64 {
    zoom * (max_zoom - 1.0) + 1.0
}

/// Computes the sensor crop rectangle for a normalized zoom factor.
///
/// The rectangle shrinks symmetrically around the sensor center, with
/// integer truncation on the scaled dimensions and offsets.
///
/// When the effective scale is exactly 1.0 the native rectangle is
/// returned unchanged, field for field. Some pipelines freeze when handed
/// a recomputed full-sensor crop whose rounding differs from the native
/// rectangle, so the identity has to be bit-exact.
pub fn compute_crop(native: SensorRect, max_zoom: f64, zoom: f64) -> SensorRect {
    let scaled = scaled_zoom(max_zoom, zoom);
    if scaled == 1.0 {
        return native;
    }

    let width = native.width();
    let height = native.height();
    let zoomed_width = (f64::from(width) / scaled) as i32;
    let zoomed_height = (f64::from(height) / scaled) as i32;
    let width_offset = (width - zoomed_width) / 2;
    let height_offset = (height - zoomed_height) / 2;

    SensorRect::new(
        native.left + width_offset,
        native.top + height_offset,
        native.right - width_offset,
        native.bottom - height_offset,
    )
}
