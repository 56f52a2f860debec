//! Conversion of any supported plane to an 8-bit channel.

use image::GrayImage;

use super::{Plane, Samples};
use crate::composite::CompositeError;

/// Converts a single plane to 8 bits per sample.
///
/// - `u8`: unchanged.
/// - `u16`: each sample divided by 256 (a fixed downscale, not a min/max stretch).
/// - `f32`/`f64`: scaled by `255 / max` and truncated; a max that is not a
///   positive finite number is [`CompositeError::DegenerateInput`].
/// - `i32`/`i64`: clamped to `0..=255`.
/// - anything else: [`CompositeError::UnsupportedChannelFormat`].
pub fn normalize(plane: &Plane) -> Result<GrayImage, CompositeError> {
    let data: Vec<u8> = match plane.samples() {
        Samples::U8(v) => v.clone(),
        Samples::U16(v) => v.iter().map(|&s| (s / 256) as u8).collect(),
        Samples::F32(v) => scale_to_u8(v.iter().map(|&s| f64::from(s)))?,
        Samples::F64(v) => scale_to_u8(v.iter().copied())?,
        Samples::I32(v) => v.iter().map(|&s| s.clamp(0, 255) as u8).collect(),
        Samples::I64(v) => v.iter().map(|&s| s.clamp(0, 255) as u8).collect(),
        other => return Err(CompositeError::UnsupportedChannelFormat(other.format())),
    };
    GrayImage::from_raw(plane.width(), plane.height(), data).ok_or(
        CompositeError::ChannelSizeMismatch {
            expected: plane.dimensions(),
            found: (plane.width(), 0),
        },
    )
}

fn scale_to_u8(samples: impl Iterator<Item = f64> + Clone) -> Result<Vec<u8>, CompositeError> {
    let max = samples.clone().fold(f64::NEG_INFINITY, f64::max);
    if !(max.is_finite() && max > 0.0) {
        return Err(CompositeError::DegenerateInput { max });
    }
    let factor = 255.0 / max;
    // `as` saturates: negatives and NaN become 0.
    Ok(samples.map(|s| (s * factor) as u8).collect())
}
