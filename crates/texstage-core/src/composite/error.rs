//! Errors raised while building a single composite.

use thiserror::Error;

use crate::raster::SampleFormat;

/// Why one composite could not be produced. Never fatal to a job.
#[derive(Debug, Error)]
pub enum CompositeError {
    #[error("missing source channel: {which}")]
    MissingSourceChannel { which: String },

    #[error("channel size mismatch: expected {}x{}, found {}x{}", expected.0, expected.1, found.0, found.1)]
    ChannelSizeMismatch {
        expected: (u32, u32),
        found: (u32, u32),
    },

    #[error("degenerate input: maximum sample {max} cannot be scaled to 8 bits")]
    DegenerateInput { max: f64 },

    #[error("unsupported channel format: {0}")]
    UnsupportedChannelFormat(SampleFormat),

    #[error("unsupported colour type: {0:?}")]
    UnsupportedColorType(image::ColorType),
}
