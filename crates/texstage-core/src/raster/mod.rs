//! Planar rasters with per-plane sample representation.
//!
//! Colour planes are kept in interleave order: blue, green, red, then alpha.
//! Composite layouts address channels by that position, so plane 0 of a
//! decoded RGB map is its blue channel. Grey images keep luma (and alpha) as is.

mod normalize;

pub use normalize::normalize;

use anyhow::{Context, Result};
use image::{DynamicImage, ImageBuffer, ImageFormat};
use std::fmt;
use std::io::Cursor;
use std::path::Path;

use crate::composite::CompositeError;

/// Storage type of a plane's samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleFormat {
    U8,
    U16,
    U32,
    I16,
    I32,
    I64,
    F32,
    F64,
}

impl fmt::Display for SampleFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SampleFormat::U8 => "u8",
            SampleFormat::U16 => "u16",
            SampleFormat::U32 => "u32",
            SampleFormat::I16 => "i16",
            SampleFormat::I32 => "i32",
            SampleFormat::I64 => "i64",
            SampleFormat::F32 => "f32",
            SampleFormat::F64 => "f64",
        };
        f.write_str(s)
    }
}

/// Row-major samples of one channel.
#[derive(Debug, Clone, PartialEq)]
pub enum Samples {
    U8(Vec<u8>),
    U16(Vec<u16>),
    U32(Vec<u32>),
    I16(Vec<i16>),
    I32(Vec<i32>),
    I64(Vec<i64>),
    F32(Vec<f32>),
    F64(Vec<f64>),
}

impl Samples {
    pub fn format(&self) -> SampleFormat {
        match self {
            Samples::U8(_) => SampleFormat::U8,
            Samples::U16(_) => SampleFormat::U16,
            Samples::U32(_) => SampleFormat::U32,
            Samples::I16(_) => SampleFormat::I16,
            Samples::I32(_) => SampleFormat::I32,
            Samples::I64(_) => SampleFormat::I64,
            Samples::F32(_) => SampleFormat::F32,
            Samples::F64(_) => SampleFormat::F64,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Samples::U8(v) => v.len(),
            Samples::U16(v) => v.len(),
            Samples::U32(v) => v.len(),
            Samples::I16(v) => v.len(),
            Samples::I32(v) => v.len(),
            Samples::I64(v) => v.len(),
            Samples::F32(v) => v.len(),
            Samples::F64(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A single-channel raster.
#[derive(Debug, Clone, PartialEq)]
pub struct Plane {
    width: u32,
    height: u32,
    samples: Samples,
}

impl Plane {
    /// Returns None when the sample count does not match `width * height`.
    pub fn new(width: u32, height: u32, samples: Samples) -> Option<Self> {
        if samples.len() != width as usize * height as usize {
            return None;
        }
        Some(Self {
            width,
            height,
            samples,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn samples(&self) -> &Samples {
        &self.samples
    }

    pub fn format(&self) -> SampleFormat {
        self.samples.format()
    }
}

/// A decoded multi-channel image, one [`Plane`] per channel.
#[derive(Debug, Clone, PartialEq)]
pub struct Raster {
    width: u32,
    height: u32,
    planes: Vec<Plane>,
}

/// Maps interleave positions to file channel positions. Self-inverse.
fn channel_order(channels: usize) -> Option<&'static [usize]> {
    match channels {
        1 => Some(&[0]),
        2 => Some(&[0, 1]),
        3 => Some(&[2, 1, 0]),
        4 => Some(&[2, 1, 0, 3]),
        _ => None,
    }
}

fn split_planes<T: Copy>(
    width: u32,
    height: u32,
    raw: &[T],
    channels: usize,
    wrap: fn(Vec<T>) -> Samples,
) -> Vec<Plane> {
    let order = channel_order(channels).unwrap_or(&[]);
    order
        .iter()
        .map(|&c| Plane {
            width,
            height,
            samples: wrap(raw.iter().skip(c).step_by(channels).copied().collect()),
        })
        .collect()
}

impl Raster {
    /// Builds a raster from planes of identical dimensions.
    pub fn from_planes(planes: Vec<Plane>) -> Result<Self, CompositeError> {
        let first = planes
            .first()
            .ok_or_else(|| CompositeError::MissingSourceChannel {
                which: "plane 0".to_string(),
            })?;
        let (width, height) = first.dimensions();
        if let Some(odd) = planes.iter().find(|p| p.dimensions() != (width, height)) {
            return Err(CompositeError::ChannelSizeMismatch {
                expected: (width, height),
                found: odd.dimensions(),
            });
        }
        Ok(Self {
            width,
            height,
            planes,
        })
    }

    /// Splits a decoded image into planes (blue first for colour images).
    pub fn from_dynamic(img: DynamicImage) -> Result<Self, CompositeError> {
        let (w, h) = (img.width(), img.height());
        let planes = match img {
            DynamicImage::ImageLuma8(b) => split_planes(w, h, b.as_raw(), 1, Samples::U8),
            DynamicImage::ImageLumaA8(b) => split_planes(w, h, b.as_raw(), 2, Samples::U8),
            DynamicImage::ImageRgb8(b) => split_planes(w, h, b.as_raw(), 3, Samples::U8),
            DynamicImage::ImageRgba8(b) => split_planes(w, h, b.as_raw(), 4, Samples::U8),
            DynamicImage::ImageLuma16(b) => split_planes(w, h, b.as_raw(), 1, Samples::U16),
            DynamicImage::ImageLumaA16(b) => split_planes(w, h, b.as_raw(), 2, Samples::U16),
            DynamicImage::ImageRgb16(b) => split_planes(w, h, b.as_raw(), 3, Samples::U16),
            DynamicImage::ImageRgba16(b) => split_planes(w, h, b.as_raw(), 4, Samples::U16),
            DynamicImage::ImageRgb32F(b) => split_planes(w, h, b.as_raw(), 3, Samples::F32),
            DynamicImage::ImageRgba32F(b) => split_planes(w, h, b.as_raw(), 4, Samples::F32),
            other => return Err(CompositeError::UnsupportedColorType(other.color())),
        };
        Ok(Self {
            width: w,
            height: h,
            planes,
        })
    }

    /// Re-interleaves the planes into an image the encoder understands.
    ///
    /// All planes must share one of the formats `u8`, `u16`, or (for three or
    /// four planes) `f32`.
    pub fn to_dynamic(&self) -> Result<DynamicImage, CompositeError> {
        let (w, h) = (self.width, self.height);
        let n = self.planes.len();
        let first = self
            .planes
            .first()
            .ok_or_else(|| CompositeError::MissingSourceChannel {
                which: "plane 0".to_string(),
            })?;
        let mismatch = || CompositeError::ChannelSizeMismatch {
            expected: (w, h),
            found: first.dimensions(),
        };
        let img = match first.format() {
            SampleFormat::U8 => {
                let raw = self.interleave(|s| match s {
                    Samples::U8(v) => Some(v.as_slice()),
                    _ => None,
                })?;
                match n {
                    1 => ImageBuffer::from_raw(w, h, raw).map(DynamicImage::ImageLuma8),
                    2 => ImageBuffer::from_raw(w, h, raw).map(DynamicImage::ImageLumaA8),
                    3 => ImageBuffer::from_raw(w, h, raw).map(DynamicImage::ImageRgb8),
                    _ => ImageBuffer::from_raw(w, h, raw).map(DynamicImage::ImageRgba8),
                }
            }
            SampleFormat::U16 => {
                let raw = self.interleave(|s| match s {
                    Samples::U16(v) => Some(v.as_slice()),
                    _ => None,
                })?;
                match n {
                    1 => ImageBuffer::from_raw(w, h, raw).map(DynamicImage::ImageLuma16),
                    2 => ImageBuffer::from_raw(w, h, raw).map(DynamicImage::ImageLumaA16),
                    3 => ImageBuffer::from_raw(w, h, raw).map(DynamicImage::ImageRgb16),
                    _ => ImageBuffer::from_raw(w, h, raw).map(DynamicImage::ImageRgba16),
                }
            }
            SampleFormat::F32 if n >= 3 => {
                let raw = self.interleave(|s| match s {
                    Samples::F32(v) => Some(v.as_slice()),
                    _ => None,
                })?;
                match n {
                    3 => ImageBuffer::from_raw(w, h, raw).map(DynamicImage::ImageRgb32F),
                    _ => ImageBuffer::from_raw(w, h, raw).map(DynamicImage::ImageRgba32F),
                }
            }
            other => return Err(CompositeError::UnsupportedChannelFormat(other)),
        };
        img.ok_or_else(mismatch)
    }

    fn interleave<'a, T: Copy + 'a>(
        &'a self,
        pick: impl Fn(&'a Samples) -> Option<&'a [T]>,
    ) -> Result<Vec<T>, CompositeError> {
        let n = self.planes.len();
        let order = channel_order(n).ok_or(CompositeError::UnsupportedChannelFormat(
            self.planes[0].format(),
        ))?;
        let mut sources = Vec::with_capacity(n);
        for &idx in order {
            let plane = &self.planes[idx];
            if plane.dimensions() != (self.width, self.height) {
                return Err(CompositeError::ChannelSizeMismatch {
                    expected: (self.width, self.height),
                    found: plane.dimensions(),
                });
            }
            let samples =
                pick(&plane.samples).ok_or(CompositeError::UnsupportedChannelFormat(plane.format()))?;
            sources.push(samples);
        }
        let pixels = self.width as usize * self.height as usize;
        let mut raw = Vec::with_capacity(pixels * n);
        for i in 0..pixels {
            raw.extend(sources.iter().map(|s| s[i]));
        }
        Ok(raw)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn channel_count(&self) -> usize {
        self.planes.len()
    }

    /// Plane at interleave position `index` (0 = blue for colour images).
    pub fn plane(&self, index: usize) -> Option<&Plane> {
        self.planes.get(index)
    }

    pub fn planes(&self) -> &[Plane] {
        &self.planes
    }
}

/// Decodes an image file into a [`Raster`].
pub fn read_raster(path: &Path) -> Result<Raster> {
    let img = image::open(path).with_context(|| format!("decode {}", path.display()))?;
    Raster::from_dynamic(img).with_context(|| format!("split planes of {}", path.display()))
}

/// Decodes in-memory image bytes into a [`Raster`].
pub fn decode_raster(bytes: &[u8]) -> Result<Raster> {
    let img = image::load_from_memory(bytes).context("decode image bytes")?;
    Ok(Raster::from_dynamic(img)?)
}

/// Encodes an image as PNG.
pub fn encode_png(img: &DynamicImage) -> Result<Vec<u8>> {
    let mut buf = Cursor::new(Vec::new());
    img.write_to(&mut buf, ImageFormat::Png).context("encode png")?;
    Ok(buf.into_inner())
}
