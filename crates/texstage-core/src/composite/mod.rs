//! Packing of source map channels into engine-ready composite textures.
//!
//! Every composite is a four-channel image whose slots are numbered in
//! interleave order (0 = blue, 1 = green, 2 = red, 3 = alpha), matching the
//! plane order of [`Raster`]. A composite is built only when all of its source
//! roles are present; a composite that cannot be built is recorded as skipped
//! and never aborts the others.

mod error;
mod roles;

pub use error::CompositeError;
pub use roles::{asset_prefix, locate_source, RequiredFileSet, Role};

use image::imageops::{self, FilterType};
use image::{DynamicImage, GrayImage, RgbaImage};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::raster::{self, normalize, Raster};

/// How channels of differing pixel size are merged.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResizePolicy {
    /// Resize to the first channel's dimensions with linear interpolation.
    /// Approximate, not pixel exact.
    #[default]
    Linear,
    /// Never resize; differing sizes fail with [`CompositeError::ChannelSizeMismatch`].
    Strict,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct CompositeOptions {
    pub resize: ResizePolicy,
}

/// The fixed set of outputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompositeKind {
    /// arm ch0, arm ch1, mid grey, arm ch2.
    Param,
    /// normal ch0..ch2 with height in alpha.
    Nh,
    /// Diffuse map as decoded.
    Diffuse,
    /// diffuse ch0..ch2 with roughness (arm ch1) in alpha.
    DiffParam,
}

impl CompositeKind {
    pub const ALL: [CompositeKind; 4] = [
        CompositeKind::Param,
        CompositeKind::Nh,
        CompositeKind::Diffuse,
        CompositeKind::DiffParam,
    ];

    pub fn name(self) -> &'static str {
        match self {
            CompositeKind::Param => "param",
            CompositeKind::Nh => "nh",
            CompositeKind::Diffuse => "diffuse",
            CompositeKind::DiffParam => "diffparam",
        }
    }

    /// Output file name for an already normalized label stem.
    pub fn file_name(self, stem: &str) -> String {
        match self {
            CompositeKind::Param => format!("{}_param.png", stem),
            CompositeKind::Nh => format!("{}_nh.png", stem),
            CompositeKind::Diffuse => format!("{}.png", stem),
            CompositeKind::DiffParam => format!("{}_diffparam.png", stem),
        }
    }

    pub fn required_roles(self) -> &'static [Role] {
        match self {
            CompositeKind::Param => &[Role::Arm],
            CompositeKind::Nh => &[Role::Normal, Role::Height],
            CompositeKind::Diffuse => &[Role::Diffuse],
            CompositeKind::DiffParam => &[Role::Diffuse, Role::Arm],
        }
    }
}

impl fmt::Display for CompositeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Decoded source maps by role. Absent roles are `None`.
#[derive(Debug, Clone, Default)]
pub struct SourceSet {
    pub arm: Option<Raster>,
    pub normal: Option<Raster>,
    pub height: Option<Raster>,
    pub diffuse: Option<Raster>,
}

impl SourceSet {
    pub fn get(&self, role: Role) -> Option<&Raster> {
        match role {
            Role::Arm => self.arm.as_ref(),
            Role::Normal => self.normal.as_ref(),
            Role::Height => self.height.as_ref(),
            Role::Diffuse => self.diffuse.as_ref(),
        }
    }

    pub fn set(&mut self, role: Role, raster: Raster) {
        let slot = match role {
            Role::Arm => &mut self.arm,
            Role::Normal => &mut self.normal,
            Role::Height => &mut self.height,
            Role::Diffuse => &mut self.diffuse,
        };
        *slot = Some(raster);
    }

    pub fn is_empty(&self) -> bool {
        Role::ALL.iter().all(|r| self.get(*r).is_none())
    }
}

/// One built output.
#[derive(Debug, Clone)]
pub struct Composite {
    pub kind: CompositeKind,
    pub file_name: String,
    pub image: DynamicImage,
}

impl Composite {
    pub fn to_png(&self) -> anyhow::Result<Vec<u8>> {
        raster::encode_png(&self.image)
    }
}

#[derive(Debug)]
pub enum SkipReason {
    MissingRoles(Vec<Role>),
    Failed(CompositeError),
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::MissingRoles(roles) => {
                let names: Vec<&str> = roles.iter().map(|r| r.name()).collect();
                write!(f, "missing {} map", names.join(" and "))
            }
            SkipReason::Failed(e) => write!(f, "{}", e),
        }
    }
}

#[derive(Debug)]
pub struct SkippedComposite {
    pub kind: CompositeKind,
    pub reason: SkipReason,
}

/// Result of [`build_composites`]: the outputs that could be built and why the rest were not.
#[derive(Debug, Default)]
pub struct CompositeSet {
    pub composites: Vec<Composite>,
    pub skipped: Vec<SkippedComposite>,
}

impl CompositeSet {
    pub fn get(&self, kind: CompositeKind) -> Option<&Composite> {
        self.composites.iter().find(|c| c.kind == kind)
    }

    pub fn kinds(&self) -> Vec<CompositeKind> {
        self.composites.iter().map(|c| c.kind).collect()
    }
}

/// File stem for a label: lowercased with any `_result` marker removed.
pub fn output_stem(label: &str) -> String {
    label.to_lowercase().replace("_result", "")
}

/// Builds every composite whose sources are present.
pub fn build_composites(
    output_label: &str,
    sources: &SourceSet,
    options: &CompositeOptions,
) -> CompositeSet {
    let stem = output_stem(output_label);
    let mut set = CompositeSet::default();
    for kind in CompositeKind::ALL {
        let missing: Vec<Role> = kind
            .required_roles()
            .iter()
            .copied()
            .filter(|r| sources.get(*r).is_none())
            .collect();
        if !missing.is_empty() {
            let reason = SkipReason::MissingRoles(missing);
            if kind == CompositeKind::DiffParam {
                tracing::debug!(label = %stem, "skipping {} composite: {}", kind, reason);
            } else {
                tracing::info!(label = %stem, "skipping {} composite: {}", kind, reason);
            }
            set.skipped.push(SkippedComposite { kind, reason });
            continue;
        }
        match build_one(kind, sources, options) {
            Ok(image) => {
                let file_name = kind.file_name(&stem);
                tracing::debug!(file = %file_name, "built {} composite", kind);
                set.composites.push(Composite {
                    kind,
                    file_name,
                    image,
                });
            }
            Err(e) => {
                tracing::warn!(label = %stem, "{} composite failed: {}", kind, e);
                set.skipped.push(SkippedComposite {
                    kind,
                    reason: SkipReason::Failed(e),
                });
            }
        }
    }
    set
}

/// Where one output slot takes its samples from.
enum Channel<'a> {
    Plane {
        role: Role,
        raster: &'a Raster,
        index: usize,
    },
    Fill(u8),
}

fn source(sources: &SourceSet, role: Role) -> Result<&Raster, CompositeError> {
    sources
        .get(role)
        .ok_or_else(|| CompositeError::MissingSourceChannel {
            which: format!("{} map", role),
        })
}

fn plane(sources: &SourceSet, role: Role, index: usize) -> Result<Channel<'_>, CompositeError> {
    Ok(Channel::Plane {
        role,
        raster: source(sources, role)?,
        index,
    })
}

fn build_one(
    kind: CompositeKind,
    sources: &SourceSet,
    options: &CompositeOptions,
) -> Result<DynamicImage, CompositeError> {
    let channels = match kind {
        CompositeKind::Param => [
            plane(sources, Role::Arm, 0)?,
            plane(sources, Role::Arm, 1)?,
            Channel::Fill(128),
            plane(sources, Role::Arm, 2)?,
        ],
        CompositeKind::Nh => {
            let height = source(sources, Role::Height)?;
            // Grey maps (with or without alpha) carry height in plane 0.
            let height_index = if height.channel_count() < 3 { 0 } else { 2 };
            [
                plane(sources, Role::Normal, 0)?,
                plane(sources, Role::Normal, 1)?,
                plane(sources, Role::Normal, 2)?,
                plane(sources, Role::Height, height_index)?,
            ]
        }
        CompositeKind::Diffuse => return source(sources, Role::Diffuse)?.to_dynamic(),
        CompositeKind::DiffParam => [
            plane(sources, Role::Diffuse, 0)?,
            plane(sources, Role::Diffuse, 1)?,
            plane(sources, Role::Diffuse, 2)?,
            plane(sources, Role::Arm, 1)?,
        ],
    };
    pack(channels, options.resize).map(DynamicImage::ImageRgba8)
}

/// Normalizes, sizes and interleaves four slots. Slot 0 sets the reference size.
fn pack(channels: [Channel<'_>; 4], resize: ResizePolicy) -> Result<RgbaImage, CompositeError> {
    let mut reference: Option<(u32, u32)> = None;
    let mut resolved: Vec<Option<GrayImage>> = Vec::with_capacity(4);
    for ch in &channels {
        let Channel::Plane { role, raster, index } = ch else {
            resolved.push(None);
            continue;
        };
        let plane = raster
            .plane(*index)
            .ok_or_else(|| CompositeError::MissingSourceChannel {
                which: format!("{} channel {}", role, index),
            })?;
        let gray = normalize(plane)?;
        let gray = match reference {
            None => {
                reference = Some(gray.dimensions());
                gray
            }
            Some(dims) if gray.dimensions() == dims => gray,
            Some((w, h)) => match resize {
                ResizePolicy::Linear => {
                    tracing::debug!(
                        role = %role,
                        from = ?gray.dimensions(),
                        to = ?(w, h),
                        "resizing channel"
                    );
                    imageops::resize(&gray, w, h, FilterType::Triangle)
                }
                ResizePolicy::Strict => {
                    return Err(CompositeError::ChannelSizeMismatch {
                        expected: (w, h),
                        found: gray.dimensions(),
                    })
                }
            },
        };
        resolved.push(Some(gray));
    }
    let (w, h) = reference.ok_or_else(|| CompositeError::MissingSourceChannel {
        which: "reference channel".to_string(),
    })?;
    let slots: Vec<GrayImage> = channels
        .iter()
        .zip(resolved)
        .map(|(ch, gray)| match (ch, gray) {
            (_, Some(gray)) => gray,
            (Channel::Fill(v), None) => GrayImage::from_pixel(w, h, image::Luma([*v])),
            (Channel::Plane { .. }, None) => GrayImage::new(w, h),
        })
        .collect();
    interleave_bgra(&slots, (w, h))
}

/// Slots are blue, green, red, alpha; the output buffer is RGBA.
fn interleave_bgra(slots: &[GrayImage], (w, h): (u32, u32)) -> Result<RgbaImage, CompositeError> {
    if let Some(odd) = slots.iter().find(|s| s.dimensions() != (w, h)) {
        return Err(CompositeError::ChannelSizeMismatch {
            expected: (w, h),
            found: odd.dimensions(),
        });
    }
    let [b, g, r, a] = [&slots[0], &slots[1], &slots[2], &slots[3]].map(|s| s.as_raw());
    let mut raw = Vec::with_capacity(b.len() * 4);
    for i in 0..b.len() {
        raw.extend_from_slice(&[r[i], g[i], b[i], a[i]]);
    }
    RgbaImage::from_raw(w, h, raw).ok_or(CompositeError::ChannelSizeMismatch {
        expected: (w, h),
        found: (w, h),
    })
}
