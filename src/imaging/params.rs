//! Parameter types for image operations.
//!
//! These types describe *what* to do, not *how* to do it. They are the
//! interface between the [`operations`](super::operations) module (which plans
//! a transform) and the [`backend`](super::backend) (which does the pixel
//! work).
//!
//! ## Types
//!
//! - [`Quality`]: Lossy encoding quality in `[0, 1]`, default 0.8. Clamped on construction.
//! - [`ResizeRule`]: How output dimensions are derived from the source.
//! - [`OutputFormat`]: The three formats the encoder produces.
//! - [`FormatChoice`]: What the user asked for; may defer to the source format.
//! - [`EncodeParams`]: Effective per-format encoder settings (see [`resolve_encode_params`]).
//! - [`TransformConfig`]: The snapshot a job is processed with.

use crate::types::MediaType;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Quality setting for lossy image encoding, `0.0..=1.0`.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(from = "f32", into = "f32")]
pub struct Quality(f32);

impl Quality {
    pub const DEFAULT: f32 = 0.8;

    /// Clamp into `[0, 1]`. NaN falls back to the default.
    pub fn new(value: f32) -> Self {
        if value.is_nan() {
            return Self(Self::DEFAULT);
        }
        Self(value.clamp(0.0, 1.0))
    }

    pub fn value(self) -> f32 {
        self.0
    }

    /// Quality on the 0–100 scale most encoders expect.
    pub fn percent(self) -> u8 {
        (self.0 * 100.0).round() as u8
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self(Self::DEFAULT)
    }
}

impl From<f32> for Quality {
    fn from(value: f32) -> Self {
        Self::new(value)
    }
}

impl From<Quality> for f32 {
    fn from(quality: Quality) -> Self {
        quality.0
    }
}

/// How to derive output dimensions from the source dimensions.
///
/// See [`resolve_dimensions`](super::calculations::resolve_dimensions) for the
/// exact math.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum ResizeRule {
    /// Keep the source dimensions.
    #[default]
    None,
    /// Scale both axes by `scale`, `0 < scale <= 1`.
    Percentage { scale: f64 },
    /// Fixed target width and/or height.
    Dimensions {
        width: Option<u32>,
        height: Option<u32>,
        preserve_aspect: bool,
    },
}

/// Encoded output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Webp,
    Jpeg,
    Png,
}

impl OutputFormat {
    /// Canonical file extension, without the dot.
    pub fn extension(self) -> &'static str {
        match self {
            Self::Webp => "webp",
            Self::Jpeg => "jpg",
            Self::Png => "png",
        }
    }

    /// PNG is lossless: the quality control has no effect on it.
    pub fn honors_quality(self) -> bool {
        !matches!(self, Self::Png)
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Webp => "WebP",
            Self::Jpeg => "JPEG",
            Self::Png => "PNG",
        })
    }
}

/// The output format as chosen by the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FormatChoice {
    #[default]
    Webp,
    Jpeg,
    Png,
    /// Keep the source's format where the encoder supports it.
    Original,
}

impl FormatChoice {
    /// The format every source gets, or `None` for `Original`.
    pub fn fixed(self) -> Option<OutputFormat> {
        match self {
            Self::Webp => Some(OutputFormat::Webp),
            Self::Jpeg => Some(OutputFormat::Jpeg),
            Self::Png => Some(OutputFormat::Png),
            Self::Original => None,
        }
    }

    /// Resolve against the source's declared media type.
    ///
    /// `Original` keeps JPEG, PNG and WebP sources as they are. Vector sources
    /// have no raster format to keep and are rasterized to PNG, as are raster
    /// formats the encoder cannot write.
    pub fn resolve(self, source: &MediaType) -> OutputFormat {
        self.fixed().unwrap_or(match source {
            MediaType::Jpeg => OutputFormat::Jpeg,
            MediaType::Webp => OutputFormat::Webp,
            _ => OutputFormat::Png,
        })
    }
}

impl From<OutputFormat> for FormatChoice {
    fn from(format: OutputFormat) -> Self {
        match format {
            OutputFormat::Webp => Self::Webp,
            OutputFormat::Jpeg => Self::Jpeg,
            OutputFormat::Png => Self::Png,
        }
    }
}

/// Effective encoder parameters for one output.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EncodeParams {
    Webp { quality: Quality },
    Jpeg { quality: Quality },
    /// Lossless; there is no quality to carry.
    Png,
}

impl EncodeParams {
    pub fn format(&self) -> OutputFormat {
        match self {
            Self::Webp { .. } => OutputFormat::Webp,
            Self::Jpeg { .. } => OutputFormat::Jpeg,
            Self::Png => OutputFormat::Png,
        }
    }

    pub fn quality(&self) -> Option<Quality> {
        match self {
            Self::Webp { quality } | Self::Jpeg { quality } => Some(*quality),
            Self::Png => None,
        }
    }
}

/// Map a requested format and quality to encoder parameters.
///
/// PNG drops the quality entirely; lossy formats get it re-clamped even
/// though [`Quality`] is already bounded, so a hand-built value cannot leak
/// out of range.
pub fn resolve_encode_params(format: OutputFormat, quality: Quality) -> EncodeParams {
    let quality = Quality::new(quality.value());
    match format {
        OutputFormat::Webp => EncodeParams::Webp { quality },
        OutputFormat::Jpeg => EncodeParams::Jpeg { quality },
        OutputFormat::Png => EncodeParams::Png,
    }
}

/// Everything a job needs to know about how to transform its source.
///
/// Captured by value when files are enqueued; later edits to the caller's
/// copy never reach jobs already in the queue.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct TransformConfig {
    pub resize: ResizeRule,
    pub format: FormatChoice,
    pub quality: Quality,
}
