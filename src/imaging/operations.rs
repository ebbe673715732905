//! High-level image operations.
//!
//! These functions combine calculations with backend execution. A transform
//! is one linear pipeline with no retries:
//!
//! ```text
//! decode → resolve geometry → resample → resolve encode params → encode → result
//! ```

use super::backend::{BackendError, ImageBackend};
use super::calculations::{resolve_dimensions, savings_ratio};
use super::params::{EncodeParams, OutputFormat, TransformConfig, resolve_encode_params};
use crate::naming::output_file_name;
use crate::types::SourceImage;
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransformError {
    #[error(transparent)]
    Backend(#[from] BackendError),
}

/// Result type for image operations.
pub type Result<T> = std::result::Result<T, TransformError>;

/// What a transform will produce, computed before any pixels are touched.
#[derive(Debug, Clone, PartialEq)]
pub struct TransformPlan {
    pub width: u32,
    pub height: u32,
    pub format: OutputFormat,
    pub params: EncodeParams,
    pub file_name: String,
}

/// A finished transform.
#[derive(Debug, Clone, PartialEq)]
pub struct TransformOutput {
    /// Encoded bytes, shared so exports and snapshots don't copy them.
    pub bytes: Arc<[u8]>,
    pub width: u32,
    pub height: u32,
    pub format: OutputFormat,
    pub file_name: String,
    /// `(source − output) / source`; negative when the output grew.
    pub savings_ratio: f64,
}

impl TransformOutput {
    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }
}

/// Plan a transform without executing it.
pub fn plan_transform(
    source_dims: (u32, u32),
    source: &SourceImage,
    config: &TransformConfig,
) -> TransformPlan {
    let (width, height) = resolve_dimensions(source_dims, &config.resize);
    let format = config.format.resolve(&source.media_type);

    TransformPlan {
        width,
        height,
        format,
        params: resolve_encode_params(format, config.quality),
        file_name: output_file_name(&source.file_name, format),
    }
}

/// Run one source through the full pipeline.
pub fn transform<B: ImageBackend + ?Sized>(
    backend: &B,
    source: &SourceImage,
    config: &TransformConfig,
) -> Result<TransformOutput> {
    let surface = backend.decode(&source.bytes, &source.media_type)?;
    let plan = plan_transform(surface.dimensions(), source, config);

    let surface = if surface.dimensions() == (plan.width, plan.height) {
        surface
    } else {
        backend.resample(surface, plan.width, plan.height)?
    };

    let bytes = backend.encode(&surface, &plan.params)?;
    let ratio = savings_ratio(source.size(), bytes.len() as u64);

    Ok(TransformOutput {
        bytes: bytes.into(),
        width: surface.width(),
        height: surface.height(),
        format: plan.format,
        file_name: plan.file_name,
        savings_ratio: ratio,
    })
}
