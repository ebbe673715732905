//! Image processing: everything between source bytes and output bytes.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Decode** | `image::load_from_memory`, `resvg` for SVG |
//! | **Resample** | Lanczos3 via `image::DynamicImage::resize_exact` |
//! | **Encode** | `image` JPEG/PNG encoders, `webp` for lossy WebP |
//!
//! The module is split into:
//! - **Calculations**: Pure functions for dimension math (unit testable)
//! - **Parameters**: Data structures describing a transform
//! - **Backend**: [`ImageBackend`] trait + [`RustBackend`]
//! - **Operations**: High-level functions combining calculations + backend

pub mod backend;
mod calculations;
pub mod operations;
mod params;
pub mod rust_backend;

pub use backend::{BackendError, ImageBackend, Surface};
pub use calculations::{resolve_dimensions, savings_ratio};
pub use operations::{
    TransformError, TransformOutput, TransformPlan, plan_transform, transform,
};
pub use params::{
    EncodeParams, FormatChoice, OutputFormat, Quality, ResizeRule, TransformConfig,
    resolve_encode_params,
};
pub use rust_backend::{RustBackend, supported_input_extensions};
