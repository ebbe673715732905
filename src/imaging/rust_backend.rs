//! Pure Rust image backend, plus libwebp for lossy WebP.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Decode (JPEG, PNG, WebP, GIF, BMP, TIFF) | `image::load_from_memory` (content-sniffed) |
//! | Decode (SVG) | `resvg` rasterization at intrinsic size |
//! | Resample | `image::DynamicImage::resize_exact` with `Lanczos3` |
//! | Encode → JPEG | `image::codecs::jpeg::JpegEncoder` |
//! | Encode → PNG | `image::codecs::png::PngEncoder` (lossless) |
//! | Encode → WebP | `webp::Encoder` (lossy, quality-driven) |

use super::backend::{BackendError, ImageBackend, Surface};
use super::params::{EncodeParams, Quality};
use crate::types::MediaType;
use image::imageops::FilterType;
use image::{DynamicImage, RgbaImage};
use resvg::{tiny_skia, usvg};

/// Extensions whose decoders are compiled in.
const SUPPORTED_EXTENSIONS: &[&str] = &[
    "jpg", "jpeg", "png", "webp", "gif", "bmp", "tif", "tiff", "svg",
];

/// Returns the set of image file extensions the backend can decode.
pub fn supported_input_extensions() -> &'static [&'static str] {
    SUPPORTED_EXTENSIONS
}

/// Default backend built on the `image` crate ecosystem.
///
/// See the [module docs](self) for the crate-to-operation mapping.
pub struct RustBackend;

impl RustBackend {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RustBackend {
    fn default() -> Self {
        Self::new()
    }
}

/// Rasterize an SVG document at its intrinsic size.
fn rasterize_svg(bytes: &[u8]) -> Result<DynamicImage, BackendError> {
    let tree = usvg::Tree::from_data(bytes, &usvg::Options::default())
        .map_err(|e| BackendError::Decode(format!("Failed to parse SVG: {e}")))?;
    let size = tree.size().to_int_size();
    let mut pixmap = tiny_skia::Pixmap::new(size.width(), size.height()).ok_or_else(|| {
        BackendError::Decode(format!(
            "Cannot allocate a {}x{} drawing surface",
            size.width(),
            size.height()
        ))
    })?;
    resvg::render(&tree, tiny_skia::Transform::default(), &mut pixmap.as_mut());

    // tiny-skia stores premultiplied alpha; the image crate expects straight.
    let rgba: Vec<u8> = pixmap
        .pixels()
        .iter()
        .flat_map(|p| {
            let c = p.demultiply();
            [c.red(), c.green(), c.blue(), c.alpha()]
        })
        .collect();

    RgbaImage::from_raw(size.width(), size.height(), rgba)
        .map(DynamicImage::ImageRgba8)
        .ok_or_else(|| BackendError::Decode("Rasterized SVG has an unexpected size".into()))
}

fn check_dimensions(surface: &Surface) -> Result<(), BackendError> {
    if surface.width() == 0 || surface.height() == 0 {
        return Err(BackendError::Encode(format!(
            "Cannot encode a {}x{} surface",
            surface.width(),
            surface.height()
        )));
    }
    Ok(())
}

fn encode_jpeg(img: &DynamicImage, quality: Quality) -> Result<Vec<u8>, BackendError> {
    let mut buf = Vec::new();
    let encoder =
        image::codecs::jpeg::JpegEncoder::new_with_quality(&mut buf, quality.percent().max(1));
    // JPEG has no alpha channel; flatten like a canvas export does.
    DynamicImage::ImageRgb8(img.to_rgb8())
        .write_with_encoder(encoder)
        .map_err(|e| BackendError::Encode(format!("JPEG encode failed: {e}")))?;
    Ok(buf)
}

fn encode_png(img: &DynamicImage) -> Result<Vec<u8>, BackendError> {
    let mut buf = Vec::new();
    let encoder = image::codecs::png::PngEncoder::new(&mut buf);
    img.write_with_encoder(encoder)
        .map_err(|e| BackendError::Encode(format!("PNG encode failed: {e}")))?;
    Ok(buf)
}

fn encode_webp(img: &DynamicImage, quality: Quality) -> Result<Vec<u8>, BackendError> {
    let (width, height) = (img.width(), img.height());
    let quality = quality.percent() as f32;
    // libwebp rejects sides over 16383 px; `encode_simple` reports that
    // instead of panicking.
    let result = if img.color().has_alpha() {
        let rgba = img.to_rgba8();
        webp::Encoder::from_rgba(rgba.as_raw(), width, height).encode_simple(false, quality)
    } else {
        let rgb = img.to_rgb8();
        webp::Encoder::from_rgb(rgb.as_raw(), width, height).encode_simple(false, quality)
    };
    let encoded =
        result.map_err(|e| BackendError::Encode(format!("WebP encode failed: {e:?}")))?;
    if encoded.is_empty() {
        return Err(BackendError::Encode("WebP encoder produced no data".into()));
    }
    Ok(encoded.to_vec())
}

impl ImageBackend for RustBackend {
    fn decode(&self, bytes: &[u8], media_type: &MediaType) -> Result<Surface, BackendError> {
        if media_type.is_vector() {
            return rasterize_svg(bytes).map(Surface::new);
        }
        image::load_from_memory(bytes)
            .map(Surface::new)
            .map_err(|e| BackendError::Decode(format!("Failed to decode {media_type}: {e}")))
    }

    fn resample(
        &self,
        surface: Surface,
        width: u32,
        height: u32,
    ) -> Result<Surface, BackendError> {
        if width == 0 || height == 0 {
            return Err(BackendError::Resample(format!(
                "Target size {width}x{height} has no area"
            )));
        }
        let resized = surface
            .image()
            .resize_exact(width, height, FilterType::Lanczos3);
        Ok(Surface::new(resized))
    }

    fn encode(&self, surface: &Surface, params: &EncodeParams) -> Result<Vec<u8>, BackendError> {
        check_dimensions(surface)?;
        match params {
            EncodeParams::Jpeg { quality } => encode_jpeg(surface.image(), *quality),
            EncodeParams::Png => encode_png(surface.image()),
            EncodeParams::Webp { quality } => encode_webp(surface.image(), *quality),
        }
    }
}
