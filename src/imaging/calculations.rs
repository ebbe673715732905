//! Pure calculation functions for image dimensions.
//!
//! All functions here are pure and testable without any I/O or images.

use super::params::ResizeRule;

/// Resolve output dimensions for a source of `source` = (width, height).
///
/// Both outputs are rounded to the nearest integer and floored at 1.
///
/// | Rule | Output |
/// |---|---|
/// | `None` | source dimensions |
/// | `Percentage(s)` | `round(w·s) × round(h·s)` |
/// | `Dimensions`, aspect off | each axis: target if given, else source |
/// | `Dimensions`, width only | `w' × w'/(w/h)` |
/// | `Dimensions`, height only | `h'·(w/h) × h'` |
/// | `Dimensions`, both | fit inside the box, `min(w'/w, h'/h)` |
/// | `Dimensions`, neither | source dimensions |
///
/// A target of 0 counts as absent. Percentage scales outside `(0, 1]` are
/// clamped; non-finite or non-positive scales mean "no scaling".
///
/// # Examples
/// ```
/// use shrinkray::imaging::{ResizeRule, resolve_dimensions};
///
/// let rule = ResizeRule::Dimensions { width: Some(800), height: None, preserve_aspect: true };
/// assert_eq!(resolve_dimensions((1920, 1080), &rule), (800, 450));
/// ```
pub fn resolve_dimensions(source: (u32, u32), rule: &ResizeRule) -> (u32, u32) {
    let (src_w, src_h) = (source.0.max(1) as f64, source.1.max(1) as f64);

    let (out_w, out_h) = match *rule {
        ResizeRule::None => (src_w, src_h),
        ResizeRule::Percentage { scale } => {
            let scale = effective_scale(scale);
            (src_w * scale, src_h * scale)
        }
        ResizeRule::Dimensions {
            width,
            height,
            preserve_aspect,
        } => {
            let width = width.filter(|&w| w > 0).map(f64::from);
            let height = height.filter(|&h| h > 0).map(f64::from);
            let aspect = src_w / src_h;

            match (width, height, preserve_aspect) {
                (None, None, _) => (src_w, src_h),
                (w, h, false) => (w.unwrap_or(src_w), h.unwrap_or(src_h)),
                (Some(w), None, true) => (w, w / aspect),
                (None, Some(h), true) => (h * aspect, h),
                (Some(w), Some(h), true) => {
                    let factor = (w / src_w).min(h / src_h);
                    (src_w * factor, src_h * factor)
                }
            }
        }
    };

    (to_pixels(out_w), to_pixels(out_h))
}

fn effective_scale(scale: f64) -> f64 {
    if scale.is_finite() && scale > 0.0 {
        scale.min(1.0)
    } else {
        1.0
    }
}

fn to_pixels(value: f64) -> u32 {
    // `as` saturates, so absurd values land on u32::MAX rather than wrapping.
    (value.round() as u32).max(1)
}

/// Fractional change in byte size; negative when the output grew.
///
/// An empty source has nothing to save and reports 0.
pub fn savings_ratio(source_size: u64, output_size: u64) -> f64 {
    if source_size == 0 {
        return 0.0;
    }
    (source_size as f64 - output_size as f64) / source_size as f64
}
