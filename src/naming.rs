//! Output file naming.
//!
//! Every output keeps the source's stem and swaps the extension for the
//! canonical one of the encoded format:
//! - `holiday.JPG` → `holiday.webp`
//! - `scan.final.tiff` → `scan.final.png` (only the last extension is replaced)
//! - `README` → `README.jpg` (no extension: append)
//! - `.png` → `.png.webp` (a dotfile has no extension to replace)

use crate::imaging::OutputFormat;

const FALLBACK_STEM: &str = "image";

/// Build the output file name for `source_name` encoded as `format`.
///
/// Directory components are ignored; only the final path segment is used.
pub fn output_file_name(source_name: &str, format: OutputFormat) -> String {
    let base = source_name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(source_name)
        .trim();

    let stem = match base.rfind('.') {
        Some(dot) if dot > 0 => &base[..dot],
        _ => base,
    };
    let stem = if stem.is_empty() { FALLBACK_STEM } else { stem };

    format!("{stem}.{}", format.extension())
}
