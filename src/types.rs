//! Shared input types handed to the queue by callers.
//!
//! A [`SourceImage`] is everything the core knows about a user-supplied file:
//! the raw bytes, the media type the caller declared for it, and the name it
//! arrived with. No paths; the core never touches the filesystem.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Media type declared for a source file.
///
/// Parsed leniently from either a MIME string (`image/svg+xml`) or a file
/// extension (`svg`). Anything unrecognised is kept verbatim in
/// [`MediaType::Other`] so it can still be shown to the user; the backend
/// sniffs the actual bytes anyway.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    Jpeg,
    Png,
    Webp,
    Gif,
    Bmp,
    Tiff,
    Svg,
    Other(String),
}

impl MediaType {
    /// Parse a MIME type such as `image/jpeg`. Parameters (`; charset=...`)
    /// are ignored.
    pub fn from_mime(mime: &str) -> Self {
        let essence = mime
            .split(';')
            .next()
            .unwrap_or("")
            .trim()
            .to_ascii_lowercase();
        match essence.as_str() {
            "image/jpeg" | "image/jpg" | "image/pjpeg" => Self::Jpeg,
            "image/png" | "image/apng" => Self::Png,
            "image/webp" => Self::Webp,
            "image/gif" => Self::Gif,
            "image/bmp" | "image/x-ms-bmp" => Self::Bmp,
            "image/tiff" => Self::Tiff,
            "image/svg+xml" => Self::Svg,
            _ => Self::Other(essence),
        }
    }

    /// Parse a bare file extension (case-insensitive, leading dot optional).
    pub fn from_extension(ext: &str) -> Self {
        let ext = ext.trim_start_matches('.').to_ascii_lowercase();
        match ext.as_str() {
            "jpg" | "jpeg" | "jpe" | "jfif" => Self::Jpeg,
            "png" | "apng" => Self::Png,
            "webp" => Self::Webp,
            "gif" => Self::Gif,
            "bmp" => Self::Bmp,
            "tif" | "tiff" => Self::Tiff,
            "svg" => Self::Svg,
            _ => Self::Other(ext),
        }
    }

    /// Guess the media type from a file name's extension.
    pub fn from_file_name(name: &str) -> Self {
        match name.rsplit_once('.') {
            Some((stem, ext)) if !stem.is_empty() => Self::from_extension(ext),
            _ => Self::Other(String::new()),
        }
    }

    pub fn mime_type(&self) -> &str {
        match self {
            Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
            Self::Webp => "image/webp",
            Self::Gif => "image/gif",
            Self::Bmp => "image/bmp",
            Self::Tiff => "image/tiff",
            Self::Svg => "image/svg+xml",
            Self::Other(raw) => raw,
        }
    }

    /// Vector formats must be rasterized before any pixel work.
    pub fn is_vector(&self) -> bool {
        matches!(self, Self::Svg)
    }

    /// Whether the crate knows how to decode this type at all.
    pub fn is_supported(&self) -> bool {
        !matches!(self, Self::Other(_))
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mime_type())
    }
}

/// A user-supplied image waiting to be transformed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceImage {
    pub bytes: Vec<u8>,
    pub media_type: MediaType,
    pub file_name: String,
}

impl SourceImage {
    pub fn new(bytes: Vec<u8>, media_type: MediaType, file_name: impl Into<String>) -> Self {
        Self {
            bytes,
            media_type,
            file_name: file_name.into(),
        }
    }

    /// Size of the source in bytes, the baseline for the savings ratio.
    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }
}
