//! Turning command-line paths into [`SourceImage`]s.
//!
//! Files named explicitly are taken as they are, whatever their extension;
//! the codec decides whether it can read them. Directories are walked
//! recursively and only files with a supported extension are picked up.
//! Hidden entries (leading `.`) are skipped. Results are sorted per
//! directory so runs are reproducible.

use crate::imaging::supported_input_extensions;
use crate::types::{MediaType, SourceImage};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::{DirEntry, WalkDir};

#[derive(Error, Debug)]
pub enum InputError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Directory walk error: {0}")]
    Walk(#[from] walkdir::Error),
    #[error("Input not found: {0}")]
    NotFound(PathBuf),
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry.depth() > 0 && entry.file_name().to_string_lossy().starts_with('.')
}

pub fn is_image(path: &Path) -> bool {
    if !path.is_file() {
        return false;
    }
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    supported_input_extensions().contains(&ext.as_str())
}

/// Expand `paths` into the list of image files to process, in order.
pub fn collect_inputs(paths: &[PathBuf]) -> Result<Vec<PathBuf>, InputError> {
    let mut files = Vec::new();
    for path in paths {
        if path.is_dir() {
            for entry in WalkDir::new(path)
                .sort_by_file_name()
                .into_iter()
                .filter_entry(|e| !is_hidden(e))
            {
                let entry = entry?;
                if is_image(entry.path()) {
                    files.push(entry.into_path());
                }
            }
        } else if path.is_file() {
            files.push(path.clone());
        } else {
            return Err(InputError::NotFound(path.clone()));
        }
    }
    Ok(files)
}

/// Read one file into memory.
pub fn read_source(path: &Path) -> Result<SourceImage, InputError> {
    let bytes = fs::read(path)?;
    let file_name = path
        .file_name()
        .map(|f| f.to_string_lossy().into_owned())
        .unwrap_or_default();
    Ok(SourceImage::new(
        bytes,
        MediaType::from_file_name(&file_name),
        file_name,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn touch(path: &Path) {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, b"x").unwrap();
    }

    #[test]
    fn walks_directories_for_supported_files() {
        let tmp = TempDir::new().unwrap();
        touch(&tmp.path().join("b.png"));
        touch(&tmp.path().join("a.JPG"));
        touch(&tmp.path().join("notes.txt"));
        touch(&tmp.path().join("nested/c.svg"));
        touch(&tmp.path().join(".cache/d.png"));
        touch(&tmp.path().join(".e.webp"));

        let files = collect_inputs(&[tmp.path().to_path_buf()]).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.strip_prefix(tmp.path()).unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.JPG", "b.png", "nested/c.svg"]);
    }

    #[test]
    fn explicit_files_are_kept_as_given() {
        let tmp = TempDir::new().unwrap();
        let odd = tmp.path().join("scan.heic");
        let png = tmp.path().join("a.png");
        touch(&odd);
        touch(&png);

        let files = collect_inputs(&[odd.clone(), png.clone()]).unwrap();
        assert_eq!(files, vec![odd, png]);
    }

    #[test]
    fn missing_input_is_error() {
        let tmp = TempDir::new().unwrap();
        let result = collect_inputs(&[tmp.path().join("nope.png")]);
        assert!(matches!(result, Err(InputError::NotFound(_))));
    }

    #[test]
    fn read_source_sets_name_and_type() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("Logo.SVG");
        fs::write(&path, b"<svg/>").unwrap();

        let source = read_source(&path).unwrap();
        assert_eq!(source.file_name, "Logo.SVG");
        assert_eq!(source.media_type, MediaType::Svg);
        assert_eq!(source.size(), 6);
    }
}
