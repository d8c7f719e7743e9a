//! Folder listing and image decoding.

use std::path::{Path, PathBuf};

use image::{DynamicImage, GenericImageView};
use walkdir::WalkDir;

use crate::error::LabelkitError;

/// File extensions accepted as images (compared case-insensitively).
pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png"];

/// Order of a folder listing.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ListOrder {
    /// Whatever order the OS returns directory entries in.
    #[default]
    Directory,
    /// Sorted by file name.
    Sorted,
}

/// Returns true for paths with one of [`IMAGE_EXTENSIONS`].
pub fn is_image_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            IMAGE_EXTENSIONS
                .iter()
                .any(|known| ext.eq_ignore_ascii_case(known))
        })
        .unwrap_or(false)
}

/// Lists image file names directly inside `dir` (no recursion).
pub fn list_images(dir: &Path, order: ListOrder) -> Result<Vec<String>, LabelkitError> {
    if !dir.is_dir() {
        return Err(LabelkitError::ListDir {
            path: dir.to_path_buf(),
            message: "not a directory".to_string(),
        });
    }

    let mut names = Vec::new();
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1) {
        let entry = entry.map_err(|e| LabelkitError::ListDir {
            path: dir.to_path_buf(),
            message: e.to_string(),
        })?;
        if !entry.file_type().is_file() || !is_image_file(entry.path()) {
            continue;
        }
        names.push(entry.file_name().to_string_lossy().into_owned());
    }

    if order == ListOrder::Sorted {
        names.sort();
    }
    log::debug!("listed {} image(s) in {}", names.len(), dir.display());
    Ok(names)
}

/// Decodes an image into 8-bit RGB.
pub fn decode_image(path: &Path) -> Result<DynamicImage, LabelkitError> {
    let image = image::open(path).map_err(|source| LabelkitError::ImageDecode {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(DynamicImage::ImageRgb8(image.to_rgb8()))
}

/// The image currently shown, plus where it came from.
#[derive(Clone, Debug)]
pub struct LoadedImage {
    pub file_name: String,
    pub path: PathBuf,
    pub image: DynamicImage,
}

impl LoadedImage {
    pub fn open(dir: &Path, file_name: &str) -> Result<Self, LabelkitError> {
        let path = dir.join(file_name);
        let image = decode_image(&path)?;
        Ok(Self {
            file_name: file_name.to_string(),
            path,
            image,
        })
    }

    pub fn width(&self) -> f64 {
        self.image.width() as f64
    }

    pub fn height(&self) -> f64 {
        self.image.height() as f64
    }

    /// `(width, height)` in pixels.
    pub fn size(&self) -> (f64, f64) {
        let (w, h) = self.image.dimensions();
        (w as f64, h as f64)
    }
}
