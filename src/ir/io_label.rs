//! Label file reader and writer.
//!
//! A label file sits at `<label_dir>/<image stem>.txt` and holds one
//! [`LabelRecord`] per line. A zero-byte file is a valid, explicit "no
//! objects" marker; a missing file means the image has not been processed.

use std::fs;
use std::path::{Path, PathBuf};

use super::label::{denormalize, normalize, parse_label_line, LabelRecord};
use super::model::Annotation;
use crate::error::LabelkitError;

pub const LABEL_EXTENSION: &str = "txt";

/// Path of the label file belonging to `image_file_name`.
pub fn label_path_for(label_dir: &Path, image_file_name: &str) -> PathBuf {
    label_dir.join(Path::new(image_file_name).with_extension(LABEL_EXTENSION))
}

/// Renders the full label file content for an annotation set.
///
/// Nothing is written to disk here, so a caller can compute the content
/// before touching the filesystem.
pub fn to_label_string(
    annotations: &[Annotation],
    image_width: f64,
    image_height: f64,
) -> Result<String, LabelkitError> {
    let mut out = String::new();
    for ann in annotations {
        let record = normalize(ann, image_width, image_height)?;
        out.push_str(&record.to_string());
        out.push('\n');
    }
    Ok(out)
}

/// Writes a label file for an annotation set, creating the parent
/// directory if needed.
pub fn write_label_file(
    path: &Path,
    annotations: &[Annotation],
    image_width: f64,
    image_height: f64,
) -> Result<(), LabelkitError> {
    let content = to_label_string(annotations, image_width, image_height)?;
    write_label_content(path, &content)
}

/// Writes precomputed label content.
pub fn write_label_content(path: &Path, content: &str) -> Result<(), LabelkitError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|source| LabelkitError::SaveFailed {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    fs::write(path, content).map_err(|source| LabelkitError::SaveFailed {
        path: path.to_path_buf(),
        source,
    })
}

/// Parses every record of a label file.
pub fn read_label_file(path: &Path) -> Result<Vec<LabelRecord>, LabelkitError> {
    let content = fs::read_to_string(path).map_err(LabelkitError::Io)?;
    from_label_str(&content, path)
}

/// Parses label content; `path` is only used for error context.
pub fn from_label_str(content: &str, path: &Path) -> Result<Vec<LabelRecord>, LabelkitError> {
    let mut records = Vec::new();
    for (line_idx, line) in content.lines().enumerate() {
        if let Some(record) = parse_label_line(line, path, line_idx + 1)? {
            records.push(record);
        }
    }
    Ok(records)
}

/// Reads a label file and maps every record back into pixel space.
pub fn read_label_annotations(
    path: &Path,
    image_width: f64,
    image_height: f64,
) -> Result<Vec<Annotation>, LabelkitError> {
    read_label_file(path)?
        .iter()
        .map(|record| denormalize(record, image_width, image_height))
        .collect()
}
