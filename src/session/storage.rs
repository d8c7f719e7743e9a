//! File-side effects: saving, skipping, deleting, rejecting and undoing.
//!
//! Label content is always computed before any file is touched. A failure
//! part way through removes what was already written, so an output image
//! never survives without its label.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use super::listing::{list_images, ListOrder, LoadedImage};
use crate::config::Settings;
use crate::error::LabelkitError;
use crate::ir::io_label::{label_path_for, read_label_annotations, to_label_string, write_label_content};
use crate::ir::Annotation;

/// The four folders an annotation session sorts images between.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FolderLayout {
    pub input: PathBuf,
    pub output_images: PathBuf,
    pub output_labels: PathBuf,
    pub delete: PathBuf,
}

impl FolderLayout {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            input: settings.input_folder.clone(),
            output_images: settings.output_img_folder.clone(),
            output_labels: settings.output_label_folder.clone(),
            delete: settings.delete_folder.clone(),
        }
    }

    /// Label file path for an image name.
    pub fn label_path(&self, file_name: &str) -> PathBuf {
        label_path_for(&self.output_labels, file_name)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FileActionKind {
    Saved,
    Skipped,
    Deleted,
}

/// A completed file action, with enough detail to reverse it once.
#[derive(Clone, Debug, PartialEq)]
pub struct FileAction {
    pub kind: FileActionKind,
    pub file_name: String,
    /// Files created by the action.
    pub written: Vec<PathBuf>,
    /// Source image move as `(from, to)`.
    pub moved: Option<(PathBuf, PathBuf)>,
}

impl FileAction {
    fn new(kind: FileActionKind, file_name: &str) -> Self {
        Self {
            kind,
            file_name: file_name.to_string(),
            written: Vec::new(),
            moved: None,
        }
    }

    /// True when the source image left the input folder.
    pub fn moved_source(&self) -> bool {
        self.moved.is_some()
    }
}

fn move_file(from: &Path, to: &Path) -> Result<(), LabelkitError> {
    let wrap = |source: io::Error| LabelkitError::MoveFailed {
        from: from.to_path_buf(),
        to: to.to_path_buf(),
        source,
    };
    if let Some(parent) = to.parent() {
        fs::create_dir_all(parent).map_err(wrap)?;
    }
    fs::rename(from, to).map_err(wrap)
}

fn remove_if_exists(path: &Path) -> io::Result<()> {
    match fs::remove_file(path) {
        Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
        _ => Ok(()),
    }
}

fn rollback(paths: &[PathBuf]) {
    for path in paths {
        if let Err(e) = remove_if_exists(path) {
            log::warn!("could not roll back {}: {e}", path.display());
        }
    }
}

/// Writes the label file, copies the image to the output folder and,
/// with `delete_mode`, moves the source image to the delete folder.
pub fn save_image(
    layout: &FolderLayout,
    file_name: &str,
    annotations: &[Annotation],
    image_width: f64,
    image_height: f64,
    delete_mode: bool,
) -> Result<FileAction, LabelkitError> {
    let content = to_label_string(annotations, image_width, image_height)?;

    let source = layout.input.join(file_name);
    let out_image = layout.output_images.join(file_name);
    let label = layout.label_path(file_name);

    fs::create_dir_all(&layout.output_images).map_err(|source| LabelkitError::SaveFailed {
        path: layout.output_images.clone(),
        source,
    })?;
    fs::copy(&source, &out_image).map_err(|source| LabelkitError::SaveFailed {
        path: out_image.clone(),
        source,
    })?;

    let mut action = FileAction::new(FileActionKind::Saved, file_name);
    action.written.push(out_image);

    if let Err(err) = write_label_content(&label, &content) {
        rollback(&action.written);
        return Err(err);
    }
    action.written.push(label);

    if delete_mode {
        let dest = layout.delete.join(file_name);
        if let Err(err) = move_file(&source, &dest) {
            rollback(&action.written);
            return Err(err);
        }
        action.moved = Some((source, dest));
    }

    log::info!(
        "saved {} with {} annotation(s)",
        file_name,
        annotations.len()
    );
    Ok(action)
}

/// Skips an image, moving it to the delete folder when `move_skip` is set.
pub fn skip_image(
    layout: &FolderLayout,
    file_name: &str,
    move_skip: bool,
) -> Result<FileAction, LabelkitError> {
    if move_skip {
        return move_to_delete(layout, file_name, FileActionKind::Skipped);
    }
    Ok(FileAction::new(FileActionKind::Skipped, file_name))
}

/// Moves an image to the delete folder without saving anything.
pub fn delete_image(layout: &FolderLayout, file_name: &str) -> Result<FileAction, LabelkitError> {
    move_to_delete(layout, file_name, FileActionKind::Deleted)
}

fn move_to_delete(
    layout: &FolderLayout,
    file_name: &str,
    kind: FileActionKind,
) -> Result<FileAction, LabelkitError> {
    let from = layout.input.join(file_name);
    let to = layout.delete.join(file_name);
    move_file(&from, &to)?;
    log::info!("moved {} to {}", file_name, layout.delete.display());
    let mut action = FileAction::new(kind, file_name);
    action.moved = Some((from, to));
    Ok(action)
}

/// Reverses a file action: the source image goes back, written files go.
pub fn undo_action(action: &FileAction) -> Result<(), LabelkitError> {
    if let Some((from, to)) = &action.moved {
        move_file(to, from)?;
    }
    for path in &action.written {
        remove_if_exists(path).map_err(|source| LabelkitError::SaveFailed {
            path: path.clone(),
            source,
        })?;
    }
    log::info!("undid {:?} of {}", action.kind, action.file_name);
    Ok(())
}

/// Images already saved to the output folder.
pub fn review_list(layout: &FolderLayout, order: ListOrder) -> Result<Vec<String>, LabelkitError> {
    list_images(&layout.output_images, order)
}

/// Loads a saved image with its labels mapped back into pixel space.
///
/// A missing label file yields no annotations.
pub fn load_review(
    layout: &FolderLayout,
    file_name: &str,
) -> Result<(LoadedImage, Vec<Annotation>), LabelkitError> {
    let loaded = LoadedImage::open(&layout.output_images, file_name)?;
    let label = layout.label_path(file_name);
    let annotations = if label.is_file() {
        let (w, h) = loaded.size();
        read_label_annotations(&label, w, h)?
    } else {
        Vec::new()
    };
    Ok((loaded, annotations))
}

/// Reverses a save from the review step: the output image moves back to
/// the input folder and its label file is removed.
///
/// Returns the image's new path.
pub fn reject_image(layout: &FolderLayout, file_name: &str) -> Result<PathBuf, LabelkitError> {
    let from = layout.output_images.join(file_name);
    if !from.is_file() {
        return Err(LabelkitError::NotInOutput {
            name: file_name.to_string(),
            dir: layout.output_images.clone(),
        });
    }
    let to = layout.input.join(file_name);
    move_file(&from, &to)?;

    let label = layout.label_path(file_name);
    remove_if_exists(&label).map_err(|source| LabelkitError::SaveFailed {
        path: label.clone(),
        source,
    })?;
    log::info!("rejected {}, returned to {}", file_name, layout.input.display());
    Ok(to)
}
