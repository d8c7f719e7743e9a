//! Annotation session state.
//!
//! A [`Session`] owns everything that changes while a user works through a
//! folder: the file list, the cursor, the decoded image, the [`Editor`] and
//! the last file action for undo. Geometry, normalization and the pipeline
//! stay stateless; the session passes them what they need.
//!
//! Every operation runs to completion before returning. File actions leave
//! the session untouched when they fail, so the user can retry.

mod editor;
mod listing;
mod storage;

pub use editor::{DrawMode, Editor, Tool};
pub use listing::{decode_image, is_image_file, list_images, ListOrder, LoadedImage, IMAGE_EXTENSIONS};
pub use storage::{
    delete_image, load_review, reject_image, review_list, save_image, skip_image, undo_action,
    FileAction, FileActionKind, FolderLayout,
};

use std::path::Path;

use crate::config::{AppConfig, ClassRegistry, Settings};
use crate::error::LabelkitError;
use crate::ir::Annotation;
use crate::pipeline::{Advisory, DetectionPipeline, PipelineReport, ReplayEngine};

/// Where the cursor ended up after a file action.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Progress {
    /// Another image is waiting.
    Next,
    /// The last image was handled.
    Finished,
}

/// Outcome of loading the image under the cursor.
#[derive(Clone, Debug, Default)]
pub struct LoadStatus {
    /// False when the file could not be decoded; the editor is then empty.
    pub loaded: bool,
    /// Non-fatal notes from decoding and inference.
    pub advisories: Vec<Advisory>,
    /// Present only when a pipeline ran.
    pub report: Option<PipelineReport>,
}

#[derive(Clone, Debug)]
struct UndoEntry {
    action: FileAction,
    index: usize,
}

/// Working state for one pass over the input folder.
pub struct Session {
    settings: Settings,
    classes: ClassRegistry,
    layout: FolderLayout,
    files: Vec<String>,
    index: usize,
    current: Option<LoadedImage>,
    editor: Editor,
    last_action: Option<UndoEntry>,
}

impl Session {
    /// Opens a session over the configured input folder.
    pub fn open(config: AppConfig, order: ListOrder, mode: DrawMode) -> Result<Self, LabelkitError> {
        let layout = FolderLayout::from_settings(&config.settings);
        let files = list_images(&layout.input, order)?;
        log::info!(
            "session opened on {} with {} image(s)",
            layout.input.display(),
            files.len()
        );
        Ok(Self {
            settings: config.settings,
            classes: config.classes,
            layout,
            files,
            index: 0,
            current: None,
            editor: Editor::new(mode),
            last_action: None,
        })
    }

    /// Settings the session was opened with.
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Toggles such as `delete_mode` take effect on the next file action.
    pub fn settings_mut(&mut self) -> &mut Settings {
        &mut self.settings
    }

    pub fn classes(&self) -> &ClassRegistry {
        &self.classes
    }

    /// Resolved input, output and delete folders.
    pub fn layout(&self) -> &FolderLayout {
        &self.layout
    }

    /// Image file names still in the input folder, in listing order.
    pub fn files(&self) -> &[String] {
        &self.files
    }

    /// Cursor into [`Session::files`]; equals its length once every image
    /// has been handled.
    pub fn index(&self) -> usize {
        self.index
    }

    /// File name under the cursor, `None` once everything is processed.
    pub fn current_file(&self) -> Option<&str> {
        self.files.get(self.index).map(String::as_str)
    }

    /// The decoded image, if [`Session::load_current`] succeeded.
    pub fn current(&self) -> Option<&LoadedImage> {
        self.current.as_ref()
    }

    pub fn editor(&self) -> &Editor {
        &self.editor
    }

    pub fn editor_mut(&mut self) -> &mut Editor {
        &mut self.editor
    }

    /// Status text for the cursor position.
    pub fn status(&self) -> String {
        match self.current_file() {
            Some(name) => format!("{}/{}: {}", self.index + 1, self.files.len(), name),
            None => "All images processed".to_string(),
        }
    }

    /// Picks the active class by registry name (class 0 if unknown).
    pub fn set_active_class_by_name(&mut self, name: &str) {
        let id = self.classes.id_for_name(name);
        self.editor.set_active_class(id);
    }

    /// Decodes the image under the cursor and seeds the editor.
    ///
    /// A decode failure is not an error: the editor is emptied, an advisory
    /// is returned and nothing on disk changes.
    pub fn load_current(&mut self, pipeline: Option<&mut DetectionPipeline>) -> LoadStatus {
        self.current = None;
        self.editor.unload();

        let Some(name) = self.current_file().map(str::to_string) else {
            return LoadStatus::default();
        };

        let loaded = match LoadedImage::open(&self.layout.input, &name) {
            Ok(loaded) => loaded,
            Err(err) => {
                let advisory = Advisory::image_unreadable(&name, &err);
                log::warn!("{}", advisory.message);
                return LoadStatus {
                    loaded: false,
                    advisories: vec![advisory],
                    report: None,
                };
            }
        };

        let (w, h) = loaded.size();
        let mut status = LoadStatus {
            loaded: true,
            ..Default::default()
        };
        let annotations = match pipeline {
            Some(pipeline) => {
                let output = pipeline.run(&loaded.image);
                status.advisories = output.report.advisories.clone();
                status.report = Some(output.report.clone());
                output.into_annotations()
            }
            None => Vec::new(),
        };
        self.editor.reset(w, h, annotations);
        self.current = Some(loaded);
        status
    }

    /// Replaces the editor content for the loaded image.
    pub fn set_annotations(&mut self, annotations: Vec<Annotation>) -> Result<(), LabelkitError> {
        let (w, h) = self
            .current
            .as_ref()
            .map(LoadedImage::size)
            .ok_or(LabelkitError::NoCurrentImage)?;
        self.editor.reset(w, h, annotations);
        Ok(())
    }

    /// Moves the cursor to a file by name.
    pub fn select(&mut self, file_name: &str) -> Result<(), LabelkitError> {
        let idx = self
            .files
            .iter()
            .position(|f| f == file_name)
            .ok_or_else(|| LabelkitError::UnknownImage(file_name.to_string()))?;
        self.go_to(idx);
        Ok(())
    }

    /// Steps forward. Returns false at the end of the list.
    pub fn next(&mut self) -> bool {
        if self.index + 1 >= self.files.len() {
            return false;
        }
        self.go_to(self.index + 1);
        true
    }

    /// Steps back. Returns false at the start of the list.
    pub fn prev(&mut self) -> bool {
        if self.index == 0 || self.files.is_empty() {
            return false;
        }
        self.go_to((self.index - 1).min(self.files.len() - 1));
        true
    }

    fn go_to(&mut self, idx: usize) {
        self.index = idx;
        self.current = None;
        self.editor.unload();
    }

    /// Saves the loaded image with the editor's annotations.
    pub fn save(&mut self) -> Result<Progress, LabelkitError> {
        let loaded = self.current.as_ref().ok_or(LabelkitError::NoCurrentImage)?;
        let (w, h) = loaded.size();
        let action = save_image(
            &self.layout,
            &loaded.file_name,
            self.editor.annotations(),
            w,
            h,
            self.settings.delete_mode,
        )?;
        Ok(self.complete(action))
    }

    /// Saves the loaded image as containing no objects.
    pub fn save_empty(&mut self) -> Result<Progress, LabelkitError> {
        let loaded = self.current.as_ref().ok_or(LabelkitError::NoCurrentImage)?;
        let (w, h) = loaded.size();
        let action = save_image(
            &self.layout,
            &loaded.file_name,
            &[],
            w,
            h,
            self.settings.delete_mode,
        )?;
        Ok(self.complete(action))
    }

    /// Leaves the image unlabeled and moves on.
    pub fn skip(&mut self) -> Result<Progress, LabelkitError> {
        let name = self.current_file().ok_or(LabelkitError::NoCurrentImage)?;
        let action = skip_image(&self.layout, name, self.settings.move_skip)?;
        Ok(self.complete(action))
    }

    /// Moves the image to the delete folder and moves on.
    pub fn delete(&mut self) -> Result<Progress, LabelkitError> {
        let name = self.current_file().ok_or(LabelkitError::NoCurrentImage)?;
        let action = delete_image(&self.layout, name)?;
        Ok(self.complete(action))
    }

    fn complete(&mut self, action: FileAction) -> Progress {
        let index = self.index;
        if action.moved_source() {
            self.files.remove(index);
        } else {
            self.index += 1;
        }
        self.last_action = Some(UndoEntry { action, index });
        self.current = None;
        self.editor.unload();

        if self.index < self.files.len() {
            Progress::Next
        } else {
            log::info!("all images processed");
            Progress::Finished
        }
    }

    /// Reverts the last save, skip or delete.
    ///
    /// Returns `Ok(false)` when there is nothing to undo.
    pub fn undo(&mut self) -> Result<bool, LabelkitError> {
        let Some(entry) = self.last_action.take() else {
            return Ok(false);
        };
        if let Err(err) = undo_action(&entry.action) {
            self.last_action = Some(entry);
            return Err(err);
        }
        let index = entry.index.min(self.files.len());
        if entry.action.moved_source() {
            self.files.insert(index, entry.action.file_name);
        }
        self.go_to(index);
        Ok(true)
    }

    /// True when a file action can be undone.
    pub fn can_undo(&self) -> bool {
        self.last_action.is_some()
    }
}

/// Builds a pipeline from the configured model paths.
///
/// Model files are inference replays; a path that does not exist or fails
/// to load leaves that model unavailable and the pipeline reports it on
/// every run.
pub fn pipeline_from_settings(settings: &Settings) -> DetectionPipeline {
    let mut pipeline = DetectionPipeline::new(settings.pipeline.to_options());
    if let Some(engine) = load_engine(&settings.model_path_detect) {
        pipeline = pipeline.with_detector(Box::new(engine));
    }
    if let Some(engine) = load_engine(&settings.model_path_seg) {
        pipeline = pipeline.with_segmenter(Box::new(engine));
    }
    pipeline
}

fn load_engine(path: &Path) -> Option<ReplayEngine> {
    if !path.is_file() {
        log::debug!("no model at {}", path.display());
        return None;
    }
    match ReplayEngine::from_path(path) {
        Ok(engine) => Some(engine),
        Err(err) => {
            log::warn!("could not load model {}: {err}", path.display());
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Projection;
    use crate::ir::Coord;
    use crate::pipeline::AdvisoryKind;
    use std::fs;

    fn session(root: &Path, names: &[&str], delete_mode: bool) -> Session {
        let mut settings = Settings::default();
        settings.delete_mode = delete_mode;
        settings.resolve_paths(root);
        fs::create_dir_all(&settings.input_folder).unwrap();
        for name in names {
            image::RgbImage::new(20, 10)
                .save(settings.input_folder.join(name))
                .unwrap();
        }
        let config = AppConfig {
            settings,
            classes: ClassRegistry::default(),
        };
        Session::open(config, ListOrder::Sorted, DrawMode::Both).unwrap()
    }

    #[test]
    fn navigation_stops_at_both_ends() {
        let temp = tempfile::tempdir().expect("create temp dir");
        let mut s = session(temp.path(), &["a.png", "b.png"], false);
        assert!(!s.prev());
        assert!(s.next());
        assert_eq!(s.current_file(), Some("b.png"));
        assert!(!s.next());
    }

    #[test]
    fn save_advances_and_undo_reverts() {
        let temp = tempfile::tempdir().expect("create temp dir");
        let mut s = session(temp.path(), &["a.png", "b.png"], true);
        assert!(s.load_current(None).loaded);

        let proj = Projection::new(1.0, 0.0, 0.0).unwrap();
        s.editor_mut()
            .add_box(&proj, Coord::new(0.0, 0.0), Coord::new(10.0, 5.0));
        assert_eq!(s.save().unwrap(), Progress::Next);
        assert_eq!(s.files(), ["b.png"]);
        assert!(s.current().is_none());

        assert!(s.undo().unwrap());
        assert_eq!(s.files(), ["a.png", "b.png"]);
        assert_eq!(s.current_file(), Some("a.png"));
        assert!(!s.layout().label_path("a.png").exists());
        assert!(!s.undo().unwrap());
    }

    #[test]
    fn saving_last_image_finishes() {
        let temp = tempfile::tempdir().expect("create temp dir");
        let mut s = session(temp.path(), &["a.png"], false);
        s.load_current(None);
        assert_eq!(s.save_empty().unwrap(), Progress::Finished);
        assert_eq!(s.status(), "All images processed");
        assert_eq!(
            fs::metadata(s.layout().label_path("a.png")).unwrap().len(),
            0
        );
    }

    #[test]
    fn save_without_loaded_image_is_refused() {
        let temp = tempfile::tempdir().expect("create temp dir");
        let mut s = session(temp.path(), &["a.png"], false);
        assert!(matches!(s.save(), Err(LabelkitError::NoCurrentImage)));
    }

    #[test]
    fn undecodable_image_yields_advisory() {
        let temp = tempfile::tempdir().expect("create temp dir");
        let s = session(temp.path(), &[], false);
        fs::write(s.layout().input.join("broken.jpg"), b"garbage").unwrap();
        let mut s = Session::open(
            AppConfig {
                settings: s.settings().clone(),
                classes: ClassRegistry::default(),
            },
            ListOrder::Sorted,
            DrawMode::Both,
        )
        .unwrap();

        let status = s.load_current(None);
        assert!(!status.loaded);
        assert_eq!(status.advisories[0].kind, AdvisoryKind::ImageUnreadable);
        assert!(s.current().is_none());
        assert!(s.layout().input.join("broken.jpg").exists());
    }

    #[test]
    fn missing_models_leave_pipeline_advising() {
        let temp = tempfile::tempdir().expect("create temp dir");
        let mut s = session(temp.path(), &["a.png"], false);
        let mut pipeline = pipeline_from_settings(s.settings());
        let status = s.load_current(Some(&mut pipeline));
        assert!(status.loaded);
        assert!(s.editor().annotations().is_empty());
        assert_eq!(status.advisories[0].kind, AdvisoryKind::ModelUnavailable);
    }

    #[test]
    fn default_model_paths_load_replays() {
        let temp = tempfile::tempdir().expect("create temp dir");
        let mut s = session(temp.path(), &["a.png"], false);
        let detect = &s.settings().model_path_detect;
        assert_eq!(detect, &temp.path().join("models/detect.json"));
        fs::create_dir_all(detect.parent().unwrap()).unwrap();
        fs::write(
            detect,
            r#"{"responses": [[{"class_id": 0, "confidence": 0.9, "type": "bbox",
                "bbox": {"xmin": 2, "ymin": 2, "xmax": 12, "ymax": 8}}]]}"#,
        )
        .unwrap();

        let mut pipeline = pipeline_from_settings(s.settings());
        let status = s.load_current(Some(&mut pipeline));
        assert!(status.advisories.is_empty(), "{:?}", status.advisories);
        assert_eq!(s.editor().annotations().len(), 1);
    }

    #[test]
    fn delete_removes_from_list() {
        let temp = tempfile::tempdir().expect("create temp dir");
        let mut s = session(temp.path(), &["a.png", "b.png"], false);
        assert_eq!(s.delete().unwrap(), Progress::Next);
        assert_eq!(s.current_file(), Some("b.png"));
        assert!(s.layout().delete.join("a.png").exists());
    }
}
