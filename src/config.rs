//! Persisted settings and the class registry.
//!
//! Both live as JSON documents in one config directory
//! (`settings.json`, `classes.json`) and are rewritten wholesale on save.
//! Everything downstream treats them as read-only inputs.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::LabelkitError;
use crate::ir::ClassId;
use crate::pipeline::{
    Decimation, PipelineMode, PipelineOptions, ScoreFilter, DEFAULT_CONFIDENCE,
    DEFAULT_EXPAND_RATIO, DEFAULT_SEGMENT_CONFIDENCE,
};

pub const SETTINGS_FILE: &str = "settings.json";
pub const CLASSES_FILE: &str = "classes.json";

/// Fallback outline color for class ids missing from the registry.
pub const DEFAULT_CLASS_COLOR: &str = "#FF0000";

/// Folder paths, model paths, toggles and key bindings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub input_folder: PathBuf,
    pub output_img_folder: PathBuf,
    pub output_label_folder: PathBuf,
    pub delete_folder: PathBuf,
    /// Detector inference replay (JSON).
    pub model_path_detect: PathBuf,
    /// Segmenter inference replay (JSON), used on crops in dual mode.
    pub model_path_seg: PathBuf,
    /// Move the source image to the delete folder after a save.
    pub delete_mode: bool,
    /// Also move the source image to the delete folder on skip.
    pub move_skip: bool,
    pub keys_annotate: BTreeMap<String, String>,
    pub keys_control: BTreeMap<String, String>,
    pub pipeline: PipelineSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            input_folder: PathBuf::from("input"),
            output_img_folder: PathBuf::from("output/images"),
            output_label_folder: PathBuf::from("output/labels"),
            delete_folder: PathBuf::from("delete"),
            model_path_detect: PathBuf::from("models/detect.json"),
            model_path_seg: PathBuf::from("models/segment.json"),
            delete_mode: false,
            move_skip: false,
            keys_annotate: key_map(&[
                ("save_next", "s"),
                ("skip", "space"),
                ("delete", "Delete"),
                ("undo", "z"),
            ]),
            keys_control: key_map(&[
                ("save_next", "s"),
                ("prev", "a"),
                ("reject", "e"),
                ("delete", "t"),
                ("reset_view", "r"),
            ]),
            pipeline: PipelineSettings::default(),
        }
    }
}

fn key_map(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

impl Settings {
    /// Resolves relative folder paths against `base`.
    pub fn resolve_paths(&mut self, base: &Path) {
        for path in [
            &mut self.input_folder,
            &mut self.output_img_folder,
            &mut self.output_label_folder,
            &mut self.delete_folder,
            &mut self.model_path_detect,
            &mut self.model_path_seg,
        ] {
            if path.is_relative() {
                *path = base.join(&*path);
            }
        }
    }
}

/// Pipeline knobs as stored in `settings.json`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineSettings {
    pub dual_mode: bool,
    pub confidence: f64,
    pub segment_confidence: f64,
    pub expand_ratio: f64,
    pub decimate: bool,
    /// Enables the score filter when set.
    pub min_score: Option<f64>,
    pub max_masks: Option<usize>,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            dual_mode: false,
            confidence: DEFAULT_CONFIDENCE,
            segment_confidence: DEFAULT_SEGMENT_CONFIDENCE,
            expand_ratio: DEFAULT_EXPAND_RATIO,
            decimate: true,
            min_score: None,
            max_masks: None,
        }
    }
}

impl PipelineSettings {
    pub fn to_options(&self) -> PipelineOptions {
        let filter = match (self.min_score, self.max_masks) {
            (None, None) => None,
            (min_score, max_masks) => {
                let defaults = ScoreFilter::default();
                Some(ScoreFilter {
                    min_score: min_score.unwrap_or(defaults.min_score),
                    max_count: max_masks.unwrap_or(defaults.max_count),
                })
            }
        };
        PipelineOptions {
            mode: if self.dual_mode {
                PipelineMode::Dual
            } else {
                PipelineMode::Standard
            },
            confidence: self.confidence,
            segment_confidence: self.segment_confidence,
            expand_ratio: self.expand_ratio,
            decimation: self.decimate.then(Decimation::default),
            filter,
        }
    }
}

/// One entry of the class registry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassEntry {
    pub id: ClassId,
    pub name: String,
    #[serde(default = "default_color")]
    pub color: String,
}

fn default_color() -> String {
    DEFAULT_CLASS_COLOR.to_string()
}

/// Ordered list of classes. Annotations refer to entries by id only.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ClassRegistry {
    pub classes: Vec<ClassEntry>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ClassesDocument {
    List(Vec<ClassEntry>),
    Wrapped { classes: Vec<ClassEntry> },
}

impl<'de> Deserialize<'de> for ClassRegistry {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let classes = match ClassesDocument::deserialize(deserializer)? {
            ClassesDocument::List(classes) | ClassesDocument::Wrapped { classes } => classes,
        };
        Ok(Self { classes })
    }
}

#[derive(Serialize)]
struct DataYaml<'a> {
    nc: usize,
    names: BTreeMap<u32, &'a str>,
}

impl ClassRegistry {
    pub fn new(classes: Vec<ClassEntry>) -> Self {
        Self { classes }
    }

    pub fn get(&self, id: ClassId) -> Option<&ClassEntry> {
        self.classes.iter().find(|c| c.id == id)
    }

    pub fn contains(&self, id: ClassId) -> bool {
        self.get(id).is_some()
    }

    pub fn name_for(&self, id: ClassId) -> Option<&str> {
        self.get(id).map(|c| c.name.as_str())
    }

    /// Outline color for a class, [`DEFAULT_CLASS_COLOR`] when unknown.
    pub fn color_for(&self, id: ClassId) -> &str {
        self.get(id)
            .map(|c| c.color.as_str())
            .unwrap_or(DEFAULT_CLASS_COLOR)
    }

    /// Looks a class up by display name, falling back to class 0.
    pub fn id_for_name(&self, name: &str) -> ClassId {
        self.classes
            .iter()
            .find(|c| c.name == name)
            .map(|c| c.id)
            .unwrap_or_default()
    }

    /// Renders a YOLO `data.yaml` class section.
    pub fn to_data_yaml(&self) -> Result<String, serde_yaml::Error> {
        let names: BTreeMap<u32, &str> = self
            .classes
            .iter()
            .map(|c| (c.id.as_u32(), c.name.as_str()))
            .collect();
        serde_yaml::to_string(&DataYaml {
            nc: names.len(),
            names,
        })
    }
}

/// Settings plus class registry, as loaded from one config directory.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AppConfig {
    pub settings: Settings,
    pub classes: ClassRegistry,
}

impl AppConfig {
    /// Loads `settings.json` and `classes.json` from `dir`.
    ///
    /// A missing settings file yields defaults; a missing classes file an
    /// empty registry. Relative folder paths are resolved against `dir`.
    pub fn load(dir: &Path) -> Result<Self, LabelkitError> {
        let settings_path = dir.join(SETTINGS_FILE);
        let mut settings: Settings = if settings_path.is_file() {
            read_json(&settings_path)?
        } else {
            log::warn!(
                "{} not found, using default settings",
                settings_path.display()
            );
            Settings::default()
        };
        settings.resolve_paths(dir);

        let classes_path = dir.join(CLASSES_FILE);
        let classes = if classes_path.is_file() {
            read_json(&classes_path)?
        } else {
            log::warn!("{} not found, class registry is empty", classes_path.display());
            ClassRegistry::default()
        };

        log::debug!(
            "loaded config from {} ({} classes)",
            dir.display(),
            classes.classes.len()
        );
        Ok(Self { settings, classes })
    }
}

fn read_json<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<T, LabelkitError> {
    let data = fs::read_to_string(path).map_err(LabelkitError::Io)?;
    serde_json::from_str(&data).map_err(|source| LabelkitError::ConfigParse {
        path: path.to_path_buf(),
        source,
    })
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), LabelkitError> {
    let json = serde_json::to_string_pretty(value).map_err(|source| LabelkitError::ConfigWrite {
        path: path.to_path_buf(),
        source,
    })?;
    fs::write(path, json).map_err(LabelkitError::Io)
}

/// Rewrites `settings.json` in `dir`.
pub fn save_settings(dir: &Path, settings: &Settings) -> Result<(), LabelkitError> {
    write_json(&dir.join(SETTINGS_FILE), settings)
}

/// Rewrites `classes.json` in `dir` as a bare array.
pub fn save_classes(dir: &Path, classes: &ClassRegistry) -> Result<(), LabelkitError> {
    write_json(&dir.join(CLASSES_FILE), classes)
}

/// Writes the registry as `data.yaml` at `path`.
pub fn write_data_yaml(path: &Path, classes: &ClassRegistry) -> Result<(), LabelkitError> {
    let yaml = classes
        .to_data_yaml()
        .map_err(|source| LabelkitError::DataYamlWrite {
            path: path.to_path_buf(),
            source,
        })?;
    fs::write(path, yaml).map_err(LabelkitError::Io)
}
