//! An inference engine that replays recorded responses.
//!
//! The replay file is JSON:
//!
//! ```json
//! { "name": "detector", "responses": [ [ {"class_id": 0, "confidence": 0.9,
//!   "type": "bbox", "bbox": {"xmin": 1, "ymin": 2, "xmax": 30, "ymax": 40}} ] ] }
//! ```
//!
//! Each `infer` call consumes the next response; once they run out every
//! call returns nothing.

use std::collections::VecDeque;
use std::fs;
use std::path::Path;

use image::DynamicImage;
use serde::Deserialize;

use super::{InferenceEngine, RawDetection};
use crate::error::LabelkitError;

#[derive(Debug, Deserialize)]
struct ReplayFile {
    #[serde(default)]
    name: Option<String>,
    responses: Vec<Vec<RawDetection>>,
}

/// Plays back recorded model output in call order.
#[derive(Clone, Debug)]
pub struct ReplayEngine {
    name: String,
    responses: VecDeque<Vec<RawDetection>>,
}

impl ReplayEngine {
    pub fn new(name: impl Into<String>, responses: Vec<Vec<RawDetection>>) -> Self {
        Self {
            name: name.into(),
            responses: responses.into(),
        }
    }

    /// Loads a replay file.
    pub fn from_path(path: &Path) -> Result<Self, LabelkitError> {
        let data = fs::read_to_string(path).map_err(LabelkitError::Io)?;
        let parsed: ReplayFile =
            serde_json::from_str(&data).map_err(|source| LabelkitError::ReplayParse {
                path: path.to_path_buf(),
                source,
            })?;
        let name = parsed.name.unwrap_or_else(|| {
            path.file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| "replay".to_string())
        });
        Ok(Self::new(name, parsed.responses))
    }

    /// Responses not yet consumed.
    pub fn remaining(&self) -> usize {
        self.responses.len()
    }
}

impl InferenceEngine for ReplayEngine {
    fn infer(
        &mut self,
        _image: &DynamicImage,
        confidence: f64,
    ) -> Result<Vec<RawDetection>, LabelkitError> {
        let mut response = self.responses.pop_front().unwrap_or_default();
        response.retain(|det| det.confidence >= confidence);
        Ok(response)
    }

    fn name(&self) -> &str {
        &self.name
    }
}
