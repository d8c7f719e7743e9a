//! Run report for the detection pipeline.
//!
//! Mirrors the shape of a conversion report: counts for what went in and
//! came out, plus advisory messages a UI can show in its status line.

use serde::Serialize;
use std::fmt;

use super::PipelineMode;
use crate::error::LabelkitError;

/// What happened during one pipeline run.
#[derive(Clone, Debug, Default, Serialize)]
pub struct PipelineReport {
    pub mode: PipelineMode,
    /// Raw detections returned by the detector.
    pub detections: usize,
    /// Detections dropped because their expanded crop had no area.
    pub skipped_crops: usize,
    /// Detections emitted as their original box because no mask came back.
    pub fallbacks: usize,
    /// Predictions dropped because clamping left them degenerate.
    pub degenerate: usize,
    /// Polygons reduced by index decimation.
    pub decimated: usize,
    /// Predictions removed by the score filter.
    pub filtered_out: usize,
    /// Predictions in the final output.
    pub emitted: usize,
    pub advisories: Vec<Advisory>,
}

impl PipelineReport {
    /// Empty report for a run in `mode`.
    pub fn new(mode: PipelineMode) -> Self {
        Self {
            mode,
            ..Default::default()
        }
    }

    /// Records an advisory and logs it.
    pub fn advise(&mut self, advisory: Advisory) {
        log::warn!("{}", advisory.message);
        self.advisories.push(advisory);
    }

    /// One-line summary suitable for a status bar.
    pub fn summary(&self) -> String {
        format!(
            "{:?} pipeline: {} detection(s), {} emitted, {} fallback(s)",
            self.mode, self.detections, self.emitted, self.fallbacks
        )
    }
}

impl fmt::Display for PipelineReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "  {}", self.summary())?;

        if self.skipped_crops > 0 || self.decimated > 0 || self.filtered_out > 0 {
            writeln!(
                f,
                "  {} empty crop(s), {} decimated polygon(s), {} filtered by score",
                self.skipped_crops, self.decimated, self.filtered_out
            )?;
        }
        if self.degenerate > 0 {
            writeln!(f, "  {} degenerate prediction(s) dropped", self.degenerate)?;
        }

        if !self.advisories.is_empty() {
            writeln!(f)?;
            writeln!(f, "Advisories ({}):", self.advisories.len())?;
            for advisory in &self.advisories {
                writeln!(f, "  - {}", advisory.message)?;
            }
        }

        Ok(())
    }
}

/// Kind of non-fatal condition met during a run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum AdvisoryKind {
    /// A collaborator needed by the mode is not loaded.
    ModelUnavailable,
    /// A collaborator returned an error.
    InferenceFailed,
    /// The image could not be decoded.
    ImageUnreadable,
}

/// A status message that never blocks manual annotation.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Advisory {
    pub kind: AdvisoryKind,
    pub message: String,
}

impl Advisory {
    pub fn model_unavailable(role: &str) -> Self {
        Self {
            kind: AdvisoryKind::ModelUnavailable,
            message: format!("{role} model not loaded; annotate manually"),
        }
    }

    pub fn inference_failed(engine: &str, err: &LabelkitError) -> Self {
        Self {
            kind: AdvisoryKind::InferenceFailed,
            message: format!("{engine} failed: {err}"),
        }
    }

    pub fn image_unreadable(file_name: &str, err: &LabelkitError) -> Self {
        Self {
            kind: AdvisoryKind::ImageUnreadable,
            message: format!("skipping {file_name}: {err}"),
        }
    }
}
