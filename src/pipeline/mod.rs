//! Detection pipeline: turns model output into an initial annotation set.
//!
//! Two modes are supported:
//!
//! - **Standard**: one detector pass over the full image. Output geometry is
//!   already in image space.
//! - **Dual**: detect, grow each box by `expand_ratio`, crop, run the
//!   segmenter on the crop and translate its polygons back into image
//!   space. A detection whose crop yields no mask falls back to its
//!   original box, so every detection produces exactly one annotation
//!   (unless its crop has zero area).
//!
//! Output is clamped into the image; anything that collapses there (boxes
//! under [`MIN_BOX_SIZE`], flat polygons) is dropped and counted.
//!
//! Missing models and inference failures never fail the image load; they
//! produce an empty (or partial) result plus an [`Advisory`] in the
//! [`PipelineReport`].

mod replay;
mod report;

pub use replay::ReplayEngine;
pub use report::{Advisory, AdvisoryKind, PipelineReport};

use image::{DynamicImage, GenericImageView};
use serde::{Deserialize, Serialize};

use crate::error::LabelkitError;
use crate::geometry::MIN_BOX_SIZE;
use crate::ir::{Annotation, BBoxXYXY, ClassId, Coord, Pixel, MIN_POLYGON_VERTICES};

/// Default detector confidence threshold.
pub const DEFAULT_CONFIDENCE: f64 = 0.25;
/// Default segmenter confidence threshold for crops.
pub const DEFAULT_SEGMENT_CONFIDENCE: f64 = 0.20;
/// Default per-side box growth before cropping.
pub const DEFAULT_EXPAND_RATIO: f64 = 0.1;
/// Polygons with more vertices than this are decimated.
pub const DEFAULT_VERTEX_CAP: usize = 60;
/// Vertex count after decimation.
pub const DEFAULT_VERTEX_TARGET: usize = 50;

/// Geometry returned by an inference engine, in the coordinate space of the
/// image or crop it was given.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Geometry {
    #[serde(rename = "bbox")]
    Box { bbox: BBoxXYXY<Pixel> },
    Polygon { points: Vec<Coord<Pixel>> },
}

impl Geometry {
    /// Tight box around the geometry.
    pub fn bounds(&self) -> Option<BBoxXYXY<Pixel>> {
        match self {
            Geometry::Box { bbox } => Some(*bbox),
            Geometry::Polygon { points } => BBoxXYXY::enclosing(points),
        }
    }
}

/// One raw result from an inference engine.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RawDetection {
    pub class_id: ClassId,
    /// Model score in `[0, 1]`.
    pub confidence: f64,
    #[serde(flatten)]
    pub geometry: Geometry,
}

/// An opaque detector or segmenter.
///
/// Implementations run synchronously; the pipeline never retries or
/// batches.
pub trait InferenceEngine {
    /// Runs the model on `image` and returns detections at or above
    /// `confidence`, in `image`'s own coordinate space.
    fn infer(
        &mut self,
        image: &DynamicImage,
        confidence: f64,
    ) -> Result<Vec<RawDetection>, LabelkitError>;

    /// Short name used in log and status messages.
    fn name(&self) -> &str {
        "model"
    }
}

/// An annotation together with the score used for filtering.
///
/// Manually drawn annotations never pass through here; the score only
/// matters for model output.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Prediction {
    pub annotation: Annotation,
    /// Detector confidence; in dual mode polygons inherit it from their box.
    pub score: f64,
}

/// Which inference sequence to run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineMode {
    /// Detector only.
    #[default]
    Standard,
    /// Detector boxes refined by the segmenter on expanded crops.
    Dual,
}

/// Uniform index decimation for oversized polygons.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Decimation {
    /// Polygons with more vertices than this are reduced.
    pub cap: usize,
    /// Vertex count after reduction.
    pub target: usize,
}

impl Default for Decimation {
    fn default() -> Self {
        Self {
            cap: DEFAULT_VERTEX_CAP,
            target: DEFAULT_VERTEX_TARGET,
        }
    }
}

/// Post-generation score filter.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ScoreFilter {
    /// Predictions scoring below this are removed.
    pub min_score: f64,
    /// At most this many predictions survive, highest scores first.
    pub max_count: usize,
}

impl Default for ScoreFilter {
    fn default() -> Self {
        Self {
            min_score: 0.3,
            max_count: 20,
        }
    }
}

/// Knobs for one pipeline run.
#[derive(Clone, Debug, PartialEq)]
pub struct PipelineOptions {
    pub mode: PipelineMode,
    /// Detector threshold.
    pub confidence: f64,
    /// Segmenter threshold on crops.
    pub segment_confidence: f64,
    /// Fraction of a box's own size added on every side before cropping.
    pub expand_ratio: f64,
    /// `None` keeps every polygon vertex.
    pub decimation: Option<Decimation>,
    /// `None` keeps every prediction.
    pub filter: Option<ScoreFilter>,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            mode: PipelineMode::Standard,
            confidence: DEFAULT_CONFIDENCE,
            segment_confidence: DEFAULT_SEGMENT_CONFIDENCE,
            expand_ratio: DEFAULT_EXPAND_RATIO,
            decimation: Some(Decimation::default()),
            filter: None,
        }
    }
}

/// Predictions plus what happened while producing them.
#[derive(Clone, Debug, Default)]
pub struct PipelineOutput {
    pub predictions: Vec<Prediction>,
    pub report: PipelineReport,
}

impl PipelineOutput {
    /// Drops the scores, keeping only the annotations.
    pub fn into_annotations(self) -> Vec<Annotation> {
        self.predictions.into_iter().map(|p| p.annotation).collect()
    }
}

/// Holds the two optional collaborators and runs them per image.
pub struct DetectionPipeline {
    detector: Option<Box<dyn InferenceEngine>>,
    segmenter: Option<Box<dyn InferenceEngine>>,
    options: PipelineOptions,
}

impl DetectionPipeline {
    /// Creates a pipeline with no models attached.
    ///
    /// Running it without models is valid and only yields advisories.
    pub fn new(options: PipelineOptions) -> Self {
        Self {
            detector: None,
            segmenter: None,
            options,
        }
    }

    /// Attaches the full-image detector.
    pub fn with_detector(mut self, engine: Box<dyn InferenceEngine>) -> Self {
        self.detector = Some(engine);
        self
    }

    /// Attaches the segmenter used on crops in dual mode.
    pub fn with_segmenter(mut self, engine: Box<dyn InferenceEngine>) -> Self {
        self.segmenter = Some(engine);
        self
    }

    /// Current run options.
    pub fn options(&self) -> &PipelineOptions {
        &self.options
    }

    /// Options can change between images, e.g. toggling dual mode.
    pub fn options_mut(&mut self) -> &mut PipelineOptions {
        &mut self.options
    }

    /// Runs the configured mode on a decoded image.
    pub fn run(&mut self, image: &DynamicImage) -> PipelineOutput {
        let mut report = PipelineReport::new(self.options.mode);
        let (width, height) = image.dimensions();
        let (image_w, image_h) = (width as f64, height as f64);

        let mut predictions = match self.options.mode {
            PipelineMode::Standard => self.run_standard(image, &mut report),
            PipelineMode::Dual => self.run_dual(image, image_w, image_h, &mut report),
        };

        for pred in &mut predictions {
            pred.annotation = pred.annotation.clamped(image_w, image_h);
            if let Some(decimation) = self.options.decimation {
                if decimate_annotation(&mut pred.annotation, decimation) {
                    report.decimated += 1;
                }
            }
        }

        let before = predictions.len();
        predictions.retain(|pred| !pred.annotation.is_degenerate(MIN_BOX_SIZE));
        report.degenerate = before - predictions.len();
        if report.degenerate > 0 {
            log::debug!(
                "dropped {} prediction(s) that collapsed inside the image bounds",
                report.degenerate
            );
        }

        if let Some(filter) = self.options.filter {
            let before = predictions.len();
            predictions = filter_predictions(predictions, &filter);
            report.filtered_out = before - predictions.len();
        }

        report.emitted = predictions.len();
        log::info!("{}", report.summary());
        PipelineOutput {
            predictions,
            report,
        }
    }

    fn run_standard(
        &mut self,
        image: &DynamicImage,
        report: &mut PipelineReport,
    ) -> Vec<Prediction> {
        let Some(detector) = self.detector.as_mut() else {
            report.advise(Advisory::model_unavailable("detector"));
            return Vec::new();
        };

        let detections = match detector.infer(image, self.options.confidence) {
            Ok(detections) => detections,
            Err(err) => {
                report.advise(Advisory::inference_failed(detector.name(), &err));
                return Vec::new();
            }
        };
        report.detections = detections.len();

        detections
            .into_iter()
            .filter_map(|det| {
                let annotation = match det.geometry {
                    Geometry::Polygon { points } if points.len() >= MIN_POLYGON_VERTICES => {
                        Annotation::Polygon {
                            class_id: det.class_id,
                            points,
                        }
                    }
                    geometry => Annotation::bbox(det.class_id, geometry.bounds()?),
                };
                Some(Prediction {
                    annotation,
                    score: det.confidence,
                })
            })
            .collect()
    }

    fn run_dual(
        &mut self,
        image: &DynamicImage,
        image_w: f64,
        image_h: f64,
        report: &mut PipelineReport,
    ) -> Vec<Prediction> {
        if self.detector.is_none() {
            report.advise(Advisory::model_unavailable("detector"));
        }
        if self.segmenter.is_none() {
            report.advise(Advisory::model_unavailable("segmenter"));
        }
        let (Some(detector), Some(segmenter)) = (self.detector.as_mut(), self.segmenter.as_mut())
        else {
            return Vec::new();
        };

        let detections = match detector.infer(image, self.options.confidence) {
            Ok(detections) => detections,
            Err(err) => {
                report.advise(Advisory::inference_failed(detector.name(), &err));
                return Vec::new();
            }
        };
        report.detections = detections.len();

        let mut predictions = Vec::with_capacity(detections.len());
        for det in detections {
            let Some(original) = det.geometry.bounds() else {
                continue;
            };
            let expanded = original.expanded(self.options.expand_ratio, image_w, image_h);

            let Some(crop) = crop_region(image, &expanded) else {
                log::debug!("skipping detection with empty crop {:?}", expanded);
                report.skipped_crops += 1;
                continue;
            };

            let masks = match segmenter.infer(&crop, self.options.segment_confidence) {
                Ok(masks) => masks,
                Err(err) => {
                    report.advise(Advisory::inference_failed(segmenter.name(), &err));
                    Vec::new()
                }
            };

            let before = predictions.len();
            for mask in masks {
                let Geometry::Polygon { points } = mask.geometry else {
                    continue;
                };
                let translated = translate_from_crop(&points, &expanded);
                if let Some(annotation) = Annotation::polygon(det.class_id, translated) {
                    predictions.push(Prediction {
                        annotation,
                        score: det.confidence,
                    });
                }
            }

            if predictions.len() == before {
                report.fallbacks += 1;
                predictions.push(Prediction {
                    annotation: Annotation::bbox(det.class_id, original),
                    score: det.confidence,
                });
            }
        }
        predictions
    }
}

/// Crops the integer pixel region covered by `region`.
///
/// Returns `None` when the region has no whole pixel of area.
pub fn crop_region(image: &DynamicImage, region: &BBoxXYXY<Pixel>) -> Option<DynamicImage> {
    let (width, height) = image.dimensions();
    let x0 = region.xmin().max(0.0).floor() as u32;
    let y0 = region.ymin().max(0.0).floor() as u32;
    let x1 = (region.xmax().max(0.0).floor() as u32).min(width);
    let y1 = (region.ymax().max(0.0).floor() as u32).min(height);

    if x1 <= x0 || y1 <= y0 {
        return None;
    }
    Some(image.crop_imm(x0, y0, x1 - x0, y1 - y0))
}

/// Maps crop-local vertices back to full-image coordinates by adding the
/// expanded region's top-left corner.
pub fn translate_from_crop(points: &[Coord<Pixel>], region: &BBoxXYXY<Pixel>) -> Vec<Coord<Pixel>> {
    points
        .iter()
        .map(|p| Coord::new(p.x + region.xmin(), p.y + region.ymin()))
        .collect()
}

/// Keeps predictions scoring at least `min_score`, best first, at most
/// `max_count` of them. Equal scores keep their detection order.
pub fn filter_predictions(mut predictions: Vec<Prediction>, filter: &ScoreFilter) -> Vec<Prediction> {
    predictions.retain(|p| p.score >= filter.min_score);
    predictions.sort_by(|a, b| b.score.total_cmp(&a.score));
    predictions.truncate(filter.max_count);
    predictions
}

/// Picks `target` vertices by uniform index sampling.
///
/// Vertex `i` of the result is original vertex `i * (n - 1) / (target - 1)`
/// (integer division), so the first and last vertices always survive.
/// Sequences already at or below `target` are returned unchanged.
pub fn decimate_polygon(points: &[Coord<Pixel>], target: usize) -> Vec<Coord<Pixel>> {
    let n = points.len();
    if target < MIN_POLYGON_VERTICES || n <= target {
        return points.to_vec();
    }
    (0..target)
        .map(|i| points[i * (n - 1) / (target - 1)])
        .collect()
}

fn decimate_annotation(annotation: &mut Annotation, decimation: Decimation) -> bool {
    match annotation {
        Annotation::Polygon { points, .. } if points.len() > decimation.cap => {
            *points = decimate_polygon(points, decimation.target);
            true
        }
        _ => false,
    }
}
