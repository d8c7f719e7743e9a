//! In-memory annotation model.
//!
//! Annotations live in image pixel space for their whole lifetime; they are
//! only normalized at the moment a label file is written.

use serde::{Deserialize, Serialize};

use super::bbox::BBoxXYXY;
use super::coord::Coord;
use super::ids::ClassId;
use super::space::Pixel;

/// Minimum number of vertices for a polygon annotation.
pub const MIN_POLYGON_VERTICES: usize = 3;

/// A single object annotation in image pixel space.
///
/// Polygons are closed rings: the last vertex connects back to the first,
/// and vertex order defines the edges.
///
/// Deserialization goes through the same checks as the constructors: box
/// corners are reordered, and polygons with fewer than
/// [`MIN_POLYGON_VERTICES`] vertices or non-finite coordinates are rejected.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", try_from = "AnnotationData")]
pub enum Annotation {
    /// Axis-aligned box.
    #[serde(rename = "bbox")]
    Box {
        class_id: ClassId,
        bbox: BBoxXYXY<Pixel>,
    },
    /// Closed polygon.
    Polygon {
        class_id: ClassId,
        points: Vec<Coord<Pixel>>,
    },
}

#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum AnnotationData {
    #[serde(rename = "bbox")]
    Box {
        class_id: ClassId,
        bbox: BBoxXYXY<Pixel>,
    },
    Polygon {
        class_id: ClassId,
        points: Vec<Coord<Pixel>>,
    },
}

impl TryFrom<AnnotationData> for Annotation {
    type Error = String;

    fn try_from(data: AnnotationData) -> Result<Self, Self::Error> {
        match data {
            AnnotationData::Box { class_id, bbox } => {
                if !bbox.is_finite() {
                    return Err(format!("bbox {bbox:?} has non-finite coordinates"));
                }
                Ok(Annotation::bbox(
                    class_id,
                    BBoxXYXY::from_corners(bbox.min, bbox.max),
                ))
            }
            AnnotationData::Polygon { class_id, points } => {
                if points.iter().any(|p| !p.is_finite()) {
                    return Err("polygon has non-finite coordinates".to_string());
                }
                let count = points.len();
                Annotation::polygon(class_id, points).ok_or_else(|| {
                    format!(
                        "polygon needs at least {MIN_POLYGON_VERTICES} vertices, found {count}"
                    )
                })
            }
        }
    }
}

impl Annotation {
    /// Creates a box annotation.
    pub fn bbox(class_id: impl Into<ClassId>, bbox: BBoxXYXY<Pixel>) -> Self {
        Annotation::Box {
            class_id: class_id.into(),
            bbox,
        }
    }

    /// Creates a polygon annotation, or `None` if fewer than
    /// [`MIN_POLYGON_VERTICES`] points are given.
    pub fn polygon(class_id: impl Into<ClassId>, points: Vec<Coord<Pixel>>) -> Option<Self> {
        if points.len() < MIN_POLYGON_VERTICES {
            return None;
        }
        Some(Annotation::Polygon {
            class_id: class_id.into(),
            points,
        })
    }

    /// Class of the annotation, whichever shape it has.
    pub fn class_id(&self) -> ClassId {
        match self {
            Annotation::Box { class_id, .. } | Annotation::Polygon { class_id, .. } => *class_id,
        }
    }

    /// Reassigns the class of this annotation.
    pub fn set_class_id(&mut self, id: ClassId) {
        match self {
            Annotation::Box { class_id, .. } | Annotation::Polygon { class_id, .. } => {
                *class_id = id
            }
        }
    }

    /// Tight bounding box of the annotation.
    pub fn bounds(&self) -> BBoxXYXY<Pixel> {
        match self {
            Annotation::Box { bbox, .. } => *bbox,
            Annotation::Polygon { points, .. } => BBoxXYXY::enclosing(points).unwrap_or_default(),
        }
    }

    /// Returns the annotation with every coordinate clamped into the image.
    pub fn clamped(&self, image_width: f64, image_height: f64) -> Self {
        match self {
            Annotation::Box { class_id, bbox } => Annotation::Box {
                class_id: *class_id,
                bbox: bbox.clamped(image_width, image_height),
            },
            Annotation::Polygon { class_id, points } => Annotation::Polygon {
                class_id: *class_id,
                points: points
                    .iter()
                    .map(|p| p.clamped(image_width, image_height))
                    .collect(),
            },
        }
    }

    /// Returns true if the annotation cannot be written as a label line.
    ///
    /// Boxes must be at least `min_box_side` on both axes; polygons need
    /// [`MIN_POLYGON_VERTICES`] vertices spanning a non-zero width and height.
    pub fn is_degenerate(&self, min_box_side: f64) -> bool {
        match self {
            // negated so NaN sizes count as degenerate
            Annotation::Box { bbox, .. } => {
                !(bbox.width() >= min_box_side && bbox.height() >= min_box_side)
            }
            Annotation::Polygon { points, .. } => {
                points.len() < MIN_POLYGON_VERTICES || {
                    let bounds = self.bounds();
                    !(bounds.width() > 0.0 && bounds.height() > 0.0)
                }
            }
        }
    }

    /// Squared distance from `point` to this annotation.
    ///
    /// A point inside a box is at distance zero; for polygons the nearest
    /// vertex counts.
    pub fn distance_sq_to(&self, point: &Coord<Pixel>) -> f64 {
        match self {
            Annotation::Box { bbox, .. } if bbox.contains_point(point) => 0.0,
            Annotation::Box { bbox, .. } => {
                let nearest = Coord::new(
                    point.x.clamp(bbox.xmin(), bbox.xmax()),
                    point.y.clamp(bbox.ymin(), bbox.ymax()),
                );
                nearest.distance_sq(point)
            }
            Annotation::Polygon { points, .. } => points
                .iter()
                .map(|v| v.distance_sq(point))
                .fold(f64::INFINITY, f64::min),
        }
    }
}
