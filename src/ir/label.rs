//! Persisted label records and the pixel <-> normalized conversion.
//!
//! One [`LabelRecord`] becomes one line of a label file:
//!
//! ```text
//! <class_id> <cx> <cy> <w> <h>                 (box)
//! <class_id> <x1> <y1> <x2> <y2> ... <xn> <yn>  (polygon)
//! ```
//!
//! Every float is written with exactly six decimals. Normalization is lossy
//! only through that rounding.

use std::fmt;
use std::path::Path;

use super::bbox::BBoxXYXY;
use super::coord::Coord;
use super::ids::ClassId;
use super::model::{Annotation, MIN_POLYGON_VERTICES};
use super::Normalized;
use crate::error::LabelkitError;

/// Upper bound on tokens read from one line, so pathological input cannot
/// allocate without limit.
const MAX_LINE_TOKENS: usize = 1 + 2 * 100_000;

/// A label line in normalized `[0, 1]` space.
#[derive(Clone, Debug, PartialEq)]
pub enum LabelRecord {
    /// Box in YOLO center/size form.
    Box {
        class_id: ClassId,
        cx: f64,
        cy: f64,
        w: f64,
        h: f64,
    },
    /// Polygon vertices in ring order.
    Polygon {
        class_id: ClassId,
        points: Vec<Coord<Normalized>>,
    },
}

impl LabelRecord {
    /// Class id from the first field of the line.
    pub fn class_id(&self) -> ClassId {
        match self {
            LabelRecord::Box { class_id, .. } | LabelRecord::Polygon { class_id, .. } => *class_id,
        }
    }

    /// Iterates over every normalized coordinate value in the record.
    pub fn values(&self) -> Vec<f64> {
        match self {
            LabelRecord::Box { cx, cy, w, h, .. } => vec![*cx, *cy, *w, *h],
            LabelRecord::Polygon { points, .. } => {
                points.iter().flat_map(|p| [p.x, p.y]).collect()
            }
        }
    }
}

impl fmt::Display for LabelRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LabelRecord::Box {
                class_id,
                cx,
                cy,
                w,
                h,
            } => write!(f, "{} {:.6} {:.6} {:.6} {:.6}", class_id, cx, cy, w, h),
            LabelRecord::Polygon { class_id, points } => {
                write!(f, "{}", class_id)?;
                for p in points {
                    write!(f, " {:.6} {:.6}", p.x, p.y)?;
                }
                Ok(())
            }
        }
    }
}

fn check_image_size(image_width: f64, image_height: f64) -> Result<(), LabelkitError> {
    if image_width > 0.0 && image_height > 0.0 {
        Ok(())
    } else {
        Err(LabelkitError::InvalidImageSize {
            width: image_width,
            height: image_height,
        })
    }
}

fn check_writable(annotation: &Annotation) -> Result<(), LabelkitError> {
    let invalid = |kind, message: String| LabelkitError::InvalidAnnotation {
        kind,
        class_id: annotation.class_id().as_u32(),
        message,
    };
    match annotation {
        Annotation::Box { bbox, .. } => {
            if bbox.width() > 0.0 && bbox.height() > 0.0 {
                Ok(())
            } else {
                Err(invalid(
                    "box",
                    format!("width {} and height {} must be positive", bbox.width(), bbox.height()),
                ))
            }
        }
        Annotation::Polygon { points, .. } => {
            if points.len() >= MIN_POLYGON_VERTICES {
                Ok(())
            } else {
                Err(invalid(
                    "polygon",
                    format!(
                        "needs at least {} vertices, found {}",
                        MIN_POLYGON_VERTICES,
                        points.len()
                    ),
                ))
            }
        }
    }
}

/// Converts a pixel-space annotation into a normalized label record.
///
/// Fails with [`LabelkitError::InvalidImageSize`] unless both image
/// dimensions are positive, and with [`LabelkitError::InvalidAnnotation`]
/// for a box without positive width and height or a polygon with fewer than
/// [`MIN_POLYGON_VERTICES`] vertices. Neither could be read back as written.
pub fn normalize(
    annotation: &Annotation,
    image_width: f64,
    image_height: f64,
) -> Result<LabelRecord, LabelkitError> {
    check_image_size(image_width, image_height)?;
    check_writable(annotation)?;

    Ok(match annotation {
        Annotation::Box { class_id, bbox } => {
            let (cx, cy, w, h) = bbox.to_normalized(image_width, image_height).to_cxcywh();
            LabelRecord::Box {
                class_id: *class_id,
                cx,
                cy,
                w,
                h,
            }
        }
        Annotation::Polygon { class_id, points } => LabelRecord::Polygon {
            class_id: *class_id,
            points: points
                .iter()
                .map(|p| Coord::new(p.x / image_width, p.y / image_height))
                .collect(),
        },
    })
}

/// Converts a normalized label record back into pixel space, used to
/// overlay saved labels on their image during review.
pub fn denormalize(
    record: &LabelRecord,
    image_width: f64,
    image_height: f64,
) -> Result<Annotation, LabelkitError> {
    check_image_size(image_width, image_height)?;

    Ok(match record {
        LabelRecord::Box {
            class_id,
            cx,
            cy,
            w,
            h,
        } => Annotation::Box {
            class_id: *class_id,
            bbox: BBoxXYXY::<Normalized>::from_cxcywh(*cx, *cy, *w, *h)
                .to_pixel(image_width, image_height),
        },
        LabelRecord::Polygon { class_id, points } => Annotation::Polygon {
            class_id: *class_id,
            points: points
                .iter()
                .map(|p| Coord::new(p.x * image_width, p.y * image_height))
                .collect(),
        },
    })
}

/// Parses one label line. Blank lines yield `Ok(None)`.
pub fn parse_label_line(
    line: &str,
    file_path: &Path,
    line_num: usize,
) -> Result<Option<LabelRecord>, LabelkitError> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }

    let tokens: Vec<&str> = trimmed.split_whitespace().take(MAX_LINE_TOKENS + 1).collect();
    let parse_err = |message: String| LabelkitError::LabelParse {
        path: file_path.to_path_buf(),
        line: line_num,
        message,
    };

    if tokens.len() > MAX_LINE_TOKENS {
        return Err(parse_err(format!(
            "line has more than {} fields",
            MAX_LINE_TOKENS
        )));
    }

    let class_id = tokens[0].parse::<u32>().map_err(|_| {
        parse_err(format!(
            "invalid class_id '{}'; expected non-negative integer",
            tokens[0]
        ))
    })?;

    let mut values = Vec::with_capacity(tokens.len() - 1);
    for raw in &tokens[1..] {
        let value = raw.parse::<f64>().map_err(|_| {
            parse_err(format!("invalid coordinate '{raw}'; expected floating-point number"))
        })?;
        values.push(value);
    }

    let class_id = ClassId::new(class_id);
    match values.len() {
        4 => Ok(Some(LabelRecord::Box {
            class_id,
            cx: values[0],
            cy: values[1],
            w: values[2],
            h: values[3],
        })),
        n if n % 2 == 0 && n / 2 >= MIN_POLYGON_VERTICES => Ok(Some(LabelRecord::Polygon {
            class_id,
            points: values
                .chunks_exact(2)
                .map(|xy| Coord::new(xy[0], xy[1]))
                .collect(),
        })),
        n => Err(parse_err(format!(
            "expected 4 box values or at least {} polygon pairs, found {} value(s)",
            MIN_POLYGON_VERTICES, n
        ))),
    }
}

/// Fuzz-only entrypoint for single-line label parsing.
#[cfg(feature = "fuzzing")]
pub fn fuzz_parse_label_line(input: &str) -> Result<(), LabelkitError> {
    let _ = parse_label_line(input, Path::new("<fuzz>"), 1)?;
    Ok(())
}
