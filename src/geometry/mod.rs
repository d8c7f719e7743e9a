//! Mapping between image pixel space and the display canvas.
//!
//! A [`Projection`] is a uniform scale plus an offset that fits the image
//! inside the canvas with a small margin and centers it. It is derived from
//! the current image and canvas sizes and never stored; recompute it after
//! every resize.
//!
//! The transform itself never clamps. Clamping to image bounds is a
//! separate step ([`unproject_clamped`]) applied before a point becomes
//! part of an annotation.

use crate::ir::{Annotation, BBoxXYXY, Coord, Pixel, Viewport};

/// Fraction of the canvas the fitted image may occupy along its limiting
/// axis.
pub const FIT_FACTOR: f64 = 0.95;

/// Drawn boxes narrower or shorter than this (in image pixels) are dropped.
pub const MIN_BOX_SIZE: f64 = 2.0;

/// Canvases smaller than this along either axis have not been laid out yet.
pub const MIN_CANVAS_EXTENT: f64 = 10.0;

/// Size of the drawing area in canvas pixels.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CanvasSize {
    pub width: f64,
    pub height: f64,
}

impl CanvasSize {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

/// Uniform scale + offset from image pixels to canvas pixels.
///
/// Only constructible with a positive, finite scale, so [`Projection::unproject`]
/// can never divide by zero.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Projection {
    scale: f64,
    offset_x: f64,
    offset_y: f64,
}

impl Projection {
    /// Builds a projection from explicit parameters.
    ///
    /// Returns `None` unless `scale` is positive and all values are finite.
    pub fn new(scale: f64, offset_x: f64, offset_y: f64) -> Option<Self> {
        if scale > 0.0 && scale.is_finite() && offset_x.is_finite() && offset_y.is_finite() {
            Some(Self {
                scale,
                offset_x,
                offset_y,
            })
        } else {
            None
        }
    }

    /// Fits an image into a canvas with [`FIT_FACTOR`] and centers it.
    ///
    /// Returns `None` when the canvas is not laid out yet or the image has
    /// no area; the caller should skip the redraw in that case.
    pub fn fit(image_width: f64, image_height: f64, canvas: CanvasSize) -> Option<Self> {
        Self::fit_with_factor(image_width, image_height, canvas, FIT_FACTOR)
    }

    /// Same as [`Projection::fit`] with a caller-chosen fit factor.
    pub fn fit_with_factor(
        image_width: f64,
        image_height: f64,
        canvas: CanvasSize,
        fit_factor: f64,
    ) -> Option<Self> {
        if canvas.width < MIN_CANVAS_EXTENT || canvas.height < MIN_CANVAS_EXTENT {
            return None;
        }
        if image_width <= 0.0 || image_height <= 0.0 {
            return None;
        }

        let scale = (canvas.width / image_width).min(canvas.height / image_height) * fit_factor;
        let offset_x = (canvas.width - image_width * scale) / 2.0;
        let offset_y = (canvas.height - image_height * scale) / 2.0;
        Self::new(scale, offset_x, offset_y)
    }

    #[inline]
    pub fn scale(&self) -> f64 {
        self.scale
    }

    /// Returns `(offset_x, offset_y)`.
    #[inline]
    pub fn offset(&self) -> (f64, f64) {
        (self.offset_x, self.offset_y)
    }

    /// Image point to canvas point.
    #[inline]
    pub fn project(&self, p: Coord<Pixel>) -> Coord<Viewport> {
        Coord::new(
            p.x * self.scale + self.offset_x,
            p.y * self.scale + self.offset_y,
        )
    }

    /// Canvas point to image point. Not clamped.
    #[inline]
    pub fn unproject(&self, p: Coord<Viewport>) -> Coord<Pixel> {
        Coord::new(
            (p.x - self.offset_x) / self.scale,
            (p.y - self.offset_y) / self.scale,
        )
    }

    pub fn project_bbox(&self, bbox: &BBoxXYXY<Pixel>) -> BBoxXYXY<Viewport> {
        BBoxXYXY::new(self.project(bbox.min), self.project(bbox.max))
    }

    /// Canvas rectangle the scaled image occupies.
    pub fn image_rect(&self, image_width: f64, image_height: f64) -> BBoxXYXY<Viewport> {
        self.project_bbox(&BBoxXYXY::from_xyxy(0.0, 0.0, image_width, image_height))
    }

    /// Outline of an annotation in canvas space, ready for a renderer.
    ///
    /// Boxes come back as their four corners in clockwise order starting
    /// top-left.
    pub fn project_annotation(&self, annotation: &Annotation) -> Vec<Coord<Viewport>> {
        match annotation {
            Annotation::Box { bbox, .. } => [
                Coord::new(bbox.xmin(), bbox.ymin()),
                Coord::new(bbox.xmax(), bbox.ymin()),
                Coord::new(bbox.xmax(), bbox.ymax()),
                Coord::new(bbox.xmin(), bbox.ymax()),
            ]
            .into_iter()
            .map(|p| self.project(p))
            .collect(),
            Annotation::Polygon { points, .. } => points.iter().map(|p| self.project(*p)).collect(),
        }
    }
}

/// Unprojects a canvas point and clamps it into the image.
pub fn unproject_clamped(
    projection: &Projection,
    p: Coord<Viewport>,
    image_width: f64,
    image_height: f64,
) -> Coord<Pixel> {
    projection.unproject(p).clamped(image_width, image_height)
}

/// Converts a canvas drag into an image-space box.
///
/// Corners may come in any order. Returns `None` for boxes below
/// [`MIN_BOX_SIZE`] on either axis after clamping; those are accidental
/// clicks, not annotations.
pub fn box_from_drag(
    projection: &Projection,
    start: Coord<Viewport>,
    end: Coord<Viewport>,
    image_width: f64,
    image_height: f64,
) -> Option<BBoxXYXY<Pixel>> {
    let a = unproject_clamped(projection, start, image_width, image_height);
    let b = unproject_clamped(projection, end, image_width, image_height);
    let bbox = BBoxXYXY::from_corners(a, b);

    if bbox.width() < MIN_BOX_SIZE || bbox.height() < MIN_BOX_SIZE {
        log::debug!(
            "discarding degenerate box {:.1}x{:.1}",
            bbox.width(),
            bbox.height()
        );
        return None;
    }
    Some(bbox)
}
