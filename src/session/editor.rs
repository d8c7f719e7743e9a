//! Annotation editing for the current image.
//!
//! One editor serves every drawing layout; [`DrawMode`] decides which tools
//! are available. All input arrives in canvas space together with the
//! current [`Projection`] and is stored in image pixel space, clamped.

use crate::geometry::{box_from_drag, unproject_clamped, Projection, MIN_BOX_SIZE};
use crate::ir::{Annotation, ClassId, Coord, Pixel, Viewport, MIN_POLYGON_VERTICES};

/// Which shapes the editor lets the user draw.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DrawMode {
    /// Drag-to-box only.
    BoxOnly,
    /// Click-to-add polygon vertices only.
    PolygonOnly,
    /// Both tools; boxes are selected first.
    #[default]
    Both,
}

impl DrawMode {
    /// Whether `tool` can be used in this mode.
    pub fn allows(&self, tool: Tool) -> bool {
        matches!(
            (self, tool),
            (DrawMode::Both, _) | (DrawMode::BoxOnly, Tool::Box) | (DrawMode::PolygonOnly, Tool::Polygon)
        )
    }

    fn default_tool(&self) -> Tool {
        match self {
            DrawMode::PolygonOnly => Tool::Polygon,
            DrawMode::BoxOnly | DrawMode::Both => Tool::Box,
        }
    }
}

/// The active drawing tool.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Tool {
    Box,
    Polygon,
}

/// Annotation list plus in-progress polygon for one image.
#[derive(Clone, Debug)]
pub struct Editor {
    mode: DrawMode,
    tool: Tool,
    active_class: ClassId,
    image_size: (f64, f64),
    annotations: Vec<Annotation>,
    pending: Vec<Coord<Pixel>>,
}

impl Default for Editor {
    fn default() -> Self {
        Self::new(DrawMode::default())
    }
}

impl Editor {
    /// Creates an editor with no image; nothing can be drawn until
    /// [`Editor::reset`] provides one.
    pub fn new(mode: DrawMode) -> Self {
        Self {
            mode,
            tool: mode.default_tool(),
            active_class: ClassId::default(),
            image_size: (0.0, 0.0),
            annotations: Vec::new(),
            pending: Vec::new(),
        }
    }

    /// Starts editing a new image, replacing all prior state.
    ///
    /// Incoming annotations are clamped into the image; those that end up
    /// degenerate are dropped, the same rule a drag-drawn box obeys.
    pub fn reset(&mut self, image_width: f64, image_height: f64, annotations: Vec<Annotation>) {
        self.image_size = (image_width, image_height);
        let incoming = annotations.len();
        self.annotations = annotations
            .iter()
            .map(|a| a.clamped(image_width, image_height))
            .filter(|a| !a.is_degenerate(MIN_BOX_SIZE))
            .collect();
        if self.annotations.len() < incoming {
            log::debug!(
                "dropped {} degenerate annotation(s) on load",
                incoming - self.annotations.len()
            );
        }
        self.pending.clear();
    }

    /// Forgets the image and everything drawn on it.
    pub fn unload(&mut self) {
        self.reset(0.0, 0.0, Vec::new());
    }

    pub fn mode(&self) -> DrawMode {
        self.mode
    }

    pub fn tool(&self) -> Tool {
        self.tool
    }

    /// Switches tool. Returns false if the draw mode forbids it.
    pub fn set_tool(&mut self, tool: Tool) -> bool {
        if !self.mode.allows(tool) {
            return false;
        }
        if tool != self.tool {
            self.pending.clear();
        }
        self.tool = tool;
        true
    }

    /// Class given to newly drawn annotations.
    pub fn active_class(&self) -> ClassId {
        self.active_class
    }

    pub fn set_active_class(&mut self, id: ClassId) {
        self.active_class = id;
    }

    /// Finished annotations in drawing order, in image pixel space.
    pub fn annotations(&self) -> &[Annotation] {
        &self.annotations
    }

    /// Vertices of the polygon being drawn.
    pub fn pending_points(&self) -> &[Coord<Pixel>] {
        &self.pending
    }

    fn has_image(&self) -> bool {
        self.image_size.0 > 0.0 && self.image_size.1 > 0.0
    }

    /// Finishes a box drag. Degenerate boxes are dropped.
    pub fn add_box(
        &mut self,
        projection: &Projection,
        start: Coord<Viewport>,
        end: Coord<Viewport>,
    ) -> Option<&Annotation> {
        if self.tool != Tool::Box || !self.has_image() {
            return None;
        }
        let (w, h) = self.image_size;
        let bbox = box_from_drag(projection, start, end, w, h)?;
        self.annotations
            .push(Annotation::bbox(self.active_class, bbox));
        self.annotations.last()
    }

    /// Adds a vertex to the polygon in progress.
    pub fn add_polygon_point(&mut self, projection: &Projection, p: Coord<Viewport>) -> bool {
        if self.tool != Tool::Polygon || !self.has_image() {
            return false;
        }
        let (w, h) = self.image_size;
        self.pending.push(unproject_clamped(projection, p, w, h));
        true
    }

    /// Closes the polygon in progress.
    ///
    /// With fewer than three vertices the pending points are discarded and
    /// nothing is added.
    pub fn finish_polygon(&mut self) -> Option<&Annotation> {
        let points = std::mem::take(&mut self.pending);
        if points.len() < MIN_POLYGON_VERTICES {
            log::debug!("discarding polygon with {} vertices", points.len());
            return None;
        }
        let ann = Annotation::polygon(self.active_class, points)?;
        self.annotations.push(ann);
        self.annotations.last()
    }

    /// Removes the most recently added annotation.
    pub fn pop_last(&mut self) -> Option<Annotation> {
        self.annotations.pop()
    }

    /// Removes the annotation closest to an image-space point.
    pub fn pop_nearest(&mut self, point: Coord<Pixel>) -> Option<Annotation> {
        let idx = self.nearest_index(point)?;
        Some(self.annotations.remove(idx))
    }

    /// Index of the annotation closest to `point`; earliest wins ties.
    pub fn nearest_index(&self, point: Coord<Pixel>) -> Option<usize> {
        self.annotations
            .iter()
            .enumerate()
            .map(|(i, a)| (i, a.distance_sq_to(&point)))
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(i, _)| i)
    }

    /// Finds a polygon vertex within `radius` image pixels of `point`.
    ///
    /// Returns `(annotation index, vertex index)`.
    pub fn vertex_at(&self, point: Coord<Pixel>, radius: f64) -> Option<(usize, usize)> {
        let limit = radius * radius;
        let mut best: Option<(usize, usize, f64)> = None;
        for (ai, ann) in self.annotations.iter().enumerate() {
            let Annotation::Polygon { points, .. } = ann else {
                continue;
            };
            for (vi, v) in points.iter().enumerate() {
                let d = v.distance_sq(&point);
                if d <= limit && best.map_or(true, |(_, _, bd)| d < bd) {
                    best = Some((ai, vi, d));
                }
            }
        }
        best.map(|(ai, vi, _)| (ai, vi))
    }

    /// Drags a polygon vertex to a new canvas position.
    pub fn move_vertex(
        &mut self,
        projection: &Projection,
        annotation: usize,
        vertex: usize,
        to: Coord<Viewport>,
    ) -> bool {
        let (w, h) = self.image_size;
        let target = unproject_clamped(projection, to, w, h);
        match self.annotations.get_mut(annotation) {
            Some(Annotation::Polygon { points, .. }) => match points.get_mut(vertex) {
                Some(v) => {
                    *v = target;
                    true
                }
                None => false,
            },
            _ => false,
        }
    }

    /// Reassigns the class of one annotation.
    pub fn set_class(&mut self, annotation: usize, id: ClassId) -> bool {
        match self.annotations.get_mut(annotation) {
            Some(ann) => {
                ann.set_class_id(id);
                true
            }
            None => false,
        }
    }

    /// Removes every annotation and the polygon in progress.
    pub fn clear(&mut self) {
        self.annotations.clear();
        self.pending.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::BBoxXYXY;

    fn identity() -> Projection {
        Projection::new(1.0, 0.0, 0.0).unwrap()
    }

    fn editor(mode: DrawMode) -> Editor {
        let mut e = Editor::new(mode);
        e.reset(100.0, 100.0, Vec::new());
        e
    }

    #[test]
    fn draw_mode_restricts_tools() {
        let mut e = editor(DrawMode::BoxOnly);
        assert!(!e.set_tool(Tool::Polygon));
        assert_eq!(e.tool(), Tool::Box);

        let e = editor(DrawMode::PolygonOnly);
        assert_eq!(e.tool(), Tool::Polygon);
    }

    #[test]
    fn drag_adds_clamped_box_with_active_class() {
        let mut e = editor(DrawMode::Both);
        e.set_active_class(ClassId(3));
        let ann = e
            .add_box(&identity(), Coord::new(90.0, 10.0), Coord::new(150.0, 40.0))
            .cloned()
            .unwrap();
        assert_eq!(
            ann,
            Annotation::bbox(3u32, BBoxXYXY::from_xyxy(90.0, 10.0, 100.0, 40.0))
        );
    }

    #[test]
    fn tiny_drag_adds_nothing() {
        let mut e = editor(DrawMode::Both);
        assert!(e
            .add_box(&identity(), Coord::new(10.0, 10.0), Coord::new(11.0, 50.0))
            .is_none());
        assert!(e.annotations().is_empty());
    }

    #[test]
    fn polygon_needs_three_points() {
        let mut e = editor(DrawMode::PolygonOnly);
        let proj = identity();
        e.add_polygon_point(&proj, Coord::new(1.0, 1.0));
        e.add_polygon_point(&proj, Coord::new(5.0, 1.0));
        assert!(e.finish_polygon().is_none());
        assert!(e.pending_points().is_empty());

        for p in [(1.0, 1.0), (5.0, 1.0), (5.0, 5.0)] {
            e.add_polygon_point(&proj, Coord::new(p.0, p.1));
        }
        assert!(e.finish_polygon().is_some());
        assert_eq!(e.annotations().len(), 1);
    }

    #[test]
    fn pop_nearest_removes_the_closest() {
        let mut e = editor(DrawMode::Both);
        let proj = identity();
        e.add_box(&proj, Coord::new(0.0, 0.0), Coord::new(10.0, 10.0));
        e.add_box(&proj, Coord::new(50.0, 50.0), Coord::new(60.0, 60.0));
        let removed = e.pop_nearest(Coord::new(55.0, 70.0)).unwrap();
        assert_eq!(removed.bounds().xmin(), 50.0);
        assert_eq!(e.annotations().len(), 1);
        assert!(e.pop_last().is_some());
        assert!(e.pop_last().is_none());
    }

    #[test]
    fn vertex_drag_is_clamped() {
        let mut e = editor(DrawMode::PolygonOnly);
        let proj = identity();
        for p in [(10.0, 10.0), (20.0, 10.0), (20.0, 20.0)] {
            e.add_polygon_point(&proj, Coord::new(p.0, p.1));
        }
        e.finish_polygon();
        let (ai, vi) = e.vertex_at(Coord::new(19.0, 19.0), 3.0).unwrap();
        assert_eq!((ai, vi), (0, 2));
        assert!(e.move_vertex(&proj, ai, vi, Coord::new(500.0, -4.0)));
        let Annotation::Polygon { points, .. } = &e.annotations()[0] else {
            panic!("expected polygon");
        };
        assert_eq!((points[2].x, points[2].y), (100.0, 0.0));
    }

    #[test]
    fn reset_drops_annotations_that_cannot_be_saved() {
        let mut e = Editor::new(DrawMode::Both);
        e.reset(
            100.0,
            100.0,
            vec![
                Annotation::bbox(0u32, BBoxXYXY::from_xyxy(80.0, 80.0, 20.0, 20.0)),
                Annotation::bbox(1u32, BBoxXYXY::from_xyxy(120.0, 10.0, 150.0, 40.0)),
                Annotation::Polygon {
                    class_id: ClassId(2),
                    points: vec![Coord::new(10.0, 10.0), Coord::new(60.0, 60.0)],
                },
                Annotation::bbox(3u32, BBoxXYXY::from_xyxy(90.0, 10.0, 150.0, 40.0)),
            ],
        );
        assert_eq!(
            e.annotations(),
            [Annotation::bbox(3u32, BBoxXYXY::from_xyxy(90.0, 10.0, 100.0, 40.0))]
        );
    }

    #[test]
    fn nothing_is_drawn_without_an_image() {
        let mut e = Editor::new(DrawMode::Both);
        assert!(e
            .add_box(&identity(), Coord::new(0.0, 0.0), Coord::new(50.0, 50.0))
            .is_none());
    }
}
