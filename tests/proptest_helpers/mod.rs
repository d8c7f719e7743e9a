#![allow(dead_code)]

use labelkit::geometry::CanvasSize;
use labelkit::ir::{Annotation, BBoxXYXY, Coord, Pixel};
use proptest::prelude::*;
use proptest::strategy::BoxedStrategy;
use proptest::test_runner::{Config as ProptestConfig, FileFailurePersistence};

/// Pixel tolerance after a trip through 6-decimal normalized text.
pub fn eps_label(image_w: u32, image_h: u32) -> f64 {
    image_w.max(image_h) as f64 * 1e-6
}

pub fn proptest_config() -> ProptestConfig {
    let cases = std::env::var("PROPTEST_CASES")
        .ok()
        .and_then(|v| v.parse::<u32>().ok())
        .unwrap_or(64);

    let mut config = ProptestConfig::with_failure_persistence(FileFailurePersistence::WithSource(
        "proptest-regressions",
    ));
    config.cases = cases;
    config.max_shrink_iters = 1024;
    config
}

pub fn arb_image_size() -> impl Strategy<Value = (u32, u32)> {
    (2u32..4000, 2u32..4000)
}

pub fn arb_canvas() -> impl Strategy<Value = CanvasSize> {
    (10u32..3000, 10u32..3000).prop_map(|(w, h)| CanvasSize::new(w as f64, h as f64))
}

pub fn arb_point_within(width: u32, height: u32) -> BoxedStrategy<Coord<Pixel>> {
    (0.0..=width as f64, 0.0..=height as f64)
        .prop_map(|(x, y)| Coord::new(x, y))
        .boxed()
}

/// Integer-cornered box at least two pixels wide and high, so it survives
/// the minimum box size check.
pub fn arb_bbox_within(width: u32, height: u32) -> BoxedStrategy<BBoxXYXY<Pixel>> {
    prop::num::u32::ANY
        .prop_map(move |seed| {
            bbox_from_seed(
                width,
                height,
                seed,
                seed.rotate_left(3),
                seed.rotate_left(7),
                seed.rotate_left(11),
            )
        })
        .boxed()
}

pub fn arb_polygon_within(width: u32, height: u32, max_vertices: usize) -> BoxedStrategy<Vec<Coord<Pixel>>> {
    prop::collection::vec(arb_point_within(width, height), 3..=max_vertices).boxed()
}

pub fn arb_annotation_within(width: u32, height: u32) -> BoxedStrategy<Annotation> {
    let boxes = (0u32..80, arb_bbox_within(width, height))
        .prop_map(|(class, bbox)| Annotation::bbox(class, bbox));
    let polygons = (0u32..80, arb_polygon_within(width, height, 12)).prop_filter_map(
        "polygon needs three vertices",
        |(class, points)| Annotation::polygon(class, points),
    );
    prop_oneof![boxes, polygons].boxed()
}

fn bbox_from_seed(width: u32, height: u32, sx: u32, sy: u32, sw: u32, sh: u32) -> BBoxXYXY<Pixel> {
    let xmin = sx % (width - 1);
    let ymin = sy % (height - 1);
    let xmax = xmin + 2 + (sw % (width - xmin - 1));
    let ymax = ymin + 2 + (sh % (height - ymin - 1));

    BBoxXYXY::from_xyxy(xmin as f64, ymin as f64, xmax as f64, ymax as f64)
}

/// Compares two annotations coordinate by coordinate.
pub fn assert_annotation_close(a: &Annotation, b: &Annotation, eps: f64) -> Result<(), String> {
    if a.class_id() != b.class_id() {
        return Err(format!("class {} != {}", a.class_id(), b.class_id()));
    }
    let (pa, pb) = (coords(a), coords(b));
    if pa.len() != pb.len() {
        return Err(format!("{} coordinates vs {}", pa.len(), pb.len()));
    }
    for (i, (x, y)) in pa.iter().zip(&pb).enumerate() {
        if (x - y).abs() > eps {
            return Err(format!("coordinate {i}: {x} vs {y} (eps {eps})"));
        }
    }
    Ok(())
}

fn coords(a: &Annotation) -> Vec<f64> {
    match a {
        Annotation::Box { bbox, .. } => vec![bbox.xmin(), bbox.ymin(), bbox.xmax(), bbox.ymax()],
        Annotation::Polygon { points, .. } => points.iter().flat_map(|p| [p.x, p.y]).collect(),
    }
}
