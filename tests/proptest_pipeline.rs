use image::{DynamicImage, RgbImage};
use labelkit::ir::{Annotation, BBoxXYXY, ClassId, Coord, Pixel};
use labelkit::pipeline::{
    decimate_polygon, DetectionPipeline, Geometry, PipelineMode, PipelineOptions, RawDetection,
    ReplayEngine,
};
use proptest::prelude::*;

mod proptest_helpers;

const W: u32 = 64;
const H: u32 = 48;

fn detections(boxes: &[BBoxXYXY<Pixel>]) -> Vec<RawDetection> {
    boxes
        .iter()
        .enumerate()
        .map(|(i, bbox)| RawDetection {
            class_id: ClassId(i as u32 % 3),
            confidence: 0.9,
            geometry: Geometry::Box { bbox: *bbox },
        })
        .collect()
}

fn triangle() -> RawDetection {
    RawDetection {
        class_id: ClassId(0),
        confidence: 0.8,
        geometry: Geometry::Polygon {
            points: vec![Coord::new(0.0, 0.0), Coord::new(1.0, 0.0), Coord::new(1.0, 1.0)],
        },
    }
}

proptest! {
    #![proptest_config(proptest_helpers::proptest_config())]

    #[test]
    fn dual_mode_emits_one_annotation_per_detection(
        boxes in prop::collection::vec(proptest_helpers::arb_bbox_within(W, H), 0..6),
        mask_flags in prop::collection::vec(any::<bool>(), 6),
        ratio in 0.0f64..0.5,
    ) {
        // one segmenter response per detection, empty or a single triangle
        let responses: Vec<Vec<RawDetection>> = mask_flags
            .iter()
            .take(boxes.len())
            .map(|has_mask| if *has_mask { vec![triangle()] } else { Vec::new() })
            .collect();

        let options = PipelineOptions {
            mode: PipelineMode::Dual,
            expand_ratio: ratio,
            ..Default::default()
        };
        let mut pipeline = DetectionPipeline::new(options)
            .with_detector(Box::new(ReplayEngine::new("det", vec![detections(&boxes)])))
            .with_segmenter(Box::new(ReplayEngine::new("seg", responses)));

        let image = DynamicImage::ImageRgb8(RgbImage::new(W, H));
        let output = pipeline.run(&image);

        prop_assert_eq!(output.predictions.len(), boxes.len());
        for ((pred, bbox), has_mask) in output.predictions.iter().zip(&boxes).zip(&mask_flags) {
            match &pred.annotation {
                Annotation::Box { bbox: emitted, .. } => {
                    prop_assert!(!has_mask);
                    prop_assert_eq!(emitted, bbox);
                }
                Annotation::Polygon { .. } => prop_assert!(*has_mask),
            }
        }
        prop_assert_eq!(
            output.report.fallbacks,
            mask_flags.iter().take(boxes.len()).filter(|m| !**m).count()
        );
    }

    #[test]
    fn decimation_keeps_endpoints_and_order(
        n in 51usize..400,
        target in 3usize..50,
    ) {
        let points: Vec<Coord<Pixel>> = (0..n).map(|i| Coord::new(i as f64, 0.0)).collect();
        let out = decimate_polygon(&points, target);
        prop_assert_eq!(out.len(), target);
        prop_assert_eq!(out[0].x, 0.0);
        prop_assert_eq!(out[target - 1].x, (n - 1) as f64);
        prop_assert!(out.windows(2).all(|w| w[0].x < w[1].x));
    }
}
