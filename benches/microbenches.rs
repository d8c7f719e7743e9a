//! Criterion microbenches for labelkit hot paths.
//!
//! Run with: `cargo bench`
//!
//! These benchmarks measure:
//! - label file rendering and parsing
//! - polygon decimation
//! - a dual-mode pipeline pass over replayed detections

use criterion::{criterion_group, criterion_main, Criterion, Throughput};
use std::hint::black_box;
use std::path::Path;

use image::{DynamicImage, RgbImage};
use labelkit::geometry::{CanvasSize, Projection};
use labelkit::ir::io_label::{from_label_str, to_label_string};
use labelkit::ir::{Annotation, BBoxXYXY, ClassId, Coord, Pixel};
use labelkit::pipeline::{
    decimate_polygon, DetectionPipeline, Geometry, PipelineMode, PipelineOptions, RawDetection,
    ReplayEngine,
};

const IMAGE_W: f64 = 1920.0;
const IMAGE_H: f64 = 1080.0;

fn ring(n: usize, cx: f64, cy: f64, r: f64) -> Vec<Coord<Pixel>> {
    (0..n)
        .map(|i| {
            let t = i as f64 / n as f64 * std::f64::consts::TAU;
            Coord::new(cx + r * t.cos(), cy + r * t.sin())
        })
        .collect()
}

fn sample_annotations() -> Vec<Annotation> {
    let mut anns = Vec::new();
    for i in 0..20 {
        let x = 40.0 + i as f64 * 80.0;
        anns.push(Annotation::bbox(
            i as u32 % 5,
            BBoxXYXY::from_xyxy(x, 100.0, x + 60.0, 300.0),
        ));
        if let Some(poly) = Annotation::polygon(i as u32 % 5, ring(50, x + 30.0, 600.0, 25.0)) {
            anns.push(poly);
        }
    }
    anns
}

fn bench_label_write(c: &mut Criterion) {
    let anns = sample_annotations();
    let mut group = c.benchmark_group("label_write");
    group.throughput(Throughput::Elements(anns.len() as u64));

    group.bench_function("to_label_string", |b| {
        b.iter(|| {
            let text = to_label_string(black_box(&anns), IMAGE_W, IMAGE_H).unwrap();
            black_box(text)
        })
    });

    group.finish();
}

fn bench_label_parse(c: &mut Criterion) {
    let text = to_label_string(&sample_annotations(), IMAGE_W, IMAGE_H)
        .expect("Failed to render label fixture");
    let mut group = c.benchmark_group("label_parse");
    group.throughput(Throughput::Bytes(text.len() as u64));

    group.bench_function("from_label_str", |b| {
        b.iter(|| {
            let records = from_label_str(black_box(&text), Path::new("bench.txt")).unwrap();
            black_box(records)
        })
    });

    group.finish();
}

fn bench_projection(c: &mut Criterion) {
    let proj = Projection::fit(IMAGE_W, IMAGE_H, CanvasSize::new(1280.0, 720.0))
        .expect("valid projection");
    let anns = sample_annotations();

    c.bench_function("project_annotations", |b| {
        b.iter(|| {
            for ann in black_box(&anns) {
                black_box(proj.project_annotation(ann));
            }
        })
    });
}

fn bench_decimate(c: &mut Criterion) {
    let points = ring(800, 500.0, 500.0, 300.0);
    c.bench_function("decimate_800_to_50", |b| {
        b.iter(|| black_box(decimate_polygon(black_box(&points), 50)))
    });
}

fn bench_dual_pipeline(c: &mut Criterion) {
    let image = DynamicImage::ImageRgb8(RgbImage::new(IMAGE_W as u32, IMAGE_H as u32));
    let detections: Vec<RawDetection> = (0..10)
        .map(|i| RawDetection {
            class_id: ClassId(i % 3),
            confidence: 0.9,
            geometry: Geometry::Box {
                bbox: BBoxXYXY::from_xyxy(
                    100.0 + i as f64 * 150.0,
                    200.0,
                    200.0 + i as f64 * 150.0,
                    400.0,
                ),
            },
        })
        .collect();
    let mask = vec![RawDetection {
        class_id: ClassId(0),
        confidence: 0.8,
        geometry: Geometry::Polygon {
            points: ring(120, 60.0, 120.0, 40.0),
        },
    }];

    c.bench_function("dual_pipeline_10_detections", |b| {
        b.iter(|| {
            let options = PipelineOptions {
                mode: PipelineMode::Dual,
                ..Default::default()
            };
            let mut pipeline = DetectionPipeline::new(options)
                .with_detector(Box::new(ReplayEngine::new("det", vec![detections.clone()])))
                .with_segmenter(Box::new(ReplayEngine::new("seg", vec![mask.clone(); 10])));
            black_box(pipeline.run(black_box(&image)))
        })
    });
}

criterion_group!(
    benches,
    bench_label_write,
    bench_label_parse,
    bench_projection,
    bench_decimate,
    bench_dual_pipeline,
);
criterion_main!(benches);
