//! Criterion microbenches for boxlist geometry, NMS, and record parsing.
//!
//! Run with: `cargo bench`
//!
//! These benchmarks measure the performance of:
//! - Pairwise IoU
//! - Class-aware NMS over a dense grid of overlapping boxes
//! - Detection record parsing (from_records_str, from_records_slice)

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::hint::black_box;

use boxlist::boxes::{iou, Box4};
use boxlist::io_records::{from_records_slice, from_records_str};
use boxlist::nms::batched_nms;

// Include test fixtures at compile time (no file I/O during benchmark)
const RECORDS_FIXTURE: &str = include_str!("../tests/fixtures/detections.json");

/// Deterministic boxes on a jittered grid, spread across `num_classes`.
fn grid_detections(n: usize, num_classes: i64) -> (Vec<Box4>, Vec<f64>, Vec<i64>) {
    let side = (n as f64).sqrt().ceil() as usize;
    let mut boxes = Vec::with_capacity(n);
    let mut scores = Vec::with_capacity(n);
    let mut class_ids = Vec::with_capacity(n);
    for i in 0..n {
        let (row, col) = ((i / side) as f64, (i % side) as f64);
        let jitter = (i % 7) as f64;
        boxes.push([
            row * 8.0 + jitter,
            col * 8.0,
            row * 8.0 + jitter + 20.0,
            col * 8.0 + 20.0,
        ]);
        scores.push(((i * 37) % 1000) as f64 / 1000.0);
        class_ids.push(i as i64 % num_classes);
    }
    (boxes, scores, class_ids)
}

/// Benchmark a single IoU computation.
fn bench_iou(c: &mut Criterion) {
    let a: Box4 = [0.0, 0.0, 10.0, 10.0];
    let b: Box4 = [5.0, 5.0, 15.0, 15.0];

    c.bench_function("iou", |bench| {
        bench.iter(|| black_box(iou(black_box(&a), black_box(&b))))
    });
}

/// Benchmark NMS at a few per-image box counts.
fn bench_batched_nms(c: &mut Criterion) {
    let mut group = c.benchmark_group("batched_nms");

    for n in [100usize, 1000] {
        let (boxes, scores, class_ids) = grid_detections(n, 5);
        group.throughput(Throughput::Elements(n as u64));
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |bench, _| {
            bench.iter(|| {
                let keep = batched_nms(
                    black_box(&boxes),
                    black_box(&scores),
                    black_box(&class_ids),
                    0.5,
                )
                .unwrap();
                black_box(keep)
            })
        });
    }

    group.finish();
}

/// Benchmark record parsing from string.
fn bench_records_parse_str(c: &mut Criterion) {
    let mut group = c.benchmark_group("records_parse");
    group.throughput(Throughput::Bytes(RECORDS_FIXTURE.len() as u64));

    group.bench_function("from_records_str", |b| {
        b.iter(|| {
            let lists = from_records_str(black_box(RECORDS_FIXTURE)).unwrap();
            black_box(lists)
        })
    });

    group.finish();
}

/// Benchmark record parsing from byte slice.
fn bench_records_parse_slice(c: &mut Criterion) {
    let bytes = RECORDS_FIXTURE.as_bytes();
    let mut group = c.benchmark_group("records_parse");
    group.throughput(Throughput::Bytes(bytes.len() as u64));

    group.bench_function("from_records_slice", |b| {
        b.iter(|| {
            let lists = from_records_slice(black_box(bytes)).unwrap();
            black_box(lists)
        })
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_iou,
    bench_batched_nms,
    bench_records_parse_str,
    bench_records_parse_slice,
);
criterion_main!(benches);
