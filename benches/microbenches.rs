//! Criterion microbenches for labelgeom geometry and raster operations.
//!
//! Run with: `cargo bench`
//!
//! These benchmarks measure the performance of:
//! - Polygon IoU (intersect_over_union)
//! - Polygon merging over a grid of adjacent tiles (merge_polygons)
//! - Contour tracing of an indexed raster (trace_indexed)

use criterion::{criterion_group, criterion_main, Criterion, Throughput};
use std::hint::black_box;

use labelgeom::geometry::{intersect_over_union, merge_polygons, MergeOptions};
use labelgeom::ir::{AnnotationSet, LocatedObject, Point, Polygon};
use labelgeom::raster::{rasterize_indexed, trace_indexed, Palette, TraceOptions};

/// A regular `n`-gon of the given radius.
fn regular_polygon(n: usize, cx: f64, cy: f64, radius: f64) -> Polygon {
    let points = (0..n)
        .map(|i| {
            let angle = i as f64 * std::f64::consts::TAU / n as f64;
            Point::new(cx + radius * angle.cos(), cy + radius * angle.sin())
        })
        .collect();
    Polygon::new(points).expect("regular polygon")
}

/// `side` x `side` tiles of 10 px, alternating between two labels per row.
fn tile_grid(side: usize) -> AnnotationSet {
    let objects = (0..side * side)
        .map(|i| {
            let (row, col) = (i / side, i % side);
            let label = if row % 2 == 0 { "road" } else { "grass" };
            LocatedObject::new(col as f64 * 10.0, row as f64 * 10.0, 10.0, 10.0).with_label(label)
        })
        .collect();
    AnnotationSet::absolute(objects)
}

/// Benchmark IoU of two overlapping 64-gons.
fn bench_iou(c: &mut Criterion) {
    let a = regular_polygon(64, 100.0, 100.0, 50.0);
    let b = regular_polygon(64, 130.0, 110.0, 50.0);

    let mut group = c.benchmark_group("iou");
    group.throughput(Throughput::Elements(1));

    group.bench_function("intersect_over_union_64gon", |bench| {
        bench.iter(|| black_box(intersect_over_union(black_box(&a), black_box(&b))))
    });

    group.finish();
}

/// Benchmark merging a grid of touching tiles.
fn bench_merge(c: &mut Criterion) {
    let set = tile_grid(8);
    let options = MergeOptions::default();

    let mut group = c.benchmark_group("merge");
    group.throughput(Throughput::Elements(set.len() as u64));

    group.bench_function("merge_polygons_8x8_tiles", |b| {
        b.iter(|| {
            let merged = merge_polygons(black_box(&set), 0, 0, &options).unwrap();
            black_box(merged)
        })
    });

    group.finish();
}

/// Benchmark tracing a rasterized tile grid.
fn bench_trace(c: &mut Criterion) {
    let set = tile_grid(8);
    let palette = Palette::from_labels(["road", "grass"], 0).expect("palette");
    // Rasterize once (outside the timed region)
    let raster = rasterize_indexed(&set, &palette, 80, 80).expect("rasterize tile grid");
    let options = TraceOptions::default();

    let mut group = c.benchmark_group("trace");
    group.throughput(Throughput::Elements((raster.width() * raster.height()) as u64));

    group.bench_function("trace_indexed_80x80", |b| {
        b.iter(|| {
            let traced = trace_indexed(black_box(&raster), Some(&palette), &options);
            black_box(traced)
        })
    });

    group.finish();
}

criterion_group!(benches, bench_iou, bench_merge, bench_trace);
criterion_main!(benches);
