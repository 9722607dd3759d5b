#![allow(dead_code)]

use labelgeom::ir::{AnnotationSet, LocatedObject, Point, Polygon};
use proptest::prelude::*;
use proptest::strategy::BoxedStrategy;
use proptest::test_runner::{Config as ProptestConfig, FileFailurePersistence};

pub const LABELS: &[&str] = &["cat", "dog", "person"];

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
    (16u32..=2048, 16u32..=2048)
}

/// An integer-valued box `(x, y, w, h)` inside a `width` x `height` image,
/// at least `min_side` pixels on each side.
pub fn arb_box(width: u32, height: u32, min_side: u32) -> BoxedStrategy<(f64, f64, f64, f64)> {
    (0..=width - min_side, 0..=height - min_side)
        .prop_flat_map(move |(x, y)| {
            (
                Just(x),
                Just(y),
                min_side..=width - x,
                min_side..=height - y,
            )
        })
        .prop_map(|(x, y, w, h)| (x as f64, y as f64, w as f64, h as f64))
        .boxed()
}

fn triangle_in(x: f64, y: f64, w: f64, h: f64) -> Polygon {
    let (x2, y2) = (x + w - 1.0, y + h - 1.0);
    Polygon::new(vec![
        Point::new(x, y),
        Point::new(x2, y),
        Point::new(x, y2),
    ])
    .unwrap()
}

/// One labelled object, with a triangle polygon inside its box half the time.
pub fn arb_object(width: u32, height: u32) -> BoxedStrategy<LocatedObject> {
    (
        arb_box(width, height, 2),
        prop::sample::select(LABELS),
        any::<bool>(),
        prop::option::of((0u32..=100).prop_map(|v| v as f64 / 100.0)),
    )
        .prop_map(|((x, y, w, h), label, with_polygon, score)| {
            let mut object = LocatedObject::new(x, y, w, h).with_label(label);
            if with_polygon {
                object = object.with_polygon(triangle_in(x, y, w, h));
            }
            if let Some(score) = score {
                object = object.with_score(score);
            }
            object
        })
        .boxed()
}

/// An absolute, integer-valued set together with its image size.
pub fn arb_absolute_set(max_objects: usize) -> BoxedStrategy<(AnnotationSet, u32, u32)> {
    arb_image_size()
        .prop_flat_map(move |(width, height)| {
            (
                prop::collection::vec(arb_object(width, height), 0..=max_objects),
                Just(width),
                Just(height),
            )
        })
        .prop_map(|(objects, width, height)| (AnnotationSet::absolute(objects), width, height))
        .boxed()
}
