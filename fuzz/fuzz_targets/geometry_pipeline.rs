//! Fuzz target for the geometry operations.
//!
//! Parses arbitrary bytes as IR JSON and, when that succeeds, runs IoU,
//! simplification, region fitting and merging over the objects. None of
//! these may panic, whatever the polygons look like.

#![no_main]

use libfuzzer_sys::fuzz_target;
use labelgeom::geometry::{fit_in_region, merge_polygons, object_iou, simplify, MergeOptions};
use labelgeom::ir::io_json::from_json_slice;

fuzz_target!(|data: &[u8]| {
    if data.len() > 64 * 1024 {
        return;
    }

    let Ok(set) = from_json_slice(data) else {
        return;
    };
    if set.len() > 32 {
        return;
    }

    for a in &set {
        let _ = simplify(a, 1.0);
        for b in &set {
            let _ = object_iou(a, b);
            let _ = fit_in_region(a, b, Some(0));
        }
    }
    let _ = merge_polygons(&set, 640, 480, &MergeOptions::default());
});
