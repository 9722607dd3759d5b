//! Fuzz target for contour tracing.
//!
//! The first byte picks the raster width; the rest are pixel indices.

#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Some((&width, pixels)) = data.split_first() else {
        return;
    };
    if pixels.len() > 256 * 256 {
        return;
    }

    let _ = labelgeom::raster::contour::fuzz_trace_bytes(width as u32, pixels);
});
