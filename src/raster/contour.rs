//! Contour tracing: label rasters to polygons.
//!
//! Outer borders of 8-connected foreground components are followed with
//! `imageproc`'s Suzuki–Abe implementation. Only the pixels where the border
//! changes direction are kept as polygon vertices, so a filled rectangle
//! traces back to its four corners. Each connected component becomes one
//! object.

use image::{GrayImage, Luma};
use imageproc::contours::{find_contours, BorderType};
use imageproc::point::Point as PixelPoint;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::{debug, warn};

use crate::geometry::{GeoKernel, GeometryKernel, PolygonOps};
use crate::ir::{
    AnnotationSet, ImageSegmentationAnnotations, LocatedObject, MetaValue, Point, Polygon,
    MIN_RECT_HEIGHT_KEY, MIN_RECT_WIDTH_KEY,
};
use crate::raster::Palette;

/// Filters applied while tracing.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TraceOptions {
    /// Raster value treated as background in indexed rasters.
    pub background: u8,

    /// Smallest accepted box (and minimum rectangle) side, in pixels.
    pub min_size: Option<f64>,

    /// Largest accepted box (and minimum rectangle) side, in pixels.
    pub max_size: Option<f64>,

    /// Also filter on the minimum-area enclosing rectangle and record its
    /// size as `min_rect_width` / `min_rect_height`.
    pub use_min_rect: bool,
}

impl TraceOptions {
    fn size_ok(&self, width: f64, height: f64) -> bool {
        let above = |v: f64| self.min_size.map_or(true, |min| v >= min);
        let below = |v: f64| self.max_size.map_or(true, |max| v <= max);
        above(width) && above(height) && below(width) && below(height)
    }
}

/// Copy of `mask` inside a one-pixel background frame, so that components
/// touching the image edge still trace as outer borders.
fn padded(mask: &GrayImage) -> GrayImage {
    GrayImage::from_fn(mask.width() + 2, mask.height() + 2, |x, y| {
        if x == 0 || y == 0 || x > mask.width() || y > mask.height() {
            Luma([0])
        } else {
            *mask.get_pixel(x - 1, y - 1)
        }
    })
}

/// Keeps only the border pixels where the walking direction changes.
fn direction_changes(points: &[PixelPoint<i32>]) -> Vec<Point> {
    let n = points.len();
    if n < 3 {
        return points
            .iter()
            .map(|p| Point::new(p.x as f64, p.y as f64))
            .collect();
    }
    (0..n)
        .filter(|&i| {
            let prev = points[(i + n - 1) % n];
            let cur = points[i];
            let next = points[(i + 1) % n];
            (cur.x - prev.x, cur.y - prev.y) != (next.x - cur.x, next.y - cur.y)
        })
        .map(|i| Point::new(points[i].x as f64, points[i].y as f64))
        .collect()
}

/// Traces label rasters into annotation sets.
#[derive(Clone, Debug, Default)]
pub struct ContourTracer<K = GeoKernel> {
    ops: PolygonOps<K>,
    options: TraceOptions,
}

impl ContourTracer<GeoKernel> {
    /// Tracer backed by the default kernel.
    pub fn new(options: TraceOptions) -> Self {
        Self {
            ops: PolygonOps::new(),
            options,
        }
    }
}

impl<K: GeometryKernel> ContourTracer<K> {
    /// Tracer backed by a custom kernel.
    pub fn with_kernel(kernel: K, options: TraceOptions) -> Self {
        Self {
            ops: PolygonOps::with_kernel(kernel),
            options,
        }
    }

    /// The active filters.
    pub fn options(&self) -> &TraceOptions {
        &self.options
    }

    /// Traces a binary mask (non-zero is foreground) into one object per
    /// connected component, each labelled `label`.
    pub fn trace_mask(&self, mask: &GrayImage, label: &str) -> Vec<LocatedObject> {
        let kernel = self.ops.kernel();
        let mut objects = Vec::new();

        for contour in find_contours::<i32>(&padded(mask)) {
            if contour.border_type != BorderType::Outer {
                continue;
            }
            let points: Vec<PixelPoint<i32>> = contour
                .points
                .iter()
                .map(|p| PixelPoint::new(p.x - 1, p.y - 1))
                .collect();
            let Ok(polygon) = Polygon::new(direction_changes(&points)) else {
                continue;
            };

            let shape = match kernel.repair(&polygon) {
                Ok(shape) => shape,
                Err(e) => {
                    warn!("repairing traced '{}' contour failed, skipped: {}", label, e);
                    continue;
                }
            };
            if shape.area <= 0.0 {
                continue;
            }
            let Some(mut object) = self.ops.polygon_to_located_object(&shape, Some(label)) else {
                continue;
            };

            if !self.options.size_ok(object.width, object.height) {
                debug!(
                    "'{}' contour rejected by box size {}x{}",
                    label, object.width, object.height
                );
                continue;
            }

            if self.options.use_min_rect {
                let Some(outline) = object.polygon.as_ref() else {
                    continue;
                };
                let (rect_w, rect_h) = match kernel.min_area_rect(outline) {
                    Ok(size) => size,
                    Err(e) => {
                        warn!("minimum rectangle of '{}' contour failed, skipped: {}", label, e);
                        continue;
                    }
                };
                if !self.options.size_ok(rect_w, rect_h) {
                    debug!(
                        "'{}' contour rejected by minimum rectangle {}x{}",
                        label, rect_w, rect_h
                    );
                    continue;
                }
                object
                    .metadata
                    .insert(MIN_RECT_WIDTH_KEY.to_string(), MetaValue::Float(rect_w));
                object
                    .metadata
                    .insert(MIN_RECT_HEIGHT_KEY.to_string(), MetaValue::Float(rect_h));
            }

            objects.push(object);
        }
        objects
    }

    /// Traces every non-background index of an indexed raster.
    ///
    /// Indices are visited in ascending order. Labels come from `palette`;
    /// an index the palette does not know is labelled with its number.
    pub fn trace_indexed(&self, raster: &GrayImage, palette: Option<&Palette>) -> AnnotationSet {
        let background = self.options.background;
        let indices: BTreeSet<u8> = raster
            .pixels()
            .map(|p| p.0[0])
            .filter(|v| *v != background)
            .collect();

        let mut objects = Vec::new();
        for index in indices {
            let label = palette
                .and_then(|p| p.label_of(index))
                .map(str::to_string)
                .unwrap_or_else(|| index.to_string());
            let mask = GrayImage::from_fn(raster.width(), raster.height(), |x, y| {
                if raster.get_pixel(x, y).0[0] == index {
                    Luma([255])
                } else {
                    Luma([0])
                }
            });
            objects.extend(self.trace_mask(&mask, &label));
        }
        AnnotationSet::absolute(objects)
    }

    /// Traces each layer of a segmentation in label declaration order.
    pub fn trace_layers(&self, segmentation: &ImageSegmentationAnnotations) -> AnnotationSet {
        let objects = segmentation
            .labels()
            .iter()
            .filter_map(|label| segmentation.layer(label).map(|layer| (label, layer)))
            .flat_map(|(label, layer)| self.trace_mask(layer, label))
            .collect();
        AnnotationSet::absolute(objects)
    }
}

/// [`ContourTracer::trace_mask`] with the default kernel.
pub fn trace_mask(mask: &GrayImage, label: &str, options: &TraceOptions) -> Vec<LocatedObject> {
    ContourTracer::new(options.clone()).trace_mask(mask, label)
}

/// Fuzz-only entrypoint: traces raw bytes laid out as rows of `width` pixels.
#[cfg(feature = "fuzzing")]
pub fn fuzz_trace_bytes(width: u32, data: &[u8]) -> usize {
    if width == 0 {
        return 0;
    }
    let height = (data.len() / width as usize) as u32;
    let pixels = data[..(width * height) as usize].to_vec();
    match GrayImage::from_raw(width, height, pixels) {
        Some(raster) => trace_indexed(&raster, None, &TraceOptions::default()).len(),
        None => 0,
    }
}

/// [`ContourTracer::trace_indexed`] with the default kernel.
pub fn trace_indexed(
    raster: &GrayImage,
    palette: Option<&Palette>,
    options: &TraceOptions,
) -> AnnotationSet {
    ContourTracer::new(options.clone()).trace_indexed(raster, palette)
}

/// [`ContourTracer::trace_layers`] with the default kernel.
pub fn trace_layers(
    segmentation: &ImageSegmentationAnnotations,
    options: &TraceOptions,
) -> AnnotationSet {
    ContourTracer::new(options.clone()).trace_layers(segmentation)
}
