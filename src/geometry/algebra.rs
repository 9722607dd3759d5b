//! Bounding box and polygon operations on located objects.
//!
//! All box arithmetic here uses the inclusive pixel-extent convention: an
//! object at `x` with width `w` covers columns `x ..= x + w - 1`, so its
//! outline polygon has its right edge at `x + w - 1`.

use tracing::{debug, warn};

use super::kernel::{GeoKernel, GeometryKernel, Shape};
use crate::ir::{
    LocatedObject, MetaValue, Polygon, REGION_INDEX_KEY, REGION_XYWH_KEY, TYPE_KEY,
};

/// Returns the closed four-corner ring of an object's box:
/// `(x, y), (x+w-1, y), (x+w-1, y+h-1), (x, y+h-1)`.
pub fn bbox_to_polygon(object: &LocatedObject) -> Polygon {
    Polygon::rectangle(
        object.x,
        object.y,
        object.x + object.width - 1.0,
        object.y + object.height - 1.0,
    )
}

/// The object's polygon, or its box ring when it has none.
pub fn outline(object: &LocatedObject) -> Polygon {
    object
        .polygon
        .clone()
        .unwrap_or_else(|| bbox_to_polygon(object))
}

/// Polygon algebra bound to a geometry kernel.
#[derive(Clone, Debug, Default)]
pub struct PolygonOps<K = GeoKernel> {
    kernel: K,
}

impl PolygonOps<GeoKernel> {
    /// Operations backed by the default `geo` kernel.
    pub fn new() -> Self {
        Self { kernel: GeoKernel }
    }
}

impl<K: GeometryKernel> PolygonOps<K> {
    /// Operations backed by a custom kernel.
    pub fn with_kernel(kernel: K) -> Self {
        Self { kernel }
    }

    /// The underlying kernel.
    pub fn kernel(&self) -> &K {
        &self.kernel
    }

    /// Turns a kernel result into a located object.
    ///
    /// Multi-part shapes are collapsed to their convex hull first. The box is
    /// `(minx, miny, maxx - minx + 1, maxy - miny + 1)`. Returns `None` for an
    /// empty shape.
    pub fn polygon_to_located_object(
        &self,
        shape: &Shape,
        label: Option<&str>,
    ) -> Option<LocatedObject> {
        let polygon = match shape.parts.as_slice() {
            [] => return None,
            [single] => single.clone(),
            parts => match self.kernel.convex_hull(parts) {
                Ok(hull) => hull,
                Err(e) => {
                    warn!("convex hull of {} parts failed, using first part: {}", parts.len(), e);
                    parts[0].clone()
                }
            },
        };

        let (x, y, width, height) = polygon.bounds().to_inclusive_xywh();
        let mut object = LocatedObject::new(x, y, width, height).with_polygon(polygon);
        if let Some(label) = label {
            object = object.with_label(label);
        }
        Some(object)
    }

    /// Intersection over union of two polygons.
    ///
    /// Returns `0.0` when they do not overlap or when the kernel fails.
    pub fn intersect_over_union(&self, a: &Polygon, b: &Polygon) -> f64 {
        let intersection = match self.kernel.intersection(a, b) {
            Ok(shape) => shape.area,
            Err(e) => {
                warn!("IoU intersection failed: {}", e);
                return 0.0;
            }
        };
        if intersection <= 0.0 {
            return 0.0;
        }
        match self.kernel.union(&[a.clone(), b.clone()]) {
            Ok(union) if union.area > 0.0 => intersection / union.area,
            Ok(_) => 0.0,
            Err(e) => {
                warn!("IoU union failed: {}", e);
                0.0
            }
        }
    }

    /// IoU of two objects, using each one's polygon or box outline.
    pub fn object_iou(&self, a: &LocatedObject, b: &LocatedObject) -> f64 {
        self.intersect_over_union(&outline(a), &outline(b))
    }

    /// Reduces the vertex count of an object's polygon.
    ///
    /// The polygon is replaced only if the simplified ring is a single valid
    /// polygon with strictly fewer vertices. Box-only objects are returned
    /// unchanged, and so is everything on kernel failure.
    pub fn simplify(&self, object: &LocatedObject, tolerance: f64) -> LocatedObject {
        let Some(polygon) = &object.polygon else {
            return object.clone();
        };

        let points = match self.kernel.simplify(polygon, tolerance) {
            Ok(points) => points,
            Err(e) => {
                warn!("simplify failed, keeping original polygon: {}", e);
                return object.clone();
            }
        };

        let candidate = match Polygon::new(points) {
            Ok(p) if self.kernel.is_valid(&p) && p.len() < polygon.len() => p,
            Ok(p) => {
                debug!(
                    "simplified polygon rejected ({} -> {} points)",
                    polygon.len(),
                    p.len()
                );
                return object.clone();
            }
            Err(_) => {
                debug!("simplified polygon collapsed below 3 points");
                return object.clone();
            }
        };

        let mut simplified = object.clone();
        simplified.polygon = Some(candidate);
        simplified
    }

    /// Fits an object into a region (such as a crop window).
    ///
    /// The object's polygon, or its box if it has none, is intersected with
    /// the region's box and the result is expressed relative to the region's
    /// origin. Returns `None` if nothing of the object lies inside.
    ///
    /// When the polygon intersection has several parts only the first is
    /// kept; the others are dropped. When the kernel fails the object is kept
    /// box-only. With `index` set, `region_index` and `region_xywh` are
    /// written into the metadata.
    pub fn fit_in_region(
        &self,
        region: &LocatedObject,
        object: &LocatedObject,
        index: Option<usize>,
    ) -> Option<LocatedObject> {
        let mut fitted = match &object.polygon {
            Some(polygon) => self.fit_polygon(region, object, polygon)?,
            None => fit_box(region, object)?,
        };

        if let Some(index) = index {
            fitted
                .metadata
                .insert(REGION_INDEX_KEY.to_string(), MetaValue::Int(index as i64));
            fitted.metadata.insert(
                REGION_XYWH_KEY.to_string(),
                MetaValue::Text(format!(
                    "{},{},{},{}",
                    region.x, region.y, region.width, region.height
                )),
            );
        }
        Some(fitted)
    }

    fn fit_polygon(
        &self,
        region: &LocatedObject,
        object: &LocatedObject,
        polygon: &Polygon,
    ) -> Option<LocatedObject> {
        let region_bounds = bbox_to_polygon(region).bounds();
        let bounds = polygon.bounds();
        let inside = bounds.xmin() >= region_bounds.xmin()
            && bounds.ymin() >= region_bounds.ymin()
            && bounds.xmax() <= region_bounds.xmax()
            && bounds.ymax() <= region_bounds.ymax();

        let clipped = if inside {
            polygon.clone()
        } else {
            match self.kernel.intersection(polygon, &bbox_to_polygon(region)) {
                Ok(shape) if shape.area <= 0.0 => return None,
                Ok(shape) => {
                    if shape.is_multi() {
                        debug!(
                            "region intersection has {} parts, keeping the first",
                            shape.parts.len()
                        );
                    }
                    shape.parts.into_iter().next()?
                }
                Err(e) => {
                    warn!("region intersection failed, keeping box only: {}", e);
                    let mut box_only = object.clone();
                    box_only.polygon = None;
                    return fit_box(region, &box_only);
                }
            }
        };

        let relative = clipped.translated(-region.x, -region.y);
        let (x, y, width, height) = relative.bounds().to_inclusive_xywh();
        let mut fitted = object.clone();
        fitted.x = x;
        fitted.y = y;
        fitted.width = width;
        fitted.height = height;
        fitted.polygon = Some(relative);
        Some(fitted)
    }
}

/// Clips an object's box against the region's box with inclusive extents.
fn fit_box(region: &LocatedObject, object: &LocatedObject) -> Option<LocatedObject> {
    let x1 = object.x.max(region.x);
    let y1 = object.y.max(region.y);
    let x2 = (object.x + object.width - 1.0).min(region.x + region.width - 1.0);
    let y2 = (object.y + object.height - 1.0).min(region.y + region.height - 1.0);
    if x2 < x1 || y2 < y1 {
        return None;
    }

    let mut fitted = object.clone();
    fitted.x = x1 - region.x;
    fitted.y = y1 - region.y;
    fitted.width = x2 - x1 + 1.0;
    fitted.height = y2 - y1 + 1.0;
    Some(fitted)
}

/// [`PolygonOps::polygon_to_located_object`] with the default kernel.
pub fn polygon_to_located_object(shape: &Shape, label: Option<&str>) -> Option<LocatedObject> {
    PolygonOps::new().polygon_to_located_object(shape, label)
}

/// [`PolygonOps::intersect_over_union`] with the default kernel.
pub fn intersect_over_union(a: &Polygon, b: &Polygon) -> f64 {
    PolygonOps::new().intersect_over_union(a, b)
}

/// [`PolygonOps::object_iou`] with the default kernel.
pub fn object_iou(a: &LocatedObject, b: &LocatedObject) -> f64 {
    PolygonOps::new().object_iou(a, b)
}

/// [`PolygonOps::simplify`] with the default kernel.
pub fn simplify(object: &LocatedObject, tolerance: f64) -> LocatedObject {
    PolygonOps::new().simplify(object, tolerance)
}

/// [`PolygonOps::fit_in_region`] with the default kernel.
pub fn fit_in_region(
    region: &LocatedObject,
    object: &LocatedObject,
    index: Option<usize>,
) -> Option<LocatedObject> {
    PolygonOps::new().fit_in_region(region, object, index)
}

/// Label of an object for grouping purposes.
pub(crate) fn label_of(object: &LocatedObject) -> Option<&MetaValue> {
    object.metadata.get(TYPE_KEY)
}
