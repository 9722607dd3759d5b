//! Polygon algebra over annotation objects.
//!
//! - [`kernel`]: the [`GeometryKernel`] seam and its `geo`-backed implementation
//! - [`algebra`]: bbox/polygon bridging, IoU, simplification, region fitting
//! - [`merge`]: adjacency-based merging of same-label objects
//!
//! Geometry failures never escape these operations. They are logged with
//! `tracing::warn!` and replaced by a conservative fallback.

pub mod algebra;
pub mod kernel;
pub mod merge;

use thiserror::Error;

pub use algebra::{
    bbox_to_polygon, fit_in_region, intersect_over_union, object_iou, outline,
    polygon_to_located_object, simplify, PolygonOps,
};
pub use kernel::{GeoKernel, GeometryKernel, Segment, Shape};
pub use merge::{merge_polygons, DisjointSet, MergeOptions, PolygonMerger};

/// A failure inside the geometry kernel.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum GeometryError {
    #[error("geometry operation '{operation}' failed: {reason}")]
    OperationFailed {
        operation: &'static str,
        reason: String,
    },

    #[error("degenerate geometry: {0}")]
    Degenerate(String),
}

#[cfg(test)]
pub(crate) mod testing {
    use super::{GeoKernel, GeometryError, GeometryKernel, Segment, Shape};
    use crate::ir::{Point, Polygon};

    /// [`GeoKernel`] with the named operations made to fail.
    pub(crate) struct FailingKernel(pub &'static [&'static str]);

    impl FailingKernel {
        fn check(&self, operation: &'static str) -> Result<(), GeometryError> {
            if self.0.contains(&operation) {
                Err(GeometryError::OperationFailed {
                    operation,
                    reason: "injected".to_string(),
                })
            } else {
                Ok(())
            }
        }
    }

    impl GeometryKernel for FailingKernel {
        fn is_valid(&self, polygon: &Polygon) -> bool {
            GeoKernel.is_valid(polygon)
        }
        fn repair(&self, polygon: &Polygon) -> Result<Shape, GeometryError> {
            self.check("repair")?;
            GeoKernel.repair(polygon)
        }
        fn intersection(&self, a: &Polygon, b: &Polygon) -> Result<Shape, GeometryError> {
            self.check("intersection")?;
            GeoKernel.intersection(a, b)
        }
        fn union(&self, polygons: &[Polygon]) -> Result<Shape, GeometryError> {
            self.check("union")?;
            GeoKernel.union(polygons)
        }
        fn convex_hull(&self, parts: &[Polygon]) -> Result<Polygon, GeometryError> {
            self.check("convex_hull")?;
            GeoKernel.convex_hull(parts)
        }
        fn simplify(&self, polygon: &Polygon, tolerance: f64) -> Result<Vec<Point>, GeometryError> {
            self.check("simplify")?;
            GeoKernel.simplify(polygon, tolerance)
        }
        fn min_area_rect(&self, polygon: &Polygon) -> Result<(f64, f64), GeometryError> {
            self.check("min_area_rect")?;
            GeoKernel.min_area_rect(polygon)
        }
        fn segment_distance(&self, a: Segment, b: Segment) -> f64 {
            GeoKernel.segment_distance(a, b)
        }
    }
}
