//! The geometry kernel seam.
//!
//! Everything in this crate that needs real 2-D polygon algebra goes through
//! [`GeometryKernel`]. [`GeoKernel`] implements it on top of the `geo` crate;
//! a different backend only has to implement the trait.
//!
//! Kernels report failure with [`GeometryError`]; they never panic. The
//! callers in [`algebra`](super::algebra), [`merge`](super::merge) and the
//! raster tracer absorb those errors with a documented fallback.

use std::panic::{catch_unwind, AssertUnwindSafe};

use geo::{
    Area, BooleanOps, ConvexHull, Distance, Euclidean, Intersects, MinimumRotatedRect, Simplify,
};

use super::GeometryError;
use crate::ir::{Point, Polygon};

/// A line segment between two points.
pub type Segment = (Point, Point);

/// The result of a polygon-producing kernel operation.
///
/// `parts` holds the exterior rings of the result in kernel order. `area`
/// is the exact area of the result (holes subtracted), which may be less
/// than the sum of the part areas when the result has holes.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Shape {
    pub parts: Vec<Polygon>,
    pub area: f64,
}

impl Shape {
    /// A single-part shape.
    pub fn single(polygon: Polygon) -> Self {
        let area = polygon.area();
        Self {
            parts: vec![polygon],
            area,
        }
    }

    /// Returns true if the shape has no parts.
    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    /// Returns true if the shape has more than one part.
    pub fn is_multi(&self) -> bool {
        self.parts.len() > 1
    }
}

/// Minimal 2-D polygon algebra needed by the annotation engine.
pub trait GeometryKernel {
    /// Returns true if the ring is a simple polygon with non-zero area.
    fn is_valid(&self, polygon: &Polygon) -> bool;

    /// Repairs a polygon, equivalent to a zero-distance buffer. A valid
    /// polygon comes back unchanged; a degenerate one may come back empty.
    fn repair(&self, polygon: &Polygon) -> Result<Shape, GeometryError>;

    /// Intersection of two polygons.
    fn intersection(&self, a: &Polygon, b: &Polygon) -> Result<Shape, GeometryError>;

    /// Union of any number of polygons.
    fn union(&self, polygons: &[Polygon]) -> Result<Shape, GeometryError>;

    /// Convex hull of all parts.
    fn convex_hull(&self, parts: &[Polygon]) -> Result<Polygon, GeometryError>;

    /// Tolerance-based vertex reduction. The returned ring may be degenerate.
    fn simplify(&self, polygon: &Polygon, tolerance: f64) -> Result<Vec<Point>, GeometryError>;

    /// Minimum-area enclosing rectangle as `(width, height)`, where width is
    /// the side along the rectangle's first edge.
    fn min_area_rect(&self, polygon: &Polygon) -> Result<(f64, f64), GeometryError>;

    /// Shortest distance between two segments.
    fn segment_distance(&self, a: Segment, b: Segment) -> f64;
}

/// [`GeometryKernel`] backed by the `geo` crate.
#[derive(Clone, Copy, Debug, Default)]
pub struct GeoKernel;

fn to_geo(polygon: &Polygon) -> geo::Polygon<f64> {
    let coords: Vec<geo::Coord<f64>> = polygon
        .points()
        .iter()
        .map(|p| geo::Coord { x: p.x, y: p.y })
        .collect();
    geo::Polygon::new(geo::LineString::new(coords), vec![])
}

fn ring_from_geo(ring: &geo::LineString<f64>) -> Vec<Point> {
    ring.coords().map(|c| Point::new(c.x, c.y)).collect()
}

fn shape_from_geo(result: geo::MultiPolygon<f64>) -> Shape {
    let area = result.unsigned_area();
    let parts = result
        .0
        .iter()
        .filter(|p| p.unsigned_area() > 0.0)
        .filter_map(|p| Polygon::new(ring_from_geo(p.exterior())).ok())
        .collect();
    Shape { parts, area }
}

fn to_geo_segment((start, end): Segment) -> geo::Line<f64> {
    geo::Line::new(
        geo::Coord {
            x: start.x,
            y: start.y,
        },
        geo::Coord { x: end.x, y: end.y },
    )
}

/// Drops consecutive duplicate points, including a trailing copy of the first.
fn dedup_ring(points: &[Point]) -> Vec<Point> {
    let mut out: Vec<Point> = Vec::with_capacity(points.len());
    for p in points {
        if out.last() != Some(p) {
            out.push(*p);
        }
    }
    while out.len() > 1 && out.first() == out.last() {
        out.pop();
    }
    out
}

/// Runs a `geo` call, converting a panic inside it into an error.
fn guarded<T>(operation: &'static str, f: impl FnOnce() -> T) -> Result<T, GeometryError> {
    catch_unwind(AssertUnwindSafe(f)).map_err(|payload| {
        let reason = payload
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "unknown panic".to_string());
        GeometryError::OperationFailed { operation, reason }
    })
}

fn check_finite(operation: &'static str, polygon: &Polygon) -> Result<(), GeometryError> {
    if polygon.is_finite() {
        Ok(())
    } else {
        Err(GeometryError::OperationFailed {
            operation,
            reason: "non-finite coordinates".to_string(),
        })
    }
}

impl GeometryKernel for GeoKernel {
    fn is_valid(&self, polygon: &Polygon) -> bool {
        if !polygon.is_finite() {
            return false;
        }
        let ring = dedup_ring(polygon.points());
        let n = ring.len();
        if n < 3 {
            return false;
        }
        if to_geo(polygon).unsigned_area() <= 0.0 {
            return false;
        }
        let edges: Vec<geo::Line<f64>> = (0..n)
            .map(|i| to_geo_segment((ring[i], ring[(i + 1) % n])))
            .collect();
        for i in 0..n {
            for j in (i + 2)..n {
                if i == 0 && j == n - 1 {
                    continue;
                }
                if edges[i].intersects(&edges[j]) {
                    return false;
                }
            }
        }
        true
    }

    fn repair(&self, polygon: &Polygon) -> Result<Shape, GeometryError> {
        check_finite("repair", polygon)?;
        if self.is_valid(polygon) {
            return Ok(Shape::single(polygon.clone()));
        }
        let ring = dedup_ring(polygon.points());
        let Ok(ring) = Polygon::new(ring) else {
            return Ok(Shape::default());
        };
        let input = geo::MultiPolygon::new(vec![to_geo(&ring)]);
        let empty = geo::MultiPolygon::<f64>::new(vec![]);
        guarded("repair", || input.union(&empty)).map(shape_from_geo)
    }

    fn intersection(&self, a: &Polygon, b: &Polygon) -> Result<Shape, GeometryError> {
        check_finite("intersection", a)?;
        check_finite("intersection", b)?;
        let (ga, gb) = (to_geo(a), to_geo(b));
        guarded("intersection", || ga.intersection(&gb)).map(shape_from_geo)
    }

    fn union(&self, polygons: &[Polygon]) -> Result<Shape, GeometryError> {
        for polygon in polygons {
            check_finite("union", polygon)?;
        }
        let inputs: Vec<geo::MultiPolygon<f64>> = polygons
            .iter()
            .map(|p| geo::MultiPolygon::new(vec![to_geo(p)]))
            .collect();
        guarded("union", || {
            inputs
                .iter()
                .fold(geo::MultiPolygon::<f64>::new(vec![]), |acc, next| {
                    acc.union(next)
                })
        })
        .map(shape_from_geo)
    }

    fn convex_hull(&self, parts: &[Polygon]) -> Result<Polygon, GeometryError> {
        let multi = geo::MultiPolygon::new(parts.iter().map(to_geo).collect());
        let hull = guarded("convex_hull", || multi.convex_hull())?;
        Polygon::new(ring_from_geo(hull.exterior()))
            .map_err(|e| GeometryError::Degenerate(format!("convex hull: {}", e)))
    }

    fn simplify(&self, polygon: &Polygon, tolerance: f64) -> Result<Vec<Point>, GeometryError> {
        check_finite("simplify", polygon)?;
        let input = to_geo(polygon);
        let simplified = guarded("simplify", || input.simplify(&tolerance))?;
        Ok(dedup_ring(&ring_from_geo(simplified.exterior())))
    }

    fn min_area_rect(&self, polygon: &Polygon) -> Result<(f64, f64), GeometryError> {
        check_finite("min_area_rect", polygon)?;
        let input = to_geo(polygon);
        let rect = guarded("min_area_rect", || input.minimum_rotated_rect())?
            .ok_or_else(|| GeometryError::Degenerate("no minimum rectangle".to_string()))?;
        let corners = ring_from_geo(rect.exterior());
        if corners.len() < 3 {
            return Err(GeometryError::Degenerate(
                "minimum rectangle has fewer than 3 corners".to_string(),
            ));
        }
        let side = |a: Point, b: Point| ((b.x - a.x).powi(2) + (b.y - a.y).powi(2)).sqrt();
        Ok((side(corners[0], corners[1]), side(corners[1], corners[2])))
    }

    fn segment_distance(&self, a: Segment, b: Segment) -> f64 {
        Euclidean::distance(&to_geo_segment(a), &to_geo_segment(b))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rect(xmin: f64, ymin: f64, xmax: f64, ymax: f64) -> Polygon {
        Polygon::rectangle(xmin, ymin, xmax, ymax)
    }

    fn bowtie() -> Polygon {
        Polygon::new(vec![
            Point::new(0.0, 0.0),
            Point::new(10.0, 10.0),
            Point::new(10.0, 0.0),
            Point::new(0.0, 10.0),
        ])
        .unwrap()
    }

    #[test]
    fn test_validity() {
        let kernel = GeoKernel;
        assert!(kernel.is_valid(&rect(0.0, 0.0, 10.0, 10.0)));
        assert!(!kernel.is_valid(&bowtie()));

        let collinear = Polygon::new(vec![
            Point::new(0.0, 0.0),
            Point::new(1.0, 0.0),
            Point::new(2.0, 0.0),
        ])
        .unwrap();
        assert!(!kernel.is_valid(&collinear));
    }

    #[test]
    fn test_repair_keeps_valid_polygon() {
        let kernel = GeoKernel;
        let square = rect(0.0, 0.0, 4.0, 4.0);
        let repaired = kernel.repair(&square).unwrap();
        assert_eq!(repaired.parts, vec![square]);
        assert_eq!(repaired.area, 16.0);
    }

    #[test]
    fn test_repair_collinear_is_empty() {
        let kernel = GeoKernel;
        let collinear = Polygon::new(vec![
            Point::new(0.0, 0.0),
            Point::new(1.0, 0.0),
            Point::new(2.0, 0.0),
        ])
        .unwrap();
        let repaired = kernel.repair(&collinear).unwrap();
        assert_eq!(repaired.area, 0.0);
        assert!(repaired.is_empty());
    }

    #[test]
    fn test_intersection_and_union_areas() {
        let kernel = GeoKernel;
        let a = rect(0.0, 0.0, 10.0, 10.0);
        let b = rect(5.0, 0.0, 15.0, 10.0);
        assert!((kernel.intersection(&a, &b).unwrap().area - 50.0).abs() < 1e-9);

        let union = kernel.union(&[a, b]).unwrap();
        assert!((union.area - 150.0).abs() < 1e-9);
        assert_eq!(union.parts.len(), 1);
    }

    #[test]
    fn test_union_of_disjoint_is_multi() {
        let kernel = GeoKernel;
        let union = kernel
            .union(&[rect(0.0, 0.0, 1.0, 1.0), rect(5.0, 5.0, 6.0, 6.0)])
            .unwrap();
        assert!(union.is_multi());
    }

    #[test]
    fn test_non_finite_input_is_an_error() {
        let kernel = GeoKernel;
        let bad = Polygon::new(vec![
            Point::new(0.0, 0.0),
            Point::new(f64::NAN, 0.0),
            Point::new(1.0, 1.0),
        ])
        .unwrap();
        assert!(kernel.intersection(&bad, &rect(0.0, 0.0, 1.0, 1.0)).is_err());
        assert!(kernel.repair(&bad).is_err());
    }

    #[test]
    fn test_min_area_rect_of_axis_aligned_box() {
        let kernel = GeoKernel;
        let (w, h) = kernel.min_area_rect(&rect(0.0, 0.0, 8.0, 2.0)).unwrap();
        let (short, long) = (w.min(h), w.max(h));
        assert!((short - 2.0).abs() < 1e-9);
        assert!((long - 8.0).abs() < 1e-9);
    }

    #[test]
    fn test_segment_distance() {
        let kernel = GeoKernel;
        let a = (Point::new(0.0, 0.0), Point::new(10.0, 0.0));
        let b = (Point::new(0.0, 1.0), Point::new(10.0, 1.0));
        assert!((kernel.segment_distance(a, b) - 1.0).abs() < 1e-12);

        let crossing = (Point::new(5.0, -1.0), Point::new(5.0, 1.0));
        assert_eq!(kernel.segment_distance(a, crossing), 0.0);

        let offset = (Point::new(13.0, 4.0), Point::new(20.0, 4.0));
        assert!((kernel.segment_distance(a, offset) - 5.0).abs() < 1e-12);
    }
}
