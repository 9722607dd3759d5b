//! Polygon rings and their axis-aligned bounds.

use serde::{Deserialize, Serialize};

use super::point::Point;
use crate::error::LabelGeomError;

/// Axis-aligned bounds of a point set (xmin, ymin, xmax, ymax).
///
/// These are raw extremes. Converting them into an inclusive pixel box
/// (`width = xmax - xmin + 1`) is the caller's decision.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Bounds {
    pub min: Point,
    pub max: Point,
}

impl Bounds {
    /// Creates new bounds from explicit extremes.
    #[inline]
    pub fn from_xyxy(xmin: f64, ymin: f64, xmax: f64, ymax: f64) -> Self {
        Self {
            min: Point::new(xmin, ymin),
            max: Point::new(xmax, ymax),
        }
    }

    /// Computes the bounds of a point sequence, or `None` if it is empty.
    pub fn of_points<'a>(points: impl IntoIterator<Item = &'a Point>) -> Option<Self> {
        let mut iter = points.into_iter();
        let first = iter.next()?;
        let mut bounds = Self {
            min: *first,
            max: *first,
        };
        for p in iter {
            bounds.min.x = bounds.min.x.min(p.x);
            bounds.min.y = bounds.min.y.min(p.y);
            bounds.max.x = bounds.max.x.max(p.x);
            bounds.max.y = bounds.max.y.max(p.y);
        }
        Some(bounds)
    }

    #[inline]
    pub fn xmin(&self) -> f64 {
        self.min.x
    }

    #[inline]
    pub fn ymin(&self) -> f64 {
        self.min.y
    }

    #[inline]
    pub fn xmax(&self) -> f64 {
        self.max.x
    }

    #[inline]
    pub fn ymax(&self) -> f64 {
        self.max.y
    }

    /// Span along x (`xmax - xmin`).
    #[inline]
    pub fn width(&self) -> f64 {
        self.max.x - self.min.x
    }

    /// Span along y (`ymax - ymin`).
    #[inline]
    pub fn height(&self) -> f64 {
        self.max.y - self.min.y
    }

    /// Inclusive pixel box `(x, y, w, h)` where `w = xmax - xmin + 1`.
    #[inline]
    pub fn to_inclusive_xywh(&self) -> (f64, f64, f64, f64) {
        (
            self.min.x,
            self.min.y,
            self.width() + 1.0,
            self.height() + 1.0,
        )
    }
}

/// A closed polygon ring with at least three points.
///
/// The first point is implicitly repeated as the last one; an explicit
/// closing point in the input is dropped on construction.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Point>", into = "Vec<Point>")]
pub struct Polygon {
    points: Vec<Point>,
}

impl Polygon {
    /// Creates a polygon from an ordered ring of points.
    ///
    /// # Errors
    /// Returns [`LabelGeomError::InvalidAnnotationShape`] if fewer than three
    /// points remain after removing an explicit closing point.
    pub fn new(mut points: Vec<Point>) -> Result<Self, LabelGeomError> {
        if points.len() > 1 && points.first() == points.last() {
            points.pop();
        }
        if points.len() < 3 {
            return Err(LabelGeomError::InvalidAnnotationShape(format!(
                "polygon needs at least 3 points, got {}",
                points.len()
            )));
        }
        Ok(Self { points })
    }

    /// Creates the four-corner ring of the rectangle spanning
    /// `(xmin, ymin)` to `(xmax, ymax)`, clockwise in image coordinates.
    pub fn rectangle(xmin: f64, ymin: f64, xmax: f64, ymax: f64) -> Self {
        Self {
            points: vec![
                Point::new(xmin, ymin),
                Point::new(xmax, ymin),
                Point::new(xmax, ymax),
                Point::new(xmin, ymax),
            ],
        }
    }

    /// The ring's points, without the implicit closing point.
    #[inline]
    pub fn points(&self) -> &[Point] {
        &self.points
    }

    /// Number of distinct ring vertices.
    #[inline]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Returns true if the ring has no points. Construction requires three
    /// or more, so this is false for every `Polygon`.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Consumes the polygon and returns its points.
    pub fn into_points(self) -> Vec<Point> {
        self.points
    }

    /// Axis-aligned bounds of the ring.
    pub fn bounds(&self) -> Bounds {
        // A polygon always has points, so the fallback is never used.
        Bounds::of_points(&self.points).unwrap_or_default()
    }

    /// Ring edges as `(start, end)` pairs, including the closing edge.
    pub fn edges(&self) -> impl Iterator<Item = (Point, Point)> + '_ {
        let n = self.points.len();
        (0..n).map(move |i| (self.points[i], self.points[(i + 1) % n]))
    }

    /// Unsigned area using the shoelace formula.
    pub fn area(&self) -> f64 {
        let twice: f64 = self
            .edges()
            .map(|(a, b)| a.x * b.y - b.x * a.y)
            .sum();
        twice.abs() / 2.0
    }

    /// Returns true if every point is finite.
    pub fn is_finite(&self) -> bool {
        self.points.iter().all(Point::is_finite)
    }

    /// Applies `f` to every point, keeping ring order.
    pub fn map_points(&self, f: impl Fn(&Point) -> Point) -> Self {
        Self {
            points: self.points.iter().map(f).collect(),
        }
    }

    /// Returns a copy shifted by `(dx, dy)`.
    pub fn translated(&self, dx: f64, dy: f64) -> Self {
        self.map_points(|p| p.translated(dx, dy))
    }
}

impl TryFrom<Vec<Point>> for Polygon {
    type Error = LabelGeomError;

    fn try_from(points: Vec<Point>) -> Result<Self, Self::Error> {
        Polygon::new(points)
    }
}

impl From<Polygon> for Vec<Point> {
    fn from(polygon: Polygon) -> Self {
        polygon.points
    }
}
