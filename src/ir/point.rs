//! Two-dimensional points.

use serde::{Deserialize, Serialize};

/// A 2D point. Units depend on the owning set's [`CoordSpace`](super::CoordSpace).
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    /// Creates a new point with the given x and y values.
    #[inline]
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Returns true if both coordinates are finite (not NaN or infinite).
    #[inline]
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }

    /// Returns a copy with each coordinate scaled independently.
    #[inline]
    pub fn scaled(&self, sx: f64, sy: f64) -> Self {
        Self::new(self.x * sx, self.y * sy)
    }

    /// Returns a copy shifted by `(dx, dy)`.
    #[inline]
    pub fn translated(&self, dx: f64, dy: f64) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }
}

impl From<(f64, f64)> for Point {
    fn from((x, y): (f64, f64)) -> Self {
        Self::new(x, y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_point_is_finite() {
        assert!(Point::new(10.0, 20.0).is_finite());
        assert!(!Point::new(f64::NAN, 20.0).is_finite());
        assert!(!Point::new(10.0, f64::INFINITY).is_finite());
    }

    #[test]
    fn test_point_scale_and_translate() {
        let p = Point::new(10.0, 20.0);
        assert_eq!(p.scaled(0.5, 0.25), Point::new(5.0, 5.0));
        assert_eq!(p.translated(-10.0, 5.0), Point::new(0.0, 25.0));
    }
}
