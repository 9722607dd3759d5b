//! Conversion of annotation sets between absolute and normalized space.
//!
//! Every coordinate is divided (or multiplied) by the image width or height
//! on its own axis; polygon points are treated the same way as box corners.
//! Absolute output is rounded to whole pixels.

use crate::error::LabelGeomError;
use crate::ir::{AnnotationSet, CoordSpace, LocatedObject, Point};

fn require_dimensions(width: u32, height: u32) -> Result<(f64, f64), LabelGeomError> {
    if width == 0 || height == 0 {
        return Err(LabelGeomError::MissingDimensions);
    }
    Ok((width as f64, height as f64))
}

fn scale_object(
    object: &LocatedObject,
    fx: impl Fn(f64) -> f64,
    fy: impl Fn(f64) -> f64,
) -> LocatedObject {
    LocatedObject {
        x: fx(object.x),
        y: fy(object.y),
        width: fx(object.width),
        height: fy(object.height),
        polygon: object
            .polygon
            .as_ref()
            .map(|polygon| polygon.map_points(|p| Point::new(fx(p.x), fy(p.y)))),
        metadata: object.metadata.clone(),
    }
}

/// Converts a set to normalized coordinates.
///
/// A set that is already normalized is returned as an unchanged copy.
///
/// # Errors
/// Returns [`LabelGeomError::MissingDimensions`] if the set needs converting
/// and `width` or `height` is zero.
pub fn to_normalized(
    set: &AnnotationSet,
    width: u32,
    height: u32,
) -> Result<AnnotationSet, LabelGeomError> {
    if set.space == CoordSpace::Normalized {
        return Ok(set.clone());
    }
    let (w, h) = require_dimensions(width, height)?;
    let objects = set
        .iter()
        .map(|o| scale_object(o, |v| v / w, |v| v / h))
        .collect();
    Ok(AnnotationSet::normalized(objects))
}

/// Converts a set to absolute pixel coordinates, rounding to whole pixels.
///
/// A set that is already absolute is returned as an unchanged copy.
///
/// # Errors
/// Returns [`LabelGeomError::MissingDimensions`] if the set needs converting
/// and `width` or `height` is zero.
pub fn to_absolute(
    set: &AnnotationSet,
    width: u32,
    height: u32,
) -> Result<AnnotationSet, LabelGeomError> {
    if set.space == CoordSpace::Absolute {
        return Ok(set.clone());
    }
    let (w, h) = require_dimensions(width, height)?;
    let objects = set
        .iter()
        .map(|o| scale_object(o, |v| (v * w).round(), |v| (v * h).round()))
        .collect();
    Ok(AnnotationSet::absolute(objects))
}

/// Converts a set to `target` space.
///
/// # Errors
/// See [`to_normalized`] and [`to_absolute`].
pub fn convert(
    set: &AnnotationSet,
    target: CoordSpace,
    width: u32,
    height: u32,
) -> Result<AnnotationSet, LabelGeomError> {
    match target {
        CoordSpace::Absolute => to_absolute(set, width, height),
        CoordSpace::Normalized => to_normalized(set, width, height),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::Polygon;

    fn sample() -> AnnotationSet {
        AnnotationSet::absolute(vec![LocatedObject::new(64.0, 48.0, 320.0, 240.0)
            .with_polygon(
                Polygon::new(vec![
                    Point::new(64.0, 48.0),
                    Point::new(383.0, 48.0),
                    Point::new(64.0, 287.0),
                ])
                .unwrap(),
            )
            .with_label("person")])
    }

    #[test]
    fn test_to_normalized_scales_each_axis() {
        let normalized = to_normalized(&sample(), 640, 480).unwrap();
        assert_eq!(normalized.space, CoordSpace::Normalized);
        let object = &normalized.objects[0];
        assert_eq!(object.xywh(), (0.1, 0.1, 0.5, 0.5));
        assert_eq!(object.polygon.as_ref().unwrap().points()[0], Point::new(0.1, 0.1));
        assert_eq!(object.label(), Some("person"));
    }

    #[test]
    fn test_roundtrip_restores_pixels() {
        let original = sample();
        let back = to_absolute(&to_normalized(&original, 640, 480).unwrap(), 640, 480).unwrap();
        assert_eq!(back, original);
    }

    #[test]
    fn test_same_space_is_noop_without_dimensions() {
        let set = sample();
        assert_eq!(to_absolute(&set, 0, 0).unwrap(), set);

        let normalized = AnnotationSet::normalized(vec![LocatedObject::new(0.1, 0.1, 0.2, 0.2)]);
        assert_eq!(to_normalized(&normalized, 0, 0).unwrap(), normalized);
    }

    #[test]
    fn test_missing_dimensions() {
        let err = to_normalized(&sample(), 0, 480).unwrap_err();
        assert!(matches!(err, LabelGeomError::MissingDimensions));

        let normalized = AnnotationSet::normalized(vec![]);
        assert!(matches!(
            convert(&normalized, CoordSpace::Absolute, 640, 0),
            Err(LabelGeomError::MissingDimensions)
        ));
    }
}
