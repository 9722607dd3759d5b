//! Rasterization: polygons to label rasters.
//!
//! Objects are painted in set order, so later objects overwrite earlier ones
//! where they overlap. An object without a polygon is painted as its box.

use image::{GrayImage, Luma};
use imageproc::drawing::{draw_line_segment_mut, draw_polygon_mut};
use imageproc::point::Point as PixelPoint;
use std::collections::BTreeMap;
use tracing::warn;

use crate::error::LabelGeomError;
use crate::geometry::outline;
use crate::ir::{AnnotationSet, ImageSegmentationAnnotations, LocatedObject, Point, Polygon};
use crate::raster::Palette;
use crate::transform;

/// Foreground value of binary layers.
pub const LAYER_FOREGROUND: u8 = 255;

/// Paints a ring of pixel-space points, including its boundary pixels.
fn fill_ring(image: &mut GrayImage, ring: &[Point], value: u8) {
    let mut points: Vec<PixelPoint<i32>> = Vec::with_capacity(ring.len());
    for p in ring {
        let pixel = PixelPoint::new(p.x.round() as i32, p.y.round() as i32);
        if points.last() != Some(&pixel) {
            points.push(pixel);
        }
    }
    while points.len() > 1 && points.first() == points.last() {
        points.pop();
    }

    let color = Luma([value]);
    match points.as_slice() {
        [] => {}
        [p] => {
            if p.x >= 0 && p.y >= 0 && (p.x as u32) < image.width() && (p.y as u32) < image.height() {
                image.put_pixel(p.x as u32, p.y as u32, color);
            }
        }
        [a, b] => draw_line_segment_mut(
            image,
            (a.x as f32, a.y as f32),
            (b.x as f32, b.y as f32),
            color,
        ),
        _ => draw_polygon_mut(image, &points, color),
    }
}

/// Clips a ring to one half-plane, given as an inside test and the crossing
/// point of an edge with the boundary.
fn clip_ring(
    ring: &[Point],
    inside: impl Fn(&Point) -> bool,
    crossing: impl Fn(&Point, &Point) -> Point,
) -> Vec<Point> {
    let mut out = Vec::with_capacity(ring.len() + 2);
    for (i, current) in ring.iter().enumerate() {
        let previous = &ring[(i + ring.len() - 1) % ring.len()];
        match (inside(previous), inside(current)) {
            (true, true) => out.push(*current),
            (true, false) => out.push(crossing(previous, current)),
            (false, true) => {
                out.push(crossing(previous, current));
                out.push(*current);
            }
            (false, false) => {}
        }
    }
    out
}

/// Sutherland-Hodgman clip of a ring to `[-1, xmax] x [-1, ymax]`.
fn clip_to_frame(ring: &[Point], xmax: f64, ymax: f64) -> Vec<Point> {
    let at_x = |edge: f64| {
        move |a: &Point, b: &Point| {
            let t = (edge - a.x) / (b.x - a.x);
            Point::new(edge, a.y + t * (b.y - a.y))
        }
    };
    let at_y = |edge: f64| {
        move |a: &Point, b: &Point| {
            let t = (edge - a.y) / (b.y - a.y);
            Point::new(a.x + t * (b.x - a.x), edge)
        }
    };
    let ring = clip_ring(ring, |p| p.x >= -1.0, at_x(-1.0));
    let ring = clip_ring(&ring, |p| p.x <= xmax, at_x(xmax));
    let ring = clip_ring(&ring, |p| p.y >= -1.0, at_y(-1.0));
    clip_ring(&ring, |p| p.y <= ymax, at_y(ymax))
}

/// Fills a polygon, including its boundary pixels.
///
/// Outlines reaching past the one-pixel frame around the image are clipped
/// to that frame first; the clipped edges then lie outside the image.
fn fill_polygon(image: &mut GrayImage, polygon: &Polygon, value: u8) {
    let (xmax, ymax) = (image.width() as f64, image.height() as f64);
    let in_frame = |p: &Point| (-1.0..=xmax).contains(&p.x) && (-1.0..=ymax).contains(&p.y);
    if polygon.points().iter().all(in_frame) {
        fill_ring(image, polygon.points(), value);
        return;
    }
    if !polygon.is_finite() {
        warn!("outline with non-finite coordinates, not painted");
        return;
    }
    fill_ring(image, &clip_to_frame(polygon.points(), xmax, ymax), value);
}

fn absolute_set(set: &AnnotationSet, width: u32, height: u32) -> Result<AnnotationSet, LabelGeomError> {
    if width == 0 || height == 0 {
        return Err(LabelGeomError::MissingDimensions);
    }
    transform::to_absolute(set, width, height)
}

fn object_label(object: &LocatedObject) -> Option<&str> {
    let label = object.label();
    if label.is_none() {
        warn!("object at ({}, {}) has no label, not painted", object.x, object.y);
    }
    label
}

/// Paints a set into a single indexed raster.
///
/// The raster starts filled with the palette's background index; each
/// object is painted with its label's index. Objects whose label is not in
/// the palette are skipped with a warning. Normalized sets are converted
/// to pixels first.
///
/// # Errors
/// Returns [`LabelGeomError::MissingDimensions`] if `width` or `height` is zero.
pub fn rasterize_indexed(
    set: &AnnotationSet,
    palette: &Palette,
    width: u32,
    height: u32,
) -> Result<GrayImage, LabelGeomError> {
    let set = absolute_set(set, width, height)?;
    let mut raster = GrayImage::from_pixel(width, height, Luma([palette.background()]));

    for object in &set {
        let Some(label) = object_label(object) else {
            continue;
        };
        let Some(index) = palette.index_of(label) else {
            warn!("label '{}' is not in the palette, not painted", label);
            continue;
        };
        fill_polygon(&mut raster, &outline(object), index);
    }
    Ok(raster)
}

/// Paints a set into one binary layer per label.
///
/// `labels` declares the segmentation's labels; a label without objects
/// gets no layer. Objects with undeclared labels are skipped with a warning.
///
/// # Errors
/// Returns [`LabelGeomError::MissingDimensions`] if `width` or `height` is zero.
pub fn rasterize_layers(
    set: &AnnotationSet,
    labels: &[String],
    width: u32,
    height: u32,
) -> Result<ImageSegmentationAnnotations, LabelGeomError> {
    let set = absolute_set(set, width, height)?;
    let mut layers: BTreeMap<String, GrayImage> = BTreeMap::new();

    for object in &set {
        let Some(label) = object_label(object) else {
            continue;
        };
        if !labels.iter().any(|l| l == label) {
            warn!("label '{}' is not declared, not painted", label);
            continue;
        }
        let layer = layers
            .entry(label.to_string())
            .or_insert_with(|| GrayImage::new(width, height));
        fill_polygon(layer, &outline(object), LAYER_FOREGROUND);
    }

    ImageSegmentationAnnotations::new(labels.to_vec(), layers)
}

/// Flattens binary layers into one indexed raster.
///
/// Layers are applied in label declaration order, so later labels win where
/// layers overlap.
///
/// # Errors
/// Returns [`LabelGeomError::UnknownLabel`] for a layer whose label is not in
/// the palette, and [`LabelGeomError::MissingDimensions`] when there are no
/// layers and `fallback_size` is `None`.
pub fn layers_to_indexed(
    segmentation: &ImageSegmentationAnnotations,
    palette: &Palette,
    fallback_size: Option<(u32, u32)>,
) -> Result<GrayImage, LabelGeomError> {
    let (width, height) = segmentation
        .dimensions()
        .or(fallback_size)
        .ok_or(LabelGeomError::MissingDimensions)?;
    let mut raster = GrayImage::from_pixel(width, height, Luma([palette.background()]));

    for label in segmentation.labels() {
        let Some(layer) = segmentation.layer(label) else {
            continue;
        };
        let index = palette
            .index_of(label)
            .ok_or_else(|| LabelGeomError::UnknownLabel(label.clone()))?;
        for (x, y, pixel) in layer.enumerate_pixels() {
            if pixel.0[0] != 0 {
                raster.put_pixel(x, y, Luma([index]));
            }
        }
    }
    Ok(raster)
}

/// Splits an indexed raster into one binary layer per palette label.
///
/// Every palette label is declared; only labels with pixels get a layer.
/// Indices missing from the palette are ignored.
pub fn indexed_to_layers(
    raster: &GrayImage,
    palette: &Palette,
) -> Result<ImageSegmentationAnnotations, LabelGeomError> {
    let mut layers: BTreeMap<String, GrayImage> = BTreeMap::new();
    for (x, y, pixel) in raster.enumerate_pixels() {
        let index = pixel.0[0];
        if index == palette.background() {
            continue;
        }
        let Some(label) = palette.label_of(index) else {
            continue;
        };
        layers
            .entry(label.to_string())
            .or_insert_with(|| GrayImage::new(raster.width(), raster.height()))
            .put_pixel(x, y, Luma([LAYER_FOREGROUND]));
    }
    ImageSegmentationAnnotations::new(palette.labels(), layers)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn count(raster: &GrayImage, value: u8) -> usize {
        raster.pixels().filter(|p| p.0[0] == value).count()
    }

    #[test]
    fn test_box_is_painted_inclusively() {
        let set = AnnotationSet::absolute(vec![LocatedObject::new(2.0, 3.0, 4.0, 5.0).with_label("x")]);
        let palette = Palette::from_labels(["x"], 0).unwrap();
        let raster = rasterize_indexed(&set, &palette, 20, 20).unwrap();
        assert_eq!(count(&raster, 1), 20);
        assert_eq!(raster.get_pixel(2, 3).0[0], 1);
        assert_eq!(raster.get_pixel(5, 7).0[0], 1);
        assert_eq!(raster.get_pixel(6, 7).0[0], 0);
    }

    #[test]
    fn test_last_object_wins() {
        let set = AnnotationSet::absolute(vec![
            LocatedObject::new(0.0, 0.0, 10.0, 10.0).with_label("a"),
            LocatedObject::new(5.0, 5.0, 10.0, 10.0).with_label("b"),
        ]);
        let palette = Palette::from_labels(["a", "b"], 0).unwrap();
        let raster = rasterize_indexed(&set, &palette, 20, 20).unwrap();
        assert_eq!(raster.get_pixel(7, 7).0[0], 2);
        assert_eq!(raster.get_pixel(2, 2).0[0], 1);
    }

    #[test]
    fn test_unknown_and_unlabelled_objects_skipped() {
        let set = AnnotationSet::absolute(vec![
            LocatedObject::new(0.0, 0.0, 5.0, 5.0).with_label("ghost"),
            LocatedObject::new(0.0, 0.0, 5.0, 5.0),
        ]);
        let palette = Palette::from_labels(["x"], 0).unwrap();
        let raster = rasterize_indexed(&set, &palette, 10, 10).unwrap();
        assert_eq!(count(&raster, 0), 100);
    }

    #[test]
    fn test_background_fill() {
        let palette = Palette::from_labels(["x"], 9).unwrap();
        let raster = rasterize_indexed(&AnnotationSet::default(), &palette, 4, 4).unwrap();
        assert_eq!(count(&raster, 9), 16);
    }

    #[test]
    fn test_missing_dimensions() {
        let palette = Palette::from_labels(["x"], 0).unwrap();
        assert!(matches!(
            rasterize_indexed(&AnnotationSet::default(), &palette, 0, 4),
            Err(LabelGeomError::MissingDimensions)
        ));
    }

    #[test]
    fn test_degenerate_polygon_does_not_panic() {
        let sliver = Polygon::new(vec![
            Point::new(3.0, 3.0),
            Point::new(3.2, 3.1),
            Point::new(2.9, 3.0),
        ])
        .unwrap();
        let set = AnnotationSet::absolute(vec![LocatedObject::new(3.0, 3.0, 1.0, 1.0)
            .with_polygon(sliver)
            .with_label("x")]);
        let palette = Palette::from_labels(["x"], 0).unwrap();
        let raster = rasterize_indexed(&set, &palette, 8, 8).unwrap();
        assert_eq!(raster.get_pixel(3, 3).0[0], 1);
    }

    #[test]
    fn test_huge_box_is_clipped_to_the_image() {
        let set = AnnotationSet::absolute(vec![
            LocatedObject::new(-3e9, -3e9, 6e9, 6e9).with_label("x")
        ]);
        let palette = Palette::from_labels(["x"], 0).unwrap();
        let raster = rasterize_indexed(&set, &palette, 10, 10).unwrap();
        assert_eq!(count(&raster, 1), 100);
    }

    #[test]
    fn test_partly_outside_box_paints_visible_part() {
        let set = AnnotationSet::absolute(vec![
            LocatedObject::new(-5.0, -5.0, 10.0, 10.0).with_label("x"),
            LocatedObject::new(-100.0, 7.0, 300.0, 1.0).with_label("x"),
        ]);
        let palette = Palette::from_labels(["x"], 0).unwrap();
        let raster = rasterize_indexed(&set, &palette, 10, 10).unwrap();
        assert_eq!(count(&raster, 1), 25 + 10);
        assert_eq!(raster.get_pixel(4, 4).0[0], 1);
        assert_eq!(raster.get_pixel(5, 5).0[0], 0);
        assert_eq!(raster.get_pixel(9, 7).0[0], 1);
    }

    #[test]
    fn test_clip_to_frame_cuts_triangle() {
        let ring = [Point::new(0.0, 0.0), Point::new(20.0, 0.0), Point::new(0.0, 20.0)];
        let clipped = clip_to_frame(&ring, 10.0, 10.0);
        assert!(clipped.iter().all(|p| p.x <= 10.0 && p.y <= 10.0));
        assert!(clipped.contains(&Point::new(10.0, 0.0)));
        assert!(clipped.contains(&Point::new(10.0, 10.0)));
        assert!(clipped.contains(&Point::new(0.0, 10.0)));
    }

    #[test]
    fn test_non_finite_outline_is_skipped() {
        let set = AnnotationSet::absolute(vec![
            LocatedObject::new(f64::NAN, 0.0, 4.0, 4.0).with_label("x")
        ]);
        let palette = Palette::from_labels(["x"], 0).unwrap();
        let raster = rasterize_indexed(&set, &palette, 8, 8).unwrap();
        assert_eq!(count(&raster, 0), 64);
    }

    #[test]
    fn test_layers_declare_all_labels() {
        let set = AnnotationSet::absolute(vec![LocatedObject::new(1.0, 1.0, 3.0, 3.0).with_label("a")]);
        let labels = vec!["a".to_string(), "b".to_string()];
        let seg = rasterize_layers(&set, &labels, 8, 8).unwrap();
        assert_eq!(seg.labels(), labels.as_slice());
        assert_eq!(count(seg.layer("a").unwrap(), LAYER_FOREGROUND), 9);
        assert!(seg.layer("b").is_none());
    }

    #[test]
    fn test_layers_indexed_roundtrip() {
        let set = AnnotationSet::absolute(vec![
            LocatedObject::new(0.0, 0.0, 4.0, 4.0).with_label("a"),
            LocatedObject::new(6.0, 6.0, 2.0, 2.0).with_label("b"),
        ]);
        let palette = Palette::from_labels(["a", "b"], 0).unwrap();
        let indexed = rasterize_indexed(&set, &palette, 10, 10).unwrap();
        let seg = indexed_to_layers(&indexed, &palette).unwrap();
        assert_eq!(count(seg.layer("a").unwrap(), LAYER_FOREGROUND), 16);
        assert_eq!(count(seg.layer("b").unwrap(), LAYER_FOREGROUND), 4);

        let flattened = layers_to_indexed(&seg, &palette, None).unwrap();
        assert_eq!(flattened, indexed);
    }

    #[test]
    fn test_layers_to_indexed_unknown_label() {
        let mut layers = BTreeMap::new();
        layers.insert("z".to_string(), GrayImage::from_pixel(2, 2, Luma([255])));
        let seg = ImageSegmentationAnnotations::new(vec!["z".into()], layers).unwrap();
        let palette = Palette::from_labels(["a"], 0).unwrap();
        assert!(matches!(
            layers_to_indexed(&seg, &palette, None),
            Err(LabelGeomError::UnknownLabel(_))
        ));
    }
}
