//! Per-label segmentation layers.

use image::GrayImage;
use std::collections::BTreeMap;

use crate::error::LabelGeomError;
use crate::raster::{self, Palette};

/// Segmentation annotations for one image.
///
/// `labels` declares every known label, including ones with no pixels.
/// `layers` holds one binary raster per label (`0` background, non-zero
/// foreground). A declared label without a layer is an empty layer.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ImageSegmentationAnnotations {
    labels: Vec<String>,
    layers: BTreeMap<String, GrayImage>,
}

impl ImageSegmentationAnnotations {
    /// Creates segmentation annotations, checking that every layer belongs
    /// to a declared label and that all layers share one size.
    ///
    /// # Errors
    /// Returns [`LabelGeomError::InvalidAnnotationShape`] on an undeclared
    /// layer label or mismatched layer sizes.
    pub fn new(
        labels: Vec<String>,
        layers: BTreeMap<String, GrayImage>,
    ) -> Result<Self, LabelGeomError> {
        let mut dims: Option<(u32, u32)> = None;
        for (label, layer) in &layers {
            if !labels.contains(label) {
                return Err(LabelGeomError::InvalidAnnotationShape(format!(
                    "layer '{}' is not among the declared labels",
                    label
                )));
            }
            match dims {
                None => dims = Some(layer.dimensions()),
                Some(expected) if expected != layer.dimensions() => {
                    return Err(LabelGeomError::InvalidAnnotationShape(format!(
                        "layer '{}' is {}x{}, expected {}x{}",
                        label,
                        layer.width(),
                        layer.height(),
                        expected.0,
                        expected.1
                    )));
                }
                Some(_) => {}
            }
        }
        Ok(Self { labels, layers })
    }

    /// Creates annotations with declared labels and no layers.
    pub fn empty(labels: Vec<String>) -> Self {
        Self {
            labels,
            layers: BTreeMap::new(),
        }
    }

    /// All declared labels, in declaration order.
    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// All present layers.
    pub fn layers(&self) -> &BTreeMap<String, GrayImage> {
        &self.layers
    }

    /// The layer for `label`, or `None` when the label is empty or unknown.
    pub fn layer(&self, label: &str) -> Option<&GrayImage> {
        self.layers.get(label)
    }

    /// Size shared by the layers, if any layer is present.
    pub fn dimensions(&self) -> Option<(u32, u32)> {
        self.layers.values().next().map(GrayImage::dimensions)
    }

    /// Returns a copy with `layer` set for `label`.
    ///
    /// # Errors
    /// Same checks as [`ImageSegmentationAnnotations::new`].
    pub fn with_layer(&self, label: &str, layer: GrayImage) -> Result<Self, LabelGeomError> {
        let mut layers = self.layers.clone();
        layers.insert(label.to_string(), layer);
        Self::new(self.labels.clone(), layers)
    }

    /// Flattens the layers into one indexed raster; see
    /// [`crate::raster::layers_to_indexed`].
    pub fn to_indexed(&self, palette: &Palette) -> Result<GrayImage, LabelGeomError> {
        raster::layers_to_indexed(self, palette, None)
    }

    /// Splits an indexed raster into layers; see
    /// [`crate::raster::indexed_to_layers`].
    pub fn from_indexed(indexed: &GrayImage, palette: &Palette) -> Result<Self, LabelGeomError> {
        raster::indexed_to_layers(indexed, palette)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_undeclared_layer_rejected() {
        let mut layers = BTreeMap::new();
        layers.insert("cat".to_string(), GrayImage::new(4, 4));
        let err = ImageSegmentationAnnotations::new(vec!["dog".into()], layers).unwrap_err();
        assert!(matches!(err, LabelGeomError::InvalidAnnotationShape(_)));
    }

    #[test]
    fn test_layer_size_mismatch_rejected() {
        let mut layers = BTreeMap::new();
        layers.insert("cat".to_string(), GrayImage::new(4, 4));
        layers.insert("dog".to_string(), GrayImage::new(5, 4));
        let result = ImageSegmentationAnnotations::new(vec!["cat".into(), "dog".into()], layers);
        assert!(result.is_err());
    }

    #[test]
    fn test_declared_label_without_layer_is_empty() {
        let seg = ImageSegmentationAnnotations::empty(vec!["road".into()]);
        assert!(seg.layer("road").is_none());
        assert_eq!(seg.labels(), ["road".to_string()]);
        assert_eq!(seg.dimensions(), None);
    }
}
