//! Record containers: an image plus one annotation payload.
//!
//! The image is described by an [`ImageSource`]: a file path, an in-memory
//! encoded buffer, or both. Pixel dimensions and the decoded image are
//! computed on first access and cached for the lifetime of the source; the
//! path and bytes stay the authoritative data.

use std::path::{Path, PathBuf};

use image::DynamicImage;
use once_cell::sync::OnceCell;
use tracing::debug;

use crate::error::LabelGeomError;
use crate::ir::{AnnotationSet, CoordSpace, DepthInformation, ImageSegmentationAnnotations};
use crate::transform;

/// Where a record's image comes from, with lazily filled caches.
#[derive(Debug, Clone, Default)]
pub struct ImageSource {
    source: Option<PathBuf>,
    bytes: Option<Vec<u8>>,
    dimensions: OnceCell<(u32, u32)>,
    image: OnceCell<DynamicImage>,
}

impl ImageSource {
    /// An image read from disk on demand.
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        Self {
            source: Some(path.into()),
            ..Self::default()
        }
    }

    /// An encoded image held in memory.
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self {
            bytes: Some(bytes),
            ..Self::default()
        }
    }

    /// An already decoded image.
    pub fn from_image(image: DynamicImage) -> Self {
        let source = Self::default();
        let _ = source.dimensions.set((image.width(), image.height()));
        let _ = source.image.set(image);
        source
    }

    /// Attaches an in-memory buffer to a path-backed source.
    pub fn with_bytes(mut self, bytes: Vec<u8>) -> Self {
        self.bytes = Some(bytes);
        self
    }

    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    pub fn bytes(&self) -> Option<&[u8]> {
        self.bytes.as_deref()
    }

    /// Replaces the decoded image cache, e.g. after an image transform.
    pub fn replace_image(&mut self, image: DynamicImage) {
        self.dimensions = OnceCell::with_value((image.width(), image.height()));
        self.image = OnceCell::with_value(image);
    }

    /// Returns `(width, height)` in pixels.
    ///
    /// Reads only the image header when nothing is decoded yet. The result is
    /// cached.
    ///
    /// # Errors
    /// [`LabelGeomError::NoImageSource`] without a path or buffer, or
    /// [`LabelGeomError::ImageSize`] when the header cannot be read.
    pub fn dimensions(&self) -> Result<(u32, u32), LabelGeomError> {
        self.dimensions
            .get_or_try_init(|| {
                if let Some(image) = self.image.get() {
                    return Ok((image.width(), image.height()));
                }
                let size = if let Some(bytes) = &self.bytes {
                    imagesize::blob_size(bytes)?
                } else if let Some(path) = &self.source {
                    debug!("reading image header from {}", path.display());
                    imagesize::size(path)?
                } else {
                    return Err(LabelGeomError::NoImageSource);
                };
                Ok((pixel_count(size.width)?, pixel_count(size.height)?))
            })
            .copied()
    }

    /// Returns the decoded image, decoding it on first access.
    ///
    /// # Errors
    /// [`LabelGeomError::NoImageSource`] without a path or buffer, or
    /// [`LabelGeomError::Image`] when decoding fails.
    pub fn image(&self) -> Result<&DynamicImage, LabelGeomError> {
        self.image.get_or_try_init(|| {
            let image = if let Some(bytes) = &self.bytes {
                image::load_from_memory(bytes)?
            } else if let Some(path) = &self.source {
                debug!("decoding image {}", path.display());
                image::open(path)?
            } else {
                return Err(LabelGeomError::NoImageSource);
            };
            let _ = self.dimensions.set((image.width(), image.height()));
            Ok(image)
        })
    }
}

fn pixel_count(value: usize) -> Result<u32, LabelGeomError> {
    u32::try_from(value).map_err(|_| {
        LabelGeomError::InvalidAnnotationShape(format!("image side of {} pixels is too large", value))
    })
}

/// An image with located objects.
#[derive(Debug, Clone)]
pub struct ObjectDetectionRecord {
    pub image: ImageSource,
    pub annotations: AnnotationSet,
}

impl ObjectDetectionRecord {
    pub fn new(image: ImageSource, annotations: AnnotationSet) -> Self {
        Self { image, annotations }
    }

    /// The annotations in normalized space, using the image's dimensions.
    ///
    /// The image is not touched when the annotations are already normalized.
    pub fn normalized(&self) -> Result<AnnotationSet, LabelGeomError> {
        self.in_space(CoordSpace::Normalized)
    }

    /// The annotations in absolute pixel space, using the image's dimensions.
    pub fn absolute(&self) -> Result<AnnotationSet, LabelGeomError> {
        self.in_space(CoordSpace::Absolute)
    }

    fn in_space(&self, target: CoordSpace) -> Result<AnnotationSet, LabelGeomError> {
        if self.annotations.space == target {
            return Ok(self.annotations.clone());
        }
        let (width, height) = self.image.dimensions()?;
        transform::convert(&self.annotations, target, width, height)
    }
}

/// An image with per-label segmentation layers.
#[derive(Debug, Clone)]
pub struct ImageSegmentationRecord {
    pub image: ImageSource,
    pub annotations: ImageSegmentationAnnotations,
}

impl ImageSegmentationRecord {
    pub fn new(image: ImageSource, annotations: ImageSegmentationAnnotations) -> Self {
        Self { image, annotations }
    }

    /// Checks that the layers have the image's size.
    ///
    /// # Errors
    /// [`LabelGeomError::InvalidAnnotationShape`] on a size mismatch.
    pub fn check_dimensions(&self) -> Result<(), LabelGeomError> {
        match self.annotations.dimensions() {
            None => Ok(()),
            Some(layers) => ensure_same_size("segmentation layers", layers, self.image.dimensions()?),
        }
    }
}

/// An image with a single class label.
#[derive(Debug, Clone)]
pub struct ImageClassificationRecord {
    pub image: ImageSource,
    pub label: String,
}

impl ImageClassificationRecord {
    pub fn new(image: ImageSource, label: impl Into<String>) -> Self {
        Self {
            image,
            label: label.into(),
        }
    }
}

/// An image with a per-pixel depth matrix.
#[derive(Debug, Clone)]
pub struct DepthRecord {
    pub image: ImageSource,
    pub depth: DepthInformation,
}

impl DepthRecord {
    pub fn new(image: ImageSource, depth: DepthInformation) -> Self {
        Self { image, depth }
    }

    /// Checks that the depth matrix has the image's size.
    ///
    /// # Errors
    /// [`LabelGeomError::InvalidAnnotationShape`] on a size mismatch.
    pub fn check_dimensions(&self) -> Result<(), LabelGeomError> {
        ensure_same_size("depth matrix", self.depth.dimensions(), self.image.dimensions()?)
    }
}

fn ensure_same_size(what: &str, found: (u32, u32), image: (u32, u32)) -> Result<(), LabelGeomError> {
    if found == image {
        Ok(())
    } else {
        Err(LabelGeomError::InvalidAnnotationShape(format!(
            "{} is {}x{} but the image is {}x{}",
            what, found.0, found.1, image.0, image.1
        )))
    }
}

/// Any record, tagged by the kind of annotation it carries.
#[derive(Debug, Clone)]
pub enum Record {
    ObjectDetection(ObjectDetectionRecord),
    ImageSegmentation(ImageSegmentationRecord),
    ImageClassification(ImageClassificationRecord),
    Depth(DepthRecord),
}

impl Record {
    pub fn image(&self) -> &ImageSource {
        match self {
            Record::ObjectDetection(r) => &r.image,
            Record::ImageSegmentation(r) => &r.image,
            Record::ImageClassification(r) => &r.image,
            Record::Depth(r) => &r.image,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Record::ObjectDetection(_) => "object_detection",
            Record::ImageSegmentation(_) => "image_segmentation",
            Record::ImageClassification(_) => "image_classification",
            Record::Depth(_) => "depth",
        }
    }
}

impl From<ObjectDetectionRecord> for Record {
    fn from(record: ObjectDetectionRecord) -> Self {
        Record::ObjectDetection(record)
    }
}

impl From<ImageSegmentationRecord> for Record {
    fn from(record: ImageSegmentationRecord) -> Self {
        Record::ImageSegmentation(record)
    }
}

impl From<ImageClassificationRecord> for Record {
    fn from(record: ImageClassificationRecord) -> Self {
        Record::ImageClassification(record)
    }
}

impl From<DepthRecord> for Record {
    fn from(record: DepthRecord) -> Self {
        Record::Depth(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::LocatedObject;
    use image::{GrayImage, ImageFormat};
    use ndarray::Array2;
    use std::io::Cursor;

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let mut buf = Cursor::new(Vec::new());
        GrayImage::new(width, height)
            .write_to(&mut buf, ImageFormat::Png)
            .unwrap();
        buf.into_inner()
    }

    #[test]
    fn test_dimensions_from_bytes() {
        let source = ImageSource::from_bytes(png_bytes(40, 20));
        assert_eq!(source.dimensions().unwrap(), (40, 20));
    }

    #[test]
    fn test_dimensions_are_memoized() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("img.png");
        std::fs::write(&path, png_bytes(8, 6)).unwrap();

        let source = ImageSource::from_path(&path);
        assert_eq!(source.dimensions().unwrap(), (8, 6));
        std::fs::remove_file(&path).unwrap();
        assert_eq!(source.dimensions().unwrap(), (8, 6));
        assert!(source.image().is_err());
    }

    #[test]
    fn test_image_decoded_once() {
        let source = ImageSource::from_bytes(png_bytes(3, 2));
        let first = source.image().unwrap() as *const DynamicImage;
        let second = source.image().unwrap() as *const DynamicImage;
        assert_eq!(first, second);
        assert_eq!(source.dimensions().unwrap(), (3, 2));
    }

    #[test]
    fn test_no_source() {
        let source = ImageSource::default();
        assert!(matches!(source.dimensions(), Err(LabelGeomError::NoImageSource)));
        assert!(matches!(source.image(), Err(LabelGeomError::NoImageSource)));
    }

    #[test]
    fn test_replace_image_resets_dimensions() {
        let mut source = ImageSource::from_bytes(png_bytes(3, 2));
        assert_eq!(source.dimensions().unwrap(), (3, 2));
        source.replace_image(DynamicImage::ImageLuma8(GrayImage::new(5, 5)));
        assert_eq!(source.dimensions().unwrap(), (5, 5));
    }

    #[test]
    fn test_detection_record_spaces() {
        let set = AnnotationSet::absolute(vec![LocatedObject::new(10.0, 5.0, 20.0, 10.0)]);
        let record = ObjectDetectionRecord::new(ImageSource::from_bytes(png_bytes(100, 50)), set);
        let normalized = record.normalized().unwrap();
        assert_eq!(normalized.space, CoordSpace::Normalized);
        assert_eq!(normalized.objects[0].xywh(), (0.1, 0.1, 0.2, 0.2));
        assert_eq!(record.absolute().unwrap(), record.annotations);
    }

    #[test]
    fn test_detection_record_same_space_needs_no_image() {
        let record = ObjectDetectionRecord::new(ImageSource::default(), AnnotationSet::absolute(vec![]));
        assert!(record.absolute().is_ok());
        assert!(matches!(record.normalized(), Err(LabelGeomError::NoImageSource)));
    }

    #[test]
    fn test_depth_dimension_check() {
        let image = ImageSource::from_bytes(png_bytes(4, 3));
        let ok = DepthRecord::new(image.clone(), DepthInformation::U8(Array2::zeros((3, 4))));
        assert!(ok.check_dimensions().is_ok());
        let bad = DepthRecord::new(image, DepthInformation::F32(Array2::zeros((4, 3))));
        assert!(matches!(
            bad.check_dimensions(),
            Err(LabelGeomError::InvalidAnnotationShape(_))
        ));
    }

    #[test]
    fn test_record_kind() {
        let record: Record =
            ImageClassificationRecord::new(ImageSource::from_bytes(png_bytes(1, 1)), "cat").into();
        assert_eq!(record.kind(), "image_classification");
        assert_eq!(record.image().dimensions().unwrap(), (1, 1));
    }
}
