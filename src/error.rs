use std::path::PathBuf;
use thiserror::Error;

use crate::geometry::GeometryError;
use crate::validation::ValidationReport;

/// The main error type for labelgeom operations.
#[derive(Debug, Error)]
pub enum LabelGeomError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse IR JSON from {path}: {source}")]
    IrJsonParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to write IR JSON to {path}: {source}")]
    IrJsonWrite {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Image dimensions are required to convert between coordinate spaces")]
    MissingDimensions,

    #[error("Invalid annotation shape: {0}")]
    InvalidAnnotationShape(String),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("{path} is not an 8-bit grayscale index raster (decoded as {color:?})")]
    NotIndexedRaster {
        path: PathBuf,
        color: image::ColorType,
    },

    #[error("Failed to read image size: {0}")]
    ImageSize(#[from] imagesize::ImageError),

    #[error("Record has neither a source path nor an in-memory image")]
    NoImageSource,

    #[error(transparent)]
    Geometry(#[from] GeometryError),

    #[error("Validation failed with {error_count} error(s) and {warning_count} warning(s)")]
    ValidationFailed {
        error_count: usize,
        warning_count: usize,
        report: ValidationReport,
    },

    #[error("Unknown label '{0}' (not in palette)")]
    UnknownLabel(String),
}
