//! JSON serialization for annotation sets.
//!
//! This is the crate's own exchange format, useful for:
//! - Feeding the CLI and the fuzz targets
//! - Debugging geometry operations by inspecting their input and output

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use super::set::AnnotationSet;
use crate::error::LabelGeomError;

/// Reads an annotation set from a JSON file.
///
/// # Errors
/// Returns an error if the file cannot be read or parsed.
pub fn read_ir_json(path: &Path) -> Result<AnnotationSet, LabelGeomError> {
    let file = File::open(path).map_err(LabelGeomError::Io)?;
    let reader = BufReader::new(file);

    serde_json::from_reader(reader).map_err(|source| LabelGeomError::IrJsonParse {
        path: path.to_path_buf(),
        source,
    })
}

/// Writes an annotation set to a JSON file.
///
/// # Errors
/// Returns an error if the file cannot be written.
pub fn write_ir_json(path: &Path, set: &AnnotationSet) -> Result<(), LabelGeomError> {
    let file = File::create(path).map_err(LabelGeomError::Io)?;
    let writer = BufWriter::new(file);

    serde_json::to_writer_pretty(writer, set).map_err(|source| LabelGeomError::IrJsonWrite {
        path: path.to_path_buf(),
        source,
    })
}

/// Reads an annotation set from a JSON string.
pub fn from_json_str(json: &str) -> Result<AnnotationSet, serde_json::Error> {
    serde_json::from_str(json)
}

/// Reads an annotation set from raw bytes.
pub fn from_json_slice(bytes: &[u8]) -> Result<AnnotationSet, serde_json::Error> {
    serde_json::from_slice(bytes)
}

/// Writes an annotation set to a pretty-printed JSON string.
pub fn to_json_string(set: &AnnotationSet) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(set)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{CoordSpace, LocatedObject, Point, Polygon};

    fn sample_set() -> AnnotationSet {
        AnnotationSet::absolute(vec![
            LocatedObject::new(10.0, 20.0, 90.0, 180.0).with_label("person"),
            LocatedObject::new(0.0, 0.0, 5.0, 5.0)
                .with_polygon(
                    Polygon::new(vec![
                        Point::new(0.0, 0.0),
                        Point::new(4.0, 0.0),
                        Point::new(0.0, 4.0),
                    ])
                    .unwrap(),
                )
                .with_label("dog")
                .with_score(0.95),
        ])
    }

    #[test]
    fn test_json_roundtrip() {
        let original = sample_set();

        let json = to_json_string(&original).expect("serialization failed");
        let restored = from_json_str(&json).expect("deserialization failed");

        assert_eq!(original, restored);
    }

    #[test]
    fn test_json_format() {
        let json = to_json_string(&sample_set()).expect("serialization failed");

        assert!(json.contains("\"space\": \"absolute\""));
        assert!(json.contains("\"objects\""));
        assert!(json.contains("\"polygon\""));
        assert!(json.contains("\"person\""));
    }

    #[test]
    fn test_json_defaults() {
        let set = from_json_str(r#"{"space": "normalized"}"#).unwrap();
        assert_eq!(set.space, CoordSpace::Normalized);
        assert!(set.is_empty());
    }

    #[test]
    fn test_json_rejects_short_polygon() {
        let json = r#"{"space":"absolute","objects":[{"x":0,"y":0,"width":1,"height":1,
            "polygon":[{"x":0,"y":0},{"x":1,"y":1}]}]}"#;
        assert!(from_json_str(json).is_err());
    }

    #[test]
    fn test_file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("set.json");
        write_ir_json(&path, &sample_set()).unwrap();
        assert_eq!(read_ir_json(&path).unwrap(), sample_set());
    }
}
