//! Located objects: a single annotation instance.
//!
//! A [`LocatedObject`] is a bounding box plus an optional polygon outline and
//! a free-form metadata map. Two metadata keys are reserved: [`TYPE_KEY`]
//! holds the label and [`SCORE_KEY`] an optional confidence.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use super::polygon::{Bounds, Polygon};

/// Metadata key holding the object's label.
pub const TYPE_KEY: &str = "type";

/// Metadata key holding the object's confidence score.
pub const SCORE_KEY: &str = "score";

/// Index of the region an object was fitted into.
pub const REGION_INDEX_KEY: &str = "region_index";

/// Region box an object was fitted into, as `"x,y,w,h"`.
pub const REGION_XYWH_KEY: &str = "region_xywh";

/// Width of the accepted minimum-area rectangle of a traced contour.
pub const MIN_RECT_WIDTH_KEY: &str = "min_rect_width";

/// Height of the accepted minimum-area rectangle of a traced contour.
pub const MIN_RECT_HEIGHT_KEY: &str = "min_rect_height";

/// A metadata value.
///
/// Serialized untagged, so JSON integers become [`MetaValue::Int`], other
/// numbers [`MetaValue::Float`] and strings [`MetaValue::Text`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetaValue {
    Int(i64),
    Float(f64),
    Text(String),
}

impl MetaValue {
    /// Numeric view of the value. Text is parsed if it holds a number.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            MetaValue::Int(v) => Some(*v as f64),
            MetaValue::Float(v) => Some(*v),
            MetaValue::Text(s) => s.trim().parse().ok(),
        }
    }

    /// String view of the value, only for text.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            MetaValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for MetaValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetaValue::Int(v) => write!(f, "{}", v),
            MetaValue::Float(v) => write!(f, "{}", v),
            MetaValue::Text(s) => f.write_str(s),
        }
    }
}

impl From<i64> for MetaValue {
    fn from(v: i64) -> Self {
        MetaValue::Int(v)
    }
}

impl From<f64> for MetaValue {
    fn from(v: f64) -> Self {
        MetaValue::Float(v)
    }
}

impl From<&str> for MetaValue {
    fn from(v: &str) -> Self {
        MetaValue::Text(v.to_string())
    }
}

impl From<String> for MetaValue {
    fn from(v: String) -> Self {
        MetaValue::Text(v)
    }
}

/// String-keyed metadata, ordered for stable serialization.
pub type Metadata = BTreeMap<String, MetaValue>;

/// A single annotation instance.
///
/// In [`CoordSpace::Absolute`](super::CoordSpace::Absolute) the box is an
/// inclusive pixel extent: it covers columns `x ..= x + width - 1`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct LocatedObject {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,

    /// Optional outline; when present its bounds determine the box.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub polygon: Option<Polygon>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: Metadata,
}

impl LocatedObject {
    /// Creates a box-only object.
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
            polygon: None,
            metadata: Metadata::new(),
        }
    }

    /// Attaches a polygon outline. The box is left as given.
    pub fn with_polygon(mut self, polygon: Polygon) -> Self {
        self.polygon = Some(polygon);
        self
    }

    /// Sets the label.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.metadata
            .insert(TYPE_KEY.to_string(), MetaValue::Text(label.into()));
        self
    }

    /// Sets the confidence score.
    pub fn with_score(mut self, score: f64) -> Self {
        self.metadata
            .insert(SCORE_KEY.to_string(), MetaValue::Float(score));
        self
    }

    /// Sets an arbitrary metadata entry.
    pub fn with_meta(mut self, key: impl Into<String>, value: impl Into<MetaValue>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// The object's label, if it has a textual one.
    pub fn label(&self) -> Option<&str> {
        self.metadata.get(TYPE_KEY).and_then(MetaValue::as_str)
    }

    /// The object's confidence score, if present and numeric.
    pub fn score(&self) -> Option<f64> {
        self.metadata.get(SCORE_KEY).and_then(MetaValue::as_f64)
    }

    /// Returns true if the box and polygon coordinates are all finite.
    pub fn is_finite(&self) -> bool {
        self.x.is_finite()
            && self.y.is_finite()
            && self.width.is_finite()
            && self.height.is_finite()
            && self.polygon.as_ref().map_or(true, Polygon::is_finite)
    }

    /// Raw box extremes `(x, y)`–`(x + width, y + height)`.
    pub fn box_bounds(&self) -> Bounds {
        Bounds::from_xyxy(self.x, self.y, self.x + self.width, self.y + self.height)
    }

    /// The box as `(x, y, width, height)`.
    #[inline]
    pub fn xywh(&self) -> (f64, f64, f64, f64) {
        (self.x, self.y, self.width, self.height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::Point;

    #[test]
    fn test_object_builder_pattern() {
        let object = LocatedObject::new(1.0, 2.0, 3.0, 4.0)
            .with_label("person")
            .with_score(0.95)
            .with_meta("occluded", "false");

        assert_eq!(object.label(), Some("person"));
        assert_eq!(object.score(), Some(0.95));
        assert_eq!(object.metadata.len(), 3);
    }

    #[test]
    fn test_score_parsed_from_text() {
        let object = LocatedObject::new(0.0, 0.0, 1.0, 1.0).with_meta(SCORE_KEY, "0.5");
        assert_eq!(object.score(), Some(0.5));
    }

    #[test]
    fn test_meta_value_untagged_serde() {
        let json = r#"{"a": 3, "b": 0.25, "c": "x"}"#;
        let meta: Metadata = serde_json::from_str(json).unwrap();
        assert_eq!(meta["a"], MetaValue::Int(3));
        assert_eq!(meta["b"], MetaValue::Float(0.25));
        assert_eq!(meta["c"], MetaValue::Text("x".into()));
    }

    #[test]
    fn test_non_finite_polygon_detected() {
        let polygon = Polygon::new(vec![
            Point::new(0.0, 0.0),
            Point::new(f64::NAN, 0.0),
            Point::new(1.0, 1.0),
        ])
        .unwrap();
        let object = LocatedObject::new(0.0, 0.0, 2.0, 2.0).with_polygon(polygon);
        assert!(!object.is_finite());
    }
}
