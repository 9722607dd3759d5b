//! Annotation value model.
//!
//! This module defines the format-agnostic representation every geometry
//! operation in the crate works on.
//!
//! # Design Principles
//!
//! 1. **Values, not shared state**: sets and objects are cloned and rebuilt
//!    by operations, never edited in place behind a caller's back.
//!
//! 2. **One space per set**: an [`AnnotationSet`] is either entirely
//!    absolute (pixels) or entirely normalized; the tag travels with it.
//!
//! 3. **Validated rings**: a [`Polygon`] always has at least three points,
//!    so downstream code never handles degenerate point lists.
//!
//! # Example
//!
//! ```
//! use labelgeom::ir::{AnnotationSet, LocatedObject};
//!
//! let set = AnnotationSet::absolute(vec![
//!     LocatedObject::new(10.0, 20.0, 90.0, 180.0).with_label("person"),
//! ]);
//! assert_eq!(set.labels(), vec!["person".to_string()]);
//! ```

mod depth;
pub mod io_json;
mod object;
mod point;
mod polygon;
mod segmentation;
mod set;
mod space;

// Re-export core types for convenient access
pub use depth::DepthInformation;
pub use object::{
    LocatedObject, MetaValue, Metadata, MIN_RECT_HEIGHT_KEY, MIN_RECT_WIDTH_KEY,
    REGION_INDEX_KEY, REGION_XYWH_KEY, SCORE_KEY, TYPE_KEY,
};
pub use point::Point;
pub use polygon::{Bounds, Polygon};
pub use segmentation::ImageSegmentationAnnotations;
pub use set::AnnotationSet;
pub use space::CoordSpace;
