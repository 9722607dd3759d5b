//! Coordinate space tag for annotation sets.
//!
//! An [`AnnotationSet`](super::AnnotationSet) is homogeneous: every object in
//! it is expressed either in absolute pixel units or as fractions of the image
//! width and height. The tag travels with the set so that conversions can be
//! no-ops when the set is already in the requested space.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The coordinate space an annotation set is expressed in.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CoordSpace {
    /// Integer pixel offsets with inclusive-extent boxes
    /// (`x + width - 1` is the last covered pixel).
    #[default]
    Absolute,

    /// Fractions of the image width/height in `[0, 1]`. Widths and heights
    /// are plain fractions, not inclusive-adjusted.
    Normalized,
}

impl CoordSpace {
    /// Human-readable name, matching the serialized form.
    pub fn name(&self) -> &'static str {
        match self {
            CoordSpace::Absolute => "absolute",
            CoordSpace::Normalized => "normalized",
        }
    }
}

impl fmt::Display for CoordSpace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
