//! Ordered, homogeneously-tagged collections of located objects.

use serde::{Deserialize, Serialize};

use super::object::LocatedObject;
use super::space::CoordSpace;

/// An ordered sequence of [`LocatedObject`]s, all in the same [`CoordSpace`].
///
/// Sets are treated as values: operations return a new set rather than
/// editing one in place.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AnnotationSet {
    /// Coordinate space shared by every object.
    pub space: CoordSpace,

    /// Objects in iteration (and paint) order.
    #[serde(default)]
    pub objects: Vec<LocatedObject>,
}

impl AnnotationSet {
    /// Creates a set in the given space.
    pub fn new(space: CoordSpace, objects: Vec<LocatedObject>) -> Self {
        Self { space, objects }
    }

    /// Creates a set in pixel coordinates.
    pub fn absolute(objects: Vec<LocatedObject>) -> Self {
        Self::new(CoordSpace::Absolute, objects)
    }

    /// Creates a set in normalized coordinates.
    pub fn normalized(objects: Vec<LocatedObject>) -> Self {
        Self::new(CoordSpace::Normalized, objects)
    }

    /// Creates a set in the same space as `self` holding `objects`.
    pub fn with_objects(&self, objects: Vec<LocatedObject>) -> Self {
        Self::new(self.space, objects)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, LocatedObject> {
        self.objects.iter()
    }

    /// Distinct labels in first-seen order.
    pub fn labels(&self) -> Vec<String> {
        let mut labels: Vec<String> = Vec::new();
        for label in self.objects.iter().filter_map(LocatedObject::label) {
            if !labels.iter().any(|l| l == label) {
                labels.push(label.to_string());
            }
        }
        labels
    }
}

impl<'a> IntoIterator for &'a AnnotationSet {
    type Item = &'a LocatedObject;
    type IntoIter = std::slice::Iter<'a, LocatedObject>;

    fn into_iter(self) -> Self::IntoIter {
        self.objects.iter()
    }
}

impl IntoIterator for AnnotationSet {
    type Item = LocatedObject;
    type IntoIter = std::vec::IntoIter<LocatedObject>;

    fn into_iter(self) -> Self::IntoIter {
        self.objects.into_iter()
    }
}
