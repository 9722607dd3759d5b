//! Label to palette-index mapping for indexed rasters.

use std::collections::BTreeSet;

use tracing::warn;

use crate::error::LabelGeomError;

/// An ordered label -> index map that never hands out the background index.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Palette {
    background: u8,
    entries: Vec<(String, u8)>,
}

impl Palette {
    /// Assigns indices `0, 1, 2, ...` to `labels` in order, skipping the
    /// background index.
    ///
    /// # Errors
    /// Returns [`LabelGeomError::InvalidAnnotationShape`] when the labels do
    /// not fit into 255 non-background indices.
    pub fn from_labels<I, S>(labels: I, background: u8) -> Result<Self, LabelGeomError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut entries = Vec::new();
        let mut next: u16 = 0;
        for label in labels {
            if next == background as u16 {
                next += 1;
            }
            if next > u8::MAX as u16 {
                return Err(LabelGeomError::InvalidAnnotationShape(
                    "more than 255 labels for an 8-bit palette".to_string(),
                ));
            }
            entries.push((label.into(), next as u8));
            next += 1;
        }
        Ok(Self {
            background,
            entries,
        })
    }

    /// Uses explicit indices. An entry that collides with the background
    /// index is moved to the next free index above it.
    ///
    /// # Errors
    /// Returns [`LabelGeomError::InvalidAnnotationShape`] if a colliding entry
    /// cannot be moved to a free index.
    pub fn from_entries<I, S>(entries: I, background: u8) -> Result<Self, LabelGeomError>
    where
        I: IntoIterator<Item = (S, u8)>,
        S: Into<String>,
    {
        let entries: Vec<(String, u8)> = entries.into_iter().map(|(l, i)| (l.into(), i)).collect();
        let mut used: BTreeSet<u8> = entries
            .iter()
            .map(|(_, i)| *i)
            .filter(|i| *i != background)
            .collect();

        let mut resolved = Vec::with_capacity(entries.len());
        for (label, index) in entries {
            if index != background {
                resolved.push((label, index));
                continue;
            }
            let free = (background as u16 + 1..=u8::MAX as u16)
                .map(|i| i as u8)
                .find(|i| !used.contains(i))
                .ok_or_else(|| {
                    LabelGeomError::InvalidAnnotationShape(format!(
                        "no free palette index for label '{}'",
                        label
                    ))
                })?;
            warn!(
                "label '{}' collides with background index {}, using {}",
                label, background, free
            );
            used.insert(free);
            resolved.push((label, free));
        }

        Ok(Self {
            background,
            entries: resolved,
        })
    }

    /// The reserved background index.
    pub fn background(&self) -> u8 {
        self.background
    }

    /// Index assigned to `label`.
    pub fn index_of(&self, label: &str) -> Option<u8> {
        self.entries
            .iter()
            .find(|(l, _)| l == label)
            .map(|(_, i)| *i)
    }

    /// Label assigned to `index`.
    pub fn label_of(&self, index: u8) -> Option<&str> {
        self.entries
            .iter()
            .find(|(_, i)| *i == index)
            .map(|(l, _)| l.as_str())
    }

    /// Entries in palette order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, u8)> {
        self.entries.iter().map(|(l, i)| (l.as_str(), *i))
    }

    /// Labels in palette order.
    pub fn labels(&self) -> Vec<String> {
        self.entries.iter().map(|(l, _)| l.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
