//! Depth maps.

use ndarray::{Array2, ArrayD, Ix2};

use crate::error::LabelGeomError;

/// A depth map: one 2-D matrix, 8-bit or 32-bit float.
#[derive(Clone, Debug, PartialEq)]
pub enum DepthInformation {
    U8(Array2<u8>),
    F32(Array2<f32>),
}

impl DepthInformation {
    /// Wraps an 8-bit matrix of any dimensionality, rejecting non-2-D input.
    ///
    /// # Errors
    /// Returns [`LabelGeomError::InvalidAnnotationShape`] unless `data` has
    /// exactly two dimensions.
    pub fn from_u8(data: ArrayD<u8>) -> Result<Self, LabelGeomError> {
        into_2d(data).map(DepthInformation::U8)
    }

    /// Wraps a float matrix of any dimensionality, rejecting non-2-D input.
    ///
    /// # Errors
    /// Returns [`LabelGeomError::InvalidAnnotationShape`] unless `data` has
    /// exactly two dimensions.
    pub fn from_f32(data: ArrayD<f32>) -> Result<Self, LabelGeomError> {
        into_2d(data).map(DepthInformation::F32)
    }

    /// Matrix size as `(width, height)`, i.e. `(columns, rows)`.
    pub fn dimensions(&self) -> (u32, u32) {
        let (rows, cols) = match self {
            DepthInformation::U8(a) => a.dim(),
            DepthInformation::F32(a) => a.dim(),
        };
        (cols as u32, rows as u32)
    }

    /// Depth at column `x`, row `y`, widened to `f32`.
    pub fn get(&self, x: usize, y: usize) -> Option<f32> {
        match self {
            DepthInformation::U8(a) => a.get((y, x)).map(|v| *v as f32),
            DepthInformation::F32(a) => a.get((y, x)).copied(),
        }
    }
}

fn into_2d<T>(data: ArrayD<T>) -> Result<Array2<T>, LabelGeomError> {
    let ndim = data.ndim();
    data.into_dimensionality::<Ix2>().map_err(|_| {
        LabelGeomError::InvalidAnnotationShape(format!(
            "depth information must have 2 dimensions, got {}",
            ndim
        ))
    })
}
