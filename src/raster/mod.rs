//! Conversion between vector annotations and label rasters.
//!
//! - [`contour`]: raster -> vector, one object per connected component
//! - [`rasterize`]: vector -> raster, indexed or one binary layer per label
//! - [`palette`]: the label <-> index mapping both directions share

pub mod contour;
pub mod palette;
pub mod rasterize;

pub use contour::{trace_indexed, trace_layers, trace_mask, ContourTracer, TraceOptions};
pub use palette::Palette;
pub use rasterize::{
    indexed_to_layers, layers_to_indexed, rasterize_indexed, rasterize_layers, LAYER_FOREGROUND,
};
