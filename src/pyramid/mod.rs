//! Tile pyramid model.
//!
//! This module holds the pure arithmetic side of the crate: zoom modifiers,
//! the per-item [`PyramidDescriptor`], the [`Grid`] a download covers and the
//! [`TileUrlRule`] that maps tile addresses to URLs. Nothing here performs I/O.
//!
//! # Example
//!
//! ```
//! use pyramid_stitch::pyramid::{PyramidDescriptor, TileUrlTemplate, MODIFIER_X1};
//!
//! let template = TileUrlTemplate::new("http://host/tiles/{modifier}/{zoom}/{column}/{row}.jpg");
//! let descriptor = PyramidDescriptor::new(4096, 5, template).unwrap();
//!
//! let grid = descriptor.grid(3, MODIFIER_X1).unwrap();
//! assert_eq!(grid.tile_count, 8);
//! assert_eq!(grid.output_size(), 2048);
//! ```

mod descriptor;
mod grid;
mod modifier;
mod url;

pub use descriptor::{PyramidDescriptor, CHANNELS};
pub use grid::{Grid, TilePosition};
pub use modifier::{ZoomModifier, DEFAULT_MODIFIERS, MODIFIER_X1, MODIFIER_X2};
pub use url::{
    TileUrlRule, TileUrlTemplate, COLUMN_PLACEHOLDER, MODIFIER_PLACEHOLDER, ROW_PLACEHOLDER,
    ZOOM_PLACEHOLDER,
};
