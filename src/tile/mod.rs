//! Tile fetch-and-compose layer.
//!
//! This module downloads the tiles of a pyramid grid in parallel and stitches
//! them into one image.
//!
//! # Architecture
//!
//! The compositor sits between the pyramid arithmetic and the transport:
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │          DownloadService / CLI          │
//! └────────────────────┬────────────────────┘
//!                      │ Grid + TileUrlRule
//!                      ▼
//! ┌─────────────────────────────────────────┐
//! │               Compositor                │
//! │  ┌──────────────┐  ┌─────────────────┐  │
//! │  │  Semaphore   │  │  TileDecoder    │  │
//! │  │  (≤ N tiles  │  │  (bytes → RGB,  │  │
//! │  │   in flight) │  │   exact size)   │  │
//! │  └──────────────┘  └─────────────────┘  │
//! └────────────────────┬────────────────────┘
//!                      │
//!                      ▼
//! ┌─────────────────────────────────────────┐
//! │              TileTransport              │
//! └─────────────────────────────────────────┘
//! ```
//!
//! # Components
//!
//! - [`Compositor`]: Fetches every tile of a grid and composes the image
//! - [`ComposedImage`]: The composed image plus its [`CompositionReport`]
//! - [`TileDecoder`] / [`RgbTileDecoder`]: Turns tile bytes into RGB pixels
//! - [`ProgressSink`]: Per-tile progress notifications
//!
//! # Example
//!
//! ```
//! use pyramid_stitch::pyramid::{Grid, ZoomModifier};
//! use pyramid_stitch::tile::CompositionReport;
//!
//! fn summary(report: &CompositionReport) -> String {
//!     format!("{}/{} tiles", report.tiles_placed, report.tiles_total)
//! }
//!
//! let grid = Grid::new(0, ZoomModifier::new(1, 256), 4);
//! assert_eq!(grid.tile_total(), 16);
//! assert_eq!(grid.output_size(), 1024);
//! ```

mod compose;
mod decoder;
mod progress;

pub use compose::{
    ComposedImage, CompositionReport, Compositor, TileFailure, DEFAULT_MAX_CONCURRENCY,
};
pub use decoder::{RgbTileDecoder, TileDecoder};
pub use progress::{ProgressCounter, ProgressSink, TileOutcome};
