//! # Pyramid Stitch
//!
//! Reconstructs full-resolution images from the tile pyramids of a zoomable
//! online gallery.
//!
//! A zoomable viewer serves each image as a pyramid of fixed-size square
//! tiles. This library works out which tiles make up a chosen zoom level,
//! downloads them in parallel and stitches them into one image.
//!
//! ## Features
//!
//! - **Pyramid arithmetic**: tile counts, available levels and a pixel budget
//!   that keeps composed images addressable
//! - **Bounded parallel fetch**: at most a fixed number of tiles in flight
//! - **Partial results**: failed tiles leave blank regions instead of
//!   aborting the image, and are listed in a report
//! - **Image cache**: composed images are stored as PNG and reused
//! - **Wallpapers**: trimmed, scaled and centred screen-sized renders
//!
//! ## Architecture
//!
//! The library is organized into several modules:
//!
//! - [`pyramid`] - Pyramid descriptor, zoom modifiers, grids and tile URLs
//! - [`io`] - Tile transport trait and HTTP implementation
//! - [`tile`] - Tile decoding and the fetch-and-compose engine
//! - [`source`] - Gallery scraping and descriptor registry
//! - [`store`] - On-disk cache of composed images
//! - [`service`] - Download orchestration
//! - [`wallpaper`] - Wallpaper rendering
//! - [`config`] - CLI and configuration types
//!
//! ## Example
//!
//! ```rust,no_run
//! use pyramid_stitch::{
//!     Compositor, DescriptorRegistry, DownloadService, HttpTransport, ImageStore, SiteSource,
//! };
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let transport = Arc::new(HttpTransport::new()?);
//!     let source = SiteSource::new(Arc::clone(&transport), "http://microsculpture.net")?;
//!
//!     let service = DownloadService::new(
//!         DescriptorRegistry::new(source),
//!         Compositor::with_shared_transport(transport),
//!         ImageStore::open("download")?,
//!     );
//!
//!     let outcome = service.fetch("weevil", None, false, None).await?;
//!     println!("{}", outcome.path.display());
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod io;
pub mod pyramid;
pub mod service;
pub mod source;
pub mod store;
pub mod tile;
pub mod wallpaper;

// Re-export commonly used types
pub use config::{Cli, Command, CommonConfig, DownloadConfig, LevelsConfig, ListConfig};
pub use error::{
    DownloadError, FetchError, PyramidError, SourceError, StoreError, TileError, WallpaperError,
};
pub use io::{create_http_client, HttpTransport, TileTransport};
pub use pyramid::{
    Grid, PyramidDescriptor, TilePosition, TileUrlRule, TileUrlTemplate, ZoomModifier,
    DEFAULT_MODIFIERS, MODIFIER_X1, MODIFIER_X2,
};
pub use service::{DownloadService, FetchOutcome};
pub use source::{DescriptorRegistry, MetadataSource, SiteSource};
pub use store::{ImageKey, ImageStore};
pub use tile::{
    ComposedImage, CompositionReport, Compositor, ProgressSink, RgbTileDecoder, TileDecoder,
    TileFailure, TileOutcome,
};
pub use wallpaper::{WallpaperSpec, WallpaperWriter};
