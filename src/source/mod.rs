//! Metadata source layer.
//!
//! This module turns an item name into a [`PyramidDescriptor`].
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │             DownloadService             │
//! └────────────────────┬────────────────────┘
//!                      │
//!                      ▼
//! ┌─────────────────────────────────────────┐
//! │           DescriptorRegistry            │
//! │  (caches catalog and descriptors)       │
//! └────────────────────┬────────────────────┘
//!                      │
//!                      ▼
//! ┌─────────────────────────────────────────┐
//! │         MetadataSource Trait            │
//! └────────────────────┬────────────────────┘
//!                      │
//!                      ▼
//! ┌─────────────────────────────────────────┐
//! │   SiteSource (scrapes the gallery site) │
//! └─────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use pyramid_stitch::io::HttpTransport;
//! use pyramid_stitch::source::{DescriptorRegistry, SiteSource};
//!
//! let source = SiteSource::new(HttpTransport::new()?, "http://microsculpture.net")?;
//! let registry = DescriptorRegistry::new(source);
//!
//! for item in registry.items().await?.iter() {
//!     let descriptor = registry.get(item).await?;
//!     println!("{}: {:?}", item, descriptor.available_levels(descriptor.finest_modifier()));
//! }
//! ```

mod page;
mod registry;
mod site;

use async_trait::async_trait;

use crate::error::SourceError;
use crate::pyramid::PyramidDescriptor;

pub use page::{
    parse_item_list, parse_item_page, ItemPage, MAP_BOUNDS_ATTR, MAX_ZOOM_ATTR, TILE_FOLDER_ATTR,
};
pub use registry::{DescriptorRegistry, DEFAULT_DESCRIPTOR_CACHE_CAPACITY};
pub use site::{SiteSource, TILE_ROOT};

/// Trait for discovering items and describing their pyramids.
///
/// This abstraction lets the orchestration layer work against the live site
/// or against in-memory fixtures.
#[async_trait]
pub trait MetadataSource: Send + Sync {
    /// List every item the source offers, in a stable order.
    async fn list_items(&self) -> Result<Vec<String>, SourceError>;

    /// Build the pyramid descriptor for one item.
    ///
    /// Returns `SourceError::UnknownItem` if the source has no such item.
    async fn describe(&self, item: &str) -> Result<PyramidDescriptor, SourceError>;
}
