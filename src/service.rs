//! Download service for orchestrating item downloads.
//!
//! The DownloadService is the main entry point for the CLI. It orchestrates:
//! - Item lookup via the descriptor registry
//! - Level selection
//! - Image store lookups
//! - Tile composition
//! - Result storage
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                        DownloadService                          │
//! │  ┌─────────────────────────────────────────────────────────┐    │
//! │  │                        fetch()                          │    │
//! │  │  1. Describe item      4. Compose tiles                 │    │
//! │  │  2. Resolve level      5. Store PNG                     │    │
//! │  │  3. Check store        6. Return path & report          │    │
//! │  └─────────────────────────────────────────────────────────┘    │
//! │           │                    │                    │           │
//! │           ▼                    ▼                    ▼           │
//! │  ┌────────────────────┐  ┌────────────┐    ┌──────────────┐     │
//! │  │ DescriptorRegistry │  │ Compositor │    │  ImageStore  │     │
//! │  └────────────────────┘  └────────────┘    └──────────────┘     │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};

use crate::error::{DownloadError, SourceError};
use crate::io::TileTransport;
use crate::pyramid::PyramidDescriptor;
use crate::source::{DescriptorRegistry, MetadataSource};
use crate::store::{ImageKey, ImageStore};
use crate::tile::{CompositionReport, Compositor, ProgressSink};

// =============================================================================
// Fetch Outcome
// =============================================================================

/// Result of fetching one item at one level.
#[derive(Debug, Clone, Serialize)]
pub struct FetchOutcome {
    /// Item and level the image was fetched for
    pub key: ImageKey,

    /// Where the composed image is stored
    pub path: PathBuf,

    /// Whether the stored image was reused without downloading
    pub cache_hit: bool,

    /// Composition summary, absent on cache hits
    pub report: Option<CompositionReport>,
}

impl FetchOutcome {
    /// Whether the stored image is known to be missing tiles.
    pub fn is_incomplete(&self) -> bool {
        self.report.as_ref().is_some_and(|r| !r.is_complete())
    }
}

// =============================================================================
// Download Service
// =============================================================================

/// Service for downloading and caching composed item images.
///
/// # Type Parameters
///
/// * `S` - The metadata source items are described by
/// * `T` - The transport tiles are fetched with
///
/// # Example
///
/// ```ignore
/// use pyramid_stitch::service::DownloadService;
///
/// let service = DownloadService::new(registry, compositor, store);
///
/// // Finest level, reusing a stored image when present
/// let outcome = service.fetch("weevil", None, false, None).await?;
///
/// println!("{} (cache hit: {})", outcome.path.display(), outcome.cache_hit);
/// ```
pub struct DownloadService<S: MetadataSource, T> {
    /// Registry describing items
    registry: Arc<DescriptorRegistry<S>>,

    /// Compositor downloading tiles
    compositor: Compositor<T>,

    /// Store for composed images
    store: ImageStore,
}

impl<S: MetadataSource, T: TileTransport + 'static> DownloadService<S, T> {
    /// Create a new download service.
    pub fn new(registry: DescriptorRegistry<S>, compositor: Compositor<T>, store: ImageStore) -> Self {
        Self::with_shared_registry(Arc::new(registry), compositor, store)
    }

    /// Create a new download service with a shared registry.
    pub fn with_shared_registry(
        registry: Arc<DescriptorRegistry<S>>,
        compositor: Compositor<T>,
        store: ImageStore,
    ) -> Self {
        Self {
            registry,
            compositor,
            store,
        }
    }

    /// Get the descriptor registry.
    pub fn registry(&self) -> &Arc<DescriptorRegistry<S>> {
        &self.registry
    }

    /// Get the image store.
    pub fn store(&self) -> &ImageStore {
        &self.store
    }

    /// Every item available for download.
    pub async fn catalog(&self) -> Result<Arc<Vec<String>>, DownloadError> {
        Ok(self.registry.items().await?)
    }

    /// Normalize a user-supplied item name and check it against the catalog.
    pub async fn resolve_item(&self, name: &str) -> Result<String, DownloadError> {
        let item = name.trim().to_lowercase();
        if self.registry.contains(&item).await? {
            Ok(item)
        } else {
            Err(SourceError::UnknownItem(name.trim().to_string()).into())
        }
    }

    /// Descriptor for `item`.
    pub async fn describe(&self, item: &str) -> Result<Arc<PyramidDescriptor>, DownloadError> {
        Ok(self.registry.get(item).await?)
    }

    /// Levels `item` offers at its finest modifier.
    pub async fn levels(&self, item: &str) -> Result<Vec<u32>, DownloadError> {
        let descriptor = self.describe(item).await?;
        Ok(descriptor.available_levels(descriptor.finest_modifier())?)
    }

    /// Distinct levels offered by any of `items`, ascending.
    pub async fn level_union(&self, items: &[String]) -> Result<Vec<u32>, DownloadError> {
        let mut levels = BTreeSet::new();
        for item in items {
            levels.extend(self.levels(item).await?);
        }
        Ok(levels.into_iter().collect())
    }

    /// Level of `item` best suited to a `width × height` wallpaper.
    pub async fn wallpaper_level(
        &self,
        item: &str,
        width: u32,
        height: u32,
    ) -> Result<u32, DownloadError> {
        Ok(self
            .describe(item)
            .await?
            .level_for_target_resolution(width, height))
    }

    /// Fetch `item` at `level` (its finest level when `None`).
    ///
    /// A stored image is reused unless `force` is set. Missing tiles do not
    /// fail the call; they are listed in the outcome's report.
    pub async fn fetch(
        &self,
        item: &str,
        level: Option<u32>,
        force: bool,
        progress: Option<&dyn ProgressSink>,
    ) -> Result<FetchOutcome, DownloadError> {
        let descriptor = self.describe(item).await?;
        let grid = descriptor.finest_grid(level)?;
        let key = ImageKey::new(item, grid.zoom_level);

        if !force {
            if let Some(path) = self.store.get(&key).await? {
                info!(key = %key, path = %path.display(), "Using stored image");
                return Ok(FetchOutcome {
                    key,
                    path,
                    cache_hit: true,
                    report: None,
                });
            }
        }

        info!(
            key = %key,
            tiles = grid.tile_total(),
            output_size = grid.output_size(),
            "Downloading"
        );
        let composed = self
            .compositor
            .compose(&grid, descriptor.url_template(), progress)
            .await;

        if !composed.report.is_complete() {
            warn!(
                key = %key,
                failed = composed.report.tiles_failed(),
                total = composed.report.tiles_total,
                "Storing image with missing tiles"
            );
        }

        let path = self.store.put(&key, composed.image).await?;
        Ok(FetchOutcome {
            key,
            path,
            cache_hit: false,
            report: Some(composed.report),
        })
    }

    /// Fetch every item in `items`, level by level.
    ///
    /// With an explicit `level`, items that do not offer it are skipped.
    /// Otherwise every level any item offers is walked in ascending order and
    /// each item offering it is fetched. Outcomes are returned in fetch order.
    pub async fn download(
        &self,
        items: &[String],
        level: Option<u32>,
        force: bool,
        progress: Option<&dyn ProgressSink>,
    ) -> Result<Vec<FetchOutcome>, DownloadError> {
        let levels = match level {
            Some(level) => vec![level],
            None => self.level_union(items).await?,
        };
        info!(?levels, items = items.len(), "Downloading levels");

        let mut outcomes = Vec::new();
        for level in levels {
            for item in items {
                if !self.levels(item).await?.contains(&level) {
                    continue;
                }
                outcomes.push(self.fetch(item, Some(level), force, progress).await?);
            }
        }
        Ok(outcomes)
    }
}

// =============================================================================
// Tests
// =============================================================================
