//! Fetch-and-compose engine.
//!
//! The [`Compositor`] downloads every tile of a [`Grid`] and copies it into
//! one square RGB image.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                        Compositor::compose()                     │
//! │                                                                  │
//! │   grid.positions() ──► one task per tile (JoinSet)               │
//! │                                                                  │
//! │   ┌────────────── per tile, under a semaphore permit ──────────┐ │
//! │   │ 1. url = rule(zoom, modifier, column, row)                 │ │
//! │   │ 2. bytes = transport.fetch(url)          (parallel)        │ │
//! │   │ 3. tile = decoder.decode(bytes)          (blocking pool)   │ │
//! │   │ 4. lock canvas, copy tile at (col·size, row·size)          │ │
//! │   └────────────────────────────────────────────────────────────┘ │
//! │                                                                  │
//! │   join all tasks ──► ComposedImage { image, report }             │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Concurrency
//!
//! At most `max_concurrency` tiles (default 4) are in flight at any time.
//! The upstream tile host throttles aggressive clients, so this cap is the
//! backpressure mechanism, not a tuning knob. Only the copy into the canvas
//! is serialized; fetch and decode run unsynchronized.
//!
//! # Failure Policy
//!
//! A tile that cannot be fetched or decoded is abandoned: its region stays
//! black, the failure is logged, reported to the progress sink and recorded
//! in the [`CompositionReport`], and composition continues. `compose` always
//! returns an image.

use std::collections::BTreeMap;
use std::sync::Arc;

use image::{imageops, RgbImage};
use serde::{Serialize, Serializer};
use tokio::sync::{Mutex, Semaphore};
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::error::TileError;
use crate::io::TileTransport;
use crate::pyramid::{Grid, TilePosition, TileUrlRule};

use super::decoder::{RgbTileDecoder, TileDecoder};
use super::progress::{ProgressSink, TileOutcome};

/// Default number of tiles fetched concurrently.
pub const DEFAULT_MAX_CONCURRENCY: usize = 4;

// =============================================================================
// Composition Report
// =============================================================================

/// A tile that could not be placed.
#[derive(Debug, Clone, Serialize)]
pub struct TileFailure {
    /// Grid position of the tile
    pub position: TilePosition,

    /// URL the tile was requested from
    pub url: String,

    /// Why the tile was abandoned
    #[serde(serialize_with = "serialize_display")]
    pub error: TileError,
}

/// Outcome of a composition, returned alongside the image.
///
/// The image itself is the same whether every tile arrived or none did; the
/// report is the only way to tell a complete image from one with gaps.
#[derive(Debug, Clone, Serialize)]
pub struct CompositionReport {
    /// Grid that was composed
    pub grid: Grid,

    /// Number of tiles in the grid
    pub tiles_total: usize,

    /// Number of tiles copied into the image
    pub tiles_placed: usize,

    /// Abandoned tiles, ordered by position
    pub failures: Vec<TileFailure>,
}

impl CompositionReport {
    fn new(grid: Grid) -> Self {
        Self {
            grid,
            tiles_total: grid.tile_total(),
            tiles_placed: 0,
            failures: Vec::new(),
        }
    }

    /// Whether every tile was placed.
    pub fn is_complete(&self) -> bool {
        self.tiles_placed == self.tiles_total
    }

    /// Fraction of tiles placed, in `0.0..=1.0`. An empty grid counts as complete.
    pub fn success_ratio(&self) -> f64 {
        if self.tiles_total == 0 {
            1.0
        } else {
            self.tiles_placed as f64 / self.tiles_total as f64
        }
    }

    /// Number of abandoned tiles.
    pub fn tiles_failed(&self) -> usize {
        self.failures.len()
    }
}

/// A composed image and the report describing how it was built.
///
/// Ownership of the pixel buffer passes to the caller.
#[derive(Debug, Clone)]
pub struct ComposedImage {
    /// The composed `output_size × output_size` RGB image
    pub image: RgbImage,

    /// Per-tile outcome summary
    pub report: CompositionReport,
}

impl ComposedImage {
    /// Discard the report and keep the image.
    pub fn into_image(self) -> RgbImage {
        self.image
    }
}

// =============================================================================
// Compositor
// =============================================================================

/// Downloads tile grids and composes them into single images.
///
/// # Type Parameters
///
/// * `T` - The transport tiles are fetched with
/// * `D` - The decoder turning tile bytes into pixels
///
/// # Example
///
/// ```ignore
/// use pyramid_stitch::io::HttpTransport;
/// use pyramid_stitch::tile::Compositor;
///
/// let compositor = Compositor::new(HttpTransport::new()?);
/// let grid = descriptor.grid(3, MODIFIER_X2)?;
/// let composed = compositor.compose(&grid, descriptor.url_template(), None).await;
///
/// println!("{} of {} tiles", composed.report.tiles_placed, composed.report.tiles_total);
/// ```
pub struct Compositor<T, D = RgbTileDecoder> {
    transport: Arc<T>,
    decoder: Arc<D>,
    max_concurrency: usize,
}

impl<T: TileTransport + 'static> Compositor<T> {
    /// Create a compositor with the default decoder and concurrency.
    pub fn new(transport: T) -> Self {
        Self::with_shared_transport(Arc::new(transport))
    }

    /// Create a compositor sharing a transport with other components.
    pub fn with_shared_transport(transport: Arc<T>) -> Self {
        Self {
            transport,
            decoder: Arc::new(RgbTileDecoder::new()),
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
        }
    }
}

impl<T: TileTransport + 'static, D: TileDecoder> Compositor<T, D> {
    /// Create a compositor with a custom decoder.
    pub fn with_decoder(transport: T, decoder: D) -> Self {
        Self {
            transport: Arc::new(transport),
            decoder: Arc::new(decoder),
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
        }
    }

    /// Set the number of tiles fetched concurrently (at least 1).
    pub fn with_max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.max_concurrency = max_concurrency.max(1);
        self
    }

    /// Number of tiles fetched concurrently.
    pub fn max_concurrency(&self) -> usize {
        self.max_concurrency
    }

    /// Get a reference to the underlying transport.
    pub fn transport(&self) -> &Arc<T> {
        &self.transport
    }

    /// Download every tile of `grid` and compose them into one image.
    ///
    /// Returns once every tile has been placed or abandoned. Tile failures
    /// never fail the call; they leave black regions and are listed in the
    /// report.
    pub async fn compose<U>(
        &self,
        grid: &Grid,
        urls: &U,
        progress: Option<&dyn ProgressSink>,
    ) -> ComposedImage
    where
        U: TileUrlRule + ?Sized,
    {
        let tile_size = grid.tile_size();
        let output_size = grid.output_size();

        debug!(
            zoom_level = grid.zoom_level,
            modifier = %grid.modifier,
            tile_count = grid.tile_count,
            output_size,
            "Starting composition"
        );

        if let Some(sink) = progress {
            sink.on_start(grid);
        }

        let canvas = Arc::new(Mutex::new(RgbImage::new(output_size, output_size)));
        let semaphore = Arc::new(Semaphore::new(self.max_concurrency));

        let mut pending: BTreeMap<TilePosition, String> = BTreeMap::new();
        let mut tasks = JoinSet::new();

        for position in grid.positions() {
            let url = urls.tile_url(grid.zoom_level, grid.modifier, position.column, position.row);
            pending.insert(position, url.clone());

            let transport = Arc::clone(&self.transport);
            let decoder = Arc::clone(&self.decoder);
            let canvas = Arc::clone(&canvas);
            let semaphore = Arc::clone(&semaphore);

            tasks.spawn(async move {
                let result = place_tile(
                    transport.as_ref(),
                    decoder,
                    &canvas,
                    &semaphore,
                    &url,
                    position,
                    tile_size,
                )
                .await;
                (position, result)
            });
        }

        let mut report = CompositionReport::new(*grid);
        let mut last_join_error = None;

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((position, result)) => {
                    let url = pending.remove(&position).unwrap_or_default();
                    record(&mut report, position, url, result, progress);
                }
                Err(join_err) => {
                    warn!(error = %join_err, "Tile task did not complete");
                    last_join_error = Some(join_err.to_string());
                }
            }
        }

        // Tasks that panicked or were cancelled never reported their position
        for (position, url) in std::mem::take(&mut pending) {
            let error = TileError::Aborted {
                message: last_join_error
                    .clone()
                    .unwrap_or_else(|| "task ended without a result".to_string()),
            };
            record(&mut report, position, url, Err(error), progress);
        }
        report.failures.sort_by_key(|f| f.position);

        let image = match Arc::try_unwrap(canvas) {
            Ok(canvas) => canvas.into_inner(),
            Err(shared) => shared.lock().await.clone(),
        };

        info!(
            zoom_level = grid.zoom_level,
            modifier = %grid.modifier,
            output_size,
            placed = report.tiles_placed,
            failed = report.tiles_failed(),
            total = report.tiles_total,
            "Composition finished"
        );

        ComposedImage { image, report }
    }
}

/// Fetch, decode and copy one tile into the canvas.
async fn place_tile<T, D>(
    transport: &T,
    decoder: Arc<D>,
    canvas: &Mutex<RgbImage>,
    semaphore: &Semaphore,
    url: &str,
    position: TilePosition,
    tile_size: u32,
) -> Result<(), TileError>
where
    T: TileTransport + ?Sized,
    D: TileDecoder,
{
    let _permit = semaphore.acquire().await.map_err(|e| TileError::Aborted {
        message: e.to_string(),
    })?;

    let data = transport.fetch(url).await?;

    let tile = tokio::task::spawn_blocking(move || decoder.decode(&data, tile_size))
        .await
        .map_err(|e| TileError::Aborted {
            message: e.to_string(),
        })??;

    let (x, y) = position.pixel_offset(tile_size);
    let mut canvas = canvas.lock().await;
    imageops::replace(&mut *canvas, &tile, i64::from(x), i64::from(y));

    Ok(())
}

fn record(
    report: &mut CompositionReport,
    position: TilePosition,
    url: String,
    result: Result<(), TileError>,
    progress: Option<&dyn ProgressSink>,
) {
    match result {
        Ok(()) => {
            debug!(column = position.column, row = position.row, "Tile placed");
            report.tiles_placed += 1;
            if let Some(sink) = progress {
                sink.on_tile(position, TileOutcome::Placed);
            }
        }
        Err(error) => {
            warn!(
                column = position.column,
                row = position.row,
                url = %url,
                error = %error,
                "Tile abandoned"
            );
            if let Some(sink) = progress {
                sink.on_tile(position, TileOutcome::Failed(&error));
            }
            report.failures.push(TileFailure {
                position,
                url,
                error,
            });
        }
    }
}

fn serialize_display<S: Serializer>(error: &TileError, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(error)
}

// =============================================================================
// Tests
// =============================================================================
