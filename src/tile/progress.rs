//! Progress reporting for compositions.
//!
//! The compositor never writes to the console. Callers that want to show
//! progress pass a [`ProgressSink`]; it is told the grid once and then
//! receives exactly one notification per tile, whether the tile was placed
//! or abandoned.

use std::sync::atomic::{AtomicUsize, Ordering};

use crate::error::TileError;
use crate::pyramid::{Grid, TilePosition};

/// How a single tile attempt ended.
#[derive(Debug, Clone, Copy)]
pub enum TileOutcome<'a> {
    /// Tile was fetched, decoded and copied into the image
    Placed,

    /// Tile was abandoned; its region stays blank
    Failed(&'a TileError),
}

impl TileOutcome<'_> {
    pub fn is_placed(&self) -> bool {
        matches!(self, TileOutcome::Placed)
    }
}

/// Receives composition progress.
pub trait ProgressSink: Send + Sync {
    /// Called once before any tile is attempted.
    fn on_start(&self, _grid: &Grid) {}

    /// Called once per tile, in completion order.
    fn on_tile(&self, position: TilePosition, outcome: TileOutcome<'_>);
}

/// Sink that counts tile outcomes.
#[derive(Debug, Default)]
pub struct ProgressCounter {
    started: AtomicUsize,
    placed: AtomicUsize,
    failed: AtomicUsize,
}

impl ProgressCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of compositions started.
    pub fn started(&self) -> usize {
        self.started.load(Ordering::SeqCst)
    }

    /// Tiles placed so far.
    pub fn placed(&self) -> usize {
        self.placed.load(Ordering::SeqCst)
    }

    /// Tiles abandoned so far.
    pub fn failed(&self) -> usize {
        self.failed.load(Ordering::SeqCst)
    }

    /// Tiles resolved so far.
    pub fn resolved(&self) -> usize {
        self.placed() + self.failed()
    }
}

impl ProgressSink for ProgressCounter {
    fn on_start(&self, _grid: &Grid) {
        self.started.fetch_add(1, Ordering::SeqCst);
    }

    fn on_tile(&self, _position: TilePosition, outcome: TileOutcome<'_>) {
        match outcome {
            TileOutcome::Placed => self.placed.fetch_add(1, Ordering::SeqCst),
            TileOutcome::Failed(_) => self.failed.fetch_add(1, Ordering::SeqCst),
        };
    }
}
