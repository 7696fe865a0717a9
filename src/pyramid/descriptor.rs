//! Pyramid descriptor: zoom level arithmetic for a tile pyramid.
//!
//! A descriptor is built once per item from the metadata the viewer page
//! exposes (full image size, pyramid depth, tile URL pattern) and is
//! read-only afterwards. It answers three questions:
//!
//! - which zoom levels a modifier can request ([`PyramidDescriptor::available_levels`])
//! - how many tiles make up one edge at a level ([`PyramidDescriptor::tile_count`])
//! - which level best serves a target resolution
//!   ([`PyramidDescriptor::level_for_target_resolution`])
//!
//! # Tile Count
//!
//! Each finer zoom level doubles the tile density. The tile count per edge is
//!
//! ```text
//! ((total_size / tile_size - 1) >> (max_zoom_levels - zoom_level - modifier_level)) + 1
//! ```
//!
//! This is the arithmetic the tile server uses to lay out its directories, so
//! it is reproduced exactly.
//!
//! # Pixel Budget
//!
//! The deepest levels of large pyramids produce images whose channel count
//! (`edge² × 3`) does not fit a signed 32-bit integer. The descriptor lowers
//! its usable depth (`safe_zoom_levels`) until every modifier fits, using
//! checked multiplication. Checking the finest modifier alone is not enough:
//! integer division can leave a smaller-tile modifier slightly wider than the
//! finest one at the same depth (27000px gives 105 × 256 against 52 × 512).

use super::grid::Grid;
use super::modifier::{ZoomModifier, DEFAULT_MODIFIERS};
use super::url::TileUrlTemplate;
use crate::error::PyramidError;

/// Channels per pixel in composed images (RGB).
pub const CHANNELS: i32 = 3;

/// Signal raised when a level's composed image would not fit the pixel budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct OverflowGuardTriggered;

/// Immutable description of one tile pyramid.
#[derive(Debug, Clone)]
pub struct PyramidDescriptor {
    total_size: u32,
    max_zoom_levels: u32,
    safe_zoom_levels: u32,
    modifiers: Vec<ZoomModifier>,
    url_template: TileUrlTemplate,
}

impl PyramidDescriptor {
    /// Create a descriptor using the default modifier set (`x1`/256px, `x2`/512px).
    pub fn new(
        total_size: u32,
        max_zoom_levels: u32,
        url_template: TileUrlTemplate,
    ) -> Result<Self, PyramidError> {
        Self::with_modifiers(
            total_size,
            max_zoom_levels,
            DEFAULT_MODIFIERS.to_vec(),
            url_template,
        )
    }

    /// Create a descriptor with a custom modifier set.
    ///
    /// Modifiers whose tiles are larger than the whole image, or whose level
    /// is deeper than the pyramid, cannot address any tile and are left out
    /// of the usable set. Requesting them later fails with `InvalidModifier`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidDescriptor` if the URL template lacks `{column}` or
    /// `{row}`, the modifier set is empty, a modifier has a zero tile size,
    /// no modifier is usable, or not even the coarsest usable depth fits the
    /// pixel budget.
    pub fn with_modifiers(
        total_size: u32,
        max_zoom_levels: u32,
        modifiers: Vec<ZoomModifier>,
        url_template: TileUrlTemplate,
    ) -> Result<Self, PyramidError> {
        if !url_template.addresses_tiles() {
            return Err(invalid(format!(
                "URL template {} maps every tile to one URL",
                url_template.pattern()
            )));
        }
        if modifiers.is_empty() {
            return Err(invalid("modifier set is empty"));
        }
        if let Some(modifier) = modifiers.iter().find(|m| m.tile_size == 0) {
            return Err(invalid(format!("modifier {} has zero tile size", modifier)));
        }

        let modifiers: Vec<ZoomModifier> = modifiers
            .into_iter()
            .filter(|m| m.tile_size <= total_size && m.level <= max_zoom_levels)
            .collect();
        if modifiers.is_empty() {
            return Err(invalid(format!(
                "no modifier fits a {}px image with {} zoom levels",
                total_size, max_zoom_levels
            )));
        }

        let mut descriptor = Self {
            total_size,
            max_zoom_levels,
            safe_zoom_levels: max_zoom_levels,
            modifiers,
            url_template,
        };
        descriptor.safe_zoom_levels = descriptor.derive_safe_zoom_levels()?;
        Ok(descriptor)
    }

    /// Full-resolution edge length in pixels.
    pub fn total_size(&self) -> u32 {
        self.total_size
    }

    /// Pyramid depth reported by the source.
    pub fn max_zoom_levels(&self) -> u32 {
        self.max_zoom_levels
    }

    /// Largest depth at which every modifier fits the pixel budget.
    pub fn safe_zoom_levels(&self) -> u32 {
        self.safe_zoom_levels
    }

    /// Modifiers this pyramid can be addressed with.
    ///
    /// Excludes modifiers dropped on construction.
    pub fn modifiers(&self) -> &[ZoomModifier] {
        &self.modifiers
    }

    /// URL pattern tiles are served from.
    pub fn url_template(&self) -> &TileUrlTemplate {
        &self.url_template
    }

    /// The modifier producing the largest output per level.
    ///
    /// This is the modifier with the largest tiles; on ties the later entry
    /// of the modifier set wins.
    pub fn finest_modifier(&self) -> ZoomModifier {
        self.modifiers
            .iter()
            .copied()
            .fold(self.modifiers[0], |best, m| {
                if m.tile_size >= best.tile_size {
                    m
                } else {
                    best
                }
            })
    }

    /// Fail with `InvalidModifier` unless `modifier` belongs to this pyramid.
    pub fn check_modifier(&self, modifier: ZoomModifier) -> Result<(), PyramidError> {
        if self.modifiers.contains(&modifier) {
            Ok(())
        } else {
            Err(PyramidError::InvalidModifier {
                level: modifier.level,
                tile_size: modifier.tile_size,
            })
        }
    }

    /// Highest zoom level available for `modifier`.
    pub fn max_level(&self, modifier: ZoomModifier) -> Result<u32, PyramidError> {
        self.check_modifier(modifier)?;
        // safe_zoom_levels never drops below the deepest modifier level, and
        // every level up to this one fits the pixel budget
        Ok(self.safe_zoom_levels - modifier.level)
    }

    /// All zoom levels available for `modifier`, ascending from 0.
    pub fn available_levels(&self, modifier: ZoomModifier) -> Result<Vec<u32>, PyramidError> {
        let max_level = self.max_level(modifier)?;
        Ok((0..=max_level).collect())
    }

    /// Number of tiles per edge at `zoom_level` for `modifier`.
    ///
    /// # Errors
    ///
    /// `InvalidModifier` for a foreign modifier, `LevelOutOfRange` for a level
    /// outside `0..=safe_zoom_levels - modifier.level`.
    pub fn tile_count(&self, zoom_level: u32, modifier: ZoomModifier) -> Result<u32, PyramidError> {
        let max_level = self.max_level(modifier)?;
        if zoom_level > max_level {
            return Err(PyramidError::LevelOutOfRange {
                level: zoom_level,
                modifier: modifier.level,
                max_level,
            });
        }
        Ok(self.raw_tile_count(zoom_level, modifier))
    }

    /// Grid to download for `zoom_level` and `modifier`.
    pub fn grid(&self, zoom_level: u32, modifier: ZoomModifier) -> Result<Grid, PyramidError> {
        let tile_count = self.tile_count(zoom_level, modifier)?;
        Ok(Grid::new(zoom_level, modifier, tile_count))
    }

    /// Grid at `zoom_level` with the finest modifier, or its finest level when `None`.
    pub fn finest_grid(&self, zoom_level: Option<u32>) -> Result<Grid, PyramidError> {
        let modifier = self.finest_modifier();
        let level = match zoom_level {
            Some(level) => level,
            None => self.max_level(modifier)?,
        };
        self.grid(level, modifier)
    }

    /// Output edge length at `zoom_level` for `modifier`.
    pub fn output_size(&self, zoom_level: u32, modifier: ZoomModifier) -> Result<u32, PyramidError> {
        Ok(self.grid(zoom_level, modifier)?.output_size())
    }

    /// Pick the level whose finest-modifier output first exceeds both target edges.
    ///
    /// Falls back to the finest available level when the pyramid never gets
    /// that large. The result only bounds the output from below; callers that
    /// need exact dimensions resize afterwards.
    pub fn level_for_target_resolution(&self, width: u32, height: u32) -> u32 {
        let modifier = self.finest_modifier();
        let target = width.max(height);
        let max_level = self.safe_zoom_levels - modifier.level;

        (0..=max_level)
            .find(|&level| {
                self.raw_tile_count(level, modifier)
                    .saturating_mul(modifier.tile_size)
                    > target
            })
            .unwrap_or(max_level)
    }

    /// Whether pyramid depth `depth` keeps every modifier within the pixel budget.
    pub fn fits_pixel_budget(&self, depth: u32) -> bool {
        depth <= self.max_zoom_levels && self.check_depth(depth).is_ok()
    }

    fn check_depth(&self, depth: u32) -> Result<(), OverflowGuardTriggered> {
        for &modifier in &self.modifiers {
            let level = depth
                .checked_sub(modifier.level)
                .ok_or(OverflowGuardTriggered)?;
            self.check_pixel_budget(level, modifier)?;
        }
        Ok(())
    }

    fn derive_safe_zoom_levels(&self) -> Result<u32, PyramidError> {
        // Every modifier must keep at least level 0
        let floor = self.modifiers.iter().map(|m| m.level).max().unwrap_or(0);

        let mut depth = self.max_zoom_levels;
        loop {
            match self.check_depth(depth) {
                Ok(()) => return Ok(depth),
                Err(OverflowGuardTriggered) if depth > floor => depth -= 1,
                Err(OverflowGuardTriggered) => {
                    return Err(invalid(format!(
                        "{}px image does not fit the pixel budget at any level",
                        self.total_size
                    )))
                }
            }
        }
    }

    fn raw_tile_count(&self, zoom_level: u32, modifier: ZoomModifier) -> u32 {
        // Modifiers with tiles larger than the image are dropped on construction
        let full_tiles = self.total_size / modifier.tile_size;
        let shift = self
            .max_zoom_levels
            .saturating_sub(zoom_level)
            .saturating_sub(modifier.level);
        (full_tiles - 1).checked_shr(shift).unwrap_or(0) + 1
    }

    fn check_pixel_budget(
        &self,
        zoom_level: u32,
        modifier: ZoomModifier,
    ) -> Result<(), OverflowGuardTriggered> {
        let edge = self
            .raw_tile_count(zoom_level, modifier)
            .checked_mul(modifier.tile_size)
            .ok_or(OverflowGuardTriggered)?;
        let edge = i32::try_from(edge).map_err(|_| OverflowGuardTriggered)?;

        edge.checked_mul(edge)
            .and_then(|pixels| pixels.checked_mul(CHANNELS))
            .map(|_| ())
            .ok_or(OverflowGuardTriggered)
    }
}

fn invalid(reason: impl Into<String>) -> PyramidError {
    PyramidError::InvalidDescriptor {
        reason: reason.into(),
    }
}
