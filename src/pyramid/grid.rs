use serde::Serialize;

use super::ZoomModifier;

/// Position of a tile inside a grid (0-indexed from the top-left corner).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct TilePosition {
    /// Tile column (0-indexed from left)
    pub column: u32,

    /// Tile row (0-indexed from top)
    pub row: u32,
}

impl TilePosition {
    pub fn new(column: u32, row: u32) -> Self {
        Self { column, row }
    }

    /// Pixel offset of this tile's top-left corner in the composed image.
    pub fn pixel_offset(&self, tile_size: u32) -> (u32, u32) {
        (self.column * tile_size, self.row * tile_size)
    }
}

/// A square grid of tiles at one zoom level and modifier.
///
/// Grids are normally obtained from [`super::PyramidDescriptor::grid`],
/// which guarantees the output fits the pixel budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Grid {
    /// Zoom level the tiles are addressed at
    pub zoom_level: u32,

    /// Modifier used to address tiles
    pub modifier: ZoomModifier,

    /// Number of tiles along each edge
    pub tile_count: u32,
}

impl Grid {
    pub fn new(zoom_level: u32, modifier: ZoomModifier, tile_count: u32) -> Self {
        Self {
            zoom_level,
            modifier,
            tile_count,
        }
    }

    /// Edge length of one tile in pixels.
    pub fn tile_size(&self) -> u32 {
        self.modifier.tile_size
    }

    /// Edge length of the composed image in pixels.
    pub fn output_size(&self) -> u32 {
        self.tile_count.saturating_mul(self.modifier.tile_size)
    }

    /// Total number of tiles in the grid.
    pub fn tile_total(&self) -> usize {
        self.tile_count as usize * self.tile_count as usize
    }

    /// Every tile position, row by row.
    pub fn positions(&self) -> impl Iterator<Item = TilePosition> {
        let count = self.tile_count;
        (0..count).flat_map(move |row| (0..count).map(move |column| TilePosition { column, row }))
    }
}
