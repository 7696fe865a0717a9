//! Zoom modifiers.
//!
//! A tile pyramid can be addressed with several modifiers. Each modifier
//! trades tile size for grid density: a modifier with a larger tile size
//! skips more pyramid depth per zoom step, so the same zoom level yields a
//! larger output image.

use std::fmt;

use serde::Serialize;

/// A zoom modifier: a depth offset paired with the tile edge it serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct ZoomModifier {
    /// Offset subtracted from the pyramid depth when addressing tiles
    pub level: u32,

    /// Edge length of one tile in pixels
    pub tile_size: u32,
}

impl ZoomModifier {
    /// Create a new zoom modifier.
    pub const fn new(level: u32, tile_size: u32) -> Self {
        Self { level, tile_size }
    }
}

/// Renders as it appears in tile URLs, e.g. `x2`.
impl fmt::Display for ZoomModifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "x{}", self.level)
    }
}

/// 256px tiles, one level of depth per zoom step.
pub const MODIFIER_X1: ZoomModifier = ZoomModifier::new(1, 256);

/// 512px tiles, two levels of depth per zoom step.
pub const MODIFIER_X2: ZoomModifier = ZoomModifier::new(2, 512);

/// Modifier set served by the upstream viewer, ordered coarse to fine.
pub const DEFAULT_MODIFIERS: [ZoomModifier; 2] = [MODIFIER_X1, MODIFIER_X2];
