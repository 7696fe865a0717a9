//! Tile URL rules.
//!
//! The compositor never builds URLs itself. It asks a [`TileUrlRule`] for the
//! URL of each `(zoom, modifier, column, row)` tuple. Rules are plain values
//! handed to the compositor by reference; closures work too, which keeps
//! tests free of string templates.

use super::ZoomModifier;

/// Maps a tile address to the URL it is served from.
pub trait TileUrlRule: Send + Sync {
    /// URL of the tile at `column`, `row` for the given zoom level and modifier.
    fn tile_url(&self, zoom_level: u32, modifier: ZoomModifier, column: u32, row: u32) -> String;
}

impl<F> TileUrlRule for F
where
    F: Fn(u32, ZoomModifier, u32, u32) -> String + Send + Sync,
{
    fn tile_url(&self, zoom_level: u32, modifier: ZoomModifier, column: u32, row: u32) -> String {
        self(zoom_level, modifier, column, row)
    }
}

/// Placeholder replaced by the modifier, rendered as `x{level}`.
pub const MODIFIER_PLACEHOLDER: &str = "{modifier}";

/// Placeholder replaced by the zoom level.
pub const ZOOM_PLACEHOLDER: &str = "{zoom}";

/// Placeholder replaced by the tile column.
pub const COLUMN_PLACEHOLDER: &str = "{column}";

/// Placeholder replaced by the tile row.
pub const ROW_PLACEHOLDER: &str = "{row}";

/// A URL pattern with `{modifier}`, `{zoom}`, `{column}` and `{row}` placeholders.
///
/// # Example
///
/// ```
/// use pyramid_stitch::pyramid::{TileUrlRule, TileUrlTemplate, MODIFIER_X2};
///
/// let template = TileUrlTemplate::new("http://host/tiles/bee/{modifier}/{zoom}/{column}/{row}.jpg");
/// assert_eq!(
///     template.tile_url(3, MODIFIER_X2, 5, 7),
///     "http://host/tiles/bee/x2/3/5/7.jpg"
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileUrlTemplate {
    pattern: String,
}

impl TileUrlTemplate {
    /// Create a template from a pattern string.
    pub fn new(pattern: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
        }
    }

    /// The raw pattern.
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Whether the pattern addresses individual tiles.
    ///
    /// A pattern without both `{column}` and `{row}` would map every tile of
    /// a grid to the same URL.
    pub fn addresses_tiles(&self) -> bool {
        self.pattern.contains(COLUMN_PLACEHOLDER) && self.pattern.contains(ROW_PLACEHOLDER)
    }
}

impl TileUrlRule for TileUrlTemplate {
    fn tile_url(&self, zoom_level: u32, modifier: ZoomModifier, column: u32, row: u32) -> String {
        self.pattern
            .replace(MODIFIER_PLACEHOLDER, &modifier.to_string())
            .replace(ZOOM_PLACEHOLDER, &zoom_level.to_string())
            .replace(COLUMN_PLACEHOLDER, &column.to_string())
            .replace(ROW_PLACEHOLDER, &row.to_string())
    }
}
