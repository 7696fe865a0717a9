//! Markup parsing for the gallery site.
//!
//! The site exposes everything the downloader needs in plain HTML:
//!
//! - the home page links every item as `<a href="{item}.html">`
//! - each item page carries a Leaflet zoom widget
//!   `<div id="zoomTool" data-map-bounds="…" data-tile-folder="…" data-max-zoom="…">`
//!
//! Attributes on the zoom widget are read independently, so their order in
//! the tag does not matter.

use std::sync::OnceLock;

use regex::Regex;

use crate::error::SourceError;

/// Attribute holding the full image edge length in pixels.
pub const MAP_BOUNDS_ATTR: &str = "data-map-bounds";

/// Attribute holding the tile directory name.
pub const TILE_FOLDER_ATTR: &str = "data-tile-folder";

/// Attribute holding the pyramid depth.
pub const MAX_ZOOM_ATTR: &str = "data-max-zoom";

/// Metadata read from an item page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemPage {
    /// Full image edge length in pixels
    pub total_size: u32,

    /// Directory the item's tiles are served from
    pub tile_folder: String,

    /// Number of zoom levels in the pyramid
    pub max_zoom: u32,
}

fn item_link_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    // Item names are lower-case words joined by dashes
    PATTERN.get_or_init(|| Regex::new(r#"<a href="([a-z\-]+)\.html">"#).unwrap())
}

fn zoom_tool_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r#"<div\b[^>]*\bid="zoomTool"[^>]*>"#).unwrap())
}

fn attribute_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r#"([a-zA-Z][a-zA-Z0-9\-]*)="([^"]*)""#).unwrap())
}

/// Extract item names from the home page, in page order without duplicates.
pub fn parse_item_list(html: &str) -> Vec<String> {
    let mut items: Vec<String> = Vec::new();
    for caps in item_link_pattern().captures_iter(html) {
        let name = &caps[1];
        if !items.iter().any(|existing| existing == name) {
            items.push(name.to_string());
        }
    }
    items
}

/// Extract the zoom widget metadata from an item page.
pub fn parse_item_page(html: &str) -> Result<ItemPage, SourceError> {
    let tag = zoom_tool_pattern()
        .find(html)
        .ok_or(SourceError::MissingAttribute("zoomTool"))?
        .as_str();

    let total_size = parse_number(MAP_BOUNDS_ATTR, attribute(tag, MAP_BOUNDS_ATTR)?)?;
    let max_zoom = parse_number(MAX_ZOOM_ATTR, attribute(tag, MAX_ZOOM_ATTR)?)?;

    let tile_folder = attribute(tag, TILE_FOLDER_ATTR)?;
    if tile_folder.is_empty() || tile_folder.contains(['/', '\\']) || tile_folder.contains("..") {
        return Err(SourceError::InvalidAttribute {
            name: TILE_FOLDER_ATTR,
            value: tile_folder.to_string(),
        });
    }

    Ok(ItemPage {
        total_size,
        tile_folder: tile_folder.to_string(),
        max_zoom,
    })
}

fn attribute<'a>(tag: &'a str, name: &'static str) -> Result<&'a str, SourceError> {
    attribute_pattern()
        .captures_iter(tag)
        .find(|caps| &caps[1] == name)
        .and_then(|caps| caps.get(2))
        .map(|m| m.as_str().trim())
        .ok_or(SourceError::MissingAttribute(name))
}

fn parse_number(name: &'static str, value: &str) -> Result<u32, SourceError> {
    value.parse().map_err(|_| SourceError::InvalidAttribute {
        name,
        value: value.to_string(),
    })
}
