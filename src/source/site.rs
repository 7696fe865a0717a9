//! Metadata source backed by the gallery web site.

use async_trait::async_trait;
use tracing::debug;
use url::Url;

use super::page::{parse_item_list, parse_item_page};
use super::MetadataSource;
use crate::error::{FetchError, SourceError};
use crate::io::TileTransport;
use crate::pyramid::{
    PyramidDescriptor, TileUrlTemplate, COLUMN_PLACEHOLDER, MODIFIER_PLACEHOLDER,
    ROW_PLACEHOLDER, ZOOM_PLACEHOLDER,
};

/// Path under the site root where tile folders live.
pub const TILE_ROOT: &str = "assets/img/tiles";

/// Scrapes item listings and pyramid metadata from the gallery site.
///
/// Item pages are fetched through the same transport as tiles.
pub struct SiteSource<T> {
    transport: T,
    base: Url,
}

impl<T: TileTransport> SiteSource<T> {
    /// Create a source for the site rooted at `site_url`.
    pub fn new(transport: T, site_url: &str) -> Result<Self, SourceError> {
        let mut base = Url::parse(site_url)
            .map_err(|e| FetchError::Client(format!("Invalid site URL {:?}: {}", site_url, e)))?;

        if base.cannot_be_a_base() {
            return Err(FetchError::Client(format!("Invalid site URL {:?}", site_url)).into());
        }

        // Relative joins must stay below the configured path
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }

        Ok(Self { transport, base })
    }

    /// The site root every page and tile URL is resolved against.
    pub fn base_url(&self) -> &Url {
        &self.base
    }

    /// URL of the page describing `item`.
    pub fn item_url(&self, item: &str) -> Result<Url, SourceError> {
        self.join(&format!("{}.html", item))
    }

    /// Tile URL template for a tile folder.
    pub fn tile_template(&self, tile_folder: &str) -> TileUrlTemplate {
        TileUrlTemplate::new(format!(
            "{}{}/{}/{}/{}/{}/{}.jpg",
            self.base,
            TILE_ROOT,
            tile_folder,
            MODIFIER_PLACEHOLDER,
            ZOOM_PLACEHOLDER,
            COLUMN_PLACEHOLDER,
            ROW_PLACEHOLDER
        ))
    }

    fn join(&self, path: &str) -> Result<Url, SourceError> {
        self.base
            .join(path)
            .map_err(|e| FetchError::Client(format!("Invalid path {:?}: {}", path, e)).into())
    }

    async fn fetch_text(&self, url: &Url) -> Result<String, FetchError> {
        let body = self.transport.fetch(url.as_str()).await?;
        Ok(String::from_utf8_lossy(&body).into_owned())
    }
}

#[async_trait]
impl<T: TileTransport> MetadataSource for SiteSource<T> {
    async fn list_items(&self) -> Result<Vec<String>, SourceError> {
        let html = self.fetch_text(&self.base).await?;
        let items = parse_item_list(&html);
        debug!(site = %self.base, count = items.len(), "Listed items");
        Ok(items)
    }

    async fn describe(&self, item: &str) -> Result<PyramidDescriptor, SourceError> {
        let url = self.item_url(item)?;
        let html = match self.fetch_text(&url).await {
            Ok(html) => html,
            Err(FetchError::Status { status: 404, .. }) => {
                return Err(SourceError::UnknownItem(item.to_string()))
            }
            Err(e) => return Err(e.into()),
        };

        let page = parse_item_page(&html)?;
        debug!(
            item,
            total_size = page.total_size,
            max_zoom = page.max_zoom,
            tile_folder = %page.tile_folder,
            "Parsed item page"
        );

        let template = self.tile_template(&page.tile_folder);
        Ok(PyramidDescriptor::new(
            page.total_size,
            page.max_zoom,
            template,
        )?)
    }
}
