use thiserror::Error;

/// Errors returned by a tile transport when fetching a URL
#[derive(Debug, Clone, Error)]
pub enum FetchError {
    /// Server answered with a non-success status code
    #[error("HTTP {status} for {url}")]
    Status { url: String, status: u16 },

    /// Network or connection error
    #[error("Connection error: {0}")]
    Connection(String),

    /// HTTP client could not be built or the request could not be formed
    #[error("HTTP client error: {0}")]
    Client(String),
}

/// Per-tile errors. These never abort a composition.
#[derive(Debug, Clone, Error)]
pub enum TileError {
    /// Tile bytes could not be fetched
    #[error("Fetch failed: {0}")]
    Fetch(#[from] FetchError),

    /// Tile bytes could not be decoded into an image
    #[error("Decode failed: {message}")]
    Decode { message: String },

    /// The worker handling the tile stopped before resolving it
    #[error("Tile task aborted: {message}")]
    Aborted { message: String },
}

impl TileError {
    /// Whether the tile failed while being fetched.
    pub fn is_fetch(&self) -> bool {
        matches!(self, TileError::Fetch(_))
    }

    /// Whether the tile was fetched but could not be decoded.
    pub fn is_decode(&self) -> bool {
        matches!(self, TileError::Decode { .. })
    }
}

/// Errors raised when querying or building a pyramid descriptor
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PyramidError {
    /// Modifier is not part of the descriptor's modifier set
    #[error("Invalid zoom modifier x{level} ({tile_size}px tiles)")]
    InvalidModifier { level: u32, tile_size: u32 },

    /// Requested zoom level is not available for the modifier
    #[error("Zoom level {level} out of range for modifier x{modifier}: available levels are 0..={max_level}")]
    LevelOutOfRange {
        level: u32,
        modifier: u32,
        max_level: u32,
    },

    /// Metadata cannot describe a usable pyramid
    #[error("Invalid pyramid: {reason}")]
    InvalidDescriptor { reason: String },
}

/// Errors from the metadata source
#[derive(Debug, Clone, Error)]
pub enum SourceError {
    /// Page could not be fetched
    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    /// Expected attribute was not found in the page markup
    #[error("Missing attribute: {0}")]
    MissingAttribute(&'static str),

    /// Attribute was found but holds an unusable value
    #[error("Invalid value for {name}: {value:?}")]
    InvalidAttribute { name: &'static str, value: String },

    /// Item is not listed by the source
    #[error("Unknown item: {0}")]
    UnknownItem(String),

    /// Metadata does not form a valid pyramid
    #[error("Pyramid error: {0}")]
    Pyramid(#[from] PyramidError),
}

/// Errors from the on-disk image store
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// Filesystem error
    #[error("I/O error: {0}")]
    Io(String),

    /// Image encoding or decoding error
    #[error("Image error: {0}")]
    Image(String),
}

impl From<std::io::Error> for StoreError {
    fn from(err: std::io::Error) -> Self {
        StoreError::Io(err.to_string())
    }
}

/// Errors raised while rendering or writing wallpapers
#[derive(Debug, Clone, Error)]
pub enum WallpaperError {
    /// Requested dimensions or border are unusable
    #[error("Invalid wallpaper spec: {0}")]
    InvalidSpec(String),

    /// Source image could not be read or output could not be encoded
    #[error("Image error: {0}")]
    Image(String),

    /// Filesystem error
    #[error("I/O error: {0}")]
    Io(String),
}

impl From<std::io::Error> for WallpaperError {
    fn from(err: std::io::Error) -> Self {
        WallpaperError::Io(err.to_string())
    }
}

/// Errors that can occur when orchestrating downloads
#[derive(Debug, Clone, Error)]
pub enum DownloadError {
    /// Bad level or modifier for the item
    #[error("{0}")]
    Pyramid(#[from] PyramidError),

    /// Item metadata could not be obtained
    #[error("{0}")]
    Source(#[from] SourceError),

    /// Result could not be cached
    #[error("{0}")]
    Store(#[from] StoreError),
}
