use async_trait::async_trait;
use bytes::Bytes;

use crate::error::FetchError;

/// Trait for fetching the raw bytes behind a URL.
///
/// The compositor and the metadata source only see this trait, so tests can
/// serve tiles and pages from memory. Implementations must be thread-safe:
/// one transport is shared by every tile worker of a composition.
#[async_trait]
pub trait TileTransport: Send + Sync {
    /// Fetch the body at `url`.
    ///
    /// Returns `FetchError::Status` for a non-success HTTP status and
    /// `FetchError::Connection` when the request could not complete. No
    /// retries are attempted.
    async fn fetch(&self, url: &str) -> Result<Bytes, FetchError>;
}

#[async_trait]
impl<T: TileTransport + ?Sized> TileTransport for std::sync::Arc<T> {
    async fn fetch(&self, url: &str) -> Result<Bytes, FetchError> {
        (**self).fetch(url).await
    }
}
