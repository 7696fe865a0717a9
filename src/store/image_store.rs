use std::fmt;
use std::io::{Cursor, ErrorKind};
use std::path::{Path, PathBuf};

use image::{ImageFormat, RgbImage};
use serde::Serialize;
use tracing::debug;

use crate::error::StoreError;

/// Extension of stored images.
pub const IMAGE_EXTENSION: &str = "png";

/// Identifies one composed image: an item at a zoom level.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ImageKey {
    pub item: String,
    pub level: u32,
}

impl ImageKey {
    pub fn new(item: impl Into<String>, level: u32) -> Self {
        Self {
            item: item.into(),
            level,
        }
    }
}

impl fmt::Display for ImageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.item, self.level)
    }
}

/// Directory of composed images, one PNG per key.
///
/// Writes go to a temporary file that is renamed into place, so an
/// interrupted run never leaves a truncated image behind a valid name.
#[derive(Debug, Clone)]
pub struct ImageStore {
    dir: PathBuf,
}

impl ImageStore {
    /// Open the store at `dir`, creating the directory if needed.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        debug!(dir = %dir.display(), "Opened image store");
        Ok(Self { dir })
    }

    /// Directory images are stored in.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path the image for `key` is (or would be) stored at.
    pub fn path(&self, key: &ImageKey) -> PathBuf {
        self.dir.join(format!("{}.{}", key, IMAGE_EXTENSION))
    }

    /// Path of the stored image for `key`, if present.
    pub async fn get(&self, key: &ImageKey) -> Result<Option<PathBuf>, StoreError> {
        let path = self.path(key);
        match tokio::fs::metadata(&path).await {
            Ok(meta) if meta.is_file() => Ok(Some(path)),
            Ok(_) => Ok(None),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Encode `image` as PNG and store it under `key`, replacing any previous image.
    pub async fn put(&self, key: &ImageKey, image: RgbImage) -> Result<PathBuf, StoreError> {
        let path = self.path(key);
        let temp_path = path.with_extension("tmp");

        let encoded = tokio::task::spawn_blocking(move || {
            let mut buf = Cursor::new(Vec::new());
            image
                .write_to(&mut buf, ImageFormat::Png)
                .map_err(|e| StoreError::Image(e.to_string()))?;
            Ok::<_, StoreError>(buf.into_inner())
        })
        .await
        .map_err(|e| StoreError::Image(e.to_string()))??;

        tokio::fs::write(&temp_path, &encoded).await?;
        if let Err(e) = tokio::fs::rename(&temp_path, &path).await {
            let _ = tokio::fs::remove_file(&temp_path).await;
            return Err(e.into());
        }

        debug!(key = %key, path = %path.display(), bytes = encoded.len(), "Stored image");
        Ok(path)
    }

    /// Load the stored image for `key`.
    pub async fn load(&self, key: &ImageKey) -> Result<RgbImage, StoreError> {
        let data = tokio::fs::read(self.path(key)).await?;
        tokio::task::spawn_blocking(move || {
            image::load_from_memory_with_format(&data, ImageFormat::Png)
                .map(|img| img.to_rgb8())
                .map_err(|e| StoreError::Image(e.to_string()))
        })
        .await
        .map_err(|e| StoreError::Image(e.to_string()))?
    }

    /// Delete the stored image for `key`. Returns whether one existed.
    pub async fn remove(&self, key: &ImageKey) -> Result<bool, StoreError> {
        match tokio::fs::remove_file(self.path(key)).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}
