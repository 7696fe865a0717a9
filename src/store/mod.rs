//! On-disk cache of composed images.
//!
//! Composing a large item downloads thousands of tiles, so finished images
//! are kept as PNG files named after the item and level. A later run finds
//! them with [`ImageStore::get`] and skips the download.

mod image_store;

pub use image_store::{ImageKey, ImageStore, IMAGE_EXTENSION};
