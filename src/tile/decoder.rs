//! Tile decoder.
//!
//! Turns fetched tile bytes into an RGB pixel grid of exactly the modifier's
//! tile size.
//!
//! # Design Decisions
//!
//! - **Format sniffing**: the container format is guessed from the bytes, not
//!   from the URL extension. Hosts occasionally serve PNG under `.jpg`.
//!
//! - **Always RGB**: grayscale and alpha tiles are converted to 8-bit RGB so
//!   every tile can be copied straight into the composed image.
//!
//! - **Exact tile size**: a tile whose dimensions differ from the expected
//!   tile size is scaled to fit its slot, so it never spills into or leaves
//!   gaps beside its neighbours.

use std::io::Cursor;

use image::imageops::{self, FilterType};
use image::{ImageReader, RgbImage};

use crate::error::TileError;

/// Decodes raw tile bytes into fixed-size RGB tiles.
pub trait TileDecoder: Send + Sync + 'static {
    /// Decode `data` into a `tile_size × tile_size` RGB image.
    fn decode(&self, data: &[u8], tile_size: u32) -> Result<RgbImage, TileError>;
}

/// Decoder backed by the `image` crate (JPEG and PNG).
#[derive(Debug, Clone, Default)]
pub struct RgbTileDecoder {}

impl RgbTileDecoder {
    /// Create a new decoder.
    pub fn new() -> Self {
        Self {}
    }
}

impl TileDecoder for RgbTileDecoder {
    fn decode(&self, data: &[u8], tile_size: u32) -> Result<RgbImage, TileError> {
        let img = guessed_reader(data)?
            .decode()
            .map_err(|e| TileError::Decode {
                message: e.to_string(),
            })?
            .to_rgb8();

        if img.width() == tile_size && img.height() == tile_size {
            Ok(img)
        } else {
            Ok(imageops::resize(
                &img,
                tile_size,
                tile_size,
                FilterType::Triangle,
            ))
        }
    }
}

fn guessed_reader(data: &[u8]) -> Result<ImageReader<Cursor<&[u8]>>, TileError> {
    ImageReader::new(Cursor::new(data))
        .with_guessed_format()
        .map_err(|e| TileError::Decode {
            message: e.to_string(),
        })
}
