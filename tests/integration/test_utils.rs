//! Test utilities for integration tests.
//!
//! This module provides mock implementations of the transport and metadata
//! source, and helpers for generating tile images.

use async_trait::async_trait;
use bytes::Bytes;
use image::codecs::jpeg::JpegEncoder;
use image::{ImageFormat, Rgb, RgbImage};
use std::collections::{HashMap, HashSet};
use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use pyramid_stitch::error::{FetchError, SourceError};
use pyramid_stitch::io::TileTransport;
use pyramid_stitch::pyramid::{PyramidDescriptor, TileUrlTemplate};
use pyramid_stitch::source::MetadataSource;

// =============================================================================
// Tile Images
// =============================================================================

/// Colour of the tile at `(column, row)`, distinct for small grids.
pub fn tile_colour(column: u32, row: u32) -> Rgb<u8> {
    Rgb([
        (column * 37 % 200 + 20) as u8,
        (row * 53 % 200 + 20) as u8,
        128,
    ])
}

/// Encode a solid tile as PNG.
pub fn solid_png(size: u32, colour: Rgb<u8>) -> Bytes {
    let img = RgbImage::from_pixel(size, size, colour);
    let mut buf = Cursor::new(Vec::new());
    img.write_to(&mut buf, ImageFormat::Png).unwrap();
    Bytes::from(buf.into_inner())
}

/// Encode a solid tile as JPEG.
pub fn solid_jpeg(size: u32, colour: Rgb<u8>) -> Bytes {
    let img = RgbImage::from_pixel(size, size, colour);
    let mut buf = Vec::new();
    JpegEncoder::new_with_quality(&mut buf, 95)
        .encode_image(&img)
        .unwrap();
    Bytes::from(buf)
}

/// Whether two colours differ by at most `tolerance` per channel.
pub fn close_to(a: Rgb<u8>, b: Rgb<u8>, tolerance: u8) -> bool {
    a.0.iter().zip(b.0.iter()).all(|(x, y)| x.abs_diff(*y) <= tolerance)
}

/// URL template used by [`MockSite`] descriptors.
pub fn mock_template(item: &str) -> TileUrlTemplate {
    TileUrlTemplate::new(format!(
        "mock://tiles/{}/{{modifier}}/{{zoom}}/{{column}}/{{row}}.png",
        item
    ))
}

/// Split a mock tile URL into `(modifier, zoom, column, row)`.
pub fn parse_tile_url(url: &str) -> Option<(String, u32, u32, u32)> {
    let mut parts = url.trim_end_matches(".png").rsplit('/');
    let row = parts.next()?.parse().ok()?;
    let column = parts.next()?.parse().ok()?;
    let zoom = parts.next()?.parse().ok()?;
    let modifier = parts.next()?.to_string();
    Some((modifier, zoom, column, row))
}

// =============================================================================
// Mock Transport with Request Tracking
// =============================================================================

/// A mock transport that serves generated tiles and tracks requests.
///
/// Tiles are solid squares coloured by [`tile_colour`], sized by the
/// modifier segment of the URL (`x1` → 256px, `x2` → 512px). The transport
/// records every requested URL and the highest number of requests in flight
/// at once.
pub struct MockTransport {
    failing: HashSet<(u32, u32)>,
    pages: HashMap<String, Bytes>,
    delay: Duration,
    jpeg: bool,
    request_count: AtomicUsize,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
    requested: Mutex<Vec<String>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self {
            failing: HashSet::new(),
            pages: HashMap::new(),
            delay: Duration::ZERO,
            jpeg: false,
            request_count: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            peak_in_flight: AtomicUsize::new(0),
            requested: Mutex::new(Vec::new()),
        }
    }

    /// Answer 404 for the tile at `(column, row)` on every level.
    pub fn with_failing_tile(mut self, column: u32, row: u32) -> Self {
        self.failing.insert((column, row));
        self
    }

    /// Serve `body` for an exact URL.
    pub fn with_page(mut self, url: &str, body: &str) -> Self {
        self.pages
            .insert(url.to_string(), Bytes::from(body.to_string()));
        self
    }

    /// Hold every request for `delay` before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Serve tiles as JPEG instead of PNG.
    pub fn with_jpeg(mut self) -> Self {
        self.jpeg = true;
        self
    }

    pub fn request_count(&self) -> usize {
        self.request_count.load(Ordering::SeqCst)
    }

    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    pub fn requested_urls(&self) -> Vec<String> {
        self.requested.lock().unwrap().clone()
    }
}

#[async_trait]
impl TileTransport for MockTransport {
    async fn fetch(&self, url: &str) -> Result<Bytes, FetchError> {
        self.request_count.fetch_add(1, Ordering::SeqCst);
        self.requested.lock().unwrap().push(url.to_string());

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(now, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if let Some(body) = self.pages.get(url) {
            return Ok(body.clone());
        }

        let not_found = || FetchError::Status {
            url: url.to_string(),
            status: 404,
        };
        let (modifier, _zoom, column, row) = parse_tile_url(url).ok_or_else(not_found)?;
        if self.failing.contains(&(column, row)) {
            return Err(not_found());
        }

        let size = match modifier.as_str() {
            "x1" => 256,
            "x2" => 512,
            _ => return Err(not_found()),
        };
        let colour = tile_colour(column, row);
        Ok(if self.jpeg {
            solid_jpeg(size, colour)
        } else {
            solid_png(size, colour)
        })
    }
}

// =============================================================================
// Mock Metadata Source
// =============================================================================

/// A mock metadata source with a fixed item list.
pub struct MockSite {
    items: Vec<(String, u32, u32)>,
    describe_count: AtomicUsize,
}

impl MockSite {
    pub fn new() -> Self {
        Self {
            items: Vec::new(),
            describe_count: AtomicUsize::new(0),
        }
    }

    /// Add an item with the given full size and pyramid depth.
    pub fn with_item(mut self, name: &str, total_size: u32, max_zoom: u32) -> Self {
        self.items.push((name.to_string(), total_size, max_zoom));
        self
    }

    pub fn describe_count(&self) -> usize {
        self.describe_count.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MetadataSource for MockSite {
    async fn list_items(&self) -> Result<Vec<String>, SourceError> {
        Ok(self.items.iter().map(|(name, _, _)| name.clone()).collect())
    }

    async fn describe(&self, item: &str) -> Result<PyramidDescriptor, SourceError> {
        self.describe_count.fetch_add(1, Ordering::SeqCst);
        let (name, total_size, max_zoom) = self
            .items
            .iter()
            .find(|(name, _, _)| name == item)
            .ok_or_else(|| SourceError::UnknownItem(item.to_string()))?;
        Ok(PyramidDescriptor::new(
            *total_size,
            *max_zoom,
            mock_template(name),
        )?)
    }
}
