//! Fetch-and-compose integration tests.
//!
//! Tests verify:
//! - Descriptor grids compose into correctly sized images with every tile in place
//! - Tile URLs follow the descriptor's template
//! - Failed tiles leave blank regions without aborting the composition
//! - The concurrency cap holds on large grids
//! - Progress is reported once per tile

use std::collections::HashSet;
use std::time::Duration;

use image::Rgb;

use pyramid_stitch::pyramid::{PyramidDescriptor, MODIFIER_X1, MODIFIER_X2};
use pyramid_stitch::tile::{Compositor, ProgressCounter, DEFAULT_MAX_CONCURRENCY};

use super::test_utils::{close_to, mock_template, tile_colour, MockTransport};

fn descriptor() -> PyramidDescriptor {
    PyramidDescriptor::new(4096, 5, mock_template("bee")).unwrap()
}

// =============================================================================
// Placement
// =============================================================================

#[tokio::test]
async fn test_compose_descriptor_grid() {
    let descriptor = descriptor();
    let grid = descriptor.grid(3, MODIFIER_X1).unwrap();
    assert_eq!(grid.tile_count, 8);

    let compositor = Compositor::new(MockTransport::new());
    let composed = compositor
        .compose(&grid, descriptor.url_template(), None)
        .await;

    assert_eq!(composed.image.dimensions(), (2048, 2048));
    assert!(composed.report.is_complete());
    assert_eq!(composed.report.tiles_placed, 64);

    for row in 0..8 {
        for column in 0..8 {
            let x = column * 256;
            let y = row * 256;
            let expected = tile_colour(column, row);
            assert_eq!(*composed.image.get_pixel(x, y), expected);
            assert_eq!(*composed.image.get_pixel(x + 255, y + 255), expected);
        }
    }
}

#[tokio::test]
async fn test_every_tile_url_requested_once() {
    let descriptor = descriptor();
    let grid = descriptor.grid(2, MODIFIER_X2).unwrap();
    assert_eq!(grid.tile_count, 4);

    let transport = MockTransport::new();
    let compositor = Compositor::new(transport);
    compositor
        .compose(&grid, descriptor.url_template(), None)
        .await;

    let urls = compositor.transport().requested_urls();
    assert_eq!(urls.len(), 16);
    let unique: HashSet<&String> = urls.iter().collect();
    assert_eq!(unique.len(), 16);
    assert!(urls.contains(&"mock://tiles/bee/x2/2/3/1.png".to_string()));
}

#[tokio::test]
async fn test_jpeg_tiles() {
    let descriptor = descriptor();
    let grid = descriptor.grid(0, MODIFIER_X2).unwrap();
    assert_eq!(grid.tile_count, 1);

    let compositor = Compositor::new(MockTransport::new().with_jpeg());
    let composed = compositor
        .compose(&grid, descriptor.url_template(), None)
        .await;

    assert_eq!(composed.image.dimensions(), (512, 512));
    assert!(close_to(
        *composed.image.get_pixel(100, 100),
        tile_colour(0, 0),
        4
    ));
}

// =============================================================================
// Partial Failure
// =============================================================================

#[tokio::test]
async fn test_missing_tile_leaves_blank_region() {
    let descriptor = descriptor();
    let grid = descriptor.grid(2, MODIFIER_X1).unwrap();
    assert_eq!(grid.tile_count, 4);

    let compositor = Compositor::new(MockTransport::new().with_failing_tile(2, 1));
    let composed = compositor
        .compose(&grid, descriptor.url_template(), None)
        .await;

    assert_eq!(composed.image.dimensions(), (1024, 1024));
    assert_eq!(composed.report.tiles_placed, 15);
    assert_eq!(composed.report.failures.len(), 1);
    assert_eq!(
        composed.report.failures[0].url,
        "mock://tiles/bee/x1/2/2/1.png"
    );

    // The failed tile covers x 512..768, y 256..512
    for (x, y) in [(512, 256), (767, 511), (640, 384)] {
        assert_eq!(*composed.image.get_pixel(x, y), Rgb([0, 0, 0]));
    }
    assert_eq!(*composed.image.get_pixel(511, 256), tile_colour(1, 1));
    assert_eq!(*composed.image.get_pixel(768, 256), tile_colour(3, 1));
    assert_eq!(*composed.image.get_pixel(512, 255), tile_colour(2, 0));
    assert_eq!(*composed.image.get_pixel(512, 512), tile_colour(2, 2));
}

#[tokio::test]
async fn test_recomposition_after_failure_is_identical_where_tiles_arrived() {
    let descriptor = descriptor();
    let grid = descriptor.grid(1, MODIFIER_X1).unwrap();

    let healthy = Compositor::new(MockTransport::new())
        .compose(&grid, descriptor.url_template(), None)
        .await;
    let degraded = Compositor::new(MockTransport::new().with_failing_tile(0, 0))
        .compose(&grid, descriptor.url_template(), None)
        .await;

    assert_eq!(healthy.image.dimensions(), degraded.image.dimensions());
    assert_eq!(
        healthy.image.get_pixel(300, 300),
        degraded.image.get_pixel(300, 300)
    );
    assert_ne!(healthy.image.get_pixel(0, 0), degraded.image.get_pixel(0, 0));
}

// =============================================================================
// Concurrency and Progress
// =============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrency_cap_on_large_grid() {
    let descriptor = descriptor();
    let grid = descriptor.grid(3, MODIFIER_X1).unwrap();

    let transport = MockTransport::new().with_delay(Duration::from_millis(2));
    let compositor = Compositor::new(transport);
    let composed = compositor
        .compose(&grid, descriptor.url_template(), None)
        .await;

    assert!(composed.report.is_complete());
    let peak = compositor.transport().peak_in_flight();
    assert!(peak <= DEFAULT_MAX_CONCURRENCY, "peak was {}", peak);
    assert!(peak >= 2, "peak was {}", peak);
}

#[tokio::test]
async fn test_progress_counts_every_tile() {
    let descriptor = descriptor();
    let grid = descriptor.grid(2, MODIFIER_X1).unwrap();
    let counter = ProgressCounter::new();

    let compositor = Compositor::new(
        MockTransport::new()
            .with_failing_tile(0, 0)
            .with_failing_tile(3, 3),
    );
    compositor
        .compose(&grid, descriptor.url_template(), Some(&counter))
        .await;

    assert_eq!(counter.started(), 1);
    assert_eq!(counter.resolved(), 16);
    assert_eq!(counter.failed(), 2);
}
