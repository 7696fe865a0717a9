//! Download service integration tests.
//!
//! Tests verify:
//! - Downloads are stored and reused across service instances
//! - Metadata is described once per item
//! - Level walking over several items
//! - Wallpapers are rendered from stored images

use image::Rgb;
use tempfile::TempDir;

use pyramid_stitch::error::{DownloadError, SourceError};
use pyramid_stitch::service::DownloadService;
use pyramid_stitch::source::DescriptorRegistry;
use pyramid_stitch::store::{ImageKey, ImageStore};
use pyramid_stitch::tile::Compositor;
use pyramid_stitch::wallpaper::{WallpaperSpec, WallpaperWriter};

use super::test_utils::{tile_colour, MockSite, MockTransport};

fn site() -> MockSite {
    MockSite::new()
        .with_item("bee", 1024, 3)
        .with_item("wasp", 2048, 4)
}

fn service(dir: &TempDir, transport: MockTransport) -> DownloadService<MockSite, MockTransport> {
    DownloadService::new(
        DescriptorRegistry::new(site()),
        Compositor::new(transport),
        ImageStore::open(dir.path().join("download")).unwrap(),
    )
}

#[tokio::test]
async fn test_stored_image_survives_new_service() {
    let dir = TempDir::new().unwrap();

    let first = service(&dir, MockTransport::new());
    let outcome = first.fetch("bee", None, false, None).await.unwrap();
    assert!(!outcome.cache_hit);
    assert_eq!(outcome.path, dir.path().join("download").join("bee-1.png"));

    // A fresh service over the same directory downloads nothing
    let transport = MockTransport::new();
    let second = service(&dir, transport);
    let again = second.fetch("bee", Some(1), false, None).await.unwrap();
    assert!(again.cache_hit);
    assert_eq!(again.path, outcome.path);
}

#[tokio::test]
async fn test_stored_image_content() {
    let dir = TempDir::new().unwrap();
    let service = service(&dir, MockTransport::new());

    let outcome = service.fetch("bee", Some(1), false, None).await.unwrap();
    let image = service.store().load(&outcome.key).await.unwrap();

    assert_eq!(image.dimensions(), (1024, 1024));
    assert_eq!(*image.get_pixel(0, 0), tile_colour(0, 0));
    assert_eq!(*image.get_pixel(1023, 1023), tile_colour(1, 1));
}

#[tokio::test]
async fn test_incomplete_download_is_reported() {
    let dir = TempDir::new().unwrap();
    let service = service(&dir, MockTransport::new().with_failing_tile(1, 0));

    let outcome = service.fetch("bee", Some(1), false, None).await.unwrap();
    assert!(outcome.is_incomplete());
    let report = outcome.report.as_ref().unwrap();
    assert_eq!(report.tiles_total, 4);
    assert_eq!(report.tiles_placed, 3);

    let image = service.store().load(&outcome.key).await.unwrap();
    assert_eq!(*image.get_pixel(600, 10), Rgb([0, 0, 0]));
}

#[tokio::test]
async fn test_download_describes_each_item_once() {
    let dir = TempDir::new().unwrap();
    let service = service(&dir, MockTransport::new());
    let items = vec!["bee".to_string(), "wasp".to_string()];

    let outcomes = service.download(&items, None, false, None).await.unwrap();
    assert_eq!(outcomes.len(), 5);
    assert_eq!(service.registry().source().describe_count(), 2);

    // Second pass is served from the store
    let again = service.download(&items, None, false, None).await.unwrap();
    assert!(again.iter().all(|o| o.cache_hit));
}

#[tokio::test]
async fn test_unknown_item() {
    let dir = TempDir::new().unwrap();
    let service = service(&dir, MockTransport::new());

    assert!(matches!(
        service.fetch("moth", None, false, None).await,
        Err(DownloadError::Source(SourceError::UnknownItem(_)))
    ));
    assert!(matches!(
        service.resolve_item("moth").await,
        Err(DownloadError::Source(SourceError::UnknownItem(_)))
    ));
}

#[tokio::test]
async fn test_download_then_wallpaper() {
    let dir = TempDir::new().unwrap();
    let service = service(&dir, MockTransport::new());

    let level = service.wallpaper_level("wasp", 800, 450).await.unwrap();
    assert_eq!(level, 1);

    let outcomes = service
        .download(&["wasp".to_string()], Some(level), false, None)
        .await
        .unwrap();
    assert_eq!(outcomes[0].key, ImageKey::new("wasp", 1));

    let writer = WallpaperWriter::open(dir.path().join("wallpaper")).unwrap();
    let spec = WallpaperSpec::new(800, 450, 25, false);
    let path = writer
        .create("wasp", &outcomes[0].path, &spec)
        .await
        .unwrap();

    assert!(path.ends_with("wasp_800x450_full.png"));
    let wallpaper = image::open(&path).unwrap().to_rgb8();
    assert_eq!(wallpaper.dimensions(), (800, 450));
    // Border stays black, centre shows the image
    assert_eq!(*wallpaper.get_pixel(400, 10), Rgb([0, 0, 0]));
    assert_ne!(*wallpaper.get_pixel(400, 225), Rgb([0, 0, 0]));
}
