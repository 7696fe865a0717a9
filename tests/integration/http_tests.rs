//! Live HTTP integration tests.
//!
//! An axum server on 127.0.0.1 stands in for the gallery site. Tests verify:
//! - The reqwest transport maps statuses and bodies correctly
//! - Item listing and page scraping against served HTML
//! - Full compositions fetched over real sockets

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use image::Rgb;
use tempfile::TempDir;

use pyramid_stitch::error::{FetchError, SourceError};
use pyramid_stitch::io::{HttpTransport, TileTransport};
use pyramid_stitch::service::DownloadService;
use pyramid_stitch::source::{DescriptorRegistry, MetadataSource, SiteSource};
use pyramid_stitch::store::ImageStore;
use pyramid_stitch::tile::Compositor;

use super::test_utils::{solid_png, tile_colour};

const HOME_PAGE: &str = r#"<html><body>
  <a href="weevil.html"><img src="thumb.jpg"></a>
  <a href="weevil.html">Weevil</a>
  <a href="orchid-bee.html">Orchid Bee</a>
</body></html>"#;

const WEEVIL_PAGE: &str = r#"<html><body>
  <div id="zoomTool" class="map"
       data-map-bounds="1024"
       data-tile-folder="weevil"
       data-max-zoom="3"></div>
</body></html>"#;

// =============================================================================
// Test Server
// =============================================================================

struct SiteState {
    failing: HashSet<(u32, u32)>,
    tile_hits: AtomicUsize,
}

async fn home() -> Html<&'static str> {
    Html(HOME_PAGE)
}

async fn page(Path(page): Path<String>) -> Response {
    match page.as_str() {
        "weevil.html" => Html(WEEVIL_PAGE).into_response(),
        "broken.html" => Html("<html>no viewer here</html>").into_response(),
        _ => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn tile(
    State(state): State<Arc<SiteState>>,
    Path((folder, modifier, _zoom, column, file)): Path<(String, String, u32, u32, String)>,
) -> Response {
    state.tile_hits.fetch_add(1, Ordering::SeqCst);

    let Some(row) = file
        .strip_suffix(".jpg")
        .and_then(|row| row.parse::<u32>().ok())
    else {
        return StatusCode::NOT_FOUND.into_response();
    };
    if folder != "weevil" || state.failing.contains(&(column, row)) {
        return StatusCode::NOT_FOUND.into_response();
    }

    let size = match modifier.as_str() {
        "x1" => 256,
        "x2" => 512,
        _ => return StatusCode::NOT_FOUND.into_response(),
    };

    // Served as PNG under a .jpg name; the decoder sniffs the content
    (
        [(header::CONTENT_TYPE, "image/jpeg")],
        solid_png(size, tile_colour(column, row)).to_vec(),
    )
        .into_response()
}

async fn overloaded() -> StatusCode {
    StatusCode::SERVICE_UNAVAILABLE
}

/// Start the test site and return its base URL.
async fn spawn_site(failing: &[(u32, u32)]) -> (String, Arc<SiteState>) {
    let state = Arc::new(SiteState {
        failing: failing.iter().copied().collect(),
        tile_hits: AtomicUsize::new(0),
    });

    let app = Router::new()
        .route("/", get(home))
        .route("/busy", get(overloaded))
        .route("/{page}", get(page))
        .route(
            "/assets/img/tiles/{folder}/{modifier}/{zoom}/{column}/{file}",
            get(tile),
        )
        .with_state(Arc::clone(&state));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{}", addr), state)
}

fn transport() -> Arc<HttpTransport> {
    Arc::new(HttpTransport::with_timeout(std::time::Duration::from_secs(10)).unwrap())
}

// =============================================================================
// Transport
// =============================================================================

#[tokio::test]
async fn test_transport_fetches_body() {
    let (base, _state) = spawn_site(&[]).await;
    let body = transport().fetch(&format!("{}/", base)).await.unwrap();
    assert_eq!(body.as_ref(), HOME_PAGE.as_bytes());
}

#[tokio::test]
async fn test_transport_maps_status() {
    let (base, _state) = spawn_site(&[]).await;
    let transport = transport();

    let url = format!("{}/missing.html", base);
    match transport.fetch(&url).await {
        Err(FetchError::Status { url: failed, status }) => {
            assert_eq!(status, 404);
            assert_eq!(failed, url);
        }
        other => panic!("unexpected {:?}", other),
    }

    assert!(matches!(
        transport.fetch(&format!("{}/busy", base)).await,
        Err(FetchError::Status { status: 503, .. })
    ));
}

// =============================================================================
// Site Source
// =============================================================================

#[tokio::test]
async fn test_site_source_scrapes_pages() {
    let (base, _state) = spawn_site(&[]).await;
    let source = SiteSource::new(transport(), &base).unwrap();

    assert_eq!(
        source.list_items().await.unwrap(),
        vec!["weevil", "orchid-bee"]
    );

    let descriptor = source.describe("weevil").await.unwrap();
    assert_eq!(descriptor.total_size(), 1024);
    assert_eq!(descriptor.max_zoom_levels(), 3);
    assert_eq!(
        descriptor.available_levels(descriptor.finest_modifier()).unwrap(),
        vec![0, 1]
    );

    assert!(matches!(
        source.describe("moth").await,
        Err(SourceError::UnknownItem(_))
    ));
    assert!(matches!(
        source.describe("broken").await,
        Err(SourceError::MissingAttribute(_))
    ));
}

// =============================================================================
// End to End
// =============================================================================

#[tokio::test]
async fn test_compose_over_http() {
    let (base, state) = spawn_site(&[(0, 1)]).await;
    let source = SiteSource::new(transport(), &base).unwrap();
    let descriptor = source.describe("weevil").await.unwrap();
    let grid = descriptor.finest_grid(None).unwrap();

    let compositor = Compositor::with_shared_transport(transport());
    let composed = compositor
        .compose(&grid, descriptor.url_template(), None)
        .await;

    assert_eq!(composed.image.dimensions(), (1024, 1024));
    assert_eq!(composed.report.tiles_placed, 3);
    assert_eq!(state.tile_hits.load(Ordering::SeqCst), 4);

    let failure = &composed.report.failures[0];
    assert_eq!(
        failure.url,
        format!("{}/assets/img/tiles/weevil/x2/1/0/1.jpg", base)
    );
    assert!(failure.error.is_fetch());

    assert_eq!(*composed.image.get_pixel(700, 100), tile_colour(1, 0));
    assert_eq!(*composed.image.get_pixel(100, 700), Rgb([0, 0, 0]));
}

#[tokio::test]
async fn test_download_service_over_http() {
    let (base, state) = spawn_site(&[]).await;
    let dir = TempDir::new().unwrap();

    let transport = transport();
    let service = DownloadService::new(
        DescriptorRegistry::new(SiteSource::new(Arc::clone(&transport), &base).unwrap()),
        Compositor::with_shared_transport(transport),
        ImageStore::open(dir.path()).unwrap(),
    );

    assert_eq!(service.resolve_item("Weevil").await.unwrap(), "weevil");

    let outcome = service.fetch("weevil", Some(0), false, None).await.unwrap();
    assert!(!outcome.cache_hit);
    assert_eq!(state.tile_hits.load(Ordering::SeqCst), 1);

    let again = service.fetch("weevil", Some(0), false, None).await.unwrap();
    assert!(again.cache_hit);
    assert_eq!(state.tile_hits.load(Ordering::SeqCst), 1);

    let image = service.store().load(&outcome.key).await.unwrap();
    assert_eq!(image.dimensions(), (512, 512));
    assert_eq!(*image.get_pixel(256, 256), tile_colour(0, 0));
}
