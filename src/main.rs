//! Pyramid Stitch - Download and stitch zoomable gallery images.
//!
//! This binary wires the metadata source, compositor and image store
//! together and runs one subcommand.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use pyramid_stitch::{
    config::{Cli, Command, CommonConfig, DownloadConfig, LevelsConfig, ListConfig},
    io::HttpTransport,
    pyramid::{Grid, TilePosition},
    service::{DownloadService, FetchOutcome},
    source::{DescriptorRegistry, SiteSource},
    store::ImageStore,
    tile::{Compositor, ProgressSink, TileOutcome},
    wallpaper::WallpaperWriter,
};

type Service = DownloadService<SiteSource<Arc<HttpTransport>>, HttpTransport>;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let command = cli.into_command();

    init_logging(command.common().verbose);

    match command {
        Command::List(config) => run_list(config).await,
        Command::Levels(config) => run_levels(config).await,
        Command::Download(config) => run_download(config).await,
    }
}

// =============================================================================
// List Command
// =============================================================================

async fn run_list(config: ListConfig) -> ExitCode {
    if let Err(e) = config.validate() {
        error!("Configuration error: {}", e);
        return ExitCode::FAILURE;
    }

    let Some(service) = build_service(&config.common) else {
        return ExitCode::FAILURE;
    };

    let items = match service.catalog().await {
        Ok(items) => items,
        Err(e) => {
            error!("Failed to list items: {}", e);
            return ExitCode::FAILURE;
        }
    };

    if config.json {
        return print_json(&*items);
    }
    for item in items.iter() {
        println!("{}", item);
    }
    ExitCode::SUCCESS
}

// =============================================================================
// Levels Command
// =============================================================================

#[derive(Serialize)]
struct ItemLevels {
    item: String,
    levels: Vec<u32>,
}

async fn run_levels(config: LevelsConfig) -> ExitCode {
    if let Err(e) = config.validate() {
        error!("Configuration error: {}", e);
        return ExitCode::FAILURE;
    }

    let Some(service) = build_service(&config.common) else {
        return ExitCode::FAILURE;
    };

    let items = match select_items(&service, config.item.as_deref()).await {
        Some(items) => items,
        None => return ExitCode::FAILURE,
    };

    let mut rows = Vec::with_capacity(items.len());
    for item in items {
        match service.levels(&item).await {
            Ok(levels) => rows.push(ItemLevels { item, levels }),
            Err(e) => {
                error!("Failed to read levels of {}: {}", item, e);
                return ExitCode::FAILURE;
            }
        }
    }

    if config.json {
        return print_json(&rows);
    }

    let width = rows.iter().map(|row| row.item.len()).max().unwrap_or(0);
    for row in &rows {
        let levels: Vec<String> = row.levels.iter().map(u32::to_string).collect();
        println!("{:width$} {}", row.item, levels.join(", "), width = width);
    }
    ExitCode::SUCCESS
}

// =============================================================================
// Download Command
// =============================================================================

#[derive(Serialize)]
struct DownloadSummary {
    downloads: Vec<FetchOutcome>,
    wallpapers: Vec<PathBuf>,
}

async fn run_download(config: DownloadConfig) -> ExitCode {
    if let Err(e) = config.validate() {
        error!("Configuration error: {}", e);
        return ExitCode::FAILURE;
    }

    let Some(service) = build_service(&config.common) else {
        return ExitCode::FAILURE;
    };

    let Some(items) = select_items(&service, config.item.as_deref()).await else {
        return ExitCode::FAILURE;
    };
    if items.is_empty() {
        warn!("No items to download");
        return ExitCode::SUCCESS;
    }

    let mut level = config.level;

    // An explicit level must exist on an explicitly named item
    if let (Some(requested), Some(item)) = (level, config.item.as_ref().and(items.first())) {
        match service.levels(item).await {
            Ok(levels) if levels.contains(&requested) => {}
            Ok(levels) => {
                error!(
                    "Level {} is not available for {} (available: {:?}). Use \"levels {}\" to list them.",
                    requested, item, levels, item
                );
                return ExitCode::FAILURE;
            }
            Err(e) => {
                error!("Failed to read levels of {}: {}", item, e);
                return ExitCode::FAILURE;
            }
        }
    }

    // Heuristic: trimming or differing pyramids may still land below the target size
    if level.is_none() && config.wallpapers_enabled() {
        match service
            .wallpaper_level(&items[0], config.width, config.height)
            .await
        {
            Ok(chosen) => {
                info!(level = chosen, "Selected level for {}x{} wallpapers", config.width, config.height);
                level = Some(chosen);
            }
            Err(e) => {
                error!("Failed to pick a wallpaper level: {}", e);
                return ExitCode::FAILURE;
            }
        }
    }

    let progress = TileProgress::new();
    let downloads = match service
        .download(&items, level, config.force, Some(&progress))
        .await
    {
        Ok(outcomes) => outcomes,
        Err(e) => {
            progress.finish();
            error!("Download failed: {}", e);
            return ExitCode::FAILURE;
        }
    };
    progress.finish();

    for outcome in &downloads {
        if outcome.is_incomplete() {
            warn!(key = %outcome.key, "Image is missing tiles; rerun with --force to retry");
        }
    }

    let mut wallpapers = Vec::new();
    if config.wallpapers_enabled() {
        let writer = match WallpaperWriter::open(&config.wallpaper_dir) {
            Ok(writer) => writer,
            Err(e) => {
                error!("Failed to open wallpaper directory: {}", e);
                return ExitCode::FAILURE;
            }
        };

        let spec = config.wallpaper_spec();
        for outcome in &downloads {
            match writer.create(&outcome.key.item, &outcome.path, &spec).await {
                Ok(path) => wallpapers.push(path),
                Err(e) => {
                    error!("Failed to create wallpaper for {}: {}", outcome.key.item, e);
                    return ExitCode::FAILURE;
                }
            }
        }
    }

    if config.json {
        return print_json(&DownloadSummary {
            downloads,
            wallpapers,
        });
    }

    for outcome in &downloads {
        let source = if outcome.cache_hit { "cached" } else { "downloaded" };
        println!("{} ({})", outcome.path.display(), source);
    }
    for path in &wallpapers {
        println!("{}", path.display());
    }
    ExitCode::SUCCESS
}

// =============================================================================
// Helpers
// =============================================================================

/// Initialize the tracing subscriber for logging.
fn init_logging(verbose: bool) {
    let env_filter = if verbose {
        "pyramid_stitch=debug"
    } else {
        "pyramid_stitch=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| env_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

/// Build the download service from the shared options.
fn build_service(config: &CommonConfig) -> Option<Service> {
    let transport = match HttpTransport::with_timeout(config.timeout()) {
        Ok(transport) => Arc::new(transport),
        Err(e) => {
            error!("Failed to create HTTP client: {}", e);
            return None;
        }
    };

    let source = match SiteSource::new(Arc::clone(&transport), &config.site_url) {
        Ok(source) => source,
        Err(e) => {
            error!("Invalid site URL: {}", e);
            return None;
        }
    };

    let store = match ImageStore::open(&config.cache_dir) {
        Ok(store) => store,
        Err(e) => {
            error!("Failed to open cache directory {}: {}", config.cache_dir.display(), e);
            return None;
        }
    };
    info!("Caching images in {}", store.dir().display());

    let compositor =
        Compositor::with_shared_transport(transport).with_max_concurrency(config.concurrency);

    Some(DownloadService::new(
        DescriptorRegistry::new(source),
        compositor,
        store,
    ))
}

/// The named item, or every item when none is named. Logs and returns `None` on failure.
async fn select_items(service: &Service, item: Option<&str>) -> Option<Vec<String>> {
    let result = match item {
        Some(name) => service.resolve_item(name).await.map(|item| vec![item]),
        None => service.catalog().await.map(|items| items.to_vec()),
    };

    match result {
        Ok(items) => Some(items),
        Err(e) => {
            error!("{}. Use \"list\" to show valid items.", e);
            None
        }
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> ExitCode {
    match serde_json::to_string_pretty(value) {
        Ok(json) => {
            println!("{}", json);
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("Failed to serialize output: {}", e);
            ExitCode::FAILURE
        }
    }
}

// =============================================================================
// Progress Bar
// =============================================================================

/// Console progress bar, restarted for every composition.
struct TileProgress {
    bar: ProgressBar,
}

impl TileProgress {
    fn new() -> Self {
        let bar = ProgressBar::hidden();
        if let Ok(style) = ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} {msg}")
        {
            bar.set_style(style.progress_chars("##-"));
        }
        Self { bar }
    }

    fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

impl ProgressSink for TileProgress {
    fn on_start(&self, grid: &Grid) {
        self.bar
            .set_draw_target(indicatif::ProgressDrawTarget::stderr());
        self.bar.reset();
        self.bar.set_length(grid.tile_total() as u64);
        self.bar.set_message(format!(
            "level {} ({}px)",
            grid.zoom_level,
            grid.output_size()
        ));
    }

    fn on_tile(&self, _position: TilePosition, outcome: TileOutcome<'_>) {
        if !outcome.is_placed() {
            self.bar.set_message("some tiles failed");
        }
        self.bar.inc(1);
    }
}
