//! Configuration management for Pyramid Stitch.
//!
//! This module provides the command-line surface:
//! - Subcommands and arguments via clap
//! - Environment variables with `STITCH_` prefix
//! - Sensible defaults for all optional settings
//!
//! # Example
//!
//! ```ignore
//! use clap::Parser;
//! use pyramid_stitch::config::{Cli, Command};
//!
//! match Cli::parse().into_command() {
//!     Command::List(config) => println!("site: {}", config.common.site_url),
//!     Command::Levels(config) => println!("item: {:?}", config.item),
//!     Command::Download(config) => println!("level: {:?}", config.level),
//! }
//! ```
//!
//! # Environment Variables
//!
//! The shared options and wallpaper settings can be set via environment
//! variables with the `STITCH_` prefix:
//!
//! - `STITCH_SITE_URL` - Gallery site root (default: http://microsculpture.net)
//! - `STITCH_CACHE_DIR` - Directory for composed images (default: download)
//! - `STITCH_CONCURRENCY` - Tiles fetched in parallel (default: 4)
//! - `STITCH_TIMEOUT` - Per-request timeout in seconds (default: 30)
//! - `STITCH_WALLPAPER_DIR` - Directory for wallpapers (default: wallpaper)
//! - `STITCH_WIDTH` / `STITCH_HEIGHT` - Wallpaper size (default: 3840x2160)
//! - `STITCH_BORDER` - Wallpaper border in pixels (default: 100)

use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};

use crate::tile::DEFAULT_MAX_CONCURRENCY;
use crate::wallpaper::WallpaperSpec;

pub use crate::io::DEFAULT_TIMEOUT_SECS;

// =============================================================================
// Default Values
// =============================================================================

/// Default gallery site root.
pub const DEFAULT_SITE_URL: &str = "http://microsculpture.net";

/// Default directory for composed images.
pub const DEFAULT_CACHE_DIR: &str = "download";

/// Default directory for wallpapers.
pub const DEFAULT_WALLPAPER_DIR: &str = "wallpaper";

/// Default number of tiles fetched in parallel.
pub const DEFAULT_CONCURRENCY: usize = DEFAULT_MAX_CONCURRENCY;

/// Default wallpaper width.
pub const DEFAULT_WALLPAPER_WIDTH: u32 = 3840;

/// Default wallpaper height.
pub const DEFAULT_WALLPAPER_HEIGHT: u32 = 2160;

/// Default wallpaper border.
pub const DEFAULT_WALLPAPER_BORDER: u32 = 100;

// =============================================================================
// CLI Arguments
// =============================================================================

/// Pyramid Stitch - Download and stitch zoomable gallery images.
///
/// Reconstructs full images from the tile pyramids of an online gallery and
/// turns them into desktop wallpapers.
#[derive(Parser, Debug, Clone)]
#[command(name = "pyramid-stitch")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    pub fn into_command(self) -> Command {
        self.command
    }
}

/// Available subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// List every item in the gallery.
    List(ListConfig),

    /// List the zoom levels of one item, or of every item.
    Levels(LevelsConfig),

    /// Download one item, or every item, and create wallpapers.
    Download(DownloadConfig),
}

impl Command {
    /// Options shared by every subcommand.
    pub fn common(&self) -> &CommonConfig {
        match self {
            Command::List(config) => &config.common,
            Command::Levels(config) => &config.common,
            Command::Download(config) => &config.common,
        }
    }
}

// =============================================================================
// Shared Options
// =============================================================================

/// Options shared by every subcommand.
#[derive(Args, Debug, Clone)]
pub struct CommonConfig {
    /// Root URL of the gallery site.
    #[arg(long, default_value = DEFAULT_SITE_URL, env = "STITCH_SITE_URL")]
    pub site_url: String,

    /// Directory composed images are cached in.
    #[arg(long, default_value = DEFAULT_CACHE_DIR, env = "STITCH_CACHE_DIR")]
    pub cache_dir: PathBuf,

    /// Maximum number of tiles fetched in parallel.
    #[arg(long, default_value_t = DEFAULT_CONCURRENCY, env = "STITCH_CONCURRENCY")]
    pub concurrency: usize,

    /// Per-request timeout in seconds.
    #[arg(long, default_value_t = DEFAULT_TIMEOUT_SECS, env = "STITCH_TIMEOUT")]
    pub timeout: u64,

    /// Enable verbose logging (debug level).
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,
}

impl CommonConfig {
    /// Validate the configuration and return an error message if invalid.
    pub fn validate(&self) -> Result<(), String> {
        if self.site_url.trim().is_empty() {
            return Err("Site URL is required. Set --site-url or STITCH_SITE_URL".to_string());
        }

        if self.concurrency == 0 {
            return Err("concurrency must be greater than 0".to_string());
        }

        if self.timeout == 0 {
            return Err("timeout must be greater than 0".to_string());
        }

        Ok(())
    }

    /// Per-request timeout.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }
}

// =============================================================================
// List Command
// =============================================================================

/// Configuration for the `list` subcommand.
#[derive(Args, Debug, Clone)]
pub struct ListConfig {
    #[command(flatten)]
    pub common: CommonConfig,

    /// Print the list as JSON.
    #[arg(long, default_value_t = false)]
    pub json: bool,
}

impl ListConfig {
    pub fn validate(&self) -> Result<(), String> {
        self.common.validate()
    }
}

// =============================================================================
// Levels Command
// =============================================================================

/// Configuration for the `levels` subcommand.
#[derive(Args, Debug, Clone)]
pub struct LevelsConfig {
    /// Item to inspect. All items when omitted.
    pub item: Option<String>,

    #[command(flatten)]
    pub common: CommonConfig,

    /// Print the levels as JSON.
    #[arg(long, default_value_t = false)]
    pub json: bool,
}

impl LevelsConfig {
    pub fn validate(&self) -> Result<(), String> {
        self.common.validate()
    }
}

// =============================================================================
// Download Command
// =============================================================================

/// Configuration for the `download` subcommand.
#[derive(Args, Debug, Clone)]
pub struct DownloadConfig {
    /// Item to download. All items when omitted.
    pub item: Option<String>,

    /// Zoom level to download.
    ///
    /// Defaults to the level best suited to the wallpaper size, or to every
    /// level when wallpapers are disabled.
    #[arg(short, long)]
    pub level: Option<u32>,

    /// Ignore cached images and download again.
    #[arg(short, long, default_value_t = false)]
    pub force: bool,

    /// Skip wallpaper creation.
    #[arg(long, default_value_t = false)]
    pub no_wallpaper: bool,

    /// Wallpaper width in pixels.
    #[arg(short, long, default_value_t = DEFAULT_WALLPAPER_WIDTH, env = "STITCH_WIDTH")]
    pub width: u32,

    /// Wallpaper height in pixels.
    #[arg(long, default_value_t = DEFAULT_WALLPAPER_HEIGHT, env = "STITCH_HEIGHT")]
    pub height: u32,

    /// Blank border around the wallpaper image, in pixels.
    #[arg(short, long, default_value_t = DEFAULT_WALLPAPER_BORDER, env = "STITCH_BORDER")]
    pub border: u32,

    /// Keep the uniform background around the subject.
    #[arg(long, default_value_t = false)]
    pub no_trim: bool,

    /// Directory wallpapers are written to.
    #[arg(long, default_value = DEFAULT_WALLPAPER_DIR, env = "STITCH_WALLPAPER_DIR")]
    pub wallpaper_dir: PathBuf,

    #[command(flatten)]
    pub common: CommonConfig,

    /// Print a JSON summary of every download.
    #[arg(long, default_value_t = false)]
    pub json: bool,
}

impl DownloadConfig {
    /// Validate the configuration and return an error message if invalid.
    pub fn validate(&self) -> Result<(), String> {
        self.common.validate()?;

        if self.width == 0 || self.height == 0 {
            return Err("Wallpaper width and height must be positive".to_string());
        }

        if self.border.saturating_mul(2) >= self.width.min(self.height) {
            return Err(format!(
                "Wallpaper border must be smaller than half of the width and height ({}x{})",
                self.width, self.height
            ));
        }

        Ok(())
    }

    /// Whether wallpapers should be created.
    pub fn wallpapers_enabled(&self) -> bool {
        !self.no_wallpaper
    }

    /// Wallpaper geometry described by the options.
    pub fn wallpaper_spec(&self) -> WallpaperSpec {
        WallpaperSpec::new(self.width, self.height, self.border, !self.no_trim)
    }
}

// =============================================================================
// Tests
// =============================================================================
