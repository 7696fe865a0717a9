//! Wallpaper rendering.
//!
//! Turns a composed square image into a screen-sized wallpaper: optionally
//! trims the uniform background around the subject, scales the result to
//! fit inside a border and centres it on a black canvas.

use std::path::{Path, PathBuf};

use image::imageops::{self, FilterType};
use image::{ImageFormat, Rgb, RgbImage};
use serde::Serialize;
use tracing::{debug, info};

use crate::error::WallpaperError;

/// Largest per-channel difference from the corner colour still treated as background.
///
/// Tiles are JPEG compressed, so a flat background is never exactly flat.
pub const TRIM_TOLERANCE: u8 = 16;

/// Colour of the area around the scaled image.
const BACKGROUND: Rgb<u8> = Rgb([0, 0, 0]);

// =============================================================================
// WallpaperSpec
// =============================================================================

/// Target geometry of a wallpaper.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct WallpaperSpec {
    /// Output width in pixels
    pub width: u32,

    /// Output height in pixels
    pub height: u32,

    /// Minimum blank margin on every side, in pixels
    pub border: u32,

    /// Remove uniform background edges before scaling
    pub trim: bool,
}

impl WallpaperSpec {
    pub fn new(width: u32, height: u32, border: u32, trim: bool) -> Self {
        Self {
            width,
            height,
            border,
            trim,
        }
    }

    /// Check that the geometry leaves a drawable area.
    pub fn validate(&self) -> Result<(), WallpaperError> {
        if self.width == 0 || self.height == 0 {
            return Err(WallpaperError::InvalidSpec(
                "width and height must be positive".to_string(),
            ));
        }
        if self.border.saturating_mul(2) >= self.width.min(self.height) {
            return Err(WallpaperError::InvalidSpec(format!(
                "border {} leaves no room in {}x{}",
                self.border, self.width, self.height
            )));
        }
        Ok(())
    }

    /// Area available to the image inside the border.
    pub fn inner_size(&self) -> (u32, u32) {
        (
            self.width.saturating_sub(2 * self.border),
            self.height.saturating_sub(2 * self.border),
        )
    }

    /// File name of the wallpaper rendered from `name` with this spec.
    pub fn file_name(&self, name: &str) -> String {
        let mode = if self.trim { "trimmed" } else { "full" };
        format!("{}_{}x{}_{}.png", name, self.width, self.height, mode)
    }
}

// =============================================================================
// Rendering
// =============================================================================

/// Render `source` into a wallpaper of exactly `spec.width × spec.height`.
pub fn render(source: &RgbImage, spec: &WallpaperSpec) -> Result<RgbImage, WallpaperError> {
    spec.validate()?;
    if source.width() == 0 || source.height() == 0 {
        return Err(WallpaperError::Image("source image is empty".to_string()));
    }

    let trimmed;
    let subject = if spec.trim {
        trimmed = trim_uniform_edges(source, TRIM_TOLERANCE);
        &trimmed
    } else {
        source
    };

    let (fit_width, fit_height) = fit_within(subject.dimensions(), spec.inner_size());
    let scaled = if (fit_width, fit_height) == subject.dimensions() {
        subject.clone()
    } else {
        imageops::resize(subject, fit_width, fit_height, FilterType::Lanczos3)
    };

    let mut canvas = RgbImage::from_pixel(spec.width, spec.height, BACKGROUND);
    let x = (spec.width - fit_width) / 2;
    let y = (spec.height - fit_height) / 2;
    imageops::replace(&mut canvas, &scaled, i64::from(x), i64::from(y));

    debug!(
        source_width = source.width(),
        source_height = source.height(),
        scaled_width = fit_width,
        scaled_height = fit_height,
        "Rendered wallpaper"
    );
    Ok(canvas)
}

/// Largest size with the aspect ratio of `size` that fits inside `bounds`.
///
/// Never returns a zero dimension.
pub fn fit_within(size: (u32, u32), bounds: (u32, u32)) -> (u32, u32) {
    let (width, height) = size;
    let (max_width, max_height) = bounds;
    if width == 0 || height == 0 {
        return (max_width.max(1), max_height.max(1));
    }

    let factor = (max_width as f64 / width as f64).min(max_height as f64 / height as f64);
    let fit_width = ((width as f64 * factor).floor() as u32).clamp(1, max_width.max(1));
    let fit_height = ((height as f64 * factor).floor() as u32).clamp(1, max_height.max(1));
    (fit_width, fit_height)
}

/// Crop away rows and columns that only contain the top-left corner colour.
///
/// A pixel matches when every channel is within `tolerance` of the corner.
/// An image that is entirely background is returned unchanged.
pub fn trim_uniform_edges(image: &RgbImage, tolerance: u8) -> RgbImage {
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return image.clone();
    }

    let corner = *image.get_pixel(0, 0);
    let is_background = |x: u32, y: u32| {
        let Rgb(p) = image.get_pixel(x, y);
        p.iter()
            .zip(corner.0.iter())
            .all(|(a, b)| a.abs_diff(*b) <= tolerance)
    };
    let row_is_background = |y: u32| (0..width).all(|x| is_background(x, y));
    let column_is_background = |x: u32, top: u32, bottom: u32| (top..bottom).all(|y| is_background(x, y));

    let Some(top) = (0..height).find(|&y| !row_is_background(y)) else {
        return image.clone();
    };
    // A non-background row exists, so this always finds one
    let bottom = (top..height)
        .rev()
        .find(|&y| !row_is_background(y))
        .map_or(height, |y| y + 1);
    let left = (0..width)
        .find(|&x| !column_is_background(x, top, bottom))
        .unwrap_or(0);
    let right = (left..width)
        .rev()
        .find(|&x| !column_is_background(x, top, bottom))
        .map_or(width, |x| x + 1);

    imageops::crop_imm(image, left, top, right - left, bottom - top).to_image()
}

// =============================================================================
// WallpaperWriter
// =============================================================================

/// Writes rendered wallpapers into a directory.
#[derive(Debug, Clone)]
pub struct WallpaperWriter {
    dir: PathBuf,
}

impl WallpaperWriter {
    /// Create a writer for `dir`, creating the directory if needed.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, WallpaperError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path the wallpaper for `name` is written to.
    pub fn path(&self, name: &str, spec: &WallpaperSpec) -> PathBuf {
        self.dir.join(spec.file_name(name))
    }

    /// Render the image stored at `source_path` and write it as a PNG.
    pub async fn create(
        &self,
        name: &str,
        source_path: &Path,
        spec: &WallpaperSpec,
    ) -> Result<PathBuf, WallpaperError> {
        spec.validate()?;
        let output = self.path(name, spec);
        let source_path = source_path.to_path_buf();
        let target = output.clone();
        let spec = *spec;

        tokio::task::spawn_blocking(move || -> Result<(), WallpaperError> {
            let source = image::open(&source_path)
                .map_err(|e| WallpaperError::Image(format!("{}: {}", source_path.display(), e)))?
                .to_rgb8();
            let wallpaper = render(&source, &spec)?;
            wallpaper
                .save_with_format(&target, ImageFormat::Png)
                .map_err(|e| WallpaperError::Image(e.to_string()))
        })
        .await
        .map_err(|e| WallpaperError::Image(e.to_string()))??;

        info!(name, path = %output.display(), "Wrote wallpaper");
        Ok(output)
    }
}

// =============================================================================
// Tests
// =============================================================================
