//! In-terminal image viewer
//!
//! Renders decoded images into the character grid of the terminal using a
//! bounded palette of indexed colors, and drives an interactive or timed
//! slideshow over a sequence of images. The terminal's palette and mode are
//! restored on every exit path.

pub mod nav;
pub mod palette;
pub mod quantize;
pub mod render;
pub mod term;

pub use nav::{ExitKey, NavKey, NavMode, Navigator};
pub use palette::{MAX_SLOTS, RESERVED_SLOTS, SlotAllocator};
pub use term::{CrosstermBackend, Session, TermBackend};

use crate::config::Config;
use crate::error::{Error, Result};
use image::RgbImage;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};
use walkdir::WalkDir;

/// A single 24-bit pixel color
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Squared euclidean distance in RGB space
    pub fn distance_sq(self, other: Rgb) -> u32 {
        let dr = self.r as i32 - other.r as i32;
        let dg = self.g as i32 - other.g as i32;
        let db = self.b as i32 - other.b as i32;
        (dr * dr + dg * dg + db * db) as u32
    }
}

/// A decoded image as a row-major pixel buffer
///
/// Produced by the decoder, consumed once per render. The viewer core never
/// retains frames between renders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<Rgb>,
}

impl Frame {
    pub fn new(width: u32, height: u32, pixels: Vec<Rgb>) -> Self {
        debug_assert_eq!((width * height) as usize, pixels.len());
        Self {
            width,
            height,
            pixels,
        }
    }

    pub fn get(&self, x: u32, y: u32) -> Rgb {
        self.pixels[(y * self.width + x) as usize]
    }
}

impl From<&RgbImage> for Frame {
    fn from(img: &RgbImage) -> Self {
        let pixels = img.pixels().map(|p| Rgb::new(p[0], p[1], p[2])).collect();
        Frame::new(img.width(), img.height(), pixels)
    }
}

/// Collect displayable image paths from files and directories
///
/// Plain file arguments are taken as-is; directories are walked recursively
/// and filtered by the configured image extensions. The combined list is
/// sorted for a stable slideshow order.
pub fn collect_images(inputs: &[PathBuf], config: &Config) -> Result<Vec<PathBuf>> {
    let mut images = Vec::new();

    for input in inputs {
        if input.is_dir() {
            for entry in WalkDir::new(input)
                .follow_links(false)
                .into_iter()
                .filter_map(|e| e.ok())
            {
                let path = entry.path();
                if path.is_file() && config.is_image_path(path) {
                    images.push(path.to_path_buf());
                }
            }
        } else {
            images.push(input.clone());
        }
    }

    images.sort();
    images.dedup();

    if images.is_empty() {
        return Err(Error::NoImages);
    }

    debug!(count = images.len(), "Collected images for display");
    Ok(images)
}

/// Display a sequence of images inside the terminal
///
/// Entry point for `im show`. Blocks until the user quits or, in slideshow
/// mode, the sequence is exhausted. Returns the key that ended the session.
pub fn show(inputs: &[PathBuf], slideshow: bool, timeout_secs: f64, config: &Config) -> Result<ExitKey> {
    let images = collect_images(inputs, config)?;

    let mode = if slideshow {
        NavMode::Slideshow
    } else {
        NavMode::Interactive
    };
    let timeout = Duration::from_secs_f64(timeout_secs.max(0.05));
    let mut navigator = Navigator::new(images.len(), mode, timeout);

    let backend = CrosstermBackend::new();
    let mut session = Session::begin(backend)?;

    info!(count = images.len(), ?mode, "Viewer session started");

    // Teardown must run before any loop error is reported to the caller;
    // Session's Drop covers panics.
    let outcome = nav::run(&mut session, &images, &mut navigator);
    let teardown = session.end();

    let exit_key = outcome?;
    teardown?;
    info!(?exit_key, "Viewer session ended");
    Ok(exit_key)
}

/// Decode an image file for display
pub(crate) fn decode(path: &Path) -> Result<image::DynamicImage> {
    image::open(path).map_err(|e| Error::Decode {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}
