//! Error types for the im tool

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for im operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the im tool
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to decode image {path}: {message}")]
    Decode { path: PathBuf, message: String },

    #[error("Failed to encode image {path}: {message}")]
    Encode { path: PathBuf, message: String },

    #[error("Failed to read EXIF data from {path}: {message}")]
    ExifRead { path: PathBuf, message: String },

    #[error("Failed to initialize terminal: {0}")]
    TerminalInit(String),

    #[error("Crop window {x},{y} {width}x{height} lies outside image {image_width}x{image_height}")]
    CropOutOfBounds {
        x: u32,
        y: u32,
        width: u32,
        height: u32,
        image_width: u32,
        image_height: u32,
    },

    #[error("Expected {inputs} output paths, got {outputs}")]
    OutputCountMismatch { inputs: usize, outputs: usize },

    #[error("Need at least {needed} input images, got {got}")]
    NotEnoughInputs { needed: usize, got: usize },

    #[error("No displayable images found in the given paths")]
    NoImages,

    #[error("Configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),
}
