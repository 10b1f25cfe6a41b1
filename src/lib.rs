//! im - Image manipulation tool
//!
//! This library provides the functionality behind the `im` binary:
//! - Grayscale conversion, resizing, rotation, cropping and stacking
//! - EXIF metadata inspection and stripping
//! - An in-terminal image viewer with a bounded indexed-color palette,
//!   interactive navigation and timed slideshow mode

pub mod cli;
pub mod config;
pub mod error;
pub mod meta;
pub mod ops;
pub mod viewer;

pub use cli::{Cli, Command};
pub use config::{Config, ConfigError};
pub use error::{Error, Result};
pub use viewer::{ExitKey, show};
