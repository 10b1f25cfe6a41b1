//! CLI argument parsing with clap

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// im - Image manipulation tool
///
/// Converts, resizes, rotates, crops and stacks images, edits EXIF
/// metadata, and displays images directly inside the terminal with an
/// interactive or timed slideshow viewer.
#[derive(Parser, Debug)]
#[command(name = "im")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to configuration file (TOML format)
    ///
    /// When specified, settings from the config file are used as defaults.
    /// CLI arguments will override config file settings.
    #[arg(short = 'C', long, global = true)]
    pub config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output log format as JSON
    #[arg(long, global = true)]
    pub json_log: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Image operations
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Convert images to grayscale
    Gray {
        /// Input image paths
        #[arg(required = true)]
        input: Vec<PathBuf>,

        /// Path to output image (repeatable, one per input)
        #[arg(short, long)]
        output: Vec<PathBuf>,

        /// Overwrite input images
        #[arg(short = 'w', long)]
        overwrite: bool,
    },

    /// Resize images to the given size (larger dimension)
    Resize {
        /// Input image paths
        #[arg(required = true)]
        input: Vec<PathBuf>,

        /// Path to output image (repeatable, one per input)
        #[arg(short, long)]
        output: Vec<PathBuf>,

        /// Overwrite input images
        #[arg(short = 'w', long)]
        overwrite: bool,

        /// Target size for the larger dimension (config default: 1000)
        #[arg(short, long)]
        size: Option<u32>,

        /// Exact output width (requires --height, overrides --size)
        #[arg(long, requires = "height")]
        width: Option<u32>,

        /// Exact output height (requires --width, overrides --size)
        #[arg(long, requires = "width")]
        height: Option<u32>,
    },

    /// Rotate images by EXIF orientation or by quarter turns
    Rotate {
        /// Input image paths
        #[arg(required = true)]
        input: Vec<PathBuf>,

        /// Path to output image (repeatable, one per input)
        #[arg(short, long)]
        output: Vec<PathBuf>,

        /// Overwrite input images
        #[arg(short = 'w', long)]
        overwrite: bool,

        /// Number of 90-degree counter-clockwise turns
        ///
        /// Without this flag the turn count is derived from the image's
        /// EXIF orientation tag.
        #[arg(short, long, allow_negative_numbers = true)]
        k: Option<i32>,
    },

    /// Crop images using an x, y, width, height window
    Crop {
        /// Input image paths
        #[arg(required = true)]
        input: Vec<PathBuf>,

        /// Path to output image (repeatable, one per input)
        #[arg(short, long)]
        output: Vec<PathBuf>,

        /// Upper left crop window corner x coordinate
        #[arg(short, long, default_value_t = 0)]
        x: u32,

        /// Upper left crop window corner y coordinate
        #[arg(short, long, default_value_t = 0)]
        y: u32,

        /// Crop window width
        #[arg(short, long)]
        width: u32,

        /// Crop window height
        #[arg(short = 'H', long)]
        height: u32,

        /// Overwrite input images
        #[arg(long)]
        overwrite: bool,
    },

    /// Join images vertically (default) or horizontally
    Stack {
        /// Input image paths (at least two)
        #[arg(required = true)]
        input: Vec<PathBuf>,

        /// Path to output image
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Join images horizontally
        #[arg(short = 'H', long)]
        horizontal: bool,
    },

    /// Show or remove EXIF metadata
    Exif {
        /// Input image paths
        #[arg(required = true)]
        input: Vec<PathBuf>,

        /// Show image EXIF info
        #[arg(short, long)]
        show: bool,

        /// Remove EXIF info from image (re-encodes in place)
        #[arg(short, long)]
        remove: bool,
    },

    /// Print a sample configuration or write the effective one
    Config {
        /// Write the effective configuration to this path instead of
        /// printing a commented sample
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Display images inside the terminal
    Show {
        /// Image files or directories to display
        #[arg(required = true)]
        input: Vec<PathBuf>,

        /// Auto-advance through images after a timeout
        #[arg(short = 'S', long)]
        slideshow: bool,

        /// Slideshow timeout in seconds (config default: 3.0)
        #[arg(short, long)]
        timeout: Option<f64>,
    },
}

impl Cli {
    /// Name of the selected subcommand, for log naming
    pub fn command_name(&self) -> &'static str {
        match self.command {
            Command::Gray { .. } => "gray",
            Command::Resize { .. } => "resize",
            Command::Rotate { .. } => "rotate",
            Command::Crop { .. } => "crop",
            Command::Stack { .. } => "stack",
            Command::Exif { .. } => "exif",
            Command::Config { .. } => "config",
            Command::Show { .. } => "show",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_show() {
        let cli = Cli::parse_from(["im", "show", "a.jpg", "b.jpg", "--slideshow", "-t", "1.5"]);
        match cli.command {
            Command::Show {
                input,
                slideshow,
                timeout,
            } => {
                assert_eq!(input.len(), 2);
                assert!(slideshow);
                assert_eq!(timeout, Some(1.5));
            }
            _ => panic!("expected show command"),
        }
    }

    #[test]
    fn test_parse_rotate_negative_k() {
        let cli = Cli::parse_from(["im", "rotate", "a.jpg", "-k", "-1"]);
        match cli.command {
            Command::Rotate { k, .. } => assert_eq!(k, Some(-1)),
            _ => panic!("expected rotate command"),
        }
    }

    #[test]
    fn test_parse_config_subcommand() {
        let cli = Cli::parse_from(["im", "config", "-o", "im.toml"]);
        match cli.command {
            Command::Config { output } => assert_eq!(output, Some(PathBuf::from("im.toml"))),
            _ => panic!("expected config command"),
        }
    }

    #[test]
    fn test_command_name() {
        let cli = Cli::parse_from(["im", "gray", "a.jpg"]);
        assert_eq!(cli.command_name(), "gray");
    }
}
