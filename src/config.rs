//! Configuration types for the im tool

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Configuration for the im tool
///
/// Loaded from an optional TOML file; CLI arguments override file settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Default target for the larger dimension in `im resize`
    #[serde(default = "default_resize_size")]
    pub resize_size: u32,

    /// Default slideshow auto-advance timeout in seconds
    #[serde(default = "default_slideshow_timeout")]
    pub slideshow_timeout: f64,

    /// Supported image extensions
    #[serde(default = "default_image_extensions")]
    pub image_extensions: Vec<String>,

    /// Verbose output
    #[serde(default)]
    pub verbose: bool,
}

fn default_resize_size() -> u32 {
    1000
}

fn default_slideshow_timeout() -> f64 {
    3.0
}

fn default_image_extensions() -> Vec<String> {
    vec![
        "jpg".into(),
        "jpeg".into(),
        "png".into(),
        "gif".into(),
        "bmp".into(),
        "webp".into(),
        "tiff".into(),
        "tif".into(),
    ]
}

impl Default for Config {
    fn default() -> Self {
        Self {
            resize_size: default_resize_size(),
            slideshow_timeout: default_slideshow_timeout(),
            image_extensions: default_image_extensions(),
            verbose: false,
        }
    }
}

impl Config {
    /// Check if a file extension is a supported image format
    pub fn is_image(&self, ext: &str) -> bool {
        let ext_lower = ext.to_lowercase();
        self.image_extensions.iter().any(|e| e == &ext_lower)
    }

    /// Check if a path has a supported image extension
    pub fn is_image_path(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| self.is_image(e))
    }

    /// Load configuration from a TOML file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        let config: Config = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            source: e,
        })?;

        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| ConfigError::WriteError {
                path: path.to_path_buf(),
                source: e,
            })?;
        }

        let content =
            toml::to_string_pretty(self).map_err(|e| ConfigError::SerializeError { source: e })?;

        fs::write(path, content).map_err(|e| ConfigError::WriteError {
            path: path.to_path_buf(),
            source: e,
        })?;

        Ok(())
    }

    /// Generate a sample configuration file content
    pub fn sample_config() -> String {
        r#"# im Configuration File
# This file uses TOML format (https://toml.io)

# Default target for the larger dimension in `im resize`
resize_size = 1000

# Default slideshow auto-advance timeout in seconds for `im show --slideshow`
slideshow_timeout = 3.0

# Supported image extensions (customize as needed)
image_extensions = ["jpg", "jpeg", "png", "gif", "bmp", "webp", "tiff", "tif"]

# Verbose output - show detailed processing information
verbose = false
"#
        .to_string()
    }
}

/// Errors that can occur when loading or saving configuration
#[derive(Debug)]
pub enum ConfigError {
    /// Failed to read configuration file
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },
    /// Failed to parse configuration file
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },
    /// Failed to write configuration file
    WriteError {
        path: PathBuf,
        source: std::io::Error,
    },
    /// Failed to serialize configuration
    SerializeError { source: toml::ser::Error },
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::ReadError { path, source } => {
                write!(f, "Failed to read config file '{}': {}", path.display(), source)
            }
            ConfigError::ParseError { path, source } => {
                write!(f, "Failed to parse config file '{}': {}", path.display(), source)
            }
            ConfigError::WriteError { path, source } => {
                write!(f, "Failed to write config file '{}': {}", path.display(), source)
            }
            ConfigError::SerializeError { source } => {
                write!(f, "Failed to serialize config: {}", source)
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::ReadError { source, .. } => Some(source),
            ConfigError::ParseError { source, .. } => Some(source),
            ConfigError::WriteError { source, .. } => Some(source),
            ConfigError::SerializeError { source } => Some(source),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.resize_size, 1000);
        assert!((config.slideshow_timeout - 3.0).abs() < f64::EPSILON);
        assert!(config.is_image("JPG"));
        assert!(config.is_image("png"));
        assert!(!config.is_image("mp4"));
    }

    #[test]
    fn test_load_partial_file() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"resize_size = 640\n").unwrap();
        file.flush().unwrap();

        let config = Config::load_from_file(file.path()).unwrap();
        assert_eq!(config.resize_size, 640);
        // Unset fields fall back to defaults
        assert!((config.slideshow_timeout - 3.0).abs() < f64::EPSILON);
        assert!(config.is_image("webp"));
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("im.toml");

        let mut config = Config::default();
        config.resize_size = 800;
        config.save_to_file(&path).unwrap();

        let reloaded = Config::load_from_file(&path).unwrap();
        assert_eq!(reloaded.resize_size, 800);
    }

    #[test]
    fn test_sample_config_parses() {
        let config: Config = toml::from_str(&Config::sample_config()).unwrap();
        assert_eq!(config.resize_size, 1000);
    }
}
