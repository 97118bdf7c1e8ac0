//! Gallery configuration module.
//!
//! Handles loading and validating the `gallery.toml` file. Every key is
//! optional: stock defaults fill in whatever the file leaves out, and a missing
//! file means "all defaults".
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! image_dir = "../ComfyUI/output"  # Directory of source images
//! host = "0.0.0.0"                 # Listen address
//! port = 18001                     # Listen port
//! cache_dir = "cache/thumbnails"   # Where generated thumbnails are stored
//!
//! [thumbnails]
//! width = 300                      # Target width in pixels (never upscaled)
//! quality = 70                     # JPEG quality (1-100)
//!
//! [processing]
//! max_processes = 4                # Thumbnail workers (omit for auto = CPU cores)
//! timeout_secs = 30                # Give up waiting on a thumbnail (omit = wait forever)
//! ```
//!
//! Relative `image_dir` and `cache_dir` values are resolved against the
//! directory that holds the config file, not the process working directory.
//!
//! Unknown keys are rejected to catch typos early.
//!
//! Type errors are load errors too. A `port` that is not an integer stops
//! startup with the TOML error instead of falling back to 18001.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Default config file name, looked up in the working directory.
pub const CONFIG_FILENAME: &str = "gallery.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Gallery configuration loaded from `gallery.toml`.
///
/// Built once at startup and handed to the components that need it; nothing
/// reads configuration from global state.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GalleryConfig {
    /// Directory the gallery lists and serves images from.
    pub image_dir: PathBuf,
    /// Address the HTTP server binds to.
    pub host: String,
    /// Port the HTTP server listens on.
    pub port: u16,
    /// Root of the thumbnail cache.
    pub cache_dir: PathBuf,
    /// Thumbnail generation settings.
    pub thumbnails: ThumbnailsConfig,
    /// Worker pool settings.
    pub processing: ProcessingConfig,
}

impl Default for GalleryConfig {
    fn default() -> Self {
        Self {
            image_dir: PathBuf::from("../ComfyUI/output"),
            host: "0.0.0.0".to_string(),
            port: 18001,
            cache_dir: PathBuf::from("cache/thumbnails"),
            thumbnails: ThumbnailsConfig::default(),
            processing: ProcessingConfig::default(),
        }
    }
}

impl GalleryConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.port == 0 {
            return Err(ConfigError::Validation("port must be non-zero".into()));
        }
        if self.thumbnails.width == 0 {
            return Err(ConfigError::Validation(
                "thumbnails.width must be non-zero".into(),
            ));
        }
        if !(1..=100).contains(&self.thumbnails.quality) {
            return Err(ConfigError::Validation(
                "thumbnails.quality must be 1-100".into(),
            ));
        }
        if self.processing.timeout_secs == Some(0) {
            return Err(ConfigError::Validation(
                "processing.timeout_secs must be non-zero when set".into(),
            ));
        }
        Ok(())
    }

    /// Anchor relative directories at `base` (the config file's directory).
    pub fn resolve_paths(mut self, base: &Path) -> Self {
        if self.image_dir.is_relative() {
            self.image_dir = base.join(&self.image_dir);
        }
        if self.cache_dir.is_relative() {
            self.cache_dir = base.join(&self.cache_dir);
        }
        self
    }
}

/// Thumbnail generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ThumbnailsConfig {
    /// Target thumbnail width. Narrower sources keep their own width.
    pub width: u32,
    /// JPEG encoding quality (1 = worst, 100 = best).
    pub quality: u32,
}

impl Default for ThumbnailsConfig {
    fn default() -> Self {
        Self {
            width: 300,
            quality: 70,
        }
    }
}

/// Worker pool settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Maximum number of thumbnail workers.
    /// When absent, defaults to the number of CPU cores.
    /// Values larger than the core count are clamped down.
    pub max_processes: Option<usize>,
    /// How long a request waits for its thumbnail before answering with an
    /// error. Absent means no limit.
    pub timeout_secs: Option<u64>,
}

impl ProcessingConfig {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

/// Resolve the effective worker count from config.
///
/// - `None` → use all available cores
/// - `Some(n)` → use `min(n, cores)`, at least one
pub fn effective_threads(config: &ProcessingConfig) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    config
        .max_processes
        .map(|n| n.clamp(1, cores))
        .unwrap_or(cores)
}

/// Load config from the TOML file at `path`.
///
/// A missing file yields the stock defaults. Relative directories are
/// resolved against the file's parent directory, and the result is validated.
pub fn load_config(path: &Path) -> Result<GalleryConfig, ConfigError> {
    let config = if path.exists() {
        let content = fs::read_to_string(path)?;
        toml::from_str::<GalleryConfig>(&content)?
    } else {
        GalleryConfig::default()
    };
    let base = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    let config = config.resolve_paths(&base);
    config.validate()?;
    Ok(config)
}

/// Returns a fully-commented stock `gallery.toml` with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# Comfy Gallery Configuration
# ===========================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults.
#
# Relative paths are resolved against the directory holding this file.
# Unknown keys will cause an error.

# Directory of source images to list and serve.
image_dir = "../ComfyUI/output"

# Listen address and port for the web UI.
host = "0.0.0.0"
port = 18001

# Where generated thumbnails are cached. Safe to delete at any time.
cache_dir = "cache/thumbnails"

# ---------------------------------------------------------------------------
# Thumbnails
# ---------------------------------------------------------------------------
[thumbnails]
# Target width in pixels. Height follows the source aspect ratio.
# Images narrower than this are never upscaled.
width = 300

# JPEG quality (1 = worst, 100 = best).
quality = 70

# ---------------------------------------------------------------------------
# Processing
# ---------------------------------------------------------------------------
[processing]
# Maximum parallel thumbnail workers.
# Omit or comment out to auto-detect (= number of CPU cores).
# max_processes = 4

# Seconds a request waits for a thumbnail before failing.
# Omit to wait as long as it takes.
# timeout_secs = 30
"##
}
