//! Parameter types for thumbnail encoding.
//!
//! - [`Quality`]: JPEG quality (1-100, default 70). Clamped on construction.
//! - [`ThumbnailSpec`]: target width plus quality, everything the codec needs
//!   to know about the output.

use crate::config::ThumbnailsConfig;

/// Quality setting for lossy image encoding (1-100).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quality(pub u32);

impl Quality {
    pub fn new(value: u32) -> Self {
        Self(value.clamp(1, 100))
    }

    pub fn value(self) -> u32 {
        self.0
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self(70)
    }
}

/// Output shape of a generated thumbnail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThumbnailSpec {
    /// Target width; narrower sources keep their width.
    pub width: u32,
    pub quality: Quality,
}

impl Default for ThumbnailSpec {
    fn default() -> Self {
        Self {
            width: 300,
            quality: Quality::default(),
        }
    }
}

impl From<&ThumbnailsConfig> for ThumbnailSpec {
    fn from(config: &ThumbnailsConfig) -> Self {
        Self {
            width: config.width.max(1),
            quality: Quality::new(config.quality),
        }
    }
}
