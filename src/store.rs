//! Read-only access to the source image directory.
//!
//! The store is the only place that turns a request filename into a path on
//! disk. Filenames are relative paths under the store root; anything that
//! would escape it (absolute paths, `..`, drive prefixes) is treated as
//! not found rather than resolved.
//!
//! Listing is flat: only the top level of the root is enumerated, and only
//! files with a recognized image extension are returned.

use serde::Serialize;
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;
use tracing::debug;

/// Extensions listed by the gallery (compared case-insensitively).
pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "webp"];

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Image not found: {0}")]
    NotFound(String),
    #[error("IO error reading {filename}: {source}")]
    Io { filename: String, source: io::Error },
    #[error("Failed to list {}: {source}", dir.display())]
    Listing { dir: PathBuf, source: io::Error },
}

/// One listed image.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImageEntry {
    pub filename: String,
    /// Seconds since the Unix epoch.
    pub mtime: f64,
}

/// The gallery's source directory.
#[derive(Debug, Clone)]
pub struct ImageStore {
    root: PathBuf,
}

impl ImageStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Map a request filename onto a path under the root.
    ///
    /// Only plain path segments are accepted.
    pub fn resolve(&self, filename: &str) -> Result<PathBuf, StoreError> {
        let relative = Path::new(filename);
        let mut segments = relative.components().peekable();
        if segments.peek().is_none() {
            return Err(StoreError::NotFound(filename.to_string()));
        }
        if !segments.all(|c| matches!(c, Component::Normal(_))) {
            return Err(StoreError::NotFound(filename.to_string()));
        }
        Ok(self.root.join(relative))
    }

    /// Whether `filename` names an existing regular file in the store.
    pub fn exists(&self, filename: &str) -> bool {
        self.resolve(filename).is_ok_and(|path| path.is_file())
    }

    pub fn last_modified(&self, filename: &str) -> Result<SystemTime, StoreError> {
        let path = self.resolve(filename)?;
        let meta = fs::metadata(&path).map_err(|e| io_error(filename, e))?;
        if !meta.is_file() {
            return Err(StoreError::NotFound(filename.to_string()));
        }
        meta.modified().map_err(|e| io_error(filename, e))
    }

    pub fn read_bytes(&self, filename: &str) -> Result<Vec<u8>, StoreError> {
        let path = self.resolve(filename)?;
        fs::read(&path).map_err(|e| io_error(filename, e))
    }

    /// List recognized images at the top level of the root, newest first.
    ///
    /// A missing root yields an empty list. Entries whose metadata can't be
    /// read (e.g. deleted mid-listing) are skipped.
    pub fn list_entries(&self) -> Result<Vec<ImageEntry>, StoreError> {
        if !self.root.exists() {
            return Ok(Vec::new());
        }
        let listing = |source| StoreError::Listing {
            dir: self.root.clone(),
            source,
        };

        let mut entries = Vec::new();
        for entry in fs::read_dir(&self.root).map_err(listing)? {
            let entry = entry.map_err(listing)?;
            let path = entry.path();
            if !is_image(&path) {
                continue;
            }
            let Some(filename) = entry.file_name().to_str().map(String::from) else {
                debug!(path = %path.display(), "skipping non UTF-8 filename");
                continue;
            };
            let modified = match fs::metadata(&path).and_then(|m| {
                if m.is_file() {
                    m.modified()
                } else {
                    Err(io::Error::other("not a file"))
                }
            }) {
                Ok(modified) => modified,
                Err(e) => {
                    debug!(%filename, error = %e, "skipping unreadable entry");
                    continue;
                }
            };
            entries.push(ImageEntry {
                filename,
                mtime: unix_seconds(modified),
            });
        }

        sort_newest_first(&mut entries);
        Ok(entries)
    }
}

/// Order entries by descending mtime. Ties keep no particular order.
pub fn sort_newest_first(entries: &mut [ImageEntry]) {
    entries.sort_by(|a, b| b.mtime.total_cmp(&a.mtime));
}

/// Whether the path carries one of the gallery's image extensions.
pub fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| {
            IMAGE_EXTENSIONS
                .iter()
                .any(|known| ext.eq_ignore_ascii_case(known))
        })
}

/// MIME type for serving an original, by extension.
pub fn content_type(filename: &str) -> &'static str {
    let ext = Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();
    match ext.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "webp" => "image/webp",
        "gif" => "image/gif",
        _ => "application/octet-stream",
    }
}

/// Seconds since the Unix epoch, negative for earlier times.
pub fn unix_seconds(time: SystemTime) -> f64 {
    match time.duration_since(UNIX_EPOCH) {
        Ok(d) => d.as_secs_f64(),
        Err(e) => -e.duration().as_secs_f64(),
    }
}

fn io_error(filename: &str, source: io::Error) -> StoreError {
    if source.kind() == io::ErrorKind::NotFound {
        StoreError::NotFound(filename.to_string())
    } else {
        StoreError::Io {
            filename: filename.to_string(),
            source,
        }
    }
}
