//! Thumbnail cache backed by the filesystem.
//!
//! Thumbnail generation is the expensive part of serving the gallery: every
//! tile on the page needs a decode, a Lanczos resize and a JPEG encode. This
//! module keeps the results on disk so each source image is processed once
//! per modification.
//!
//! # Design
//!
//! ## Layout
//!
//! The artifact for `sub/a.png` lives at `<cache_dir>/sub/a.png` (JPEG bytes,
//! whatever the name says). There is no manifest: the filesystem is the index.
//!
//! ## Freshness
//!
//! An artifact is valid iff its mtime is at least the source's mtime. Ties
//! count as fresh. Each new artifact is stamped with the mtime the source had
//! when it was read, not the time of the write, so the rule holds exactly
//! while the source is unchanged: a source rewritten during generation is
//! seen as newer on the next request, and a source dated in the future does
//! not force a regeneration every time. Artifacts whose source has been
//! deleted are never read and never swept.
//!
//! ## Single-flight
//!
//! A fresh artifact is served without any locking. On a miss the request
//! takes a per-filename lock, checks freshness again (another request may
//! have just finished), and only then generates. Concurrent requests for one
//! stale image therefore run the codec once; unrelated filenames never wait
//! on each other.
//!
//! ## Writes
//!
//! New artifacts are written to a temporary file in the target directory and
//! renamed over the old one, so readers see either the previous artifact or
//! the complete new one. A failed generation leaves the previous artifact in
//! place.

use crate::imaging::{CodecError, ThumbnailCodec};
use crate::store::{ImageStore, StoreError};
use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, Weak};
use std::time::SystemTime;
use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::{debug, error, warn};

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("Image not found: {0}")]
    NotFound(String),
    #[error("Failed to generate thumbnail for {filename}: {source}")]
    Generation {
        filename: String,
        source: CodecError,
    },
    #[error("IO error reading {filename}: {source}")]
    Io { filename: String, source: io::Error },
}

impl From<StoreError> for CacheError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound(filename) => CacheError::NotFound(filename),
            StoreError::Io { filename, source } => CacheError::Io { filename, source },
            StoreError::Listing { dir, source } => CacheError::Io {
                filename: dir.display().to_string(),
                source,
            },
        }
    }
}

/// How a thumbnail request was satisfied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheOutcome {
    /// A fresh artifact was already on disk.
    Hit,
    /// The codec ran and a new artifact was written.
    Generated,
}

#[derive(Debug, Clone)]
pub struct Thumbnail {
    pub bytes: Vec<u8>,
    pub outcome: CacheOutcome,
}

/// Running totals for the lifetime of the server.
#[derive(Debug, Default)]
pub struct CacheStats {
    hits: AtomicU64,
    generated: AtomicU64,
    failures: AtomicU64,
}

impl CacheStats {
    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    pub fn generated(&self) -> u64 {
        self.generated.load(Ordering::Relaxed)
    }

    pub fn failures(&self) -> u64 {
        self.failures.load(Ordering::Relaxed)
    }

    pub fn total(&self) -> u64 {
        self.hits() + self.generated() + self.failures()
    }

    fn hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    fn generate(&self) {
        self.generated.fetch_add(1, Ordering::Relaxed);
    }

    fn fail(&self) {
        self.failures.fetch_add(1, Ordering::Relaxed);
    }
}

impl fmt::Display for CacheStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.failures() > 0 {
            write!(
                f,
                "{} cached, {} generated, {} failed ({} total)",
                self.hits(),
                self.generated(),
                self.failures(),
                self.total()
            )
        } else {
            write!(
                f,
                "{} cached, {} generated ({} total)",
                self.hits(),
                self.generated(),
                self.total()
            )
        }
    }
}

/// One mutex per key, alive only while some caller holds it.
///
/// The table stores weak references; entries whose lock has no remaining
/// holders are pruned whenever a new key is inserted.
#[derive(Debug, Default)]
struct KeyedLocks {
    table: Mutex<HashMap<String, Weak<Mutex<()>>>>,
}

impl KeyedLocks {
    fn acquire(&self, key: &str) -> Arc<Mutex<()>> {
        let mut table = self.table.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(lock) = table.get(key).and_then(Weak::upgrade) {
            return lock;
        }
        table.retain(|_, weak| weak.strong_count() > 0);
        let lock = Arc::new(Mutex::new(()));
        table.insert(key.to_string(), Arc::downgrade(&lock));
        lock
    }

    #[cfg(test)]
    fn live(&self) -> usize {
        let table = self.table.lock().unwrap_or_else(PoisonError::into_inner);
        table.values().filter(|weak| weak.strong_count() > 0).count()
    }
}

/// Serves thumbnails for an [`ImageStore`], generating them on demand.
///
/// All methods block; callers on an async runtime should run them on a
/// worker thread.
pub struct ThumbnailCache {
    store: ImageStore,
    root: PathBuf,
    codec: Arc<dyn ThumbnailCodec>,
    locks: KeyedLocks,
    stats: CacheStats,
}

impl ThumbnailCache {
    pub fn new(
        store: ImageStore,
        root: impl Into<PathBuf>,
        codec: Arc<dyn ThumbnailCodec>,
    ) -> Self {
        Self {
            store,
            root: root.into(),
            codec,
            locks: KeyedLocks::default(),
            stats: CacheStats::default(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn stats(&self) -> &CacheStats {
        &self.stats
    }

    /// Where the artifact for `filename` lives. Rejects the same names the
    /// store rejects.
    pub fn artifact_path(&self, filename: &str) -> Result<PathBuf, CacheError> {
        self.store.resolve(filename)?;
        Ok(self.root.join(filename))
    }

    /// Return the thumbnail for `filename`, generating it if the cached copy
    /// is missing or older than the source.
    pub fn get(&self, filename: &str) -> Result<Thumbnail, CacheError> {
        let artifact = self.artifact_path(filename)?;
        let source_mtime = self.store.last_modified(filename)?;

        if let Some(bytes) = read_fresh(&artifact, source_mtime) {
            debug!(%filename, "thumbnail cache hit");
            self.stats.hit();
            return Ok(Thumbnail {
                bytes,
                outcome: CacheOutcome::Hit,
            });
        }

        let lock = self.locks.acquire(filename);
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);

        // The source may have changed or another request may have just
        // written the artifact while we waited.
        let source_mtime = self.store.last_modified(filename)?;
        if let Some(bytes) = read_fresh(&artifact, source_mtime) {
            debug!(%filename, "thumbnail generated by concurrent request");
            self.stats.hit();
            return Ok(Thumbnail {
                bytes,
                outcome: CacheOutcome::Hit,
            });
        }

        let source = self.store.read_bytes(filename)?;
        let bytes = self.codec.generate(&source).map_err(|source| {
            self.stats.fail();
            error!(%filename, error = %source, "thumbnail generation failed");
            CacheError::Generation {
                filename: filename.to_string(),
                source,
            }
        })?;

        if let Err(e) = write_atomic(&artifact, &bytes, source_mtime) {
            // The thumbnail is still good; only the next request pays again.
            warn!(
                %filename,
                path = %artifact.display(),
                error = %e,
                "failed to write thumbnail cache"
            );
        }
        debug!(%filename, size = bytes.len(), "thumbnail generated");
        self.stats.generate();
        Ok(Thumbnail {
            bytes,
            outcome: CacheOutcome::Generated,
        })
    }
}

/// Artifact bytes if the artifact exists and is at least as new as the source.
///
/// An unreadable artifact counts as missing.
fn read_fresh(artifact: &Path, source_mtime: SystemTime) -> Option<Vec<u8>> {
    let modified = fs::metadata(artifact).and_then(|m| m.modified()).ok()?;
    if modified < source_mtime {
        return None;
    }
    match fs::read(artifact) {
        Ok(bytes) => Some(bytes),
        Err(e) => {
            debug!(path = %artifact.display(), error = %e, "cached thumbnail unreadable");
            None
        }
    }
}

/// Write `bytes` to `path` through a temporary sibling file and a rename,
/// with `mtime` as the file's modification time.
fn write_atomic(path: &Path, bytes: &[u8], mtime: SystemTime) -> io::Result<()> {
    let dir = path
        .parent()
        .ok_or_else(|| io::Error::other("artifact path has no parent directory"))?;
    fs::create_dir_all(dir)?;
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(bytes)?;
    tmp.as_file().set_modified(mtime)?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}
