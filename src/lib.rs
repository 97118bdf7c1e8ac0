//! # Comfy Gallery
//!
//! A local web gallery for a directory of generated images. Point it at an
//! output folder, open the page, and browse: thumbnails in a grid, the
//! full-size image on demand, and the prompt and workflow each image carries
//! in its metadata.
//!
//! # Architecture
//!
//! ```text
//! HTTP request ─→ server ─┬─ list / original ──→ store   (image directory, read-only)
//!                         ├─ thumbnail ─────────→ cache ─→ imaging codec
//!                         └─ metadata ──────────→ metadata ─→ imaging::embedded
//! ```
//!
//! The image directory is never written to. Thumbnails live in a separate
//! cache directory and are regenerated when their source is newer than the
//! cached copy.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`server`] | axum router, handlers, worker pool, graceful shutdown |
//! | [`cache`] | Filesystem thumbnail cache with mtime freshness and per-file single-flight |
//! | [`store`] | Path resolution, listing and reads under the image directory |
//! | [`imaging`] | Thumbnail codec (decode, flatten, Lanczos3 resize, JPEG) and embedded-field reader |
//! | [`metadata`] | Turns embedded fields into the JSON served to the page |
//! | [`page`] | The gallery page, rendered with Maud |
//! | [`config`] | `gallery.toml` loading and validation |
//!
//! # Design Decisions
//!
//! ## Filesystem as the Index
//!
//! There is no database and no manifest. A cached thumbnail is valid when its
//! modification time is at least that of its source. Touching a source image
//! is enough to get a new thumbnail; deleting the cache directory is always
//! safe.
//!
//! ## One Generation per File
//!
//! Opening the page fires a request per visible tile, and reloading fires them
//! all again. Requests for the same stale image are collapsed onto one codec
//! run by a per-filename lock, and the cache re-checks freshness after taking
//! it. Different files generate in parallel on the worker pool.
//!
//! ## Pure-Rust Imaging
//!
//! Decoding, resizing and encoding use the `image` crate only. Nothing needs to
//! be installed next to the binary.
//!
//! ## Maud for the Page
//!
//! The page is a compile-time [Maud](https://maud.lambda.xyz/) template with the
//! stylesheet and script inlined, so the binary serves everything itself.

pub mod cache;
pub mod config;
pub mod imaging;
pub mod metadata;
pub mod page;
pub mod server;
pub mod store;

#[cfg(test)]
pub(crate) mod test_helpers;
