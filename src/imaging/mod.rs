//! Image processing in pure Rust.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Thumbnail** | `image` decode → `resize_exact` (Lanczos3) → JPEG encoder |
//! | **Embedded fields** | custom parser (PNG chunks + JPEG APPn segments) |
//!
//! The module is split into:
//! - **Calculations**: Pure functions for dimension math (unit testable)
//! - **Parameters**: Width and quality of the thumbnails
//! - **Backend**: [`ThumbnailCodec`] trait + [`JpegThumbnailer`]
//! - **Embedded**: PNG text chunk / JPEG segment reader used by [`crate::metadata`]

pub mod backend;
mod calculations;
pub mod embedded;
mod params;
pub mod rust_backend;

pub use backend::{CodecError, ThumbnailCodec};
pub use calculations::calculate_thumbnail_dimensions;
pub use params::{Quality, ThumbnailSpec};
pub use rust_backend::JpegThumbnailer;
