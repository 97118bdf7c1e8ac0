//! Thumbnail codec trait and shared error type.
//!
//! The [`ThumbnailCodec`] trait is the seam between the cache policy and the
//! pixel work. The production implementation is
//! [`JpegThumbnailer`](super::rust_backend::JpegThumbnailer); tests swap in a
//! recording mock so cache behavior can be checked without encoding images.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CodecError {
    #[error("Failed to decode image: {0}")]
    Decode(String),
    #[error("Failed to encode thumbnail: {0}")]
    Encode(String),
}

/// Turns source image bytes into encoded thumbnail bytes.
///
/// Implementations must be deterministic: the same input always yields the
/// same output, so concurrent writers of one cache entry agree on its bytes.
pub trait ThumbnailCodec: Send + Sync {
    fn generate(&self, source: &[u8]) -> Result<Vec<u8>, CodecError>;
}
