//! Pure Rust thumbnail codec built on the `image` crate.
//!
//! ## Crate mapping
//!
//! | Step | Crate / function |
//! |---|---|
//! | Decode (JPEG, PNG, WebP) | `image::load_from_memory` (format sniffed from the bytes) |
//! | Flatten alpha / palette | `DynamicImage::to_rgb8` |
//! | Resize | `DynamicImage::resize_exact` with `Lanczos3` |
//! | Encode → JPEG | `image::codecs::jpeg::JpegEncoder` at fixed quality |

use super::backend::{CodecError, ThumbnailCodec};
use super::calculations::calculate_thumbnail_dimensions;
use super::params::ThumbnailSpec;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView};

/// Produces JPEG thumbnails of a fixed width.
///
/// See the [module docs](self) for the crate-to-step mapping.
#[derive(Debug, Clone, Default)]
pub struct JpegThumbnailer {
    spec: ThumbnailSpec,
}

impl JpegThumbnailer {
    pub fn new(spec: ThumbnailSpec) -> Self {
        Self { spec }
    }
}

/// Reduce any decoded image to a color mode JPEG can carry.
///
/// Alpha is dropped rather than composited, and high bit depths are
/// narrowed to 8 bits. Palette images already arrive expanded from the decoder.
fn flatten(img: DynamicImage) -> DynamicImage {
    match img {
        DynamicImage::ImageRgb8(_) | DynamicImage::ImageLuma8(_) => img,
        DynamicImage::ImageLuma16(_) => DynamicImage::ImageLuma8(img.to_luma8()),
        other => DynamicImage::ImageRgb8(other.to_rgb8()),
    }
}

fn encode_jpeg(img: &DynamicImage, quality: u8) -> Result<Vec<u8>, CodecError> {
    let mut out = Vec::new();
    let encoder = JpegEncoder::new_with_quality(&mut out, quality);
    img.write_with_encoder(encoder)
        .map_err(|e| CodecError::Encode(e.to_string()))?;
    Ok(out)
}

impl ThumbnailCodec for JpegThumbnailer {
    fn generate(&self, source: &[u8]) -> Result<Vec<u8>, CodecError> {
        let img = image::load_from_memory(source).map_err(|e| CodecError::Decode(e.to_string()))?;
        let img = flatten(img);

        let (width, height) = calculate_thumbnail_dimensions(img.dimensions(), self.spec.width);
        let resized = if (width, height) == img.dimensions() {
            img
        } else {
            img.resize_exact(width, height, FilterType::Lanczos3)
        };

        // Quality is clamped to 1-100 on construction
        encode_jpeg(&resized, self.spec.quality.value() as u8)
    }
}
