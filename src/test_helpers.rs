//! Shared test utilities for the comfy-gallery test suite.
//!
//! Provides synthetic images, hand-assembled PNG files with arbitrary
//! ancillary chunks, and mtime control for cache freshness tests.
//!
//! # Usage
//!
//! ```rust,ignore
//! use crate::test_helpers::*;
//!
//! let png = png_with_chunks(&[PngChunk::text("prompt", "{}")], &[]);
//! std::fs::write(dir.join("a.png"), &png).unwrap();
//! set_mtime(&dir.join("a.png"), UNIX_EPOCH + Duration::from_secs(1_000));
//! ```

use flate2::Crc;
use flate2::Compression;
use flate2::write::ZlibEncoder;
use image::{DynamicImage, ImageFormat, Rgb, RgbImage, Rgba, RgbaImage};
use std::fs::File;
use std::io::{Cursor, Write};
use std::path::Path;
use std::time::SystemTime;

// =========================================================================
// Filesystem
// =========================================================================

/// Set a file's modification time. Panics on failure.
pub fn set_mtime(path: &Path, time: SystemTime) {
    File::options()
        .write(true)
        .open(path)
        .and_then(|f| f.set_modified(time))
        .unwrap_or_else(|e| panic!("failed to set mtime on {}: {e}", path.display()));
}

// =========================================================================
// Synthetic images
// =========================================================================

/// An RGB image with a smooth gradient, so resizing has something to blend.
pub fn gradient_rgb(width: u32, height: u32) -> RgbImage {
    RgbImage::from_fn(width, height, |x, y| {
        Rgb([(x % 256) as u8, (y % 256) as u8, ((x + y) % 256) as u8])
    })
}

/// Like [`gradient_rgb`] with a horizontal alpha ramp.
pub fn gradient_rgba(width: u32, height: u32) -> RgbaImage {
    RgbaImage::from_fn(width, height, |x, y| {
        Rgba([
            (x % 256) as u8,
            (y % 256) as u8,
            ((x + y) % 256) as u8,
            (x * 255 / width.max(1)) as u8,
        ])
    })
}

pub fn encode_png(img: &DynamicImage) -> Vec<u8> {
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
        .unwrap();
    buf
}

pub fn encode_jpeg(img: &DynamicImage) -> Vec<u8> {
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), ImageFormat::Jpeg)
        .unwrap();
    buf
}

pub fn zlib(data: &[u8]) -> Vec<u8> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data).unwrap();
    encoder.finish().unwrap()
}

// =========================================================================
// Hand-assembled PNG files
// =========================================================================

/// A raw PNG chunk: four-byte type plus data. Length and CRC are computed
/// when the file is assembled.
#[derive(Debug, Clone)]
pub struct PngChunk {
    pub kind: [u8; 4],
    pub data: Vec<u8>,
}

impl PngChunk {
    /// A `tEXt` chunk with an ASCII keyword and text.
    pub fn text(key: &str, value: &str) -> Self {
        let mut data = key.as_bytes().to_vec();
        data.push(0);
        data.extend_from_slice(value.as_bytes());
        Self::raw(*b"tEXt", data)
    }

    pub fn raw(kind: [u8; 4], data: Vec<u8>) -> Self {
        Self { kind, data }
    }
}

const PNG_SIDE: u32 = 32;

fn write_chunk(out: &mut Vec<u8>, kind: &[u8; 4], data: &[u8]) {
    out.extend((data.len() as u32).to_be_bytes());
    out.extend_from_slice(kind);
    out.extend_from_slice(data);
    let mut crc = Crc::new();
    crc.update(kind);
    crc.update(data);
    out.extend(crc.sum().to_be_bytes());
}

/// Pseudo-random scanlines. Noise keeps the IDAT chunk large, so cutting the
/// file in half always lands inside the pixel data.
fn noisy_scanlines() -> Vec<u8> {
    let mut state: u32 = 0x2545_F491;
    let mut raw = Vec::new();
    for _ in 0..PNG_SIDE {
        // Filter type: none
        raw.push(0);
        for _ in 0..PNG_SIDE * 3 {
            state ^= state << 13;
            state ^= state >> 17;
            state ^= state << 5;
            raw.push((state >> 24) as u8);
        }
    }
    raw
}

/// Build a valid 32x32 RGB PNG with `before` chunks placed ahead of the
/// image data and `after` chunks between the image data and `IEND`.
pub fn png_with_chunks(before: &[PngChunk], after: &[PngChunk]) -> Vec<u8> {
    let mut out = b"\x89PNG\r\n\x1a\n".to_vec();

    let mut ihdr = Vec::new();
    ihdr.extend(PNG_SIDE.to_be_bytes());
    ihdr.extend(PNG_SIDE.to_be_bytes());
    // Bit depth 8, color type RGB, deflate, adaptive filtering, no interlace
    ihdr.extend([8, 2, 0, 0, 0]);
    write_chunk(&mut out, b"IHDR", &ihdr);

    for chunk in before {
        write_chunk(&mut out, &chunk.kind, &chunk.data);
    }
    write_chunk(&mut out, b"IDAT", &zlib(&noisy_scanlines()));
    for chunk in after {
        write_chunk(&mut out, &chunk.kind, &chunk.data);
    }
    write_chunk(&mut out, b"IEND", &[]);
    out
}

/// Build an 8-bit palette-indexed PNG of vertical stripes. The palette has
/// four colours and a `tRNS` chunk makes two of them partly transparent.
pub fn indexed_png(width: u32, height: u32) -> Vec<u8> {
    let mut out = b"\x89PNG\r\n\x1a\n".to_vec();

    let mut ihdr = Vec::new();
    ihdr.extend(width.to_be_bytes());
    ihdr.extend(height.to_be_bytes());
    // Bit depth 8, color type indexed
    ihdr.extend([8, 3, 0, 0, 0]);
    write_chunk(&mut out, b"IHDR", &ihdr);

    let palette = [200, 30, 30, 30, 200, 30, 30, 30, 200, 240, 240, 240];
    write_chunk(&mut out, b"PLTE", &palette);
    write_chunk(&mut out, b"tRNS", &[255, 128, 0, 255]);

    let stripe = (width / 4).max(1);
    let mut raw = Vec::with_capacity(((width + 1) * height) as usize);
    for _ in 0..height {
        raw.push(0);
        raw.extend((0..width).map(|x| ((x / stripe) % 4) as u8));
    }
    write_chunk(&mut out, b"IDAT", &zlib(&raw));
    write_chunk(&mut out, b"IEND", &[]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::GenericImageView;

    #[test]
    fn assembled_png_decodes() {
        let png = png_with_chunks(&[PngChunk::text("k", "v")], &[PngChunk::text("z", "w")]);
        let img = image::load_from_memory(&png).unwrap();
        assert_eq!(img.dimensions(), (PNG_SIDE, PNG_SIDE));
    }

    #[test]
    fn indexed_png_decodes_with_alpha() {
        let img = image::load_from_memory(&indexed_png(40, 10)).unwrap();
        assert_eq!(img.dimensions(), (40, 10));
        assert!(img.color().has_alpha());
        assert_eq!(img.get_pixel(15, 0).0[3], 128);
    }

    #[test]
    fn half_of_assembled_png_fails_to_decode() {
        let png = png_with_chunks(&[], &[]);
        assert!(image::load_from_memory(&png[..png.len() / 2]).is_err());
    }
}
