//! Minimal reader for auxiliary fields embedded in PNG and JPEG files.
//!
//! Generation tools stash their prompt and node graph in PNG text chunks;
//! this module walks the container structure and pulls those fields out
//! without decoding pixels.
//!
//! For PNG: `tEXt`, `zTXt`, `iTXt` (keyword → text), `gAMA` → `gamma`,
//! `sRGB` → `srgb`. Chunks after the image data are read too.
//!
//! For JPEG: APP0 JFIF → `jfif`, `jfif_unit`; APP14 Adobe → `adobe`,
//! `adobe_transform`; a progressive frame header → `progressive`,
//! `progression`.
//!
//! Malformed structure ends the walk; whatever was read before it is kept.

use flate2::read::ZlibDecoder;
use std::io::Read;

/// Upper bound on a decompressed text chunk.
const MAX_TEXT_CHUNK: u64 = 16 * 1024 * 1024;

const PNG_SIGNATURE: &[u8] = b"\x89PNG\r\n\x1a\n";

/// A scalar field value as stored in the file.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Text(String),
    Integer(i64),
    Float(f64),
}

/// Read embedded fields from raw file bytes, in file order.
///
/// Format is detected from the magic bytes; unknown formats yield nothing.
pub fn read_fields(data: &[u8]) -> Vec<(String, FieldValue)> {
    if data.starts_with(PNG_SIGNATURE) {
        read_png_fields(&data[PNG_SIGNATURE.len()..])
    } else if data.starts_with(&[0xFF, 0xD8]) {
        read_jpeg_fields(&data[2..])
    } else {
        Vec::new()
    }
}

// ---------------------------------------------------------------------------
// PNG chunks
// ---------------------------------------------------------------------------

/// Walk PNG chunks after the signature.
///
/// Chunk layout:
///   Bytes 0-3: data length (big-endian u32)
///   Bytes 4-7: chunk type (ASCII)
///   Bytes 8..: data
///   Last 4:    CRC (not verified)
fn read_png_fields(data: &[u8]) -> Vec<(String, FieldValue)> {
    let mut fields = Vec::new();
    let mut pos = 0;

    while pos + 8 <= data.len() {
        let length = u32::from_be_bytes([data[pos], data[pos + 1], data[pos + 2], data[pos + 3]])
            as usize;
        let kind = &data[pos + 4..pos + 8];
        let start = pos + 8;
        let Some(end) = start.checked_add(length).filter(|&end| end <= data.len()) else {
            break;
        };
        let body = &data[start..end];

        match kind {
            b"tEXt" => fields.extend(parse_text(body)),
            b"zTXt" => fields.extend(parse_ztxt(body)),
            b"iTXt" => fields.extend(parse_itxt(body)),
            b"gAMA" if body.len() == 4 => {
                let gamma = u32::from_be_bytes([body[0], body[1], body[2], body[3]]);
                fields.push(("gamma".into(), FieldValue::Float(gamma as f64 / 100_000.0)));
            }
            b"sRGB" if body.len() == 1 => {
                fields.push(("srgb".into(), FieldValue::Integer(body[0] as i64)));
            }
            b"IEND" => break,
            _ => {}
        }

        // Skip data and CRC
        pos = end + 4;
    }

    fields
}

/// Split `keyword\0rest`.
fn split_keyword(body: &[u8]) -> Option<(String, &[u8])> {
    let nul = body.iter().position(|&b| b == 0)?;
    if nul == 0 {
        return None;
    }
    Some((latin1(&body[..nul]), &body[nul + 1..]))
}

fn latin1(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| b as char).collect()
}

fn inflate(compressed: &[u8]) -> Option<Vec<u8>> {
    let mut out = Vec::new();
    ZlibDecoder::new(compressed)
        .take(MAX_TEXT_CHUNK + 1)
        .read_to_end(&mut out)
        .ok()?;
    if out.len() as u64 > MAX_TEXT_CHUNK {
        return None;
    }
    Some(out)
}

/// `tEXt`: keyword, NUL, Latin-1 text.
fn parse_text(body: &[u8]) -> Option<(String, FieldValue)> {
    let (key, text) = split_keyword(body)?;
    Some((key, FieldValue::Text(latin1(text))))
}

/// `zTXt`: keyword, NUL, compression method (0 = zlib), compressed Latin-1 text.
fn parse_ztxt(body: &[u8]) -> Option<(String, FieldValue)> {
    let (key, rest) = split_keyword(body)?;
    let (&method, compressed) = rest.split_first()?;
    if method != 0 {
        return None;
    }
    let text = inflate(compressed)?;
    Some((key, FieldValue::Text(latin1(&text))))
}

/// `iTXt`: keyword, NUL, compression flag, compression method,
/// language tag, NUL, translated keyword, NUL, UTF-8 text.
fn parse_itxt(body: &[u8]) -> Option<(String, FieldValue)> {
    let (key, rest) = split_keyword(body)?;
    let [flag, method, rest @ ..] = rest else {
        return None;
    };
    let lang_end = rest.iter().position(|&b| b == 0)?;
    let rest = &rest[lang_end + 1..];
    let translated_end = rest.iter().position(|&b| b == 0)?;
    let text = &rest[translated_end + 1..];

    let text = match (*flag, *method) {
        (0, _) => text.to_vec(),
        (1, 0) => inflate(text)?,
        _ => return None,
    };
    let text = String::from_utf8(text).ok()?;
    Some((key, FieldValue::Text(text)))
}

// ---------------------------------------------------------------------------
// JPEG segments
// ---------------------------------------------------------------------------

const JFIF_HEADER: &[u8] = b"JFIF\0";
const ADOBE_HEADER: &[u8] = b"Adobe";

/// Walk JPEG marker segments after SOI until the scan data starts.
fn read_jpeg_fields(data: &[u8]) -> Vec<(String, FieldValue)> {
    let mut fields = Vec::new();
    let mut pos = 0;

    while pos + 4 <= data.len() {
        if data[pos] != 0xFF {
            break;
        }
        let marker = data[pos + 1];
        // Fill bytes
        if marker == 0xFF {
            pos += 1;
            continue;
        }
        // Markers without a length field
        if marker == 0x01 || (0xD0..=0xD7).contains(&marker) {
            pos += 2;
            continue;
        }
        // SOS (0xDA) starts entropy-coded data, EOI (0xD9) ends the image
        if marker == 0xDA || marker == 0xD9 {
            break;
        }

        let seg_len = u16::from_be_bytes([data[pos + 2], data[pos + 3]]) as usize;
        if seg_len < 2 || pos + 2 + seg_len > data.len() {
            break;
        }
        let segment = &data[pos + 4..pos + 2 + seg_len];

        match marker {
            0xE0 if segment.starts_with(JFIF_HEADER) && segment.len() >= 8 => {
                let version = u16::from_be_bytes([segment[5], segment[6]]);
                fields.push(("jfif".into(), FieldValue::Integer(version as i64)));
                fields.push(("jfif_unit".into(), FieldValue::Integer(segment[7] as i64)));
            }
            0xEE if segment.starts_with(ADOBE_HEADER) && segment.len() >= 12 => {
                let version = u16::from_be_bytes([segment[5], segment[6]]);
                fields.push(("adobe".into(), FieldValue::Integer(version as i64)));
                fields.push((
                    "adobe_transform".into(),
                    FieldValue::Integer(segment[11] as i64),
                ));
            }
            // SOF2, SOF6, SOF10, SOF14: progressive frames
            0xC2 | 0xC6 | 0xCA | 0xCE => {
                fields.push(("progressive".into(), FieldValue::Integer(1)));
                fields.push(("progression".into(), FieldValue::Integer(1)));
            }
            _ => {}
        }

        pos += 2 + seg_len;
    }

    fields
}
