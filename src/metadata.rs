//! Image metadata extraction for the gallery's detail panel.
//!
//! Generation tools embed their inputs in the image file. ComfyUI, for
//! example, writes two PNG text chunks:
//!
//! - **`prompt`**: the executed node graph as JSON
//! - **`workflow`**: the editor state as JSON
//!
//! Other tools use different keys (`parameters` is common for
//! Stable Diffusion front-ends), and the container itself carries a few
//! scalar fields (`gamma`, `jfif`, ...).
//!
//! ## Output
//!
//! A flat JSON object keyed by field name:
//!
//! - `prompt` and `workflow` are parsed as JSON. If the text isn't valid JSON
//!   the raw string is kept under the same key.
//! - Every other text or numeric field passes through unchanged.
//! - Binary fields are never produced by the reader, so nothing else appears.
//!
//! When a key occurs more than once the last occurrence wins.
//!
//! ## Validation
//!
//! The pixel data is fully decoded before fields are read, so a truncated or
//! corrupt file is reported as an error instead of yielding partial metadata.

use crate::imaging::embedded::{self, FieldValue};
use serde_json::{Map, Number, Value};
use thiserror::Error;

/// Fields whose text is expected to hold JSON.
const JSON_FIELDS: &[&str] = &["prompt", "workflow"];

#[derive(Error, Debug)]
pub enum MetadataError {
    #[error("Failed to read image: {0}")]
    Decode(String),
}

pub type Metadata = Map<String, Value>;

/// Extract metadata from raw image bytes.
pub fn extract(bytes: &[u8]) -> Result<Metadata, MetadataError> {
    image::load_from_memory(bytes).map_err(|e| MetadataError::Decode(e.to_string()))?;
    Ok(build_metadata(embedded::read_fields(bytes)))
}

/// Turn raw embedded fields into the JSON mapping served to clients.
pub fn build_metadata(fields: Vec<(String, FieldValue)>) -> Metadata {
    let mut metadata = Map::new();
    for (key, value) in fields {
        let json = match value {
            FieldValue::Text(text) if JSON_FIELDS.contains(&key.as_str()) => {
                serde_json::from_str(&text).unwrap_or(Value::String(text))
            }
            FieldValue::Text(text) => Value::String(text),
            FieldValue::Integer(n) => Value::from(n),
            FieldValue::Float(f) => match Number::from_f64(f) {
                Some(n) => Value::Number(n),
                None => continue,
            },
        };
        metadata.insert(key, json);
    }
    metadata
}
