//! Upload-Metadata header encoding
//!
//! The header is a comma-separated list of `key base64(value)` pairs. Keys
//! may not contain spaces or commas; an empty value is sent as the bare key.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;

use tf_core::{Error, Result, UploadMetadata};

/// Encode metadata for the Upload-Metadata header
pub fn encode_metadata(metadata: &UploadMetadata) -> Result<String> {
    let mut pairs = Vec::with_capacity(metadata.len());
    for (key, value) in metadata.iter() {
        if key.is_empty() || key.contains([' ', ',']) || !key.is_ascii() {
            return Err(Error::Validation(format!(
                "Metadata key '{key}' must be non-empty ASCII without spaces or commas"
            )));
        }
        if value.is_empty() {
            pairs.push(key.to_string());
        } else {
            pairs.push(format!("{key} {}", STANDARD.encode(value)));
        }
    }
    Ok(pairs.join(","))
}
