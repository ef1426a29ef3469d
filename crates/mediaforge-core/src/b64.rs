//! URL-safe base64 codec for wire-embedded text
//!
//! Several parameters travel inside operation strings where `/`, `+`, and
//! padding would collide with the grammar, so they use the URL-safe alphabet
//! with padding stripped: blind-watermark context, page lists, and target
//! bucket names.

use crate::error::TransformError;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;

/// Encode text for embedding in an operation string.
pub fn encode_segment(text: &str) -> String {
    URL_SAFE_NO_PAD.encode(text.as_bytes())
}

/// Decode a wire-embedded segment back to text. Padding characters are
/// tolerated on input.
pub fn decode_segment(encoded: &str) -> Result<String, TransformError> {
    let trimmed = encoded.trim_end_matches('=');
    let bytes = URL_SAFE_NO_PAD.decode(trimmed).map_err(|e| {
        TransformError::InvalidParameter(format!("invalid base64 value '{}': {}", encoded, e))
    })?;
    String::from_utf8(bytes).map_err(|e| {
        TransformError::InvalidParameter(format!("base64 value is not valid UTF-8: {}", e))
    })
}
