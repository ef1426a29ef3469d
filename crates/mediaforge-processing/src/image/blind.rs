//! Blind-watermark parameter handling
//!
//! The frequency-domain embedding/extraction algorithm itself is an opaque
//! external transform; this module only parses and validates its wire
//! parameters so the dispatcher can hand a checked spec to whatever
//! implementation the caller registers.

use mediaforge_core::{b64, Operation, TransformError};
use serde::{Deserialize, Serialize};

const BLIND_KEYS: &[&str] = &["context", "block", "password_wm", "password_img", "d1", "d2"];

const VALID_BLOCK_SIZES: &[i64] = &[4, 8, 16, 32];

/// Parameters for embedding a blind watermark.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlindWatermarkSpec {
    /// Decoded watermark text (wire value is URL-safe base64).
    pub text: String,
    /// DCT block edge length.
    pub block: u32,
    pub password_wm: i64,
    pub password_img: i64,
    pub d1: i64,
    pub d2: i64,
}

impl BlindWatermarkSpec {
    pub fn from_operation(op: &Operation) -> Result<Self, TransformError> {
        op.ensure_known_keys(BLIND_KEYS)?;

        let text = match op.text("context") {
            Some(encoded) => b64::decode_segment(&encoded)?,
            None => "Protected".to_string(),
        };

        let block = op.int("block")?.unwrap_or(4);
        if !VALID_BLOCK_SIZES.contains(&block) {
            return Err(TransformError::InvalidParameter(format!(
                "block must be one of 4, 8, 16, 32, got {}",
                block
            )));
        }

        Ok(BlindWatermarkSpec {
            text,
            block: block as u32,
            password_wm: op.int("password_wm")?.unwrap_or(1234),
            password_img: op.int("password_img")?.unwrap_or(1234),
            d1: op.int("d1")?.unwrap_or(100),
            d2: op.int("d2")?.unwrap_or(60),
        })
    }
}

/// Extraction takes no parameters; the operation only has to be well formed.
pub fn validate_extract_operation(op: &Operation) -> Result<(), TransformError> {
    op.ensure_known_keys(&["password_wm", "password_img", "block"])
}

#[cfg(test)]
mod tests {
    use super::*;
    use mediaforge_core::ChainParser;

    fn op(s: &str) -> Operation {
        ChainParser::parse(s).unwrap().operations()[0].clone()
    }

    #[test]
    fn test_defaults() {
        let spec = BlindWatermarkSpec::from_operation(&op("blindwatermark")).unwrap();
        assert_eq!(spec.text, "Protected");
        assert_eq!(spec.block, 4);
        assert_eq!(spec.password_wm, 1234);
        assert_eq!(spec.d1, 100);
        assert_eq!(spec.d2, 60);
    }

    #[test]
    fn test_context_is_decoded() {
        // "secret" in URL-safe base64
        let encoded = b64::encode_segment("secret");
        let spec =
            BlindWatermarkSpec::from_operation(&op(&format!("blindwatermark,context_{}", encoded)))
                .unwrap();
        assert_eq!(spec.text, "secret");
    }

    #[test]
    fn test_invalid_context() {
        let err =
            BlindWatermarkSpec::from_operation(&op("blindwatermark,context_!!!")).unwrap_err();
        assert!(matches!(err, TransformError::InvalidParameter(_)));
    }

    #[test]
    fn test_block_size_whitelist() {
        assert_eq!(
            BlindWatermarkSpec::from_operation(&op("blindwatermark,block_16"))
                .unwrap()
                .block,
            16
        );
        let err = BlindWatermarkSpec::from_operation(&op("blindwatermark,block_5")).unwrap_err();
        assert!(matches!(err, TransformError::InvalidParameter(_)));
    }
}
