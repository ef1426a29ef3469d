//! Pixel filters: Gaussian blur and grayscale conversion

use crate::image::{decode_image, encode_image};
use bytes::Bytes;
use image::ImageFormat;
use mediaforge_core::{Operation, TransformError};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlurSpec {
    pub radius: u32,
}

impl BlurSpec {
    pub fn from_operation(op: &Operation) -> Result<Self, TransformError> {
        op.ensure_known_keys(&["radius"])?;
        let radius = op.int("radius")?.unwrap_or(2);
        if radius <= 0 {
            return Err(TransformError::InvalidParameter(format!(
                "radius must be a positive integer, got {}",
                radius
            )));
        }
        Ok(BlurSpec {
            radius: radius as u32,
        })
    }

    pub fn apply(&self, data: &[u8]) -> Result<Bytes, TransformError> {
        let (img, format) = decode_image(data)?;
        tracing::debug!(radius = self.radius, "applying gaussian blur");
        let blurred = img.blur(self.radius as f32);
        encode_image(&blurred, format.unwrap_or(ImageFormat::Jpeg))
    }
}

/// Grayscale conversion; the operation takes no parameters.
pub fn grayscale(data: &[u8], op: &Operation) -> Result<Bytes, TransformError> {
    op.ensure_known_keys(&[])?;
    let (img, format) = decode_image(data)?;
    tracing::debug!("applying grayscale");
    let gray = img.grayscale();
    encode_image(&gray, format.unwrap_or(ImageFormat::Jpeg))
}
