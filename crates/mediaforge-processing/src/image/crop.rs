//! Crop operation: gravity-anchored window with optional post-crop scaling

use crate::image::geometry::{self, Gravity};
use crate::image::resize::resize_exact;
use crate::image::{decode_image, encode_image};
use bytes::Bytes;
use image::{GenericImageView, ImageFormat};
use mediaforge_core::constants::MAX_DIMENSION;
use mediaforge_core::{Operation, TransformError};
use serde::{Deserialize, Serialize};

const CROP_KEYS: &[&str] = &["w", "h", "x", "y", "g", "p"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CropSpec {
    /// Window width; defaults to the full image width.
    pub width: Option<u32>,
    /// Window height; defaults to the full image height.
    pub height: Option<u32>,
    /// Offset from the gravity anchor along x.
    pub x: u32,
    /// Offset from the gravity anchor along y.
    pub y: u32,
    pub gravity: Gravity,
    /// Post-crop scale percentage; 100 leaves the crop untouched.
    pub scale_percent: u32,
}

impl CropSpec {
    pub fn from_operation(op: &Operation) -> Result<Self, TransformError> {
        op.ensure_known_keys(CROP_KEYS)?;

        let width = op.int("w")?.map(|w| dimension(w, "w")).transpose()?;
        let height = op.int("h")?.map(|h| dimension(h, "h")).transpose()?;

        let x = offset(op.int("x")?.unwrap_or(0), "x")?;
        let y = offset(op.int("y")?.unwrap_or(0), "y")?;

        let gravity = match op.text("g") {
            Some(g) => Gravity::parse(&g)?,
            None => Gravity::Nw,
        };

        let scale_percent = op.int("p")?.unwrap_or(100);
        if !(1..=100).contains(&scale_percent) {
            return Err(TransformError::InvalidParameter(format!(
                "p must be between 1 and 100, got {}",
                scale_percent
            )));
        }

        Ok(CropSpec {
            width,
            height,
            x,
            y,
            gravity,
            scale_percent: scale_percent as u32,
        })
    }

    pub fn apply(&self, data: &[u8]) -> Result<Bytes, TransformError> {
        let (img, format) = decode_image(data)?;
        let (src_w, src_h) = img.dimensions();
        let window = geometry::crop_box(src_w, src_h, self);

        tracing::debug!(
            left = window.left,
            top = window.top,
            width = window.width(),
            height = window.height(),
            gravity = self.gravity.as_str(),
            "applying crop"
        );

        let mut cropped = img.crop_imm(window.left, window.top, window.width(), window.height());

        if self.scale_percent != 100 {
            let new_w = (cropped.width() as f64 * self.scale_percent as f64 / 100.0) as u32;
            let new_h = (cropped.height() as f64 * self.scale_percent as f64 / 100.0) as u32;
            cropped = resize_exact(&cropped, new_w.max(1), new_h.max(1));
        }

        encode_image(&cropped, format.unwrap_or(ImageFormat::Jpeg))
    }
}

fn dimension(value: i64, name: &str) -> Result<u32, TransformError> {
    if !(1..=MAX_DIMENSION).contains(&value) {
        return Err(TransformError::InvalidParameter(format!(
            "{} must be between 1 and {}, got {}",
            name, MAX_DIMENSION, value
        )));
    }
    Ok(value as u32)
}

fn offset(value: i64, name: &str) -> Result<u32, TransformError> {
    if value < 0 {
        return Err(TransformError::InvalidParameter(format!(
            "{} must be non-negative, got {}",
            name, value
        )));
    }
    Ok(value as u32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};
    use mediaforge_core::ChainParser;

    fn crop_op(s: &str) -> Operation {
        ChainParser::parse(s).unwrap().operations()[0].clone()
    }

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = RgbaImage::from_pixel(width, height, Rgba([0, 128, 255, 255]));
        let mut buffer = Vec::new();
        img.write_to(
            &mut std::io::Cursor::new(&mut buffer),
            image::ImageFormat::Png,
        )
        .unwrap();
        buffer
    }

    #[test]
    fn test_spec_defaults() {
        let spec = CropSpec::from_operation(&crop_op("crop,w_200,h_200")).unwrap();
        assert_eq!(spec.gravity, Gravity::Nw);
        assert_eq!((spec.x, spec.y), (0, 0));
        assert_eq!(spec.scale_percent, 100);
    }

    #[test]
    fn test_spec_invalid_gravity() {
        let err = CropSpec::from_operation(&crop_op("crop,w_100,g_middle")).unwrap_err();
        assert!(matches!(err, TransformError::InvalidParameter(_)));
    }

    #[test]
    fn test_spec_negative_offset() {
        let err = CropSpec::from_operation(&crop_op("crop,w_100,x_-5")).unwrap_err();
        assert!(matches!(err, TransformError::InvalidParameter(_)));
    }

    #[test]
    fn test_spec_scale_bounds() {
        let err = CropSpec::from_operation(&crop_op("crop,w_100,p_150")).unwrap_err();
        assert!(matches!(err, TransformError::InvalidParameter(_)));
    }

    #[test]
    fn test_spec_unknown_key() {
        let err = CropSpec::from_operation(&crop_op("crop,w_100,angle_45")).unwrap_err();
        assert!(matches!(err, TransformError::InvalidParameter(_)));
    }

    #[test]
    fn test_apply_center_crop() {
        let data = png_bytes(1000, 600);
        let spec = CropSpec::from_operation(&crop_op("crop,w_200,h_200,g_center")).unwrap();
        let out = spec.apply(&data).unwrap();
        let (img, _) = decode_image(&out).unwrap();
        assert_eq!(img.dimensions(), (200, 200));
    }

    #[test]
    fn test_apply_crop_with_scale() {
        let data = png_bytes(400, 400);
        let spec = CropSpec::from_operation(&crop_op("crop,w_200,h_200,p_50")).unwrap();
        let out = spec.apply(&data).unwrap();
        let (img, _) = decode_image(&out).unwrap();
        assert_eq!(img.dimensions(), (100, 100));
    }
}
