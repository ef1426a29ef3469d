//! Orientation operations: EXIF auto-orient and fixed clockwise rotation

use crate::image::{decode_image, encode_image};
use bytes::Bytes;
use image::{imageops, DynamicImage, ImageFormat};
use mediaforge_core::{Operation, TransformError};
use serde::{Deserialize, Serialize};
use std::io::Cursor;

/// EXIF-driven orientation correction. `auto=0` leaves the image as stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AutoOrientSpec {
    pub auto: bool,
}

impl AutoOrientSpec {
    pub fn from_operation(op: &Operation) -> Result<Self, TransformError> {
        op.ensure_known_keys(&["auto"])?;
        let auto = match op.int("auto")? {
            None | Some(0) => false,
            Some(1) => true,
            Some(other) => {
                return Err(TransformError::InvalidParameter(format!(
                    "auto must be 0 or 1, got {}",
                    other
                )))
            }
        };
        Ok(AutoOrientSpec { auto })
    }

    pub fn apply(&self, data: &[u8]) -> Result<Bytes, TransformError> {
        if !self.auto {
            return Ok(Bytes::copy_from_slice(data));
        }

        let orientation = read_exif_orientation(data);
        if orientation <= 1 {
            return Ok(Bytes::copy_from_slice(data));
        }

        let (img, format) = decode_image(data)?;
        let (rotate, flip_h, flip_v) = orientation_transforms(orientation);

        tracing::debug!(
            orientation = orientation,
            rotate = ?rotate,
            flip_horizontal = flip_h,
            flip_vertical = flip_v,
            "applying EXIF orientation"
        );

        let mut img = img;
        if let Some(angle) = rotate {
            img = rotate_by_angle(img, angle);
        }
        if flip_h {
            img = DynamicImage::ImageRgba8(imageops::flip_horizontal(&img.to_rgba8()));
        }
        if flip_v {
            img = DynamicImage::ImageRgba8(imageops::flip_vertical(&img.to_rgba8()));
        }

        encode_image(&img, format.unwrap_or(ImageFormat::Jpeg))
    }
}

/// Fixed clockwise rotation by a right angle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RotateSpec {
    pub degree: u16,
}

impl RotateSpec {
    pub fn from_operation(op: &Operation) -> Result<Self, TransformError> {
        op.ensure_known_keys(&["degree"])?;
        let degree = op.int("degree")?.unwrap_or(90);
        if degree != 90 && degree != 180 && degree != 270 {
            return Err(TransformError::InvalidParameter(format!(
                "degree must be 90, 180, or 270, got {}",
                degree
            )));
        }
        Ok(RotateSpec {
            degree: degree as u16,
        })
    }

    pub fn apply(&self, data: &[u8]) -> Result<Bytes, TransformError> {
        let (img, format) = decode_image(data)?;
        tracing::debug!(degree = self.degree, "applying rotation");
        let rotated = rotate_by_angle(img, self.degree);
        encode_image(&rotated, format.unwrap_or(ImageFormat::Jpeg))
    }
}

/// Rotate by 90, 180, or 270 degrees clockwise.
pub fn rotate_by_angle(img: DynamicImage, angle: u16) -> DynamicImage {
    match angle {
        90 => DynamicImage::ImageRgba8(imageops::rotate90(&img.to_rgba8())),
        180 => DynamicImage::ImageRgba8(imageops::rotate180(&img.to_rgba8())),
        270 => DynamicImage::ImageRgba8(imageops::rotate270(&img.to_rgba8())),
        _ => img,
    }
}

/// Read the EXIF orientation tag (1-8); 1 (normal) when absent or unreadable.
pub fn read_exif_orientation(data: &[u8]) -> u8 {
    let exif = match exif::Reader::new().read_from_container(&mut Cursor::new(data)) {
        Ok(exif) => exif,
        Err(_) => return 1,
    };
    exif.get_field(exif::Tag::Orientation, exif::In::PRIMARY)
        .and_then(|field| field.value.get_uint(0))
        .map(|v| v as u8)
        .filter(|v| (1..=8).contains(v))
        .unwrap_or(1)
}

/// Rotation and flips needed to normalize a given EXIF orientation.
/// Returns (rotate_angle, flip_horizontal, flip_vertical).
pub fn orientation_transforms(orientation: u8) -> (Option<u16>, bool, bool) {
    match orientation {
        1 => (None, false, false),      // Normal
        2 => (None, true, false),       // Mirror horizontal
        3 => (Some(180), false, false), // Rotate 180
        4 => (None, false, true),       // Mirror vertical
        5 => (Some(270), true, false),  // Mirror horizontal + rotate 270 CW
        6 => (Some(90), false, false),  // Rotate 90 CW
        7 => (Some(90), true, false),   // Mirror horizontal + rotate 90 CW
        8 => (Some(270), false, false), // Rotate 270 CW
        _ => (None, false, false),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GenericImageView, Rgba, RgbaImage};
    use mediaforge_core::ChainParser;

    fn op(s: &str) -> Operation {
        ChainParser::parse(s).unwrap().operations()[0].clone()
    }

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = RgbaImage::from_pixel(width, height, Rgba([255, 0, 0, 255]));
        let mut buffer = Vec::new();
        img.write_to(
            &mut std::io::Cursor::new(&mut buffer),
            image::ImageFormat::Png,
        )
        .unwrap();
        buffer
    }

    #[test]
    fn test_orientation_transforms_table() {
        assert_eq!(orientation_transforms(1), (None, false, false));
        assert_eq!(orientation_transforms(2), (None, true, false));
        assert_eq!(orientation_transforms(3), (Some(180), false, false));
        assert_eq!(orientation_transforms(4), (None, false, true));
        assert_eq!(orientation_transforms(5), (Some(270), true, false));
        assert_eq!(orientation_transforms(6), (Some(90), false, false));
        assert_eq!(orientation_transforms(7), (Some(90), true, false));
        assert_eq!(orientation_transforms(8), (Some(270), false, false));
        assert_eq!(orientation_transforms(99), (None, false, false));
    }

    #[test]
    fn test_rotate_swaps_dimensions() {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(4, 2, Rgba([0, 0, 255, 255])));
        assert_eq!(rotate_by_angle(img.clone(), 90).dimensions(), (2, 4));
        assert_eq!(rotate_by_angle(img.clone(), 180).dimensions(), (4, 2));
        assert_eq!(rotate_by_angle(img, 270).dimensions(), (2, 4));
    }

    #[test]
    fn test_auto_orient_spec() {
        assert!(AutoOrientSpec::from_operation(&op("auto-orient,1")).unwrap().auto);
        assert!(!AutoOrientSpec::from_operation(&op("auto-orient,0")).unwrap().auto);
        assert!(!AutoOrientSpec::from_operation(&op("auto-orient")).unwrap().auto);
        assert!(AutoOrientSpec::from_operation(&op("auto-orient,2")).is_err());
    }

    #[test]
    fn test_auto_orient_without_exif_is_passthrough() {
        let data = png_bytes(10, 20);
        let spec = AutoOrientSpec { auto: true };
        let out = spec.apply(&data).unwrap();
        assert_eq!(out.as_ref(), data.as_slice());
    }

    #[test]
    fn test_rotate_spec_validation() {
        assert_eq!(RotateSpec::from_operation(&op("rotate,90")).unwrap().degree, 90);
        // Default is 90 when no degree is supplied
        assert_eq!(RotateSpec::from_operation(&op("rotate")).unwrap().degree, 90);
        assert!(RotateSpec::from_operation(&op("rotate,45")).is_err());
        assert!(RotateSpec::from_operation(&op("rotate,360")).is_err());
    }

    #[test]
    fn test_rotate_apply() {
        let data = png_bytes(8, 4);
        let spec = RotateSpec { degree: 90 };
        let out = spec.apply(&data).unwrap();
        let (img, _) = decode_image(&out).unwrap();
        assert_eq!(img.dimensions(), (4, 8));
    }

    #[test]
    fn test_read_exif_orientation_no_exif() {
        assert_eq!(read_exif_orientation(b""), 1);
        assert_eq!(read_exif_orientation(&png_bytes(4, 4)), 1);
    }
}
