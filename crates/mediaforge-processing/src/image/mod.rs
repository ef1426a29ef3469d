//! Image processing module
//!
//! Operation specs, the pure geometry engine, and the transforms that
//! execute them against decoded pixel buffers:
//! - chain grammar specs and validation (resize, crop, watermark, ...)
//! - geometry (resize plans, crop boxes, anchor positions)
//! - orientation (EXIF auto-orient, fixed rotation)
//! - filters (blur, grayscale)
//! - blind-watermark parameter handling (algorithm is external)

pub mod blind;
pub mod crop;
pub mod filters;
pub mod geometry;
pub mod orientation;
pub mod resize;
pub mod watermark;

pub use blind::BlindWatermarkSpec;
pub use crop::CropSpec;
pub use filters::BlurSpec;
pub use geometry::{anchor_position, crop_box, resize_plan, CropBox, Gravity, ResizePlan};
pub use orientation::{AutoOrientSpec, RotateSpec};
pub use resize::{ResizeMode, ResizeSelector, ResizeSpec};
pub use watermark::{Placement, WatermarkAssets, WatermarkSpec};

use bytes::Bytes;
use image::{DynamicImage, ImageFormat, ImageReader};
use mediaforge_core::TransformError;
use std::io::Cursor;

/// Decode an image buffer, also reporting the container format so the
/// transform can re-encode in kind.
pub(crate) fn decode_image(
    data: &[u8],
) -> Result<(DynamicImage, Option<ImageFormat>), TransformError> {
    let reader = ImageReader::new(Cursor::new(data))
        .with_guessed_format()
        .map_err(|e| TransformError::Decode(e.to_string()))?;
    let format = reader.format();
    let img = reader
        .decode()
        .map_err(|e| TransformError::Decode(e.to_string()))?;
    Ok((img, format))
}

/// Encode an image into the given container format. JPEG cannot carry an
/// alpha channel, so RGBA inputs are converted first.
pub(crate) fn encode_image(
    img: &DynamicImage,
    format: ImageFormat,
) -> Result<Bytes, TransformError> {
    let owned;
    let to_write = match format {
        ImageFormat::Jpeg if img.color().has_alpha() => {
            owned = DynamicImage::ImageRgb8(img.to_rgb8());
            &owned
        }
        _ => img,
    };

    let mut buffer = Vec::new();
    to_write
        .write_to(&mut Cursor::new(&mut buffer), format)
        .map_err(|e| TransformError::Encode(e.to_string()))?;
    Ok(Bytes::from(buffer))
}
