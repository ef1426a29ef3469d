//! Output format selection and quality re-encoding
//!
//! Handles the `format` and `quality` operations: container conversion with
//! per-format encoder settings, and JPEG quality adjustment. WebP output
//! uses the lossless encoder, so quality applies to JPEG (and TIFF via its
//! JPEG-compressed path) only.

use crate::image::decode_image;
use bytes::Bytes;
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ImageFormat};
use mediaforge_core::{Operation, TransformError};
use serde::{Deserialize, Serialize};
use std::io::Cursor;

/// Supported output containers (wire names preserved; jpg and jpeg are the
/// same container).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Jpeg,
    Png,
    WebP,
    Bmp,
    Gif,
    Tiff,
}

impl OutputFormat {
    pub fn parse(s: &str) -> Result<Self, TransformError> {
        match s.to_ascii_lowercase().as_str() {
            "jpg" | "jpeg" => Ok(OutputFormat::Jpeg),
            "png" => Ok(OutputFormat::Png),
            "webp" => Ok(OutputFormat::WebP),
            "bmp" => Ok(OutputFormat::Bmp),
            "gif" => Ok(OutputFormat::Gif),
            "tiff" => Ok(OutputFormat::Tiff),
            other => Err(TransformError::InvalidParameter(format!(
                "unsupported format '{}'",
                other
            ))),
        }
    }

    pub fn to_mime_type(&self) -> &'static str {
        match self {
            OutputFormat::Jpeg => "image/jpeg",
            OutputFormat::Png => "image/png",
            OutputFormat::WebP => "image/webp",
            OutputFormat::Bmp => "image/bmp",
            OutputFormat::Gif => "image/gif",
            OutputFormat::Tiff => "image/tiff",
        }
    }

    pub fn to_image_format(&self) -> ImageFormat {
        match self {
            OutputFormat::Jpeg => ImageFormat::Jpeg,
            OutputFormat::Png => ImageFormat::Png,
            OutputFormat::WebP => ImageFormat::WebP,
            OutputFormat::Bmp => ImageFormat::Bmp,
            OutputFormat::Gif => ImageFormat::Gif,
            OutputFormat::Tiff => ImageFormat::Tiff,
        }
    }
}

/// MIME type for a wire format name, defaulting to JPEG for unknown values
/// (response-header concern, not validation).
pub fn content_type_for(format: &str) -> &'static str {
    OutputFormat::parse(format)
        .map(|f| f.to_mime_type())
        .unwrap_or("image/jpeg")
}

/// The `format` operation: convert container, optionally setting quality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormatSpec {
    pub format: OutputFormat,
    pub quality: u8,
}

impl FormatSpec {
    pub fn from_operation(op: &Operation) -> Result<Self, TransformError> {
        op.ensure_known_keys(&["f", "q"])?;

        let format = match op.text("f") {
            Some(f) => OutputFormat::parse(&f)?,
            None => OutputFormat::Jpeg,
        };

        let quality = op.int("q")?.unwrap_or(85);
        if !(1..=100).contains(&quality) {
            return Err(TransformError::InvalidParameter(format!(
                "q must be between 1 and 100, got {}",
                quality
            )));
        }

        Ok(FormatSpec {
            format,
            quality: quality as u8,
        })
    }

    pub fn apply(&self, data: &[u8]) -> Result<Bytes, TransformError> {
        let (img, _) = decode_image(data)?;
        tracing::debug!(format = ?self.format, quality = self.quality, "converting format");
        encode_with_quality(&img, self.format, self.quality)
    }
}

/// The `quality` operation: `q` sets quality absolutely, `Q` caps it (the
/// image is only re-encoded when the cap lowers the configured default).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QualitySpec {
    pub absolute: Option<u8>,
    pub relative: Option<u8>,
}

impl QualitySpec {
    pub fn from_operation(op: &Operation) -> Result<Self, TransformError> {
        op.ensure_known_keys(&["q", "Q"])?;

        let absolute = bounded_quality(op.int("q")?)?;
        let relative = bounded_quality(op.int("Q")?)?;

        match (absolute, relative) {
            (None, None) => Err(TransformError::InvalidParameter(
                "quality requires q or Q".to_string(),
            )),
            (Some(_), Some(_)) => Err(TransformError::MutuallyExclusiveParameters(
                "quality accepts q or Q, not both".to_string(),
            )),
            _ => Ok(QualitySpec {
                absolute,
                relative,
            }),
        }
    }

    /// Effective encoding quality given the configured default.
    pub fn effective(&self, default_quality: u8) -> u8 {
        match (self.absolute, self.relative) {
            (Some(q), _) => q,
            (None, Some(cap)) => default_quality.min(cap),
            (None, None) => default_quality,
        }
    }

    pub fn apply(&self, data: &[u8], default_quality: u8) -> Result<Bytes, TransformError> {
        let quality = self.effective(default_quality);

        // A relative cap above the default means nothing to do
        if self.absolute.is_none() && quality >= default_quality {
            return Ok(Bytes::copy_from_slice(data));
        }

        let (img, format) = decode_image(data)?;
        let format = match format {
            Some(ImageFormat::Jpeg) | None => OutputFormat::Jpeg,
            Some(ImageFormat::WebP) => OutputFormat::WebP,
            Some(other) => {
                tracing::debug!(format = ?other, "quality is a no-op for lossless formats");
                return Ok(Bytes::copy_from_slice(data));
            }
        };

        tracing::debug!(quality = quality, "re-encoding with quality");
        encode_with_quality(&img, format, quality)
    }
}

fn bounded_quality(value: Option<i64>) -> Result<Option<u8>, TransformError> {
    match value {
        None => Ok(None),
        Some(q) if (0..=100).contains(&q) => Ok(Some(q as u8)),
        Some(q) => Err(TransformError::InvalidParameter(format!(
            "quality must be between 0 and 100, got {}",
            q
        ))),
    }
}

/// Encode with per-format settings. JPEG honors the quality value and has
/// its alpha channel flattened; other formats use their default encoders.
pub fn encode_with_quality(
    img: &DynamicImage,
    format: OutputFormat,
    quality: u8,
) -> Result<Bytes, TransformError> {
    let mut buffer = Vec::new();

    match format {
        OutputFormat::Jpeg => {
            let rgb = DynamicImage::ImageRgb8(img.to_rgb8());
            let mut cursor = Cursor::new(&mut buffer);
            let encoder = JpegEncoder::new_with_quality(&mut cursor, quality);
            rgb.write_with_encoder(encoder)
                .map_err(|e| TransformError::Encode(e.to_string()))?;
        }
        other => {
            img.write_to(&mut Cursor::new(&mut buffer), other.to_image_format())
                .map_err(|e| TransformError::Encode(e.to_string()))?;
        }
    }

    Ok(Bytes::from(buffer))
}
