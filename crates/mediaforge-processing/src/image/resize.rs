//! Resize operation: validated spec and execution
//!
//! The wire operation selects exactly one sizing strategy: percentage
//! (`p`), longest side (`l`), shortest side (`s`), or width/height with a
//! mode (`w`/`h`/`m`/`color`). The `limit` flag (default on) turns any plan
//! that would upscale into a no-op.

use crate::image::geometry::{self, ResizePlan};
use crate::image::{decode_image, encode_image};
use bytes::Bytes;
use image::imageops;
use image::{DynamicImage, GenericImageView, ImageFormat, Rgba, RgbaImage};
use mediaforge_core::constants::{MAX_DIMENSION, MAX_RESIZE_PERCENT};
use mediaforge_core::{Operation, TransformError};
use serde::{Deserialize, Serialize};

const RESIZE_KEYS: &[&str] = &["p", "w", "h", "l", "s", "m", "limit", "color"];

/// Width/height sizing modes (wire names preserved).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResizeMode {
    #[default]
    LFit,
    MFit,
    Fill,
    Pad,
    Fixed,
}

impl ResizeMode {
    pub fn parse(s: &str) -> Result<Self, TransformError> {
        match s {
            "lfit" => Ok(ResizeMode::LFit),
            "mfit" => Ok(ResizeMode::MFit),
            "fill" => Ok(ResizeMode::Fill),
            "pad" => Ok(ResizeMode::Pad),
            "fixed" => Ok(ResizeMode::Fixed),
            other => Err(TransformError::InvalidParameter(format!(
                "m must be one of lfit, mfit, fill, pad, fixed, got '{}'",
                other
            ))),
        }
    }
}

/// Which sizing strategy the operation selected. Exactly one per resize.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResizeSelector {
    Percentage(u32),
    LongestSide(u32),
    ShortestSide(u32),
    Scaled {
        width: Option<u32>,
        height: Option<u32>,
        mode: ResizeMode,
        color: [u8; 3],
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResizeSpec {
    pub selector: ResizeSelector,
    pub limit: bool,
}

impl ResizeSpec {
    pub fn from_operation(op: &Operation) -> Result<Self, TransformError> {
        op.ensure_known_keys(RESIZE_KEYS)?;

        let limit = match op.int("limit")? {
            None | Some(1) => true,
            Some(0) => false,
            Some(other) => {
                return Err(TransformError::InvalidParameter(format!(
                    "limit must be 0 or 1, got {}",
                    other
                )))
            }
        };

        let has_p = op.has("p");
        let has_side = op.has("l") || op.has("s");
        let has_box = op.has("w") || op.has("h") || op.has("m") || op.has("color");

        let groups = [has_p, has_side, has_box].iter().filter(|g| **g).count();
        if groups > 1 {
            return Err(TransformError::MutuallyExclusiveParameters(
                "resize accepts p, l/s, or w/h/m/color, not a combination".to_string(),
            ));
        }

        let selector = if let Some(p) = op.int("p")? {
            if !(1..=MAX_RESIZE_PERCENT).contains(&p) {
                return Err(TransformError::InvalidParameter(format!(
                    "p must be between 1 and {}, got {}",
                    MAX_RESIZE_PERCENT, p
                )));
            }
            ResizeSelector::Percentage(p as u32)
        } else if let Some(l) = op.int("l")? {
            if op.has("s") {
                return Err(TransformError::MutuallyExclusiveParameters(
                    "resize accepts l or s, not both".to_string(),
                ));
            }
            ResizeSelector::LongestSide(validate_dimension(l, "l")?)
        } else if let Some(s) = op.int("s")? {
            ResizeSelector::ShortestSide(validate_dimension(s, "s")?)
        } else if has_box {
            let width = op.int("w")?.map(|w| validate_dimension(w, "w")).transpose()?;
            let height = op.int("h")?.map(|h| validate_dimension(h, "h")).transpose()?;
            if width.is_none() && height.is_none() {
                return Err(TransformError::MissingDimension(
                    "resize with m/color requires w or h".to_string(),
                ));
            }
            let mode = match op.text("m") {
                Some(m) => ResizeMode::parse(&m)?,
                None => ResizeMode::default(),
            };
            let color = match op.text("color") {
                Some(c) => parse_hex_color(&c)?,
                None => [255, 255, 255],
            };
            ResizeSelector::Scaled {
                width,
                height,
                mode,
                color,
            }
        } else {
            return Err(TransformError::InvalidParameter(
                "resize requires one of p, l, s, w, h".to_string(),
            ));
        };

        Ok(ResizeSpec { selector, limit })
    }

    /// Decode, apply the geometry plan, re-encode. A `Skip` plan returns the
    /// input bytes untouched.
    pub fn apply(&self, data: &[u8]) -> Result<Bytes, TransformError> {
        let (img, format) = decode_image(data)?;
        let (src_w, src_h) = img.dimensions();
        let plan = geometry::resize_plan(src_w, src_h, self)?;

        tracing::debug!(
            src_width = src_w,
            src_height = src_h,
            plan = ?plan,
            "applying resize"
        );

        let result = match plan {
            ResizePlan::Skip => return Ok(Bytes::copy_from_slice(data)),
            ResizePlan::Scale { width, height } => resize_exact(&img, width, height),
            ResizePlan::ScaleCrop {
                width,
                height,
                crop,
            } => {
                let scaled = resize_exact(&img, width, height);
                scaled.crop_imm(crop.left, crop.top, crop.width(), crop.height())
            }
            ResizePlan::ScalePad {
                width,
                height,
                canvas_width,
                canvas_height,
                paste_x,
                paste_y,
                color,
            } => {
                let scaled = resize_exact(&img, width, height);
                let bg = Rgba([color[0], color[1], color[2], 255]);
                let mut canvas = DynamicImage::ImageRgba8(RgbaImage::from_pixel(
                    canvas_width,
                    canvas_height,
                    bg,
                ));
                imageops::overlay(&mut canvas, &scaled, paste_x as i64, paste_y as i64);
                canvas
            }
        };

        encode_image(&result, format.unwrap_or(ImageFormat::Png))
    }
}

/// Select a resampling filter based on how aggressive the resize is.
pub fn select_filter(
    orig_width: u32,
    orig_height: u32,
    new_width: u32,
    new_height: u32,
) -> imageops::FilterType {
    let width_ratio = orig_width as f32 / new_width.max(1) as f32;
    let height_ratio = orig_height as f32 / new_height.max(1) as f32;
    let max_ratio = width_ratio.max(height_ratio);

    if max_ratio > 2.0 {
        imageops::FilterType::Triangle
    } else if max_ratio > 1.5 {
        imageops::FilterType::CatmullRom
    } else {
        imageops::FilterType::Lanczos3
    }
}

pub(crate) fn resize_exact(img: &DynamicImage, width: u32, height: u32) -> DynamicImage {
    let (orig_w, orig_h) = img.dimensions();
    let filter = select_filter(orig_w, orig_h, width, height);
    img.resize_exact(width, height, filter)
}

fn validate_dimension(value: i64, name: &str) -> Result<u32, TransformError> {
    if !(1..=MAX_DIMENSION).contains(&value) {
        return Err(TransformError::InvalidParameter(format!(
            "{} must be between 1 and {}, got {}",
            name, MAX_DIMENSION, value
        )));
    }
    Ok(value as u32)
}

/// Parse a hex color, left-zero-padding short values ("FF" -> "0000FF").
pub(crate) fn parse_hex_color(value: &str) -> Result<[u8; 3], TransformError> {
    let stripped = value.trim_start_matches('#');
    let padded = format!("{:0>6}", stripped);
    if padded.len() != 6 || !padded.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(TransformError::InvalidParameter(format!(
            "color must be 6 hex digits, got '{}'",
            value
        )));
    }
    let mut rgb = [0u8; 3];
    for (i, chunk) in rgb.iter_mut().enumerate() {
        *chunk = u8::from_str_radix(&padded[i * 2..i * 2 + 2], 16)
            .map_err(|_| TransformError::InvalidParameter(format!("invalid color '{}'", value)))?;
    }
    Ok(rgb)
}
