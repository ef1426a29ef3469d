//! Watermark operation: text and image overlays with gravity placement
//!
//! Both variants share the placement parameters (transparency, gravity,
//! margins, vertical offset, padding). Text watermarks are rasterized from
//! caller-supplied font bytes; image watermarks use caller-resolved overlay
//! bytes keyed by the wire reference. The core never fetches either itself.

use crate::image::geometry::{anchor_position, padded_box, Gravity};
use crate::image::resize::{parse_hex_color, resize_exact};
use crate::image::{decode_image, encode_image};
use ab_glyph::{FontRef, PxScale};
use anyhow::anyhow;
use bytes::Bytes;
use image::{imageops, DynamicImage, GenericImageView, ImageFormat, Rgba, RgbaImage};
use imageproc::drawing::{draw_text_mut, text_size};
use imageproc::geometric_transformations::{rotate_about_center, Interpolation};
use mediaforge_core::constants::{MAX_FONT_SIZE, MAX_MARGIN, MAX_VOFFSET};
use mediaforge_core::{Operation, TransformError};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

const WATERMARK_KEYS: &[&str] = &[
    "text", "image", "color", "t", "g", "x", "y", "voffset", "fill", "padx", "pady", "size",
    "shadow", "rotate", "P", "type",
];

/// Inner padding around rendered text, in pixels.
const TEXT_PADDING: u32 = 10;

/// Placement parameters shared by text and image watermarks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Placement {
    /// Opacity percentage: 100 = opaque, 0 = invisible.
    pub transparency: u8,
    pub gravity: Gravity,
    /// Horizontal margin from the anchored edge.
    pub x: u32,
    /// Vertical margin from the anchored edge.
    pub y: u32,
    /// Shift for middle-row anchors only.
    pub voffset: i64,
    pub fill: bool,
    pub padx: u32,
    pub pady: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextWatermark {
    pub text: String,
    /// Font family hint; the raster font itself is supplied by the caller.
    pub font: Option<String>,
    pub color: [u8; 3],
    pub size: u32,
    /// Shadow opacity percentage; 0 disables the shadow.
    pub shadow: u8,
    /// Counter-clockwise rotation in degrees.
    pub rotate: u16,
    pub placement: Placement,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageWatermark {
    /// Wire reference of the overlay object; resolved by the caller.
    pub image: String,
    /// Proportional scale percentage applied to the overlay.
    pub scale_percent: Option<u32>,
    pub placement: Placement,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum WatermarkSpec {
    Text(TextWatermark),
    Image(ImageWatermark),
}

/// Externally resolved resources a watermark needs: font bytes for text,
/// overlay bytes keyed by wire reference for images.
#[derive(Debug, Clone, Default)]
pub struct WatermarkAssets {
    pub font_data: Option<Bytes>,
    pub overlays: HashMap<String, Bytes>,
}

impl WatermarkSpec {
    pub fn from_operation(op: &Operation) -> Result<Self, TransformError> {
        op.ensure_known_keys(WATERMARK_KEYS)?;

        let placement = Placement::from_operation(op)?;

        match (op.text("text"), op.text("image")) {
            (Some(_), Some(_)) => Err(TransformError::MutuallyExclusiveParameters(
                "watermark accepts text or image, not both".to_string(),
            )),
            (Some(text), None) => {
                if text.is_empty() {
                    return Err(TransformError::InvalidParameter(
                        "text must not be empty".to_string(),
                    ));
                }

                let color = parse_hex_color(&op.text("color").unwrap_or_else(|| "000000".into()))?;

                let size = op.int("size")?.unwrap_or(40);
                if !(1..=MAX_FONT_SIZE).contains(&size) {
                    return Err(TransformError::InvalidParameter(format!(
                        "size must be between 1 and {}, got {}",
                        MAX_FONT_SIZE, size
                    )));
                }

                let shadow = op.int("shadow")?.unwrap_or(0);
                if !(0..=100).contains(&shadow) {
                    return Err(TransformError::InvalidParameter(format!(
                        "shadow must be between 0 and 100, got {}",
                        shadow
                    )));
                }

                let rotate = op.int("rotate")?.unwrap_or(0);
                if !(0..=360).contains(&rotate) {
                    return Err(TransformError::InvalidParameter(format!(
                        "rotate must be between 0 and 360, got {}",
                        rotate
                    )));
                }

                Ok(WatermarkSpec::Text(TextWatermark {
                    text,
                    font: op.text("type"),
                    color,
                    size: size as u32,
                    shadow: shadow as u8,
                    rotate: rotate as u16,
                    placement,
                }))
            }
            (None, Some(image)) => {
                if image.is_empty() {
                    return Err(TransformError::InvalidParameter(
                        "image must not be empty".to_string(),
                    ));
                }

                let scale_percent = match op.int("P")? {
                    Some(p) => {
                        if !(1..=100).contains(&p) {
                            return Err(TransformError::InvalidParameter(format!(
                                "P must be between 1 and 100, got {}",
                                p
                            )));
                        }
                        Some(p as u32)
                    }
                    None => None,
                };

                Ok(WatermarkSpec::Image(ImageWatermark {
                    image,
                    scale_percent,
                    placement,
                }))
            }
            (None, None) => Err(TransformError::InvalidParameter(
                "watermark requires text or image".to_string(),
            )),
        }
    }

    pub fn placement(&self) -> &Placement {
        match self {
            WatermarkSpec::Text(t) => &t.placement,
            WatermarkSpec::Image(i) => &i.placement,
        }
    }

    pub fn apply(&self, data: &[u8], assets: &WatermarkAssets) -> Result<Bytes, TransformError> {
        let (img, format) = decode_image(data)?;
        let mut base = img.to_rgba8();
        let canvas = base.dimensions();

        let overlay = match self {
            WatermarkSpec::Text(tw) => {
                let font_data = assets
                    .font_data
                    .as_ref()
                    .ok_or_else(|| anyhow!("no watermark font configured"))?;
                let font = FontRef::try_from_slice(font_data)
                    .map_err(|e| anyhow!("invalid watermark font: {}", e))?;
                render_text_block(tw, &font)
            }
            WatermarkSpec::Image(iw) => {
                let bytes = assets.overlays.get(&iw.image).ok_or_else(|| {
                    TransformError::InvalidParameter(format!(
                        "unknown watermark image '{}'",
                        iw.image
                    ))
                })?;
                let (overlay_img, _) = decode_image(bytes)?;
                let mut overlay = overlay_img.to_rgba8();
                if let Some(p) = iw.scale_percent {
                    let new_w = ((overlay.width() as f64 * p as f64 / 100.0) as u32).max(1);
                    let new_h = ((overlay.height() as f64 * p as f64 / 100.0) as u32).max(1);
                    overlay = resize_exact(&DynamicImage::ImageRgba8(overlay), new_w, new_h)
                        .to_rgba8();
                }
                overlay
            }
        };

        let placement = self.placement();
        let mut overlay = overlay;
        apply_transparency(&mut overlay, placement.transparency);

        let element = padded_box(overlay.dimensions(), placement.padx, placement.pady);
        let (x, y) = anchor_position(
            canvas,
            element,
            placement.gravity,
            (placement.x as i64, placement.y as i64),
            placement.voffset,
        );

        tracing::debug!(
            x = x,
            y = y,
            gravity = placement.gravity.as_str(),
            "placing watermark"
        );

        imageops::overlay(
            &mut base,
            &overlay,
            (x + placement.padx) as i64,
            (y + placement.pady) as i64,
        );

        encode_image(&DynamicImage::ImageRgba8(base), format.unwrap_or(ImageFormat::Jpeg))
    }
}

impl Placement {
    fn from_operation(op: &Operation) -> Result<Self, TransformError> {
        let transparency = op.int("t")?.unwrap_or(100);
        if !(0..=100).contains(&transparency) {
            return Err(TransformError::InvalidParameter(format!(
                "t must be between 0 and 100, got {}",
                transparency
            )));
        }

        let gravity = match op.text("g") {
            Some(g) => Gravity::parse(&g)?,
            None => Gravity::Se,
        };

        let x = margin(op.int("x")?.unwrap_or(10), "x")?;
        let y = margin(op.int("y")?.unwrap_or(10), "y")?;

        let voffset = op.int("voffset")?.unwrap_or(0);
        if !(-MAX_VOFFSET..=MAX_VOFFSET).contains(&voffset) {
            return Err(TransformError::InvalidParameter(format!(
                "voffset must be between -{} and {}, got {}",
                MAX_VOFFSET, MAX_VOFFSET, voffset
            )));
        }

        let fill = match op.int("fill")?.unwrap_or(0) {
            0 => false,
            1 => true,
            other => {
                return Err(TransformError::InvalidParameter(format!(
                    "fill must be 0 or 1, got {}",
                    other
                )))
            }
        };

        Ok(Placement {
            transparency: transparency as u8,
            gravity,
            x,
            y,
            voffset,
            fill,
            padx: margin(op.int("padx")?.unwrap_or(0), "padx")?,
            pady: margin(op.int("pady")?.unwrap_or(0), "pady")?,
        })
    }
}

fn margin(value: i64, name: &str) -> Result<u32, TransformError> {
    if !(0..=MAX_MARGIN).contains(&value) {
        return Err(TransformError::InvalidParameter(format!(
            "{} must be between 0 and {}, got {}",
            name, MAX_MARGIN, value
        )));
    }
    Ok(value as u32)
}

/// Rasterize the text block: shadow, main text, then optional rotation.
fn render_text_block(tw: &TextWatermark, font: &FontRef<'_>) -> RgbaImage {
    let scale = PxScale::from(tw.size as f32);
    let (text_w, text_h) = text_size(scale, font, &tw.text);

    let block_w = text_w + 2 * TEXT_PADDING;
    let block_h = text_h + 2 * TEXT_PADDING;
    let mut block = RgbaImage::from_pixel(block_w, block_h, Rgba([0, 0, 0, 0]));

    if tw.shadow > 0 {
        let alpha = (255u32 * tw.shadow as u32 / 100) as u8;
        draw_text_mut(
            &mut block,
            Rgba([0, 0, 0, alpha]),
            (TEXT_PADDING + 2) as i32,
            (TEXT_PADDING + 2) as i32,
            scale,
            font,
            &tw.text,
        );
    }

    draw_text_mut(
        &mut block,
        Rgba([tw.color[0], tw.color[1], tw.color[2], 255]),
        TEXT_PADDING as i32,
        TEXT_PADDING as i32,
        scale,
        font,
        &tw.text,
    );

    if tw.rotate != 0 && tw.rotate != 360 {
        block = rotate_expanded(&block, tw.rotate);
    }

    block
}

/// Rotate counter-clockwise on an expanded canvas so corners are not cut off.
fn rotate_expanded(block: &RgbaImage, degrees: u16) -> RgbaImage {
    let (w, h) = block.dimensions();
    let diagonal = ((w as f64).hypot(h as f64)).ceil() as u32;
    let mut canvas = RgbaImage::from_pixel(diagonal, diagonal, Rgba([0, 0, 0, 0]));
    imageops::overlay(
        &mut canvas,
        block,
        ((diagonal - w) / 2) as i64,
        ((diagonal - h) / 2) as i64,
    );
    rotate_about_center(
        &canvas,
        -(degrees as f32).to_radians(),
        Interpolation::Bilinear,
        Rgba([0, 0, 0, 0]),
    )
}

fn apply_transparency(overlay: &mut RgbaImage, transparency: u8) {
    if transparency >= 100 {
        return;
    }
    for pixel in overlay.pixels_mut() {
        pixel[3] = (pixel[3] as u32 * transparency as u32 / 100) as u8;
    }
}
