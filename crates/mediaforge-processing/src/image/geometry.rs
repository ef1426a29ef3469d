//! Pure pixel-geometry engine
//!
//! Deterministic functions from (source dimensions, validated spec) to
//! target dimensions, crop rectangles, and anchor positions. No I/O and no
//! pixel access happens here - the transform layer executes whatever plan
//! comes out. Ratios are computed in floating point; final dimensions
//! truncate toward zero.

use crate::image::crop::CropSpec;
use crate::image::resize::{ResizeMode, ResizeSelector, ResizeSpec};
use mediaforge_core::TransformError;
use serde::{Deserialize, Serialize};

/// 9-way compass anchor for crop windows and watermark placement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gravity {
    Nw,
    North,
    Ne,
    West,
    Center,
    East,
    Sw,
    South,
    Se,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Column {
    Left,
    Center,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Row {
    Top,
    Middle,
    Bottom,
}

impl Gravity {
    pub fn parse(s: &str) -> Result<Self, TransformError> {
        match s {
            "nw" => Ok(Gravity::Nw),
            "north" => Ok(Gravity::North),
            "ne" => Ok(Gravity::Ne),
            "west" => Ok(Gravity::West),
            "center" => Ok(Gravity::Center),
            "east" => Ok(Gravity::East),
            "sw" => Ok(Gravity::Sw),
            "south" => Ok(Gravity::South),
            "se" => Ok(Gravity::Se),
            other => Err(TransformError::InvalidParameter(format!(
                "invalid gravity '{}', expected one of nw, north, ne, west, center, east, sw, south, se",
                other
            ))),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Gravity::Nw => "nw",
            Gravity::North => "north",
            Gravity::Ne => "ne",
            Gravity::West => "west",
            Gravity::Center => "center",
            Gravity::East => "east",
            Gravity::Sw => "sw",
            Gravity::South => "south",
            Gravity::Se => "se",
        }
    }

    fn column(&self) -> Column {
        match self {
            Gravity::Nw | Gravity::West | Gravity::Sw => Column::Left,
            Gravity::North | Gravity::Center | Gravity::South => Column::Center,
            Gravity::Ne | Gravity::East | Gravity::Se => Column::Right,
        }
    }

    fn row(&self) -> Row {
        match self {
            Gravity::Nw | Gravity::North | Gravity::Ne => Row::Top,
            Gravity::West | Gravity::Center | Gravity::East => Row::Middle,
            Gravity::Sw | Gravity::South | Gravity::Se => Row::Bottom,
        }
    }
}

/// Pixel rectangle: x in [left, right), y in [top, bottom).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CropBox {
    pub left: u32,
    pub top: u32,
    pub right: u32,
    pub bottom: u32,
}

impl CropBox {
    pub fn width(&self) -> u32 {
        self.right - self.left
    }

    pub fn height(&self) -> u32 {
        self.bottom - self.top
    }
}

/// Executable resize plan. `Skip` is the no-op marker produced when the
/// `limit` flag forbids upscaling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResizePlan {
    Skip,
    Scale {
        width: u32,
        height: u32,
    },
    /// Scale to cover, then crop the centered window (fill mode).
    ScaleCrop {
        width: u32,
        height: u32,
        crop: CropBox,
    },
    /// Scale to fit, then paste centered on a filled canvas (pad mode).
    ScalePad {
        width: u32,
        height: u32,
        canvas_width: u32,
        canvas_height: u32,
        paste_x: u32,
        paste_y: u32,
        color: [u8; 3],
    },
}

/// Compute the resize plan for a validated spec against source dimensions.
pub fn resize_plan(
    src_w: u32,
    src_h: u32,
    spec: &ResizeSpec,
) -> Result<ResizePlan, TransformError> {
    let (sw, sh) = (src_w as f64, src_h as f64);

    match spec.selector {
        ResizeSelector::Percentage(p) => {
            let width = (sw * p as f64 / 100.0) as u32;
            let height = (sh * p as f64 / 100.0) as u32;
            Ok(scale_or_skip(spec.limit, src_w, src_h, width, height))
        }
        ResizeSelector::LongestSide(l) => {
            let ratio = l as f64 / sw.max(sh);
            let (width, height) = scale_both(sw, sh, ratio);
            Ok(scale_or_skip(spec.limit, src_w, src_h, width, height))
        }
        ResizeSelector::ShortestSide(s) => {
            let ratio = s as f64 / sw.min(sh);
            let (width, height) = scale_both(sw, sh, ratio);
            Ok(scale_or_skip(spec.limit, src_w, src_h, width, height))
        }
        ResizeSelector::Scaled {
            width,
            height,
            mode,
            color,
        } => match mode {
            ResizeMode::LFit => {
                let ratio = fit_ratio(sw, sh, width, height, true);
                let (w, h) = scale_both(sw, sh, ratio);
                Ok(scale_or_skip(spec.limit, src_w, src_h, w, h))
            }
            ResizeMode::MFit => {
                let ratio = fit_ratio(sw, sh, width, height, false);
                let (w, h) = scale_both(sw, sh, ratio);
                Ok(scale_or_skip(spec.limit, src_w, src_h, w, h))
            }
            ResizeMode::Fill => {
                let (w, h) = require_both(width, height, "fill")?;
                let ratio = (w as f64 / sw).max(h as f64 / sh);
                // Truncation can land one pixel short of the target on the
                // covering axis; the crop window must still fit.
                let scaled_w = ((sw * ratio) as u32).max(w);
                let scaled_h = ((sh * ratio) as u32).max(h);
                if spec.limit && (scaled_w > src_w || scaled_h > src_h) {
                    return Ok(ResizePlan::Skip);
                }
                let left = (scaled_w - w) / 2;
                let top = (scaled_h - h) / 2;
                Ok(ResizePlan::ScaleCrop {
                    width: scaled_w,
                    height: scaled_h,
                    crop: CropBox {
                        left,
                        top,
                        right: left + w,
                        bottom: top + h,
                    },
                })
            }
            ResizeMode::Pad => {
                let (w, h) = require_both(width, height, "pad")?;
                let ratio = (w as f64 / sw).min(h as f64 / sh);
                let (scaled_w, scaled_h) = scale_both(sw, sh, ratio);
                if spec.limit && (scaled_w > src_w || scaled_h > src_h) {
                    return Ok(ResizePlan::Skip);
                }
                Ok(ResizePlan::ScalePad {
                    width: scaled_w,
                    height: scaled_h,
                    canvas_width: w,
                    canvas_height: h,
                    paste_x: (w - scaled_w) / 2,
                    paste_y: (h - scaled_h) / 2,
                    color,
                })
            }
            ResizeMode::Fixed => {
                let (w, h) = require_both(width, height, "fixed")?;
                if spec.limit && (w > src_w || h > src_h) {
                    return Ok(ResizePlan::Skip);
                }
                Ok(ResizePlan::Scale {
                    width: w,
                    height: h,
                })
            }
        },
    }
}

fn scale_both(sw: f64, sh: f64, ratio: f64) -> (u32, u32) {
    ((sw * ratio) as u32, (sh * ratio) as u32)
}

/// LFit takes the smaller per-axis ratio (fit inside), MFit the larger
/// (cover). With a single axis given, both collapse to that axis' ratio.
fn fit_ratio(sw: f64, sh: f64, width: Option<u32>, height: Option<u32>, fit: bool) -> f64 {
    match (width, height) {
        (Some(w), Some(h)) => {
            let (rw, rh) = (w as f64 / sw, h as f64 / sh);
            if fit {
                rw.min(rh)
            } else {
                rw.max(rh)
            }
        }
        (Some(w), None) => w as f64 / sw,
        (None, Some(h)) => h as f64 / sh,
        // Unreachable for validated specs: the Scaled selector requires w or h
        (None, None) => 1.0,
    }
}

fn scale_or_skip(limit: bool, src_w: u32, src_h: u32, width: u32, height: u32) -> ResizePlan {
    if limit && (width > src_w || height > src_h) {
        ResizePlan::Skip
    } else {
        ResizePlan::Scale { width, height }
    }
}

fn require_both(
    width: Option<u32>,
    height: Option<u32>,
    mode: &str,
) -> Result<(u32, u32), TransformError> {
    match (width, height) {
        (Some(w), Some(h)) => Ok((w, h)),
        _ => Err(TransformError::MissingDimension(format!(
            "both w and h are required for {} mode",
            mode
        ))),
    }
}

/// Compute the crop window for a validated crop spec. Crop dimensions are
/// clamped to the image; the gravity anchor plus x/y offset is clamped so
/// the window stays inside the image.
pub fn crop_box(src_w: u32, src_h: u32, spec: &CropSpec) -> CropBox {
    let crop_w = spec.width.unwrap_or(src_w).min(src_w) as i64;
    let crop_h = spec.height.unwrap_or(src_h).min(src_h) as i64;
    let (iw, ih) = (src_w as i64, src_h as i64);

    let base_x = match spec.gravity.column() {
        Column::Left => 0,
        Column::Center => (iw - crop_w) / 2,
        Column::Right => iw - crop_w,
    };
    let base_y = match spec.gravity.row() {
        Row::Top => 0,
        Row::Middle => (ih - crop_h) / 2,
        Row::Bottom => ih - crop_h,
    };

    let x1 = (base_x + spec.x as i64).clamp(0, iw - crop_w);
    let y1 = (base_y + spec.y as i64).clamp(0, ih - crop_h);

    CropBox {
        left: x1 as u32,
        top: y1 as u32,
        right: (x1 + crop_w) as u32,
        bottom: (y1 + crop_h) as u32,
    }
}

/// Anchor an element of `element` size on a `canvas` using the gravity
/// table. `margins` are the x/y edge distances; `voffset` shifts only the
/// middle-row anchors. The result is clamped into `[0, W-w] x [0, H-h]` so
/// misconfigured margins can never push the element off-canvas.
pub fn anchor_position(
    canvas: (u32, u32),
    element: (u32, u32),
    gravity: Gravity,
    margins: (i64, i64),
    voffset: i64,
) -> (u32, u32) {
    let (cw, ch) = (canvas.0 as i64, canvas.1 as i64);
    let (ew, eh) = (element.0 as i64, element.1 as i64);
    let (mx, my) = margins;

    let x = match gravity.column() {
        Column::Left => mx,
        Column::Center => (cw - ew) / 2,
        Column::Right => cw - ew - mx,
    };
    let mut y = match gravity.row() {
        Row::Top => my,
        Row::Middle => (ch - eh) / 2,
        Row::Bottom => ch - eh - my,
    };
    if gravity.row() == Row::Middle {
        y += voffset;
    }

    let x = x.clamp(0, (cw - ew).max(0));
    let y = y.clamp(0, (ch - eh).max(0));
    (x as u32, y as u32)
}

/// Expand an element box by symmetric padding on each axis.
pub fn padded_box(element: (u32, u32), padx: u32, pady: u32) -> (u32, u32) {
    (element.0 + 2 * padx, element.1 + 2 * pady)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::resize::{ResizeMode, ResizeSelector, ResizeSpec};

    const WHITE: [u8; 3] = [255, 255, 255];

    fn percentage(p: u32, limit: bool) -> ResizeSpec {
        ResizeSpec {
            selector: ResizeSelector::Percentage(p),
            limit,
        }
    }

    fn scaled(w: Option<u32>, h: Option<u32>, mode: ResizeMode, limit: bool) -> ResizeSpec {
        ResizeSpec {
            selector: ResizeSelector::Scaled {
                width: w,
                height: h,
                mode,
                color: WHITE,
            },
            limit,
        }
    }

    #[test]
    fn test_percentage_floors_each_axis() {
        // floor(333 * 0.5) = 166, floor(251 * 0.5) = 125
        let plan = resize_plan(333, 251, &percentage(50, true)).unwrap();
        assert_eq!(
            plan,
            ResizePlan::Scale {
                width: 166,
                height: 125
            }
        );
    }

    #[test]
    fn test_percentage_upscale_skipped_by_default() {
        let plan = resize_plan(100, 100, &percentage(200, true)).unwrap();
        assert_eq!(plan, ResizePlan::Skip);

        let plan = resize_plan(100, 100, &percentage(200, false)).unwrap();
        assert_eq!(
            plan,
            ResizePlan::Scale {
                width: 200,
                height: 200
            }
        );
    }

    #[test]
    fn test_longest_side() {
        let spec = ResizeSpec {
            selector: ResizeSelector::LongestSide(500),
            limit: true,
        };
        let plan = resize_plan(1000, 400, &spec).unwrap();
        assert_eq!(
            plan,
            ResizePlan::Scale {
                width: 500,
                height: 200
            }
        );
    }

    #[test]
    fn test_shortest_side() {
        let spec = ResizeSpec {
            selector: ResizeSelector::ShortestSide(200),
            limit: true,
        };
        let plan = resize_plan(1000, 400, &spec).unwrap();
        assert_eq!(
            plan,
            ResizePlan::Scale {
                width: 500,
                height: 200
            }
        );
    }

    #[test]
    fn test_lfit_fits_inside() {
        let spec = scaled(Some(500), Some(500), ResizeMode::LFit, true);
        let plan = resize_plan(1000, 400, &spec).unwrap();
        // min(0.5, 1.25) = 0.5
        assert_eq!(
            plan,
            ResizePlan::Scale {
                width: 500,
                height: 200
            }
        );
    }

    #[test]
    fn test_mfit_covers() {
        let spec = scaled(Some(500), Some(300), ResizeMode::MFit, false);
        let plan = resize_plan(1000, 400, &spec).unwrap();
        // max(0.5, 0.75) = 0.75
        assert_eq!(
            plan,
            ResizePlan::Scale {
                width: 750,
                height: 300
            }
        );
    }

    #[test]
    fn test_single_axis_ratio() {
        let spec = scaled(Some(250), None, ResizeMode::LFit, true);
        let plan = resize_plan(1000, 400, &spec).unwrap();
        assert_eq!(
            plan,
            ResizePlan::Scale {
                width: 250,
                height: 100
            }
        );
    }

    #[test]
    fn test_fill_is_exact_and_centered() {
        let spec = scaled(Some(200), Some(200), ResizeMode::Fill, true);
        let plan = resize_plan(1000, 400, &spec).unwrap();
        match plan {
            ResizePlan::ScaleCrop {
                width,
                height,
                crop,
            } => {
                // cover ratio = max(0.2, 0.5) = 0.5 -> 500x200
                assert_eq!((width, height), (500, 200));
                assert_eq!(crop.width(), 200);
                assert_eq!(crop.height(), 200);
                assert_eq!(crop.left, 150);
                assert_eq!(crop.top, 0);
            }
            other => panic!("expected ScaleCrop, got {:?}", other),
        }
    }

    #[test]
    fn test_fill_requires_both_dimensions() {
        let spec = scaled(Some(200), None, ResizeMode::Fill, true);
        let err = resize_plan(1000, 400, &spec).unwrap_err();
        assert!(matches!(err, TransformError::MissingDimension(_)));
    }

    #[test]
    fn test_pad_centers_on_canvas() {
        let spec = scaled(Some(200), Some(200), ResizeMode::Pad, true);
        let plan = resize_plan(1000, 400, &spec).unwrap();
        match plan {
            ResizePlan::ScalePad {
                width,
                height,
                canvas_width,
                canvas_height,
                paste_x,
                paste_y,
                color,
            } => {
                // fit ratio = min(0.2, 0.5) = 0.2 -> 200x80
                assert_eq!((width, height), (200, 80));
                assert_eq!((canvas_width, canvas_height), (200, 200));
                assert_eq!((paste_x, paste_y), (0, 60));
                assert_eq!(color, WHITE);
            }
            other => panic!("expected ScalePad, got {:?}", other),
        }
    }

    #[test]
    fn test_fixed_ignores_aspect() {
        let spec = scaled(Some(300), Some(100), ResizeMode::Fixed, true);
        let plan = resize_plan(1000, 400, &spec).unwrap();
        assert_eq!(
            plan,
            ResizePlan::Scale {
                width: 300,
                height: 100
            }
        );
    }

    #[test]
    fn test_fixed_upscale_skipped() {
        let spec = scaled(Some(2000), Some(100), ResizeMode::Fixed, true);
        assert_eq!(resize_plan(1000, 400, &spec).unwrap(), ResizePlan::Skip);
    }

    #[test]
    fn test_crop_box_center() {
        let spec = CropSpec {
            width: Some(200),
            height: Some(200),
            x: 0,
            y: 0,
            gravity: Gravity::Center,
            scale_percent: 100,
        };
        let b = crop_box(1000, 600, &spec);
        assert_eq!((b.left, b.top, b.right, b.bottom), (400, 200, 600, 400));
    }

    #[test]
    fn test_crop_box_offset_clamped() {
        let spec = CropSpec {
            width: Some(200),
            height: Some(200),
            x: 900,
            y: 0,
            gravity: Gravity::Nw,
            scale_percent: 100,
        };
        let b = crop_box(1000, 600, &spec);
        // 900 + 200 would overflow the right edge; clamp to 800
        assert_eq!((b.left, b.right), (800, 1000));
    }

    #[test]
    fn test_crop_box_larger_than_image_is_clamped() {
        let spec = CropSpec {
            width: Some(5000),
            height: Some(5000),
            x: 0,
            y: 0,
            gravity: Gravity::Nw,
            scale_percent: 100,
        };
        let b = crop_box(1000, 600, &spec);
        assert_eq!((b.width(), b.height()), (1000, 600));
    }

    #[test]
    fn test_anchor_positions_table() {
        let canvas = (1000, 1000);
        let elem = (100, 50);
        let m = (10, 10);

        assert_eq!(anchor_position(canvas, elem, Gravity::Nw, m, 0), (10, 10));
        assert_eq!(
            anchor_position(canvas, elem, Gravity::North, m, 0),
            (450, 10)
        );
        assert_eq!(anchor_position(canvas, elem, Gravity::Ne, m, 0), (890, 10));
        assert_eq!(
            anchor_position(canvas, elem, Gravity::West, m, 0),
            (10, 475)
        );
        assert_eq!(
            anchor_position(canvas, elem, Gravity::Center, m, 0),
            (450, 475)
        );
        assert_eq!(
            anchor_position(canvas, elem, Gravity::East, m, 0),
            (890, 475)
        );
        assert_eq!(
            anchor_position(canvas, elem, Gravity::Sw, m, 0),
            (10, 940)
        );
        assert_eq!(
            anchor_position(canvas, elem, Gravity::South, m, 0),
            (450, 940)
        );
        assert_eq!(
            anchor_position(canvas, elem, Gravity::Se, m, 0),
            (890, 940)
        );
    }

    #[test]
    fn test_anchor_voffset_only_middle_row() {
        let canvas = (1000, 1000);
        let elem = (100, 50);
        let m = (10, 10);

        assert_eq!(
            anchor_position(canvas, elem, Gravity::Center, m, 100),
            (450, 575)
        );
        assert_eq!(
            anchor_position(canvas, elem, Gravity::West, m, -100),
            (10, 375)
        );
        // Top and bottom rows ignore voffset
        assert_eq!(
            anchor_position(canvas, elem, Gravity::Nw, m, 100),
            (10, 10)
        );
        assert_eq!(
            anchor_position(canvas, elem, Gravity::Se, m, 100),
            (890, 940)
        );
    }

    #[test]
    fn test_anchor_clamps_into_canvas() {
        let canvas = (100, 100);
        let elem = (80, 80);
        // A huge voffset cannot push the element off-canvas
        assert_eq!(
            anchor_position(canvas, elem, Gravity::Center, (0, 0), 5000),
            (10, 20)
        );
        assert_eq!(
            anchor_position(canvas, elem, Gravity::Center, (0, 0), -5000),
            (10, 0)
        );
        // Element larger than canvas pins to the origin
        assert_eq!(
            anchor_position((50, 50), (80, 80), Gravity::Se, (10, 10), 0),
            (0, 0)
        );
    }

    #[test]
    fn test_padded_box() {
        assert_eq!(padded_box((100, 50), 10, 5), (120, 60));
        assert_eq!(padded_box((100, 50), 0, 0), (100, 50));
    }
}
