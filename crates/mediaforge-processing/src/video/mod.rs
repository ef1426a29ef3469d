//! Video processing module
//!
//! Parses `snapshot` operations, validates stream constraints, derives
//! output dimensions, and builds the ffmpeg frame-extraction arguments.
//! Probing and spawning are the caller's job.

use mediaforge_core::{ChainParser, TransformError};
use serde::{Deserialize, Serialize};

const SUPPORTED_CODECS: &[&str] = &["h264", "h265"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SnapshotMode {
    #[default]
    Default,
    /// Keyframe-only seek: faster, less precise.
    Fast,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FrameFormat {
    #[default]
    Jpg,
    Png,
}

impl FrameFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            FrameFormat::Jpg => "jpg",
            FrameFormat::Png => "png",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            FrameFormat::Jpg => "image/jpeg",
            FrameFormat::Png => "image/png",
        }
    }
}

/// Forced frame orientation: `h` lands a landscape frame, `w` a portrait
/// one, `auto` leaves the stream as probed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RotationMode {
    #[default]
    Auto,
    H,
    W,
}

/// Stream facts the caller probes (ffprobe) before extraction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoStreamInfo {
    pub codec_name: String,
    pub width: u32,
    pub height: u32,
    pub color_space: Option<String>,
}

/// Validated parameters of a `snapshot` operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotSpec {
    /// Seek position in milliseconds.
    pub time_ms: u64,
    /// Output width; 0 derives from the aspect ratio.
    pub width: u32,
    /// Output height; 0 derives from the aspect ratio.
    pub height: u32,
    pub mode: SnapshotMode,
    pub format: FrameFormat,
    pub rotation: RotationMode,
}

impl Default for SnapshotSpec {
    fn default() -> Self {
        SnapshotSpec {
            time_ms: 0,
            width: 0,
            height: 0,
            mode: SnapshotMode::Default,
            format: FrameFormat::Jpg,
            rotation: RotationMode::Auto,
        }
    }
}

impl SnapshotSpec {
    /// Parse an operation string; the single operation must be `snapshot`.
    pub fn parse(operations: &str) -> Result<Self, TransformError> {
        let chain = ChainParser::parse(operations)?;
        let op = match chain.operations() {
            [op] => op,
            [] => {
                return Err(TransformError::MalformedOperation(
                    "no operations specified".to_string(),
                ))
            }
            _ => {
                return Err(TransformError::MalformedOperation(
                    "snapshot must be the only operation".to_string(),
                ))
            }
        };
        if op.name() != "snapshot" {
            return Err(TransformError::UnknownOperation(op.name().to_string()));
        }
        op.ensure_known_keys(&["t", "w", "h", "m", "f", "ar"])?;

        let time_ms = non_negative(op.int("t")?.unwrap_or(0), "t")?;
        let width = non_negative(op.int("w")?.unwrap_or(0), "w")? as u32;
        let height = non_negative(op.int("h")?.unwrap_or(0), "h")? as u32;

        let mode = match op.text("m").as_deref() {
            None | Some("default") => SnapshotMode::Default,
            Some("fast") => SnapshotMode::Fast,
            Some(other) => {
                return Err(TransformError::InvalidParameter(format!(
                    "m must be 'default' or 'fast', got '{}'",
                    other
                )))
            }
        };

        let format = match op.text("f").as_deref() {
            None | Some("jpg") => FrameFormat::Jpg,
            Some("png") => FrameFormat::Png,
            Some(other) => {
                return Err(TransformError::InvalidParameter(format!(
                    "f must be 'jpg' or 'png', got '{}'",
                    other
                )))
            }
        };

        let rotation = match op.text("ar").as_deref() {
            None | Some("auto") => RotationMode::Auto,
            Some("h") => RotationMode::H,
            Some("w") => RotationMode::W,
            Some(other) => {
                return Err(TransformError::InvalidParameter(format!(
                    "ar must be 'auto', 'h', or 'w', got '{}'",
                    other
                )))
            }
        };

        Ok(SnapshotSpec {
            time_ms,
            width,
            height,
            mode,
            format,
            rotation,
        })
    }

    /// Output dimensions, deriving the zero axis from the stream's aspect
    /// ratio.
    pub fn output_dimensions(&self, stream_w: u32, stream_h: u32) -> (u32, u32) {
        match (self.width, self.height) {
            (0, 0) => (stream_w, stream_h),
            (0, h) => {
                let aspect = stream_w as f64 / stream_h as f64;
                ((h as f64 * aspect) as u32, h)
            }
            (w, 0) => {
                let aspect = stream_h as f64 / stream_w as f64;
                (w, (w as f64 * aspect) as u32)
            }
            (w, h) => (w, h),
        }
    }

    /// ffmpeg argument vector (excluding the binary) for extracting one
    /// frame from `input` into `output`.
    pub fn ffmpeg_args(&self, input: &str, output: &str, info: &VideoStreamInfo) -> Vec<String> {
        let (out_w, out_h) = self.output_dimensions(info.width, info.height);

        let mut filters = vec![format!("scale={}:{}", out_w, out_h)];
        match self.rotation {
            RotationMode::H if out_w > out_h => filters.push("transpose=1".to_string()),
            RotationMode::W if out_w < out_h => filters.push("transpose=2".to_string()),
            _ => {}
        }
        if self.mode == SnapshotMode::Fast {
            filters.push("select=eq(pict_type\\,I)".to_string());
        }

        let mut args = vec![
            "-y".to_string(),
            "-ss".to_string(),
            format_seconds(self.time_ms),
            "-i".to_string(),
            input.to_string(),
            "-vf".to_string(),
            filters.join(","),
        ];

        match self.format {
            FrameFormat::Jpg => {
                args.push("-qscale:v".to_string());
                args.push("2".to_string());
            }
            FrameFormat::Png => {
                args.push("-compression_level".to_string());
                args.push("3".to_string());
            }
        }

        args.push("-vframes".to_string());
        args.push("1".to_string());
        args.push(output.to_string());
        args
    }
}

/// Reject streams the extractor cannot handle: unsupported codecs and
/// BT.2020 color.
pub fn validate_stream(info: &VideoStreamInfo) -> Result<(), TransformError> {
    let codec = info.codec_name.to_ascii_lowercase();
    if !SUPPORTED_CODECS.contains(&codec.as_str()) {
        return Err(TransformError::InvalidParameter(format!(
            "unsupported codec '{}', expected one of {:?}",
            info.codec_name, SUPPORTED_CODECS
        )));
    }
    if info.color_space.as_deref() == Some("bt2020") {
        return Err(TransformError::InvalidParameter(
            "BT.2020 color space is not supported".to_string(),
        ));
    }
    Ok(())
}

fn non_negative(value: i64, name: &str) -> Result<u64, TransformError> {
    if value < 0 {
        return Err(TransformError::InvalidParameter(format!(
            "{} must be non-negative, got {}",
            name, value
        )));
    }
    Ok(value as u64)
}

fn format_seconds(ms: u64) -> String {
    if ms % 1000 == 0 {
        (ms / 1000).to_string()
    } else {
        format!("{}.{:03}", ms / 1000, ms % 1000)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stream(w: u32, h: u32) -> VideoStreamInfo {
        VideoStreamInfo {
            codec_name: "h264".to_string(),
            width: w,
            height: h,
            color_space: None,
        }
    }

    #[test]
    fn test_parse_defaults() {
        let spec = SnapshotSpec::parse("snapshot").unwrap();
        assert_eq!(spec, SnapshotSpec::default());
    }

    #[test]
    fn test_parse_full() {
        let spec = SnapshotSpec::parse("snapshot,t_7000,f_jpg,w_800,h_600,m_fast").unwrap();
        assert_eq!(spec.time_ms, 7000);
        assert_eq!((spec.width, spec.height), (800, 600));
        assert_eq!(spec.mode, SnapshotMode::Fast);
        assert_eq!(spec.format, FrameFormat::Jpg);
    }

    #[test]
    fn test_parse_rejects_unknown_key_and_values() {
        assert!(SnapshotSpec::parse("snapshot,q_90").is_err());
        assert!(SnapshotSpec::parse("snapshot,m_slow").is_err());
        assert!(SnapshotSpec::parse("snapshot,f_gif").is_err());
        assert!(SnapshotSpec::parse("snapshot,ar_up").is_err());
        assert!(SnapshotSpec::parse("snapshot,t_-5").is_err());
    }

    #[test]
    fn test_parse_requires_snapshot_first() {
        let err = SnapshotSpec::parse("thumbnail,t_0").unwrap_err();
        assert!(matches!(err, TransformError::UnknownOperation(_)));
        let err = SnapshotSpec::parse("snapshot/snapshot").unwrap_err();
        assert!(matches!(err, TransformError::MalformedOperation(_)));
    }

    #[test]
    fn test_output_dimensions_aspect_derivation() {
        let spec = SnapshotSpec {
            width: 640,
            ..Default::default()
        };
        assert_eq!(spec.output_dimensions(1920, 1080), (640, 360));

        let spec = SnapshotSpec {
            height: 360,
            ..Default::default()
        };
        assert_eq!(spec.output_dimensions(1920, 1080), (640, 360));

        let spec = SnapshotSpec::default();
        assert_eq!(spec.output_dimensions(1920, 1080), (1920, 1080));
    }

    #[test]
    fn test_validate_stream() {
        assert!(validate_stream(&stream(1920, 1080)).is_ok());

        let mut bad_codec = stream(1920, 1080);
        bad_codec.codec_name = "vp9".to_string();
        assert!(validate_stream(&bad_codec).is_err());

        let mut bt2020 = stream(1920, 1080);
        bt2020.color_space = Some("bt2020".to_string());
        assert!(validate_stream(&bt2020).is_err());
    }

    #[test]
    fn test_ffmpeg_args_scale_and_seek() {
        let spec = SnapshotSpec::parse("snapshot,t_7000,w_800,h_600").unwrap();
        let args = spec.ffmpeg_args("in.mp4", "out.jpg", &stream(1920, 1080));
        let ss = args.iter().position(|a| a == "-ss").unwrap();
        assert_eq!(args[ss + 1], "7");
        let vf = args.iter().position(|a| a == "-vf").unwrap();
        assert_eq!(args[vf + 1], "scale=800:600");
        assert!(args.contains(&"-qscale:v".to_string()));
        assert_eq!(args.last().unwrap(), "out.jpg");
    }

    #[test]
    fn test_ffmpeg_args_fast_mode_selects_keyframes() {
        let spec = SnapshotSpec::parse("snapshot,m_fast").unwrap();
        let args = spec.ffmpeg_args("in.mp4", "out.jpg", &stream(1280, 720));
        let vf = args.iter().position(|a| a == "-vf").unwrap();
        assert!(args[vf + 1].contains("select=eq(pict_type\\,I)"));
    }

    #[test]
    fn test_ffmpeg_args_rotation_filters() {
        let spec = SnapshotSpec::parse("snapshot,ar_h,w_800,h_600").unwrap();
        let args = spec.ffmpeg_args("in.mp4", "out.jpg", &stream(1920, 1080));
        let vf = args.iter().position(|a| a == "-vf").unwrap();
        assert!(args[vf + 1].contains("transpose=1"));

        let spec = SnapshotSpec::parse("snapshot,ar_w,w_600,h_800").unwrap();
        let args = spec.ffmpeg_args("in.mp4", "out.png", &stream(1920, 1080));
        let vf = args.iter().position(|a| a == "-vf").unwrap();
        assert!(args[vf + 1].contains("transpose=2"));
    }

    #[test]
    fn test_ffmpeg_args_png_compression() {
        let spec = SnapshotSpec::parse("snapshot,f_png").unwrap();
        let args = spec.ffmpeg_args("in.mp4", "out.png", &stream(640, 480));
        assert!(args.contains(&"-compression_level".to_string()));
    }
}
