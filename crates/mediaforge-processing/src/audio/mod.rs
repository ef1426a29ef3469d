//! Audio processing module
//!
//! Validates `convert` operations against the per-format encoder envelope
//! and builds the exact ffmpeg argument vector for the caller to spawn.
//! Nothing here touches a subprocess.

use mediaforge_core::constants::{MAX_AUDIO_BITRATE, MIN_AUDIO_BITRATE};
use mediaforge_core::{Operation, TransformError};
use serde::{Deserialize, Serialize};

const CONVERT_KEYS: &[&str] = &["f", "ss", "t", "ar", "ac", "aq", "ab", "abopt", "adepth"];

/// Sample rates any format may request, before per-format narrowing.
const VALID_SAMPLE_RATES: &[u32] = &[
    8_000, 11_025, 12_000, 16_000, 22_050, 24_000, 32_000, 44_100, 48_000, 64_000, 88_200, 96_000,
];

const OPUS_SAMPLE_RATES: &[u32] = &[8_000, 12_000, 16_000, 24_000, 48_000];
const AC3_SAMPLE_RATES: &[u32] = &[32_000, 44_100, 48_000];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioFormat {
    Mp3,
    M4a,
    Flac,
    Oga,
    Ac3,
    Opus,
    Amr,
}

impl AudioFormat {
    pub fn parse(s: &str) -> Result<Self, TransformError> {
        match s.to_ascii_lowercase().as_str() {
            "mp3" => Ok(AudioFormat::Mp3),
            "m4a" => Ok(AudioFormat::M4a),
            "flac" => Ok(AudioFormat::Flac),
            "oga" => Ok(AudioFormat::Oga),
            "ac3" => Ok(AudioFormat::Ac3),
            "opus" => Ok(AudioFormat::Opus),
            "amr" => Ok(AudioFormat::Amr),
            other => Err(TransformError::InvalidParameter(format!(
                "unsupported format '{}', expected one of mp3, m4a, flac, oga, ac3, opus, amr",
                other
            ))),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AudioFormat::Mp3 => "mp3",
            AudioFormat::M4a => "m4a",
            AudioFormat::Flac => "flac",
            AudioFormat::Oga => "oga",
            AudioFormat::Ac3 => "ac3",
            AudioFormat::Opus => "opus",
            AudioFormat::Amr => "amr",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            AudioFormat::Mp3 => "audio/mpeg",
            AudioFormat::M4a => "audio/mp4",
            AudioFormat::Flac => "audio/flac",
            AudioFormat::Oga => "audio/ogg",
            AudioFormat::Ac3 => "audio/ac3",
            AudioFormat::Opus => "audio/opus",
            AudioFormat::Amr => "audio/amr",
        }
    }
}

/// Validated parameters of an audio `convert` operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioConvertSpec {
    pub format: AudioFormat,
    /// Clip start in milliseconds.
    pub start_ms: Option<u64>,
    /// Clip duration in milliseconds.
    pub duration_ms: Option<u64>,
    pub sample_rate: Option<u32>,
    pub channels: Option<u8>,
    /// Quality 0-100; mutually exclusive with `bitrate`.
    pub quality: Option<u8>,
    /// Bitrate in bits per second; mutually exclusive with `quality`.
    pub bitrate: Option<u32>,
    pub bitrate_option: Option<u8>,
    /// FLAC sample depth (16 or 24).
    pub sample_depth: Option<u8>,
}

impl AudioConvertSpec {
    pub fn from_operation(op: &Operation) -> Result<Self, TransformError> {
        if op.name() != "convert" {
            return Err(TransformError::UnknownOperation(op.name().to_string()));
        }
        op.ensure_known_keys(CONVERT_KEYS)?;

        let format = match op.text("f") {
            Some(f) => AudioFormat::parse(&f)?,
            None => {
                return Err(TransformError::InvalidParameter(
                    "output format (f) is required".to_string(),
                ))
            }
        };

        let start_ms = non_negative(op.int("ss")?, "ss")?;
        let duration_ms = non_negative(op.int("t")?, "t")?;

        let sample_rate = match op.int("ar")? {
            None => None,
            Some(ar) => {
                let ar = u32::try_from(ar).map_err(|_| invalid_rate(ar))?;
                if !VALID_SAMPLE_RATES.contains(&ar) {
                    return Err(invalid_rate(ar as i64));
                }
                validate_format_sample_rate(format, ar)?;
                Some(ar)
            }
        };

        let channels = match op.int("ac")? {
            None => None,
            Some(ac) => {
                if !(1..=8).contains(&ac) {
                    return Err(TransformError::InvalidParameter(format!(
                        "ac must be between 1 and 8, got {}",
                        ac
                    )));
                }
                validate_format_channels(format, ac as u8)?;
                Some(ac as u8)
            }
        };

        let quality = match op.int("aq")? {
            None => None,
            Some(aq) => {
                if !(0..=100).contains(&aq) {
                    return Err(TransformError::InvalidParameter(format!(
                        "aq must be between 0 and 100, got {}",
                        aq
                    )));
                }
                Some(aq as u8)
            }
        };

        let bitrate = match op.int("ab")? {
            None => None,
            Some(ab) => {
                if !(MIN_AUDIO_BITRATE..=MAX_AUDIO_BITRATE).contains(&ab) {
                    return Err(TransformError::InvalidParameter(format!(
                        "ab must be between {} and {}, got {}",
                        MIN_AUDIO_BITRATE, MAX_AUDIO_BITRATE, ab
                    )));
                }
                Some(ab as u32)
            }
        };

        if quality.is_some() && bitrate.is_some() {
            return Err(TransformError::MutuallyExclusiveParameters(
                "cannot specify both quality (aq) and bitrate (ab)".to_string(),
            ));
        }

        let bitrate_option = match op.int("abopt")? {
            None => None,
            Some(opt @ 0..=2) => Some(opt as u8),
            Some(opt) => {
                return Err(TransformError::InvalidParameter(format!(
                    "abopt must be 0, 1, or 2, got {}",
                    opt
                )))
            }
        };

        let sample_depth = match op.int("adepth")? {
            None => None,
            Some(depth) => {
                if format != AudioFormat::Flac {
                    return Err(TransformError::InvalidParameter(
                        "adepth is only valid for flac output".to_string(),
                    ));
                }
                if depth != 16 && depth != 24 {
                    return Err(TransformError::InvalidParameter(format!(
                        "adepth must be 16 or 24, got {}",
                        depth
                    )));
                }
                Some(depth as u8)
            }
        };

        Ok(AudioConvertSpec {
            format,
            start_ms,
            duration_ms,
            sample_rate,
            channels,
            quality,
            bitrate,
            bitrate_option,
            sample_depth,
        })
    }

    /// Build the ffmpeg argument vector (excluding the binary itself) for
    /// this conversion. The caller owns spawning and I/O.
    pub fn ffmpeg_args(&self, input: &str, output: &str) -> Vec<String> {
        let mut args = vec!["-i".to_string(), input.to_string()];

        if let Some(ss) = self.start_ms {
            args.push("-ss".to_string());
            args.push(format_seconds(ss));
        }
        if let Some(t) = self.duration_ms {
            args.push("-t".to_string());
            args.push(format_seconds(t));
        }

        // AMR-NB is 8kHz only; force it regardless of the request
        if self.format == AudioFormat::Amr {
            args.push("-ar".to_string());
            args.push("8000".to_string());
        } else if let Some(ar) = self.sample_rate {
            args.push("-ar".to_string());
            args.push(ar.to_string());
        }

        if let Some(ac) = self.channels {
            args.push("-ac".to_string());
            args.push(ac.to_string());
        }

        if let Some(aq) = self.quality {
            args.push("-q:a".to_string());
            let value = if self.format == AudioFormat::Mp3 {
                // Map 0-100 onto MP3's 0-9 VBR scale
                (aq as u32 * 9 / 100).to_string()
            } else {
                aq.to_string()
            };
            args.push(value);
        } else if let Some(ab) = self.bitrate {
            args.push("-b:a".to_string());
            args.push(ab.to_string());
        }

        if self.format == AudioFormat::Flac {
            if let Some(depth) = self.sample_depth {
                args.push("-sample_fmt".to_string());
                args.push(format!("s{}", depth));
            }
        }

        // M4A needs the MP4 container with an explicit AAC codec
        if self.format == AudioFormat::M4a {
            args.push("-f".to_string());
            args.push("mp4".to_string());
            args.push("-c:a".to_string());
            args.push("aac".to_string());
        } else {
            args.push("-f".to_string());
            args.push(self.format.as_str().to_string());
        }

        args.push(output.to_string());
        args
    }
}

fn validate_format_sample_rate(format: AudioFormat, ar: u32) -> Result<(), TransformError> {
    match format {
        AudioFormat::Mp3 if ar > 48_000 => Err(TransformError::InvalidParameter(
            "mp3 only supports sample rates up to 48kHz".to_string(),
        )),
        AudioFormat::Opus if !OPUS_SAMPLE_RATES.contains(&ar) => {
            Err(TransformError::InvalidParameter(
                "opus only supports 8kHz, 12kHz, 16kHz, 24kHz, and 48kHz".to_string(),
            ))
        }
        AudioFormat::Ac3 if !AC3_SAMPLE_RATES.contains(&ar) => {
            Err(TransformError::InvalidParameter(
                "ac3 only supports 32kHz, 44.1kHz, and 48kHz".to_string(),
            ))
        }
        AudioFormat::Amr if ar != 8_000 => Err(TransformError::InvalidParameter(
            "amr only supports an 8kHz sample rate".to_string(),
        )),
        _ => Ok(()),
    }
}

fn validate_format_channels(format: AudioFormat, ac: u8) -> Result<(), TransformError> {
    match format {
        AudioFormat::Mp3 if ac > 2 => Err(TransformError::InvalidParameter(
            "mp3 only supports mono and stereo".to_string(),
        )),
        AudioFormat::Ac3 if ac > 6 => Err(TransformError::InvalidParameter(
            "ac3 supports up to 6 channels".to_string(),
        )),
        AudioFormat::Amr if ac != 1 => Err(TransformError::InvalidParameter(
            "amr only supports mono".to_string(),
        )),
        _ => Ok(()),
    }
}

fn non_negative(value: Option<i64>, name: &str) -> Result<Option<u64>, TransformError> {
    match value {
        None => Ok(None),
        Some(v) if v >= 0 => Ok(Some(v as u64)),
        Some(v) => Err(TransformError::InvalidParameter(format!(
            "{} must be non-negative, got {}",
            name, v
        ))),
    }
}

fn invalid_rate(ar: i64) -> TransformError {
    TransformError::InvalidParameter(format!("invalid sample rate: {}", ar))
}

/// Milliseconds to ffmpeg seconds, keeping sub-second precision.
fn format_seconds(ms: u64) -> String {
    if ms % 1000 == 0 {
        (ms / 1000).to_string()
    } else {
        format!("{}.{:03}", ms / 1000, ms % 1000)
    }
}

/// The converter only accepts WAV sources; reject anything else up front.
pub fn validate_input_key(object_key: &str) -> Result<(), TransformError> {
    let ext = mediaforge_core::models::key_extension(object_key)
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();
    if ext != "wav" {
        return Err(TransformError::InvalidParameter(format!(
            "unsupported input format '{}': only wav is supported",
            ext
        )));
    }
    Ok(())
}

/// Content type for an audio format name, including the wav passthrough.
pub fn content_type(format: &str) -> &'static str {
    match format.to_ascii_lowercase().as_str() {
        "wav" => "audio/wav",
        other => AudioFormat::parse(other)
            .map(|f| f.content_type())
            .unwrap_or("application/octet-stream"),
    }
}
