//! Configuration module
//!
//! Runtime settings for the processing harness: external tool paths, input
//! size ceilings per media type, and encoding defaults. Everything is read
//! from the environment with sensible defaults so the library works out of
//! the box in tests and local runs.

use std::env;

const DEFAULT_MAX_IMAGE_BYTES: usize = 50 * 1024 * 1024;
const DEFAULT_MAX_AUDIO_BYTES: usize = 200 * 1024 * 1024;
const DEFAULT_MAX_DOCUMENT_BYTES: usize = 100 * 1024 * 1024;
const DEFAULT_MAX_VIDEO_BYTES: usize = 1024 * 1024 * 1024;
const DEFAULT_JPEG_QUALITY: u8 = 85;
const DEFAULT_RASTER_DPI: u32 = 300;

/// Processor configuration
#[derive(Clone, Debug)]
pub struct ProcessorConfig {
    /// Path to the ffmpeg binary the caller will spawn with our argument vectors
    pub ffmpeg_path: String,
    /// Path to the LibreOffice binary used for document conversion
    pub libreoffice_path: String,
    pub max_image_size_bytes: usize,
    pub max_audio_size_bytes: usize,
    pub max_document_size_bytes: usize,
    pub max_video_size_bytes: usize,
    /// Default quality for JPEG re-encoding when no quality operation is given
    pub default_jpeg_quality: u8,
    /// Resolution for rasterizing document pages to images
    pub raster_dpi: u32,
    /// TrueType font file for text watermarks
    pub watermark_font_path: Option<String>,
}

impl ProcessorConfig {
    /// Load configuration from the environment (and `.env` when present).
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        Self {
            ffmpeg_path: env_or("FFMPEG_PATH", "ffmpeg"),
            libreoffice_path: env_or("LIBREOFFICE_PATH", "libreoffice"),
            max_image_size_bytes: env_parse("MAX_IMAGE_SIZE_BYTES", DEFAULT_MAX_IMAGE_BYTES),
            max_audio_size_bytes: env_parse("MAX_AUDIO_SIZE_BYTES", DEFAULT_MAX_AUDIO_BYTES),
            max_document_size_bytes: env_parse(
                "MAX_DOCUMENT_SIZE_BYTES",
                DEFAULT_MAX_DOCUMENT_BYTES,
            ),
            max_video_size_bytes: env_parse("MAX_VIDEO_SIZE_BYTES", DEFAULT_MAX_VIDEO_BYTES),
            default_jpeg_quality: env_parse("DEFAULT_JPEG_QUALITY", DEFAULT_JPEG_QUALITY),
            raster_dpi: env_parse("RASTER_DPI", DEFAULT_RASTER_DPI),
            watermark_font_path: env::var("WATERMARK_FONT_PATH").ok(),
        }
    }
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            ffmpeg_path: "ffmpeg".to_string(),
            libreoffice_path: "libreoffice".to_string(),
            max_image_size_bytes: DEFAULT_MAX_IMAGE_BYTES,
            max_audio_size_bytes: DEFAULT_MAX_AUDIO_BYTES,
            max_document_size_bytes: DEFAULT_MAX_DOCUMENT_BYTES,
            max_video_size_bytes: DEFAULT_MAX_VIDEO_BYTES,
            default_jpeg_quality: DEFAULT_JPEG_QUALITY,
            raster_dpi: DEFAULT_RASTER_DPI,
            watermark_font_path: None,
        }
    }
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_parse<T: std::str::FromStr + Copy>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
