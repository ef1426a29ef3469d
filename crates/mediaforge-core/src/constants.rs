//! Shared numeric limits for the transformation grammar

/// Upper bound for every pixel dimension parameter (w, h, l, s).
pub const MAX_DIMENSION: i64 = 16_384;

/// Upper bound for percentage resize (`p`), in percent.
pub const MAX_RESIZE_PERCENT: i64 = 1_000;

/// Upper bound for watermark margins and padding (x, y, padx, pady).
pub const MAX_MARGIN: i64 = 4_096;

/// Absolute bound for watermark vertical offset.
pub const MAX_VOFFSET: i64 = 1_000;

/// Upper bound for watermark font size.
pub const MAX_FONT_SIZE: i64 = 1_000;

/// Audio bitrate bounds in bits per second.
pub const MIN_AUDIO_BITRATE: i64 = 1_000;
pub const MAX_AUDIO_BITRATE: i64 = 10_000_000;
