//! Core domain models shared across the processing crates

use serde::{Deserialize, Serialize};

/// The media families this service transforms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    Image,
    Video,
    Audio,
    Document,
}

impl MediaType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaType::Image => "image",
            MediaType::Video => "video",
            MediaType::Audio => "audio",
            MediaType::Document => "document",
        }
    }
}

impl std::fmt::Display for MediaType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// File extension of an object key, without the dot.
pub fn key_extension(key: &str) -> Option<&str> {
    let name = key.rsplit('/').next()?;
    let (_, ext) = name.rsplit_once('.')?;
    if ext.is_empty() {
        None
    } else {
        Some(ext)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_media_type_display() {
        assert_eq!(MediaType::Image.to_string(), "image");
        assert_eq!(MediaType::Document.as_str(), "document");
    }

    #[test]
    fn test_key_extension() {
        assert_eq!(key_extension("photos/cat.JPG"), Some("JPG"));
        assert_eq!(key_extension("docs/report.final.pdf"), Some("pdf"));
        assert_eq!(key_extension("noext"), None);
        assert_eq!(key_extension("trailing."), None);
    }
}
