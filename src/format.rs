//! # Image Format Detection
//!
//! Rileva il tipo di immagine dai magic bytes del buffer, non dall'estensione.
//! I plugin usano il tipo rilevato per decidere se agire o lasciar passare i
//! byte invariati.

use image::ImageFormat;
use std::path::Path;

/// Image kinds the built-in backends know how to handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImageKind {
    Png,
    Jpeg,
    Gif,
    Webp,
    Svg,
    Unknown,
}

impl ImageKind {
    /// Detect the kind of an in-memory image from its leading bytes
    pub fn detect(bytes: &[u8]) -> Self {
        match image::guess_format(bytes) {
            Ok(ImageFormat::Png) => Self::Png,
            Ok(ImageFormat::Jpeg) => Self::Jpeg,
            Ok(ImageFormat::Gif) => Self::Gif,
            Ok(ImageFormat::WebP) => Self::Webp,
            _ if looks_like_svg(bytes) => Self::Svg,
            _ => Self::Unknown,
        }
    }

    /// Kind implied by a file extension (case-insensitive)
    pub fn from_path(path: &Path) -> Self {
        let ext = path
            .extension()
            .map(|ext| ext.to_string_lossy().to_lowercase());

        match ext.as_deref() {
            Some("png") => Self::Png,
            Some("jpg") | Some("jpeg") => Self::Jpeg,
            Some("gif") => Self::Gif,
            Some("webp") => Self::Webp,
            Some("svg") => Self::Svg,
            _ => Self::Unknown,
        }
    }

    /// Canonical file extension, if the kind has one
    pub fn extension(self) -> Option<&'static str> {
        match self {
            Self::Png => Some("png"),
            Self::Jpeg => Some("jpg"),
            Self::Gif => Some("gif"),
            Self::Webp => Some("webp"),
            Self::Svg => Some("svg"),
            Self::Unknown => None,
        }
    }
}

// SVG has no magic number; look for the root element near the start.
fn looks_like_svg(bytes: &[u8]) -> bool {
    let head = &bytes[..bytes.len().min(4096)];
    let text = String::from_utf8_lossy(head);
    let trimmed = text.trim_start_matches('\u{feff}').trim_start();

    (trimmed.starts_with("<?xml") || trimmed.starts_with("<svg") || trimmed.starts_with("<!"))
        && text.contains("<svg")
}
