//! Background image object.

use super::ObjectId;
use kurbo::{Point, Rect};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Image format for stored image data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImageFormat {
    /// PNG format.
    Png,
    /// JPEG format.
    Jpeg,
    /// WebP format.
    WebP,
}

impl ImageFormat {
    /// Get MIME type for this format.
    pub fn mime_type(&self) -> &'static str {
        match self {
            ImageFormat::Png => "image/png",
            ImageFormat::Jpeg => "image/jpeg",
            ImageFormat::WebP => "image/webp",
        }
    }

    /// Detect format from a MIME type reported by the file picker.
    pub fn from_mime_type(mime: &str) -> Option<Self> {
        match mime.to_ascii_lowercase().as_str() {
            "image/png" => Some(ImageFormat::Png),
            "image/jpeg" | "image/jpg" => Some(ImageFormat::Jpeg),
            "image/webp" => Some(ImageFormat::WebP),
            _ => None,
        }
    }

    /// Detect format from magic bytes.
    pub fn from_magic_bytes(data: &[u8]) -> Option<Self> {
        if data.len() < 4 {
            return None;
        }

        // PNG: 89 50 4E 47
        if data.starts_with(&[0x89, 0x50, 0x4E, 0x47]) {
            return Some(ImageFormat::Png);
        }

        // JPEG: FF D8 FF
        if data.starts_with(&[0xFF, 0xD8, 0xFF]) {
            return Some(ImageFormat::Jpeg);
        }

        // WebP: RIFF....WEBP
        if data.len() >= 12 && &data[0..4] == b"RIFF" && &data[8..12] == b"WEBP" {
            return Some(ImageFormat::WebP);
        }

        None
    }
}

/// The uploaded image, stretched over the whole surface.
///
/// The encoded file bytes are kept (base64) so a serialized scene is
/// self-contained; decoded pixels live in the engine's cache.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackgroundImage {
    pub(crate) id: ObjectId,
    /// Top-left corner position.
    pub position: Point,
    /// Original image width in pixels.
    pub source_width: u32,
    /// Original image height in pixels.
    pub source_height: u32,
    /// Horizontal scale applied to the source.
    pub scale_x: f64,
    /// Vertical scale applied to the source.
    pub scale_y: f64,
    /// Image format.
    pub format: ImageFormat,
    /// Encoded image bytes as base64.
    pub data_base64: String,
    /// Background images never take part in selection.
    #[serde(default)]
    pub selectable: bool,
}

impl BackgroundImage {
    /// Create an unscaled, non-selectable image from encoded bytes.
    pub fn new(data: &[u8], source_width: u32, source_height: u32, format: ImageFormat) -> Self {
        use base64::{Engine, engine::general_purpose::STANDARD};

        Self {
            id: Uuid::new_v4(),
            position: Point::ZERO,
            source_width,
            source_height,
            scale_x: 1.0,
            scale_y: 1.0,
            format,
            data_base64: STANDARD.encode(data),
            selectable: false,
        }
    }

    /// Scale to exactly cover `width` x `height`, with independent X/Y factors.
    pub fn fill(mut self, width: f64, height: f64) -> Self {
        if self.source_width > 0 && self.source_height > 0 {
            self.scale_x = width / self.source_width as f64;
            self.scale_y = height / self.source_height as f64;
        }
        self.position = Point::ZERO;
        self
    }

    pub fn id(&self) -> ObjectId {
        self.id
    }

    /// Displayed width.
    pub fn width(&self) -> f64 {
        self.source_width as f64 * self.scale_x
    }

    /// Displayed height.
    pub fn height(&self) -> f64 {
        self.source_height as f64 * self.scale_y
    }

    /// Get the raw image data (decoded from base64).
    pub fn data(&self) -> Option<Vec<u8>> {
        use base64::{Engine, engine::general_purpose::STANDARD};
        STANDARD.decode(&self.data_base64).ok()
    }

    /// Get the bounding rectangle.
    pub fn as_rect(&self) -> Rect {
        Rect::new(
            self.position.x,
            self.position.y,
            self.position.x + self.width(),
            self.position.y + self.height(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_detection() {
        let png_magic = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];
        assert_eq!(ImageFormat::from_magic_bytes(&png_magic), Some(ImageFormat::Png));
        assert_eq!(ImageFormat::from_magic_bytes(&[0xFF, 0xD8, 0xFF, 0xE0]), Some(ImageFormat::Jpeg));
        assert_eq!(ImageFormat::from_magic_bytes(b"RIFF\0\0\0\0WEBP"), Some(ImageFormat::WebP));
        assert_eq!(ImageFormat::from_magic_bytes(b"GIF89a"), None);
        assert_eq!(ImageFormat::from_magic_bytes(&[0x89]), None);
    }

    #[test]
    fn test_mime_detection() {
        assert_eq!(ImageFormat::from_mime_type("image/PNG"), Some(ImageFormat::Png));
        assert_eq!(ImageFormat::from_mime_type("image/jpg"), Some(ImageFormat::Jpeg));
        assert_eq!(ImageFormat::from_mime_type("image/gif"), None);
    }

    #[test]
    fn test_fill_uses_independent_scales() {
        let img = BackgroundImage::new(&[0u8; 10], 1000, 500, ImageFormat::Png).fill(800.0, 600.0);
        assert!((img.scale_x - 0.8).abs() < 1e-9);
        assert!((img.scale_y - 1.2).abs() < 1e-9);
        let bounds = img.as_rect();
        assert!((bounds.width() - 800.0).abs() < 1e-9);
        assert!((bounds.height() - 600.0).abs() < 1e-9);
        assert!(!img.selectable);
    }

    #[test]
    fn test_data_roundtrip() {
        let bytes = vec![1u8, 2, 3, 4, 5];
        let img = BackgroundImage::new(&bytes, 1, 1, ImageFormat::Png);
        assert_eq!(img.data(), Some(bytes));
    }
}
