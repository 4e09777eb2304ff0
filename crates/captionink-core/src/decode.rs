//! Image file decoding.

use crate::shapes::ImageFormat;
use image::RgbaImage;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Decoding errors.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("Unrecognized image format")]
    UnknownFormat,
    #[error("Image has no pixels")]
    Empty,
    #[error("Decode failed: {0}")]
    Image(#[from] image::ImageError),
}

/// A file handed over by the file picker.
#[derive(Debug, Clone)]
pub struct ImageFile {
    /// File name as reported by the picker.
    pub name: String,
    /// MIME type as reported by the picker, if any.
    pub mime_type: Option<String>,
    /// Raw file contents.
    pub bytes: Vec<u8>,
}

impl ImageFile {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            mime_type: None,
            bytes,
        }
    }

    pub fn with_mime_type(mut self, mime: impl Into<String>) -> Self {
        self.mime_type = Some(mime.into());
        self
    }

    /// Format from the file contents, falling back to the reported MIME type.
    pub fn detect_format(&self) -> Option<ImageFormat> {
        ImageFormat::from_magic_bytes(&self.bytes)
            .or_else(|| self.mime_type.as_deref().and_then(ImageFormat::from_mime_type))
    }
}

/// A decoded image, ready to become a background.
#[derive(Clone)]
pub struct DecodedImage {
    /// Format of `encoded`.
    pub format: ImageFormat,
    /// The original encoded bytes.
    pub encoded: Vec<u8>,
    /// Decoded RGBA pixels.
    pub pixels: Arc<RgbaImage>,
}

impl DecodedImage {
    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }
}

impl fmt::Debug for DecodedImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DecodedImage")
            .field("format", &self.format)
            .field("width", &self.width())
            .field("height", &self.height())
            .field("encoded_len", &self.encoded.len())
            .finish()
    }
}

fn to_image_format(format: ImageFormat) -> image::ImageFormat {
    match format {
        ImageFormat::Png => image::ImageFormat::Png,
        ImageFormat::Jpeg => image::ImageFormat::Jpeg,
        ImageFormat::WebP => image::ImageFormat::WebP,
    }
}

/// Decode encoded bytes of a known format.
pub fn decode_bytes(format: ImageFormat, encoded: Vec<u8>) -> Result<DecodedImage, DecodeError> {
    let pixels = image::load_from_memory_with_format(&encoded, to_image_format(format))?.to_rgba8();
    if pixels.width() == 0 || pixels.height() == 0 {
        return Err(DecodeError::Empty);
    }
    Ok(DecodedImage {
        format,
        encoded,
        pixels: Arc::new(pixels),
    })
}

/// Decode a picked file.
///
/// Browser shells await the file read before calling this; the decode itself
/// runs to completion on the first poll.
pub async fn decode_image(file: ImageFile) -> Result<DecodedImage, DecodeError> {
    let format = file.detect_format().ok_or(DecodeError::UnknownFormat)?;
    log::debug!("Decoding {} ({} bytes, {:?})", file.name, file.bytes.len(), format);
    decode_bytes(format, file.bytes)
}


#[cfg(test)]
mod tests {
    use super::test_support::solid_png;
    use super::*;

    #[test]
    fn test_decode_png() {
        let file = ImageFile::new("red.png", solid_png(4, 3, [255, 0, 0, 255]));
        let decoded = pollster::block_on(decode_image(file)).unwrap();
        assert_eq!(decoded.format, ImageFormat::Png);
        assert_eq!((decoded.width(), decoded.height()), (4, 3));
        assert_eq!(decoded.pixels.get_pixel(0, 0).0, [255, 0, 0, 255]);
    }

    #[test]
    fn test_unknown_format() {
        let file = ImageFile::new("notes.txt", b"plain text".to_vec());
        let result = pollster::block_on(decode_image(file));
        assert!(matches!(result, Err(DecodeError::UnknownFormat)));
    }

    #[test]
    fn test_corrupt_png() {
        let mut bytes = solid_png(2, 2, [0, 0, 0, 255]);
        bytes.truncate(20);
        let result = pollster::block_on(decode_image(ImageFile::new("cut.png", bytes)));
        assert!(matches!(result, Err(DecodeError::Image(_))));
    }

    #[test]
    fn test_mime_fallback() {
        let file = ImageFile::new("blob", vec![0, 1, 2, 3]).with_mime_type("image/png");
        assert_eq!(file.detect_format(), Some(ImageFormat::Png));
    }
}
