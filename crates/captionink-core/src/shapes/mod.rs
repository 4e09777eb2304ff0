//! Objects that live on the editing surface.

mod image;
mod text;

pub use image::{BackgroundImage, ImageFormat};
pub use text::{FontStyle, FontWeight, TextObject};

use kurbo::Vec2;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for scene objects.
pub type ObjectId = Uuid;

/// Serializable color representation (RGBA8).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerializableColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl SerializableColor {
    pub fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub fn black() -> Self {
        Self::new(0, 0, 0, 255)
    }

    pub fn white() -> Self {
        Self::new(255, 255, 255, 255)
    }

    pub fn transparent() -> Self {
        Self::new(0, 0, 0, 0)
    }

    /// Parse a CSS hex color (`#rgb`, `#rrggbb` or `#rrggbbaa`).
    ///
    /// Returns `None` for anything else, including named colors.
    pub fn from_hex(color: &str) -> Option<Self> {
        let hex = color.trim().strip_prefix('#')?;
        if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return None;
        }
        let channel = |range: std::ops::Range<usize>| u8::from_str_radix(&hex[range], 16).ok();
        match hex.len() {
            3 => {
                // #rgb -> #rrggbb
                let r = channel(0..1)? * 17;
                let g = channel(1..2)? * 17;
                let b = channel(2..3)? * 17;
                Some(Self::new(r, g, b, 255))
            }
            6 => Some(Self::new(channel(0..2)?, channel(2..4)?, channel(4..6)?, 255)),
            8 => Some(Self::new(
                channel(0..2)?,
                channel(2..4)?,
                channel(4..6)?,
                channel(6..8)?,
            )),
            _ => None,
        }
    }

    /// Format as `#rrggbb`, or `#rrggbbaa` when not fully opaque.
    pub fn to_hex(&self) -> String {
        if self.a == 255 {
            format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
        } else {
            format!("#{:02x}{:02x}{:02x}{:02x}", self.r, self.g, self.b, self.a)
        }
    }
}

/// Kind of a scene object, as reported to callers that only hold a reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ObjectKind {
    Image,
    Text,
}

/// Enum wrapper for all scene object types (for serialization).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SceneObject {
    Image(BackgroundImage),
    Text(TextObject),
}

impl SceneObject {
    pub fn id(&self) -> ObjectId {
        match self {
            SceneObject::Image(img) => img.id(),
            SceneObject::Text(text) => text.id(),
        }
    }

    pub fn kind(&self) -> ObjectKind {
        match self {
            SceneObject::Image(_) => ObjectKind::Image,
            SceneObject::Text(_) => ObjectKind::Text,
        }
    }

    /// Whether pointer interaction may select this object.
    pub fn is_selectable(&self) -> bool {
        match self {
            SceneObject::Image(img) => img.selectable,
            SceneObject::Text(_) => true,
        }
    }

    /// Move the object by `delta`.
    pub fn translate(&mut self, delta: Vec2) {
        match self {
            SceneObject::Image(img) => img.position += delta,
            SceneObject::Text(text) => text.position += delta,
        }
    }

    pub fn as_text(&self) -> Option<&TextObject> {
        match self {
            SceneObject::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_text_mut(&mut self) -> Option<&mut TextObject> {
        match self {
            SceneObject::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_image(&self) -> Option<&BackgroundImage> {
        match self {
            SceneObject::Image(img) => Some(img),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kurbo::Point;

    #[test]
    fn test_hex_parsing() {
        assert_eq!(SerializableColor::from_hex("#000000"), Some(SerializableColor::black()));
        assert_eq!(SerializableColor::from_hex("#fff"), Some(SerializableColor::white()));
        assert_eq!(
            SerializableColor::from_hex("#ff000080"),
            Some(SerializableColor::new(255, 0, 0, 128))
        );
        assert_eq!(SerializableColor::from_hex("red"), None);
        assert_eq!(SerializableColor::from_hex("#12345"), None);
        assert_eq!(SerializableColor::from_hex("#gggggg"), None);
    }

    #[test]
    fn test_hex_formatting() {
        assert_eq!(SerializableColor::new(255, 136, 0, 255).to_hex(), "#ff8800");
        assert_eq!(SerializableColor::new(0, 0, 0, 0).to_hex(), "#00000000");
    }

    #[test]
    fn test_translate_text() {
        let mut obj = SceneObject::Text(TextObject::new(Point::new(10.0, 10.0), "Hi".to_string()));
        obj.translate(Vec2::new(5.0, -5.0));
        let text = obj.as_text().unwrap();
        assert_eq!(text.position, Point::new(15.0, 5.0));
        assert!(obj.is_selectable());
    }

    #[test]
    fn test_serialized_tag() {
        let obj = SceneObject::Text(TextObject::new(Point::ZERO, "tag".to_string()));
        let json = serde_json::to_string(&obj).unwrap();
        assert!(json.contains("\"type\":\"text\""));
    }
}
