//! Editor configuration.

use crate::engine::{Surface, TextAttrs};
use crate::operations::parse_color;
use crate::shapes::{FontStyle, FontWeight, SerializableColor, TextObject};
use kurbo::Point;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Surface must not be empty: {width}x{height}")]
    EmptySurface { width: u32, height: u32 },
}

/// Defaults for newly added text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TextDefaults {
    /// Where new text objects are placed.
    pub origin: Point,
    pub font_family: String,
    pub font_size: f64,
    /// Hex color; also the fallback for unparseable color input.
    pub color: String,
}

impl Default for TextDefaults {
    fn default() -> Self {
        Self {
            origin: Point::new(50.0, 50.0),
            font_family: "Arial".to_string(),
            font_size: TextObject::DEFAULT_FONT_SIZE,
            color: "#000000".to_string(),
        }
    }
}

/// Editor settings. Every field has a default, so `{}` is a valid config.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    pub surface: Surface,
    pub text: TextDefaults,
    /// Name offered for the exported PNG.
    pub export_file_name: String,
    /// Hex color of the selection outline.
    pub selection_color: String,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            surface: Surface::default(),
            text: TextDefaults::default(),
            export_file_name: "edited-image.png".to_string(),
            selection_color: "#3b82f6".to_string(),
        }
    }
}

impl EditorConfig {
    /// Parse a JSON config, filling in missing fields with defaults.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        if config.surface.width == 0 || config.surface.height == 0 {
            return Err(ConfigError::EmptySurface {
                width: config.surface.width,
                height: config.surface.height,
            });
        }
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Default text color, black if the configured one does not parse.
    pub fn default_color(&self) -> SerializableColor {
        parse_color(&self.text.color, SerializableColor::black())
    }

    pub fn selection_color(&self) -> SerializableColor {
        parse_color(&self.selection_color, SerializableColor::new(59, 130, 246, 255))
    }

    /// Attributes for a new text object with default styling.
    pub fn default_text_attrs(&self) -> TextAttrs {
        TextAttrs {
            font_family: self.text.font_family.clone(),
            font_size: self.text.font_size,
            fill: self.default_color(),
            weight: FontWeight::Normal,
            style: FontStyle::Normal,
            underline: false,
        }
    }
}
