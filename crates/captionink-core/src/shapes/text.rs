//! Text overlay object.

use super::{ObjectId, SerializableColor};
use kurbo::{Point, Rect};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Font weight options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FontWeight {
    #[default]
    Normal,
    Bold,
}

impl FontWeight {
    /// The other weight.
    pub fn toggled(self) -> Self {
        match self {
            FontWeight::Normal => FontWeight::Bold,
            FontWeight::Bold => FontWeight::Normal,
        }
    }
}

/// Font style options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FontStyle {
    #[default]
    Normal,
    Italic,
}

impl FontStyle {
    /// The other style.
    pub fn toggled(self) -> Self {
        match self {
            FontStyle::Normal => FontStyle::Italic,
            FontStyle::Italic => FontStyle::Normal,
        }
    }
}

/// An editable text object drawn over the background.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextObject {
    pub(crate) id: ObjectId,
    /// Position (top-left corner of text bounding box).
    pub position: Point,
    /// The text content. Lines are separated by `\n`.
    pub content: String,
    /// Font family name, resolved against the engine's font book.
    pub font_family: String,
    /// Font size in pixels. Not validated; non-positive sizes draw nothing.
    pub font_size: f64,
    /// Fill color.
    pub fill: SerializableColor,
    #[serde(default)]
    pub weight: FontWeight,
    #[serde(default)]
    pub style: FontStyle,
    #[serde(default)]
    pub underline: bool,
}

impl TextObject {
    /// Default font size.
    pub const DEFAULT_FONT_SIZE: f64 = 20.0;

    /// Line height as a multiple of the font size.
    pub const LINE_HEIGHT: f64 = 1.16;

    /// Create a new text object with default attributes.
    pub fn new(position: Point, content: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            position,
            content,
            font_family: "Arial".to_string(),
            font_size: Self::DEFAULT_FONT_SIZE,
            fill: SerializableColor::black(),
            weight: FontWeight::default(),
            style: FontStyle::default(),
            underline: false,
        }
    }

    pub fn with_font_family(mut self, family: impl Into<String>) -> Self {
        self.font_family = family.into();
        self
    }

    pub fn with_font_size(mut self, size: f64) -> Self {
        self.font_size = size;
        self
    }

    pub fn with_fill(mut self, fill: SerializableColor) -> Self {
        self.fill = fill;
        self
    }

    pub fn id(&self) -> ObjectId {
        self.id
    }

    pub fn is_bold(&self) -> bool {
        self.weight == FontWeight::Bold
    }

    pub fn is_italic(&self) -> bool {
        self.style == FontStyle::Italic
    }

    /// Distance between consecutive baselines.
    pub fn line_height(&self) -> f64 {
        self.font_size.max(0.0) * Self::LINE_HEIGHT
    }

    /// Number of lines, counting a trailing empty line.
    pub fn line_count(&self) -> usize {
        self.content.split('\n').count()
    }

    /// Approximate (width, height) from character counts.
    /// Used when no font is available to measure the content.
    pub fn approximate_size(&self) -> (f64, f64) {
        let max_line_len = self
            .content
            .split('\n')
            .map(|line| line.chars().count())
            .max()
            .unwrap_or(0);

        let char_width_factor = match (self.weight, self.style) {
            (FontWeight::Normal, FontStyle::Normal) => 0.55,
            (FontWeight::Normal, FontStyle::Italic) => 0.56,
            (FontWeight::Bold, FontStyle::Normal) => 0.60,
            (FontWeight::Bold, FontStyle::Italic) => 0.61,
        };
        let size = self.font_size.max(0.0);
        (
            max_line_len as f64 * size * char_width_factor,
            self.line_count() as f64 * self.line_height(),
        )
    }

    /// Bounding box for a measured (width, height).
    /// Width is clamped so empty text stays clickable.
    pub fn bounds_for_size(&self, (width, height): (f64, f64)) -> Rect {
        Rect::new(
            self.position.x,
            self.position.y,
            self.position.x + width.max(20.0),
            self.position.y + height,
        )
    }
}
