//! Canvas engine capability.
//!
//! Editor logic reaches the retained-mode canvas only through
//! [`CanvasEngine`]. [`SceneEngine`] is the bundled implementation.

mod fonts;
mod raster;
mod scene_engine;

pub use fonts::{FontBook, FontError};
pub use raster::{Frame, encode_png};
pub use scene_engine::SceneEngine;

use crate::decode::DecodedImage;
use crate::shapes::{
    FontStyle, FontWeight, ObjectId, ObjectKind, SceneObject, SerializableColor, TextObject,
};
use kurbo::Point;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Engine errors.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Engine has been disposed")]
    Disposed,
    #[error("Invalid surface size: {width}x{height}")]
    InvalidSurface { width: u32, height: u32 },
    #[error("Object not found: {0}")]
    ObjectNotFound(ObjectId),
    #[error("Object is not text: {0}")]
    NotText(ObjectId),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Image error: {0}")]
    Image(String),
    #[error("Font error: {0}")]
    Font(#[from] FontError),
    #[error("Encode error: {0}")]
    Encode(#[from] png::EncodingError),
}

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Size of the drawing surface in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Surface {
    pub width: u32,
    pub height: u32,
}

impl Surface {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

impl Default for Surface {
    fn default() -> Self {
        Self::new(800, 600)
    }
}

/// Opaque serialized canvas contents.
///
/// Only the engine that produced a state knows how to read it.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct CanvasState(String);

impl CanvasState {
    pub fn new(raw: String) -> Self {
        Self(raw)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for CanvasState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CanvasState({} bytes)", self.0.len())
    }
}

/// Reference to a scene object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObjectRef {
    pub id: ObjectId,
    pub kind: ObjectKind,
}

impl ObjectRef {
    pub fn is_text(&self) -> bool {
        self.kind == ObjectKind::Text
    }
}

/// Raster export formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RasterFormat {
    #[default]
    Png,
}

impl RasterFormat {
    pub fn mime_type(&self) -> &'static str {
        match self {
            RasterFormat::Png => "image/png",
        }
    }
}

/// Attributes of a new text object.
#[derive(Debug, Clone, PartialEq)]
pub struct TextAttrs {
    pub font_family: String,
    pub font_size: f64,
    pub fill: SerializableColor,
    pub weight: FontWeight,
    pub style: FontStyle,
    pub underline: bool,
}

impl Default for TextAttrs {
    fn default() -> Self {
        Self {
            font_family: "Arial".to_string(),
            font_size: TextObject::DEFAULT_FONT_SIZE,
            fill: SerializableColor::black(),
            weight: FontWeight::Normal,
            style: FontStyle::Normal,
            underline: false,
        }
    }
}

impl TextAttrs {
    /// Build a text object carrying these attributes.
    pub fn instantiate(&self, position: Point, content: &str) -> TextObject {
        let mut text = TextObject::new(position, content.to_string())
            .with_font_family(self.font_family.clone())
            .with_font_size(self.font_size)
            .with_fill(self.fill);
        text.weight = self.weight;
        text.style = self.style;
        text.underline = self.underline;
        text
    }
}

/// Partial update of a text object's attributes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TextPatch {
    pub font_family: Option<String>,
    pub font_size: Option<f64>,
    pub fill: Option<SerializableColor>,
    pub weight: Option<FontWeight>,
    pub style: Option<FontStyle>,
    pub underline: Option<bool>,
}

impl TextPatch {
    pub fn font_family(family: impl Into<String>) -> Self {
        Self {
            font_family: Some(family.into()),
            ..Self::default()
        }
    }

    pub fn font_size(size: f64) -> Self {
        Self {
            font_size: Some(size),
            ..Self::default()
        }
    }

    pub fn fill(color: SerializableColor) -> Self {
        Self {
            fill: Some(color),
            ..Self::default()
        }
    }

    pub fn weight(weight: FontWeight) -> Self {
        Self {
            weight: Some(weight),
            ..Self::default()
        }
    }

    pub fn style(style: FontStyle) -> Self {
        Self {
            style: Some(style),
            ..Self::default()
        }
    }

    pub fn underline(underline: bool) -> Self {
        Self {
            underline: Some(underline),
            ..Self::default()
        }
    }

    /// Overwrite the attributes present in the patch.
    pub fn apply(&self, text: &mut TextObject) {
        if let Some(family) = &self.font_family {
            text.font_family = family.clone();
        }
        if let Some(size) = self.font_size {
            text.font_size = size;
        }
        if let Some(fill) = self.fill {
            text.fill = fill;
        }
        if let Some(weight) = self.weight {
            text.weight = weight;
        }
        if let Some(style) = self.style {
            text.style = style;
        }
        if let Some(underline) = self.underline {
            text.underline = underline;
        }
    }
}

/// The capabilities the editor needs from a retained-mode canvas.
///
/// Every method on a disposed engine either returns
/// [`EngineError::Disposed`] or does nothing.
pub trait CanvasEngine {
    /// Surface dimensions.
    fn surface(&self) -> Surface;

    /// Release all resources. The engine is unusable afterwards.
    fn dispose(&mut self);

    /// Whether [`dispose`](Self::dispose) has been called.
    fn is_disposed(&self) -> bool;

    /// Clear the scene and install `image` as a non-selectable background
    /// stretched over the surface.
    fn load_background(&mut self, image: DecodedImage) -> EngineResult<ObjectId>;

    /// Add a text object at `position` on top of the scene.
    fn add_text(&mut self, content: &str, position: Point, attrs: &TextAttrs) -> EngineResult<ObjectId>;

    /// Currently selected object, if any.
    fn active_object(&self) -> Option<ObjectRef>;

    /// Select an object, or clear the selection with `None`.
    fn select(&mut self, id: Option<ObjectId>) -> EngineResult<()>;

    /// Apply `patch` to a text object.
    fn mutate_text(&mut self, id: ObjectId, patch: &TextPatch) -> EngineResult<()>;

    /// All objects, back to front.
    fn objects(&self) -> &[SceneObject];

    /// Register a font for text rendering and measurement.
    fn register_font(&mut self, family: &str, data: Vec<u8>) -> EngineResult<()>;

    /// Redraw the display frame.
    fn render(&mut self);

    /// Last frame produced by [`render`](Self::render).
    fn frame(&self) -> Option<&Frame>;

    /// Serialize the whole scene.
    fn serialize(&self) -> EngineResult<CanvasState>;

    /// Replace the scene with a serialized one. Clears the selection.
    fn restore(&mut self, state: &CanvasState) -> EngineResult<()>;

    /// Encode the scene (without selection chrome) at 1x surface scale.
    fn export_raster(&mut self, format: RasterFormat) -> EngineResult<Vec<u8>>;

    /// Primary pointer pressed: select the topmost selectable object under
    /// `point` (or clear the selection) and start dragging it.
    fn pointer_down(&mut self, point: Point) -> Option<ObjectId>;

    /// Pointer moved: drag the grabbed object, if any. Returns whether
    /// anything moved.
    fn pointer_move(&mut self, point: Point) -> bool;

    /// Pointer released: end any drag.
    fn pointer_up(&mut self);

    /// Look up a text object.
    fn text(&self, id: ObjectId) -> Option<&TextObject> {
        self.objects()
            .iter()
            .find(|obj| obj.id() == id)
            .and_then(SceneObject::as_text)
    }

    /// Number of objects in the scene.
    fn object_count(&self) -> usize {
        self.objects().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_patch_only_touches_present_fields() {
        let mut text = TextObject::new(Point::ZERO, "Hello".to_string());
        let before = text.clone();
        TextPatch::weight(FontWeight::Bold).apply(&mut text);
        assert_eq!(text.weight, FontWeight::Bold);
        assert_eq!(text.font_family, before.font_family);
        assert_eq!(text.font_size, before.font_size);
        assert_eq!(text.style, before.style);
    }

    #[test]
    fn test_attrs_instantiate() {
        let attrs = TextAttrs {
            font_family: "Georgia".to_string(),
            font_size: 32.0,
            underline: true,
            ..TextAttrs::default()
        };
        let text = attrs.instantiate(Point::new(1.0, 2.0), "Caption");
        assert_eq!(text.font_family, "Georgia");
        assert_eq!(text.font_size, 32.0);
        assert!(text.underline);
        assert_eq!(text.position, Point::new(1.0, 2.0));
    }

    #[test]
    fn test_canvas_state_debug_hides_contents() {
        let state = CanvasState::new("{\"secret\":true}".to_string());
        assert_eq!(format!("{state:?}"), "CanvasState(15 bytes)");
    }
}
