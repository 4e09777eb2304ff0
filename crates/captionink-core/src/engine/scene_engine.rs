//! Bundled engine: a scene document rasterized on the CPU.

use super::raster::{ImageCache, SelectionOverlay, rasterize};
use super::{
    CanvasEngine, CanvasState, EngineError, EngineResult, FontBook, Frame, ObjectRef,
    RasterFormat, Surface, TextAttrs, TextPatch, encode_png,
};
use crate::decode::{DecodedImage, decode_bytes};
use crate::scene::SceneDocument;
use crate::shapes::{BackgroundImage, ObjectId, SceneObject, SerializableColor, TextObject};
use kurbo::{Point, Rect};

/// Default selection highlight (blue).
const SELECTION_COLOR: SerializableColor = SerializableColor {
    r: 59,
    g: 130,
    b: 246,
    a: 255,
};

/// An object being dragged by the pointer.
#[derive(Debug, Clone, Copy)]
struct Drag {
    id: ObjectId,
    last: Point,
}

/// Retained-mode canvas holding one background image and any number of text objects.
#[derive(Debug)]
pub struct SceneEngine {
    surface: Surface,
    document: SceneDocument,
    fonts: FontBook,
    images: ImageCache,
    active: Option<ObjectId>,
    drag: Option<Drag>,
    frame: Option<Frame>,
    selection_color: SerializableColor,
    disposed: bool,
}

impl SceneEngine {
    /// Create an engine for `surface`.
    pub fn new(surface: Surface, fonts: FontBook) -> EngineResult<Self> {
        if surface.width == 0 || surface.height == 0 {
            return Err(EngineError::InvalidSurface {
                width: surface.width,
                height: surface.height,
            });
        }
        log::info!("Canvas engine initialized ({}x{})", surface.width, surface.height);
        Ok(Self {
            surface,
            document: SceneDocument::new(surface.width, surface.height),
            fonts,
            images: ImageCache::default(),
            active: None,
            drag: None,
            frame: None,
            selection_color: SELECTION_COLOR,
            disposed: false,
        })
    }

    /// Asynchronous initialization entry point used by the editor shells.
    pub async fn initialize(surface: Surface, fonts: FontBook) -> EngineResult<Self> {
        Self::new(surface, fonts)
    }

    /// Set the selection highlight color.
    pub fn with_selection_color(mut self, color: SerializableColor) -> Self {
        self.selection_color = color;
        self
    }

    fn ensure_live(&self) -> EngineResult<()> {
        if self.disposed {
            Err(EngineError::Disposed)
        } else {
            Ok(())
        }
    }

    fn text_bounds(&self, text: &TextObject) -> Rect {
        let size = self
            .fonts
            .measure(text)
            .unwrap_or_else(|| text.approximate_size());
        text.bounds_for_size(size)
    }

    /// Bounds of an object, measured with real font metrics where possible.
    pub fn bounds_of(&self, object: &SceneObject) -> Rect {
        match object {
            SceneObject::Text(text) => self.text_bounds(text),
            SceneObject::Image(image) => image.as_rect(),
        }
    }

    /// Topmost selectable object containing `point`.
    fn hit_test(&self, point: Point) -> Option<ObjectId> {
        self.document
            .objects
            .iter()
            .rev()
            .filter(|obj| obj.is_selectable())
            .find(|obj| self.bounds_of(obj).contains(point))
            .map(SceneObject::id)
    }

    fn selection_overlay(&self) -> Option<SelectionOverlay> {
        let object = self.document.get(self.active?)?;
        Some(SelectionOverlay {
            bounds: self.bounds_of(object),
            color: self.selection_color,
        })
    }

    /// Make sure every image in `document` has decoded pixels.
    fn cache_images(&mut self, document: &SceneDocument) -> EngineResult<()> {
        for image in document.objects.iter().filter_map(SceneObject::as_image) {
            if self.images.contains(image.id()) {
                continue;
            }
            let bytes = image
                .data()
                .ok_or_else(|| EngineError::Image("invalid base64 image data".to_string()))?;
            let decoded = decode_bytes(image.format, bytes).map_err(|e| EngineError::Image(e.to_string()))?;
            self.images.insert(image.id(), decoded.pixels);
        }
        Ok(())
    }
}

impl CanvasEngine for SceneEngine {
    fn surface(&self) -> Surface {
        self.surface
    }

    fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.disposed = true;
        self.document.clear();
        self.images.clear();
        self.frame = None;
        self.active = None;
        self.drag = None;
        log::info!("Canvas engine disposed");
    }

    fn is_disposed(&self) -> bool {
        self.disposed
    }

    fn load_background(&mut self, image: DecodedImage) -> EngineResult<ObjectId> {
        self.ensure_live()?;
        let background = BackgroundImage::new(&image.encoded, image.width(), image.height(), image.format)
            .fill(self.surface.width as f64, self.surface.height as f64);
        let id = background.id();
        self.images.insert(id, image.pixels);
        self.images.retain(&[id]);
        self.document.clear();
        self.document.push(SceneObject::Image(background));
        self.active = None;
        self.drag = None;
        Ok(id)
    }

    fn add_text(&mut self, content: &str, position: Point, attrs: &TextAttrs) -> EngineResult<ObjectId> {
        self.ensure_live()?;
        let text = attrs.instantiate(position, content);
        let id = text.id();
        self.document.push(SceneObject::Text(text));
        Ok(id)
    }

    fn active_object(&self) -> Option<ObjectRef> {
        let object = self.document.get(self.active?)?;
        Some(ObjectRef {
            id: object.id(),
            kind: object.kind(),
        })
    }

    fn select(&mut self, id: Option<ObjectId>) -> EngineResult<()> {
        self.ensure_live()?;
        if let Some(id) = id {
            if self.document.get(id).is_none() {
                return Err(EngineError::ObjectNotFound(id));
            }
        }
        self.active = id;
        Ok(())
    }

    fn mutate_text(&mut self, id: ObjectId, patch: &TextPatch) -> EngineResult<()> {
        self.ensure_live()?;
        let object = self
            .document
            .get_mut(id)
            .ok_or(EngineError::ObjectNotFound(id))?;
        let text = object.as_text_mut().ok_or(EngineError::NotText(id))?;
        patch.apply(text);
        Ok(())
    }

    fn objects(&self) -> &[SceneObject] {
        &self.document.objects
    }

    fn register_font(&mut self, family: &str, data: Vec<u8>) -> EngineResult<()> {
        self.ensure_live()?;
        self.fonts.register(family, data)?;
        Ok(())
    }

    fn render(&mut self) {
        if self.disposed {
            return;
        }
        let overlay = self.selection_overlay();
        self.frame = Some(rasterize(&self.document, &mut self.images, &self.fonts, overlay));
    }

    fn frame(&self) -> Option<&Frame> {
        self.frame.as_ref()
    }

    fn serialize(&self) -> EngineResult<CanvasState> {
        self.ensure_live()?;
        Ok(CanvasState::new(self.document.to_json()?))
    }

    fn restore(&mut self, state: &CanvasState) -> EngineResult<()> {
        self.ensure_live()?;
        let mut document = SceneDocument::from_json(state.as_str())?;
        self.cache_images(&document)?;
        document.width = self.surface.width;
        document.height = self.surface.height;
        self.document = document;
        let live: Vec<ObjectId> = self
            .document
            .objects
            .iter()
            .filter_map(SceneObject::as_image)
            .map(BackgroundImage::id)
            .collect();
        self.images.retain(&live);
        self.active = None;
        self.drag = None;
        Ok(())
    }

    fn export_raster(&mut self, format: RasterFormat) -> EngineResult<Vec<u8>> {
        self.ensure_live()?;
        match format {
            RasterFormat::Png => {
                let frame = rasterize(&self.document, &mut self.images, &self.fonts, None);
                Ok(encode_png(&frame)?)
            }
        }
    }

    fn pointer_down(&mut self, point: Point) -> Option<ObjectId> {
        if self.disposed {
            return None;
        }
        let hit = self.hit_test(point);
        self.active = hit;
        self.drag = hit.map(|id| Drag { id, last: point });
        hit
    }

    fn pointer_move(&mut self, point: Point) -> bool {
        let Some(drag) = self.drag.as_mut() else {
            return false;
        };
        let delta = point - drag.last;
        drag.last = point;
        match self.document.get_mut(drag.id) {
            Some(object) => {
                object.translate(delta);
                true
            }
            None => false,
        }
    }

    fn pointer_up(&mut self) {
        self.drag = None;
    }
}

#[cfg(test)]
mod tests {
    use super::super::fonts::test_support::mono_book;
    use super::*;
    use crate::decode::test_support::solid_png;
    use crate::shapes::{FontWeight, ImageFormat, ObjectKind};

    fn engine() -> SceneEngine {
        SceneEngine::new(Surface::new(40, 30), FontBook::new()).unwrap()
    }

    fn decoded(width: u32, height: u32, rgba: [u8; 4]) -> DecodedImage {
        decode_bytes(ImageFormat::Png, solid_png(width, height, rgba)).unwrap()
    }

    #[test]
    fn test_zero_surface_rejected() {
        let result = SceneEngine::new(Surface::new(0, 10), FontBook::new());
        assert!(matches!(result, Err(EngineError::InvalidSurface { .. })));
    }

    #[test]
    fn test_initialize_is_async() {
        let engine = pollster::block_on(SceneEngine::initialize(Surface::default(), FontBook::new())).unwrap();
        assert_eq!(engine.surface(), Surface::new(800, 600));
        assert_eq!(engine.object_count(), 0);
    }

    #[test]
    fn test_add_and_select_text() {
        let mut engine = engine();
        let id = engine.add_text("Hello", Point::new(5.0, 5.0), &TextAttrs::default()).unwrap();
        assert!(engine.active_object().is_none());

        engine.select(Some(id)).unwrap();
        let active = engine.active_object().unwrap();
        assert_eq!(active.id, id);
        assert_eq!(active.kind, ObjectKind::Text);
        assert_eq!(engine.text(id).unwrap().content, "Hello");
    }

    #[test]
    fn test_select_unknown_object() {
        let mut engine = engine();
        let result = engine.select(Some(uuid::Uuid::new_v4()));
        assert!(matches!(result, Err(EngineError::ObjectNotFound(_))));
    }

    #[test]
    fn test_background_replaces_scene() {
        let mut engine = engine();
        engine.add_text("one", Point::ZERO, &TextAttrs::default()).unwrap();
        engine.add_text("two", Point::ZERO, &TextAttrs::default()).unwrap();

        let first = engine.load_background(decoded(4, 4, [255, 0, 0, 255])).unwrap();
        assert_eq!(engine.object_count(), 1);
        let second = engine.load_background(decoded(2, 2, [0, 0, 255, 255])).unwrap();
        assert_eq!(engine.object_count(), 1);
        assert_ne!(first, second);

        let image = engine.objects()[0].as_image().unwrap();
        assert!(!image.selectable);
        assert!((image.width() - 40.0).abs() < 1e-9);
        assert!((image.height() - 30.0).abs() < 1e-9);
    }

    #[test]
    fn test_replaced_backgrounds_leave_the_cache() {
        let mut engine = engine();
        engine.load_background(decoded(4, 4, [255, 0, 0, 255])).unwrap();
        let red = engine.serialize().unwrap();
        engine.load_background(decoded(4, 4, [0, 0, 255, 255])).unwrap();
        engine.load_background(decoded(4, 4, [0, 255, 0, 255])).unwrap();
        assert_eq!(engine.images.len(), 1);

        engine.restore(&red).unwrap();
        assert_eq!(engine.images.len(), 1);
        let png = engine.export_raster(RasterFormat::Png).unwrap();
        let exported = image::load_from_memory(&png).unwrap().to_rgba8();
        assert_eq!(exported.get_pixel(20, 15).0, [255, 0, 0, 255]);
    }

    #[test]
    fn test_restore_without_images_empties_cache() {
        let mut engine = engine();
        let empty = engine.serialize().unwrap();
        engine.load_background(decoded(2, 2, [0, 0, 0, 255])).unwrap();
        engine.restore(&empty).unwrap();
        assert_eq!(engine.images.len(), 0);
    }

    #[test]
    fn test_mutate_background_is_not_text() {
        let mut engine = engine();
        let id = engine.load_background(decoded(2, 2, [0, 0, 0, 255])).unwrap();
        let result = engine.mutate_text(id, &TextPatch::weight(FontWeight::Bold));
        assert!(matches!(result, Err(EngineError::NotText(_))));
    }

    #[test]
    fn test_serialize_restore_roundtrip() {
        let mut engine = engine();
        engine.load_background(decoded(2, 2, [0, 255, 0, 255])).unwrap();
        let id = engine.add_text("Caption", Point::new(3.0, 4.0), &TextAttrs::default()).unwrap();
        let state = engine.serialize().unwrap();

        engine.mutate_text(id, &TextPatch::underline(true)).unwrap();
        engine.select(Some(id)).unwrap();
        engine.restore(&state).unwrap();

        assert!(!engine.text(id).unwrap().underline);
        assert!(engine.active_object().is_none());
        assert_eq!(engine.serialize().unwrap(), state);
    }

    #[test]
    fn test_restore_decodes_uncached_images() {
        let mut source = engine();
        source.load_background(decoded(2, 2, [0, 0, 255, 255])).unwrap();
        let state = source.serialize().unwrap();

        let mut target = engine();
        target.restore(&state).unwrap();
        let png = target.export_raster(RasterFormat::Png).unwrap();
        let exported = image::load_from_memory(&png).unwrap().to_rgba8();
        assert_eq!(exported.get_pixel(20, 15).0, [0, 0, 255, 255]);
    }

    #[test]
    fn test_restore_rejects_garbage() {
        let mut engine = engine();
        let result = engine.restore(&CanvasState::new("not json".to_string()));
        assert!(matches!(result, Err(EngineError::Serialization(_))));
    }

    #[test]
    fn test_pointer_selects_and_drags_text() {
        let mut engine = engine();
        engine.load_background(decoded(2, 2, [255, 255, 255, 255])).unwrap();
        let id = engine.add_text("Hi", Point::new(5.0, 5.0), &TextAttrs::default()).unwrap();

        assert_eq!(engine.pointer_down(Point::new(10.0, 10.0)), Some(id));
        assert!(engine.pointer_move(Point::new(13.0, 14.0)));
        engine.pointer_up();
        assert!(!engine.pointer_move(Point::new(30.0, 30.0)));

        assert_eq!(engine.text(id).unwrap().position, Point::new(8.0, 9.0));
        assert_eq!(engine.active_object().map(|o| o.id), Some(id));
    }

    #[test]
    fn test_hit_test_uses_measured_width() {
        let attrs = TextAttrs {
            font_family: "Mono".to_string(),
            ..TextAttrs::default()
        };
        let click = Point::new(157.0, 55.0);

        let mut measured = SceneEngine::new(Surface::new(300, 200), mono_book()).unwrap();
        measured.add_text("MMMMMMMMMM", Point::new(50.0, 50.0), &attrs).unwrap();
        // 10 advances of 10.34px end at x = 153.4
        assert_eq!(measured.pointer_down(click), None);
        assert!(measured.pointer_down(Point::new(150.0, 55.0)).is_some());

        let mut approximated = SceneEngine::new(Surface::new(300, 200), FontBook::new()).unwrap();
        let id = approximated.add_text("MMMMMMMMMM", Point::new(50.0, 50.0), &attrs).unwrap();
        // 0.55 * 20 * 10 = 110px wide
        assert_eq!(approximated.pointer_down(click), Some(id));
    }

    #[test]
    fn test_pointer_on_background_clears_selection() {
        let mut engine = engine();
        engine.load_background(decoded(2, 2, [255, 255, 255, 255])).unwrap();
        let id = engine.add_text("Hi", Point::new(5.0, 5.0), &TextAttrs::default()).unwrap();
        engine.select(Some(id)).unwrap();

        assert_eq!(engine.pointer_down(Point::new(38.0, 28.0)), None);
        assert!(engine.active_object().is_none());
    }

    #[test]
    fn test_export_has_surface_size() {
        let mut engine = engine();
        engine.load_background(decoded(7, 3, [255, 0, 0, 255])).unwrap();
        let png = engine.export_raster(RasterFormat::Png).unwrap();
        let exported = image::load_from_memory(&png).unwrap();
        assert_eq!((exported.width(), exported.height()), (40, 30));
    }

    #[test]
    fn test_render_draws_selection_but_export_does_not() {
        let mut engine = engine();
        let id = engine.add_text("Hi", Point::new(10.0, 10.0), &TextAttrs::default()).unwrap();
        engine.select(Some(id)).unwrap();
        engine.render();

        let frame = engine.frame().unwrap();
        assert_eq!(frame.get_pixel(8, 8).0, [59, 130, 246, 255]);

        let png = engine.export_raster(RasterFormat::Png).unwrap();
        let exported = image::load_from_memory(&png).unwrap().to_rgba8();
        assert_eq!(exported.get_pixel(8, 8).0, [0, 0, 0, 0]);
    }

    #[test]
    fn test_disposed_engine_refuses_work() {
        let mut engine = engine();
        engine.add_text("Hi", Point::ZERO, &TextAttrs::default()).unwrap();
        engine.render();
        engine.dispose();

        assert!(engine.is_disposed());
        assert!(engine.frame().is_none());
        assert_eq!(engine.object_count(), 0);
        assert!(matches!(engine.serialize(), Err(EngineError::Disposed)));
        assert!(matches!(
            engine.add_text("late", Point::ZERO, &TextAttrs::default()),
            Err(EngineError::Disposed)
        ));
        assert_eq!(engine.pointer_down(Point::ZERO), None);
    }
}
