//! Editor controller: owns the engine and the undo history and turns UI
//! events into edit operations.
//!
//! All operations are silent no-ops until an engine has been mounted.
//! Asynchronous work (engine initialization, image decode) is tied to the
//! generation it started in; results arriving after an unmount are dropped.

use crate::config::EditorConfig;
use crate::decode::{DecodeError, DecodedImage, ImageFile, decode_image};
use crate::engine::{CanvasEngine, FontBook, RasterFormat, SceneEngine};
use crate::history::SnapshotStore;
use crate::operations::{EditContext, EditOp, StyleToggle, apply, parse_color, parse_font_size};
use crate::shapes::ObjectId;
use kurbo::Point;

/// Proof that a mount was started in a particular generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use]
pub struct MountTicket {
    generation: u64,
}

/// Proof that an image load was started in a particular generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use]
pub struct LoadTicket {
    generation: u64,
}

/// Mouse button of a pointer event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerButton {
    Primary,
    Middle,
    Secondary,
    Other(i16),
}

impl PointerButton {
    /// Map a DOM `MouseEvent.button` value.
    pub fn from_dom_button(button: i16) -> Self {
        match button {
            0 => PointerButton::Primary,
            1 => PointerButton::Middle,
            2 => PointerButton::Secondary,
            other => PointerButton::Other(other),
        }
    }
}

/// An encoded export ready to be offered as a download.
#[derive(Debug, Clone)]
pub struct RasterExport {
    pub file_name: String,
    pub mime_type: &'static str,
    pub bytes: Vec<u8>,
}

/// Single owner of the canvas engine and its undo history.
pub struct EditorController {
    config: EditorConfig,
    engine: Option<Box<dyn CanvasEngine>>,
    history: SnapshotStore,
    generation: u64,
}

impl Default for EditorController {
    fn default() -> Self {
        Self::new(EditorConfig::default())
    }
}

impl EditorController {
    pub fn new(config: EditorConfig) -> Self {
        Self {
            config,
            engine: None,
            history: SnapshotStore::new(),
            generation: 0,
        }
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn is_mounted(&self) -> bool {
        self.engine.is_some()
    }

    /// Read access to the mounted engine.
    pub fn engine(&self) -> Option<&dyn CanvasEngine> {
        self.engine.as_deref()
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    // --- Lifecycle ---

    /// Start mounting. Pass the ticket to [`complete_mount`](Self::complete_mount)
    /// once the engine is initialized.
    pub fn begin_mount(&self) -> MountTicket {
        MountTicket {
            generation: self.generation,
        }
    }

    /// Install an initialized engine.
    ///
    /// The engine is disposed and rejected if the controller was unmounted
    /// since `ticket` was issued or already has an engine.
    pub fn complete_mount(&mut self, ticket: MountTicket, mut engine: Box<dyn CanvasEngine>) -> bool {
        if ticket.generation != self.generation {
            log::warn!("Dropping engine initialized after unmount");
            engine.dispose();
            return false;
        }
        if self.engine.is_some() {
            log::warn!("Dropping engine for an already mounted editor");
            engine.dispose();
            return false;
        }
        engine.render();
        self.engine = Some(engine);
        log::info!("Editor mounted");
        true
    }

    /// Initialize the bundled [`SceneEngine`] and mount it.
    pub async fn mount(&mut self, fonts: FontBook) -> bool {
        let ticket = self.begin_mount();
        match SceneEngine::initialize(self.config.surface, fonts).await {
            Ok(engine) => {
                let engine = engine.with_selection_color(self.config.selection_color());
                self.complete_mount(ticket, Box::new(engine))
            }
            Err(err) => {
                log::warn!("Engine initialization failed: {}", err);
                false
            }
        }
    }

    /// Dispose the engine and forget the history. Invalidates outstanding tickets.
    pub fn unmount(&mut self) {
        self.generation += 1;
        self.history.clear();
        if let Some(mut engine) = self.engine.take() {
            engine.dispose();
            log::info!("Editor unmounted");
        }
    }

    fn run(&mut self, op: EditOp) -> bool {
        let Some(engine) = self.engine.as_deref_mut() else {
            log::debug!("Skipped {}: no engine", op.name());
            return false;
        };
        let mut ctx = EditContext::new(engine, &mut self.history);
        apply(&mut ctx, op)
    }

    // --- Image loading ---

    /// Start an image load. `None` when there is no engine to load into.
    pub fn begin_image_load(&self) -> Option<LoadTicket> {
        if self.engine.is_none() {
            log::debug!("Skipped load image: no engine");
            return None;
        }
        Some(LoadTicket {
            generation: self.generation,
        })
    }

    /// Finish an image load with the decode result.
    ///
    /// Stale tickets and decode failures are dropped.
    pub fn finish_image_load(&mut self, ticket: LoadTicket, result: Result<DecodedImage, DecodeError>) -> bool {
        if ticket.generation != self.generation {
            log::warn!("Dropping image decoded after unmount");
            return false;
        }
        match result {
            Ok(image) => self.run(EditOp::LoadImage(image)),
            Err(err) => {
                log::warn!("Image decode failed: {}", err);
                false
            }
        }
    }

    /// Decode `file` and install it as the background.
    pub async fn load_image(&mut self, file: Option<ImageFile>) -> bool {
        let Some(file) = file else {
            log::debug!("Skipped load image: no file");
            return false;
        };
        let Some(ticket) = self.begin_image_load() else {
            return false;
        };
        let result = decode_image(file).await;
        self.finish_image_load(ticket, result)
    }

    // --- Text panel ---

    /// Add text at the configured origin and select it.
    ///
    /// `size` is parsed leniently (see [`parse_font_size`]); an unparseable
    /// `color` falls back to the configured default.
    pub fn add_text(&mut self, content: &str, font: &str, size: &str, color: &str) -> bool {
        let mut attrs = self.config.default_text_attrs();
        attrs.font_family = font.to_string();
        attrs.font_size = parse_font_size(size);
        attrs.fill = parse_color(color, self.config.default_color());
        self.run(EditOp::AddText {
            content: content.to_string(),
            position: self.config.text.origin,
            attrs,
        })
    }

    /// Add text with the configured default styling.
    pub fn add_default_text(&mut self, content: &str) -> bool {
        self.run(EditOp::AddText {
            content: content.to_string(),
            position: self.config.text.origin,
            attrs: self.config.default_text_attrs(),
        })
    }

    pub fn toggle_style(&mut self, toggle: StyleToggle) -> bool {
        self.run(EditOp::ToggleStyle(toggle))
    }

    pub fn change_font(&mut self, family: &str) -> bool {
        self.run(EditOp::ChangeFont(family.to_string()))
    }

    pub fn change_size(&mut self, size: &str) -> bool {
        self.run(EditOp::ChangeSize(parse_font_size(size)))
    }

    pub fn change_color(&mut self, color: &str) -> bool {
        let color = parse_color(color, self.config.default_color());
        self.run(EditOp::ChangeColor(color))
    }

    // --- History ---

    pub fn undo(&mut self) -> bool {
        self.run(EditOp::Undo)
    }

    pub fn redo(&mut self) -> bool {
        self.run(EditOp::Redo)
    }

    // --- Fonts ---

    /// Make a font available for rendering. Not an edit; nothing is recorded.
    pub fn register_font(&mut self, family: &str, data: Vec<u8>) -> bool {
        let Some(engine) = self.engine.as_deref_mut() else {
            log::debug!("Skipped register font: no engine");
            return false;
        };
        match engine.register_font(family, data) {
            Ok(()) => {
                engine.render();
                true
            }
            Err(err) => {
                log::warn!("Font registration failed: {}", err);
                false
            }
        }
    }

    // --- Pointer ---

    /// Pointer pressed on the surface.
    ///
    /// Every primary press records an undo step before the engine sees it,
    /// so a drag that follows can be undone on its own.
    pub fn pointer_down(&mut self, button: PointerButton, point: Point) -> Option<ObjectId> {
        if button != PointerButton::Primary || self.engine.is_none() {
            return None;
        }
        self.run(EditOp::Capture);
        let engine = self.engine.as_deref_mut()?;
        let hit = engine.pointer_down(point);
        engine.render();
        hit
    }

    pub fn pointer_move(&mut self, point: Point) -> bool {
        let Some(engine) = self.engine.as_deref_mut() else {
            return false;
        };
        let moved = engine.pointer_move(point);
        if moved {
            engine.render();
        }
        moved
    }

    pub fn pointer_up(&mut self) {
        if let Some(engine) = self.engine.as_deref_mut() {
            engine.pointer_up();
        }
    }

    // --- Export ---

    /// Encode the canvas as a PNG named after the configured export file name.
    pub fn export_png(&mut self) -> Option<RasterExport> {
        let Some(engine) = self.engine.as_deref_mut() else {
            log::debug!("Skipped export: no engine");
            return None;
        };
        let format = RasterFormat::Png;
        match engine.export_raster(format) {
            Ok(bytes) => Some(RasterExport {
                file_name: self.config.export_file_name.clone(),
                mime_type: format.mime_type(),
                bytes,
            }),
            Err(err) => {
                log::warn!("Export failed: {}", err);
                None
            }
        }
    }
}
