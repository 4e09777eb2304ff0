//! `ImageEditor`: the JavaScript-facing editor widget.

use crate::coords::surface_point;
use crate::dom;
use captionink_core::{
    EditorConfig, EditorController, FontBook, PointerButton, SceneEngine, StyleToggle, decode_image,
};
use kurbo::Point;
use std::cell::RefCell;
use std::rc::{Rc, Weak};
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement, MouseEvent};

type PointerClosure = Closure<dyn FnMut(MouseEvent)>;

/// State shared between the editor object, pointer listeners and pending futures.
struct Shared {
    controller: RefCell<EditorController>,
    canvas: HtmlCanvasElement,
    context: CanvasRenderingContext2d,
    listeners: RefCell<Vec<(&'static str, PointerClosure)>>,
}

impl Shared {
    /// Copy the engine's latest frame to the canvas.
    fn present(&self) {
        let controller = self.controller.borrow();
        let Some(frame) = controller.engine().and_then(|engine| engine.frame()) else {
            return;
        };
        if let Err(err) = dom::blit(&self.context, frame) {
            log::warn!("Failed to draw frame: {:?}", err);
        }
    }

    fn clear(&self) {
        let surface = self.controller.borrow().config().surface;
        self.context
            .clear_rect(0.0, 0.0, surface.width as f64, surface.height as f64);
    }

    /// Map a mouse event to surface coordinates.
    fn event_point(&self, event: &MouseEvent) -> Point {
        let surface = self.controller.borrow().config().surface;
        surface_point(
            Point::new(event.offset_x() as f64, event.offset_y() as f64),
            self.canvas.client_width() as f64,
            self.canvas.client_height() as f64,
            surface,
        )
    }

    fn attach_listeners(self: &Rc<Self>) -> Result<(), JsValue> {
        let weak = Rc::downgrade(self);
        self.listen("mousedown", weak.clone(), |shared, event| {
            let button = PointerButton::from_dom_button(event.button());
            let point = shared.event_point(&event);
            shared.controller.borrow_mut().pointer_down(button, point);
            shared.present();
        })?;
        self.listen("mousemove", weak.clone(), |shared, event| {
            let point = shared.event_point(&event);
            let moved = shared.controller.borrow_mut().pointer_move(point);
            if moved {
                shared.present();
            }
        })?;
        for event in ["mouseup", "mouseleave"] {
            self.listen(event, weak.clone(), |shared, _event| {
                shared.controller.borrow_mut().pointer_up();
            })?;
        }
        Ok(())
    }

    fn listen(
        &self,
        event: &'static str,
        weak: Weak<Self>,
        handler: impl Fn(&Shared, MouseEvent) + 'static,
    ) -> Result<(), JsValue> {
        let closure = Closure::wrap(Box::new(move |event: MouseEvent| {
            if let Some(shared) = weak.upgrade() {
                handler(&shared, event);
            }
        }) as Box<dyn FnMut(MouseEvent)>);
        self.canvas
            .add_event_listener_with_callback(event, closure.as_ref().unchecked_ref())?;
        self.listeners.borrow_mut().push((event, closure));
        Ok(())
    }

    fn detach_listeners(&self) {
        for (event, closure) in self.listeners.borrow_mut().drain(..) {
            self.canvas
                .remove_event_listener_with_callback(event, closure.as_ref().unchecked_ref())
                .ok();
        }
    }

    fn unmount(&self) {
        self.detach_listeners();
        self.controller.borrow_mut().unmount();
        self.clear();
    }

    /// Run a controller edit and redraw.
    fn edit(&self, f: impl FnOnce(&mut EditorController) -> bool) -> bool {
        let applied = f(&mut self.controller.borrow_mut());
        if applied {
            self.present();
        }
        applied
    }
}

async fn mount(shared: Rc<Shared>) -> bool {
    let (ticket, surface, selection_color) = {
        let controller = shared.controller.borrow();
        (
            controller.begin_mount(),
            controller.config().surface,
            controller.config().selection_color(),
        )
    };
    let engine = match SceneEngine::initialize(surface, FontBook::new()).await {
        Ok(engine) => engine.with_selection_color(selection_color),
        Err(err) => {
            log::warn!("Engine initialization failed: {}", err);
            return false;
        }
    };
    let mounted = shared
        .controller
        .borrow_mut()
        .complete_mount(ticket, Box::new(engine));
    if !mounted {
        return false;
    }
    if let Err(err) = shared.attach_listeners() {
        log::warn!("Failed to attach pointer listeners: {:?}", err);
    }
    shared.present();
    true
}

async fn load_file(shared: Rc<Shared>, file: web_sys::File) -> bool {
    let Some(ticket) = shared.controller.borrow().begin_image_load() else {
        return false;
    };
    let image_file = match dom::read_file(&file).await {
        Ok(image_file) => image_file,
        Err(err) => {
            log::warn!("Failed to read {}: {:?}", file.name(), err);
            return false;
        }
    };
    let result = decode_image(image_file).await;
    shared.edit(|controller| controller.finish_image_load(ticket, result))
}

/// Image editor bound to a `<canvas>` element.
#[wasm_bindgen]
pub struct ImageEditor {
    shared: Rc<Shared>,
}

#[wasm_bindgen]
impl ImageEditor {
    /// Create an editor for `canvas`. `config_json` overrides defaults.
    #[wasm_bindgen(constructor)]
    pub fn new(canvas: HtmlCanvasElement, config_json: Option<String>) -> Result<ImageEditor, JsValue> {
        let config = match config_json {
            Some(json) => EditorConfig::from_json(&json).map_err(|e| JsValue::from_str(&e.to_string()))?,
            None => EditorConfig::default(),
        };
        canvas.set_width(config.surface.width);
        canvas.set_height(config.surface.height);
        let context = canvas
            .get_context("2d")?
            .ok_or_else(|| JsValue::from_str("2d context unavailable"))?
            .dyn_into::<CanvasRenderingContext2d>()?;

        Ok(ImageEditor {
            shared: Rc::new(Shared {
                controller: RefCell::new(EditorController::new(config)),
                canvas,
                context,
                listeners: RefCell::new(Vec::new()),
            }),
        })
    }

    /// Initialize the canvas engine. Resolves to whether the editor mounted.
    pub fn mount(&self) -> js_sys::Promise {
        let shared = Rc::clone(&self.shared);
        wasm_bindgen_futures::future_to_promise(async move { Ok(JsValue::from_bool(mount(shared).await)) })
    }

    /// Dispose the engine. Pending loads are dropped.
    pub fn unmount(&self) {
        self.shared.unmount();
    }

    #[wasm_bindgen(js_name = isMounted)]
    pub fn is_mounted(&self) -> bool {
        self.shared.controller.borrow().is_mounted()
    }

    /// Ask the user for an image and load it as the background.
    #[wasm_bindgen(js_name = openFilePicker)]
    pub fn open_file_picker(&self) -> Result<(), JsValue> {
        let shared = Rc::clone(&self.shared);
        dom::open_file_picker("image/*", move |file| {
            wasm_bindgen_futures::spawn_local(async move {
                load_file(shared, file).await;
            });
        })
    }

    /// Load `file` as the background. Resolves to whether it was applied.
    #[wasm_bindgen(js_name = loadFile)]
    pub fn load_file(&self, file: web_sys::File) -> js_sys::Promise {
        let shared = Rc::clone(&self.shared);
        wasm_bindgen_futures::future_to_promise(async move { Ok(JsValue::from_bool(load_file(shared, file).await)) })
    }

    /// Register a TrueType/OpenType font for `family`.
    #[wasm_bindgen(js_name = registerFont)]
    pub fn register_font(&self, family: &str, bytes: Vec<u8>) -> bool {
        self.shared.edit(|controller| controller.register_font(family, bytes))
    }

    #[wasm_bindgen(js_name = addText)]
    pub fn add_text(&self, content: &str, font: &str, size: &str, color: &str) -> bool {
        self.shared.edit(|controller| controller.add_text(content, font, size, color))
    }

    /// Add `content` using the configured text defaults.
    #[wasm_bindgen(js_name = addDefaultText)]
    pub fn add_default_text(&self, content: &str) -> bool {
        self.shared.edit(|controller| controller.add_default_text(content))
    }

    #[wasm_bindgen(js_name = toggleBold)]
    pub fn toggle_bold(&self) -> bool {
        self.shared.edit(|controller| controller.toggle_style(StyleToggle::Bold))
    }

    #[wasm_bindgen(js_name = toggleItalic)]
    pub fn toggle_italic(&self) -> bool {
        self.shared.edit(|controller| controller.toggle_style(StyleToggle::Italic))
    }

    #[wasm_bindgen(js_name = toggleUnderline)]
    pub fn toggle_underline(&self) -> bool {
        self.shared.edit(|controller| controller.toggle_style(StyleToggle::Underline))
    }

    #[wasm_bindgen(js_name = setFont)]
    pub fn set_font(&self, family: &str) -> bool {
        self.shared.edit(|controller| controller.change_font(family))
    }

    #[wasm_bindgen(js_name = setFontSize)]
    pub fn set_font_size(&self, size: &str) -> bool {
        self.shared.edit(|controller| controller.change_size(size))
    }

    #[wasm_bindgen(js_name = setColor)]
    pub fn set_color(&self, color: &str) -> bool {
        self.shared.edit(|controller| controller.change_color(color))
    }

    pub fn undo(&self) -> bool {
        self.shared.edit(EditorController::undo)
    }

    pub fn redo(&self) -> bool {
        self.shared.edit(EditorController::redo)
    }

    #[wasm_bindgen(js_name = canUndo)]
    pub fn can_undo(&self) -> bool {
        self.shared.controller.borrow().can_undo()
    }

    #[wasm_bindgen(js_name = canRedo)]
    pub fn can_redo(&self) -> bool {
        self.shared.controller.borrow().can_redo()
    }

    #[wasm_bindgen(js_name = historyLength)]
    pub fn history_length(&self) -> usize {
        self.shared.controller.borrow().history_len()
    }

    /// Download the canvas as a PNG.
    #[wasm_bindgen(js_name = exportPng)]
    pub fn export_png(&self) -> bool {
        let Some(export) = self.shared.controller.borrow_mut().export_png() else {
            return false;
        };
        match dom::download_binary_file(&export.file_name, &export.bytes, export.mime_type) {
            Ok(()) => {
                log::info!("Exported {} ({} bytes)", export.file_name, export.bytes.len());
                true
            }
            Err(err) => {
                log::warn!("Download failed: {:?}", err);
                false
            }
        }
    }
}

impl Drop for ImageEditor {
    fn drop(&mut self) {
        self.shared.unmount();
    }
}
