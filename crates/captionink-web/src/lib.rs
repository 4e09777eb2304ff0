//! CaptionInk browser shell.
//!
//! Exposes [`ImageEditor`] to JavaScript. Everything except coordinate
//! mapping only builds for `wasm32`.

pub mod coords;

#[cfg(target_arch = "wasm32")]
mod dom;
#[cfg(target_arch = "wasm32")]
mod editor;

#[cfg(target_arch = "wasm32")]
pub use editor::ImageEditor;

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

/// Install the panic hook and console logger when the module loads.
#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub fn start() {
    console_error_panic_hook::set_once();

    // A second init (module reloaded into the same page) is harmless.
    let _ = console_log::init_with_level(log::Level::Info);

    log::info!("CaptionInk (WASM) loaded");
}
