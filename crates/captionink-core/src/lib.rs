//! CaptionInk Core Library
//!
//! Platform-agnostic editor logic for the CaptionInk image editor: a scene of
//! one background image plus styled text, a CPU canvas engine, snapshot-based
//! undo and PNG export.

pub mod config;
pub mod controller;
pub mod decode;
pub mod engine;
pub mod history;
pub mod operations;
pub mod scene;
pub mod shapes;

pub use config::{ConfigError, EditorConfig, TextDefaults};
pub use controller::{EditorController, LoadTicket, MountTicket, PointerButton, RasterExport};
pub use decode::{DecodeError, DecodedImage, ImageFile, decode_image};
pub use engine::{CanvasEngine, CanvasState, EngineError, FontBook, SceneEngine, Surface};
pub use history::SnapshotStore;
pub use operations::{EditContext, EditOp, StyleToggle, parse_font_size};
pub use scene::SceneDocument;
pub use shapes::{ObjectId, SceneObject, SerializableColor};
