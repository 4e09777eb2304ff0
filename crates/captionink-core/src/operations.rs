//! Edit operations.
//!
//! Every edit runs against an explicit [`EditContext`] and follows the same
//! sequence: check guards, capture the current state, mutate, render, then
//! record the captured state as the undo target. A skipped or failed edit
//! leaves the history untouched.

use crate::decode::DecodedImage;
use crate::engine::{CanvasEngine, EngineResult, TextAttrs, TextPatch};
use crate::history::SnapshotStore;
use crate::shapes::{ObjectId, SerializableColor, TextObject};
use kurbo::Point;

/// Engine and history an operation works on.
pub struct EditContext<'a> {
    pub engine: &'a mut dyn CanvasEngine,
    pub history: &'a mut SnapshotStore,
}

impl<'a> EditContext<'a> {
    pub fn new(engine: &'a mut dyn CanvasEngine, history: &'a mut SnapshotStore) -> Self {
        Self { engine, history }
    }

    /// The selected object, if it is text.
    pub fn active_text(&self) -> Option<ObjectId> {
        self.engine
            .active_object()
            .filter(|active| active.is_text())
            .map(|active| active.id)
    }

    /// Run `edit` and push the state it started from.
    ///
    /// On failure the engine is put back into that state and nothing is pushed.
    fn record<T>(&mut self, edit: impl FnOnce(&mut dyn CanvasEngine) -> EngineResult<T>) -> EngineResult<T> {
        let before = self.engine.serialize()?;
        match edit(&mut *self.engine) {
            Ok(value) => {
                self.history.push(before);
                Ok(value)
            }
            Err(err) => {
                if let Err(restore_err) = self.engine.restore(&before) {
                    log::warn!("Could not roll back failed edit: {}", restore_err);
                }
                Err(err)
            }
        }
    }
}

/// Text style flags toggled by the style panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StyleToggle {
    Bold,
    Italic,
    Underline,
}

impl StyleToggle {
    /// Patch flipping this flag on `text`.
    pub fn patch_for(self, text: &TextObject) -> TextPatch {
        match self {
            StyleToggle::Bold => TextPatch::weight(text.weight.toggled()),
            StyleToggle::Italic => TextPatch::style(text.style.toggled()),
            StyleToggle::Underline => TextPatch::underline(!text.underline),
        }
    }
}

/// A single undoable (or history-navigating) edit.
#[derive(Debug, Clone)]
pub enum EditOp {
    /// Replace the scene with a background image.
    LoadImage(DecodedImage),
    /// Add a text object and select it.
    AddText {
        content: String,
        position: Point,
        attrs: TextAttrs,
    },
    ToggleStyle(StyleToggle),
    ChangeFont(String),
    ChangeSize(f64),
    ChangeColor(SerializableColor),
    Undo,
    Redo,
    /// Record the current state without changing it (pointer presses).
    Capture,
}

impl EditOp {
    pub fn name(&self) -> &'static str {
        match self {
            EditOp::LoadImage(_) => "load image",
            EditOp::AddText { .. } => "add text",
            EditOp::ToggleStyle(StyleToggle::Bold) => "toggle bold",
            EditOp::ToggleStyle(StyleToggle::Italic) => "toggle italic",
            EditOp::ToggleStyle(StyleToggle::Underline) => "toggle underline",
            EditOp::ChangeFont(_) => "change font",
            EditOp::ChangeSize(_) => "change size",
            EditOp::ChangeColor(_) => "change color",
            EditOp::Undo => "undo",
            EditOp::Redo => "redo",
            EditOp::Capture => "capture",
        }
    }
}

/// Apply an operation. Returns whether it took effect.
///
/// Skipped operations are logged at debug level, engine failures at warn
/// level; neither is reported to the caller.
pub fn apply(ctx: &mut EditContext<'_>, op: EditOp) -> bool {
    let name = op.name();
    match execute(ctx, op) {
        Ok(true) => {
            ctx.engine.render();
            true
        }
        Ok(false) => {
            log::debug!("Skipped {}", name);
            false
        }
        Err(err) => {
            log::warn!("{} failed: {}", name, err);
            false
        }
    }
}

fn execute(ctx: &mut EditContext<'_>, op: EditOp) -> EngineResult<bool> {
    match op {
        EditOp::LoadImage(image) => {
            ctx.record(|engine| engine.load_background(image))?;
            Ok(true)
        }
        EditOp::AddText {
            content,
            position,
            attrs,
        } => {
            ctx.record(|engine| {
                let id = engine.add_text(&content, position, &attrs)?;
                engine.select(Some(id))
            })?;
            Ok(true)
        }
        EditOp::ToggleStyle(toggle) => {
            let Some(id) = ctx.active_text() else {
                return Ok(false);
            };
            let Some(patch) = ctx.engine.text(id).map(|text| toggle.patch_for(text)) else {
                return Ok(false);
            };
            mutate_active(ctx, id, patch)
        }
        EditOp::ChangeFont(family) => with_active_text(ctx, TextPatch::font_family(family)),
        EditOp::ChangeSize(size) => with_active_text(ctx, TextPatch::font_size(size)),
        EditOp::ChangeColor(color) => with_active_text(ctx, TextPatch::fill(color)),
        EditOp::Undo => undo(ctx),
        EditOp::Redo => redo(ctx),
        EditOp::Capture => {
            ctx.record(|_| Ok(()))?;
            Ok(true)
        }
    }
}

fn with_active_text(ctx: &mut EditContext<'_>, patch: TextPatch) -> EngineResult<bool> {
    match ctx.active_text() {
        Some(id) => mutate_active(ctx, id, patch),
        None => Ok(false),
    }
}

fn mutate_active(ctx: &mut EditContext<'_>, id: ObjectId, patch: TextPatch) -> EngineResult<bool> {
    ctx.record(|engine| engine.mutate_text(id, &patch))?;
    Ok(true)
}

fn undo(ctx: &mut EditContext<'_>) -> EngineResult<bool> {
    let Some(previous) = ctx.history.pop_undo() else {
        return Ok(false);
    };
    let current = match ctx.engine.serialize() {
        Ok(current) => current,
        Err(err) => {
            ctx.history.stash_undo(previous);
            return Err(err);
        }
    };
    if let Err(err) = ctx.engine.restore(&previous) {
        ctx.history.stash_undo(previous);
        return Err(err);
    }
    ctx.history.stash_redo(current);
    Ok(true)
}

fn redo(ctx: &mut EditContext<'_>) -> EngineResult<bool> {
    let Some(next) = ctx.history.pop_redo() else {
        return Ok(false);
    };
    let current = match ctx.engine.serialize() {
        Ok(current) => current,
        Err(err) => {
            ctx.history.stash_redo(next);
            return Err(err);
        }
    };
    if let Err(err) = ctx.engine.restore(&next) {
        ctx.history.stash_redo(next);
        return Err(err);
    }
    ctx.history.stash_undo(current);
    Ok(true)
}

/// Parse a font size the way a text field reports it.
///
/// Reads an optional sign followed by digits and ignores the rest, so
/// `"24px"` is 24. Anything without leading digits, or zero, gives the
/// default size.
pub fn parse_font_size(input: &str) -> f64 {
    let trimmed = input.trim_start();
    let (sign, rest) = match trimmed.as_bytes().first() {
        Some(b'-') => (-1.0, &trimmed[1..]),
        Some(b'+') => (1.0, &trimmed[1..]),
        _ => (1.0, trimmed),
    };
    let digits_end = rest.find(|c: char| !c.is_ascii_digit()).unwrap_or(rest.len());
    match rest[..digits_end].parse::<f64>() {
        Ok(value) if value > 0.0 && value.is_finite() => sign * value,
        _ => TextObject::DEFAULT_FONT_SIZE,
    }
}

/// Parse a hex color, using `fallback` when it is not one.
pub fn parse_color(input: &str, fallback: SerializableColor) -> SerializableColor {
    SerializableColor::from_hex(input.trim()).unwrap_or(fallback)
}
