//! Snapshot-based undo/redo history.

use crate::engine::CanvasState;

/// Linear undo history of serialized canvas states.
///
/// Each entry on the undo stack is the state *before* an edit, so popping
/// it and restoring reverts that edit. States are kept without limit.
#[derive(Debug, Clone, Default)]
pub struct SnapshotStore {
    undo_stack: Vec<CanvasState>,
    redo_stack: Vec<CanvasState>,
}

impl SnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the state preceding a new edit. Clears the redo stack.
    pub fn push(&mut self, state: CanvasState) {
        self.undo_stack.push(state);
        self.redo_stack.clear();
    }

    /// Take the most recent undo target.
    pub fn pop_undo(&mut self) -> Option<CanvasState> {
        self.undo_stack.pop()
    }

    /// Take the most recent redo target.
    pub fn pop_redo(&mut self) -> Option<CanvasState> {
        self.redo_stack.pop()
    }

    /// Put a state back on the undo stack without touching redo.
    pub fn stash_undo(&mut self, state: CanvasState) {
        self.undo_stack.push(state);
    }

    /// Save the state replaced by an undo.
    pub fn stash_redo(&mut self, state: CanvasState) {
        self.redo_stack.push(state);
    }

    /// Most recent undo target.
    pub fn last(&self) -> Option<&CanvasState> {
        self.undo_stack.last()
    }

    /// Number of undo steps.
    pub fn len(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn is_empty(&self) -> bool {
        self.undo_stack.is_empty()
    }

    pub fn redo_len(&self) -> usize {
        self.redo_stack.len()
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
    }
}
