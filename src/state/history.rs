//! Undo/Redo History
//!
//! A bounded stack of full-state snapshots plus a cursor. The snapshot under
//! the cursor is always the state currently shown in the editor:
//!
//! - pushing a state equal to the one under the cursor is a no-op
//! - pushing anything else drops the redo-tail beyond the cursor first
//! - undo/redo move the cursor and hand back the snapshot verbatim
//!
//! There is no merging, no diff compression and no persistence.

use crate::config::DEFAULT_MAX_HISTORY;
use crate::error::{PhotocardError, Result};
use crate::state::snapshot::{EditableState, HistorySnapshot};

/// Label of the snapshot taken when a session starts.
pub const INITIAL_LABEL: &str = "Open template";

/// One line of a history listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryEntrySummary {
    pub index: usize,
    pub id: String,
    pub label: String,
    /// True for the entry under the cursor.
    pub current: bool,
}

/// Snapshot stack with a cursor.
#[derive(Debug, Clone)]
pub struct History {
    entries: Vec<HistorySnapshot>,

    cursor: usize,

    /// Maximum number of snapshots, including the initial one.
    max_entries: usize,

    /// Number of snapshots dropped to stay within the bound.
    discarded: usize,
}

impl Default for History {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_HISTORY)
    }
}

impl History {
    /// Create an empty history. A bound of zero is raised to one.
    pub fn new(max_entries: usize) -> Self {
        Self {
            entries: Vec::new(),
            cursor: 0,
            max_entries: max_entries.max(1),
            discarded: 0,
        }
    }

    /// Start over with `initial` as the only snapshot.
    pub fn reset(&mut self, initial: EditableState) {
        self.entries.clear();
        self.entries
            .push(HistorySnapshot::new(INITIAL_LABEL, initial));
        self.cursor = 0;
        self.discarded = 0;
    }

    /// Record `state` after a mutation.
    ///
    /// Returns `false` without touching the stack when `state` equals the
    /// snapshot under the cursor.
    pub fn push(&mut self, label: impl Into<String>, state: &EditableState) -> bool {
        if self
            .current()
            .map(|snapshot| snapshot.state == *state)
            .unwrap_or(false)
        {
            return false;
        }

        if !self.entries.is_empty() {
            let dropped = self.entries.len() - (self.cursor + 1);
            if dropped > 0 {
                tracing::trace!(dropped, "discarding redo tail");
            }
            self.entries.truncate(self.cursor + 1);
        }

        self.entries
            .push(HistorySnapshot::new(label, state.clone()));
        self.cursor = self.entries.len() - 1;
        self.trim();
        true
    }

    /// Step back one snapshot.
    pub fn undo(&mut self) -> Result<&HistorySnapshot> {
        if !self.can_undo() {
            return Err(PhotocardError::NothingToUndo);
        }
        self.cursor -= 1;
        Ok(&self.entries[self.cursor])
    }

    /// Step forward one snapshot.
    pub fn redo(&mut self) -> Result<&HistorySnapshot> {
        if !self.can_redo() {
            return Err(PhotocardError::NothingToRedo);
        }
        self.cursor += 1;
        Ok(&self.entries[self.cursor])
    }

    pub fn can_undo(&self) -> bool {
        self.cursor > 0
    }

    pub fn can_redo(&self) -> bool {
        self.cursor + 1 < self.entries.len()
    }

    /// Number of steps undo can take.
    pub fn undo_count(&self) -> usize {
        self.cursor
    }

    /// Number of steps redo can take.
    pub fn redo_count(&self) -> usize {
        self.entries.len().saturating_sub(self.cursor + 1)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Snapshot under the cursor.
    pub fn current(&self) -> Option<&HistorySnapshot> {
        self.entries.get(self.cursor)
    }

    pub fn entries(&self) -> &[HistorySnapshot] {
        &self.entries
    }

    pub fn max_entries(&self) -> usize {
        self.max_entries
    }

    /// Change the bound, trimming the oldest snapshots if needed.
    pub fn set_max_entries(&mut self, max_entries: usize) {
        self.max_entries = max_entries.max(1);
        self.trim();
    }

    pub fn discarded(&self) -> usize {
        self.discarded
    }

    /// Listing of all snapshots, oldest first.
    pub fn summary(&self) -> Vec<HistoryEntrySummary> {
        self.entries
            .iter()
            .enumerate()
            .map(|(index, snapshot)| HistoryEntrySummary {
                index,
                id: snapshot.id.clone(),
                label: snapshot.label.clone(),
                current: index == self.cursor,
            })
            .collect()
    }

    /// Drop snapshots while over the bound. The oldest go first; once the
    /// cursor is at the bottom the redo-tail is shortened instead, so the
    /// snapshot under the cursor always survives.
    fn trim(&mut self) {
        while self.entries.len() > self.max_entries {
            if self.cursor > 0 {
                self.entries.remove(0);
                self.cursor -= 1;
            } else {
                self.entries.pop();
            }
            self.discarded += 1;
        }
    }
}
