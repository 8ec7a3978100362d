use std::collections::VecDeque;

use crate::raster::bitmap::BitmapSlice;

pub const DEFAULT_HISTORY_CAPACITY: usize = 100;

/// State of the canvas captured right before an operation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HistoryEntry {
    /// The canvas had no bitmap yet.
    Empty,
    Slice(BitmapSlice),
}

/// Two bounded stacks of canvas snapshots. The oldest entry is dropped past `capacity`.
#[derive(Debug)]
pub struct UndoLog {
    capacity: usize,
    history: VecDeque<HistoryEntry>,
    redo: VecDeque<HistoryEntry>,
}

impl Default for UndoLog {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_HISTORY_CAPACITY)
    }
}

impl UndoLog {
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            history: VecDeque::with_capacity(capacity.min(64)),
            redo: VecDeque::new(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Record the state preceding a new operation. Invalidates redo.
    pub fn commit(&mut self, before: HistoryEntry) {
        push_bounded(&mut self.history, before, self.capacity);
        self.redo.clear();
    }

    /// Pop the last committed state, parking `current` on the redo stack.
    pub fn undo(&mut self, current: HistoryEntry) -> Option<HistoryEntry> {
        let restored = self.history.pop_back()?;
        push_bounded(&mut self.redo, current, self.capacity);
        Some(restored)
    }

    pub fn redo(&mut self, current: HistoryEntry) -> Option<HistoryEntry> {
        let restored = self.redo.pop_back()?;
        push_bounded(&mut self.history, current, self.capacity);
        Some(restored)
    }

    pub fn clear_redo(&mut self) {
        self.redo.clear();
    }

    pub fn clear(&mut self) {
        self.history.clear();
        self.redo.clear();
    }

    pub fn can_undo(&self) -> bool {
        !self.history.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }

    pub fn undo_depth(&self) -> usize {
        self.history.len()
    }

    pub fn redo_depth(&self) -> usize {
        self.redo.len()
    }
}

fn push_bounded(stack: &mut VecDeque<HistoryEntry>, entry: HistoryEntry, capacity: usize) {
    stack.push_back(entry);
    while stack.len() > capacity {
        stack.pop_front();
    }
}

#[cfg(test)]
#[path = "../../tests/unit/draw/history.rs"]
mod tests;
