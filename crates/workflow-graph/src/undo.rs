//! Undo/redo history using compressed snapshots
//!
//! Each entry is the zstd-compressed JSON of a [`WorkflowData`]. Restoring
//! a whole snapshot means no edit needs an inverse operation, and a cascade
//! delete undoes in one step together with the edges it took along.

use std::collections::VecDeque;

use crate::error::{GraphError, Result};
use crate::graph::WorkflowData;

/// zstd level for snapshots; small graphs compress well at low levels
const COMPRESSION_LEVEL: i32 = 3;

/// Default number of snapshots kept
pub const DEFAULT_HISTORY: usize = 100;

/// Bounded undo/redo history of graph states
///
/// The entry under the cursor is the current state. Recording a new state
/// drops everything after the cursor.
pub struct UndoStack {
    entries: VecDeque<Vec<u8>>,
    cursor: usize,
    capacity: usize,
}

impl UndoStack {
    /// Create a history that keeps at most `capacity` states (minimum 1)
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            cursor: 0,
            capacity: capacity.max(1),
        }
    }

    /// Record a new current state
    pub fn record(&mut self, data: &WorkflowData) -> Result<()> {
        let entry = compress(data)?;

        if !self.entries.is_empty() {
            self.entries.truncate(self.cursor + 1);
        }
        self.entries.push_back(entry);

        if self.entries.len() > self.capacity {
            self.entries.pop_front();
        }
        self.cursor = self.entries.len() - 1;
        Ok(())
    }

    /// The state one step back, without moving the cursor
    pub fn peek_undo(&self) -> Option<Result<WorkflowData>> {
        self.can_undo()
            .then(|| decompress(&self.entries[self.cursor - 1]))
    }

    /// The state one step forward, without moving the cursor
    pub fn peek_redo(&self) -> Option<Result<WorkflowData>> {
        self.can_redo()
            .then(|| decompress(&self.entries[self.cursor + 1]))
    }

    /// Move the cursor back once the peeked state has been applied
    pub fn step_back(&mut self) -> bool {
        let moved = self.can_undo();
        if moved {
            self.cursor -= 1;
        }
        moved
    }

    /// Move the cursor forward once the peeked state has been applied
    pub fn step_forward(&mut self) -> bool {
        let moved = self.can_redo();
        if moved {
            self.cursor += 1;
        }
        moved
    }

    /// Step back one state, returning it
    ///
    /// The cursor stays put when the snapshot cannot be decoded.
    pub fn undo(&mut self) -> Option<Result<WorkflowData>> {
        let data = self.peek_undo()?;
        if data.is_ok() {
            self.step_back();
        }
        Some(data)
    }

    /// Step forward one state, returning it
    pub fn redo(&mut self) -> Option<Result<WorkflowData>> {
        let data = self.peek_redo()?;
        if data.is_ok() {
            self.step_forward();
        }
        Some(data)
    }

    pub fn can_undo(&self) -> bool {
        self.cursor > 0
    }

    pub fn can_redo(&self) -> bool {
        self.cursor + 1 < self.entries.len()
    }

    /// Number of recorded states
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Forget all history
    pub fn clear(&mut self) {
        self.entries.clear();
        self.cursor = 0;
    }

    /// Total compressed size of the history in bytes
    pub fn compressed_size(&self) -> usize {
        self.entries.iter().map(Vec::len).sum()
    }
}

impl Default for UndoStack {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY)
    }
}

fn compress(data: &WorkflowData) -> Result<Vec<u8>> {
    let json = serde_json::to_vec(data)?;
    zstd::encode_all(json.as_slice(), COMPRESSION_LEVEL)
        .map_err(|e| GraphError::Compression(e.to_string()))
}

fn decompress(entry: &[u8]) -> Result<WorkflowData> {
    let json = zstd::decode_all(entry).map_err(|e| GraphError::Compression(e.to_string()))?;
    Ok(serde_json::from_slice(&json)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Node, NodeKind};

    fn data_with(ids: &[&str]) -> WorkflowData {
        WorkflowData {
            nodes: ids
                .iter()
                .map(|id| Node::new(*id, NodeKind::Action))
                .collect(),
            edges: Vec::new(),
        }
    }

    fn ids(data: &WorkflowData) -> Vec<&str> {
        data.nodes.iter().map(|n| n.id.as_str()).collect()
    }

    #[test]
    fn test_undo_then_redo() {
        let mut stack = UndoStack::new(10);
        stack.record(&data_with(&[])).unwrap();
        stack.record(&data_with(&["a"])).unwrap();
        stack.record(&data_with(&["a", "b"])).unwrap();

        let back = stack.undo().unwrap().unwrap();
        assert_eq!(ids(&back), vec!["a"]);
        let back = stack.undo().unwrap().unwrap();
        assert!(back.nodes.is_empty());
        assert!(stack.undo().is_none());

        let forward = stack.redo().unwrap().unwrap();
        assert_eq!(ids(&forward), vec!["a"]);
    }

    #[test]
    fn test_record_discards_redo_branch() {
        let mut stack = UndoStack::new(10);
        stack.record(&data_with(&[])).unwrap();
        stack.record(&data_with(&["a"])).unwrap();
        stack.undo();
        stack.record(&data_with(&["z"])).unwrap();

        assert!(!stack.can_redo());
        assert_eq!(stack.len(), 2);
        let back = stack.undo().unwrap().unwrap();
        assert!(back.nodes.is_empty());
    }

    #[test]
    fn test_capacity_drops_oldest() {
        let mut stack = UndoStack::new(3);
        for name in ["a", "b", "c", "d", "e"] {
            stack.record(&data_with(&[name])).unwrap();
        }
        assert_eq!(stack.len(), 3);

        stack.undo();
        let oldest = stack.undo().unwrap().unwrap();
        assert_eq!(ids(&oldest), vec!["c"]);
        assert!(!stack.can_undo());
    }

    #[test]
    fn test_undecodable_entry_keeps_cursor() {
        let mut stack = UndoStack::new(10);
        stack.record(&data_with(&["a"])).unwrap();
        stack.record(&data_with(&["a", "b"])).unwrap();
        stack.entries[0] = b"not zstd".to_vec();

        assert!(matches!(stack.undo(), Some(Err(GraphError::Compression(_)))));
        assert!(stack.can_undo());
        assert!(!stack.can_redo());
    }

    #[test]
    fn test_peek_does_not_move() {
        let mut stack = UndoStack::new(10);
        stack.record(&data_with(&[])).unwrap();
        stack.record(&data_with(&["a"])).unwrap();

        assert!(stack.peek_undo().unwrap().unwrap().nodes.is_empty());
        assert!(stack.peek_redo().is_none());
        assert!(stack.step_back());
        assert!(!stack.step_back());
        assert_eq!(ids(&stack.peek_redo().unwrap().unwrap()), vec!["a"]);
    }

    #[test]
    fn test_empty_stack() {
        let mut stack = UndoStack::default();
        assert!(stack.is_empty());
        assert!(!stack.can_undo());
        assert!(!stack.can_redo());
        assert!(stack.redo().is_none());

        stack.record(&data_with(&["a"])).unwrap();
        assert!(stack.compressed_size() > 0);
        stack.clear();
        assert!(stack.is_empty());
    }
}
