use super::types::Turn;
use parking_lot::RwLock;
use std::sync::Arc;

/// Append-only conversation transcript.
///
/// Insertion order is conversation order; turns are never reordered or
/// removed. The transcript lives for the process lifetime and is never
/// persisted.
#[derive(Debug, Clone)]
pub struct Transcript {
    turns: Arc<RwLock<Vec<Turn>>>,
}

impl Transcript {
    pub fn new() -> Self {
        Self {
            turns: Arc::new(RwLock::new(Vec::new())),
        }
    }

    pub fn append(&self, turn: Turn) {
        self.turns.write().push(turn);
    }

    pub fn get_all(&self) -> Vec<Turn> {
        self.turns.read().clone()
    }

    pub fn len(&self) -> usize {
        self.turns.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.read().is_empty()
    }
}

impl Default for Transcript {
    fn default() -> Self {
        Self::new()
    }
}
