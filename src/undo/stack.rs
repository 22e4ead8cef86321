use crate::core::error::{Error, ErrorKind, Result};
use super::command::{Revert, UndoAction, UndoBatch, UndoEntry};

/// Chronological stack of undo entries, most recent on top.
#[derive(Debug, Clone)]
pub struct UndoLog<K, R> {
    entries: Vec<UndoEntry<K, R>>,
}

impl<K: PartialEq + std::fmt::Debug, R> UndoLog<K, R> {
    pub fn new() -> Self {
        UndoLog { entries: Vec::new() }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn push(&mut self, entry: UndoEntry<K, R>) {
        self.entries.push(entry);
    }

    pub fn push_action(&mut self, target: K, reversal: R) {
        self.push(UndoEntry::Single(UndoAction::new(target, reversal)));
    }

    /// Empty batches are not recorded.
    pub fn push_batch(&mut self, batch: UndoBatch<K, R>) {
        if !batch.is_empty() {
            self.push(UndoEntry::Batch(batch));
        }
    }

    /// Undo the most recent entry, whole.
    pub fn undo_last<V: Revert<K, R>>(&mut self, reverter: &mut V) -> Result<bool> {
        let mut entry = self
            .entries
            .pop()
            .ok_or_else(|| Error::new(ErrorKind::NothingToUndo, "undo log is empty".to_string()))?;
        entry.undo(reverter)
    }

    /// Undo the most recent action on `target`. A batch gives up only that
    /// member and leaves the log once it is empty. Everything above it stays
    /// in place, in order.
    pub fn undo_target<V: Revert<K, R>>(&mut self, target: &K, reverter: &mut V) -> Result<bool> {
        if self.entries.is_empty() {
            return Err(Error::new(ErrorKind::NothingToUndo, "undo log is empty".to_string()));
        }
        let index = self
            .entries
            .iter()
            .rposition(|e| e.references(target))
            .ok_or_else(|| Error::new(ErrorKind::TargetNotFound, format!("no undo entry for {:?}", target)))?;

        let outcome = match &mut self.entries[index] {
            UndoEntry::Batch(batch) => Some((batch.undo_target(target, reverter), batch.is_empty())),
            UndoEntry::Single(_) => None,
        };
        match outcome {
            Some((result, emptied)) => {
                if emptied {
                    self.entries.remove(index);
                }
                result
            }
            None => self.entries.remove(index).undo(reverter),
        }
    }
}

impl<K: PartialEq + std::fmt::Debug, R> Default for UndoLog<K, R> {
    fn default() -> Self {
        Self::new()
    }
}
