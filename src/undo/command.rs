use crate::core::error::{Error, ErrorKind, Result};

/// Something that knows how to apply a reversal descriptor `R` to a target.
pub trait Revert<K, R> {
    /// Apply `reversal` to `target`. `Ok(false)` means the reversal was
    /// deliberately skipped.
    fn revert(&mut self, target: &K, reversal: R) -> Result<bool>;
}

/// One reversible operation on one target. Undoable exactly once.
#[derive(Debug, Clone)]
pub struct UndoAction<K, R> {
    target: K,
    reversal: Option<R>,
}

impl<K: PartialEq + std::fmt::Debug, R> UndoAction<K, R> {
    pub fn new(target: K, reversal: R) -> Self {
        UndoAction {
            target,
            reversal: Some(reversal),
        }
    }

    pub fn target(&self) -> &K {
        &self.target
    }

    pub fn reversal(&self) -> Option<&R> {
        self.reversal.as_ref()
    }

    pub fn is_undone(&self) -> bool {
        self.reversal.is_none()
    }

    pub fn undo<V: Revert<K, R>>(&mut self, reverter: &mut V) -> Result<bool> {
        let reversal = self.reversal.take().ok_or_else(|| {
            Error::new(ErrorKind::AlreadyUndone, format!("{:?} was already undone", self.target))
        })?;
        reverter.revert(&self.target, reversal)
    }
}

/// Reversible operations from one multi-target action, at most one per
/// target.
#[derive(Debug, Clone)]
pub struct UndoBatch<K, R> {
    actions: Vec<UndoAction<K, R>>,
}

impl<K: PartialEq + std::fmt::Debug, R> UndoBatch<K, R> {
    pub fn new() -> Self {
        UndoBatch { actions: Vec::new() }
    }

    pub fn add(&mut self, action: UndoAction<K, R>) -> Result<()> {
        if self.contains_target(action.target()) {
            return Err(Error::new(
                ErrorKind::DuplicateTarget,
                format!("batch already holds an action for {:?}", action.target()),
            ));
        }
        self.actions.push(action);
        Ok(())
    }

    pub fn contains_target(&self, target: &K) -> bool {
        self.actions.iter().any(|a| a.target() == target)
    }

    pub fn targets(&self) -> impl Iterator<Item = &K> {
        self.actions.iter().map(UndoAction::target)
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// Undo every member. Every member is attempted even if one fails; the
    /// first error is returned afterwards. Otherwise reports whether all
    /// members were applied.
    pub fn undo_all<V: Revert<K, R>>(&mut self, reverter: &mut V) -> Result<bool> {
        let mut all_applied = true;
        let mut first_error = None;
        for mut action in self.actions.drain(..) {
            match action.undo(reverter) {
                Ok(applied) => all_applied &= applied,
                Err(e) => {
                    all_applied = false;
                    first_error.get_or_insert(e);
                }
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(all_applied),
        }
    }

    /// Undo and drop the one member for `target`.
    pub fn undo_target<V: Revert<K, R>>(&mut self, target: &K, reverter: &mut V) -> Result<bool> {
        let index = self
            .actions
            .iter()
            .position(|a| a.target() == target)
            .ok_or_else(|| Error::new(ErrorKind::TargetNotFound, format!("{:?} is not in this batch", target)))?;
        self.actions.remove(index).undo(reverter)
    }
}

impl<K: PartialEq + std::fmt::Debug, R> Default for UndoBatch<K, R> {
    fn default() -> Self {
        Self::new()
    }
}

/// Entry on the undo log.
#[derive(Debug, Clone)]
pub enum UndoEntry<K, R> {
    Single(UndoAction<K, R>),
    Batch(UndoBatch<K, R>),
}

impl<K: PartialEq + std::fmt::Debug, R> UndoEntry<K, R> {
    pub fn references(&self, target: &K) -> bool {
        match self {
            UndoEntry::Single(action) => action.target() == target,
            UndoEntry::Batch(batch) => batch.contains_target(target),
        }
    }

    pub fn undo<V: Revert<K, R>>(&mut self, reverter: &mut V) -> Result<bool> {
        match self {
            UndoEntry::Single(action) => action.undo(reverter),
            UndoEntry::Batch(batch) => batch.undo_all(reverter),
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Records reversals; fails on "boom", skips on "skip".
    #[derive(Default)]
    pub(crate) struct Journal(pub Vec<(String, i32)>);

    impl Revert<String, i32> for Journal {
        fn revert(&mut self, target: &String, reversal: i32) -> Result<bool> {
            match target.as_str() {
                "boom" => Err(Error::new(ErrorKind::Io, "disk on fire".to_string())),
                "skip" => Ok(false),
                _ => {
                    self.0.push((target.clone(), reversal));
                    Ok(true)
                }
            }
        }
    }

    pub(crate) fn action(target: &str, value: i32) -> UndoAction<String, i32> {
        UndoAction::new(target.to_string(), value)
    }

    #[test]
    fn single_action_is_one_shot() {
        let mut journal = Journal::default();
        let mut a = action("a", 1);
        assert!(a.undo(&mut journal).unwrap());
        assert!(a.is_undone());
        assert_eq!(a.undo(&mut journal).unwrap_err().kind, ErrorKind::AlreadyUndone);
        assert_eq!(journal.0, vec![("a".to_string(), 1)]);
    }

    #[test]
    fn batch_rejects_duplicate_targets() {
        let mut batch = UndoBatch::new();
        batch.add(action("a", 1)).unwrap();
        assert_eq!(batch.add(action("a", 2)).unwrap_err().kind, ErrorKind::DuplicateTarget);
        assert_eq!(batch.len(), 1);
    }

    #[test]
    fn batch_undo_attempts_every_member() {
        let mut journal = Journal::default();
        let mut batch = UndoBatch::new();
        for (t, v) in [("a", 1), ("boom", 2), ("b", 3)] {
            batch.add(action(t, v)).unwrap();
        }
        assert_eq!(batch.undo_all(&mut journal).unwrap_err().kind, ErrorKind::Io);
        assert_eq!(journal.0.len(), 2);
        assert!(batch.is_empty());

        let mut batch = UndoBatch::new();
        batch.add(action("a", 1)).unwrap();
        batch.add(action("skip", 2)).unwrap();
        assert!(!batch.undo_all(&mut journal).unwrap());
    }

    #[test]
    fn batch_undo_by_target_touches_only_that_member() {
        let mut journal = Journal::default();
        let mut batch = UndoBatch::new();
        batch.add(action("a", 1)).unwrap();
        batch.add(action("b", 2)).unwrap();

        assert!(batch.undo_target(&"b".to_string(), &mut journal).unwrap());
        assert_eq!(journal.0, vec![("b".to_string(), 2)]);
        assert!(!batch.contains_target(&"b".to_string()));
        assert!(batch.contains_target(&"a".to_string()));
        assert_eq!(
            batch.undo_target(&"b".to_string(), &mut journal).unwrap_err().kind,
            ErrorKind::TargetNotFound
        );
    }
}
