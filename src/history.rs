use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::config::DEFAULT_HISTORY_CAPACITY;
use crate::models::FamilyData;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub snapshot: FamilyData,
    pub label: String,
    pub timestamp: DateTime<Utc>,
}

impl HistoryEntry {
    fn new(snapshot: FamilyData, label: impl Into<String>) -> Self {
        Self {
            snapshot,
            label: label.into(),
            timestamp: Utc::now(),
        }
    }
}

/// Linear undo/redo over whole-tree snapshots.
///
/// The undo side holds the state before each recorded mutation, newest last. Undoing moves
/// the current state onto the redo side under the same label, so labels describe the action
/// that separates the two snapshots in either direction. At most `capacity` entries are kept
/// across both sides; the oldest undo entry is evicted first.
#[derive(Debug, Clone)]
pub struct History {
    undo: VecDeque<HistoryEntry>,
    redo: Vec<HistoryEntry>,
    capacity: usize,
}

impl Default for History {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_CAPACITY)
    }
}

impl History {
    pub fn new(capacity: usize) -> Self {
        Self {
            undo: VecDeque::with_capacity(capacity),
            redo: Vec::new(),
            capacity,
        }
    }

    /// Records `prior`, the state a mutation labelled `label` started from. Any redo
    /// entries are discarded.
    pub fn record(&mut self, prior: FamilyData, label: impl Into<String>) {
        self.redo.clear();
        if self.capacity == 0 {
            return;
        }
        self.undo.push_back(HistoryEntry::new(prior, label));
        while self.undo.len() > self.capacity {
            self.undo.pop_front();
        }
    }

    /// Steps back from `current`. Returns the entry whose snapshot becomes current, or
    /// `None` when there is nothing to undo.
    pub fn undo(&mut self, current: &FamilyData) -> Option<HistoryEntry> {
        let entry = self.undo.pop_back()?;
        self.redo
            .push(HistoryEntry::new(current.clone(), entry.label.clone()));
        Some(entry)
    }

    /// Steps forward from `current`, the inverse of [`History::undo`].
    pub fn redo(&mut self, current: &FamilyData) -> Option<HistoryEntry> {
        let entry = self.redo.pop()?;
        self.undo
            .push_back(HistoryEntry::new(current.clone(), entry.label.clone()));
        Some(entry)
    }

    pub fn can_undo(&self) -> bool {
        !self.undo.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }

    /// Entries retained on both sides.
    pub fn len(&self) -> usize {
        self.undo.len() + self.redo.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Labels in chronological order: undoable actions oldest first, then redoable ones.
    pub fn labels(&self) -> Vec<&str> {
        self.undo
            .iter()
            .map(|entry| entry.label.as_str())
            .chain(self.redo.iter().rev().map(|entry| entry.label.as_str()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state(n: usize) -> FamilyData {
        FamilyData::empty(format!("State{n}"))
    }

    #[test]
    fn undo_then_redo_restores_both_states() {
        let mut history = History::default();
        let s0 = state(0);
        let s1 = state(1);
        history.record(s0.clone(), "Added A");

        let undone = history.undo(&s1).expect("undo available");
        assert_eq!(undone.snapshot, s0);
        assert_eq!(undone.label, "Added A");
        assert!(!history.can_undo());
        assert!(history.can_redo());

        let redone = history.redo(&s0).expect("redo available");
        assert_eq!(redone.snapshot, s1);
        assert_eq!(redone.label, "Added A");
        assert!(history.can_undo());
        assert!(!history.can_redo());
    }

    #[test]
    fn empty_history_has_nothing_to_step() {
        let mut history = History::default();
        assert!(history.undo(&state(0)).is_none());
        assert!(history.redo(&state(0)).is_none());
        assert!(history.is_empty());
    }

    #[test]
    fn recording_discards_redo_entries() {
        let mut history = History::default();
        history.record(state(0), "one");
        history.record(state(1), "two");
        history.undo(&state(2));
        assert!(history.can_redo());

        history.record(state(1), "three");
        assert!(!history.can_redo());
        assert_eq!(history.labels(), vec!["one", "three"]);
    }

    #[test]
    fn oldest_entries_are_evicted_past_capacity() {
        let mut history = History::new(10);
        for n in 0..15 {
            history.record(state(n), format!("edit {n}"));
        }
        assert_eq!(history.len(), 10);
        assert_eq!(history.labels().first().copied(), Some("edit 5"));

        let mut current = state(15);
        let mut steps = 0;
        while let Some(entry) = history.undo(&current) {
            current = entry.snapshot;
            steps += 1;
        }
        assert_eq!(steps, 10);
        assert_eq!(current, state(5));
        assert_eq!(history.len(), 10);
    }

    #[test]
    fn labels_run_in_chronological_order_across_both_sides() {
        let mut history = History::default();
        history.record(state(0), "a");
        history.record(state(1), "b");
        history.record(state(2), "c");
        history.undo(&state(3));
        history.undo(&state(2));
        assert_eq!(history.labels(), vec!["a", "b", "c"]);
    }

    #[test]
    fn zero_capacity_keeps_nothing() {
        let mut history = History::new(0);
        history.record(state(0), "ignored");
        assert!(!history.can_undo());
    }
}
