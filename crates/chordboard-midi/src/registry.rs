//! Active note registry - the single source of truth for currently held notes.
//!
//! Mutated only by the listener (the crate keeps the writers `pub(crate)`);
//! every other component reads immutable snapshots.

use parking_lot::RwLock;
use std::collections::BTreeSet;

/// Ordered set of currently held MIDI notes.
///
/// Insertion is idempotent: a second note-on for a held note does not
/// duplicate the entry. The lowest member is the bass note used by chord
/// detection.
#[derive(Debug, Default)]
pub struct NoteRegistry {
    notes: RwLock<BTreeSet<u8>>,
}

impl NoteRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `false` if the note was already held.
    pub(crate) fn insert(&self, note: u8) -> bool {
        self.notes.write().insert(note)
    }

    /// Returns `false` if the note was not held.
    pub(crate) fn remove(&self, note: u8) -> bool {
        self.notes.write().remove(&note)
    }

    /// Remove all notes, returning those that were held (ascending) so the
    /// caller can force-release them downstream.
    pub(crate) fn clear(&self) -> Vec<u8> {
        let mut notes = self.notes.write();
        let held: Vec<u8> = notes.iter().copied().collect();
        notes.clear();
        held
    }

    /// Immutable snapshot of the held notes, ascending.
    pub fn snapshot(&self) -> Vec<u8> {
        self.notes.read().iter().copied().collect()
    }

    /// The lowest sounding note, if any.
    pub fn lowest(&self) -> Option<u8> {
        self.notes.read().iter().next().copied()
    }

    pub fn len(&self) -> usize {
        self.notes.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.notes.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_is_idempotent() {
        let registry = NoteRegistry::new();
        assert!(registry.insert(60));
        assert!(!registry.insert(60));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_snapshot_is_sorted() {
        let registry = NoteRegistry::new();
        registry.insert(67);
        registry.insert(60);
        registry.insert(64);
        assert_eq!(registry.snapshot(), vec![60, 64, 67]);
        assert_eq!(registry.lowest(), Some(60));
    }

    #[test]
    fn test_clear_returns_held_notes() {
        let registry = NoteRegistry::new();
        registry.insert(60);
        registry.insert(64);
        assert_eq!(registry.clear(), vec![60, 64]);
        assert!(registry.is_empty());
        assert_eq!(registry.clear(), Vec::<u8>::new());
    }

    #[test]
    fn test_remove_missing_is_noop() {
        let registry = NoteRegistry::new();
        assert!(!registry.remove(60));
    }
}
