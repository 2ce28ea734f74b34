//! Edit notifications — the record a host fires after every text mutation.
//!
//! An [`EditEvent`] describes one atomic mutation *after* it happened:
//! `removed` chars were taken out at `position` and `inserted` chars now sit
//! at `[position, position + inserted)` in the new text. Events are delivered
//! in mutation order, never batched or reordered.
//!
//! Undo/redo replay is flagged explicitly on the event instead of being
//! inferred from ambient state, so a tracker can tell replayed text (whose
//! tags come back with it) from fresh edits.

use crate::position::Span;

/// One atomic text mutation, reported after the fact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EditEvent {
    /// Char offset where the mutation happened.
    pub position: usize,
    /// Number of chars removed at `position` (in the old text).
    pub removed: usize,
    /// Number of chars inserted at `position` (in the new text).
    pub inserted: usize,
    /// True when the mutation comes from undo/redo replay.
    pub undo_replay: bool,
}

impl EditEvent {
    /// A fresh (non-replay) edit.
    #[inline]
    #[must_use]
    pub const fn new(position: usize, removed: usize, inserted: usize) -> Self {
        Self {
            position,
            removed,
            inserted,
            undo_replay: false,
        }
    }

    /// Text inserted at `position`.
    #[inline]
    #[must_use]
    pub const fn insertion(position: usize, inserted: usize) -> Self {
        Self::new(position, 0, inserted)
    }

    /// Text removed at `position`.
    #[inline]
    #[must_use]
    pub const fn deletion(position: usize, removed: usize) -> Self {
        Self::new(position, removed, 0)
    }

    /// The same event, flagged as undo/redo replay.
    #[inline]
    #[must_use]
    pub const fn replayed(self) -> Self {
        Self {
            undo_replay: true,
            ..self
        }
    }

    /// The inserted text's span in the new text. Empty for pure deletions.
    #[inline]
    #[must_use]
    pub const fn inserted_span(self) -> Span {
        Span::at(self.position, self.inserted)
    }

    /// The removed text's span in the old text. Empty for pure insertions.
    #[inline]
    #[must_use]
    pub const fn removed_span(self) -> Span {
        Span::at(self.position, self.removed)
    }

    /// True when the event changed nothing.
    #[inline]
    #[must_use]
    pub const fn is_noop(self) -> bool {
        self.removed == 0 && self.inserted == 0
    }

    /// True for a removal with nothing inserted in its place.
    #[inline]
    #[must_use]
    pub const fn is_pure_deletion(self) -> bool {
        self.inserted == 0 && self.removed > 0
    }

    /// Map an offset of the old text to the new text.
    ///
    /// Offsets before the edit are unchanged, offsets inside the removed text
    /// collapse onto `position`, offsets at or past the removed text's end
    /// shift by the length difference. An offset exactly at `position` stays
    /// there (`stick_after == false`) or moves past the insertion
    /// (`stick_after == true`).
    #[must_use]
    pub const fn map_offset(self, offset: usize, stick_after: bool) -> usize {
        let removed_end = self.position + self.removed;
        if offset < self.position || (offset == self.position && !stick_after) {
            offset
        } else if offset >= removed_end {
            offset - self.removed + self.inserted
        } else if stick_after {
            self.position + self.inserted
        } else {
            self.position
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
