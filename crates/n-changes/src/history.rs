//! Undo/redo history — transaction-based edit tracking that carries change
//! tags along with the text.
//!
//! Records every buffer mutation as a reversible [`Edit`] grouped into
//! transactions. A transaction is the atomic unit of undo/redo.
//!
//! Each edit also remembers how the text around it was tagged, before and
//! after the mutation (see [`TagSnapshot`]). Replay puts the matching
//! snapshot back, so undoing a deletion restores the highlighting the text
//! had instead of marking it as new, and undoing an insertion that swallowed
//! a deletion marker brings the marker back.
//!
//! # Usage
//!
//! ```text
//! history.begin(cursor);
//! // perform edits on the buffer, recording each one:
//! history.record(edit);
//! // finalize:
//! history.commit(cursor);
//! ```
//!
//! Empty transactions (no edits between begin and commit) are discarded.

use crate::buffer::Buffer;
use crate::edit::EditEvent;
use crate::error::BufferError;
use crate::position::Span;
use crate::store::TagSnapshot;

// ---------------------------------------------------------------------------
// Edit
// ---------------------------------------------------------------------------

/// A single reversible buffer edit: `removed` was replaced by `inserted` at
/// char offset `offset`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edit {
    pub offset: usize,
    pub removed: String,
    pub inserted: String,
    /// Tags from `offset` before the edit. Undo restores them.
    pub before: TagSnapshot,
    /// Tags from `offset` after the edit. Redo restores them.
    pub after: TagSnapshot,
}

impl Edit {
    fn apply(
        &self,
        buf: &mut Buffer,
        old: &str,
        new: &str,
        tags: &TagSnapshot,
        on_step: &mut impl FnMut(&Buffer, ReplayStep<'_>),
    ) -> Result<(), BufferError> {
        let event = buf
            .replace(Span::at(self.offset, old.chars().count()), new)?
            .replayed();
        on_step(buf, ReplayStep { event, tags });
        Ok(())
    }

    fn undo(
        &self,
        buf: &mut Buffer,
        on_step: &mut impl FnMut(&Buffer, ReplayStep<'_>),
    ) -> Result<(), BufferError> {
        self.apply(buf, &self.inserted, &self.removed, &self.before, on_step)
    }

    fn redo(
        &self,
        buf: &mut Buffer,
        on_step: &mut impl FnMut(&Buffer, ReplayStep<'_>),
    ) -> Result<(), BufferError> {
        self.apply(buf, &self.removed, &self.inserted, &self.after, on_step)
    }
}

/// One replayed mutation, handed to the caller right after it hit the
/// buffer.
#[derive(Debug, Clone, Copy)]
pub struct ReplayStep<'a> {
    /// The mutation, flagged as a replay.
    pub event: EditEvent,
    /// Tags to put back at `event.position`.
    pub tags: &'a TagSnapshot,
}

// ---------------------------------------------------------------------------
// Transaction
// ---------------------------------------------------------------------------

/// A group of edits that undo/redo as one atomic unit.
///
/// Also tracks cursor offsets so that undo restores the cursor to where it
/// was before the transaction, and redo restores it to where it was after.
#[derive(Debug, Clone)]
struct Transaction {
    edits: Vec<Edit>,
    cursor_before: usize,
    cursor_after: usize,
}

// ---------------------------------------------------------------------------
// History
// ---------------------------------------------------------------------------

/// Undo/redo history for a buffer.
///
/// Maintains two stacks: edits that can be undone and edits that can be
/// redone. New edits clear the redo stack (branching history is not
/// supported).
#[derive(Debug)]
pub struct History {
    undo_stack: Vec<Transaction>,
    redo_stack: Vec<Transaction>,
    pending: Option<Transaction>,
}

impl History {
    /// Create an empty history.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
            pending: None,
        }
    }

    /// Start a new transaction. `cursor` is the cursor offset before any
    /// edits in this transaction.
    ///
    /// A previous transaction still pending is committed first.
    pub fn begin(&mut self, cursor: usize) {
        if self.pending.is_some() {
            self.commit(cursor);
        }
        self.pending = Some(Transaction {
            edits: Vec::new(),
            cursor_before: cursor,
            cursor_after: cursor,
        });
    }

    /// True between `begin` and `commit`.
    #[must_use]
    pub const fn in_transaction(&self) -> bool {
        self.pending.is_some()
    }

    /// Record an edit that was just performed. Does nothing without a
    /// pending transaction.
    pub fn record(&mut self, edit: Edit) {
        if let Some(txn) = &mut self.pending {
            txn.edits.push(edit);
        }
    }

    /// Finalize the current transaction. `cursor` is the cursor offset after
    /// all edits in this transaction.
    pub fn commit(&mut self, cursor: usize) {
        if let Some(mut txn) = self.pending.take() {
            if txn.edits.is_empty() {
                return;
            }
            txn.cursor_after = cursor;
            self.redo_stack.clear();
            self.undo_stack.push(txn);
        }
    }

    /// Undo the last transaction, calling `on_step` after every mutation.
    /// Returns the cursor offset to restore, or `None` if there's nothing to
    /// undo.
    ///
    /// # Errors
    ///
    /// A [`BufferError`] when the buffer refuses the first mutation
    /// (read-only). The transaction stays on the undo stack.
    pub fn undo(
        &mut self,
        buf: &mut Buffer,
        mut on_step: impl FnMut(&Buffer, ReplayStep<'_>),
    ) -> Result<Option<usize>, BufferError> {
        if let Some(txn) = self.pending.take() {
            if !txn.edits.is_empty() {
                self.redo_stack.clear();
                self.undo_stack.push(txn);
            }
        }

        let Some(txn) = self.undo_stack.pop() else {
            return Ok(None);
        };
        let replayed = txn
            .edits
            .iter()
            .rev()
            .try_for_each(|edit| edit.undo(buf, &mut on_step));
        if let Err(err) = replayed {
            self.undo_stack.push(txn);
            return Err(err);
        }
        let cursor = txn.cursor_before;
        self.redo_stack.push(txn);
        Ok(Some(cursor))
    }

    /// Redo the last undone transaction, calling `on_step` after every
    /// mutation. Returns the cursor offset to restore, or `None` if there's
    /// nothing to redo.
    ///
    /// # Errors
    ///
    /// Same as [`undo`](Self::undo).
    pub fn redo(
        &mut self,
        buf: &mut Buffer,
        mut on_step: impl FnMut(&Buffer, ReplayStep<'_>),
    ) -> Result<Option<usize>, BufferError> {
        let Some(txn) = self.redo_stack.pop() else {
            return Ok(None);
        };
        let replayed = txn
            .edits
            .iter()
            .try_for_each(|edit| edit.redo(buf, &mut on_step));
        if let Err(err) = replayed {
            self.redo_stack.push(txn);
            return Err(err);
        }
        let cursor = txn.cursor_after;
        self.undo_stack.push(txn);
        Ok(Some(cursor))
    }

    /// True if there are transactions that can be undone.
    #[must_use]
    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
            || self
                .pending
                .as_ref()
                .is_some_and(|t| !t.edits.is_empty())
    }

    /// True if there are transactions that can be redone.
    #[must_use]
    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    #[must_use]
    pub fn undo_count(&self) -> usize {
        self.undo_stack.len()
    }

    #[must_use]
    pub fn redo_count(&self) -> usize {
        self.redo_stack.len()
    }
}

impl Default for History {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
