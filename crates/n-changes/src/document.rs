//! Document — one buffer with its history, change tracker and overlays.
//!
//! This is the host-side glue: every text mutation goes through the
//! document, which shifts the overlays, notifies the tracker and records
//! the edit (tags included) for undo. The user-facing change commands live
//! here too.
//!
//! Fallible commands return a `Result` and also leave a one-line status
//! message behind ([`take_message`](Document::take_message)), the way an
//! editor echoes errors in its message area.

use std::path::Path;
use std::sync::Arc;

use tracing::debug;

use crate::buffer::Buffer;
use crate::category::CategoryTable;
use crate::diff::{self, CompareSide, CompareSummary, SimilarAligner};
use crate::edit::EditEvent;
use crate::error::{BufferError, ChangeError};
use crate::global::detect_kind;
use crate::history::{Edit, History};
use crate::mode::{Indicators, InitialState, ModeState};
use crate::overlay::OverlaySet;
use crate::position::Span;
use crate::tracker::ChangeTracker;

// ---------------------------------------------------------------------------
// ChangeSettings
// ---------------------------------------------------------------------------

/// Resolved change-highlighting settings shared by every document.
#[derive(Debug, Clone)]
pub struct ChangeSettings {
    pub table: Arc<CategoryTable>,
    pub initial_state: InitialState,
    pub rotate_on_save: bool,
    pub indicators: Indicators,
    pub aligner: SimilarAligner,
}

impl Default for ChangeSettings {
    fn default() -> Self {
        Self {
            table: Arc::new(CategoryTable::default()),
            initial_state: InitialState::default(),
            rotate_on_save: false,
            indicators: Indicators::default(),
            aligner: SimilarAligner::default(),
        }
    }
}

// ---------------------------------------------------------------------------
// Document
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct Document {
    name: String,
    kind: Option<String>,
    buffer: Buffer,
    history: History,
    tracker: ChangeTracker,
    overlays: OverlaySet,
    settings: Arc<ChangeSettings>,
    message: Option<String>,
}

impl Document {
    // -- Construction -------------------------------------------------------

    /// Wrap `buffer`. The kind is detected from the buffer's path, if any.
    #[must_use]
    pub fn new(name: impl Into<String>, buffer: Buffer, settings: Arc<ChangeSettings>) -> Self {
        let kind = buffer.path().and_then(detect_kind).map(str::to_string);
        Self {
            name: name.into(),
            kind,
            buffer,
            history: History::new(),
            tracker: ChangeTracker::new(Arc::clone(&settings.table)),
            overlays: OverlaySet::new(),
            settings,
            message: None,
        }
    }

    /// A document over in-memory text with no file behind it.
    #[must_use]
    pub fn from_text(name: impl Into<String>, text: &str, settings: Arc<ChangeSettings>) -> Self {
        Self::new(name, Buffer::from_text(text), settings)
    }

    /// Load a file. The document is named after the file.
    ///
    /// # Errors
    ///
    /// [`ChangeError::Buffer`] when the file can't be read.
    pub fn open(path: &Path, settings: Arc<ChangeSettings>) -> Result<Self, ChangeError> {
        let buffer = Buffer::from_file(path)?;
        let name = path
            .file_name()
            .map_or_else(|| path.display().to_string(), |n| n.to_string_lossy().into_owned());
        Ok(Self::new(name, buffer, settings))
    }

    // -- Accessors ----------------------------------------------------------

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The buffer kind (language), once known.
    #[must_use]
    pub fn kind(&self) -> Option<&str> {
        self.kind.as_deref()
    }

    pub fn set_kind(&mut self, kind: impl Into<String>) {
        self.kind = Some(kind.into());
    }

    #[must_use]
    pub const fn buffer(&self) -> &Buffer {
        &self.buffer
    }

    pub const fn buffer_mut(&mut self) -> &mut Buffer {
        &mut self.buffer
    }

    #[must_use]
    pub const fn tracker(&self) -> &ChangeTracker {
        &self.tracker
    }

    pub const fn tracker_mut(&mut self) -> &mut ChangeTracker {
        &mut self.tracker
    }

    #[must_use]
    pub const fn overlays(&self) -> &OverlaySet {
        &self.overlays
    }

    /// The rendering layer, for other subsystems to add their own overlays.
    pub const fn overlays_mut(&mut self) -> &mut OverlaySet {
        &mut self.overlays
    }

    #[must_use]
    pub const fn state(&self) -> ModeState {
        self.tracker.state()
    }

    #[must_use]
    pub fn settings(&self) -> &ChangeSettings {
        &self.settings
    }

    /// Mode-line indicator for the current state.
    #[must_use]
    pub fn indicator(&self) -> &str {
        self.settings.indicators.for_state(self.tracker.state())
    }

    /// The pending status message, if any.
    #[must_use]
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    /// Take the pending status message.
    pub const fn take_message(&mut self) -> Option<String> {
        self.message.take()
    }

    /// Switch to new settings and redraw with the new table.
    ///
    /// # Errors
    ///
    /// [`ChangeError::NoFaceForCategory`] when the new table can't style an
    /// existing change.
    pub fn set_settings(&mut self, settings: Arc<ChangeSettings>) -> Result<(), ChangeError> {
        let table = Arc::clone(&settings.table);
        self.settings = settings;
        let result = self
            .tracker
            .set_table(table, self.buffer.len_chars(), &mut self.overlays);
        self.note(result)
    }

    // -- Change commands ----------------------------------------------------

    /// Switch change highlighting on in `initial`.
    ///
    /// # Errors
    ///
    /// [`ChangeError::NoFaceForCategory`] from rendering.
    pub fn enable(&mut self, initial: InitialState) -> Result<(), ChangeError> {
        let result = self
            .tracker
            .enable(initial, self.buffer.len_chars(), &mut self.overlays);
        self.note(result)
    }

    /// Flip between showing and hiding changes.
    ///
    /// # Errors
    ///
    /// [`ChangeError::NoFaceForCategory`] from rendering.
    pub fn toggle(&mut self) -> Result<(), ChangeError> {
        let result = self.tracker.toggle(self.buffer.len_chars(), &mut self.overlays);
        self.note(result)
    }

    /// Switch change highlighting off and forget every change.
    pub fn disable(&mut self) {
        self.tracker.disable(&mut self.overlays);
    }

    /// Age every change one step.
    ///
    /// # Errors
    ///
    /// [`ChangeError::UnknownCategory`] or
    /// [`ChangeError::NoFaceForCategory`], after the rotation completed.
    pub fn rotate(&mut self) -> Result<(), ChangeError> {
        let result = self.tracker.rotate(self.buffer.len_chars(), &mut self.overlays);
        self.note(result)
    }

    /// Offset of the next change after `offset`.
    pub fn next_change(&mut self, offset: usize) -> Option<usize> {
        let found = self.tracker.next_change(offset);
        if found.is_none() {
            self.message = Some("no next change".to_string());
        }
        found
    }

    /// Offset of the previous change before `offset`.
    pub fn previous_change(&mut self, offset: usize) -> Option<usize> {
        let found = self.tracker.previous_change(offset);
        if found.is_none() {
            self.message = Some("no previous change".to_string());
        }
        found
    }

    /// Forget the changes inside `span`.
    ///
    /// # Errors
    ///
    /// [`ChangeError::ReadOnlyViolation`] on a read-only buffer.
    pub fn clear_region(&mut self, span: Span) -> Result<(), ChangeError> {
        let result = self
            .tracker
            .clear_region(span, &self.buffer, &mut self.overlays);
        self.note(result)
    }

    /// Compare with `other` and mark the differences in both. A read-only
    /// `other` is marked without recording anything.
    ///
    /// # Errors
    ///
    /// [`ChangeError::StaleComparisonTarget`] if either buffer has unsaved
    /// changes.
    pub fn compare(&mut self, other: &mut Self) -> Result<CompareSummary, ChangeError> {
        let aligner = self.settings.aligner;
        let result = diff::compare(
            CompareSide {
                buffer: &self.buffer,
                tracker: &mut self.tracker,
                layer: &mut self.overlays,
            },
            CompareSide {
                buffer: &other.buffer,
                tracker: &mut other.tracker,
                layer: &mut other.overlays,
            },
            &aligner,
            self.settings.initial_state,
        );
        if let Ok(summary) = &result {
            debug!(a = %self.name, b = %other.name, %summary, "comparison done");
            self.message = Some(summary.to_string());
        }
        self.note(result)
    }

    /// Compare with the file at `path`, loaded read-only.
    ///
    /// # Errors
    ///
    /// [`ChangeError::Buffer`] when the file can't be read, otherwise as
    /// [`compare`](Self::compare).
    pub fn compare_with_file(&mut self, path: &Path) -> Result<CompareSummary, ChangeError> {
        let loaded = Self::open(path, Arc::clone(&self.settings));
        let mut other = self.note(loaded)?;
        other.buffer.set_read_only(true);
        self.compare(&mut other)
    }

    // -- Editing ------------------------------------------------------------

    /// Group the following edits into one undo step until
    /// [`commit_transaction`](Self::commit_transaction).
    pub fn begin_transaction(&mut self, cursor: usize) {
        self.history.begin(cursor);
    }

    pub fn commit_transaction(&mut self, cursor: usize) {
        self.history.commit(cursor);
    }

    /// Insert `text` at `offset`.
    ///
    /// # Errors
    ///
    /// [`ChangeError::Buffer`] when the buffer refuses the edit, before
    /// anything changes. [`ChangeError::NoFaceForCategory`] after the edit.
    pub fn insert(&mut self, offset: usize, text: &str) -> Result<EditEvent, ChangeError> {
        self.edit(Span::at(offset, 0), text)
    }

    /// Delete the text in `span`.
    ///
    /// # Errors
    ///
    /// As [`insert`](Self::insert).
    pub fn delete(&mut self, span: Span) -> Result<EditEvent, ChangeError> {
        self.edit(span, "")
    }

    /// Replace the text in `span` with `text` in one mutation.
    ///
    /// # Errors
    ///
    /// As [`insert`](Self::insert).
    pub fn replace(&mut self, span: Span, text: &str) -> Result<EditEvent, ChangeError> {
        self.edit(span, text)
    }

    fn edit(&mut self, span: Span, text: &str) -> Result<EditEvent, ChangeError> {
        let len = self.buffer.len_chars();
        let removed = self
            .buffer
            .text(span)
            .ok_or(BufferError::OutOfBounds { offset: span.end, len });
        let removed = self.note(removed.map_err(ChangeError::from))?;
        if removed.is_empty() && text.is_empty() {
            return Ok(EditEvent::new(span.start, 0, 0));
        }

        let before = self
            .tracker
            .store()
            .snapshot(Span::at(span.start, span.len() + 1).clamp_to(len));
        let event = self.buffer.replace(span, text).map_err(ChangeError::from);
        let event = self.note(event)?;

        self.overlays.adjust(&event);
        let tracked = self.tracker.on_edit(&event, &self.buffer, &mut self.overlays);

        let after_span =
            Span::at(event.position, event.inserted + 1).clamp_to(self.buffer.len_chars());
        let after = self.tracker.store().snapshot(after_span);
        let standalone = !self.history.in_transaction();
        if standalone {
            self.history.begin(span.start);
        }
        self.history.record(Edit {
            offset: span.start,
            removed,
            inserted: text.to_string(),
            before,
            after,
        });
        if standalone {
            self.history.commit(event.position + event.inserted);
        }

        self.note(tracked)?;
        Ok(event)
    }

    /// Undo the last edit group, restoring the changes its text carried.
    /// Returns the cursor offset to restore.
    ///
    /// # Errors
    ///
    /// [`ChangeError::Buffer`] when the buffer is read-only, otherwise the
    /// first rendering error once the undo completed.
    pub fn undo(&mut self) -> Result<Option<usize>, ChangeError> {
        self.replay(true)
    }

    /// Redo the last undone edit group.
    ///
    /// # Errors
    ///
    /// As [`undo`](Self::undo).
    pub fn redo(&mut self) -> Result<Option<usize>, ChangeError> {
        self.replay(false)
    }

    fn replay(&mut self, undo: bool) -> Result<Option<usize>, ChangeError> {
        let Self {
            buffer,
            history,
            tracker,
            overlays,
            ..
        } = self;
        let mut first_error = None;
        let on_step = |buf: &Buffer, step: crate::history::ReplayStep<'_>| {
            overlays.adjust(&step.event);
            if let Err(err) = tracker.on_replay(&step.event, Some(step.tags), buf, overlays) {
                first_error.get_or_insert(err);
            }
        };
        let replayed = if undo {
            history.undo(buffer, on_step)
        } else {
            history.redo(buffer, on_step)
        };

        let result = match (replayed, first_error) {
            (Err(err), _) => Err(ChangeError::from(err)),
            (Ok(_), Some(err)) => Err(err),
            (Ok(cursor), None) => Ok(cursor),
        };
        if matches!(result, Ok(None)) {
            let which = if undo { "undo" } else { "redo" };
            self.message = Some(format!("no further {which} information"));
        }
        self.note(result)
    }

    // -- Saving -------------------------------------------------------------

    /// Write the buffer to its file. Ages every change afterwards when
    /// `rotate_on_save` is set.
    ///
    /// # Errors
    ///
    /// [`ChangeError::Buffer`] when the write fails (nothing is rotated),
    /// or a rotation error.
    pub fn save(&mut self) -> Result<(), ChangeError> {
        let saved = self.buffer.save().map_err(ChangeError::from);
        self.note(saved)?;
        self.after_save()
    }

    /// Write the buffer to `path` and make it the buffer's file.
    ///
    /// # Errors
    ///
    /// As [`save`](Self::save).
    pub fn save_as(&mut self, path: &Path) -> Result<(), ChangeError> {
        let saved = self.buffer.save_as(path).map_err(ChangeError::from);
        self.note(saved)?;
        if self.kind.is_none() {
            self.kind = detect_kind(path).map(str::to_string);
        }
        self.after_save()
    }

    fn after_save(&mut self) -> Result<(), ChangeError> {
        if let Some(path) = self.buffer.path() {
            self.message = Some(format!("wrote {}", path.display()));
        }
        if self.settings.rotate_on_save && self.tracker.state().is_on() {
            return self.rotate();
        }
        Ok(())
    }

    /// Put a failed result's error in the message area and pass it on.
    fn note<T>(&mut self, result: Result<T, ChangeError>) -> Result<T, ChangeError> {
        if let Err(err) = &result {
            self.message = Some(err.to_string());
        }
        result
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
