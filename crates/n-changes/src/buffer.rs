//! Text buffer — the text whose changes are tracked.
//!
//! A `Buffer` wraps a [`ropey::Rope`] with offset-based editing, file I/O, and
//! the metadata the change engine consults: the modified flag (a comparison
//! refuses stale snapshots) and the read-only flag (read-only buffers are
//! annotated transiently).
//!
//! # Design choices
//!
//! - **Offsets are char indices**, exactly as ropey counts them. Every
//!   mutation returns the [`EditEvent`] describing it, so the host can forward
//!   it to a tracker without recomputing anything.
//!
//! - **Text is saved exactly as held.** Offsets in the store and in the
//!   overlays refer to the rope's chars, `\r` included.
//!
//! - **No undo/redo here.** Edit history is a separate concern
//!   ([`History`](crate::history::History)) that wraps buffer operations.

use std::fmt;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use ropey::Rope;

use crate::edit::EditEvent;
use crate::error::BufferError;
use crate::position::{Position, Span};

// ---------------------------------------------------------------------------
// Buffer
// ---------------------------------------------------------------------------

/// A rope plus the path, modified and read-only flags.
pub struct Buffer {
    rope: Rope,
    path: Option<PathBuf>,
    modified: bool,
    read_only: bool,
}

impl Buffer {
    // -- Construction -------------------------------------------------------

    /// Create an empty, writable buffer with no file path.
    #[must_use]
    pub fn new() -> Self {
        Self {
            rope: Rope::new(),
            path: None,
            modified: false,
            read_only: false,
        }
    }

    /// Create a buffer from a string. The buffer starts unmodified.
    #[must_use]
    pub fn from_text(text: &str) -> Self {
        Self {
            rope: Rope::from_str(text),
            ..Self::new()
        }
    }

    /// Load a buffer from a file.
    ///
    /// # Errors
    ///
    /// Returns [`BufferError::Io`] if the file cannot be read or contains
    /// invalid UTF-8.
    pub fn from_file(path: &Path) -> Result<Self, BufferError> {
        let text = fs::read_to_string(path)?;
        Ok(Self {
            path: Some(path.to_path_buf()),
            ..Self::from_text(&text)
        })
    }

    // -- Text access --------------------------------------------------------

    /// Total character count (Unicode scalar values, not bytes).
    #[inline]
    #[must_use]
    pub fn len_chars(&self) -> usize {
        self.rope.len_chars()
    }

    /// True when the buffer contains no text.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rope.len_chars() == 0
    }

    /// The char at `offset`, or `None` past the end.
    #[must_use]
    pub fn char_at(&self, offset: usize) -> Option<char> {
        (offset < self.rope.len_chars()).then(|| self.rope.char(offset))
    }

    /// The text of `span` as a `String`. Returns `None` if the span reaches
    /// past the end of the buffer.
    #[must_use]
    pub fn text(&self, span: Span) -> Option<String> {
        (span.end <= self.rope.len_chars()).then(|| self.rope.slice(span.start..span.end).to_string())
    }

    /// Collect all text into a `String`.
    #[must_use]
    pub fn contents(&self) -> String {
        self.rope.to_string()
    }

    // -- Coordinate conversion ----------------------------------------------

    /// Convert an absolute char index to a `Position` (line, col).
    ///
    /// Returns `None` if `char_idx > len_chars()`. An index equal to
    /// `len_chars()` is the position just past the last character.
    #[must_use]
    pub fn char_idx_to_pos(&self, char_idx: usize) -> Option<Position> {
        if char_idx > self.rope.len_chars() {
            return None;
        }
        let line = self.rope.char_to_line(char_idx);
        let line_start = self.rope.line_to_char(line);
        Some(Position::new(line, char_idx - line_start))
    }

    // -- Editing ------------------------------------------------------------

    /// Insert text at `offset`.
    ///
    /// # Errors
    ///
    /// [`BufferError::ReadOnly`] on a read-only buffer,
    /// [`BufferError::OutOfBounds`] if `offset > len_chars()`.
    pub fn insert(&mut self, offset: usize, text: &str) -> Result<EditEvent, BufferError> {
        self.check_writable()?;
        self.check_offset(offset)?;
        self.rope.insert(offset, text);
        self.modified = true;
        Ok(EditEvent::insertion(offset, text.chars().count()))
    }

    /// Delete the text in `span`. An empty span is a no-op event.
    ///
    /// # Errors
    ///
    /// [`BufferError::ReadOnly`] on a read-only buffer,
    /// [`BufferError::OutOfBounds`] if the span reaches past the end.
    pub fn delete(&mut self, span: Span) -> Result<EditEvent, BufferError> {
        self.check_writable()?;
        self.check_offset(span.end)?;
        if !span.is_empty() {
            self.rope.remove(span.start..span.end);
            self.modified = true;
        }
        Ok(EditEvent::deletion(span.start, span.len()))
    }

    /// Replace the text in `span` with `text` as one mutation.
    ///
    /// # Errors
    ///
    /// Same as [`delete`](Self::delete).
    pub fn replace(&mut self, span: Span, text: &str) -> Result<EditEvent, BufferError> {
        self.check_writable()?;
        self.check_offset(span.end)?;
        self.rope.remove(span.start..span.end);
        self.rope.insert(span.start, text);
        self.modified = true;
        Ok(EditEvent::new(span.start, span.len(), text.chars().count()))
    }

    fn check_writable(&self) -> Result<(), BufferError> {
        if self.read_only {
            Err(BufferError::ReadOnly)
        } else {
            Ok(())
        }
    }

    fn check_offset(&self, offset: usize) -> Result<(), BufferError> {
        let len = self.rope.len_chars();
        if offset > len {
            Err(BufferError::OutOfBounds { offset, len })
        } else {
            Ok(())
        }
    }

    // -- Metadata -----------------------------------------------------------

    /// The file path this buffer is associated with, if any.
    #[inline]
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Set the file path for this buffer.
    #[inline]
    pub fn set_path(&mut self, path: PathBuf) {
        self.path = Some(path);
    }

    /// True if the buffer has been modified since it was loaded or saved.
    #[inline]
    #[must_use]
    pub const fn is_modified(&self) -> bool {
        self.modified
    }

    /// True if the buffer refuses text mutation.
    #[inline]
    #[must_use]
    pub const fn is_read_only(&self) -> bool {
        self.read_only
    }

    /// Make the buffer read-only (or writable again).
    #[inline]
    pub const fn set_read_only(&mut self, read_only: bool) {
        self.read_only = read_only;
    }

    // -- File I/O -----------------------------------------------------------

    /// Save the buffer to its associated file path.
    ///
    /// # Errors
    ///
    /// [`BufferError::NoPath`] if no path is set, [`BufferError::Io`] if the
    /// write fails.
    pub fn save(&mut self) -> Result<(), BufferError> {
        let path = self.path.clone().ok_or(BufferError::NoPath)?;
        self.save_as(&path)
    }

    /// Save the buffer to a specific path, updating the stored path.
    ///
    /// Clears the modified flag on success.
    ///
    /// # Errors
    ///
    /// [`BufferError::Io`] if the write fails.
    pub fn save_as(&mut self, path: &Path) -> Result<(), BufferError> {
        let mut writer = io::BufWriter::new(fs::File::create(path)?);
        self.rope.write_to(&mut writer)?;
        writer.flush()?;
        self.path = Some(path.to_path_buf());
        self.modified = false;
        Ok(())
    }
}

impl Default for Buffer {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Buffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Buffer")
            .field("chars", &self.len_chars())
            .field("modified", &self.modified)
            .field("read_only", &self.read_only)
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
