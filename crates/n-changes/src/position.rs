//! Text position and span types.
//!
//! The change engine works in **char offsets**: a single `usize` counting
//! Unicode scalar values from the start of the buffer. That is how `ropey`
//! indexes text, and it keeps interval arithmetic trivial. [`Span`] is the
//! half-open offset range every store, overlay and hunk is expressed in.
//!
//! [`Position`] (line, col) only exists for humans: region listings and status
//! messages convert offsets to positions through
//! [`Buffer::char_idx_to_pos`](crate::buffer::Buffer::char_idx_to_pos).
//! Display converts to 1-indexed; nothing else does.

use std::fmt;

// ---------------------------------------------------------------------------
// Position
// ---------------------------------------------------------------------------

/// A position in a text buffer: (line, column), both 0-indexed.
///
/// `col` is the char offset from the start of the line, **not** a byte offset.
///
/// # Ordering
///
/// Positions are ordered lexicographically: line first, then column.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Position {
    pub line: usize,
    pub col: usize,
}

impl Position {
    /// The origin — line 0, column 0.
    pub const ZERO: Self = Self { line: 0, col: 0 };

    /// Create a new position.
    #[inline]
    #[must_use]
    pub const fn new(line: usize, col: usize) -> Self {
        Self { line, col }
    }
}

impl Ord for Position {
    #[inline]
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.line
            .cmp(&other.line)
            .then(self.col.cmp(&other.col))
    }
}

impl PartialOrd for Position {
    #[inline]
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Debug for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Pos({}:{})", self.line, self.col)
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // 1-indexed for human display, matching Vim's `line:col` status.
        write!(f, "{}:{}", self.line + 1, self.col + 1)
    }
}

// ---------------------------------------------------------------------------
// Span
// ---------------------------------------------------------------------------

/// A half-open range of char offsets: `[start, end)`.
///
/// `start` is inclusive, `end` is exclusive. An empty span has
/// `start == end` and contains no offset. Spans are always normalized so that
/// `start <= end` — use [`Span::new`] which enforces this, or
/// [`Span::ordered`] on untrusted input.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    /// Create a span. Panics in debug if `start > end`.
    #[inline]
    #[must_use]
    pub const fn new(start: usize, end: usize) -> Self {
        debug_assert!(start <= end, "Span::new requires start <= end");
        Self { start, end }
    }

    /// Create a span from two arbitrary offsets, swapping if needed.
    #[inline]
    #[must_use]
    pub const fn ordered(a: usize, b: usize) -> Self {
        if a <= b {
            Self { start: a, end: b }
        } else {
            Self { start: b, end: a }
        }
    }

    /// A span of `len` chars starting at `start`.
    #[inline]
    #[must_use]
    pub const fn at(start: usize, len: usize) -> Self {
        Self {
            start,
            end: start + len,
        }
    }

    /// Number of offsets covered.
    #[inline]
    #[must_use]
    pub const fn len(self) -> usize {
        self.end - self.start
    }

    /// True when the span covers no offset.
    #[inline]
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.start == self.end
    }

    /// True when `offset` falls within `[start, end)`.
    #[inline]
    #[must_use]
    pub const fn contains(self, offset: usize) -> bool {
        offset >= self.start && offset < self.end
    }

    /// True when the two spans share at least one offset.
    ///
    /// Touching spans (`a.end == b.start`) do not intersect, and an empty span
    /// intersects nothing.
    #[inline]
    #[must_use]
    pub const fn intersects(self, other: Self) -> bool {
        !self.is_empty() && !other.is_empty() && self.start < other.end && other.start < self.end
    }

    /// The common part of two spans, or `None` when they don't intersect.
    #[must_use]
    pub fn intersection(self, other: Self) -> Option<Self> {
        let start = self.start.max(other.start);
        let end = self.end.min(other.end);
        (start < end).then_some(Self { start, end })
    }

    /// Clamp both ends to `limit` (typically the buffer length).
    #[inline]
    #[must_use]
    pub fn clamp_to(self, limit: usize) -> Self {
        Self {
            start: self.start.min(limit),
            end: self.end.min(limit),
        }
    }
}

impl fmt::Debug for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Span({}..{})", self.start, self.end)
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.start, self.end)
    }
}

impl From<std::ops::Range<usize>> for Span {
    fn from(range: std::ops::Range<usize>) -> Self {
        Self::ordered(range.start, range.end)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    // -- Position -----------------------------------------------------------

    #[test]
    fn position_ordering_different_lines() {
        let a = Position::new(0, 100);
        let b = Position::new(1, 0);
        assert!(a < b);
    }

    #[test]
    fn position_debug_format() {
        assert_eq!(format!("{:?}", Position::new(2, 5)), "Pos(2:5)");
    }

    #[test]
    fn position_display_is_1_indexed() {
        assert_eq!(format!("{}", Position::ZERO), "1:1");
        assert_eq!(format!("{}", Position::new(9, 14)), "10:15");
    }

    // -- Span construction --------------------------------------------------

    #[test]
    fn span_ordered_needs_swap() {
        assert_eq!(Span::ordered(7, 2), Span::new(2, 7));
    }

    #[test]
    fn span_at() {
        assert_eq!(Span::at(5, 3), Span::new(5, 8));
        assert!(Span::at(5, 0).is_empty());
    }

    #[test]
    fn span_from_range() {
        assert_eq!(Span::from(1..4), Span::new(1, 4));
    }

    // -- Span properties ----------------------------------------------------

    #[test]
    fn span_contains_is_half_open() {
        let s = Span::new(2, 5);
        assert!(!s.contains(1));
        assert!(s.contains(2));
        assert!(s.contains(4));
        assert!(!s.contains(5));
    }

    #[test]
    fn empty_span_contains_nothing() {
        assert!(!Span::new(3, 3).contains(3));
    }

    #[test]
    fn touching_spans_do_not_intersect() {
        assert!(!Span::new(0, 3).intersects(Span::new(3, 6)));
        assert!(Span::new(0, 4).intersects(Span::new(3, 6)));
    }

    #[test]
    fn empty_span_intersects_nothing() {
        assert!(!Span::new(3, 3).intersects(Span::new(0, 10)));
        assert!(!Span::new(0, 10).intersects(Span::new(3, 3)));
        assert!(!Span::new(0, 0).intersects(Span::new(0, 5)));
        assert!(!Span::new(5, 5).intersects(Span::new(5, 5)));
    }

    #[test]
    fn intersection_clips() {
        assert_eq!(
            Span::new(0, 10).intersection(Span::new(4, 20)),
            Some(Span::new(4, 10))
        );
        assert_eq!(Span::new(0, 4).intersection(Span::new(4, 8)), None);
    }

    #[test]
    fn clamp_to_limit() {
        assert_eq!(Span::new(3, 12).clamp_to(10), Span::new(3, 10));
        assert_eq!(Span::new(11, 12).clamp_to(10), Span::new(10, 10));
    }

    // -- Display ------------------------------------------------------------

    #[test]
    fn span_formats() {
        assert_eq!(format!("{:?}", Span::new(1, 2)), "Span(1..2)");
        assert_eq!(format!("{}", Span::new(1, 2)), "[1, 2)");
    }
}
