//! Diff bridge — seed the change annotation of two buffers from a comparison.
//!
//! An [`Aligner`] compares two texts and returns [`Hunk`]s. The bridge turns
//! every hunk into one synthetic [`EditEvent`] per side, as if that side had
//! been produced from the other by an edit, and runs it through the side's
//! classifier:
//!
//! | Side | Event                                                        |
//! |------|--------------------------------------------------------------|
//! | A    | at `a_start`: removed `b_end - b_start`, inserted `a_end - a_start` |
//! | B    | at `b_start`: removed `a_end - a_start`, inserted `b_end - b_start` |
//!
//! Text present on one side only becomes `New` there and leaves a `Deleted`
//! marker on the other. Nothing is shifted: neither text changes.
//!
//! [`SimilarAligner`] is the built-in aligner, backed by the `similar` crate.

use std::fmt;

use serde::Deserialize;
use similar::{DiffTag, TextDiff};
use tracing::debug;

use crate::buffer::Buffer;
use crate::classify::Classification;
use crate::edit::EditEvent;
use crate::error::ChangeError;
use crate::mode::InitialState;
use crate::overlay::RenderLayer;
use crate::tracker::{ChangeTracker, Persistence};

// ---------------------------------------------------------------------------
// Side
// ---------------------------------------------------------------------------

/// One of the two compared texts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    A,
    B,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::A => f.write_str("A"),
            Self::B => f.write_str("B"),
        }
    }
}

// ---------------------------------------------------------------------------
// Hunk
// ---------------------------------------------------------------------------

/// A pair of corresponding differing char ranges, `[a_start, a_end)` in A
/// and `[b_start, b_end)` in B. Either side may be empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Hunk {
    pub a_start: usize,
    pub a_end: usize,
    pub b_start: usize,
    pub b_end: usize,
}

impl Hunk {
    #[inline]
    #[must_use]
    pub const fn new(a_start: usize, a_end: usize, b_start: usize, b_end: usize) -> Self {
        Self {
            a_start,
            a_end,
            b_start,
            b_end,
        }
    }

    #[inline]
    #[must_use]
    pub const fn a_len(self) -> usize {
        self.a_end - self.a_start
    }

    #[inline]
    #[must_use]
    pub const fn b_len(self) -> usize {
        self.b_end - self.b_start
    }

    /// The hunk moved by `a` chars on side A and `b` chars on side B.
    #[inline]
    #[must_use]
    pub const fn offset_by(self, a: usize, b: usize) -> Self {
        Self::new(self.a_start + a, self.a_end + a, self.b_start + b, self.b_end + b)
    }

    /// The synthetic edit that turns B into A at this hunk, seen from `side`.
    #[must_use]
    pub const fn event_for(self, side: Side) -> EditEvent {
        match side {
            Side::A => EditEvent::new(self.a_start, self.b_len(), self.a_len()),
            Side::B => EditEvent::new(self.b_start, self.a_len(), self.b_len()),
        }
    }
}

// ---------------------------------------------------------------------------
// Aligner
// ---------------------------------------------------------------------------

/// A two-way text comparison engine.
pub trait Aligner {
    /// Differing regions of `a` and `b`, ascending, in char offsets.
    fn align(&self, a: &str, b: &str) -> Vec<Hunk>;

    /// Optionally split `hunk` into finer hunks. `None` keeps it whole.
    fn refine(&self, a: &str, b: &str, hunk: &Hunk) -> Option<Vec<Hunk>>;
}

/// Unit the built-in aligner compares in.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    #[default]
    Lines,
    Chars,
}

/// [`Aligner`] backed by `similar`'s Myers diff.
///
/// With [`Granularity::Lines`] each differing line block is a hunk; when
/// `refine` is set, blocks changed on both sides are narrowed down with a
/// char diff of the two blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimilarAligner {
    pub granularity: Granularity,
    pub refine: bool,
}

impl SimilarAligner {
    #[must_use]
    pub const fn new(granularity: Granularity, refine: bool) -> Self {
        Self { granularity, refine }
    }

    /// Char-level comparison, no refinement needed.
    #[must_use]
    pub const fn chars() -> Self {
        Self::new(Granularity::Chars, false)
    }
}

impl Default for SimilarAligner {
    fn default() -> Self {
        Self::new(Granularity::Lines, true)
    }
}

impl Aligner for SimilarAligner {
    fn align(&self, a: &str, b: &str) -> Vec<Hunk> {
        match self.granularity {
            Granularity::Lines => hunks_of(&TextDiff::from_lines(a, b)),
            Granularity::Chars => hunks_of(&TextDiff::from_chars(a, b)),
        }
    }

    fn refine(&self, a: &str, b: &str, hunk: &Hunk) -> Option<Vec<Hunk>> {
        if !self.refine
            || self.granularity == Granularity::Chars
            || hunk.a_len() == 0
            || hunk.b_len() == 0
        {
            return None;
        }
        let old = char_slice(a, hunk.a_start, hunk.a_end);
        let new = char_slice(b, hunk.b_start, hunk.b_end);
        let refined = hunks_of(&TextDiff::from_chars(old, new))
            .into_iter()
            .map(|h| h.offset_by(hunk.a_start, hunk.b_start))
            .collect();
        Some(refined)
    }
}

/// Collapse a diff into hunks, merging runs of non-equal ops.
fn hunks_of(diff: &TextDiff<'_, '_, '_, str>) -> Vec<Hunk> {
    let old = token_offsets(diff.old_slices());
    let new = token_offsets(diff.new_slices());

    let mut hunks = Vec::new();
    let mut pending: Option<Hunk> = None;
    for op in diff.ops() {
        if op.tag() == DiffTag::Equal {
            hunks.extend(pending.take());
            continue;
        }
        let (o, n) = (op.old_range(), op.new_range());
        let hunk = Hunk::new(old[o.start], old[o.end], new[n.start], new[n.end]);
        pending = Some(pending.map_or(hunk, |p| {
            Hunk::new(p.a_start, hunk.a_end, p.b_start, hunk.b_end)
        }));
    }
    hunks.extend(pending);
    hunks
}

/// Char offset of every token boundary: `out[i]` is where token `i` starts.
fn token_offsets(tokens: &[&str]) -> Vec<usize> {
    let mut out = Vec::with_capacity(tokens.len() + 1);
    let mut acc = 0;
    out.push(acc);
    for token in tokens {
        acc += token.chars().count();
        out.push(acc);
    }
    out
}

fn char_slice(s: &str, start: usize, end: usize) -> &str {
    let byte = |idx: usize| s.char_indices().nth(idx).map_or(s.len(), |(b, _)| b);
    &s[byte(start)..byte(end)]
}

// ---------------------------------------------------------------------------
// Bridge
// ---------------------------------------------------------------------------

/// One side of a comparison: the text, its tracker and its rendering layer.
pub struct CompareSide<'a> {
    pub buffer: &'a Buffer,
    pub tracker: &'a mut ChangeTracker,
    pub layer: &'a mut dyn RenderLayer,
}

impl CompareSide<'_> {
    fn persistence(&self) -> Persistence {
        if self.buffer.is_read_only() {
            Persistence::Transient
        } else {
            Persistence::Persistent
        }
    }

    fn apply(&mut self, event: &EditEvent, first_error: &mut Option<ChangeError>) -> bool {
        let persistence = self.persistence();
        match self
            .tracker
            .classify_event(event, persistence, self.buffer, self.layer)
        {
            Ok(classification) => classification != Classification::Unchanged,
            Err(err) => {
                first_error.get_or_insert(err);
                false
            }
        }
    }
}

/// What a comparison produced.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CompareSummary {
    /// Number of hunks applied, after refinement.
    pub hunks: usize,
    /// Changes marked on side A.
    pub a_changes: usize,
    /// Changes marked on side B.
    pub b_changes: usize,
}

impl fmt::Display for CompareSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.hunks == 0 {
            return f.write_str("no differences");
        }
        write!(
            f,
            "{} difference{} ({} marked in A, {} in B)",
            self.hunks,
            if self.hunks == 1 { "" } else { "s" },
            self.a_changes,
            self.b_changes
        )
    }
}

/// Compare two buffers and mark their differences as changes.
///
/// Both buffers must be unmodified. Sides that are `Off` are switched on in
/// `initial`; existing changes on both sides are dropped first so the result
/// shows the comparison only. A read-only side is marked transiently.
///
/// # Errors
///
/// [`ChangeError::StaleComparisonTarget`] when a buffer has unsaved
/// changes, before anything is touched. Otherwise the first rendering
/// error, after every hunk has been applied.
pub fn compare<'a>(
    mut a: CompareSide<'a>,
    mut b: CompareSide<'a>,
    aligner: &dyn Aligner,
    initial: InitialState,
) -> Result<CompareSummary, ChangeError> {
    if a.buffer.is_modified() {
        return Err(ChangeError::StaleComparisonTarget { side: Side::A });
    }
    if b.buffer.is_modified() {
        return Err(ChangeError::StaleComparisonTarget { side: Side::B });
    }

    let mut first_error = None;
    for side in [&mut a, &mut b] {
        side.tracker.reset(side.layer);
        if let Err(err) = side.tracker.enable(initial, side.buffer.len_chars(), side.layer) {
            first_error.get_or_insert(err);
        }
    }

    let a_text = a.buffer.contents();
    let b_text = b.buffer.contents();
    let mut summary = CompareSummary::default();

    for hunk in aligner.align(&a_text, &b_text) {
        let pieces = aligner
            .refine(&a_text, &b_text, &hunk)
            .unwrap_or_else(|| vec![hunk]);
        for piece in pieces {
            summary.hunks += 1;
            if a.apply(&piece.event_for(Side::A), &mut first_error) {
                summary.a_changes += 1;
            }
            if b.apply(&piece.event_for(Side::B), &mut first_error) {
                summary.b_changes += 1;
            }
        }
    }

    debug!(
        hunks = summary.hunks,
        a = summary.a_changes,
        b = summary.b_changes,
        "compared buffers"
    );
    first_error.map_or(Ok(summary), Err)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
