//! Annotation store — the authoritative record of which text has changed.
//!
//! The store maps char-offset spans to a [`Category`]. It is kept
//! **partitioned** at all times:
//!
//! - regions are non-empty and pairwise non-overlapping,
//! - regions are sorted by `start`,
//! - no two touching regions share a category (they are coalesced).
//!
//! So a maximal run of same-category offsets is always exactly one
//! [`ChangeRegion`]. Every mutating method restores the partition before it
//! returns; [`AnnotationStore::is_partitioned`] checks it.
//!
//! # Representation
//!
//! A sorted `Vec<ChangeRegion>`. Lookups are binary searches
//! (`partition_point`), mutations splice the handful of regions that
//! intersect the span. Change sets are small compared to the text, so a flat
//! vector beats a tree here.
//!
//! # Following the text
//!
//! The store doesn't own the text, so the owner reports every mutation
//! through [`adjust`](AnnotationStore::adjust). Inserted text never inherits
//! a tag from its neighbours: an insertion strictly inside a region splits it
//! around the new text. Deleted text takes its tags with it.

use tracing::warn;

use crate::category::{Category, CategoryTable};
use crate::edit::EditEvent;
use crate::error::ChangeError;
use crate::position::Span;

// ---------------------------------------------------------------------------
// ChangeRegion
// ---------------------------------------------------------------------------

/// A maximal run of offsets sharing one category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChangeRegion {
    pub span: Span,
    pub category: Category,
}

impl ChangeRegion {
    #[inline]
    #[must_use]
    pub const fn new(span: Span, category: Category) -> Self {
        Self { span, category }
    }

    /// The same region moved right by `delta` chars.
    #[inline]
    #[must_use]
    pub const fn shifted(self, delta: usize) -> Self {
        Self {
            span: Span::new(self.span.start + delta, self.span.end + delta),
            category: self.category,
        }
    }
}

/// Tags of a stretch of text, relative to its start. `extent` is the length
/// of the stretch, so restoring also clears what was untagged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagSnapshot {
    pub extent: usize,
    pub regions: Vec<ChangeRegion>,
}

// ---------------------------------------------------------------------------
// AnnotationStore
// ---------------------------------------------------------------------------

/// Partitioned span → category map for one buffer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnnotationStore {
    regions: Vec<ChangeRegion>,
}

impl AnnotationStore {
    /// Create an empty store.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            regions: Vec::new(),
        }
    }

    // -- Reads --------------------------------------------------------------

    /// All regions in ascending order.
    #[inline]
    #[must_use]
    pub fn regions(&self) -> &[ChangeRegion] {
        &self.regions
    }

    /// Number of regions.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.regions.len()
    }

    /// True when nothing is tagged.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    /// All regions intersecting `span`, clipped to it, in ascending order.
    #[must_use]
    pub fn query(&self, span: Span) -> Vec<ChangeRegion> {
        let (lo, hi) = self.intersecting(span);
        self.regions[lo..hi]
            .iter()
            .filter_map(|r| {
                r.span
                    .intersection(span)
                    .map(|clipped| ChangeRegion::new(clipped, r.category))
            })
            .collect()
    }

    /// The region containing `offset`, unclipped.
    #[must_use]
    pub fn region_at(&self, offset: usize) -> Option<ChangeRegion> {
        let idx = self.regions.partition_point(|r| r.span.end <= offset);
        self.regions
            .get(idx)
            .copied()
            .filter(|r| r.span.contains(offset))
    }

    /// The category at `offset`, if tagged.
    #[must_use]
    pub fn category_at(&self, offset: usize) -> Option<Category> {
        self.region_at(offset).map(|r| r.category)
    }

    /// The first tagged offset `>= offset`.
    #[must_use]
    pub fn first_tagged_at_or_after(&self, offset: usize) -> Option<usize> {
        let idx = self.regions.partition_point(|r| r.span.end <= offset);
        self.regions.get(idx).map(|r| r.span.start.max(offset))
    }

    /// The last tagged offset `< offset`.
    #[must_use]
    pub fn last_tagged_before(&self, offset: usize) -> Option<usize> {
        let idx = self.regions.partition_point(|r| r.span.start < offset);
        let region = self.regions[..idx].last()?;
        Some(region.span.end.min(offset) - 1)
    }

    /// Check the partition invariant with a full scan.
    #[must_use]
    pub fn is_partitioned(&self) -> bool {
        self.regions.iter().all(|r| !r.span.is_empty())
            && self.regions.windows(2).all(|pair| {
                let (a, b) = (pair[0], pair[1]);
                a.span.end < b.span.start
                    || (a.span.end == b.span.start && a.category != b.category)
            })
    }

    // -- Mutations ----------------------------------------------------------

    /// Categorize `span` as `category`, overwriting whatever was there.
    /// Coalesces with touching same-category neighbours. Empty spans are
    /// ignored.
    pub fn tag(&mut self, span: Span, category: Category) {
        if span.is_empty() {
            return;
        }
        let mut idx = self.carve(span);
        self.regions.insert(idx, ChangeRegion::new(span, category));

        if let Some(next) = self.regions.get(idx + 1).copied() {
            if next.span.start == span.end && next.category == category {
                self.regions[idx].span.end = next.span.end;
                self.regions.remove(idx + 1);
            }
        }
        if idx > 0 {
            let prev = self.regions[idx - 1];
            if prev.span.end == span.start && prev.category == category {
                self.regions[idx - 1].span.end = self.regions[idx].span.end;
                self.regions.remove(idx);
                idx -= 1;
            }
        }

        debug_assert!(self.is_partitioned(), "tag broke partition at {idx}");
    }

    /// Remove any categorization inside `span`, splitting regions that only
    /// partly overlap it.
    pub fn untag(&mut self, span: Span) {
        if span.is_empty() {
            return;
        }
        self.carve(span);
        debug_assert!(self.is_partitioned());
    }

    /// Drop every region.
    pub fn clear(&mut self) {
        self.regions.clear();
    }

    /// Advance every region one aging step through `table`, then coalesce
    /// regions that now touch with equal categories.
    ///
    /// Regions whose category is not in `table` keep their category; the
    /// rest of the pass completes and the new partition is committed before
    /// the first such category is reported.
    ///
    /// # Errors
    ///
    /// [`ChangeError::UnknownCategory`] for the first region that could not be
    /// aged.
    pub fn rotate(&mut self, table: &CategoryTable) -> Result<(), ChangeError> {
        let mut unknown = None;
        let aged: Vec<ChangeRegion> = self
            .regions
            .iter()
            .map(|r| match table.advance(r.category) {
                Ok(category) => ChangeRegion::new(r.span, category),
                Err(err) => {
                    warn!(span = %r.span, %err, "region left unaged");
                    unknown.get_or_insert(r.category);
                    *r
                }
            })
            .collect();

        self.regions = coalesce(aged);
        debug_assert!(self.is_partitioned());

        unknown.map_or(Ok(()), |category| Err(ChangeError::UnknownCategory(category)))
    }

    /// Shift regions to follow a text mutation.
    ///
    /// Regions entirely before the edit are untouched, regions after it move
    /// by `inserted - removed`. The removed text's tags disappear and the
    /// inserted text is untagged, so a region the edit falls inside is split
    /// around it.
    pub fn adjust(&mut self, event: &EditEvent) {
        if event.is_noop() {
            return;
        }
        let removed_end = event.position + event.removed;
        let first_affected = self.regions.partition_point(|r| r.span.end <= event.position);
        let tail = self.regions.split_off(first_affected);

        let mut shifted = Vec::with_capacity(tail.len() + 1);
        for region in tail {
            let Span { start, end } = region.span;
            if start < event.position {
                shifted.push(ChangeRegion::new(
                    Span::new(start, end.min(event.position)),
                    region.category,
                ));
            }
            if end > removed_end {
                let kept_start = start.max(removed_end);
                shifted.push(ChangeRegion::new(
                    Span::new(
                        kept_start - event.removed + event.inserted,
                        end - event.removed + event.inserted,
                    ),
                    region.category,
                ));
            }
        }

        // A deletion can bring two equal neighbours together, including the
        // last untouched region.
        let boundary = self.regions.pop();
        let mut rest = Vec::with_capacity(shifted.len() + 1);
        rest.extend(boundary);
        rest.extend(shifted);
        self.regions.extend(coalesce(rest));

        debug_assert!(self.is_partitioned(), "adjust broke partition for {event:?}");
    }

    /// Capture the tags of `span` relative to its start.
    #[must_use]
    pub fn snapshot(&self, span: Span) -> TagSnapshot {
        let regions = self
            .query(span)
            .into_iter()
            .map(|r| {
                ChangeRegion::new(
                    Span::new(r.span.start - span.start, r.span.end - span.start),
                    r.category,
                )
            })
            .collect();
        TagSnapshot {
            extent: span.len(),
            regions,
        }
    }

    /// Put back a snapshot at `offset`: the `extent` chars from `offset` end
    /// up tagged exactly as recorded (undo/redo replay).
    pub fn restore(&mut self, offset: usize, snapshot: &TagSnapshot) {
        self.untag(Span::at(offset, snapshot.extent));
        for region in &snapshot.regions {
            let region = region.shifted(offset);
            self.tag(region.span, region.category);
        }
    }

    // -- Internals ----------------------------------------------------------

    /// Index range of regions intersecting `span`.
    fn intersecting(&self, span: Span) -> (usize, usize) {
        if span.is_empty() {
            return (0, 0);
        }
        let lo = self.regions.partition_point(|r| r.span.end <= span.start);
        let hi = self.regions.partition_point(|r| r.span.start < span.end);
        (lo, hi.max(lo))
    }

    /// Remove all coverage of `span`, keeping the parts of partially
    /// overlapping regions outside it. Returns the index where a region
    /// starting at `span.start` belongs.
    fn carve(&mut self, span: Span) -> usize {
        let (lo, hi) = self.intersecting(span);
        if lo == hi {
            return self.regions.partition_point(|r| r.span.start < span.start);
        }

        let first = self.regions[lo];
        let last = self.regions[hi - 1];
        let mut kept = Vec::with_capacity(2);
        if first.span.start < span.start {
            kept.push(ChangeRegion::new(
                Span::new(first.span.start, span.start),
                first.category,
            ));
        }
        if last.span.end > span.end {
            kept.push(ChangeRegion::new(
                Span::new(span.end, last.span.end),
                last.category,
            ));
        }

        let insert_at = lo + usize::from(first.span.start < span.start);
        self.regions.splice(lo..hi, kept);
        insert_at
    }
}

/// Merge touching same-category neighbours of an already sorted,
/// non-overlapping sequence.
fn coalesce(regions: Vec<ChangeRegion>) -> Vec<ChangeRegion> {
    let mut out: Vec<ChangeRegion> = Vec::with_capacity(regions.len());
    for region in regions {
        if region.span.is_empty() {
            continue;
        }
        match out.last_mut() {
            Some(prev) if prev.span.end == region.span.start && prev.category == region.category => {
                prev.span.end = region.span.end;
            }
            _ => out.push(region),
        }
    }
    out
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
