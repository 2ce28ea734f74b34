//! Per-buffer change tracking engine.
//!
//! [`ChangeTracker`] ties the pieces together for one buffer: it owns the
//! [`AnnotationStore`] and the [`ModeState`], shares the [`CategoryTable`],
//! and drives the classifier and the reconciler against whatever
//! [`RenderLayer`] the host hands it.
//!
//! # Edit flow
//!
//! For every mutation the host calls [`on_edit`](ChangeTracker::on_edit)
//! *after* the text changed (and after it shifted its own overlays):
//!
//! 1. the store is shifted to follow the text,
//! 2. a fresh edit is classified and tagged, a replayed edit gets its
//!    recorded tags back instead,
//! 3. in `Active`, the touched span is reconciled.
//!
//! Comparison results come in through
//! [`classify_event`](ChangeTracker::classify_event), which classifies without
//! shifting anything since the compared texts do not change.

use std::sync::Arc;

use tracing::debug;

use crate::buffer::Buffer;
use crate::category::CategoryTable;
use crate::classify::{Classification, classify};
use crate::edit::EditEvent;
use crate::error::ChangeError;
use crate::fixup::{clear_owned, fixup};
use crate::mode::{InitialState, ModeState};
use crate::navigate::{next_change_from, previous_change_from};
use crate::overlay::RenderLayer;
use crate::position::Span;
use crate::store::{AnnotationStore, TagSnapshot};

/// Where a classification ends up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Persistence {
    /// Written to the store, then reconciled.
    Persistent,
    /// Drawn straight into the rendering layer, store untouched. Used for
    /// read-only comparison targets.
    Transient,
}

/// Change tracking state for one buffer.
#[derive(Debug, Clone)]
pub struct ChangeTracker {
    store: AnnotationStore,
    state: ModeState,
    table: Arc<CategoryTable>,
    watch_pending: bool,
}

impl ChangeTracker {
    /// A tracker in `Off` with an empty store.
    #[must_use]
    pub fn new(table: Arc<CategoryTable>) -> Self {
        Self {
            store: AnnotationStore::new(),
            state: ModeState::Off,
            table,
            watch_pending: false,
        }
    }

    #[inline]
    #[must_use]
    pub const fn store(&self) -> &AnnotationStore {
        &self.store
    }

    #[inline]
    #[must_use]
    pub const fn state(&self) -> ModeState {
        self.state
    }

    #[inline]
    #[must_use]
    pub fn table(&self) -> &CategoryTable {
        &self.table
    }

    /// Swap in a rebuilt category table and redraw.
    ///
    /// # Errors
    ///
    /// [`ChangeError::NoFaceForCategory`] when the new table can't style a
    /// region the store already holds.
    pub fn set_table(
        &mut self,
        table: Arc<CategoryTable>,
        text_len: usize,
        layer: &mut dyn RenderLayer,
    ) -> Result<(), ChangeError> {
        self.table = table;
        if self.state.renders() {
            self.render_all(text_len, layer)?;
        }
        Ok(())
    }

    // -- Edit notifications -------------------------------------------------

    /// Handle one mutation of `buffer`'s text.
    ///
    /// Replayed events (undo/redo) are shifted and reconciled but not
    /// classified. Use [`on_replay`](Self::on_replay) to hand back the tags
    /// the replayed text carried.
    ///
    /// # Errors
    ///
    /// [`ChangeError::ReadOnlyViolation`] for a fresh edit reported on a
    /// read-only buffer, [`ChangeError::NoFaceForCategory`] from rendering.
    pub fn on_edit(
        &mut self,
        event: &EditEvent,
        buffer: &Buffer,
        layer: &mut dyn RenderLayer,
    ) -> Result<(), ChangeError> {
        self.on_replay(event, None, buffer, layer)
    }

    /// Like [`on_edit`](Self::on_edit), putting `restored` back at
    /// `event.position` when the event is a replay.
    ///
    /// # Errors
    ///
    /// Same as [`on_edit`](Self::on_edit).
    pub fn on_replay(
        &mut self,
        event: &EditEvent,
        restored: Option<&TagSnapshot>,
        buffer: &Buffer,
        layer: &mut dyn RenderLayer,
    ) -> Result<(), ChangeError> {
        if !self.state.is_on() || event.is_noop() {
            return Ok(());
        }
        if !event.undo_replay && buffer.is_read_only() {
            return Err(ChangeError::ReadOnlyViolation);
        }

        self.store.adjust(event);

        if event.undo_replay {
            let mut span = replay_span(event, buffer.len_chars());
            if let Some(snapshot) = restored {
                self.store.restore(event.position, snapshot);
                span.end = span.end.max(event.position + snapshot.extent);
            }
            if self.state.renders() {
                fixup(self.widen(span), &self.store, &self.table, layer)?;
            }
            return Ok(());
        }

        self.classify_event(event, Persistence::Persistent, buffer, layer)
            .map(|_| ())
    }

    /// Classify `event` against the current store and apply the result.
    ///
    /// Does not shift the store: the caller guarantees the store already
    /// matches `buffer`'s text. Returns what the event was classified as.
    ///
    /// # Errors
    ///
    /// [`ChangeError::ReadOnlyViolation`] for persistent classification on a
    /// read-only buffer, [`ChangeError::NoFaceForCategory`] from rendering.
    pub fn classify_event(
        &mut self,
        event: &EditEvent,
        persistence: Persistence,
        buffer: &Buffer,
        layer: &mut dyn RenderLayer,
    ) -> Result<Classification, ChangeError> {
        if persistence == Persistence::Persistent && buffer.is_read_only() {
            return Err(ChangeError::ReadOnlyViolation);
        }
        let classification = classify(event, &self.store, buffer.len_chars());
        let Classification::Mark { span, category, .. } = classification else {
            return Ok(classification);
        };

        match persistence {
            Persistence::Persistent => {
                self.store.tag(span, category);
                if self.state.renders() {
                    fixup(self.widen(span), &self.store, &self.table, layer)?;
                }
            }
            Persistence::Transient => {
                if self.state.renders() {
                    let style = self
                        .table
                        .style_for(category)
                        .map_err(|_| ChangeError::NoFaceForCategory(category))?;
                    layer.create_overlay(span, category, style.clone());
                }
            }
        }
        Ok(classification)
    }

    // -- Mode transitions ---------------------------------------------------

    /// Switch on in `initial`. A tracker that is already on stays as it is.
    ///
    /// # Errors
    ///
    /// [`ChangeError::NoFaceForCategory`] from rendering.
    pub fn enable(
        &mut self,
        initial: InitialState,
        text_len: usize,
        layer: &mut dyn RenderLayer,
    ) -> Result<(), ChangeError> {
        if self.state.is_on() {
            return Ok(());
        }
        self.state = initial.into();
        debug!(state = %self.state, "change highlighting enabled");
        if self.state.renders() {
            self.render_all(text_len, layer)?;
        }
        Ok(())
    }

    /// `Active` ⇄ `Passive`; `Off` switches on in `Active`.
    ///
    /// # Errors
    ///
    /// [`ChangeError::NoFaceForCategory`] from re-rendering.
    pub fn toggle(&mut self, text_len: usize, layer: &mut dyn RenderLayer) -> Result<(), ChangeError> {
        let from = self.state;
        self.state = from.toggled();
        debug!(%from, to = %self.state, "change highlighting toggled");
        match self.state {
            ModeState::Active => self.render_all(text_len, layer),
            ModeState::Passive | ModeState::Off => {
                clear_owned(layer);
                Ok(())
            }
        }
    }

    /// Switch off: drop every owned overlay and the whole store. Also cancels
    /// a pending activation watch, even when already off.
    pub fn disable(&mut self, layer: &mut dyn RenderLayer) {
        self.watch_pending = false;
        if !self.state.is_on() {
            return;
        }
        clear_owned(layer);
        self.store.clear();
        self.state = ModeState::Off;
        debug!("change highlighting disabled");
    }

    // -- Operations ---------------------------------------------------------

    /// Age every region one step and redraw.
    ///
    /// # Errors
    ///
    /// [`ChangeError::UnknownCategory`] for the first region that could not
    /// be aged (it keeps its category), otherwise
    /// [`ChangeError::NoFaceForCategory`] from re-rendering.
    pub fn rotate(&mut self, text_len: usize, layer: &mut dyn RenderLayer) -> Result<(), ChangeError> {
        if !self.state.is_on() {
            return Ok(());
        }
        let rotated = self.store.rotate(&self.table);
        debug!(regions = self.store.len(), "rotated changes");
        let rendered = if self.state.renders() {
            self.render_all(text_len, layer)
        } else {
            Ok(())
        };
        rotated.and(rendered)
    }

    /// Forget the changes inside `span`.
    ///
    /// # Errors
    ///
    /// [`ChangeError::ReadOnlyViolation`] on a read-only buffer.
    pub fn clear_region(
        &mut self,
        span: Span,
        buffer: &Buffer,
        layer: &mut dyn RenderLayer,
    ) -> Result<(), ChangeError> {
        if buffer.is_read_only() {
            return Err(ChangeError::ReadOnlyViolation);
        }
        self.store.untag(span);
        if self.state.renders() {
            fixup(span, &self.store, &self.table, layer)?;
        }
        Ok(())
    }

    /// Drop all tags and owned overlays without leaving the current state.
    pub fn reset(&mut self, layer: &mut dyn RenderLayer) {
        self.store.clear();
        clear_owned(layer);
    }

    /// See [`next_change_from`].
    #[must_use]
    pub fn next_change(&self, offset: usize) -> Option<usize> {
        next_change_from(&self.store, offset)
    }

    /// See [`previous_change_from`].
    #[must_use]
    pub fn previous_change(&self, offset: usize) -> Option<usize> {
        previous_change_from(&self.store, offset)
    }

    /// Throw away owned overlays and draw the whole store again.
    ///
    /// # Errors
    ///
    /// [`ChangeError::NoFaceForCategory`] for the first unrenderable region.
    pub fn render_all(&self, text_len: usize, layer: &mut dyn RenderLayer) -> Result<(), ChangeError> {
        clear_owned(layer);
        fixup(Span::new(0, text_len), &self.store, &self.table, layer)
    }

    /// `span` grown to cover the whole regions at its two ends, so that a
    /// region extended by an edit is redrawn as one overlay. Redraw work is
    /// bounded by the size of those two regions, never the whole buffer.
    fn widen(&self, span: Span) -> Span {
        if span.is_empty() {
            return span;
        }
        let start = self.store.region_at(span.start).map_or(span.start, |r| r.span.start);
        let end = self.store.region_at(span.end - 1).map_or(span.end, |r| r.span.end);
        Span::new(start, end)
    }

    // -- Pending activation -------------------------------------------------

    /// Remember that activation waits for the buffer kind to be known.
    pub const fn arm_watch(&mut self) {
        self.watch_pending = true;
    }

    /// Cancel a pending activation. Returns whether one was pending.
    pub const fn disarm_watch(&mut self) -> bool {
        let was = self.watch_pending;
        self.watch_pending = false;
        was
    }

    #[inline]
    #[must_use]
    pub const fn has_pending_watch(&self) -> bool {
        self.watch_pending
    }
}

/// The span a replayed edit reconciles: its inserted text, or the one char
/// at the edit point when nothing was inserted.
fn replay_span(event: &EditEvent, text_len: usize) -> Span {
    let span = event.inserted_span();
    if span.is_empty() {
        Span::at(span.start, 1).clamp_to(text_len)
    } else {
        span
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::category::Category;
    use crate::overlay::{OverlaySet, OverlayTag};
    use crate::store::ChangeRegion;
    use pretty_assertions::assert_eq;

    fn tracker() -> ChangeTracker {
        ChangeTracker::new(Arc::new(CategoryTable::default()))
    }

    fn region(start: usize, end: usize, category: Category) -> ChangeRegion {
        ChangeRegion::new(Span::new(start, end), category)
    }

    fn owned(layer: &OverlaySet) -> Vec<(Span, Category)> {
        layer
            .snapshot()
            .into_iter()
            .filter_map(|o| match o.tag {
                OverlayTag::Change(c) => Some((o.span, c)),
                OverlayTag::Foreign(_) => None,
            })
            .collect()
    }

    /// Apply an edit the way a host does: text, overlays, tracker.
    fn edit(
        t: &mut ChangeTracker,
        buf: &mut Buffer,
        layer: &mut OverlaySet,
        f: impl FnOnce(&mut Buffer) -> EditEvent,
    ) {
        let event = f(buf);
        layer.adjust(&event);
        t.on_edit(&event, buf, layer).unwrap();
    }

    // -- Edits --------------------------------------------------------------

    #[test]
    fn off_tracker_ignores_edits() {
        let mut t = tracker();
        let mut buf = Buffer::from_text("hello");
        let mut layer = OverlaySet::new();
        edit(&mut t, &mut buf, &mut layer, |b| b.insert(0, "ab").unwrap());
        assert!(t.store().is_empty());
        assert!(layer.is_empty());
    }

    #[test]
    fn active_insertion_is_tagged_and_rendered() {
        let mut t = tracker();
        let mut buf = Buffer::from_text("hello world");
        let mut layer = OverlaySet::new();
        t.enable(InitialState::Active, buf.len_chars(), &mut layer).unwrap();

        edit(&mut t, &mut buf, &mut layer, |b| b.insert(6, "big ").unwrap());

        assert_eq!(t.store().regions(), &[region(6, 10, Category::New)]);
        assert_eq!(owned(&layer), vec![(Span::new(6, 10), Category::New)]);
    }

    #[test]
    fn deletion_then_insertion_absorbs_marker() {
        let mut t = tracker();
        let mut buf = Buffer::from_text("0123456789abcdefghij");
        let mut layer = OverlaySet::new();
        t.enable(InitialState::Active, buf.len_chars(), &mut layer).unwrap();

        edit(&mut t, &mut buf, &mut layer, |b| b.delete(Span::new(5, 8)).unwrap());
        assert_eq!(t.store().regions(), &[region(5, 6, Category::Deleted)]);

        edit(&mut t, &mut buf, &mut layer, |b| b.insert(5, "XY").unwrap());
        assert_eq!(t.store().regions(), &[region(5, 8, Category::New)]);
        assert_eq!(owned(&layer), vec![(Span::new(5, 8), Category::New)]);
    }

    #[test]
    fn extended_change_is_drawn_as_one_overlay() {
        let mut t = tracker();
        let mut buf = Buffer::from_text("abc");
        let mut layer = OverlaySet::new();
        t.enable(InitialState::Active, 3, &mut layer).unwrap();

        for (i, ch) in ["x", "y", "z"].iter().enumerate() {
            edit(&mut t, &mut buf, &mut layer, |b| b.insert(3 + i, ch).unwrap());
        }

        assert_eq!(t.store().regions(), &[region(3, 6, Category::New)]);
        assert_eq!(owned(&layer), vec![(Span::new(3, 6), Category::New)]);
    }

    #[test]
    fn redraw_leaves_distant_overlays_untouched() {
        let mut t = tracker();
        let mut buf = Buffer::from_text("0123456789abcdef");
        let mut layer = OverlaySet::new();
        t.enable(InitialState::Active, buf.len_chars(), &mut layer).unwrap();

        edit(&mut t, &mut buf, &mut layer, |b| b.insert(0, "A").unwrap());
        let first = layer.owned_overlays(Span::new(0, 1));
        assert_eq!(first.len(), 1);

        edit(&mut t, &mut buf, &mut layer, |b| b.insert(12, "B").unwrap());
        edit(&mut t, &mut buf, &mut layer, |b| b.insert(13, "C").unwrap());

        assert_eq!(layer.overlay(first[0]).unwrap().span, Span::new(0, 1));
        assert_eq!(
            owned(&layer),
            vec![(Span::new(0, 1), Category::New), (Span::new(12, 14), Category::New)]
        );
    }

    #[test]
    fn passive_tracks_without_rendering() {
        let mut t = tracker();
        let mut buf = Buffer::from_text("abc");
        let mut layer = OverlaySet::new();
        t.enable(InitialState::Passive, buf.len_chars(), &mut layer).unwrap();

        edit(&mut t, &mut buf, &mut layer, |b| b.insert(3, "d").unwrap());

        assert_eq!(t.store().regions(), &[region(3, 4, Category::New)]);
        assert!(layer.is_empty());
    }

    #[test]
    fn fresh_edit_on_read_only_buffer_is_rejected() {
        let mut t = tracker();
        let mut buf = Buffer::from_text("abc");
        buf.set_read_only(true);
        let mut layer = OverlaySet::new();
        t.enable(InitialState::Active, 3, &mut layer).unwrap();

        let err = t.on_edit(&EditEvent::insertion(0, 1), &buf, &mut layer).unwrap_err();
        assert!(matches!(err, ChangeError::ReadOnlyViolation));
    }

    #[test]
    fn replay_restores_tags_without_classifying() {
        let mut t = tracker();
        let mut buf = Buffer::from_text("abcdef");
        let mut layer = OverlaySet::new();
        t.enable(InitialState::Active, buf.len_chars(), &mut layer).unwrap();

        let event = buf.insert(2, "xyz").unwrap().replayed();
        layer.adjust(&event);
        let snapshot = TagSnapshot {
            extent: 3,
            regions: vec![region(0, 3, Category::Aged(2))],
        };
        t.on_replay(&event, Some(&snapshot), &buf, &mut layer).unwrap();

        assert_eq!(t.store().regions(), &[region(2, 5, Category::Aged(2))]);
        assert_eq!(owned(&layer), vec![(Span::new(2, 5), Category::Aged(2))]);
    }

    #[test]
    fn replayed_deletion_places_no_marker() {
        let mut t = tracker();
        let mut buf = Buffer::from_text("abcdef");
        let mut layer = OverlaySet::new();
        t.enable(InitialState::Active, buf.len_chars(), &mut layer).unwrap();

        let event = buf.delete(Span::new(1, 3)).unwrap().replayed();
        layer.adjust(&event);
        t.on_edit(&event, &buf, &mut layer).unwrap();

        assert!(t.store().is_empty());
    }

    // -- Transient classification -------------------------------------------

    #[test]
    fn transient_classification_leaves_store_alone() {
        let mut t = tracker();
        let mut buf = Buffer::from_text("abc");
        buf.set_read_only(true);
        let mut layer = OverlaySet::new();
        t.enable(InitialState::Active, 3, &mut layer).unwrap();

        t.classify_event(&EditEvent::new(1, 1, 1), Persistence::Transient, &buf, &mut layer)
            .unwrap();

        assert!(t.store().is_empty());
        assert_eq!(owned(&layer), vec![(Span::new(1, 2), Category::New)]);
    }

    #[test]
    fn persistent_classification_on_read_only_is_rejected() {
        let mut t = tracker();
        let mut buf = Buffer::from_text("abc");
        buf.set_read_only(true);
        let mut layer = OverlaySet::new();
        t.enable(InitialState::Active, 3, &mut layer).unwrap();

        let err = t
            .classify_event(&EditEvent::new(1, 1, 1), Persistence::Persistent, &buf, &mut layer)
            .unwrap_err();
        assert!(matches!(err, ChangeError::ReadOnlyViolation));
        assert!(layer.is_empty());
    }

    // -- Mode transitions ---------------------------------------------------

    #[test]
    fn toggle_hides_and_redraws() {
        let mut t = tracker();
        let mut buf = Buffer::from_text("abc");
        let mut layer = OverlaySet::new();
        t.enable(InitialState::Active, 3, &mut layer).unwrap();
        edit(&mut t, &mut buf, &mut layer, |b| b.insert(0, "zz").unwrap());
        let shown = owned(&layer);

        t.toggle(buf.len_chars(), &mut layer).unwrap();
        assert_eq!(t.state(), ModeState::Passive);
        assert!(layer.is_empty());
        assert_eq!(t.store().len(), 1);

        t.toggle(buf.len_chars(), &mut layer).unwrap();
        assert_eq!(t.state(), ModeState::Active);
        assert_eq!(owned(&layer), shown);
    }

    #[test]
    fn disable_clears_everything_and_cancels_watch() {
        let mut t = tracker();
        let mut buf = Buffer::from_text("abc");
        let mut layer = OverlaySet::new();
        layer.add_foreign(Span::new(0, 1), "search", "match".into());
        t.enable(InitialState::Active, 3, &mut layer).unwrap();
        edit(&mut t, &mut buf, &mut layer, |b| b.insert(0, "zz").unwrap());
        t.arm_watch();

        t.disable(&mut layer);

        assert_eq!(t.state(), ModeState::Off);
        assert!(t.store().is_empty());
        assert!(owned(&layer).is_empty());
        assert_eq!(layer.len(), 1);
        assert!(!t.has_pending_watch());
    }

    #[test]
    fn disable_when_off_still_cancels_watch() {
        let mut t = tracker();
        let mut layer = OverlaySet::new();
        t.arm_watch();
        t.disable(&mut layer);
        assert!(!t.has_pending_watch());
    }

    #[test]
    fn enable_when_on_keeps_state() {
        let mut t = tracker();
        let mut layer = OverlaySet::new();
        t.enable(InitialState::Passive, 0, &mut layer).unwrap();
        t.enable(InitialState::Active, 0, &mut layer).unwrap();
        assert_eq!(t.state(), ModeState::Passive);
    }

    // -- Operations ---------------------------------------------------------

    #[test]
    fn rotate_restyles_overlays() {
        let mut t = tracker();
        let mut buf = Buffer::from_text("abc");
        let mut layer = OverlaySet::new();
        t.enable(InitialState::Active, 3, &mut layer).unwrap();
        edit(&mut t, &mut buf, &mut layer, |b| b.insert(1, "q").unwrap());

        t.rotate(buf.len_chars(), &mut layer).unwrap();

        assert_eq!(owned(&layer), vec![(Span::new(1, 2), Category::Aged(1))]);
        let style = layer.snapshot()[0].style.clone();
        assert_eq!(style.as_str(), "yellow");
    }

    #[test]
    fn clear_region_untags_and_redraws() {
        let mut t = tracker();
        let mut buf = Buffer::from_text("");
        let mut layer = OverlaySet::new();
        t.enable(InitialState::Active, 0, &mut layer).unwrap();
        edit(&mut t, &mut buf, &mut layer, |b| b.insert(0, "abcdef").unwrap());

        t.clear_region(Span::new(2, 4), &buf, &mut layer).unwrap();

        assert_eq!(
            t.store().regions(),
            &[region(0, 2, Category::New), region(4, 6, Category::New)]
        );
        assert_eq!(
            owned(&layer),
            vec![(Span::new(0, 2), Category::New), (Span::new(4, 6), Category::New)]
        );
    }

    #[test]
    fn replay_span_widens_empty_edits() {
        assert_eq!(replay_span(&EditEvent::deletion(3, 2), 10), Span::new(3, 4));
        assert_eq!(replay_span(&EditEvent::deletion(10, 2), 10), Span::new(10, 10));
        assert_eq!(replay_span(&EditEvent::insertion(3, 2), 10), Span::new(3, 5));
    }
}
