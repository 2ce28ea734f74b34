//! Rendering layer — disposable overlays that make changes visible.
//!
//! Overlays are a *derived* view of the annotation store. The store is
//! authoritative; overlays are created, clipped and thrown away by the
//! reconciler ([`fixup`](crate::fixup)) and by mode switches.
//!
//! The engine talks to the rendering layer only through the [`RenderLayer`]
//! trait, so a host can plug in its own display structure. [`OverlaySet`] is
//! the in-memory implementation used by [`Document`](crate::document::Document),
//! the CLI and the tests.
//!
//! # Ownership
//!
//! Other subsystems (search highlighting, selections, diagnostics) put
//! overlays in the same layer. Each overlay carries an [`OverlayTag`]:
//! `Change(..)` overlays belong to the change engine, `Foreign(..)` overlays
//! belong to somebody else and are never listed by
//! [`owned_overlays`](RenderLayer::owned_overlays). Ownership is decided by
//! the tag, never by where an overlay sits.

use std::collections::BTreeMap;
use std::fmt;

use crate::category::{Category, StyleKey};
use crate::edit::EditEvent;
use crate::position::Span;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Opaque identity of one overlay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OverlayHandle(u64);

impl fmt::Display for OverlayHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Who an overlay belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum OverlayTag {
    /// Rendered by the change engine for a region of this category.
    Change(Category),
    /// Put there by another subsystem, identified by name.
    Foreign(String),
}

impl OverlayTag {
    /// True for overlays owned by the change engine.
    #[inline]
    #[must_use]
    pub const fn is_change(&self) -> bool {
        matches!(self, Self::Change(_))
    }
}

/// One overlay: a span of text painted with a style.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Overlay {
    pub span: Span,
    pub tag: OverlayTag,
    pub style: StyleKey,
}

// ---------------------------------------------------------------------------
// RenderLayer
// ---------------------------------------------------------------------------

/// The operations the change engine needs from a rendering layer.
pub trait RenderLayer {
    /// Create an overlay owned by the change engine.
    fn create_overlay(&mut self, span: Span, category: Category, style: StyleKey) -> OverlayHandle;

    /// Delete an overlay. Unknown handles are ignored.
    fn delete_overlay(&mut self, handle: OverlayHandle);

    /// Move an overlay to a new span. Unknown handles are ignored.
    fn resize_overlay(&mut self, handle: OverlayHandle, span: Span);

    /// Handles of change-engine overlays intersecting `span`, in no
    /// particular order. Foreign overlays are never included.
    fn owned_overlays(&self, span: Span) -> Vec<OverlayHandle>;

    /// Look up an overlay.
    fn overlay(&self, handle: OverlayHandle) -> Option<&Overlay>;
}

// ---------------------------------------------------------------------------
// OverlaySet
// ---------------------------------------------------------------------------

/// In-memory rendering layer.
///
/// Overlays follow the text through [`adjust`](Self::adjust): text inserted
/// strictly inside an overlay grows it, text inserted at either edge stays
/// outside, deleted text shrinks it, and an overlay left empty evaporates.
#[derive(Debug, Default, Clone)]
pub struct OverlaySet {
    overlays: BTreeMap<OverlayHandle, Overlay>,
    next_id: u64,
}

impl OverlaySet {
    /// Create an empty layer.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            overlays: BTreeMap::new(),
            next_id: 0,
        }
    }

    /// Add an overlay on behalf of another subsystem.
    pub fn add_foreign(&mut self, span: Span, owner: &str, style: StyleKey) -> OverlayHandle {
        self.insert(Overlay {
            span,
            tag: OverlayTag::Foreign(owner.to_string()),
            style,
        })
    }

    /// Total number of overlays, foreign ones included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.overlays.len()
    }

    /// True when the layer holds no overlay at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.overlays.is_empty()
    }

    /// Iterate over all overlays in handle order.
    pub fn iter(&self) -> impl Iterator<Item = (OverlayHandle, &Overlay)> {
        self.overlays.iter().map(|(&handle, overlay)| (handle, overlay))
    }

    /// All overlays sorted by span, then tag, then style. Handles are left
    /// out, so two layers showing the same thing compare equal.
    #[must_use]
    pub fn snapshot(&self) -> Vec<Overlay> {
        let mut all: Vec<Overlay> = self.overlays.values().cloned().collect();
        all.sort_by(|a, b| {
            (a.span.start, a.span.end, &a.tag, &a.style).cmp(&(
                b.span.start,
                b.span.end,
                &b.tag,
                &b.style,
            ))
        });
        all
    }

    /// Follow a text mutation.
    pub fn adjust(&mut self, event: &EditEvent) {
        if event.is_noop() {
            return;
        }
        self.overlays.retain(|_, overlay| {
            let start = event.map_offset(overlay.span.start, true);
            let end = event.map_offset(overlay.span.end, false);
            overlay.span = Span::new(start.min(end), end);
            !overlay.span.is_empty()
        });
    }

    fn insert(&mut self, overlay: Overlay) -> OverlayHandle {
        let handle = OverlayHandle(self.next_id);
        self.next_id += 1;
        self.overlays.insert(handle, overlay);
        handle
    }
}

impl RenderLayer for OverlaySet {
    fn create_overlay(&mut self, span: Span, category: Category, style: StyleKey) -> OverlayHandle {
        self.insert(Overlay {
            span,
            tag: OverlayTag::Change(category),
            style,
        })
    }

    fn delete_overlay(&mut self, handle: OverlayHandle) {
        self.overlays.remove(&handle);
    }

    fn resize_overlay(&mut self, handle: OverlayHandle, span: Span) {
        if let Some(overlay) = self.overlays.get_mut(&handle) {
            overlay.span = span;
        }
    }

    fn owned_overlays(&self, span: Span) -> Vec<OverlayHandle> {
        self.overlays
            .iter()
            .filter(|(_, overlay)| overlay.tag.is_change() && overlay.span.intersects(span))
            .map(|(&handle, _)| handle)
            .collect()
    }

    fn overlay(&self, handle: OverlayHandle) -> Option<&Overlay> {
        self.overlays.get(&handle)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn style(name: &str) -> StyleKey {
        StyleKey::new(name)
    }

    // -- Ownership ----------------------------------------------------------

    #[test]
    fn owned_overlays_skip_foreign() {
        let mut layer = OverlaySet::new();
        let ours = layer.create_overlay(Span::new(0, 5), Category::New, style("new"));
        layer.add_foreign(Span::new(0, 5), "search", style("match"));

        assert_eq!(layer.owned_overlays(Span::new(0, 10)), vec![ours]);
        assert_eq!(layer.len(), 2);
    }

    #[test]
    fn owned_overlays_need_intersection() {
        let mut layer = OverlaySet::new();
        layer.create_overlay(Span::new(0, 5), Category::New, style("new"));
        assert!(layer.owned_overlays(Span::new(5, 9)).is_empty());
        assert_eq!(layer.owned_overlays(Span::new(4, 9)).len(), 1);
    }

    #[test]
    fn empty_span_owns_no_overlays() {
        let mut layer = OverlaySet::new();
        layer.create_overlay(Span::new(0, 5), Category::New, style("new"));
        assert!(layer.owned_overlays(Span::new(3, 3)).is_empty());
        assert!(layer.owned_overlays(Span::new(0, 0)).is_empty());
    }

    #[test]
    fn resize_and_delete() {
        let mut layer = OverlaySet::new();
        let h = layer.create_overlay(Span::new(0, 5), Category::New, style("new"));
        layer.resize_overlay(h, Span::new(1, 2));
        assert_eq!(layer.overlay(h).unwrap().span, Span::new(1, 2));
        layer.delete_overlay(h);
        assert!(layer.overlay(h).is_none());
        assert!(layer.is_empty());
    }

    // -- adjust -------------------------------------------------------------

    #[test]
    fn insertion_inside_grows_overlay() {
        let mut layer = OverlaySet::new();
        let h = layer.create_overlay(Span::new(2, 6), Category::New, style("new"));
        layer.adjust(&EditEvent::insertion(4, 3));
        assert_eq!(layer.overlay(h).unwrap().span, Span::new(2, 9));
    }

    #[test]
    fn insertion_at_edges_stays_outside() {
        let mut layer = OverlaySet::new();
        let h = layer.create_overlay(Span::new(2, 6), Category::New, style("new"));
        layer.adjust(&EditEvent::insertion(2, 1));
        assert_eq!(layer.overlay(h).unwrap().span, Span::new(3, 7));
        layer.adjust(&EditEvent::insertion(7, 1));
        assert_eq!(layer.overlay(h).unwrap().span, Span::new(3, 7));
    }

    #[test]
    fn deletion_shrinks_and_evaporates() {
        let mut layer = OverlaySet::new();
        let a = layer.create_overlay(Span::new(2, 6), Category::New, style("new"));
        let b = layer.create_overlay(Span::new(8, 9), Category::Deleted, style("del"));
        layer.adjust(&EditEvent::deletion(4, 5));
        assert_eq!(layer.overlay(a).unwrap().span, Span::new(2, 4));
        assert!(layer.overlay(b).is_none());
    }

    // -- snapshot -----------------------------------------------------------

    #[test]
    fn snapshot_ignores_handles() {
        let mut one = OverlaySet::new();
        one.create_overlay(Span::new(4, 5), Category::New, style("new"));
        one.create_overlay(Span::new(0, 2), Category::Deleted, style("del"));

        let mut two = OverlaySet::new();
        two.create_overlay(Span::new(9, 10), Category::New, style("tmp"));
        two.delete_overlay(two.owned_overlays(Span::new(0, 20))[0]);
        two.create_overlay(Span::new(0, 2), Category::Deleted, style("del"));
        two.create_overlay(Span::new(4, 5), Category::New, style("new"));

        assert_eq!(one.snapshot(), two.snapshot());
        assert_eq!(one.snapshot()[0].span, Span::new(0, 2));
    }

    #[test]
    fn snapshot_orders_by_span_then_tag() {
        let mut layer = OverlaySet::new();
        layer.create_overlay(Span::new(3, 6), Category::Aged(1), style("old"));
        layer.add_foreign(Span::new(3, 6), "search", style("match"));
        layer.create_overlay(Span::new(3, 4), Category::New, style("new"));
        layer.create_overlay(Span::new(0, 9), Category::Deleted, style("del"));

        let spans: Vec<Span> = layer.snapshot().iter().map(|o| o.span).collect();
        assert_eq!(
            spans,
            vec![Span::new(0, 9), Span::new(3, 4), Span::new(3, 6), Span::new(3, 6)]
        );
        let tied = &layer.snapshot()[2..];
        assert!(tied[0].tag < tied[1].tag);
    }
}
