//! Overlay reconciler — brings the rendering layer back in line with the
//! store over a bounded dirty span.
//!
//! After an edit only the mutated span can disagree with the store, so
//! reconciliation is local:
//!
//! 1. every owned overlay intersecting the dirty span `D` is clipped out of it
//!    (split in two when it straddles `D`, deleted when it lies inside),
//! 2. a fresh overlay is created for every region `store.query(D)` returns.
//!
//! Running it twice over the same span yields the same overlays as running it
//! once. Foreign overlays are never touched.

use tracing::warn;

use crate::category::CategoryTable;
use crate::error::ChangeError;
use crate::overlay::{OverlayTag, RenderLayer};
use crate::position::Span;
use crate::store::AnnotationStore;

/// Reconcile owned overlays inside `dirty` with the store.
///
/// # Errors
///
/// [`ChangeError::NoFaceForCategory`] for the first region whose style the
/// table cannot resolve. Such regions stay unrendered; all others are drawn.
pub fn fixup(
    dirty: Span,
    store: &AnnotationStore,
    table: &CategoryTable,
    layer: &mut dyn RenderLayer,
) -> Result<(), ChangeError> {
    if dirty.is_empty() {
        return Ok(());
    }

    for handle in layer.owned_overlays(dirty) {
        let Some(overlay) = layer.overlay(handle).cloned() else {
            continue;
        };
        let OverlayTag::Change(category) = overlay.tag else {
            continue;
        };
        let Span { start, end } = overlay.span;

        if start < dirty.start {
            layer.resize_overlay(handle, Span::new(start, dirty.start));
            if end > dirty.end {
                layer.create_overlay(Span::new(dirty.end, end), category, overlay.style);
            }
        } else if end > dirty.end {
            layer.resize_overlay(handle, Span::new(dirty.end, end));
        } else {
            layer.delete_overlay(handle);
        }
    }

    let mut missing = None;
    for region in store.query(dirty) {
        match table.style_for(region.category) {
            Ok(style) => {
                layer.create_overlay(region.span, region.category, style.clone());
            }
            Err(_) => {
                warn!(category = %region.category, span = %region.span, "no face for change category");
                missing.get_or_insert(region.category);
            }
        }
    }

    missing.map_or(Ok(()), |category| Err(ChangeError::NoFaceForCategory(category)))
}

/// Delete every overlay owned by the change engine.
pub fn clear_owned(layer: &mut dyn RenderLayer) {
    for handle in layer.owned_overlays(Span::new(0, usize::MAX)) {
        layer.delete_overlay(handle);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::category::{Category, StyleKey};
    use crate::overlay::{Overlay, OverlaySet};
    use pretty_assertions::assert_eq;

    fn table() -> CategoryTable {
        CategoryTable::rebuild(
            "new".into(),
            "del".into(),
            &["a1".into(), "a2".into(), "a3".into()],
        )
    }

    fn owned(layer: &OverlaySet) -> Vec<(Span, Category, String)> {
        layer
            .snapshot()
            .into_iter()
            .filter_map(|Overlay { span, tag, style }| match tag {
                OverlayTag::Change(category) => Some((span, category, style.to_string())),
                OverlayTag::Foreign(_) => None,
            })
            .collect()
    }

    // -- Clipping -----------------------------------------------------------

    #[test]
    fn overlay_straddling_dirty_span_is_split() {
        let store = AnnotationStore::new();
        let mut layer = OverlaySet::new();
        layer.create_overlay(Span::new(0, 10), Category::Aged(1), "a1".into());

        fixup(Span::new(4, 6), &store, &table(), &mut layer).unwrap();

        assert_eq!(
            owned(&layer),
            vec![
                (Span::new(0, 4), Category::Aged(1), "a1".to_string()),
                (Span::new(6, 10), Category::Aged(1), "a1".to_string()),
            ]
        );
    }

    #[test]
    fn overlay_starting_inside_moves_its_start() {
        let store = AnnotationStore::new();
        let mut layer = OverlaySet::new();
        layer.create_overlay(Span::new(5, 10), Category::New, "new".into());

        fixup(Span::new(3, 7), &store, &table(), &mut layer).unwrap();

        assert_eq!(
            owned(&layer),
            vec![(Span::new(7, 10), Category::New, "new".to_string())]
        );
    }

    #[test]
    fn overlay_inside_is_deleted() {
        let store = AnnotationStore::new();
        let mut layer = OverlaySet::new();
        layer.create_overlay(Span::new(4, 6), Category::New, "new".into());

        fixup(Span::new(4, 6), &store, &table(), &mut layer).unwrap();

        assert!(layer.is_empty());
    }

    #[test]
    fn foreign_overlays_are_left_alone() {
        let store = AnnotationStore::new();
        let mut layer = OverlaySet::new();
        let h = layer.add_foreign(Span::new(0, 10), "search", StyleKey::new("match"));

        fixup(Span::new(2, 5), &store, &table(), &mut layer).unwrap();

        assert_eq!(layer.overlay(h).unwrap().span, Span::new(0, 10));
        assert_eq!(layer.len(), 1);
    }

    // -- Rendering ----------------------------------------------------------

    #[test]
    fn store_regions_inside_dirty_span_are_rendered() {
        let mut store = AnnotationStore::new();
        store.tag(Span::new(0, 3), Category::New);
        store.tag(Span::new(3, 4), Category::Deleted);
        store.tag(Span::new(8, 12), Category::Aged(2));
        let mut layer = OverlaySet::new();

        fixup(Span::new(2, 10), &store, &table(), &mut layer).unwrap();

        assert_eq!(
            owned(&layer),
            vec![
                (Span::new(2, 3), Category::New, "new".to_string()),
                (Span::new(3, 4), Category::Deleted, "del".to_string()),
                (Span::new(8, 10), Category::Aged(2), "a2".to_string()),
            ]
        );
    }

    #[test]
    fn unresolvable_style_is_reported_after_the_pass() {
        let mut store = AnnotationStore::new();
        store.tag(Span::new(0, 2), Category::Aged(9));
        store.tag(Span::new(2, 4), Category::New);
        let mut layer = OverlaySet::new();

        let err = fixup(Span::new(0, 4), &store, &table(), &mut layer).unwrap_err();

        assert!(matches!(err, ChangeError::NoFaceForCategory(Category::Aged(9))));
        assert_eq!(
            owned(&layer),
            vec![(Span::new(2, 4), Category::New, "new".to_string())]
        );
    }

    #[test]
    fn empty_dirty_span_does_nothing() {
        let mut store = AnnotationStore::new();
        store.tag(Span::new(0, 10), Category::New);
        let mut layer = OverlaySet::new();
        layer.create_overlay(Span::new(0, 10), Category::Aged(1), "a1".into());
        let before = layer.snapshot();

        fixup(Span::new(5, 5), &store, &table(), &mut layer).unwrap();

        assert_eq!(layer.snapshot(), before);
    }

    #[test]
    fn clear_owned_keeps_foreign() {
        let mut layer = OverlaySet::new();
        layer.create_overlay(Span::new(0, 3), Category::New, "new".into());
        layer.create_overlay(Span::new(7, 9), Category::Deleted, "del".into());
        layer.add_foreign(Span::new(1, 2), "selection", StyleKey::new("region"));

        clear_owned(&mut layer);

        assert_eq!(layer.len(), 1);
        assert!(owned(&layer).is_empty());
    }

    // -- Property tests -----------------------------------------------------

    mod prop {
        use super::*;
        use proptest::prelude::*;

        fn arb_category() -> impl Strategy<Value = Category> {
            prop_oneof![
                Just(Category::New),
                Just(Category::Deleted),
                (1..=3usize).prop_map(Category::Aged),
            ]
        }

        fn arb_span() -> impl Strategy<Value = Span> {
            (0..60usize, 0..15usize).prop_map(|(s, l)| Span::at(s, l))
        }

        proptest! {
            /// A second pass over the same span changes nothing.
            #[test]
            fn fixup_is_idempotent(
                tags in proptest::collection::vec((arb_span(), arb_category()), 0..12),
                stale in proptest::collection::vec((arb_span(), arb_category()), 0..8),
                foreign in proptest::collection::vec(arb_span(), 0..4),
                dirty in arb_span(),
            ) {
                let t = table();
                let mut store = AnnotationStore::new();
                for &(span, category) in &tags {
                    store.tag(span, category);
                }
                let mut layer = OverlaySet::new();
                for &(span, category) in &stale {
                    if !span.is_empty() {
                        let style = t.style_for(category).unwrap().clone();
                        layer.create_overlay(span, category, style);
                    }
                }
                for &span in &foreign {
                    layer.add_foreign(span, "other", StyleKey::new("other"));
                }

                fixup(dirty, &store, &t, &mut layer).unwrap();
                let once = layer.snapshot();
                fixup(dirty, &store, &t, &mut layer).unwrap();
                prop_assert_eq!(layer.snapshot(), once);
            }

            /// Inside the dirty span, owned overlays mirror the store exactly.
            #[test]
            fn dirty_span_mirrors_store(
                tags in proptest::collection::vec((arb_span(), arb_category()), 0..12),
                stale in proptest::collection::vec((arb_span(), arb_category()), 0..8),
                dirty in arb_span(),
            ) {
                let t = table();
                let mut store = AnnotationStore::new();
                for &(span, category) in &tags {
                    store.tag(span, category);
                }
                let mut layer = OverlaySet::new();
                for &(span, category) in &stale {
                    if !span.is_empty() {
                        layer.create_overlay(span, category, StyleKey::new("stale"));
                    }
                }

                fixup(dirty, &store, &t, &mut layer).unwrap();

                let inside: Vec<(Span, Category)> = owned(&layer)
                    .into_iter()
                    .filter(|(span, _, _)| span.intersects(dirty))
                    .map(|(span, category, _)| (span, category))
                    .collect();
                let expected: Vec<(Span, Category)> = store
                    .query(dirty)
                    .into_iter()
                    .map(|r| (r.span, r.category))
                    .collect();
                prop_assert_eq!(inside, expected);
            }
        }
    }
}
