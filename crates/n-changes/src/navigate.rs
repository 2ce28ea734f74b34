//! Jumping between changes.
//!
//! Both directions step over the change the point is currently in, so
//! repeated calls visit each region once and always make progress:
//! `next_change_from` strictly increases the offset, `previous_change_from`
//! strictly decreases it.

use crate::store::AnnotationStore;

/// Start of the next change after `offset`.
///
/// When `offset` sits inside a region, the search starts at that region's
/// end. Returns the first tagged offset from there, or `None`.
#[must_use]
pub fn next_change_from(store: &AnnotationStore, offset: usize) -> Option<usize> {
    let point = store.region_at(offset).map_or(offset, |r| r.span.end);
    store.first_tagged_at_or_after(point)
}

/// Start of the previous change before `offset`.
///
/// When the char before `offset` is inside a region, the search starts at
/// that region's start. Returns the start of the last region beginning
/// before that point, or `None`.
///
/// Stepping back off a region that starts the buffer lands on 0 itself, so
/// that region is reachable once; from offset 0 there is nowhere to go.
#[must_use]
pub fn previous_change_from(store: &AnnotationStore, offset: usize) -> Option<usize> {
    let point = offset
        .checked_sub(1)
        .and_then(|before| store.region_at(before))
        .map_or(offset, |r| r.span.start);
    let regions = store.regions();
    let idx = regions.partition_point(|r| r.span.start < point);
    match regions[..idx].last() {
        Some(r) => Some(r.span.start),
        None if point == 0 && offset > 0 && store.region_at(0).is_some() => Some(0),
        None => None,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::category::Category;
    use crate::position::Span;

    fn store(spans: &[(usize, usize)]) -> AnnotationStore {
        let mut store = AnnotationStore::new();
        for &(start, end) in spans {
            store.tag(Span::new(start, end), Category::New);
        }
        store
    }

    // -- next ---------------------------------------------------------------

    #[test]
    fn next_from_untagged_text() {
        let s = store(&[(4, 6), (10, 12)]);
        assert_eq!(next_change_from(&s, 0), Some(4));
        assert_eq!(next_change_from(&s, 6), Some(10));
        assert_eq!(next_change_from(&s, 12), None);
    }

    #[test]
    fn next_skips_current_region() {
        let s = store(&[(4, 6), (10, 12)]);
        assert_eq!(next_change_from(&s, 4), Some(10));
        assert_eq!(next_change_from(&s, 5), Some(10));
        assert_eq!(next_change_from(&s, 11), None);
    }

    #[test]
    fn next_stops_at_touching_region_of_other_category() {
        let mut s = AnnotationStore::new();
        s.tag(Span::new(2, 4), Category::Aged(1));
        s.tag(Span::new(4, 6), Category::New);
        assert_eq!(next_change_from(&s, 2), Some(4));
    }

    #[test]
    fn forward_walk_visits_each_region_once() {
        let mut s = AnnotationStore::new();
        s.tag(Span::new(2, 4), Category::Aged(1));
        s.tag(Span::new(4, 6), Category::New);
        s.tag(Span::new(9, 10), Category::New);

        let mut visited = Vec::new();
        let mut offset = 0;
        while let Some(next) = next_change_from(&s, offset) {
            visited.push(next);
            offset = next;
        }
        assert_eq!(visited, vec![2, 4, 9]);
    }

    #[test]
    fn next_on_empty_store() {
        assert_eq!(next_change_from(&AnnotationStore::new(), 0), None);
    }

    // -- previous -----------------------------------------------------------

    #[test]
    fn previous_from_untagged_text() {
        let s = store(&[(4, 6), (10, 12)]);
        assert_eq!(previous_change_from(&s, 20), Some(10));
        assert_eq!(previous_change_from(&s, 8), Some(4));
        assert_eq!(previous_change_from(&s, 3), None);
    }

    #[test]
    fn previous_skips_current_region() {
        let s = store(&[(4, 6), (10, 12)]);
        assert_eq!(previous_change_from(&s, 12), Some(4));
        assert_eq!(previous_change_from(&s, 11), Some(4));
        assert_eq!(previous_change_from(&s, 10), Some(4));
    }

    #[test]
    fn region_at_zero_is_reached_once() {
        let s = store(&[(0, 3), (8, 9)]);
        assert_eq!(previous_change_from(&s, 8), Some(0));
        assert_eq!(previous_change_from(&s, 3), Some(0));
        assert_eq!(previous_change_from(&s, 2), Some(0));
        assert_eq!(previous_change_from(&s, 0), None);
    }

    #[test]
    fn untagged_start_is_not_a_target() {
        let s = store(&[(2, 4)]);
        assert_eq!(previous_change_from(&s, 3), None);
        assert_eq!(previous_change_from(&s, 1), None);
    }

    // -- Property tests -----------------------------------------------------

    mod prop {
        use super::*;
        use proptest::prelude::*;

        fn arb_store() -> impl Strategy<Value = AnnotationStore> {
            proptest::collection::vec((0..80usize, 1..8usize, any::<bool>()), 0..12).prop_map(
                |tags| {
                    let mut s = AnnotationStore::new();
                    for (start, len, aged) in tags {
                        let category = if aged { Category::Aged(1) } else { Category::New };
                        s.tag(Span::at(start, len), category);
                    }
                    s
                },
            )
        }

        proptest! {
            /// Walking forward visits every region start after `from` once.
            #[test]
            fn forward_walk_visits_every_later_region(s in arb_store(), from in 0..90usize) {
                let mut visited = Vec::new();
                let mut offset = from;
                while let Some(next) = next_change_from(&s, offset) {
                    prop_assert!(next > offset);
                    prop_assert!(visited.len() < s.len());
                    visited.push(next);
                    offset = next;
                }
                let expected: Vec<usize> = s
                    .regions()
                    .iter()
                    .map(|r| r.span.start)
                    .filter(|&start| start > from)
                    .collect();
                prop_assert_eq!(visited, expected);
            }

            /// Walking backward strictly decreases and stops.
            #[test]
            fn backward_walk_terminates(s in arb_store(), from in 0..90usize) {
                let mut offset = from;
                let mut steps = 0;
                while let Some(prev) = previous_change_from(&s, offset) {
                    prop_assert!(prev < offset);
                    prop_assert!(s.region_at(prev).is_some_and(|r| r.span.start == prev));
                    offset = prev;
                    steps += 1;
                    prop_assert!(steps <= s.len());
                }
            }
        }
    }
}
