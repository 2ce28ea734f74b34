//! Change classifier — turns an edit event into a store mutation.
//!
//! Classification is a pure function of the event, the current store and the
//! text length. It never mutates anything; the
//! [`ChangeTracker`](crate::tracker::ChangeTracker) applies the result either
//! to the store (persistent) or straight to the rendering layer (transient,
//! for read-only comparison targets). Keeping it stateless makes re-entrant
//! classification (an edit arriving from inside undo replay) safe.
//!
//! # Policy
//!
//! | Event                              | Result                                   |
//! |------------------------------------|------------------------------------------|
//! | nothing removed, nothing inserted  | [`Classification::Unchanged`]            |
//! | pure deletion at `p`               | `Deleted` on `[p, p+1)`, none at text end |
//! | insertion/replacement of `n` at `p`| `New` on `[p, p+n)`                      |
//! | … with `Deleted` at `p+n`          | `New` on `[p, p+n+1)`, marker absorbed   |
//!
//! Deleted text has no surviving offsets, so its marker anchors to the
//! character right after the deletion point. A marker directly followed by
//! fresh insertion means the user is editing in place; the insertion swallows
//! the marker instead of leaving it stranded next to new text.

use tracing::trace;

use crate::category::Category;
use crate::edit::EditEvent;
use crate::position::Span;
use crate::store::AnnotationStore;

/// What an edit event means for the annotation store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    /// Nothing to record (no-op event, or a deletion at the very end of the
    /// text where no character is left to carry the marker).
    Unchanged,
    /// Tag `span` with `category`.
    Mark {
        span: Span,
        category: Category,
        /// True when a `Deleted` marker right after the insertion was
        /// swallowed into `span`.
        absorbed_deletion: bool,
    },
}

impl Classification {
    /// The span the classification touches, if any.
    #[must_use]
    pub const fn span(self) -> Option<Span> {
        match self {
            Self::Unchanged => None,
            Self::Mark { span, .. } => Some(span),
        }
    }
}

/// Classify one edit event against the current store.
///
/// `text_len` is the length of the text *after* the edit. `store` is only
/// read, to detect a `Deleted` marker to absorb.
#[must_use]
pub fn classify(event: &EditEvent, store: &AnnotationStore, text_len: usize) -> Classification {
    let result = if event.is_pure_deletion() {
        let span = Span::at(event.position, 1).clamp_to(text_len);
        if span.is_empty() {
            Classification::Unchanged
        } else {
            Classification::Mark {
                span,
                category: Category::Deleted,
                absorbed_deletion: false,
            }
        }
    } else if event.inserted > 0 {
        let span = event.inserted_span();
        if store.category_at(span.end) == Some(Category::Deleted) {
            Classification::Mark {
                span: Span::new(span.start, span.end + 1),
                category: Category::New,
                absorbed_deletion: true,
            }
        } else {
            Classification::Mark {
                span,
                category: Category::New,
                absorbed_deletion: false,
            }
        }
    } else {
        Classification::Unchanged
    };

    trace!(?event, ?result, "classified edit");
    result
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
