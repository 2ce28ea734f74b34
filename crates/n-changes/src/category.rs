//! Change categories and the table that maps them to style keys.
//!
//! Every tagged region carries a [`Category`]: freshly changed text is
//! [`New`](Category::New), the anchor character after a deletion is
//! [`Deleted`](Category::Deleted), and rotation moves both through
//! [`Aged(1)`](Category::Aged) … `Aged(K)`, where `K` is the number of aging
//! slots configured. `Aged(K)` is a sink: older changes all look alike.
//!
//! The [`CategoryTable`] is configuration, not per-edit state. It is rebuilt
//! explicitly with [`CategoryTable::rebuild`] and shared (usually behind an
//! `Arc`) by every buffer's tracker. Nothing mutates a table in place.

use std::fmt;

use tracing::debug;

use crate::error::ChangeError;

/// Aging palette used when the configured aging sequence is empty.
pub const DEFAULT_AGING: [&str; 7] = [
    "yellow",
    "magenta",
    "blue",
    "maroon",
    "firebrick",
    "green4",
    "purple",
];

/// Default style key for `New` regions.
pub const DEFAULT_NEW_STYLE: &str = "highlight-changes";

/// Default style key for `Deleted` markers.
pub const DEFAULT_DELETED_STYLE: &str = "highlight-changes-delete";

// ---------------------------------------------------------------------------
// Category
// ---------------------------------------------------------------------------

/// How recent (or what kind of) change a region records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Category {
    /// Text inserted or replaced since the last rotation.
    New,
    /// Marker on the character following a deletion.
    Deleted,
    /// A change that has been rotated `n` times (1-indexed aging slot).
    Aged(usize),
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::New => f.write_str("new"),
            Self::Deleted => f.write_str("deleted"),
            Self::Aged(n) => write!(f, "aged-{n}"),
        }
    }
}

// ---------------------------------------------------------------------------
// StyleKey
// ---------------------------------------------------------------------------

/// An opaque face name. The presentation layer decides what it looks like.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StyleKey(String);

impl StyleKey {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StyleKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for StyleKey {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

// ---------------------------------------------------------------------------
// CategoryTable
// ---------------------------------------------------------------------------

/// Ordered categories with their style keys.
///
/// Order is `New`, `Deleted`, `Aged(1)` … `Aged(K)`. `K >= 1` always holds:
/// an empty aging sequence is replaced by [`DEFAULT_AGING`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryTable {
    new: StyleKey,
    deleted: StyleKey,
    aged: Vec<StyleKey>,
}

impl CategoryTable {
    /// Build a table from the `New` and `Deleted` styles and the aging
    /// sequence. Slot `i` (1-indexed) of `aging` becomes `Aged(i)`.
    ///
    /// Deterministic: the same input always yields an equal table.
    #[must_use]
    pub fn rebuild(new: StyleKey, deleted: StyleKey, aging: &[StyleKey]) -> Self {
        let aged = if aging.is_empty() {
            DEFAULT_AGING.iter().map(|&name| StyleKey::new(name)).collect()
        } else {
            aging.to_vec()
        };
        debug!(slots = aged.len(), "rebuilt change category table");
        Self { new, deleted, aged }
    }

    /// Number of aging slots (`K`).
    #[inline]
    #[must_use]
    pub fn aging_slots(&self) -> usize {
        self.aged.len()
    }

    /// All categories in table order.
    #[must_use]
    pub fn categories(&self) -> Vec<Category> {
        let mut out = Vec::with_capacity(self.aged.len() + 2);
        out.push(Category::New);
        out.push(Category::Deleted);
        out.extend((1..=self.aged.len()).map(Category::Aged));
        out
    }

    /// True when `category` has an entry in this table.
    #[must_use]
    pub fn contains(&self, category: Category) -> bool {
        match category {
            Category::New | Category::Deleted => true,
            Category::Aged(n) => (1..=self.aged.len()).contains(&n),
        }
    }

    /// The style key for a category.
    ///
    /// # Errors
    ///
    /// [`ChangeError::UnknownCategory`] for `Aged(n)` with `n` outside `[1, K]`.
    /// Callers that bypass the classifier (manual tagging, a table rebuilt with
    /// fewer slots) can produce such ids.
    pub fn style_for(&self, category: Category) -> Result<&StyleKey, ChangeError> {
        match category {
            Category::New => Ok(&self.new),
            Category::Deleted => Ok(&self.deleted),
            Category::Aged(n) => n
                .checked_sub(1)
                .and_then(|slot| self.aged.get(slot))
                .ok_or(ChangeError::UnknownCategory(category)),
        }
    }

    /// One aging step: `New` and `Deleted` become `Aged(1)`, `Aged(n)` becomes
    /// `Aged(n + 1)` until it saturates at `Aged(K)`.
    ///
    /// # Errors
    ///
    /// [`ChangeError::UnknownCategory`] for ids outside the table.
    pub fn advance(&self, category: Category) -> Result<Category, ChangeError> {
        match category {
            Category::New | Category::Deleted => Ok(Category::Aged(1)),
            Category::Aged(n) if self.contains(category) => {
                Ok(Category::Aged((n + 1).min(self.aged.len())))
            }
            Category::Aged(_) => Err(ChangeError::UnknownCategory(category)),
        }
    }
}

impl Default for CategoryTable {
    fn default() -> Self {
        Self::rebuild(
            StyleKey::new(DEFAULT_NEW_STYLE),
            StyleKey::new(DEFAULT_DELETED_STYLE),
            &[],
        )
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
