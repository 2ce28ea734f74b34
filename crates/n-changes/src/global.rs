//! Global activation — switching change highlighting on for many documents.
//!
//! A [`GlobalChanges`] policy decides, per document, whether highlighting
//! should come on by itself. The decision is one of a closed set of
//! [`Suitability`] variants. Some of them need the document's kind (its
//! language), which may not be known when the document is created; such a
//! document gets a *pending activation watch* on its tracker, and the
//! decision is taken again once the host reports the kind through
//! [`GlobalChanges::on_kind_changed`].

use std::path::Path;

use tracing::debug;

use crate::document::Document;
use crate::error::ChangeError;

/// Detect a document kind from a file extension.
///
/// Returns `Some("rust")` for `.rs` files, etc.
#[must_use]
pub fn detect_kind(path: &Path) -> Option<&'static str> {
    match path.extension()?.to_str()? {
        "rs" => Some("rust"),
        "py" => Some("python"),
        "c" | "h" => Some("c"),
        "go" => Some("go"),
        "js" | "mjs" => Some("javascript"),
        "ts" => Some("typescript"),
        "java" => Some("java"),
        "sh" | "bash" => Some("shell"),
        "toml" => Some("toml"),
        "json" => Some("json"),
        "md" | "markdown" => Some("markdown"),
        "txt" => Some("text"),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Suitability
// ---------------------------------------------------------------------------

/// Which documents global activation applies to.
#[derive(Debug, Clone, Default)]
pub enum Suitability {
    /// Ask a function.
    Predicate(fn(&Document) -> bool),
    /// Only documents of these kinds.
    Only(Vec<String>),
    /// Every kind except these.
    Except(Vec<String>),
    /// File-backed documents whose name starts with neither a space nor `*`.
    #[default]
    Heuristic,
}

/// The outcome of asking a [`Suitability`] about one document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Enable,
    Skip,
    /// The kind is not known yet.
    NeedsKind,
}

impl Suitability {
    #[must_use]
    pub fn decide(&self, doc: &Document) -> Decision {
        let yes = |ok: bool| if ok { Decision::Enable } else { Decision::Skip };
        match self {
            Self::Predicate(f) => yes(f(doc)),
            Self::Only(kinds) => doc
                .kind()
                .map_or(Decision::NeedsKind, |k| yes(kinds.iter().any(|x| x == k))),
            Self::Except(kinds) => doc
                .kind()
                .map_or(Decision::NeedsKind, |k| yes(!kinds.iter().any(|x| x == k))),
            Self::Heuristic => yes(
                doc.buffer().path().is_some()
                    && !doc.name().starts_with(' ')
                    && !doc.name().starts_with('*'),
            ),
        }
    }
}

// ---------------------------------------------------------------------------
// GlobalChanges
// ---------------------------------------------------------------------------

/// The global switch and its policy.
#[derive(Debug, Clone, Default)]
pub struct GlobalChanges {
    enabled: bool,
    suitability: Suitability,
    existing_buffers: bool,
}

impl GlobalChanges {
    /// A policy that starts switched off. `existing_buffers` makes
    /// [`turn_on`](Self::turn_on) apply to documents that already exist.
    #[must_use]
    pub const fn new(suitability: Suitability, existing_buffers: bool) -> Self {
        Self {
            enabled: false,
            suitability,
            existing_buffers,
        }
    }

    /// Set the switch without touching any document.
    #[must_use]
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.enabled
    }

    #[must_use]
    pub const fn suitability(&self) -> &Suitability {
        &self.suitability
    }

    /// Call for every new document.
    ///
    /// # Errors
    ///
    /// Rendering errors from switching the document on.
    pub fn on_buffer_created(&self, doc: &mut Document) -> Result<(), ChangeError> {
        if !self.enabled {
            return Ok(());
        }
        self.activate(doc)
    }

    /// Call when a document's kind becomes known or changes. Only acts on
    /// documents with a pending activation watch.
    ///
    /// # Errors
    ///
    /// Rendering errors from switching the document on.
    pub fn on_kind_changed(&self, doc: &mut Document) -> Result<(), ChangeError> {
        if !doc.tracker_mut().disarm_watch() || !self.enabled {
            return Ok(());
        }
        self.activate(doc)
    }

    /// Switch the policy on, and apply it to `docs` when configured to
    /// cover existing documents.
    ///
    /// # Errors
    ///
    /// The first rendering error; every document is still processed.
    pub fn turn_on<'a>(
        &mut self,
        docs: impl IntoIterator<Item = &'a mut Document>,
    ) -> Result<(), ChangeError> {
        self.enabled = true;
        debug!(existing = self.existing_buffers, "global change highlighting on");
        if !self.existing_buffers {
            return Ok(());
        }
        let mut first_error = None;
        for doc in docs {
            if let Err(err) = self.activate(doc) {
                first_error.get_or_insert(err);
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    /// Switch the policy off and highlighting off in every document.
    pub fn turn_off<'a>(&mut self, docs: impl IntoIterator<Item = &'a mut Document>) {
        self.enabled = false;
        debug!("global change highlighting off");
        for doc in docs {
            doc.disable();
        }
    }

    fn activate(&self, doc: &mut Document) -> Result<(), ChangeError> {
        match self.suitability.decide(doc) {
            Decision::Enable => {
                let initial = doc.settings().initial_state;
                doc.enable(initial)
            }
            Decision::NeedsKind => {
                debug!(doc = doc.name(), "activation waits for the document kind");
                doc.tracker_mut().arm_watch();
                Ok(())
            }
            Decision::Skip => Ok(()),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
