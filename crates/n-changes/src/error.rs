//! Typed error variants for the change engine.
//!
//! Three families, one per layer:
//!
//! - [`BufferError`] — text mutations and file I/O on a [`Buffer`](crate::buffer::Buffer).
//! - [`ChangeError`] — classification, rendering, rotation and comparison.
//! - [`ConfigError`] — loading and validating [`ChangesConfig`](crate::config::ChangesConfig).
//!
//! None of them is fatal. `UnknownCategory` and `NoFaceForCategory` are
//! reported after the operation has finished everything it could do; the
//! others abort before touching any state.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::category::Category;
use crate::diff::Side;

/// Errors from buffer editing and file I/O.
#[derive(Debug, Error)]
pub enum BufferError {
    /// The buffer is read-only and refuses text mutation.
    #[error("buffer is read-only")]
    ReadOnly,

    /// An offset lies past the end of the text.
    #[error("offset {offset} out of bounds (length {len})")]
    OutOfBounds { offset: usize, len: usize },

    /// `save` was called on a buffer with no file path.
    #[error("buffer has no file path")]
    NoPath,

    /// Reading or writing the backing file failed.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Errors from the change-tracking engine.
#[derive(Debug, Error)]
pub enum ChangeError {
    /// A category outside the configured table was aged or looked up. The
    /// offending region is skipped, the rest of the operation completes.
    #[error("unknown change category {0}")]
    UnknownCategory(Category),

    /// A region could not be rendered because its style cannot be resolved.
    /// The region stays unrendered, the rest of the pass completes.
    #[error("no face for change category {0}")]
    NoFaceForCategory(Category),

    /// Persistent tagging was requested on a read-only buffer. Read-only
    /// comparison targets must go through the transient path.
    #[error("cannot record changes in a read-only buffer")]
    ReadOnlyViolation,

    /// A comparison side has unsaved modifications.
    #[error("{side} buffer has unsaved changes; save it before comparing")]
    StaleComparisonTarget { side: Side },

    #[error(transparent)]
    Buffer(#[from] BufferError),
}

/// Errors from loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("I/O error reading config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The config file is not valid TOML or doesn't match the schema.
    #[error("TOML parse error in config: {0}")]
    Parse(#[from] toml::de::Error),

    /// A field value failed semantic validation.
    #[error("config validation error: {0}")]
    Validation(String),
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buffer_error_messages() {
        assert_eq!(BufferError::ReadOnly.to_string(), "buffer is read-only");
        assert_eq!(
            BufferError::OutOfBounds { offset: 9, len: 4 }.to_string(),
            "offset 9 out of bounds (length 4)"
        );
    }

    #[test]
    fn change_error_wraps_buffer_error() {
        let err = ChangeError::from(BufferError::NoPath);
        assert_eq!(err.to_string(), "buffer has no file path");
    }

    #[test]
    fn stale_target_names_the_side() {
        let err = ChangeError::StaleComparisonTarget { side: Side::B };
        assert!(err.to_string().starts_with("B buffer"));
    }

    #[test]
    fn category_errors_display_category() {
        assert_eq!(
            ChangeError::UnknownCategory(Category::Aged(9)).to_string(),
            "unknown change category aged-9"
        );
        assert_eq!(
            ChangeError::NoFaceForCategory(Category::New).to_string(),
            "no face for change category new"
        );
    }
}
