//! Configuration — change-highlighting settings loaded from TOML.
//!
//! Every field has a default, so an empty file (or no file at all) gives the
//! stock behaviour:
//!
//! | Key                    | Default                       |
//! |------------------------|-------------------------------|
//! | `initial_state`        | `"active"`                    |
//! | `rotate_on_save`       | `false`                       |
//! | `active_indicator`     | `"+Chg"`                      |
//! | `passive_indicator`    | `"-Chg"`                      |
//! | `faces.new`            | `"highlight-changes"`         |
//! | `faces.deleted`        | `"highlight-changes-delete"`  |
//! | `faces.aging`          | seven-colour palette          |
//! | `global.enabled`       | `false`                       |
//! | `global.modes`         | `"heuristic"`                 |
//! | `global.existing_buffers` | `false`                    |
//! | `compare.granularity`  | `"lines"`                     |
//! | `compare.refine`       | `true`                        |

use std::path::Path;
use std::sync::Arc;

use serde::Deserialize;
use tracing::debug;

use crate::category::{
    CategoryTable, DEFAULT_AGING, DEFAULT_DELETED_STYLE, DEFAULT_NEW_STYLE, StyleKey,
};
use crate::diff::{Granularity, SimilarAligner};
use crate::document::ChangeSettings;
use crate::error::ConfigError;
use crate::global::{GlobalChanges, Suitability};
use crate::mode::{Indicators, InitialState};

// ---------------------------------------------------------------------------
// Sections
// ---------------------------------------------------------------------------

/// `[faces]` — style keys for each category.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FacesConfig {
    pub new: String,
    pub deleted: String,
    pub aging: Vec<String>,
}

impl Default for FacesConfig {
    fn default() -> Self {
        Self {
            new: DEFAULT_NEW_STYLE.to_string(),
            deleted: DEFAULT_DELETED_STYLE.to_string(),
            aging: DEFAULT_AGING.iter().map(ToString::to_string).collect(),
        }
    }
}

/// Which document kinds global activation covers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModesConfig {
    #[default]
    Heuristic,
    Only(Vec<String>),
    Except(Vec<String>),
}

/// `[global]` — automatic activation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GlobalConfig {
    pub enabled: bool,
    pub modes: ModesConfig,
    pub existing_buffers: bool,
}

/// `[compare]` — the diff bridge's aligner.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CompareConfig {
    pub granularity: Granularity,
    pub refine: bool,
}

impl Default for CompareConfig {
    fn default() -> Self {
        Self {
            granularity: Granularity::Lines,
            refine: true,
        }
    }
}

// ---------------------------------------------------------------------------
// ChangesConfig
// ---------------------------------------------------------------------------

/// The whole configuration file.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ChangesConfig {
    pub initial_state: InitialState,
    pub rotate_on_save: bool,
    pub active_indicator: String,
    pub passive_indicator: String,
    pub faces: FacesConfig,
    pub global: GlobalConfig,
    pub compare: CompareConfig,
}

impl Default for ChangesConfig {
    fn default() -> Self {
        let indicators = Indicators::default();
        Self {
            initial_state: InitialState::default(),
            rotate_on_save: false,
            active_indicator: indicators.active,
            passive_indicator: indicators.passive,
            faces: FacesConfig::default(),
            global: GlobalConfig::default(),
            compare: CompareConfig::default(),
        }
    }
}

impl ChangesConfig {
    /// Read and validate a config file.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Io`] if the file can't be read, [`ConfigError::Parse`]
    /// for malformed TOML, [`ConfigError::Validation`] for bad values.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml_str(&text)?;
        debug!(path = %path.display(), "loaded change highlighting config");
        Ok(config)
    }

    /// Parse and validate TOML text.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Parse`] or [`ConfigError::Validation`].
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Check values the types can't express.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Validation`] naming the first bad field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.faces.new.trim().is_empty() {
            return Err(ConfigError::Validation("faces.new must not be empty".into()));
        }
        if self.faces.deleted.trim().is_empty() {
            return Err(ConfigError::Validation(
                "faces.deleted must not be empty".into(),
            ));
        }
        if let Some(i) = self.faces.aging.iter().position(|f| f.trim().is_empty()) {
            return Err(ConfigError::Validation(format!(
                "faces.aging[{i}] must not be empty"
            )));
        }
        Ok(())
    }

    // -- Conversions --------------------------------------------------------

    /// The category table described by `[faces]`.
    #[must_use]
    pub fn category_table(&self) -> CategoryTable {
        let aging: Vec<StyleKey> = self.faces.aging.iter().map(StyleKey::new).collect();
        CategoryTable::rebuild(
            StyleKey::new(self.faces.new.as_str()),
            StyleKey::new(self.faces.deleted.as_str()),
            &aging,
        )
    }

    #[must_use]
    pub const fn aligner(&self) -> SimilarAligner {
        SimilarAligner::new(self.compare.granularity, self.compare.refine)
    }

    #[must_use]
    pub fn indicators(&self) -> Indicators {
        Indicators {
            active: self.active_indicator.clone(),
            passive: self.passive_indicator.clone(),
        }
    }

    /// Everything a [`Document`](crate::document::Document) needs.
    #[must_use]
    pub fn settings(&self) -> ChangeSettings {
        ChangeSettings {
            table: Arc::new(self.category_table()),
            initial_state: self.initial_state,
            rotate_on_save: self.rotate_on_save,
            indicators: self.indicators(),
            aligner: self.aligner(),
        }
    }

    /// The global activation policy, already switched on when
    /// `global.enabled` is set. Existing documents are not touched.
    #[must_use]
    pub fn global_changes(&self) -> GlobalChanges {
        let suitability = match &self.global.modes {
            ModesConfig::Heuristic => Suitability::Heuristic,
            ModesConfig::Only(kinds) => Suitability::Only(kinds.clone()),
            ModesConfig::Except(kinds) => Suitability::Except(kinds.clone()),
        };
        GlobalChanges::new(suitability, self.global.existing_buffers)
            .with_enabled(self.global.enabled)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
