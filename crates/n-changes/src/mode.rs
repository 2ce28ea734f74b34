//! Per-buffer change-highlighting mode.
//!
//! A buffer is always in exactly one [`ModeState`]:
//!
//! | State     | Store            | Overlays             | Indicator |
//! |-----------|------------------|----------------------|-----------|
//! | Off       | empty            | none owned           | (none)    |
//! | Active    | tracks every edit| mirror the store     | `+Chg`    |
//! | Passive   | tracks every edit| none owned           | `-Chg`    |
//!
//! Transitions:
//!
//! ```text
//!          enable(initial)            toggle
//!   Off ───────────────────▶ Active ◀───────▶ Passive
//!    ▲                          │                │
//!    └──────── disable ─────────┴────────────────┘
//! ```
//!
//! This is a pure value type. The side effects of a transition (clearing
//! overlays, re-rendering, dropping the store) live in
//! [`ChangeTracker`](crate::tracker::ChangeTracker).

use std::fmt;

use serde::Deserialize;

// ---------------------------------------------------------------------------
// InitialState
// ---------------------------------------------------------------------------

/// The state a buffer enters when change highlighting is switched on.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InitialState {
    #[default]
    Active,
    Passive,
}

impl From<InitialState> for ModeState {
    fn from(initial: InitialState) -> Self {
        match initial {
            InitialState::Active => Self::Active,
            InitialState::Passive => Self::Passive,
        }
    }
}

// ---------------------------------------------------------------------------
// ModeState
// ---------------------------------------------------------------------------

/// Whether changes are tracked, and whether they are shown.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModeState {
    #[default]
    Off,
    /// Changes are tracked and rendered.
    Active,
    /// Changes are tracked but not rendered.
    Passive,
}

impl ModeState {
    /// True unless `Off`.
    #[inline]
    #[must_use]
    pub const fn is_on(self) -> bool {
        !matches!(self, Self::Off)
    }

    /// True when owned overlays should mirror the store.
    #[inline]
    #[must_use]
    pub const fn renders(self) -> bool {
        matches!(self, Self::Active)
    }

    /// The state after `toggle`. `Off` switches on in `Active`.
    #[must_use]
    pub const fn toggled(self) -> Self {
        match self {
            Self::Off | Self::Passive => Self::Active,
            Self::Active => Self::Passive,
        }
    }

    /// Lower-case name, used in logs and status messages.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Off => "off",
            Self::Active => "active",
            Self::Passive => "passive",
        }
    }
}

impl fmt::Display for ModeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ---------------------------------------------------------------------------
// Indicators
// ---------------------------------------------------------------------------

/// Mode-line text for each state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Indicators {
    pub active: String,
    pub passive: String,
}

impl Indicators {
    /// The indicator for `state`; empty when `Off`.
    #[must_use]
    pub fn for_state(&self, state: ModeState) -> &str {
        match state {
            ModeState::Off => "",
            ModeState::Active => &self.active,
            ModeState::Passive => &self.passive,
        }
    }
}

impl Default for Indicators {
    fn default() -> Self {
        Self {
            active: "+Chg".to_string(),
            passive: "-Chg".to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    // -- Transitions --------------------------------------------------------

    #[test]
    fn default_is_off() {
        assert_eq!(ModeState::default(), ModeState::Off);
        assert!(!ModeState::Off.is_on());
    }

    #[test]
    fn toggle_cycles_between_active_and_passive() {
        assert_eq!(ModeState::Active.toggled(), ModeState::Passive);
        assert_eq!(ModeState::Passive.toggled(), ModeState::Active);
    }

    #[test]
    fn toggle_from_off_is_active() {
        assert_eq!(ModeState::Off.toggled(), ModeState::Active);
    }

    #[test]
    fn only_active_renders() {
        assert!(ModeState::Active.renders());
        assert!(!ModeState::Passive.renders());
        assert!(!ModeState::Off.renders());
        assert!(ModeState::Passive.is_on());
    }

    #[test]
    fn initial_state_converts() {
        assert_eq!(ModeState::from(InitialState::Active), ModeState::Active);
        assert_eq!(ModeState::from(InitialState::Passive), ModeState::Passive);
    }

    // -- Indicators ---------------------------------------------------------

    #[test]
    fn default_indicators() {
        let ind = Indicators::default();
        assert_eq!(ind.for_state(ModeState::Active), "+Chg");
        assert_eq!(ind.for_state(ModeState::Passive), "-Chg");
        assert_eq!(ind.for_state(ModeState::Off), "");
    }

    #[test]
    fn display_names() {
        assert_eq!(ModeState::Active.to_string(), "active");
        assert_eq!(format!("{}", ModeState::Off), "off");
    }
}
