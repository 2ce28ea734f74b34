//! # n-changes — Change highlighting core for n-chg
//!
//! Tracks which text in a buffer has changed, ages those changes, and keeps
//! a set of display overlays in step with them:
//!
//! - **[`position`]** — char-offset `Span`s and `(line, col)` `Position`s
//! - **[`edit`]** — `EditEvent`, the record of one text mutation
//! - **[`buffer`]** — `Buffer` wrapping a rope with editing and file I/O
//! - **[`category`]** — `Category` and the `CategoryTable` of style keys
//! - **[`store`]** — `AnnotationStore`, the partitioned map of changed regions
//! - **[`classify`]** — turns an edit into a `New` region or a `Deleted` marker
//! - **[`overlay`]** — the `RenderLayer` seam and the in-memory `OverlaySet`
//! - **[`fixup`]** — reconciles overlays with the store over a span
//! - **[`navigate`]** — next / previous change
//! - **[`mode`]** — `Off` / `Active` / `Passive` and mode-line indicators
//! - **[`tracker`]** — `ChangeTracker`, one buffer's change-highlighting engine
//! - **[`diff`]** — marks the differences between two buffers
//! - **[`history`]** — undo / redo that restores change tags
//! - **[`document`]** — a buffer with its history, tracker and overlays
//! - **[`global`]** — automatic activation across documents
//! - **[`config`]** — `ChangesConfig` loaded from TOML
//! - **[`error`]** — error types for each layer

pub mod buffer;
pub mod category;
pub mod classify;
pub mod config;
pub mod diff;
pub mod document;
pub mod edit;
pub mod error;
pub mod fixup;
pub mod global;
pub mod history;
pub mod mode;
pub mod navigate;
pub mod overlay;
pub mod position;
pub mod store;
pub mod tracker;
