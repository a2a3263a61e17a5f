//! # Shade Engine Library
//!
//! Core library for the Shade theme subsystem. The engine owns everything
//! that does not touch the visual surface: the static theme catalog,
//! user-authored custom themes, the transient theme state machine with its
//! observer registry, and the two-tier persistence of the selected theme.
//!
//! The visual side (scope application, change broadcasting, notifications)
//! lives in the `shade` crate, which drives this engine through the
//! `ThemeManager` orchestrator.
//!
//! ## Modules
//!
//! - [`catalog`] - Built-in theme definitions and the custom-theme registry
//! - [`error`] - Engine error types
//! - [`persistence`] - Settings stores, fast key-value store and the
//!   fallback adapter between them
//! - [`state`] - In-memory theme state machine with subscribe/notify
//! - [`types`] - Theme, palette and settings data model
//! - [`validation`] - Input validation for theme ids and palettes

pub mod catalog;
pub mod error;
pub mod persistence;
pub mod state;
pub mod types;
pub mod validation;

pub use catalog::Catalog;
pub use error::{EngineError, EngineResult};
pub use state::{ThemeState, ThemeStateManager};
pub use types::{BASELINE_THEME_ID, Theme, ThemeCategory, ThemeChange, UserThemeSettings};
