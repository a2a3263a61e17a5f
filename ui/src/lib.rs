//! # Shade UI Library
//!
//! UI-facing layer of the Shade theme subsystem. This crate owns everything
//! that touches the visual surface: the [`ThemeManager`] orchestrator that
//! swaps styling scopes on the document root, preview mode, the change
//! broadcast consumed by the rest of the desktop shell, and the transient
//! notification feed.
//!
//! The non-visual core (catalog, state machine, persistence) lives in the
//! `shade-engine` crate and is driven exclusively through the manager.
//!
//! ## Modules
//!
//! - [`config`] - Runtime options loaded from file and environment
//! - [`error`] - Application error types
//! - [`logger`] - Logging configuration
//! - [`manager`] - The theme orchestrator
//! - [`notification`] - Transient state-change notices
//! - [`scope`] - The scope-application boundary

pub mod config;
pub mod error;
pub mod logger;
pub mod manager;
pub mod notification;
pub mod scope;

pub use config::ThemeOptions;
pub use error::{AppError, AppResult};
pub use manager::ThemeManager;
pub use notification::{Notice, Severity, ThemeNotifier};
pub use scope::{MemoryScope, ScopeApplier};
