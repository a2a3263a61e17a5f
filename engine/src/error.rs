use crate::validation::ThemeValidationError;
use thiserror::Error;

/// Errors produced by the theme engine.
///
/// Nothing in the engine is allowed to panic across its public surface;
/// every fallible operation reports one of these variants. The UI layer
/// decides which of them reach the user (most are logged and absorbed,
/// per the best-effort durability policy).
#[derive(Debug, Error)]
pub enum EngineError {
    /// A theme id that does not resolve against the catalog.
    ///
    /// Callers are expected to treat this as equivalent to the baseline
    /// theme rather than surfacing it.
    #[error("unknown theme id '{0}'")]
    UnknownTheme(String),

    /// Theme id or palette validation failed.
    #[error(transparent)]
    Validation(#[from] ThemeValidationError),

    /// A persistence backend failed. Best-effort: the in-memory theme
    /// state stays authoritative for the running session.
    #[error("store operation failed: {0}")]
    Store(String),

    /// Settings or theme records could not be encoded/decoded.
    #[error("serialization failed: {0}")]
    Serialization(String),

    /// A bounded wait on a store elapsed.
    #[error("operation timed out: {0}")]
    Timeout(String),

    /// The visual scope could not be applied.
    #[error("scope application failed: {0}")]
    Scope(String),
}

/// Result type alias for engine operations
pub type EngineResult<T> = Result<T, EngineError>;
