use engine::EngineError;
use std::fmt::Display;

/// Application-wide error types for the Shade UI layer.
///
/// Nothing in the theme subsystem is allowed to escape the [`crate::ThemeManager`]
/// boundary as a panic or unhandled error; public operations either absorb
/// failures into a safe fallback or translate them into one of these
/// variants for the caller (the custom-theme editor is the main consumer).
#[derive(Debug, Clone, PartialEq)]
pub enum AppError {
    /// Theme resolution or validation failures.
    Theme(String),

    /// Theme state management issues.
    State(String),

    /// Persistence failures that had to be surfaced (most are absorbed as
    /// best-effort degradation and only logged).
    Store(String),

    /// Configuration loading and validation errors.
    Config(String),
}

impl Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AppError::Theme(msg) => write!(f, "Theme Error: {msg}"),
            AppError::State(msg) => write!(f, "State Error: {msg}"),
            AppError::Store(msg) => write!(f, "Store Error: {msg}"),
            AppError::Config(msg) => write!(f, "Configuration Error: {msg}"),
        }
    }
}

impl std::error::Error for AppError {}

impl From<EngineError> for AppError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::UnknownTheme(_) => AppError::Theme(err.to_string()),
            EngineError::Validation(e) => AppError::Theme(e.user_message()),
            EngineError::Scope(_) => AppError::State(err.to_string()),
            EngineError::Store(_) | EngineError::Serialization(_) | EngineError::Timeout(_) => {
                AppError::Store(err.to_string())
            }
        }
    }
}

/// Result type alias for application operations
pub type AppResult<T> = Result<T, AppError>;
