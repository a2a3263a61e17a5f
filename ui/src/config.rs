use crate::error::{AppError, AppResult};
use config::{Config, Environment, File};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// Runtime options for the theme subsystem.
///
/// All fields are optional in the source file; accessors substitute the
/// defaults, so a missing or empty configuration is always valid.
#[derive(Debug, Default, Deserialize)]
pub struct ThemeOptions {
    /// Smoothing delay before a theme change is applied, to avoid perceived
    /// flicker on instantaneous switches. UX choice, not correctness.
    transition_delay_ms: Option<u64>,
    /// Bound on waiting for the durable store during startup restore.
    load_timeout_ms: Option<u64>,
    /// How long a notification stays visible.
    notification_ttl_ms: Option<u64>,
    /// Maximum retained notifications.
    notification_backlog: Option<usize>,
    #[serde(default)]
    logging: LoggingConfig,
}

impl ThemeOptions {
    /// Load from `shade.toml` (optional) with `SHADE__*` environment
    /// overrides.
    pub fn load() -> AppResult<Self> {
        Self::build(File::with_name("shade").required(false))
    }

    /// Load from an explicit file path; the file must exist.
    pub fn load_from(path: &Path) -> AppResult<Self> {
        Self::build(File::from(path))
    }

    fn build(file: File<config::FileSourceFile, config::FileFormat>) -> AppResult<Self> {
        let config = Config::builder()
            .add_source(file)
            .add_source(Environment::with_prefix("SHADE").separator("__"))
            .build()
            .map_err(|e| AppError::Config(format!("configuration loading failed: {e}")))?;

        config
            .try_deserialize()
            .map_err(|e| AppError::Config(format!("invalid configuration: {e}")))
    }

    pub fn transition_delay(&self) -> Duration {
        Duration::from_millis(self.transition_delay_ms.unwrap_or(300))
    }

    pub fn load_timeout(&self) -> Duration {
        Duration::from_millis(self.load_timeout_ms.unwrap_or(2000))
    }

    pub fn notification_ttl(&self) -> Duration {
        Duration::from_millis(self.notification_ttl_ms.unwrap_or(4000))
    }

    pub fn notification_backlog(&self) -> usize {
        self.notification_backlog.unwrap_or(8)
    }

    pub fn logging(&self) -> &LoggingConfig {
        &self.logging
    }

    /// Override the smoothing delay (deterministic tests use zero).
    pub fn with_transition_delay_ms(mut self, millis: u64) -> Self {
        self.transition_delay_ms = Some(millis);
        self
    }

    pub fn with_load_timeout_ms(mut self, millis: u64) -> Self {
        self.load_timeout_ms = Some(millis);
        self
    }

    pub fn with_notification_ttl_ms(mut self, millis: u64) -> Self {
        self.notification_ttl_ms = Some(millis);
        self
    }
}

/// Logging configuration
#[derive(Debug, Default, Deserialize)]
pub struct LoggingConfig {
    level: Option<String>,
    file: Option<String>,
}

impl LoggingConfig {
    pub fn level(&self) -> &str {
        self.level.as_deref().unwrap_or("info")
    }

    pub fn file(&self) -> Option<&str> {
        self.file.as_deref()
    }
}
