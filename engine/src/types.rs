use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display};

/// Id of the baseline theme. Unknown ids resolve to it, failed theme
/// changes fall back to it, and it is the only theme with an empty scope.
pub const BASELINE_THEME_ID: &str = "default";

/// Grouping used by the theme picker UI. Purely presentational.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThemeCategory {
    Basic,
    Gender,
    Style,
    Nature,
}

impl ThemeCategory {
    pub fn label(&self) -> &'static str {
        match self {
            ThemeCategory::Basic => "Basic",
            ThemeCategory::Gender => "Gender",
            ThemeCategory::Style => "Style",
            ThemeCategory::Nature => "Nature",
        }
    }

    pub fn all() -> &'static [ThemeCategory] {
        &[
            ThemeCategory::Basic,
            ThemeCategory::Gender,
            ThemeCategory::Style,
            ThemeCategory::Nature,
        ]
    }
}

impl Display for ThemeCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Swatch colors shown in the theme picker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThemePreview {
    pub primary: String,
    pub secondary: String,
    pub accent: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gradient: Option<String>,
}

/// Full palette of a user-authored theme.
///
/// Built-in themes carry their colors in stylesheet scopes and only expose
/// the preview swatch; custom themes carry the whole palette as data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomPalette {
    // Backgrounds
    pub bg_base: String,
    pub bg_panel: String,
    pub bg_elevated: String,
    // Text
    pub text_primary: String,
    pub text_secondary: String,
    pub text_muted: String,
    // Accents
    pub accent_primary: String,
    pub accent_secondary: String,
    // Borders
    pub border_light: String,
    pub border_strong: String,
    // Shadows (hex with alpha channel)
    pub shadow_soft: String,
    pub shadow_medium: String,
    pub shadow_heavy: String,
    // Semantic colors
    pub success: String,
    pub warning: String,
    pub error: String,
    pub info: String,
    // Chat bubbles
    pub bubble_incoming: String,
    pub bubble_outgoing: String,
}

/// A cataloged visual configuration.
///
/// `class_name` is the exclusive styling-scope token applied to the
/// document root; the baseline theme uses the empty string and is rendered
/// with no scope at all.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Theme {
    pub id: String,
    pub name: String,
    pub description: String,
    pub class_name: String,
    pub category: ThemeCategory,
    pub preview: ThemePreview,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom: Option<CustomPalette>,
}

impl Theme {
    /// The scope token to apply, or `None` for the baseline theme.
    pub fn scope(&self) -> Option<&str> {
        if self.class_name.is_empty() {
            None
        } else {
            Some(&self.class_name)
        }
    }

    pub fn is_custom(&self) -> bool {
        self.custom.is_some()
    }
}

/// Persisted record of the user's theme selection.
///
/// Created on first selection, overwritten on every subsequent one, read
/// once at startup, never deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserThemeSettings {
    pub selected_theme: String,
    pub last_updated: DateTime<Utc>,
}

impl UserThemeSettings {
    pub fn new(theme_id: impl Into<String>) -> Self {
        Self {
            selected_theme: theme_id.into(),
            last_updated: Utc::now(),
        }
    }
}

impl Default for UserThemeSettings {
    fn default() -> Self {
        Self::new(BASELINE_THEME_ID)
    }
}

/// Payload delivered to change observers after a committed theme switch.
#[derive(Debug, Clone, PartialEq)]
pub struct ThemeChange {
    pub theme_id: String,
    pub previous_theme_id: Option<String>,
    pub timestamp: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn baseline_theme_has_no_scope() {
        let theme = Theme {
            id: BASELINE_THEME_ID.to_string(),
            name: "Default".to_string(),
            description: String::new(),
            class_name: String::new(),
            category: ThemeCategory::Basic,
            preview: ThemePreview {
                primary: "#ffffff".to_string(),
                secondary: "#f5f5f5".to_string(),
                accent: "#0099ff".to_string(),
                gradient: None,
            },
            custom: None,
        };
        assert_eq!(theme.scope(), None);
        assert!(!theme.is_custom());
    }

    #[test]
    fn settings_default_selects_baseline() {
        let settings = UserThemeSettings::default();
        assert_eq!(settings.selected_theme, BASELINE_THEME_ID);
    }

    #[test]
    fn category_labels_cover_all_variants() {
        for category in ThemeCategory::all() {
            assert!(!category.label().is_empty());
        }
        assert_eq!(ThemeCategory::all().len(), 4);
    }
}
