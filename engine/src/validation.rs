use crate::types::CustomPalette;
use thiserror::Error;

/// Core validation trait implemented by all engine validators.
///
/// Validators are small, stateless and composable; the custom-theme editor
/// runs several of them before a palette is accepted into the catalog.
pub trait Validator<T: ?Sized> {
    type Error;

    /// Validate the input and return Ok(()) if valid, or Err with validation error
    fn validate(&self, input: &T) -> Result<(), Self::Error>;
}

/// Validation errors specific to theme data
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ThemeValidationError {
    #[error("invalid theme id '{id}': {reason}")]
    InvalidThemeId { id: String, reason: String },
    #[error("invalid color '{value}' for '{field}': {reason}")]
    InvalidColor {
        field: String,
        value: String,
        reason: String,
    },
    #[error("missing field '{field}'")]
    MissingField { field: String },
}

impl ThemeValidationError {
    /// Message suitable for direct display in the theme editor.
    pub fn user_message(&self) -> String {
        match self {
            ThemeValidationError::InvalidThemeId { id, reason } => {
                format!(
                    "Invalid theme id: '{id}'\n\n\
                    Reason: {reason}\n\n\
                    Theme ids may contain alphanumerics, hyphens and underscores only."
                )
            }
            ThemeValidationError::InvalidColor {
                field,
                value,
                reason,
            } => {
                format!(
                    "Invalid color for '{field}': '{value}'\n\n\
                    Reason: {reason}\n\n\
                    Use hex notation such as #1a2b3c (or #1a2b3c80 with alpha)."
                )
            }
            ThemeValidationError::MissingField { field } => {
                format!("Missing value: '{field}'\n\nPlease fill in all palette fields.")
            }
        }
    }
}

/// Validator for theme ids
pub struct ThemeIdValidator;

impl Validator<str> for ThemeIdValidator {
    type Error = ThemeValidationError;

    fn validate(&self, input: &str) -> Result<(), Self::Error> {
        if input.is_empty() {
            return Err(ThemeValidationError::InvalidThemeId {
                id: input.to_string(),
                reason: "id cannot be empty".to_string(),
            });
        }

        if input.len() > 50 {
            return Err(ThemeValidationError::InvalidThemeId {
                id: input.to_string(),
                reason: "id too long (max 50 characters)".to_string(),
            });
        }

        if !input
            .chars()
            .all(|c| c.is_alphanumeric() || c == '-' || c == '_')
        {
            return Err(ThemeValidationError::InvalidThemeId {
                id: input.to_string(),
                reason: "id contains invalid characters (only alphanumerics, hyphens and underscores allowed)"
                    .to_string(),
            });
        }

        if input.starts_with('-')
            || input.starts_with('_')
            || input.ends_with('-')
            || input.ends_with('_')
        {
            return Err(ThemeValidationError::InvalidThemeId {
                id: input.to_string(),
                reason: "id cannot start or end with hyphens or underscores".to_string(),
            });
        }

        Ok(())
    }
}

/// Validator for a single color value in hex notation
pub struct HexColorValidator {
    field: String,
}

impl HexColorValidator {
    pub fn for_field(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
        }
    }

    fn error(&self, value: &str, reason: &str) -> ThemeValidationError {
        ThemeValidationError::InvalidColor {
            field: self.field.clone(),
            value: value.to_string(),
            reason: reason.to_string(),
        }
    }
}

impl Validator<str> for HexColorValidator {
    type Error = ThemeValidationError;

    fn validate(&self, input: &str) -> Result<(), Self::Error> {
        if input.is_empty() {
            return Err(ThemeValidationError::MissingField {
                field: self.field.clone(),
            });
        }

        let Some(digits) = input.strip_prefix('#') else {
            return Err(self.error(input, "color must start with '#'"));
        };

        // 6 digits for RGB, 8 for RGBA (used by shadow colors)
        if digits.len() != 6 && digits.len() != 8 {
            return Err(self.error(input, "expected 6 or 8 hex digits"));
        }

        if !digits.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(self.error(input, "contains non-hex characters"));
        }

        Ok(())
    }
}

/// Validator for a complete custom-theme palette
pub struct CustomPaletteValidator;

impl Validator<CustomPalette> for CustomPaletteValidator {
    type Error = ThemeValidationError;

    fn validate(&self, palette: &CustomPalette) -> Result<(), Self::Error> {
        let fields: [(&str, &str); 19] = [
            ("bg_base", &palette.bg_base),
            ("bg_panel", &palette.bg_panel),
            ("bg_elevated", &palette.bg_elevated),
            ("text_primary", &palette.text_primary),
            ("text_secondary", &palette.text_secondary),
            ("text_muted", &palette.text_muted),
            ("accent_primary", &palette.accent_primary),
            ("accent_secondary", &palette.accent_secondary),
            ("border_light", &palette.border_light),
            ("border_strong", &palette.border_strong),
            ("shadow_soft", &palette.shadow_soft),
            ("shadow_medium", &palette.shadow_medium),
            ("shadow_heavy", &palette.shadow_heavy),
            ("success", &palette.success),
            ("warning", &palette.warning),
            ("error", &palette.error),
            ("info", &palette.info),
            ("bubble_incoming", &palette.bubble_incoming),
            ("bubble_outgoing", &palette.bubble_outgoing),
        ];

        for (name, value) in fields {
            HexColorValidator::for_field(name).validate(value)?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use claims::{assert_err, assert_ok};

    fn palette() -> CustomPalette {
        CustomPalette {
            bg_base: "#1a1a2e".into(),
            bg_panel: "#16213e".into(),
            bg_elevated: "#0f3460".into(),
            text_primary: "#eaeaea".into(),
            text_secondary: "#c0c0c0".into(),
            text_muted: "#808080".into(),
            accent_primary: "#e94560".into(),
            accent_secondary: "#533483".into(),
            border_light: "#2a2a3e".into(),
            border_strong: "#3a3a4e".into(),
            shadow_soft: "#00000022".into(),
            shadow_medium: "#00000044".into(),
            shadow_heavy: "#00000088".into(),
            success: "#4caf50".into(),
            warning: "#ff9800".into(),
            error: "#f44336".into(),
            info: "#2196f3".into(),
            bubble_incoming: "#2a2a3e".into(),
            bubble_outgoing: "#e94560".into(),
        }
    }

    #[test]
    fn theme_id_rules() {
        let v = ThemeIdValidator;
        assert_ok!(v.validate("dark"));
        assert_ok!(v.validate("custom-1718000000000"));
        assert_err!(v.validate(""));
        assert_err!(v.validate("-dark"));
        assert_err!(v.validate("dark_"));
        assert_err!(v.validate("dark theme"));
        assert_err!(v.validate(&"x".repeat(51)));
    }

    #[test]
    fn hex_color_rules() {
        let v = HexColorValidator::for_field("accent_primary");
        assert_ok!(v.validate("#e94560"));
        assert_ok!(v.validate("#00000044"));
        assert_err!(v.validate("e94560"));
        assert_err!(v.validate("#e945"));
        assert_err!(v.validate("#gggggg"));
        assert!(matches!(
            v.validate(""),
            Err(ThemeValidationError::MissingField { .. })
        ));
    }

    #[test]
    fn palette_validation_reports_offending_field() {
        let mut bad = palette();
        bad.bubble_outgoing = "red".into();

        let err = CustomPaletteValidator.validate(&bad).unwrap_err();
        match err {
            ThemeValidationError::InvalidColor { field, .. } => {
                assert_eq!(field, "bubble_outgoing");
            }
            other => panic!("unexpected error: {other:?}"),
        }

        assert_ok!(CustomPaletteValidator.validate(&palette()));
    }

    #[test]
    fn user_messages_name_the_input() {
        let err = ThemeIdValidator.validate("bad id").unwrap_err();
        assert!(err.user_message().contains("bad id"));
    }
}
