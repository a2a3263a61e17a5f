use crate::error::{EngineError, EngineResult};
use crate::types::{CustomPalette, Theme, ThemeCategory, ThemePreview};
use crate::validation::{CustomPaletteValidator, ThemeIdValidator, Validator};
use chrono::Utc;
use once_cell::sync::Lazy;
use std::sync::{PoisonError, RwLock};

fn builtin(
    id: &str,
    name: &str,
    description: &str,
    class_name: &str,
    category: ThemeCategory,
    preview: [&str; 3],
    gradient: Option<&str>,
) -> Theme {
    Theme {
        id: id.to_string(),
        name: name.to_string(),
        description: description.to_string(),
        class_name: class_name.to_string(),
        category,
        preview: ThemePreview {
            primary: preview[0].to_string(),
            secondary: preview[1].to_string(),
            accent: preview[2].to_string(),
            gradient: gradient.map(str::to_string),
        },
        custom: None,
    }
}

/// The 11 built-in themes, grouped by picker category.
static BUILTIN_THEMES: Lazy<Vec<Theme>> = Lazy::new(|| {
    use ThemeCategory::*;
    vec![
        builtin(
            "default",
            "Classic",
            "The stock desktop look",
            "",
            Basic,
            ["#f5f6fa", "#ffffff", "#12b7f5"],
            None,
        ),
        builtin(
            "dark",
            "Midnight",
            "Low-light friendly dark mode",
            "theme-dark",
            Basic,
            ["#1a1a2e", "#16213e", "#0f3460"],
            None,
        ),
        builtin(
            "pink",
            "Peach Blossom",
            "Soft rose tones",
            "theme-pink",
            Gender,
            ["#ffe4ec", "#fff0f5", "#ff6fa5"],
            Some("linear-gradient(135deg, #ffe4ec, #ff6fa5)"),
        ),
        builtin(
            "blue",
            "Deep Sea",
            "Cool steel blues",
            "theme-blue",
            Gender,
            ["#dceefb", "#f0f8ff", "#2d7dd2"],
            Some("linear-gradient(135deg, #dceefb, #2d7dd2)"),
        ),
        builtin(
            "neon",
            "Neon Nights",
            "High-contrast arcade glow",
            "theme-neon",
            Style,
            ["#0d0d1a", "#1a1a2e", "#ff0080"],
            Some("linear-gradient(135deg, #ff0080, #00ffff)"),
        ),
        builtin(
            "pastel",
            "Pastel Dream",
            "Muted candy colors",
            "theme-pastel",
            Style,
            ["#fdf6f0", "#f7e8ee", "#b5a7d6"],
            None,
        ),
        builtin(
            "retro",
            "Retro Terminal",
            "Green-on-black nostalgia",
            "theme-retro",
            Style,
            ["#101510", "#182018", "#39ff14"],
            None,
        ),
        builtin(
            "ocean",
            "Ocean",
            "Waves and open water",
            "theme-ocean",
            Nature,
            ["#e0f7fa", "#b2ebf2", "#0097a7"],
            Some("linear-gradient(180deg, #e0f7fa, #0097a7)"),
        ),
        builtin(
            "forest",
            "Forest",
            "Deep greens and moss",
            "theme-forest",
            Nature,
            ["#e8f5e9", "#c8e6c9", "#2e7d32"],
            None,
        ),
        builtin(
            "sunset",
            "Sunset",
            "Warm dusk oranges",
            "theme-sunset",
            Nature,
            ["#fff3e0", "#ffe0b2", "#ef6c00"],
            Some("linear-gradient(180deg, #fff3e0, #ef6c00)"),
        ),
        builtin(
            "sakura",
            "Sakura",
            "Cherry blossom season",
            "theme-sakura",
            Nature,
            ["#fff0f3", "#ffd9e0", "#d81b60"],
            None,
        ),
    ]
});

/// Read-only built-in themes plus a mutable registry of user-authored ones.
///
/// Custom themes are merged into listings at read time; the built-ins are
/// never mutated. The registry itself does not persist anything — the
/// manager writes the custom set through the persistence adapter after
/// every edit.
pub struct Catalog {
    custom: RwLock<Vec<Theme>>,
}

impl Catalog {
    pub fn new() -> Self {
        Self {
            custom: RwLock::new(Vec::new()),
        }
    }

    pub fn builtin_themes() -> &'static [Theme] {
        &BUILTIN_THEMES
    }

    /// Full catalog: built-ins followed by custom themes.
    pub fn themes(&self) -> Vec<Theme> {
        let mut all = BUILTIN_THEMES.clone();
        all.extend(self.custom_themes());
        all
    }

    pub fn theme_by_id(&self, id: &str) -> Option<Theme> {
        BUILTIN_THEMES
            .iter()
            .find(|t| t.id == id)
            .cloned()
            .or_else(|| self.read_custom().iter().find(|t| t.id == id).cloned())
    }

    pub fn themes_by_category(&self, category: ThemeCategory) -> Vec<Theme> {
        self.themes()
            .into_iter()
            .filter(|t| t.category == category)
            .collect()
    }

    pub fn custom_themes(&self) -> Vec<Theme> {
        self.read_custom().clone()
    }

    /// Replace the custom-theme set, typically with records loaded from the
    /// durable store at startup. Entries colliding with built-in ids are
    /// dropped with a warning.
    pub fn install_custom(&self, themes: Vec<Theme>) {
        let mut accepted = Vec::with_capacity(themes.len());
        for theme in themes {
            if BUILTIN_THEMES.iter().any(|b| b.id == theme.id) {
                log::warn!(
                    "ignoring custom theme '{}': id collides with a built-in theme",
                    theme.id
                );
                continue;
            }
            accepted.push(theme);
        }
        *self.write_custom() = accepted;
    }

    /// Create a custom theme with a generated `custom-<millis>` id.
    pub fn create_custom(
        &self,
        name: &str,
        description: &str,
        palette: CustomPalette,
    ) -> EngineResult<Theme> {
        CustomPaletteValidator.validate(&palette)?;

        let mut custom = self.write_custom();
        let mut millis = Utc::now().timestamp_millis();
        // Bump on collision so rapid successive creates stay unique.
        while custom.iter().any(|t| t.id == format!("custom-{millis}")) {
            millis += 1;
        }
        let id = format!("custom-{millis}");
        ThemeIdValidator.validate(&id)?;

        let theme = Theme {
            id: id.clone(),
            name: name.to_string(),
            description: description.to_string(),
            class_name: format!("theme-{id}"),
            category: ThemeCategory::Style,
            preview: ThemePreview {
                primary: palette.bg_base.clone(),
                secondary: palette.bg_panel.clone(),
                accent: palette.accent_primary.clone(),
                gradient: None,
            },
            custom: Some(palette),
        };
        custom.push(theme.clone());
        Ok(theme)
    }

    /// Update a custom theme in place by id.
    pub fn update_custom(
        &self,
        id: &str,
        name: &str,
        description: &str,
        palette: CustomPalette,
    ) -> EngineResult<Theme> {
        CustomPaletteValidator.validate(&palette)?;

        let mut custom = self.write_custom();
        let Some(theme) = custom.iter_mut().find(|t| t.id == id) else {
            return Err(EngineError::UnknownTheme(id.to_string()));
        };
        theme.name = name.to_string();
        theme.description = description.to_string();
        theme.preview = ThemePreview {
            primary: palette.bg_base.clone(),
            secondary: palette.bg_panel.clone(),
            accent: palette.accent_primary.clone(),
            gradient: None,
        };
        theme.custom = Some(palette);
        Ok(theme.clone())
    }

    /// Remove a custom theme. Returns whether an entry was deleted.
    pub fn remove_custom(&self, id: &str) -> bool {
        let mut custom = self.write_custom();
        let before = custom.len();
        custom.retain(|t| t.id != id);
        before != custom.len()
    }

    fn read_custom(&self) -> std::sync::RwLockReadGuard<'_, Vec<Theme>> {
        self.custom.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_custom(&self) -> std::sync::RwLockWriteGuard<'_, Vec<Theme>> {
        self.custom.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::BASELINE_THEME_ID;
    use claims::{assert_none, assert_ok, assert_some};
    use std::collections::HashSet;

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
    fn builtins_have_unique_ids_and_scopes() {
        let themes = Catalog::builtin_themes();
        assert_eq!(themes.len(), 11);

        let ids: HashSet<_> = themes.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids.len(), themes.len());

        // Non-empty scope tokens are mutually exclusive
        let scopes: HashSet<_> = themes.iter().filter_map(|t| t.scope()).collect();
        assert_eq!(scopes.len(), themes.len() - 1);

        // Exactly the baseline has no scope
        let baseline = themes.iter().find(|t| t.scope().is_none()).unwrap();
        assert_eq!(baseline.id, BASELINE_THEME_ID);
    }

    #[test]
    fn every_category_is_populated() {
        let catalog = Catalog::new();
        for category in ThemeCategory::all() {
            assert!(!catalog.themes_by_category(*category).is_empty());
        }
    }

    #[test]
    fn lookup_hits_builtins_and_customs() {
        let catalog = Catalog::new();
        assert_some!(catalog.theme_by_id("ocean"));
        assert_none!(catalog.theme_by_id("nonexistent"));

        let created = assert_ok!(catalog.create_custom("Mine", "test", palette()));
        assert_some!(catalog.theme_by_id(&created.id));
        assert_eq!(catalog.themes().len(), 12);
    }

    #[test]
    fn custom_ids_stay_unique_under_rapid_creation() {
        let catalog = Catalog::new();
        let a = assert_ok!(catalog.create_custom("A", "", palette()));
        let b = assert_ok!(catalog.create_custom("B", "", palette()));
        assert_ne!(a.id, b.id);
        assert!(a.id.starts_with("custom-"));
        assert!(b.is_custom());
    }

    #[test]
    fn update_and_remove_custom() {
        let catalog = Catalog::new();
        let created = assert_ok!(catalog.create_custom("Before", "", palette()));

        let updated = assert_ok!(catalog.update_custom(&created.id, "After", "desc", palette()));
        assert_eq!(updated.name, "After");
        assert_eq!(updated.id, created.id);

        assert!(catalog.remove_custom(&created.id));
        assert!(!catalog.remove_custom(&created.id));
        assert_none!(catalog.theme_by_id(&created.id));
    }

    #[test]
    fn update_unknown_custom_fails() {
        let catalog = Catalog::new();
        let err = catalog
            .update_custom("custom-0", "x", "", palette())
            .unwrap_err();
        assert!(matches!(err, EngineError::UnknownTheme(_)));
    }

    #[test]
    fn install_custom_drops_builtin_collisions() {
        let catalog = Catalog::new();
        let mut theme = assert_ok!(catalog.create_custom("Keep", "", palette()));
        let keep_id = theme.id.clone();

        theme.id = "dark".to_string();
        catalog.install_custom(vec![theme.clone(), {
            let mut t = theme;
            t.id = keep_id.clone();
            t
        }]);

        assert_eq!(catalog.custom_themes().len(), 1);
        assert_eq!(catalog.custom_themes()[0].id, keep_id);
    }
}
