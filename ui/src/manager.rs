use crate::config::ThemeOptions;
use crate::error::AppResult;
use crate::scope::ScopeApplier;
use chrono::Utc;
use engine::persistence::{PersistenceAdapter, SETTINGS_KEY, decode_settings};
use engine::types::CustomPalette;
use engine::{BASELINE_THEME_ID, Catalog, Theme, ThemeCategory, ThemeChange, ThemeStateManager};
use engine::{ThemeState, UserThemeSettings};
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::timeout;

type ChangeListener = Arc<dyn Fn(&ThemeChange) + Send + Sync>;

/// Handle returned by [`ThemeManager::subscribe_changes`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChangeListenerId(u64);

/// The single coordination point for theme selection.
///
/// Selects themes, applies their scope to the visual surface, persists the
/// choice, manages preview mode and broadcasts change notifications. All
/// collaborators are injected; embedders hold one instance per surface and
/// tests construct fresh ones.
///
/// Commit operations (`set_theme`, `load_saved_theme`) are serialized with
/// an internal operation lock, so concurrent calls queue instead of
/// interleaving scope mutations.
pub struct ThemeManager {
    catalog: Arc<Catalog>,
    persistence: PersistenceAdapter,
    state: Arc<ThemeStateManager>,
    applier: Arc<dyn ScopeApplier>,
    current: Mutex<String>,
    preview: Mutex<Option<String>>,
    change_listeners: Mutex<Vec<(ChangeListenerId, ChangeListener)>>,
    next_listener_id: AtomicU64,
    op_lock: tokio::sync::Mutex<()>,
    transition_delay: Duration,
    load_timeout: Duration,
}

impl ThemeManager {
    pub fn new(
        catalog: Arc<Catalog>,
        persistence: PersistenceAdapter,
        state: Arc<ThemeStateManager>,
        applier: Arc<dyn ScopeApplier>,
        options: &ThemeOptions,
    ) -> Self {
        Self {
            catalog,
            persistence,
            state,
            applier,
            current: Mutex::new(BASELINE_THEME_ID.to_string()),
            preview: Mutex::new(None),
            change_listeners: Mutex::new(Vec::new()),
            next_listener_id: AtomicU64::new(1),
            op_lock: tokio::sync::Mutex::new(()),
            transition_delay: options.transition_delay(),
            load_timeout: options.load_timeout(),
        }
    }

    /// Id of the committed current theme. Previews do not change it.
    pub fn current_theme(&self) -> String {
        self.lock_current().clone()
    }

    pub fn state(&self) -> &Arc<ThemeStateManager> {
        &self.state
    }

    pub fn state_snapshot(&self) -> ThemeState {
        self.state.snapshot()
    }

    /// Full catalog: built-ins plus loaded custom themes. No side effects.
    pub fn available_themes(&self) -> Vec<Theme> {
        self.catalog.themes()
    }

    /// Lookup; `None` signals an unknown theme, which callers treat as
    /// equivalent to the baseline theme.
    pub fn theme_by_id(&self, id: &str) -> Option<Theme> {
        self.catalog.theme_by_id(id)
    }

    pub fn themes_by_category(&self, category: ThemeCategory) -> Vec<Theme> {
        self.catalog.themes_by_category(category)
    }

    /// Register an observer for committed theme changes.
    pub fn subscribe_changes<F>(&self, listener: F) -> ChangeListenerId
    where
        F: Fn(&ThemeChange) + Send + Sync + 'static,
    {
        let id = ChangeListenerId(self.next_listener_id.fetch_add(1, Ordering::Relaxed));
        self.lock_listeners().push((id, Arc::new(listener)));
        id
    }

    pub fn unsubscribe_changes(&self, id: ChangeListenerId) {
        self.lock_listeners().retain(|(lid, _)| *lid != id);
    }

    /// Commit a theme selection.
    ///
    /// Unknown ids are substituted with the baseline theme; an active
    /// preview is silently cancelled. Scope application failure records an
    /// error in the state manager and falls back to the baseline theme
    /// exactly once. Persistence failure does not abort the visual change.
    /// Nothing escapes this call as an error.
    pub async fn set_theme(&self, id: &str) {
        let _guard = self.op_lock.lock().await;
        self.set_theme_locked(id, 0).await;
    }

    async fn set_theme_locked(&self, id: &str, depth: u8) {
        let theme = self.resolve(id);

        // Committing ends any preview; the committed scope wins.
        if self.lock_preview().take().is_some() {
            self.state.end_preview();
        }

        let previous = self.current_theme();
        self.state.start_theme_change(&previous);

        // UX smoothing only; zero in deterministic environments.
        if !self.transition_delay.is_zero() {
            tokio::time::sleep(self.transition_delay).await;
        }

        if let Err(e) = self.applier.apply(theme.scope()) {
            log::error!("failed to apply theme '{}': {e}", theme.id);
            self.state.fail_theme_change(&e.to_string());
            if depth == 0 && theme.id != BASELINE_THEME_ID {
                log::warn!("falling back to baseline theme");
                Box::pin(self.set_theme_locked(BASELINE_THEME_ID, 1)).await;
            }
            return;
        }

        *self.lock_current() = theme.id.clone();

        // Durability is best-effort; the applied theme stands regardless.
        self.persistence
            .save(&UserThemeSettings::new(&theme.id))
            .await;

        self.notify_change(&ThemeChange {
            theme_id: theme.id.clone(),
            previous_theme_id: Some(previous),
            timestamp: Utc::now(),
        });
        self.state.complete_theme_change(&theme.id);
        log::info!("theme changed to '{}'", theme.id);
    }

    /// Startup restoration: fast store, then durable store bounded by the
    /// configured timeout, then baseline. Applies the scope directly
    /// without the loading/transition ceremony — the very first paint does
    /// not need a spinner.
    pub async fn load_saved_theme(&self) {
        let _guard = self.op_lock.lock().await;

        // Custom themes first, so a saved custom selection can resolve.
        match timeout(self.load_timeout, self.persistence.load_custom_themes()).await {
            Ok(themes) if !themes.is_empty() => self.catalog.install_custom(themes),
            Ok(_) => {}
            Err(_) => log::warn!(
                "custom theme load timed out after {:?}",
                self.load_timeout
            ),
        }

        let settings = match self.persistence.load_fast() {
            Some(settings) => Some(settings),
            None => match timeout(self.load_timeout, self.persistence.load_durable()).await {
                Ok(settings) => settings,
                Err(_) => {
                    log::warn!(
                        "durable store timed out after {:?}; starting with baseline theme",
                        self.load_timeout
                    );
                    None
                }
            },
        };

        let id = settings
            .map(|s| s.selected_theme)
            .unwrap_or_else(|| BASELINE_THEME_ID.to_string());
        let theme = self.resolve(&id);

        if let Err(e) = self.applier.apply(theme.scope()) {
            log::error!("failed to apply saved theme '{}': {e}", theme.id);
            return;
        }
        *self.lock_current() = theme.id.clone();
        self.state.complete_theme_change(&theme.id);
        log::info!("restored saved theme '{}'", theme.id);
    }

    /// Apply a theme's scope without persisting and without moving the
    /// current-theme pointer.
    pub fn preview_theme(&self, id: &str) {
        let Some(theme) = self.catalog.theme_by_id(id) else {
            log::warn!("cannot preview unknown theme '{id}'");
            return;
        };
        if let Err(e) = self.applier.apply(theme.scope()) {
            log::error!("failed to preview theme '{}': {e}", theme.id);
            return;
        }
        *self.lock_preview() = Some(theme.id.clone());
        self.state.start_preview(&theme.id);
    }

    /// Restore the committed theme's scope and leave preview mode.
    pub fn cancel_preview(&self) {
        if self.lock_preview().take().is_none() {
            return;
        }
        let theme = self.resolve(&self.current_theme());
        if let Err(e) = self.applier.apply(theme.scope()) {
            log::error!("failed to restore theme '{}' after preview: {e}", theme.id);
        }
        self.state.end_preview();
    }

    /// Create a custom theme, persist the custom set, and return it.
    pub async fn create_custom_theme(
        &self,
        name: &str,
        description: &str,
        palette: CustomPalette,
    ) -> AppResult<Theme> {
        let theme = self.catalog.create_custom(name, description, palette)?;
        self.persistence
            .save_custom_themes(&self.catalog.custom_themes())
            .await;
        Ok(theme)
    }

    pub async fn update_custom_theme(
        &self,
        id: &str,
        name: &str,
        description: &str,
        palette: CustomPalette,
    ) -> AppResult<Theme> {
        let theme = self.catalog.update_custom(id, name, description, palette)?;
        self.persistence
            .save_custom_themes(&self.catalog.custom_themes())
            .await;
        Ok(theme)
    }

    /// Delete a custom theme. Anything still referencing it falls back to
    /// the baseline theme.
    pub async fn delete_custom_theme(&self, id: &str) -> AppResult<bool> {
        if !self.catalog.remove_custom(id) {
            return Ok(false);
        }
        self.persistence
            .save_custom_themes(&self.catalog.custom_themes())
            .await;

        if self.lock_preview().as_deref() == Some(id) {
            self.cancel_preview();
        }
        if self.current_theme() == id {
            self.set_theme(BASELINE_THEME_ID).await;
        }
        Ok(true)
    }

    /// Watch the fast store for writes from sibling contexts and converge
    /// on them. Eventual consistency only: a rapid cross-context write
    /// sequence settles on the last observed value.
    pub fn watch_store(self: &Arc<Self>) -> JoinHandle<()> {
        let mut events = self.persistence.fast_events();
        let own_handle = self.persistence.fast_handle_id();
        let manager = Arc::clone(self);

        tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(event) if event.key == SETTINGS_KEY && event.origin != own_handle => {
                        let Some(payload) = event.value else { continue };
                        match decode_settings(&payload) {
                            Ok(settings) => {
                                if settings.selected_theme != manager.current_theme() {
                                    log::info!(
                                        "observed external theme change to '{}'",
                                        settings.selected_theme
                                    );
                                    manager.set_theme(&settings.selected_theme).await;
                                }
                            }
                            Err(e) => log::warn!("ignoring unreadable store event: {e}"),
                        }
                    }
                    Ok(_) => {}
                    Err(broadcast::error::RecvError::Lagged(missed)) => {
                        log::warn!("store watcher lagged, skipped {missed} events");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        })
    }

    fn resolve(&self, id: &str) -> Theme {
        match self.catalog.theme_by_id(id) {
            Some(theme) => theme,
            None => {
                log::warn!("unknown theme id '{id}', substituting baseline theme");
                self.baseline()
            }
        }
    }

    fn baseline(&self) -> Theme {
        self.catalog
            .theme_by_id(BASELINE_THEME_ID)
            .unwrap_or_else(|| Catalog::builtin_themes()[0].clone())
    }

    fn notify_change(&self, change: &ThemeChange) {
        let listeners: Vec<(ChangeListenerId, ChangeListener)> = self.lock_listeners().clone();
        for (id, listener) in listeners {
            if catch_unwind(AssertUnwindSafe(|| listener(change))).is_err() {
                log::warn!("theme change listener {id:?} panicked; skipping it for this update");
            }
        }
    }

    fn lock_current(&self) -> std::sync::MutexGuard<'_, String> {
        self.current.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_preview(&self) -> std::sync::MutexGuard<'_, Option<String>> {
        self.preview.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_listeners(
        &self,
    ) -> std::sync::MutexGuard<'_, Vec<(ChangeListenerId, ChangeListener)>> {
        self.change_listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scope::MemoryScope;
    use engine::persistence::{MemorySettingsStore, SharedKeyValueStore};
    use std::sync::atomic::AtomicUsize;

    fn manager_with(scope: MemoryScope) -> ThemeManager {
        let options = ThemeOptions::default()
            .with_transition_delay_ms(0)
            .with_load_timeout_ms(100);
        ThemeManager::new(
            Arc::new(Catalog::new()),
            PersistenceAdapter::new(
                Arc::new(MemorySettingsStore::new()),
                Arc::new(SharedKeyValueStore::new()),
            ),
            Arc::new(ThemeStateManager::new()),
            Arc::new(scope.clone()),
            &options,
        )
    }

    #[tokio::test]
    async fn set_theme_moves_pointer_and_scope() {
        let scope = MemoryScope::new();
        let manager = manager_with(scope.clone());

        manager.set_theme("dark").await;
        assert_eq!(manager.current_theme(), "dark");
        assert_eq!(scope.current().as_deref(), Some("theme-dark"));
        assert_eq!(manager.state_snapshot().last_applied_theme, "dark");
    }

    #[tokio::test]
    async fn change_listeners_see_old_and_new_id() {
        let manager = Arc::new(manager_with(MemoryScope::new()));
        let seen: Arc<Mutex<Vec<(Option<String>, String)>>> = Arc::new(Mutex::new(Vec::new()));

        let seen_clone = Arc::clone(&seen);
        let id = manager.subscribe_changes(move |change| {
            seen_clone
                .lock()
                .unwrap()
                .push((change.previous_theme_id.clone(), change.theme_id.clone()));
        });

        manager.set_theme("ocean").await;
        manager.set_theme("forest").await;
        manager.unsubscribe_changes(id);
        manager.set_theme("dark").await;

        let seen = seen.lock().unwrap();
        assert_eq!(
            *seen,
            vec![
                (Some("default".to_string()), "ocean".to_string()),
                (Some("ocean".to_string()), "forest".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn panicking_change_listener_is_isolated() {
        let manager = manager_with(MemoryScope::new());
        let counted = Arc::new(AtomicUsize::new(0));

        manager.subscribe_changes(|_| panic!("bad listener"));
        let counted_clone = Arc::clone(&counted);
        manager.subscribe_changes(move |_| {
            counted_clone.fetch_add(1, Ordering::SeqCst);
        });

        manager.set_theme("ocean").await;
        assert_eq!(counted.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn baseline_resolution_survives_unknown_ids() {
        let scope = MemoryScope::new();
        let manager = manager_with(scope.clone());

        manager.set_theme("definitely-not-a-theme").await;
        assert_eq!(manager.current_theme(), BASELINE_THEME_ID);
        assert_eq!(scope.current(), None);
    }
}
