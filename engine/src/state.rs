use crate::types::BASELINE_THEME_ID;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

/// Snapshot of the transient theme state. Never persisted.
///
/// Invariants: `is_preview_mode` and `preview_theme_id` are set and cleared
/// together; `error` is mutually exclusive with a successful completion in
/// the same transition.
#[derive(Debug, Clone, PartialEq)]
pub struct ThemeState {
    pub is_loading: bool,
    pub is_transitioning: bool,
    pub is_preview_mode: bool,
    pub preview_theme_id: Option<String>,
    pub last_applied_theme: String,
    pub error: Option<String>,
}

impl Default for ThemeState {
    fn default() -> Self {
        Self {
            is_loading: false,
            is_transitioning: false,
            is_preview_mode: false,
            preview_theme_id: None,
            last_applied_theme: BASELINE_THEME_ID.to_string(),
            error: None,
        }
    }
}

type Listener = Arc<dyn Fn(&ThemeState) + Send + Sync>;

/// Subscription handle returned by [`ThemeStateManager::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubscriptionId(u64);

/// Single source of truth for all theme-state observers.
///
/// One instance is shared per application; tests construct fresh ones to
/// avoid cross-test leakage. Observers are invoked synchronously on every
/// mutation with the full new snapshot, and a panicking observer cannot
/// block the others.
pub struct ThemeStateManager {
    state: Mutex<ThemeState>,
    listeners: Mutex<Vec<(SubscriptionId, Listener)>>,
    next_id: AtomicU64,
}

impl ThemeStateManager {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(ThemeState::default()),
            listeners: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(1),
        }
    }

    pub fn snapshot(&self) -> ThemeState {
        self.lock_state().clone()
    }

    /// Register an observer. Keep the returned id to unsubscribe later.
    pub fn subscribe<F>(&self, listener: F) -> SubscriptionId
    where
        F: Fn(&ThemeState) + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.lock_listeners().push((id, Arc::new(listener)));
        id
    }

    pub fn unsubscribe(&self, id: SubscriptionId) {
        self.lock_listeners().retain(|(lid, _)| *lid != id);
    }

    /// A theme change has started; loading and transitioning are raised and
    /// any stale error is cleared.
    pub fn start_theme_change(&self, previous_theme: &str) {
        log::debug!("theme change starting (previous: {previous_theme})");
        self.mutate(|s| {
            s.is_loading = true;
            s.is_transitioning = true;
            s.error = None;
        });
    }

    /// The in-flight theme change committed successfully.
    pub fn complete_theme_change(&self, theme_id: &str) {
        self.mutate(|s| {
            s.is_loading = false;
            s.is_transitioning = false;
            s.last_applied_theme = theme_id.to_string();
            s.error = None;
        });
    }

    /// The in-flight theme change failed; the error stays visible until the
    /// next successful transition or an explicit `clear_error`.
    pub fn fail_theme_change(&self, message: &str) {
        self.mutate(|s| {
            s.is_loading = false;
            s.is_transitioning = false;
            s.error = Some(message.to_string());
        });
    }

    pub fn start_preview(&self, theme_id: &str) {
        self.mutate(|s| {
            s.is_preview_mode = true;
            s.preview_theme_id = Some(theme_id.to_string());
        });
    }

    pub fn end_preview(&self) {
        self.mutate(|s| {
            s.is_preview_mode = false;
            s.preview_theme_id = None;
        });
    }

    pub fn clear_error(&self) {
        self.mutate(|s| s.error = None);
    }

    /// Restore all fields to their initial defaults.
    pub fn reset(&self) {
        self.mutate(|s| *s = ThemeState::default());
    }

    fn mutate<F: FnOnce(&mut ThemeState)>(&self, f: F) {
        let snapshot = {
            let mut state = self.lock_state();
            f(&mut state);
            state.clone()
        };
        self.notify(&snapshot);
    }

    fn notify(&self, snapshot: &ThemeState) {
        // Clone the registry so listeners can (un)subscribe re-entrantly.
        let listeners: Vec<(SubscriptionId, Listener)> = self.lock_listeners().clone();
        for (id, listener) in listeners {
            if catch_unwind(AssertUnwindSafe(|| listener(snapshot))).is_err() {
                log::warn!("theme state listener {id:?} panicked; skipping it for this update");
            }
        }
    }

    fn lock_state(&self) -> std::sync::MutexGuard<'_, ThemeState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_listeners(&self) -> std::sync::MutexGuard<'_, Vec<(SubscriptionId, Listener)>> {
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for ThemeStateManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn success_path_returns_to_idle() {
        let manager = ThemeStateManager::new();
        manager.start_theme_change("default");

        let mid = manager.snapshot();
        assert!(mid.is_loading);
        assert!(mid.is_transitioning);

        manager.complete_theme_change("dark");
        let done = manager.snapshot();
        assert!(!done.is_loading);
        assert!(!done.is_transitioning);
        assert_eq!(done.last_applied_theme, "dark");
        assert_eq!(done.error, None);
    }

    #[test]
    fn failure_clears_flight_flags_and_records_error() {
        let manager = ThemeStateManager::new();
        manager.start_theme_change("default");
        manager.fail_theme_change("boom");

        let state = manager.snapshot();
        assert!(!state.is_loading);
        assert!(!state.is_transitioning);
        assert_eq!(state.error.as_deref(), Some("boom"));
        assert_eq!(state.last_applied_theme, "default");

        // Next successful transition clears the error
        manager.start_theme_change("default");
        manager.complete_theme_change("ocean");
        assert_eq!(manager.snapshot().error, None);
    }

    #[test]
    fn preview_fields_move_together() {
        let manager = ThemeStateManager::new();
        manager.start_preview("ocean");

        let state = manager.snapshot();
        assert!(state.is_preview_mode);
        assert_eq!(state.preview_theme_id.as_deref(), Some("ocean"));

        manager.end_preview();
        let state = manager.snapshot();
        assert!(!state.is_preview_mode);
        assert_eq!(state.preview_theme_id, None);
    }

    #[test]
    fn reset_restores_defaults() {
        let manager = ThemeStateManager::new();
        manager.start_theme_change("default");
        manager.fail_theme_change("boom");
        manager.start_preview("ocean");

        manager.reset();
        assert_eq!(manager.snapshot(), ThemeState::default());
    }

    #[test]
    fn subscribers_receive_every_mutation() {
        let manager = ThemeStateManager::new();
        let seen = Arc::new(AtomicUsize::new(0));
        let seen_clone = Arc::clone(&seen);
        let id = manager.subscribe(move |_| {
            seen_clone.fetch_add(1, Ordering::SeqCst);
        });

        manager.start_theme_change("default");
        manager.complete_theme_change("dark");
        assert_eq!(seen.load(Ordering::SeqCst), 2);

        manager.unsubscribe(id);
        manager.clear_error();
        assert_eq!(seen.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn panicking_listener_does_not_block_others() {
        let manager = ThemeStateManager::new();
        let seen = Arc::new(AtomicUsize::new(0));

        manager.subscribe(|_| panic!("misbehaving observer"));
        let seen_clone = Arc::clone(&seen);
        manager.subscribe(move |_| {
            seen_clone.fetch_add(1, Ordering::SeqCst);
        });

        manager.start_theme_change("default");
        assert_eq!(seen.load(Ordering::SeqCst), 1);
    }
}
