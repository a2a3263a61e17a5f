use crate::config::ThemeOptions;
use engine::{ThemeState, ThemeStateManager};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

/// How prominently a notice should be rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Warning,
    Error,
}

/// A single transient user-facing message.
#[derive(Debug, Clone)]
pub struct Notice {
    pub severity: Severity,
    pub message: String,
    pub posted_at: Instant,
}

struct NotifierInner {
    notices: Mutex<VecDeque<Notice>>,
    previous: Mutex<ThemeState>,
    ttl: Duration,
    backlog: usize,
}

/// Presentation-side observer that turns theme state transitions into
/// short-lived notices.
///
/// The state manager stays presentation-agnostic; this layer watches its
/// snapshots and derives the messages a surface would toast. Notices expire
/// after the configured TTL and the backlog is bounded, so an unread pile
/// never grows without limit.
pub struct ThemeNotifier {
    inner: Arc<NotifierInner>,
    state: Arc<ThemeStateManager>,
    subscription: engine::state::SubscriptionId,
}

impl ThemeNotifier {
    /// Subscribe to the state manager and start deriving notices.
    pub fn attach(state: &Arc<ThemeStateManager>, options: &ThemeOptions) -> Self {
        let inner = Arc::new(NotifierInner {
            notices: Mutex::new(VecDeque::new()),
            previous: Mutex::new(state.snapshot()),
            ttl: options.notification_ttl(),
            backlog: options.notification_backlog(),
        });

        let observer = Arc::clone(&inner);
        let subscription = state.subscribe(move |current| observer.observe(current));

        Self {
            inner,
            state: Arc::clone(state),
            subscription,
        }
    }

    /// Notices that have not yet expired, oldest first.
    pub fn active(&self) -> Vec<Notice> {
        let mut notices = self.inner.lock_notices();
        let ttl = self.inner.ttl;
        notices.retain(|n| n.posted_at.elapsed() < ttl);
        notices.iter().cloned().collect()
    }

    pub fn dismiss_all(&self) {
        self.inner.lock_notices().clear();
    }

    /// Post a notice directly, outside the derived state transitions.
    pub fn post(&self, severity: Severity, message: impl Into<String>) {
        self.inner.push(severity, message.into());
    }
}

impl Drop for ThemeNotifier {
    fn drop(&mut self) {
        self.state.unsubscribe(self.subscription);
    }
}

impl NotifierInner {
    fn observe(&self, current: &ThemeState) {
        let previous = {
            let mut slot = self.lock_previous();
            std::mem::replace(&mut *slot, current.clone())
        };

        if let Some(error) = &current.error
            && previous.error.as_deref() != Some(error)
        {
            self.push(Severity::Error, format!("Theme change failed: {error}"));
            return;
        }

        if previous.is_loading && !current.is_loading && current.error.is_none() {
            self.push(
                Severity::Info,
                format!("Theme '{}' applied", current.last_applied_theme),
            );
        }

        if !previous.is_preview_mode && current.is_preview_mode {
            if let Some(id) = &current.preview_theme_id {
                self.push(Severity::Info, format!("Previewing theme '{id}'"));
            }
        } else if previous.is_preview_mode && !current.is_preview_mode {
            self.push(Severity::Info, "Preview ended".to_string());
        }
    }

    fn push(&self, severity: Severity, message: String) {
        let mut notices = self.lock_notices();
        notices.push_back(Notice {
            severity,
            message,
            posted_at: Instant::now(),
        });
        while notices.len() > self.backlog {
            notices.pop_front();
        }
    }

    fn lock_notices(&self) -> std::sync::MutexGuard<'_, VecDeque<Notice>> {
        self.notices.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_previous(&self) -> std::sync::MutexGuard<'_, ThemeState> {
        self.previous.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn notifier() -> (Arc<ThemeStateManager>, ThemeNotifier) {
        let state = Arc::new(ThemeStateManager::new());
        let notifier = ThemeNotifier::attach(&state, &ThemeOptions::default());
        (state, notifier)
    }

    #[test]
    fn completed_change_produces_an_info_notice() {
        let (state, notifier) = notifier();

        state.start_theme_change("default");
        state.complete_theme_change("dark");

        let notices = notifier.active();
        assert_eq!(notices.len(), 1);
        assert_eq!(notices[0].severity, Severity::Info);
        assert_eq!(notices[0].message, "Theme 'dark' applied");
    }

    #[test]
    fn failed_change_produces_an_error_notice() {
        let (state, notifier) = notifier();

        state.start_theme_change("default");
        state.fail_theme_change("scope rejected");

        let notices = notifier.active();
        assert_eq!(notices.len(), 1);
        assert_eq!(notices[0].severity, Severity::Error);
        assert_eq!(notices[0].message, "Theme change failed: scope rejected");
    }

    #[test]
    fn preview_cycle_produces_enter_and_exit_notices() {
        let (state, notifier) = notifier();

        state.start_preview("ocean");
        state.end_preview();

        let messages: Vec<String> = notifier.active().into_iter().map(|n| n.message).collect();
        assert_eq!(messages, vec!["Previewing theme 'ocean'", "Preview ended"]);
    }

    #[test]
    fn expired_notices_are_pruned() {
        let state = Arc::new(ThemeStateManager::new());
        let options = ThemeOptions::default().with_notification_ttl_ms(0);
        let notifier = ThemeNotifier::attach(&state, &options);

        notifier.post(Severity::Warning, "fleeting");
        assert!(notifier.active().is_empty());
    }

    #[test]
    fn backlog_is_bounded() {
        let (_state, notifier) = notifier();

        for i in 0..20 {
            notifier.post(Severity::Info, format!("notice {i}"));
        }

        let notices = notifier.active();
        assert_eq!(notices.len(), 8);
        assert_eq!(notices[0].message, "notice 12");
    }

    #[test]
    fn dropping_the_notifier_detaches_it() {
        let (state, notifier) = notifier();
        drop(notifier);

        // No listener left to observe this transition.
        state.start_theme_change("default");
        state.complete_theme_change("dark");
    }
}
