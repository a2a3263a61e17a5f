use engine::EngineResult;
use std::sync::{Arc, Mutex, PoisonError};

/// Boundary through which themes reach the visual surface.
///
/// The document root carries at most one styling-scope token at a time;
/// `apply` replaces whatever is active with the given scope in one step, so
/// observers never see zero-with-pending or two scopes. `None` means the
/// baseline theme (no scope at all).
///
/// The manager treats scope application as the only fallible step of a
/// theme change; implementations that cannot fail simply always return Ok.
pub trait ScopeApplier: Send + Sync {
    fn apply(&self, scope: Option<&str>) -> EngineResult<()>;
}

/// [`ScopeApplier`] holding the active scope in memory.
///
/// Stands in for the document root outside a browser and doubles as the
/// observation point for tests; clones share the same slot.
#[derive(Clone, Default)]
pub struct MemoryScope {
    slot: Arc<Mutex<Option<String>>>,
}

impl MemoryScope {
    pub fn new() -> Self {
        Self::default()
    }

    /// The currently applied scope token, `None` for the baseline.
    pub fn current(&self) -> Option<String> {
        self.slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl ScopeApplier for MemoryScope {
    fn apply(&self, scope: Option<&str>) -> EngineResult<()> {
        *self.slot.lock().unwrap_or_else(PoisonError::into_inner) = scope.map(str::to_string);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use claims::{assert_none, assert_ok};

    #[test]
    fn apply_replaces_the_previous_scope() {
        let scope = MemoryScope::new();
        assert_none!(scope.current());

        assert_ok!(scope.apply(Some("theme-dark")));
        assert_eq!(scope.current().as_deref(), Some("theme-dark"));

        assert_ok!(scope.apply(Some("theme-ocean")));
        assert_eq!(scope.current().as_deref(), Some("theme-ocean"));

        assert_ok!(scope.apply(None));
        assert_none!(scope.current());
    }

    #[test]
    fn clones_share_the_slot() {
        let scope = MemoryScope::new();
        let observer = scope.clone();
        assert_ok!(scope.apply(Some("theme-pink")));
        assert_eq!(observer.current().as_deref(), Some("theme-pink"));
    }
}
