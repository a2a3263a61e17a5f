use crate::error::{EngineError, EngineResult};
use crate::types::{Theme, UserThemeSettings};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::broadcast;

/// Fixed key under which the fast store holds the serialized settings.
pub const SETTINGS_KEY: &str = "user-theme-settings";

/// Durable keyed record store for theme settings and custom themes.
///
/// Treated as an opaque collaborator: implementations may sit on a file,
/// an embedded database or anything else with init/load/save semantics.
#[async_trait]
pub trait SettingsStore: Send + Sync {
    /// Prepare the backend. Called once before the first load; startup
    /// bounds this with a timeout so a slow backend cannot block the
    /// first paint.
    async fn init(&self) -> EngineResult<()>;

    async fn load_settings(&self) -> EngineResult<Option<UserThemeSettings>>;
    async fn save_settings(&self, settings: &UserThemeSettings) -> EngineResult<()>;

    async fn load_custom_themes(&self) -> EngineResult<Vec<Theme>>;
    async fn save_custom_themes(&self, themes: &[Theme]) -> EngineResult<()>;
}

/// Change event fired when a key-value store handle writes a value.
///
/// `origin` identifies the writing handle; like browser storage events,
/// consumers usually ignore events they originated themselves.
#[derive(Debug, Clone)]
pub struct StoreEvent {
    pub key: String,
    pub value: Option<String>,
    pub origin: u64,
}

/// Fast string-keyed store with cross-context change notifications.
///
/// Models the browser's key-value fallback: lowest latency, read first at
/// startup so the initial paint matches the saved theme, and the medium
/// through which sibling contexts observe each other's writes.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str);
    fn remove(&self, key: &str);

    /// Receiver for change events, including this handle's own writes
    /// (filter on [`StoreEvent::origin`] if those are unwanted).
    fn subscribe(&self) -> broadcast::Receiver<StoreEvent>;

    /// Identity of this handle, matched against [`StoreEvent::origin`].
    fn handle_id(&self) -> u64;
}

struct SharedState {
    map: Mutex<HashMap<String, String>>,
    events: broadcast::Sender<StoreEvent>,
    next_handle: AtomicU64,
}

/// In-memory [`KeyValueStore`] shared between "contexts".
///
/// Every [`handle`](SharedKeyValueStore::handle) is a separate context
/// (think: browser tab) over the same underlying map. Writes broadcast a
/// [`StoreEvent`] to all handles; a rapid write sequence gives eventual,
/// not ordered, convergence — exactly the guarantee the settings sync
/// needs and no more.
pub struct SharedKeyValueStore {
    shared: Arc<SharedState>,
    handle_id: u64,
}

impl SharedKeyValueStore {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(32);
        Self {
            shared: Arc::new(SharedState {
                map: Mutex::new(HashMap::new()),
                events,
                next_handle: AtomicU64::new(2),
            }),
            handle_id: 1,
        }
    }

    /// A new context over the same underlying data.
    pub fn handle(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
            handle_id: self.shared.next_handle.fetch_add(1, Ordering::Relaxed),
        }
    }

    fn lock_map(&self) -> std::sync::MutexGuard<'_, HashMap<String, String>> {
        self.shared
            .map
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for SharedKeyValueStore {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyValueStore for SharedKeyValueStore {
    fn get(&self, key: &str) -> Option<String> {
        self.lock_map().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) {
        self.lock_map().insert(key.to_string(), value.to_string());
        // No receivers is fine; the send error only means nobody listens.
        let _ = self.shared.events.send(StoreEvent {
            key: key.to_string(),
            value: Some(value.to_string()),
            origin: self.handle_id,
        });
    }

    fn remove(&self, key: &str) {
        self.lock_map().remove(key);
        let _ = self.shared.events.send(StoreEvent {
            key: key.to_string(),
            value: None,
            origin: self.handle_id,
        });
    }

    fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.shared.events.subscribe()
    }

    fn handle_id(&self) -> u64 {
        self.handle_id
    }
}

/// In-memory [`SettingsStore`], with optional failure injection so the
/// degraded-persistence paths can be exercised.
pub struct MemorySettingsStore {
    settings: Mutex<Option<UserThemeSettings>>,
    custom_themes: Mutex<Vec<Theme>>,
    failing: AtomicBool,
}

impl MemorySettingsStore {
    pub fn new() -> Self {
        Self {
            settings: Mutex::new(None),
            custom_themes: Mutex::new(Vec::new()),
            failing: AtomicBool::new(false),
        }
    }

    /// A store that errors on every operation.
    pub fn failing() -> Self {
        let store = Self::new();
        store.failing.store(true, Ordering::SeqCst);
        store
    }

    /// Toggle failure injection at runtime.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    fn check(&self) -> EngineResult<()> {
        if self.failing.load(Ordering::SeqCst) {
            Err(EngineError::Store("injected store failure".to_string()))
        } else {
            Ok(())
        }
    }
}

impl Default for MemorySettingsStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SettingsStore for MemorySettingsStore {
    async fn init(&self) -> EngineResult<()> {
        self.check()
    }

    async fn load_settings(&self) -> EngineResult<Option<UserThemeSettings>> {
        self.check()?;
        Ok(self
            .settings
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone())
    }

    async fn save_settings(&self, settings: &UserThemeSettings) -> EngineResult<()> {
        self.check()?;
        *self
            .settings
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(settings.clone());
        Ok(())
    }

    async fn load_custom_themes(&self) -> EngineResult<Vec<Theme>> {
        self.check()?;
        Ok(self
            .custom_themes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone())
    }

    async fn save_custom_themes(&self, themes: &[Theme]) -> EngineResult<()> {
        self.check()?;
        *self
            .custom_themes
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = themes.to_vec();
        Ok(())
    }
}

/// On-disk document holding both persisted record kinds.
#[derive(Debug, Default, Serialize, Deserialize)]
struct SettingsDocument {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    settings: Option<UserThemeSettings>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    custom_themes: Vec<Theme>,
}

/// [`SettingsStore`] backed by a TOML file.
pub struct FileSettingsStore {
    path: PathBuf,
    // Serializes read-modify-write cycles on the document.
    io: tokio::sync::Mutex<()>,
}

impl FileSettingsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            io: tokio::sync::Mutex::new(()),
        }
    }

    /// Store at the platform config dir (`<config>/shade/settings.toml`),
    /// falling back to a relative path when no config dir is known.
    pub fn at_default_location() -> Self {
        let path = dirs::config_dir()
            .map(|dir| dir.join("shade").join("settings.toml"))
            .unwrap_or_else(|| {
                log::warn!("no platform config directory; using ./shade-settings.toml");
                PathBuf::from("shade-settings.toml")
            });
        Self::new(path)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_document(&self) -> EngineResult<SettingsDocument> {
        if !self.path.exists() {
            return Ok(SettingsDocument::default());
        }
        let content = std::fs::read_to_string(&self.path).map_err(|e| {
            EngineError::Store(format!("failed to read '{}': {e}", self.path.display()))
        })?;
        toml::from_str(&content).map_err(|e| {
            EngineError::Serialization(format!(
                "failed to parse '{}': {e}",
                self.path.display()
            ))
        })
    }

    fn write_document(&self, document: &SettingsDocument) -> EngineResult<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|e| {
                EngineError::Store(format!("failed to create '{}': {e}", parent.display()))
            })?;
        }
        let content = toml::to_string_pretty(document)
            .map_err(|e| EngineError::Serialization(format!("failed to encode settings: {e}")))?;
        std::fs::write(&self.path, content).map_err(|e| {
            EngineError::Store(format!("failed to write '{}': {e}", self.path.display()))
        })
    }
}

#[async_trait]
impl SettingsStore for FileSettingsStore {
    async fn init(&self) -> EngineResult<()> {
        let _guard = self.io.lock().await;
        // Parse eagerly so corruption surfaces at startup, not mid-session.
        self.read_document().map(|_| ())
    }

    async fn load_settings(&self) -> EngineResult<Option<UserThemeSettings>> {
        let _guard = self.io.lock().await;
        Ok(self.read_document()?.settings)
    }

    async fn save_settings(&self, settings: &UserThemeSettings) -> EngineResult<()> {
        let _guard = self.io.lock().await;
        let mut document = self.read_document().unwrap_or_default();
        document.settings = Some(settings.clone());
        self.write_document(&document)
    }

    async fn load_custom_themes(&self) -> EngineResult<Vec<Theme>> {
        let _guard = self.io.lock().await;
        Ok(self.read_document()?.custom_themes)
    }

    async fn save_custom_themes(&self, themes: &[Theme]) -> EngineResult<()> {
        let _guard = self.io.lock().await;
        let mut document = self.read_document().unwrap_or_default();
        document.custom_themes = themes.to_vec();
        self.write_document(&document)
    }
}

/// Decode a fast-store value into settings.
pub fn decode_settings(value: &str) -> EngineResult<UserThemeSettings> {
    serde_json::from_str(value)
        .map_err(|e| EngineError::Serialization(format!("invalid settings payload: {e}")))
}

fn encode_settings(settings: &UserThemeSettings) -> EngineResult<String> {
    serde_json::to_string(settings)
        .map_err(|e| EngineError::Serialization(format!("failed to encode settings: {e}")))
}

/// Two-tier persistence for the theme selection.
///
/// Saves write the fast store (which doubles as the cross-context change
/// medium) and then the durable store; loads prefer the fast store and
/// fall back to the durable one. No failure escapes this type — every
/// store error is caught and logged, and durability degrades silently.
pub struct PersistenceAdapter {
    durable: Arc<dyn SettingsStore>,
    fast: Arc<dyn KeyValueStore>,
    initialized: AtomicBool,
}

impl PersistenceAdapter {
    pub fn new(durable: Arc<dyn SettingsStore>, fast: Arc<dyn KeyValueStore>) -> Self {
        Self {
            durable,
            fast,
            initialized: AtomicBool::new(false),
        }
    }

    /// Best-effort save to both tiers.
    pub async fn save(&self, settings: &UserThemeSettings) {
        match encode_settings(settings) {
            Ok(payload) => self.fast.set(SETTINGS_KEY, &payload),
            Err(e) => log::error!("skipping fast-store write: {e}"),
        }

        if let Err(e) = self.durable.save_settings(settings).await {
            log::warn!(
                "durable store rejected theme settings ({e}); continuing with fast store only"
            );
        }
    }

    /// Fast-path load; `None` when the store is empty or holds garbage.
    pub fn load_fast(&self) -> Option<UserThemeSettings> {
        let payload = self.fast.get(SETTINGS_KEY)?;
        match decode_settings(&payload) {
            Ok(settings) => Some(settings),
            Err(e) => {
                log::warn!("discarding unreadable fast-store settings: {e}");
                None
            }
        }
    }

    /// Durable-path load, initializing the backend on first use. Errors are
    /// logged and collapse to `None`.
    pub async fn load_durable(&self) -> Option<UserThemeSettings> {
        if let Err(e) = self.ensure_initialized().await {
            log::warn!("durable store unavailable: {e}");
            return None;
        }
        match self.durable.load_settings().await {
            Ok(settings) => settings,
            Err(e) => {
                log::warn!("failed to load settings from durable store: {e}");
                None
            }
        }
    }

    /// Combined load: fast store first, then durable.
    pub async fn load(&self) -> Option<UserThemeSettings> {
        match self.load_fast() {
            Some(settings) => Some(settings),
            None => self.load_durable().await,
        }
    }

    /// Custom themes live only in the durable tier; failures collapse to an
    /// empty set.
    pub async fn load_custom_themes(&self) -> Vec<Theme> {
        if let Err(e) = self.ensure_initialized().await {
            log::warn!("durable store unavailable, no custom themes loaded: {e}");
            return Vec::new();
        }
        match self.durable.load_custom_themes().await {
            Ok(themes) => themes,
            Err(e) => {
                log::warn!("failed to load custom themes: {e}");
                Vec::new()
            }
        }
    }

    pub async fn save_custom_themes(&self, themes: &[Theme]) {
        if let Err(e) = self.durable.save_custom_themes(themes).await {
            log::warn!("failed to persist custom themes ({e}); edits survive this session only");
        }
    }

    /// Events from the fast store, for cross-context convergence.
    pub fn fast_events(&self) -> broadcast::Receiver<StoreEvent> {
        self.fast.subscribe()
    }

    /// Id of the local fast-store handle, to recognize self-originated events.
    pub fn fast_handle_id(&self) -> u64 {
        self.fast.handle_id()
    }

    async fn ensure_initialized(&self) -> EngineResult<()> {
        if self.initialized.load(Ordering::SeqCst) {
            return Ok(());
        }
        self.durable.init().await?;
        self.initialized.store(true, Ordering::SeqCst);
        Ok(())
    }
}
