//! Durable local state: session user, active workspace, theme.
//!
//! Two layers:
//!
//! - [`KeyValueStore`]: raw string get/set/remove. [`FileStore`] keeps one RON
//!   map on disk and rewrites it (temp file + rename) on every write;
//!   [`MemoryStore`] is for tests and ephemeral sessions.
//! - [`Persistence`]: the typed adapter the store talks to. Reads are
//!   forgiving: a missing or malformed value falls back to its default and logs,
//!   it never fails. Writes are synchronous and their failures are logged, not
//!   raised, so a read-only disk cannot break a mutation.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use zenspace_types::{Theme, UserId, Workspace, WorkspaceId};

use crate::constants::{KEY_ACTIVE_WORKSPACE, KEY_SESSION_USER, KEY_THEME};

/// Errors from a key/value backend.
#[derive(Debug, thiserror::Error)]
pub enum PersistError {
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("encode error: {0}")]
    Encode(String),
}

/// Raw durable string storage.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str) -> Result<(), PersistError>;
    fn remove(&self, key: &str) -> Result<(), PersistError>;
}

// ============================================================================
// MemoryStore
// ============================================================================

/// In-process store. Clones share the same map.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    map: Arc<Mutex<BTreeMap<String, String>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-populated store, e.g. a persisted session from a previous run.
    pub fn with_entries<'a>(entries: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        let store = Self::new();
        {
            let mut map = store.map.lock();
            for (k, v) in entries {
                map.insert(k.to_string(), v.to_string());
            }
        }
        store
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.map.lock().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), PersistError> {
        self.map.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), PersistError> {
        self.map.lock().remove(key);
        Ok(())
    }
}

// ============================================================================
// FileStore
// ============================================================================

/// One RON map file. The whole map is cached in memory and flushed on write.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    map: Mutex<BTreeMap<String, String>>,
}

impl FileStore {
    /// Open (or lazily create) the file at `path`. A corrupt file is treated
    /// as empty and will be overwritten by the next write.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let map = match std::fs::read_to_string(&path) {
            Ok(text) => match ron::from_str::<BTreeMap<String, String>>(&text) {
                Ok(map) => {
                    debug!("Loaded {} local state entries from {:?}", map.len(), path);
                    map
                }
                Err(e) => {
                    warn!("Local state at {:?} is malformed ({}), starting empty", path, e);
                    BTreeMap::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => {
                warn!("Failed to read local state at {:?}: {}", path, e);
                BTreeMap::new()
            }
        };
        Self {
            path,
            map: Mutex::new(map),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self, map: &BTreeMap<String, String>) -> Result<(), PersistError> {
        let text = ron::ser::to_string_pretty(map, ron::ser::PrettyConfig::default())
            .map_err(|e| PersistError::Encode(e.to_string()))?;
        let io = |source| PersistError::Io {
            path: self.path.clone(),
            source,
        };
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(io)?;
            }
        }
        let tmp = self.path.with_extension("ron.tmp");
        std::fs::write(&tmp, text).map_err(io)?;
        std::fs::rename(&tmp, &self.path).map_err(io)?;
        Ok(())
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        self.map.lock().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), PersistError> {
        let mut map = self.map.lock();
        map.insert(key.to_string(), value.to_string());
        self.flush(&map)
    }

    fn remove(&self, key: &str) -> Result<(), PersistError> {
        let mut map = self.map.lock();
        if map.remove(key).is_some() {
            self.flush(&map)?;
        }
        Ok(())
    }
}

// ============================================================================
// Persistence (typed adapter)
// ============================================================================

/// Everything read from disk at process start.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LocalState {
    pub session_user_id: Option<UserId>,
    pub active_workspace_id: Option<WorkspaceId>,
    pub theme: Theme,
}

/// On-disk shape of the active workspace snapshot.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredWorkspace {
    id: WorkspaceId,
    #[serde(default)]
    name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    owner_id: Option<UserId>,
}

/// Typed view over a [`KeyValueStore`].
#[derive(Clone)]
pub struct Persistence {
    kv: Arc<dyn KeyValueStore>,
}

impl std::fmt::Debug for Persistence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Persistence").finish_non_exhaustive()
    }
}

impl Persistence {
    pub fn new(kv: Arc<dyn KeyValueStore>) -> Self {
        Self { kv }
    }

    /// Ephemeral persistence backed by a fresh [`MemoryStore`].
    pub fn memory() -> Self {
        Self::new(Arc::new(MemoryStore::new()))
    }

    /// File-backed persistence at `path`.
    pub fn file(path: impl Into<PathBuf>) -> Self {
        let store = FileStore::open(path);
        info!("Local state file: {:?}", store.path());
        Self::new(Arc::new(store))
    }

    /// Read all persisted values, substituting defaults for anything unusable.
    pub fn load(&self) -> LocalState {
        LocalState {
            session_user_id: self.session_user_id(),
            active_workspace_id: self.active_workspace_id(),
            theme: self.theme(),
        }
    }

    pub fn session_user_id(&self) -> Option<UserId> {
        let raw = self.kv.get(KEY_SESSION_USER)?;
        let raw = raw.trim();
        if raw.is_empty() {
            return None;
        }
        Some(UserId::from(raw))
    }

    pub fn active_workspace_id(&self) -> Option<WorkspaceId> {
        let raw = self.kv.get(KEY_ACTIVE_WORKSPACE)?;
        parse_workspace_snapshot(&raw)
    }

    pub fn theme(&self) -> Theme {
        match self.kv.get(KEY_THEME) {
            Some(raw) => Theme::parse(&raw).unwrap_or_else(|| {
                warn!("Ignoring unrecognized stored theme '{}'", raw);
                Theme::default()
            }),
            None => Theme::default(),
        }
    }

    pub fn save_session_user(&self, user: Option<&UserId>) {
        let result = match user {
            Some(id) => self.kv.set(KEY_SESSION_USER, id.as_str()),
            None => self.kv.remove(KEY_SESSION_USER),
        };
        log_write(KEY_SESSION_USER, result);
    }

    pub fn save_active_workspace(&self, workspace: Option<&Workspace>) {
        let result = match workspace {
            Some(ws) => {
                let stored = StoredWorkspace {
                    id: ws.id.clone(),
                    name: ws.name.clone(),
                    owner_id: Some(ws.owner_id.clone()),
                };
                match serde_json::to_string(&stored) {
                    Ok(json) => self.kv.set(KEY_ACTIVE_WORKSPACE, &json),
                    Err(e) => Err(PersistError::Encode(e.to_string())),
                }
            }
            None => self.kv.remove(KEY_ACTIVE_WORKSPACE),
        };
        log_write(KEY_ACTIVE_WORKSPACE, result);
    }

    pub fn save_theme(&self, theme: Theme) {
        log_write(KEY_THEME, self.kv.set(KEY_THEME, theme.as_str()));
    }
}

/// JSON snapshot, or a bare id written by older clients. Anything else ⇒ None.
fn parse_workspace_snapshot(raw: &str) -> Option<WorkspaceId> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if raw.starts_with('{') {
        return match serde_json::from_str::<StoredWorkspace>(raw) {
            Ok(stored) if !stored.id.is_empty() => Some(stored.id),
            Ok(_) => None,
            Err(e) => {
                warn!("Ignoring malformed active workspace snapshot: {}", e);
                None
            }
        };
    }
    if raw.chars().any(|c| c.is_whitespace() || matches!(c, '"' | '[' | ']' | '}')) {
        warn!("Ignoring malformed active workspace value '{}'", raw);
        return None;
    }
    Some(WorkspaceId::from(raw))
}

fn log_write(key: &str, result: Result<(), PersistError>) {
    if let Err(e) = result {
        warn!("Failed to persist '{}': {}", key, e);
    }
}

// ============================================================================
// Tests
// ============================================================================
