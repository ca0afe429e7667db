//! Client configuration.
//!
//! Loaded from `~/.config/zenspace/client.ron`. Every field has a default, so
//! a missing file or a partial file is fine; a file that fails to parse is an
//! error the caller decides how to report.
//!
//! ```ron
//! (
//!     base_url: "https://zenspace.example.com/api",
//!     request_timeout_ms: 10000,
//!     create_grace_ms: 500,
//!     reconcile_after_cascade: true,
//! )
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constants::{
    API_URL_ENV, APP_DIR, CONFIG_FILE, CREATE_GRACE, DEFAULT_API_URL, REQUEST_TIMEOUT, STATE_FILE,
};

/// Errors loading the config file.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("RON parse error in {path}: {source}")]
    Ron {
        path: PathBuf,
        #[source]
        source: ron::error::SpannedError,
    },
}

/// Tunables for the store and its transports.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ClientConfig {
    /// Base URL of the REST API (no trailing slash).
    pub base_url: String,
    /// Per-request timeout.
    pub request_timeout_ms: u64,
    /// Grace period the project-create latch stays closed after settling.
    pub create_grace_ms: u64,
    /// Re-read tasks after a cascading delete to catch server-side drift.
    pub reconcile_after_cascade: bool,
    /// Where local state lives. `None` ⇒ platform data dir.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state_path: Option<PathBuf>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_URL.to_string(),
            request_timeout_ms: REQUEST_TIMEOUT.as_millis() as u64,
            create_grace_ms: CREATE_GRACE.as_millis() as u64,
            reconcile_after_cascade: false,
            state_path: None,
        }
    }
}

impl ClientConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn create_grace(&self) -> Duration {
        Duration::from_millis(self.create_grace_ms)
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn with_create_grace(mut self, grace: Duration) -> Self {
        self.create_grace_ms = grace.as_millis() as u64;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout_ms = timeout.as_millis() as u64;
        self
    }

    pub fn with_reconcile_after_cascade(mut self, on: bool) -> Self {
        self.reconcile_after_cascade = on;
        self
    }

    pub fn with_state_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.state_path = Some(path.into());
        self
    }

    /// Resolved local state file location.
    pub fn state_file(&self) -> PathBuf {
        self.state_path.clone().unwrap_or_else(default_state_path)
    }

    /// Parse a RON document.
    pub fn from_ron(text: &str, path: &Path) -> Result<Self, ConfigError> {
        ron::from_str(text).map_err(|source| ConfigError::Ron {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Load from `path`; a missing file yields defaults.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::debug!("No config at {:?}, using defaults", path);
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(path)
            .map_err(|source| ConfigError::Io {
                path: path.to_path_buf(),
                source,
            })?;
        let config = Self::from_ron(&text, path)?;
        tracing::info!("Loaded client config from {:?}", path);
        Ok(config)
    }

    /// Load from the platform config dir, then apply environment overrides.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = match config_file_path() {
            Some(path) => Self::load_from(&path)?,
            None => Self::default(),
        };
        config.apply_env();
        Ok(config)
    }

    /// `ZENSPACE_API_URL` wins over the file.
    pub fn apply_env(&mut self) {
        if let Ok(url) = std::env::var(API_URL_ENV) {
            if !url.trim().is_empty() {
                self.base_url = url.trim().trim_end_matches('/').to_string();
            }
        }
    }
}

/// `~/.config/zenspace/client.ron`
pub fn config_file_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join(APP_DIR).join(CONFIG_FILE))
}

/// `~/.local/share/zenspace/state.ron`, or `./state.ron` without a data dir.
pub fn default_state_path() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
        .join(STATE_FILE)
}
