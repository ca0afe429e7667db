//! Client configuration constants.
//!
//! Centralizes hardcoded values for easier configuration and documentation.

use std::time::Duration;

/// Default remote API base URL for local development.
pub const DEFAULT_API_URL: &str = "http://localhost:4000/api";

/// Environment variable that overrides the configured API base URL.
pub const API_URL_ENV: &str = "ZENSPACE_API_URL";

/// Timeout applied to every remote call. The service itself imposes none,
/// so a stalled request would otherwise pin a fetch family forever.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// How long the project-create latch stays closed after a create settles.
/// Absorbs a second UI handler firing just after the first call resolved.
pub const CREATE_GRACE: Duration = Duration::from_millis(500);

/// Directory name under the platform config/data dirs.
pub const APP_DIR: &str = "zenspace";

/// Config file name under `<config_dir>/zenspace/`.
pub const CONFIG_FILE: &str = "client.ron";

/// Local state file name under `<data_local_dir>/zenspace/`.
pub const STATE_FILE: &str = "state.ron";

/// Persisted key: id of the signed-in user.
pub const KEY_SESSION_USER: &str = "session_user_id";

/// Persisted key: snapshot of the active workspace.
pub const KEY_ACTIVE_WORKSPACE: &str = "active_workspace";

/// Persisted key: theme preference.
pub const KEY_THEME: &str = "theme";
