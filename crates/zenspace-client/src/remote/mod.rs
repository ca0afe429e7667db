//! The remote service seam.
//!
//! [`RemoteService`] is everything the store needs from the server: the REST
//! surface of the team app reduced to typed calls. Two implementations ship:
//!
//! - [`HttpRemote`]: JSON over HTTP via reqwest.
//! - [`InMemoryRemote`]: in-process tables with call recording, latency and
//!   failure injection; the test double and the CLI demo backend.
//!
//! Implementations report failures as [`RemoteError`]; the store never
//! inspects transport details beyond that.

mod http;
mod memory;

pub use http::HttpRemote;
pub use memory::{InMemoryRemote, RemoteCall};

use async_trait::async_trait;
use zenspace_types::{
    NewProject, NewTask, Project, ProjectId, ProjectPatch, Task, TaskId, TaskPatch, User, UserId,
    UserPatch, Workspace, WorkspaceId,
};

/// Errors from the remote service.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RemoteError {
    /// The service rejected the input (missing or malformed fields).
    #[error("invalid request: {0}")]
    Validation(String),
    /// A referenced entity does not exist server-side.
    #[error("not found: {0}")]
    NotFound(String),
    /// Unauthenticated, or credentials rejected.
    #[error("not authorized: {0}")]
    Auth(String),
    /// Unexpected service failure.
    #[error("server error: {0}")]
    Server(String),
    /// Request could not be delivered or the response could not be read.
    #[error("transport error: {0}")]
    Transport(String),
    /// No response within the configured request timeout.
    #[error("request timed out after {0:?}")]
    Timeout(std::time::Duration),
}

/// Token that lets the service collapse retried or duplicated creates.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct IdempotencyKey(String);

impl IdempotencyKey {
    pub fn generate() -> Self {
        Self(uuid::Uuid::now_v7().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for IdempotencyKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Remote operations the store consumes.
#[async_trait]
pub trait RemoteService: Send + Sync {
    // ── Identity ─────────────────────────────────────────────────────────

    async fn login(&self, email: &str, password: &str) -> Result<User, RemoteError>;

    async fn signup(&self, name: &str, email: &str, password: &str) -> Result<User, RemoteError>;

    /// Resolve a persisted session id to its user.
    async fn resolve_identity(&self, user: &UserId) -> Result<User, RemoteError>;

    async fn list_users(&self) -> Result<Vec<User>, RemoteError>;

    async fn update_user(&self, user: &UserId, patch: &UserPatch) -> Result<User, RemoteError>;

    // ── Workspaces ───────────────────────────────────────────────────────

    async fn list_workspaces(&self, user: &UserId) -> Result<Vec<Workspace>, RemoteError>;

    async fn create_workspace(&self, name: &str, owner: &UserId)
        -> Result<Workspace, RemoteError>;

    async fn rename_workspace(&self, id: &WorkspaceId, name: &str)
        -> Result<Workspace, RemoteError>;

    async fn delete_workspace(&self, id: &WorkspaceId) -> Result<(), RemoteError>;

    // ── Projects ─────────────────────────────────────────────────────────

    async fn list_projects(
        &self,
        user: &UserId,
        workspace: &WorkspaceId,
    ) -> Result<Vec<Project>, RemoteError>;

    async fn create_project(
        &self,
        project: &NewProject,
        key: &IdempotencyKey,
    ) -> Result<Project, RemoteError>;

    async fn update_project(
        &self,
        id: &ProjectId,
        patch: &ProjectPatch,
    ) -> Result<Project, RemoteError>;

    async fn delete_project(&self, id: &ProjectId) -> Result<(), RemoteError>;

    // ── Tasks ────────────────────────────────────────────────────────────

    async fn list_tasks(&self, user: &UserId) -> Result<Vec<Task>, RemoteError>;

    async fn create_task(&self, task: &NewTask) -> Result<Task, RemoteError>;

    async fn update_task(&self, id: &TaskId, patch: &TaskPatch) -> Result<Task, RemoteError>;

    async fn delete_task(&self, id: &TaskId) -> Result<(), RemoteError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_idempotency_keys_are_time_ordered_uuids() {
        let first = IdempotencyKey::generate();
        let second = IdempotencyKey::generate();
        let parsed = uuid::Uuid::parse_str(first.as_str()).unwrap();
        assert_eq!(parsed.get_version_num(), 7);
        assert_ne!(first, second);
    }
}
