//! Shared entity and identifier types for ZenSpace.
//!
//! This crate is the relational foundation: typed ids, the entity records the
//! remote service hands out, their creation inputs and partial patches. It has
//! **no internal zenspace dependencies**. It is a pure leaf crate the client builds on.
//!
//! # Entity-Relationship Overview
//!
//! ```text
//! User (UserId)
//!     └── owns Workspace (WorkspaceId), implicitly a member
//!     └── leads / joins Project
//!     └── is assigned Task
//!
//! Workspace (WorkspaceId)
//!     └── contains Project (ProjectId)
//!             └── contains Task (TaskId)
//!             └── has FileAsset (FileId), optionally on a Task
//!             └── has Comment (CommentId), optionally on a Task
//! ```
//!
//! |---------------|------------------------------------------|
//! | Type          | Purpose                                  |
//! |---------------|------------------------------------------|
//! | [`User`]      | Team member profile + role               |
//! | [`Workspace`] | Top-level container, has an owner        |
//! | [`Project`]   | Work container with lead + member set    |
//! | [`Task`]      | Kanban card inside a project             |
//! | [`FileAsset`] | Uploaded file attached to a project      |
//! | [`Comment`]   | Discussion on a project or task          |
//! | [`Theme`]     | Persisted appearance preference          |
//! |---------------|------------------------------------------|

pub mod attachment;
pub mod dates;
pub mod ids;
pub mod project;
pub mod status;
pub mod task;
pub mod theme;
pub mod user;
pub mod workspace;

pub use attachment::{Comment, FileAsset};
pub use ids::{CommentId, FileId, ProjectId, TaskId, UserId, WorkspaceId};
pub use project::{NewProject, Project, ProjectPatch, normalize_members};
pub use status::{Priority, ProjectStatus, TaskStatus, TaskType, UserRole};
pub use task::{NewTask, Task, TaskPatch};
pub use theme::Theme;
pub use user::{User, UserPatch};
pub use workspace::Workspace;

/// A required field is missing or malformed. Raised before any network call.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{field}: {reason}")]
pub struct ValidationError {
    pub field: &'static str,
    pub reason: String,
}

impl ValidationError {
    pub fn missing(field: &'static str) -> Self {
        Self {
            field,
            reason: "is required".to_string(),
        }
    }

    pub fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self {
            field,
            reason: reason.into(),
        }
    }
}
