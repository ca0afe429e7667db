//! Files and comments hanging off a project (and optionally a task).
//!
//! These records are cached only: the store ingests already-confirmed copies
//! and drops them when their parent goes away.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{CommentId, FileId, ProjectId, TaskId, UserId};

/// An uploaded file attached to a project.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileAsset {
    pub id: FileId,
    pub project_id: ProjectId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_id: Option<TaskId>,
    pub name: String,
    /// Human-readable size as reported by the uploader ("2.4 MB").
    #[serde(default)]
    pub size: String,
    /// MIME type.
    #[serde(rename = "type", default)]
    pub mime_type: String,
    pub uploaded_by: UserId,
    #[serde(default)]
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub url: String,
}

/// A discussion comment on a project or one of its tasks.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: CommentId,
    pub project_id: ProjectId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_id: Option<TaskId>,
    pub user_id: UserId,
    pub content: String,
    #[serde(default)]
    pub created_at: DateTime<Utc>,
}
