//! Tasks, their creation input, and partial updates.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::dates::opt_date;
use crate::ids::{ProjectId, TaskId, UserId};
use crate::status::{Priority, TaskStatus, TaskType};
use crate::ValidationError;

/// A unit of work inside a project.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: TaskId,
    pub project_id: ProjectId,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub status: TaskStatus,
    #[serde(rename = "type", default)]
    pub task_type: TaskType,
    #[serde(default)]
    pub priority: Priority,
    pub assignee_id: UserId,
    #[serde(default, with = "opt_date")]
    pub due_date: Option<NaiveDate>,
    #[serde(default)]
    pub created_at: DateTime<Utc>,
}

impl Task {
    /// Past due and not finished. A task due today is not overdue.
    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        match self.due_date {
            Some(due) => due < today && !self.status.is_done(),
            None => false,
        }
    }

    /// Apply a patch, returning the updated record.
    pub fn patched(&self, patch: &TaskPatch) -> Task {
        let mut next = self.clone();
        if let Some(v) = &patch.title {
            next.title = v.clone();
        }
        if let Some(v) = &patch.description {
            next.description = v.clone();
        }
        if let Some(v) = patch.status {
            next.status = v;
        }
        if let Some(v) = patch.task_type {
            next.task_type = v;
        }
        if let Some(v) = patch.priority {
            next.priority = v;
        }
        if let Some(v) = &patch.assignee_id {
            next.assignee_id = v.clone();
        }
        if let Some(v) = patch.due_date {
            next.due_date = Some(v);
        }
        next
    }
}

/// Input for creating a task. The server assigns id and creation time.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTask {
    pub project_id: ProjectId,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub status: TaskStatus,
    #[serde(rename = "type", default)]
    pub task_type: TaskType,
    #[serde(default)]
    pub priority: Priority,
    pub assignee_id: UserId,
    #[serde(default, with = "opt_date")]
    pub due_date: Option<NaiveDate>,
}

impl NewTask {
    pub fn new(project: ProjectId, title: impl Into<String>, assignee: UserId) -> Self {
        Self {
            project_id: project,
            title: title.into(),
            description: String::new(),
            status: TaskStatus::default(),
            task_type: TaskType::default(),
            priority: Priority::default(),
            assignee_id: assignee,
            due_date: None,
        }
    }

    pub fn with_status(mut self, status: TaskStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_type(mut self, task_type: TaskType) -> Self {
        self.task_type = task_type;
        self
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_due_date(mut self, due: NaiveDate) -> Self {
        self.due_date = Some(due);
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// title, projectId and assigneeId are required.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.title.trim().is_empty() {
            return Err(ValidationError::missing("title"));
        }
        if self.project_id.is_empty() {
            return Err(ValidationError::missing("projectId"));
        }
        if self.assignee_id.is_empty() {
            return Err(ValidationError::missing("assigneeId"));
        }
        Ok(())
    }

    pub fn into_task(self, id: TaskId, created_at: DateTime<Utc>) -> Task {
        Task {
            id,
            project_id: self.project_id,
            title: self.title,
            description: self.description,
            status: self.status,
            task_type: self.task_type,
            priority: self.priority,
            assignee_id: self.assignee_id,
            due_date: self.due_date,
            created_at,
        }
    }
}

/// Partial update of a task. `None` fields are left untouched.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<TaskStatus>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub task_type: Option<TaskType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assignee_id: Option<UserId>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "opt_date")]
    pub due_date: Option<NaiveDate>,
}

impl TaskPatch {
    /// A board move: only the status column changes.
    pub fn status(status: TaskStatus) -> Self {
        Self {
            status: Some(status),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == TaskPatch::default()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn task(status: TaskStatus, due: Option<NaiveDate>) -> Task {
        NewTask::new(ProjectId::from("p1"), "Write copy", UserId::from("u1"))
            .with_status(status)
            .into_task(TaskId::from("t1"), Utc::now())
            .patched(&TaskPatch {
                due_date: due,
                ..Default::default()
            })
    }

    #[test]
    fn test_status_patch_wire_shape() {
        let json = serde_json::to_string(&TaskPatch::status(TaskStatus::Done)).unwrap();
        assert_eq!(json, r#"{"status":"Done"}"#);
    }

    #[test]
    fn test_overdue() {
        let today = NaiveDate::from_ymd_opt(2024, 5, 10).unwrap();
        let yesterday = today.pred_opt();
        assert!(task(TaskStatus::Todo, yesterday).is_overdue(today));
        assert!(!task(TaskStatus::Done, yesterday).is_overdue(today));
        assert!(!task(TaskStatus::Todo, Some(today)).is_overdue(today));
        assert!(!task(TaskStatus::Todo, None).is_overdue(today));
    }

    #[test]
    fn test_server_task_shape() {
        let json = r#"{
            "id": "t1", "title": "Fix", "description": "", "status": "IN PROGRESS",
            "type": "BUG", "priority": "Low", "dueDate": "", "projectId": "p1",
            "assigneeId": "u1", "createdAt": "2024-03-01T10:00:00.000Z"
        }"#;
        let t: Task = serde_json::from_str(json).unwrap();
        assert_eq!(t.status, TaskStatus::InProgress);
        assert_eq!(t.task_type, TaskType::Bug);
        assert_eq!(t.due_date, None);
    }

    #[test]
    fn test_validate_requires_assignee() {
        let t = NewTask::new(ProjectId::from("p1"), "Fix", UserId::from(""));
        let err = t.validate().unwrap_err();
        assert!(err.to_string().contains("assigneeId"));
    }
}
