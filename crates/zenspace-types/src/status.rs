//! Closed vocabularies: roles, project and task statuses, priorities, task types.
//!
//! The canonical serde form is the display label the UI shows ("In Progress",
//! "On Hold"). The remote service stores the same values as upper-snake
//! database enums (`IN_PROGRESS`, `ON_HOLD`) and sometimes hands them back with
//! underscores replaced by spaces, so every variant also accepts those spellings
//! on input. `FromStr` (via strum) is case-insensitive for CLI input.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use strum::EnumString;

/// Role of a user within the team.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Default, EnumString)]
#[strum(ascii_case_insensitive)]
pub enum UserRole {
    #[serde(alias = "ADMIN", alias = "admin")]
    Admin,
    #[default]
    #[serde(alias = "MEMBER", alias = "member")]
    Member,
}

/// Lifecycle status of a project.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Default, EnumString)]
#[strum(ascii_case_insensitive)]
pub enum ProjectStatus {
    #[default]
    #[serde(alias = "ACTIVE")]
    Active,
    #[serde(alias = "PLANNING")]
    Planning,
    #[serde(alias = "COMPLETED")]
    Completed,
    #[serde(rename = "On Hold", alias = "ON_HOLD", alias = "ON HOLD")]
    #[strum(serialize = "on hold", serialize = "on_hold", serialize = "onhold")]
    OnHold,
    #[serde(alias = "CANCELLED")]
    Cancelled,
}

impl ProjectStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProjectStatus::Active => "Active",
            ProjectStatus::Planning => "Planning",
            ProjectStatus::Completed => "Completed",
            ProjectStatus::OnHold => "On Hold",
            ProjectStatus::Cancelled => "Cancelled",
        }
    }
}

impl std::fmt::Display for ProjectStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Priority shared by projects and tasks.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
    EnumString,
)]
#[strum(ascii_case_insensitive)]
pub enum Priority {
    #[serde(alias = "LOW", alias = "low")]
    Low,
    #[default]
    #[serde(alias = "MEDIUM", alias = "medium")]
    Medium,
    #[serde(alias = "HIGH", alias = "high")]
    High,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "Low",
            Priority::Medium => "Medium",
            Priority::High => "High",
        }
    }
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kanban column a task sits in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Default, EnumString)]
#[strum(ascii_case_insensitive)]
pub enum TaskStatus {
    #[default]
    #[serde(alias = "TODO")]
    #[strum(serialize = "todo", serialize = "to do")]
    Todo,
    #[serde(rename = "In Progress", alias = "IN_PROGRESS", alias = "IN PROGRESS")]
    #[strum(
        serialize = "in progress",
        serialize = "in_progress",
        serialize = "inprogress",
        serialize = "doing"
    )]
    InProgress,
    #[serde(alias = "DONE")]
    #[strum(serialize = "done", serialize = "complete", serialize = "completed")]
    Done,
}

impl TaskStatus {
    /// All columns in board order.
    pub const ALL: [TaskStatus; 3] = [TaskStatus::Todo, TaskStatus::InProgress, TaskStatus::Done];

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        <Self as FromStr>::from_str(s.trim()).ok()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Todo => "Todo",
            TaskStatus::InProgress => "In Progress",
            TaskStatus::Done => "Done",
        }
    }

    pub fn is_done(&self) -> bool {
        matches!(self, TaskStatus::Done)
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What kind of work a task represents.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Default, EnumString)]
#[strum(ascii_case_insensitive)]
pub enum TaskType {
    #[default]
    #[serde(alias = "TASK")]
    Task,
    #[serde(alias = "BUG")]
    Bug,
    #[serde(alias = "FEATURE")]
    Feature,
    #[serde(alias = "IMPROVEMENT")]
    Improvement,
}

impl TaskType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskType::Task => "Task",
            TaskType::Bug => "Bug",
            TaskType::Feature => "Feature",
            TaskType::Improvement => "Improvement",
        }
    }
}

impl std::fmt::Display for TaskType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_status_accepts_db_spellings() {
        for raw in ["\"In Progress\"", "\"IN_PROGRESS\"", "\"IN PROGRESS\""] {
            let s: TaskStatus = serde_json::from_str(raw).unwrap();
            assert_eq!(s, TaskStatus::InProgress, "raw {raw}");
        }
        assert_eq!(serde_json::to_string(&TaskStatus::InProgress).unwrap(), "\"In Progress\"");
    }

    #[test]
    fn test_project_status_on_hold() {
        let s: ProjectStatus = serde_json::from_str("\"ON_HOLD\"").unwrap();
        assert_eq!(s, ProjectStatus::OnHold);
        assert_eq!(serde_json::to_string(&s).unwrap(), "\"On Hold\"");
    }

    #[test]
    fn test_task_status_parse_cli_input() {
        assert_eq!(TaskStatus::from_str("done"), Some(TaskStatus::Done));
        assert_eq!(TaskStatus::from_str("In Progress"), Some(TaskStatus::InProgress));
        assert_eq!(TaskStatus::from_str(" todo "), Some(TaskStatus::Todo));
        assert_eq!(TaskStatus::from_str("archived"), None);
    }

    #[test]
    fn test_uppercase_aliases() {
        let p: Priority = serde_json::from_str("\"HIGH\"").unwrap();
        assert_eq!(p, Priority::High);
        let t: TaskType = serde_json::from_str("\"BUG\"").unwrap();
        assert_eq!(t, TaskType::Bug);
        let r: UserRole = serde_json::from_str("\"ADMIN\"").unwrap();
        assert_eq!(r, UserRole::Admin);
    }
}
