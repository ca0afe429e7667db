//! Projects, their creation input, and partial updates.
//!
//! Membership is an ordered set: insertion order is kept for display, the
//! lead is always a member, and duplicates are collapsed. Every constructor
//! and patch path goes through [`normalize_members`] to keep that true.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::dates::opt_date;
use crate::ids::{ProjectId, UserId, WorkspaceId};
use crate::status::{Priority, ProjectStatus};
use crate::ValidationError;

/// A project inside a workspace.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: ProjectId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub status: ProjectStatus,
    #[serde(default)]
    pub priority: Priority,
    /// Server-reported progress. Informational only; the derived view
    /// recomputes completion from the task table.
    #[serde(default)]
    pub progress: u8,
    #[serde(default, with = "opt_date")]
    pub start_date: Option<NaiveDate>,
    #[serde(default, with = "opt_date")]
    pub end_date: Option<NaiveDate>,
    pub lead_id: UserId,
    #[serde(default)]
    pub member_ids: Vec<UserId>,
    pub workspace_id: WorkspaceId,
}

impl Project {
    pub fn has_member(&self, user: &UserId) -> bool {
        self.member_ids.contains(user)
    }

    /// Apply a patch, returning the updated record with membership normalized.
    pub fn patched(&self, patch: &ProjectPatch) -> Project {
        let mut next = self.clone();
        if let Some(v) = &patch.name {
            next.name = v.clone();
        }
        if let Some(v) = &patch.description {
            next.description = v.clone();
        }
        if let Some(v) = patch.status {
            next.status = v;
        }
        if let Some(v) = patch.priority {
            next.priority = v;
        }
        if let Some(v) = patch.progress {
            next.progress = v.min(100);
        }
        if let Some(v) = patch.start_date {
            next.start_date = Some(v);
        }
        if let Some(v) = patch.end_date {
            next.end_date = Some(v);
        }
        if let Some(v) = &patch.lead_id {
            next.lead_id = v.clone();
        }
        if let Some(v) = &patch.member_ids {
            next.member_ids = v.clone();
        }
        next.member_ids = normalize_members(&next.lead_id, &next.member_ids);
        next
    }
}

/// Input for creating a project. The server assigns the id.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewProject {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub status: ProjectStatus,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default, with = "opt_date")]
    pub start_date: Option<NaiveDate>,
    #[serde(default, with = "opt_date")]
    pub end_date: Option<NaiveDate>,
    pub lead_id: UserId,
    #[serde(default)]
    pub member_ids: Vec<UserId>,
    pub workspace_id: WorkspaceId,
}

impl NewProject {
    /// Minimal project led by `lead` in `workspace`.
    pub fn new(name: impl Into<String>, lead: UserId, workspace: WorkspaceId) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            status: ProjectStatus::default(),
            priority: Priority::default(),
            start_date: None,
            end_date: None,
            member_ids: vec![lead.clone()],
            lead_id: lead,
            workspace_id: workspace,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_status(mut self, status: ProjectStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_dates(mut self, start: Option<NaiveDate>, end: Option<NaiveDate>) -> Self {
        self.start_date = start;
        self.end_date = end;
        self
    }

    pub fn with_members(mut self, members: Vec<UserId>) -> Self {
        self.member_ids = members;
        self
    }

    /// Required fields present, dates ordered.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::missing("name"));
        }
        if self.lead_id.is_empty() {
            return Err(ValidationError::missing("leadId"));
        }
        if self.workspace_id.is_empty() {
            return Err(ValidationError::missing("workspaceId"));
        }
        if let (Some(start), Some(end)) = (self.start_date, self.end_date) {
            if end < start {
                return Err(ValidationError::invalid("endDate", "ends before it starts"));
            }
        }
        Ok(())
    }

    /// Materialize with a server-assigned id.
    pub fn into_project(self, id: ProjectId) -> Project {
        let member_ids = normalize_members(&self.lead_id, &self.member_ids);
        Project {
            id,
            name: self.name,
            description: self.description,
            status: self.status,
            priority: self.priority,
            progress: 0,
            start_date: self.start_date,
            end_date: self.end_date,
            lead_id: self.lead_id,
            member_ids,
            workspace_id: self.workspace_id,
        }
    }
}

/// Partial update of a project. `None` fields are left untouched.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<ProjectStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "opt_date")]
    pub start_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "opt_date")]
    pub end_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lead_id: Option<UserId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub member_ids: Option<Vec<UserId>>,
}

impl ProjectPatch {
    pub fn members(member_ids: Vec<UserId>) -> Self {
        Self {
            member_ids: Some(member_ids),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == ProjectPatch::default()
    }
}

/// Lead first if missing, duplicates dropped, order otherwise preserved.
pub fn normalize_members(lead: &UserId, members: &[UserId]) -> Vec<UserId> {
    let mut out: Vec<UserId> = Vec::with_capacity(members.len() + 1);
    if !lead.is_empty() && !members.contains(lead) {
        out.push(lead.clone());
    }
    for m in members {
        if !m.is_empty() && !out.contains(m) {
            out.push(m.clone());
        }
    }
    out
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> NewProject {
        NewProject::new("Website Redesign", UserId::from("u1"), WorkspaceId::from("w1"))
    }

    #[test]
    fn test_lead_always_member() {
        let p = sample().with_members(vec![UserId::from("u2")]).into_project(ProjectId::from("p1"));
        assert_eq!(p.member_ids, vec![UserId::from("u1"), UserId::from("u2")]);
    }

    #[test]
    fn test_patch_cannot_drop_lead() {
        let p = sample().into_project(ProjectId::from("p1"));
        let next = p.patched(&ProjectPatch::members(vec![UserId::from("u3")]));
        assert!(next.has_member(&UserId::from("u1")));
        assert!(next.has_member(&UserId::from("u3")));
    }

    #[test]
    fn test_normalize_dedups() {
        let lead = UserId::from("u1");
        let members = vec![UserId::from("u2"), UserId::from("u1"), UserId::from("u2")];
        assert_eq!(
            normalize_members(&lead, &members),
            vec![UserId::from("u2"), UserId::from("u1")]
        );
    }

    #[test]
    fn test_validate() {
        assert!(sample().validate().is_ok());
        let mut bad = sample();
        bad.name = "  ".into();
        assert!(bad.validate().is_err());

        let start = NaiveDate::from_ymd_opt(2024, 6, 1);
        let end = NaiveDate::from_ymd_opt(2024, 1, 1);
        assert!(sample().with_dates(start, end).validate().is_err());
    }

    #[test]
    fn test_project_wire_shape() {
        let json = r#"{
            "id": "p1", "name": "Site", "status": "ACTIVE", "priority": "HIGH",
            "progress": 65, "startDate": "2024-01-01T00:00:00.000Z", "endDate": "",
            "leadId": "u1", "workspaceId": "w1"
        }"#;
        let p: Project = serde_json::from_str(json).unwrap();
        assert_eq!(p.priority, Priority::High);
        assert_eq!(p.start_date, NaiveDate::from_ymd_opt(2024, 1, 1));
        assert_eq!(p.end_date, None);
        assert!(p.member_ids.is_empty());
    }

    #[test]
    fn test_empty_patch_serializes_empty() {
        assert_eq!(serde_json::to_string(&ProjectPatch::default()).unwrap(), "{}");
    }
}
