//! Workspaces: the top-level container a user switches between.

use serde::{Deserialize, Serialize};

use crate::ids::{UserId, WorkspaceId};

/// A workspace. The owner is implicitly a member.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Workspace {
    pub id: WorkspaceId,
    pub name: String,
    pub owner_id: UserId,
}

impl Workspace {
    /// Name of the workspace created alongside a new account.
    pub fn default_name_for(user_name: &str) -> String {
        format!("{user_name}'s Workspace")
    }

    /// Join-code match: exact id, or case-insensitive name.
    pub fn matches_code(&self, code: &str) -> bool {
        let code = code.trim();
        self.id == code || self.name.eq_ignore_ascii_case(code)
    }
}
