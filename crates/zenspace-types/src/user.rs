//! Users and their editable profile fields.

use serde::{Deserialize, Serialize};

use crate::ids::UserId;
use crate::status::UserRole;

/// A team member as the remote service reports them.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub avatar: String,
    #[serde(default)]
    pub role: UserRole,
}

impl User {
    /// Default avatar URL for a new account, seeded from the email address.
    pub fn default_avatar(email: &str) -> String {
        format!("https://api.dicebear.com/7.x/avataaars/svg?seed={email}")
    }

    /// Apply a patch, returning the updated record.
    pub fn patched(&self, patch: &UserPatch) -> User {
        let mut next = self.clone();
        if let Some(name) = &patch.name {
            next.name = name.clone();
        }
        if let Some(email) = &patch.email {
            next.email = email.clone();
        }
        if let Some(avatar) = &patch.avatar {
            next.avatar = avatar.clone();
        }
        next
    }
}

impl std::fmt::Display for User {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} <{}>", self.name, self.email)
    }
}

/// Partial update of a user's profile.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
}

impl UserPatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.email.is_none() && self.avatar.is_none()
    }
}
