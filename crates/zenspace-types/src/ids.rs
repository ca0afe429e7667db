//! Typed identifiers for users, workspaces, projects, tasks, files, and comments.
//!
//! Every identifier is assigned by the remote service and is opaque to the
//! client: the store never parses, orders, or generates them. Wrapping each
//! kind in its own newtype keeps a `ProjectId` from being passed where a
//! `TaskId` is expected. On the wire they are plain JSON strings.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A user identifier.
#[derive(Clone, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

/// A workspace identifier.
#[derive(Clone, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WorkspaceId(String);

/// A project identifier.
#[derive(Clone, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProjectId(String);

/// A task identifier.
#[derive(Clone, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(String);

/// A file asset identifier.
#[derive(Clone, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FileId(String);

/// A comment identifier.
#[derive(Clone, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CommentId(String);

// ── Shared behavior ─────────────────────────────────────────────────────────

macro_rules! impl_typed_id {
    ($T:ident, $name:literal) => {
        impl $T {
            /// Wrap a server-assigned identifier.
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// The raw identifier string.
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Empty ids never come from the server; they mark "unset".
            pub fn is_empty(&self) -> bool {
                self.0.is_empty()
            }

            /// Consume into the inner string.
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl From<&str> for $T {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl From<String> for $T {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl AsRef<str> for $T {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl PartialEq<str> for $T {
            fn eq(&self, other: &str) -> bool {
                self.0 == other
            }
        }

        impl PartialEq<&str> for $T {
            fn eq(&self, other: &&str) -> bool {
                self.0 == *other
            }
        }

        impl fmt::Display for $T {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl fmt::Debug for $T {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", $name, self.0)
            }
        }
    };
}

impl_typed_id!(UserId, "UserId");
impl_typed_id!(WorkspaceId, "WorkspaceId");
impl_typed_id!(ProjectId, "ProjectId");
impl_typed_id!(TaskId, "TaskId");
impl_typed_id!(FileId, "FileId");
impl_typed_id!(CommentId, "CommentId");

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_are_transparent_json_strings() {
        let id = ProjectId::new("p_123");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"p_123\"");
        let parsed: ProjectId = serde_json::from_str("\"p_123\"").unwrap();
        assert_eq!(parsed, id);
    }

    #[test]
    fn test_debug_names_the_kind() {
        assert_eq!(format!("{:?}", TaskId::from("t1")), "TaskId(t1)");
        assert_eq!(UserId::from("u1").to_string(), "u1");
    }

    #[test]
    fn test_compare_with_str() {
        let id = WorkspaceId::from("w1");
        assert!(id == "w1");
        assert!(!id.is_empty());
        assert!(WorkspaceId::new("").is_empty());
    }
}
