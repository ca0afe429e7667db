//! Errors returned by store operations.

use thiserror::Error;
use zenspace_types::ValidationError;

use crate::remote::RemoteError;

/// The four failure classes a caller needs to tell apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Missing or malformed input; fixable by the caller.
    Validation,
    /// A referenced entity is absent.
    NotFound,
    /// Not signed in, or credentials rejected.
    Auth,
    /// Anything else: service failure, transport, timeout.
    Server,
}

/// Error from a store operation. The cache is untouched whenever one is
/// returned from a mutation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error(transparent)]
    Remote(#[from] RemoteError),

    #[error("{0}")]
    Validation(#[from] ValidationError),

    /// Referenced entity is not in the local cache.
    #[error("{kind} {id} not found")]
    NotFound { kind: &'static str, id: String },

    #[error("not signed in")]
    NotAuthenticated,

    #[error("no active workspace")]
    NoActiveWorkspace,
}

impl StoreError {
    pub(crate) fn not_found(kind: &'static str, id: impl std::fmt::Display) -> Self {
        StoreError::NotFound {
            kind,
            id: id.to_string(),
        }
    }

    /// Classify onto the four-way taxonomy.
    pub fn kind(&self) -> ErrorKind {
        match self {
            StoreError::Remote(RemoteError::Validation(_)) => ErrorKind::Validation,
            StoreError::Remote(RemoteError::NotFound(_)) => ErrorKind::NotFound,
            StoreError::Remote(RemoteError::Auth(_)) => ErrorKind::Auth,
            StoreError::Remote(_) => ErrorKind::Server,
            StoreError::Validation(_) | StoreError::NoActiveWorkspace => ErrorKind::Validation,
            StoreError::NotFound { .. } => ErrorKind::NotFound,
            StoreError::NotAuthenticated => ErrorKind::Auth,
        }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_kind_mapping() {
        assert_eq!(StoreError::from(RemoteError::Auth("x".into())).kind(), ErrorKind::Auth);
        assert_eq!(
            StoreError::from(RemoteError::Timeout(Duration::from_secs(1))).kind(),
            ErrorKind::Server
        );
        assert_eq!(
            StoreError::from(ValidationError::missing("title")).kind(),
            ErrorKind::Validation
        );
        assert_eq!(StoreError::not_found("project", "p9").kind(), ErrorKind::NotFound);
        assert_eq!(StoreError::not_found("project", "p9").to_string(), "project p9 not found");
        assert_eq!(StoreError::NotAuthenticated.kind(), ErrorKind::Auth);
        assert_eq!(StoreError::NoActiveWorkspace.kind(), ErrorKind::Validation);
    }
}
