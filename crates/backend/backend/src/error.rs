use thiserror::Error;

/// Errors reported by a messaging backend.
///
/// The message text is the backend's own description of the failure and is
/// kept verbatim. The variant records the backend's status so callers can
/// branch on the cause without inspecting the text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BackendError {
    /// The supplied identity material was rejected (bad key, bad email).
    #[error("invalid credentials: {0}")]
    InvalidCredentials(String),

    /// The backend could not authenticate the caller.
    #[error("unauthenticated: {0}")]
    Unauthenticated(String),

    #[error("permission denied: {0}")]
    PermissionDenied(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("already exists: {0}")]
    AlreadyExists(String),

    /// The request was malformed (invalid topic name, empty message, ...).
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Quota or rate limit exhausted.
    #[error("resource exhausted: {0}")]
    ResourceExhausted(String),

    /// Network or service availability failure.
    #[error("unavailable: {0}")]
    Unavailable(String),

    #[error("deadline exceeded: {0}")]
    Timeout(String),

    /// Any other backend failure.
    #[error("backend error: {0}")]
    Service(String),
}

impl BackendError {
    /// Returns `true` if the backend reported that the resource already exists.
    pub fn is_already_exists(&self) -> bool {
        matches!(self, Self::AlreadyExists(_))
    }

    /// Returns `true` if the backend reported that the resource does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Returns `true` if the failure concerns the caller's identity rather
    /// than the request itself.
    pub fn is_credential_failure(&self) -> bool {
        matches!(self, Self::InvalidCredentials(_) | Self::Unauthenticated(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn predicates() {
        assert!(BackendError::AlreadyExists("t".into()).is_already_exists());
        assert!(!BackendError::NotFound("t".into()).is_already_exists());
        assert!(BackendError::NotFound("t".into()).is_not_found());
        assert!(BackendError::InvalidCredentials("k".into()).is_credential_failure());
        assert!(BackendError::Unauthenticated("k".into()).is_credential_failure());
        assert!(!BackendError::PermissionDenied("k".into()).is_credential_failure());
    }

    #[test]
    fn error_display() {
        assert_eq!(
            BackendError::PermissionDenied("topics.create".into()).to_string(),
            "permission denied: topics.create"
        );
        assert_eq!(
            BackendError::Service("boom".into()).to_string(),
            "backend error: boom"
        );
    }
}
