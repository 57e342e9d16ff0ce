use pubgate_backend::BackendError;
use thiserror::Error;

/// Errors returned by gateway operations.
///
/// Backend causes are carried unchanged. Nothing here is retried or
/// classified as transient; that decision belongs to the caller.
#[derive(Debug, Clone, Error)]
pub enum GatewayError {
    /// Identity material was malformed or missing, default credential
    /// discovery failed, or the backend rejected the credentials.
    #[error("credential error: {0}")]
    Credential(String),

    /// The backend refused to open a session.
    #[error("session error: {0}")]
    Session(String),

    /// Looking up or creating a topic failed.
    #[error("failed to resolve topic '{topic}': {source}")]
    TopicResolution {
        topic: String,
        #[source]
        source: BackendError,
    },

    /// The backend rejected a publish batch.
    #[error("failed to publish to topic '{topic}': {source}")]
    Publish {
        topic: String,
        #[source]
        source: BackendError,
    },

    /// Enumerating the project's topics failed.
    #[error("failed to list topics of project '{project}': {source}")]
    Listing {
        project: String,
        #[source]
        source: BackendError,
    },

    /// The caller's token or the session's lifetime token was cancelled.
    #[error("operation cancelled")]
    Cancelled,

    /// Configuration could not be read or parsed.
    #[error("invalid configuration: {0}")]
    Configuration(String),
}

impl GatewayError {
    /// Map a failed session establishment: rejected credentials become
    /// [`GatewayError::Credential`], everything else [`GatewayError::Session`].
    pub(crate) fn from_connect(err: &BackendError) -> Self {
        if err.is_credential_failure() {
            Self::Credential(err.to_string())
        } else {
            Self::Session(err.to_string())
        }
    }

    /// The backend error behind this failure, if the backend reported one.
    pub fn backend_error(&self) -> Option<&BackendError> {
        match self {
            Self::TopicResolution { source, .. }
            | Self::Publish { source, .. }
            | Self::Listing { source, .. } => Some(source),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connect_failures_split_by_cause() {
        let err = GatewayError::from_connect(&BackendError::InvalidCredentials("bad key".into()));
        assert!(matches!(err, GatewayError::Credential(ref m) if m.contains("bad key")));

        let err = GatewayError::from_connect(&BackendError::Unauthenticated("revoked".into()));
        assert!(matches!(err, GatewayError::Credential(_)));

        let err = GatewayError::from_connect(&BackendError::Unavailable("dns".into()));
        assert!(matches!(err, GatewayError::Session(_)));
    }

    #[test]
    fn backend_error_is_exposed() {
        let err = GatewayError::Publish {
            topic: "events".into(),
            source: BackendError::ResourceExhausted("quota".into()),
        };
        assert_eq!(
            err.backend_error(),
            Some(&BackendError::ResourceExhausted("quota".into()))
        );
        assert!(GatewayError::Cancelled.backend_error().is_none());
    }

    #[test]
    fn error_display() {
        let err = GatewayError::TopicResolution {
            topic: "events".into(),
            source: BackendError::PermissionDenied("topics.create".into()),
        };
        assert_eq!(
            err.to_string(),
            "failed to resolve topic 'events': permission denied: topics.create"
        );
        assert_eq!(GatewayError::Cancelled.to_string(), "operation cancelled");
    }
}
