use std::sync::Arc;

use async_trait::async_trait;

use crate::error::BackendError;
use crate::types::{Credentials, Message, MessageId, Scopes, Topic, TopicPage};

/// Everything a backend needs to open an authenticated session.
#[derive(Debug, Clone)]
pub struct ConnectRequest {
    pub project_id: String,
    pub credentials: Credentials,
    pub scopes: Scopes,
    /// Endpoint override (e.g. a local emulator).
    pub endpoint_url: Option<String>,
}

impl ConnectRequest {
    /// Create a request using ambient credentials and the default scopes.
    pub fn new(project_id: impl Into<String>) -> Self {
        Self {
            project_id: project_id.into(),
            credentials: Credentials::Ambient,
            scopes: Scopes::default(),
            endpoint_url: None,
        }
    }

    #[must_use]
    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = credentials;
        self
    }

    #[must_use]
    pub fn with_scopes(mut self, scopes: Scopes) -> Self {
        self.scopes = scopes;
        self
    }

    #[must_use]
    pub fn with_endpoint_url(mut self, endpoint_url: impl Into<String>) -> Self {
        self.endpoint_url = Some(endpoint_url.into());
        self
    }
}

/// A managed publish/subscribe service.
///
/// Implementations must be `Send + Sync` and safe for concurrent access.
#[async_trait]
pub trait PubSubBackend: Send + Sync {
    /// Short backend name used in logs.
    fn name(&self) -> &str;

    /// Open an authenticated session bound to `request.project_id`.
    async fn connect(
        &self,
        request: &ConnectRequest,
    ) -> Result<Arc<dyn BackendSession>, BackendError>;
}

/// An authenticated connection to the backend, scoped to one project.
#[async_trait]
pub trait BackendSession: Send + Sync {
    /// Look a topic up. Returns `None` if the backend reports it missing.
    async fn get_topic(&self, topic: &Topic) -> Result<Option<Topic>, BackendError>;

    /// Create a topic. Fails with [`BackendError::AlreadyExists`] if it exists.
    async fn create_topic(&self, topic: &Topic) -> Result<Topic, BackendError>;

    /// Fetch one page of the project's topics. `page_token` is `None` for the
    /// first page.
    async fn list_topics(
        &self,
        project_id: &str,
        page_token: Option<&str>,
    ) -> Result<TopicPage, BackendError>;

    /// Publish `messages` as one batch. The batch succeeds or fails as a
    /// whole; on success the ids are returned in submission order.
    async fn publish(
        &self,
        topic: &Topic,
        messages: &[Message],
    ) -> Result<Vec<MessageId>, BackendError>;
}
