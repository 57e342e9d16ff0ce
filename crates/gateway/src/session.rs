use std::future::Future;
use std::sync::Arc;

use pubgate_backend::{BackendError, BackendSession, Message, MessageId, PubSubBackend, Scopes, Topic};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument};

use crate::cancel::{cancellable, cancellable_within};
use crate::config::GatewayConfig;
use crate::error::GatewayError;

/// An authenticated handle to the messaging backend, bound to one project.
///
/// Cloning is cheap and yields a handle to the same session. Sessions are
/// independent of each other; nothing is shared between two sessions
/// established separately.
#[derive(Clone)]
pub struct Session {
    inner: Arc<SessionInner>,
}

struct SessionInner {
    backend: Arc<dyn BackendSession>,
    backend_name: String,
    project_id: String,
    scopes: Scopes,
    credential_kind: &'static str,
    lifetime: CancellationToken,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("backend", &self.inner.backend_name)
            .field("project_id", &self.inner.project_id)
            .field("scopes", &self.inner.scopes)
            .field("credentials", &self.inner.credential_kind)
            .finish_non_exhaustive()
    }
}

/// Open a session against `backend` as described by `config`.
///
/// The explicit service-account identity is used when the config names one
/// (non-empty email), ambient credentials otherwise. An empty scope list is
/// replaced by the default scopes. Failures are returned as-is, never
/// retried.
pub async fn establish_session(
    backend: &dyn PubSubBackend,
    config: &GatewayConfig,
    cancel: &CancellationToken,
) -> Result<Session, GatewayError> {
    establish_session_within(backend, config, cancel, CancellationToken::new()).await
}

/// Open a session whose lifetime ends when `lifetime` is cancelled.
#[instrument(skip_all, fields(project = %config.project_id, backend = backend.name()))]
pub(crate) async fn establish_session_within(
    backend: &dyn PubSubBackend,
    config: &GatewayConfig,
    cancel: &CancellationToken,
    lifetime: CancellationToken,
) -> Result<Session, GatewayError> {
    let request = cancellable(cancel, config.connect_request()).await??;
    let credential_kind = request.credentials.kind();

    let connection = cancellable(cancel, backend.connect(&request))
        .await?
        .map_err(|e| GatewayError::from_connect(&e))?;

    info!(credentials = credential_kind, "session established");
    Ok(Session {
        inner: Arc::new(SessionInner {
            backend: connection,
            backend_name: backend.name().to_owned(),
            project_id: request.project_id,
            scopes: request.scopes,
            credential_kind,
            lifetime,
        }),
    })
}

fn resolution_error(topic: &str) -> impl FnOnce(BackendError) -> GatewayError + '_ {
    move |source| GatewayError::TopicResolution {
        topic: topic.to_owned(),
        source,
    }
}

impl Session {
    pub fn project_id(&self) -> &str {
        &self.inner.project_id
    }

    /// The scopes the session was authorized with.
    pub fn scopes(&self) -> &Scopes {
        &self.inner.scopes
    }

    /// `"ambient"` or `"service_account"`.
    pub fn credential_kind(&self) -> &'static str {
        self.inner.credential_kind
    }

    /// Returns `true` if both handles refer to the same session.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Cancel every in-flight and future operation on this session.
    pub fn shutdown(&self) {
        debug!(project = %self.inner.project_id, "session shut down");
        self.inner.lifetime.cancel();
    }

    pub fn is_shut_down(&self) -> bool {
        self.inner.lifetime.is_cancelled()
    }

    async fn guarded<F: Future>(
        &self,
        cancel: &CancellationToken,
        fut: F,
    ) -> Result<F::Output, GatewayError> {
        cancellable_within(cancel, &self.inner.lifetime, fut).await
    }

    fn topic(&self, name: &str) -> Topic {
        Topic::new(self.inner.project_id.clone(), name)
    }

    /// Find the named topic, creating it if the backend reports it missing.
    ///
    /// Existence is always confirmed by the backend; nothing is cached, so
    /// every call queries again. A creation that fails because the topic
    /// already exists (another caller created it in between) counts as
    /// resolved.
    #[instrument(skip(self, cancel), fields(project = %self.inner.project_id))]
    pub async fn resolve_topic(
        &self,
        name: &str,
        cancel: &CancellationToken,
    ) -> Result<Topic, GatewayError> {
        let wanted = self.topic(name);
        let found = self
            .guarded(cancel, self.inner.backend.get_topic(&wanted))
            .await?
            .map_err(resolution_error(name))?;

        if let Some(topic) = found {
            debug!("topic exists");
            return Ok(topic);
        }
        self.create_topic(name, cancel).await
    }

    /// Create the named topic. An "already exists" answer counts as success.
    #[instrument(skip(self, cancel), fields(project = %self.inner.project_id))]
    pub async fn create_topic(
        &self,
        name: &str,
        cancel: &CancellationToken,
    ) -> Result<Topic, GatewayError> {
        let wanted = self.topic(name);
        match self
            .guarded(cancel, self.inner.backend.create_topic(&wanted))
            .await?
        {
            Ok(topic) => {
                info!(topic = %topic, "topic created");
                Ok(topic)
            }
            Err(e) if e.is_already_exists() => {
                debug!("topic already exists");
                Ok(wanted)
            }
            Err(e) => Err(resolution_error(name)(e)),
        }
    }

    /// Publish `messages` to the named topic as one batch, creating the topic
    /// first if needed.
    ///
    /// An empty batch is forwarded to the backend like any other. The batch
    /// succeeds or fails as a whole; on success the backend's message ids are
    /// returned in submission order.
    #[instrument(
        skip(self, messages, cancel),
        fields(project = %self.inner.project_id, count = messages.len())
    )]
    pub async fn publish(
        &self,
        topic: &str,
        messages: &[Message],
        cancel: &CancellationToken,
    ) -> Result<Vec<MessageId>, GatewayError> {
        let resolved = self.resolve_topic(topic, cancel).await?;
        let ids = self
            .guarded(cancel, self.inner.backend.publish(&resolved, messages))
            .await?
            .map_err(|source| GatewayError::Publish {
                topic: topic.to_owned(),
                source,
            })?;
        debug!(published = ids.len(), "batch acknowledged");
        Ok(ids)
    }

    /// Every topic in the session's project, in the order the backend
    /// reports them.
    ///
    /// Pages are fetched until the backend signals the end. If any page
    /// fails the error is returned and topics read so far are dropped.
    #[instrument(skip(self, cancel), fields(project = %self.inner.project_id))]
    pub async fn list_topics(&self, cancel: &CancellationToken) -> Result<Vec<Topic>, GatewayError> {
        let project = &self.inner.project_id;
        let mut topics = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let page = self
                .guarded(
                    cancel,
                    self.inner.backend.list_topics(project, page_token.as_deref()),
                )
                .await?
                .map_err(|source| GatewayError::Listing {
                    project: project.clone(),
                    source,
                })?;
            topics.extend(page.topics);

            match page.next_page_token {
                Some(next) => page_token = Some(next),
                None => break,
            }
        }

        debug!(count = topics.len(), "topics listed");
        Ok(topics)
    }
}
