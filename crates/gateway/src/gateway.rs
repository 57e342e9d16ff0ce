use std::sync::{Arc, Mutex, PoisonError};

use futures::future::{BoxFuture, FutureExt, Shared};
use pubgate_backend::{Message, MessageId, PubSubBackend, Topic};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::cancel::cancellable;
use crate::config::GatewayConfig;
use crate::error::GatewayError;
use crate::session::{Session, establish_session_within};

/// One establishment attempt, awaited by every caller that arrives while it
/// is in flight.
type PendingSession = Shared<BoxFuture<'static, Result<Session, GatewayError>>>;

/// Publishes to a backend through a lazily established session.
///
/// The session is opened on first use. Concurrent first callers share a
/// single establishment attempt and all observe its outcome: the same
/// [`Session`] or the same error. After a failed attempt has been reported,
/// the next call starts a fresh one.
pub struct PublishGateway {
    backend: Arc<dyn PubSubBackend>,
    config: Arc<GatewayConfig>,
    pending: Mutex<Option<PendingSession>>,
    /// Parent of the session's lifetime token; cancelled by `shutdown`.
    lifetime: CancellationToken,
}

impl std::fmt::Debug for PublishGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PublishGateway")
            .field("backend", &self.backend.name())
            .field("config", &self.config)
            .field("initialized", &self.is_initialized())
            .finish()
    }
}

impl PublishGateway {
    /// Create a gateway over `backend`. No backend call is made until the
    /// first operation.
    pub fn new(backend: Arc<dyn PubSubBackend>, config: GatewayConfig) -> Self {
        Self {
            backend,
            config: Arc::new(config),
            pending: Mutex::new(None),
            lifetime: CancellationToken::new(),
        }
    }

    /// Create a gateway over Google Cloud Pub/Sub.
    #[cfg(feature = "gcp")]
    pub fn gcp(config: GatewayConfig) -> Self {
        Self::new(Arc::new(pubgate_gcp::GcpBackend::new()), config)
    }

    pub fn builder() -> PublishGatewayBuilder {
        PublishGatewayBuilder::new()
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// Returns `true` once a session has been established successfully.
    pub fn is_initialized(&self) -> bool {
        self.lock_pending()
            .as_ref()
            .and_then(|pending| pending.peek().map(Result::is_ok))
            .unwrap_or(false)
    }

    fn lock_pending(&self) -> std::sync::MutexGuard<'_, Option<PendingSession>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// The in-flight or completed establishment attempt, starting one if
    /// there is none.
    fn pending_session(&self) -> PendingSession {
        let mut slot = self.lock_pending();
        if let Some(pending) = slot.as_ref() {
            return pending.clone();
        }

        debug!(project = %self.config.project_id, "starting session establishment");
        let backend = Arc::clone(&self.backend);
        let config = Arc::clone(&self.config);
        let lifetime = self.lifetime.clone();
        let attempt = async move {
            let session_lifetime = lifetime.child_token();
            establish_session_within(backend.as_ref(), &config, &lifetime, session_lifetime).await
        }
        .boxed()
        .shared();
        *slot = Some(attempt.clone());
        attempt
    }

    /// Drop a failed attempt so that the next caller retries, unless another
    /// caller has already replaced it.
    fn forget_failed(&self, failed: &PendingSession) {
        let mut slot = self.lock_pending();
        if slot.as_ref().is_some_and(|current| current.ptr_eq(failed)) {
            *slot = None;
        }
    }

    /// The gateway's session, establishing it if necessary.
    ///
    /// Cancelling `cancel` stops this caller's wait; an attempt other
    /// callers are waiting on keeps going. After [`shutdown`](Self::shutdown)
    /// every call fails with [`GatewayError::Cancelled`].
    pub async fn session(&self, cancel: &CancellationToken) -> Result<Session, GatewayError> {
        if self.lifetime.is_cancelled() {
            return Err(GatewayError::Cancelled);
        }
        let pending = self.pending_session();
        let outcome = cancellable(cancel, pending.clone()).await?;
        if outcome.is_err() {
            self.forget_failed(&pending);
        }
        outcome
    }

    /// Publish `messages` to `topic`, creating the topic if it is missing.
    /// See [`Session::publish`].
    pub async fn publish(
        &self,
        topic: &str,
        messages: &[Message],
        cancel: &CancellationToken,
    ) -> Result<Vec<MessageId>, GatewayError> {
        self.session(cancel)
            .await?
            .publish(topic, messages, cancel)
            .await
    }

    /// See [`Session::resolve_topic`].
    pub async fn resolve_topic(
        &self,
        topic: &str,
        cancel: &CancellationToken,
    ) -> Result<Topic, GatewayError> {
        self.session(cancel)
            .await?
            .resolve_topic(topic, cancel)
            .await
    }

    /// See [`Session::create_topic`].
    pub async fn create_topic(
        &self,
        topic: &str,
        cancel: &CancellationToken,
    ) -> Result<Topic, GatewayError> {
        self.session(cancel).await?.create_topic(topic, cancel).await
    }

    /// See [`Session::list_topics`].
    pub async fn list_topics(&self, cancel: &CancellationToken) -> Result<Vec<Topic>, GatewayError> {
        self.session(cancel).await?.list_topics(cancel).await
    }

    /// Shut the gateway down.
    ///
    /// An established session is shut down, an establishment attempt still
    /// in flight is aborted, and every later operation fails with
    /// [`GatewayError::Cancelled`].
    pub fn shutdown(&self) {
        debug!(project = %self.config.project_id, "gateway shut down");
        self.lifetime.cancel();
    }

    pub fn is_shut_down(&self) -> bool {
        self.lifetime.is_cancelled()
    }
}

/// Fluent builder for constructing a [`PublishGateway`].
///
/// Both a backend and a config must be supplied.
#[derive(Default)]
pub struct PublishGatewayBuilder {
    backend: Option<Arc<dyn PubSubBackend>>,
    config: Option<GatewayConfig>,
}

impl PublishGatewayBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the messaging backend.
    #[must_use]
    pub fn backend(mut self, backend: Arc<dyn PubSubBackend>) -> Self {
        self.backend = Some(backend);
        self
    }

    /// Set the session configuration.
    #[must_use]
    pub fn config(mut self, config: GatewayConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Build the gateway.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Configuration`] if the backend or config is
    /// missing.
    pub fn build(self) -> Result<PublishGateway, GatewayError> {
        let backend = self
            .backend
            .ok_or_else(|| GatewayError::Configuration("backend is required".into()))?;
        let config = self
            .config
            .ok_or_else(|| GatewayError::Configuration("gateway config is required".into()))?;
        Ok(PublishGateway::new(backend, config))
    }
}
