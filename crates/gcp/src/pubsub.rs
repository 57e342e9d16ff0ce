use std::sync::Arc;

use async_trait::async_trait;
use google_cloud_auth::credentials::Credentials;
use google_cloud_pubsub::client::{Publisher, TopicAdmin};
use pubgate_backend::{
    BackendError, BackendSession, ConnectRequest, Message, MessageId, PubSubBackend, Topic,
    TopicPage,
};
use tracing::{debug, info, instrument};

use crate::auth::build_gcp_credentials;
use crate::error::{GcpBackendError, classify_client_error};

/// Google Cloud Pub/Sub backend.
///
/// Every [`connect`](PubSubBackend::connect) resolves credentials and builds a
/// topic admin client bound to the requested project.
#[derive(Debug, Default, Clone, Copy)]
pub struct GcpBackend;

impl GcpBackend {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl PubSubBackend for GcpBackend {
    #[allow(clippy::unnecessary_literal_bound)]
    fn name(&self) -> &str {
        "gcp-pubsub"
    }

    #[instrument(skip(self, request), fields(project = %request.project_id, backend = "gcp-pubsub"))]
    async fn connect(
        &self,
        request: &ConnectRequest,
    ) -> Result<Arc<dyn BackendSession>, BackendError> {
        if request.project_id.is_empty() {
            return Err(BackendError::InvalidArgument(
                "project id must not be empty".to_owned(),
            ));
        }

        let credentials = build_gcp_credentials(request)?;

        let mut builder = TopicAdmin::builder().with_credentials(credentials.clone());
        if let Some(ref endpoint) = request.endpoint_url {
            debug!(endpoint = %endpoint, "using custom Pub/Sub endpoint");
            builder = builder.with_endpoint(endpoint);
        }
        let admin = builder.build().await.map_err(|e| {
            BackendError::from(GcpBackendError::Connection(format!(
                "Pub/Sub topic admin error: {e}"
            )))
        })?;

        info!("Pub/Sub session opened");
        Ok(Arc::new(GcpSession {
            admin,
            credentials,
            endpoint_url: request.endpoint_url.clone(),
        }))
    }
}

/// An authenticated Pub/Sub connection for one project.
struct GcpSession {
    admin: TopicAdmin,
    credentials: Credentials,
    endpoint_url: Option<String>,
}

impl std::fmt::Debug for GcpSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GcpSession")
            .field("endpoint_url", &self.endpoint_url)
            .finish_non_exhaustive()
    }
}

impl GcpSession {
    /// Build a [`Publisher`] for the given fully-qualified topic path.
    async fn build_publisher(&self, topic_path: &str) -> Result<Publisher, BackendError> {
        let mut builder = Publisher::builder(topic_path);
        if let Some(ref endpoint) = self.endpoint_url {
            builder = builder.with_endpoint(endpoint);
        }
        builder = builder.with_credentials(self.credentials.clone());

        builder.build().await.map_err(|e| {
            BackendError::from(GcpBackendError::Connection(format!(
                "Pub/Sub publisher error: {e}"
            )))
        })
    }

    /// Build a [`google_cloud_pubsub::model::Message`] from a pubgate message.
    fn build_message(message: &Message) -> google_cloud_pubsub::model::Message {
        let mut msg = google_cloud_pubsub::model::Message::new().set_data(message.data.clone());
        if !message.attributes.is_empty() {
            msg = msg.set_attributes(
                message
                    .attributes
                    .iter()
                    .map(|(k, v)| (k.clone(), v.clone())),
            );
        }
        if let Some(ref key) = message.ordering_key {
            msg = msg.set_ordering_key(key);
        }
        msg
    }
}

fn classify(err: &google_cloud_pubsub::Error) -> BackendError {
    classify_client_error(err).into()
}

#[async_trait]
impl BackendSession for GcpSession {
    #[instrument(skip(self), fields(topic = %topic))]
    async fn get_topic(&self, topic: &Topic) -> Result<Option<Topic>, BackendError> {
        match self.admin.get_topic().set_topic(topic.path()).send().await {
            Ok(found) => Ok(Some(
                Topic::from_path(&found.name).unwrap_or_else(|| topic.clone()),
            )),
            Err(e) => match classify(&e) {
                BackendError::NotFound(_) => Ok(None),
                other => Err(other),
            },
        }
    }

    #[instrument(skip(self), fields(topic = %topic))]
    async fn create_topic(&self, topic: &Topic) -> Result<Topic, BackendError> {
        let created = self
            .admin
            .create_topic()
            .set_name(topic.path())
            .send()
            .await
            .map_err(|e| classify(&e))?;
        Ok(Topic::from_path(&created.name).unwrap_or_else(|| topic.clone()))
    }

    #[instrument(skip(self))]
    async fn list_topics(
        &self,
        project_id: &str,
        page_token: Option<&str>,
    ) -> Result<TopicPage, BackendError> {
        let mut request = self
            .admin
            .list_topics()
            .set_project(format!("projects/{project_id}"));
        if let Some(token) = page_token {
            request = request.set_page_token(token);
        }
        let response = request.send().await.map_err(|e| classify(&e))?;

        let topics = response
            .topics
            .iter()
            .filter_map(|t| Topic::from_path(&t.name))
            .collect();
        let next_page_token =
            (!response.next_page_token.is_empty()).then_some(response.next_page_token);
        Ok(TopicPage {
            topics,
            next_page_token,
        })
    }

    #[instrument(skip(self, messages), fields(topic = %topic, count = messages.len()))]
    async fn publish(
        &self,
        topic: &Topic,
        messages: &[Message],
    ) -> Result<Vec<MessageId>, BackendError> {
        if messages.is_empty() {
            return Ok(Vec::new());
        }
        let publisher = self.build_publisher(&topic.path()).await?;

        let publish_futures: Vec<_> = messages
            .iter()
            .map(|m| publisher.publish(Self::build_message(m)))
            .collect();

        // Flush so the whole batch goes out before we wait on acknowledgments.
        publisher.flush().await;

        let mut message_ids = Vec::with_capacity(publish_futures.len());
        let mut first_error: Option<BackendError> = None;
        for future in publish_futures {
            match future.await {
                Ok(id) => message_ids.push(id),
                Err(e) => {
                    first_error.get_or_insert_with(|| classify(&e));
                }
            }
        }
        if let Some(err) = first_error {
            return Err(err);
        }

        debug!(count = message_ids.len(), "batch acknowledged by Pub/Sub");
        Ok(message_ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_message_with_data() {
        let msg = GcpSession::build_message(&Message::new("hello"));
        assert_eq!(msg.data, bytes::Bytes::from_static(b"hello"));
    }

    #[test]
    fn build_message_with_attributes() {
        let source = Message::new("data")
            .with_attribute("key", "value")
            .with_ordering_key("ordering-key");
        let msg = GcpSession::build_message(&source);
        assert_eq!(msg.attributes.get("key").unwrap(), "value");
        assert_eq!(msg.ordering_key, "ordering-key");
    }

    #[tokio::test]
    async fn connect_rejects_empty_project() {
        let result = GcpBackend::new().connect(&ConnectRequest::new("")).await;
        assert!(matches!(result, Err(BackendError::InvalidArgument(_))));
    }
}
