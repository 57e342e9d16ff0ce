use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use dashmap::DashMap;
use tracing::debug;

use pubgate_backend::{
    BackendError, BackendSession, ConnectRequest, Credentials, Message, MessageId, PubSubBackend,
    Topic, TopicPage,
};

use crate::faults::Faults;
use crate::validate;

const DEFAULT_PAGE_SIZE: usize = 100;

/// A single topic held by the in-memory backend.
#[derive(Debug)]
struct TopicRecord {
    topic: Topic,
    /// Creation order, used to report topics in a stable order.
    seq: u64,
    messages: Vec<(MessageId, Message)>,
}

/// Call counters recorded by a [`MemoryBackend`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MemoryStats {
    pub connect_calls: usize,
    pub get_topic_calls: usize,
    pub create_topic_calls: usize,
    /// Successful creations only.
    pub topics_created: usize,
    pub list_calls: usize,
    pub publish_calls: usize,
}

#[derive(Debug, Default)]
struct Counters {
    connect_calls: AtomicUsize,
    get_topic_calls: AtomicUsize,
    create_topic_calls: AtomicUsize,
    topics_created: AtomicUsize,
    list_calls: AtomicUsize,
    publish_calls: AtomicUsize,
}

#[derive(Debug)]
struct Inner {
    topics: DashMap<String, TopicRecord>,
    next_seq: AtomicU64,
    next_message_id: AtomicU64,
    page_size: usize,
    faults: Mutex<Faults>,
    connects: Mutex<Vec<ConnectRequest>>,
    counters: Counters,
}

/// In-memory [`PubSubBackend`] backed by a [`DashMap`].
///
/// Cloning yields another handle to the same backend, so a test can keep one
/// handle for inspection while the gateway owns another. Topics from every
/// project live in one map keyed by their fully-qualified path.
#[derive(Debug, Clone)]
pub struct MemoryBackend {
    inner: Arc<Inner>,
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryBackend {
    /// Create a new, empty in-memory backend.
    pub fn new() -> Self {
        Self::with_page_size(DEFAULT_PAGE_SIZE)
    }

    /// Create a backend that returns at most `page_size` topics per page.
    pub fn with_page_size(page_size: usize) -> Self {
        Self {
            inner: Arc::new(Inner {
                topics: DashMap::new(),
                next_seq: AtomicU64::new(0),
                next_message_id: AtomicU64::new(1),
                page_size: page_size.max(1),
                faults: Mutex::new(Faults::default()),
                connects: Mutex::new(Vec::new()),
                counters: Counters::default(),
            }),
        }
    }

    /// Replace the injected faults.
    pub fn set_faults(&self, faults: Faults) {
        *self
            .inner
            .faults
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = faults;
    }

    /// Remove every injected fault.
    pub fn clear_faults(&self) {
        self.set_faults(Faults::default());
    }

    /// Create a topic directly, bypassing sessions and counters.
    ///
    /// # Errors
    ///
    /// Returns an error if the name is invalid or the topic already exists.
    pub fn seed_topic(&self, project_id: &str, name: &str) -> Result<Topic, BackendError> {
        self.inner.insert_topic(&Topic::new(project_id, name))
    }

    /// Snapshot of the call counters.
    pub fn stats(&self) -> MemoryStats {
        let c = &self.inner.counters;
        MemoryStats {
            connect_calls: c.connect_calls.load(Ordering::SeqCst),
            get_topic_calls: c.get_topic_calls.load(Ordering::SeqCst),
            create_topic_calls: c.create_topic_calls.load(Ordering::SeqCst),
            topics_created: c.topics_created.load(Ordering::SeqCst),
            list_calls: c.list_calls.load(Ordering::SeqCst),
            publish_calls: c.publish_calls.load(Ordering::SeqCst),
        }
    }

    /// Every connect request received, in arrival order.
    pub fn connect_requests(&self) -> Vec<ConnectRequest> {
        self.inner
            .connects
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Messages stored on `topic`, in publish order.
    pub fn messages(&self, topic: &Topic) -> Vec<Message> {
        self.inner
            .topics
            .get(&topic.path())
            .map(|record| record.messages.iter().map(|(_, m)| m.clone()).collect())
            .unwrap_or_default()
    }

    /// Returns `true` if the topic exists.
    pub fn has_topic(&self, topic: &Topic) -> bool {
        self.inner.topics.contains_key(&topic.path())
    }
}

impl Inner {
    fn faults(&self) -> Faults {
        self.faults
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn insert_topic(&self, topic: &Topic) -> Result<Topic, BackendError> {
        validate::topic_name(topic.name())?;

        // Use `entry` API for atomicity: only insert if vacant.
        match self.topics.entry(topic.path()) {
            dashmap::mapref::entry::Entry::Occupied(_) => Err(BackendError::AlreadyExists(
                format!("topic already exists: {topic}"),
            )),
            dashmap::mapref::entry::Entry::Vacant(vacant) => {
                vacant.insert(TopicRecord {
                    topic: topic.clone(),
                    seq: self.next_seq.fetch_add(1, Ordering::SeqCst),
                    messages: Vec::new(),
                });
                Ok(topic.clone())
            }
        }
    }

    /// Topics of one project in creation order.
    fn project_topics(&self, project_id: &str) -> Vec<Topic> {
        let mut topics: Vec<(u64, Topic)> = self
            .topics
            .iter()
            .filter(|entry| entry.topic.project() == project_id)
            .map(|entry| (entry.seq, entry.topic.clone()))
            .collect();
        topics.sort_by_key(|(seq, _)| *seq);
        topics.into_iter().map(|(_, topic)| topic).collect()
    }
}

fn check_credentials(credentials: &Credentials) -> Result<(), BackendError> {
    match credentials {
        Credentials::Ambient => Ok(()),
        Credentials::ServiceAccount(key) => {
            if !key.email().contains('@') {
                return Err(BackendError::InvalidCredentials(format!(
                    "malformed service account email '{}'",
                    key.email()
                )));
            }
            if !key.private_key().contains("PRIVATE KEY") {
                return Err(BackendError::InvalidCredentials(
                    "private key is not PEM encoded".to_owned(),
                ));
            }
            Ok(())
        }
    }
}

#[async_trait]
impl PubSubBackend for MemoryBackend {
    #[allow(clippy::unnecessary_literal_bound)]
    fn name(&self) -> &str {
        "memory"
    }

    async fn connect(
        &self,
        request: &ConnectRequest,
    ) -> Result<Arc<dyn BackendSession>, BackendError> {
        self.inner
            .counters
            .connect_calls
            .fetch_add(1, Ordering::SeqCst);
        self.inner
            .connects
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(request.clone());

        let faults = self.inner.faults();
        if let Some(delay) = faults.connect_delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(err) = faults.connect {
            return Err(err);
        }
        if request.project_id.is_empty() {
            return Err(BackendError::InvalidArgument(
                "project id must not be empty".to_owned(),
            ));
        }
        check_credentials(&request.credentials)?;

        debug!(project = %request.project_id, "memory session opened");
        Ok(Arc::new(MemorySession {
            inner: Arc::clone(&self.inner),
        }))
    }
}

/// Session handed out by [`MemoryBackend::connect`].
#[derive(Debug)]
struct MemorySession {
    inner: Arc<Inner>,
}

#[async_trait]
impl BackendSession for MemorySession {
    async fn get_topic(&self, topic: &Topic) -> Result<Option<Topic>, BackendError> {
        self.inner
            .counters
            .get_topic_calls
            .fetch_add(1, Ordering::SeqCst);
        if let Some(err) = self.inner.faults().get_topic {
            return Err(err);
        }
        Ok(self
            .inner
            .topics
            .get(&topic.path())
            .map(|record| record.topic.clone()))
    }

    async fn create_topic(&self, topic: &Topic) -> Result<Topic, BackendError> {
        self.inner
            .counters
            .create_topic_calls
            .fetch_add(1, Ordering::SeqCst);
        if let Some(err) = self.inner.faults().create_topic {
            return Err(err);
        }
        let created = self.inner.insert_topic(topic)?;
        self.inner
            .counters
            .topics_created
            .fetch_add(1, Ordering::SeqCst);
        Ok(created)
    }

    async fn list_topics(
        &self,
        project_id: &str,
        page_token: Option<&str>,
    ) -> Result<TopicPage, BackendError> {
        self.inner.counters.list_calls.fetch_add(1, Ordering::SeqCst);

        let offset = match page_token {
            None => 0,
            Some(token) => token.parse::<usize>().map_err(|_| {
                BackendError::InvalidArgument(format!("invalid page token '{token}'"))
            })?,
        };
        let page_size = self.inner.page_size;

        if let Some((pages, err)) = self.inner.faults().list_after_pages
            && offset / page_size >= pages
        {
            return Err(err);
        }

        let all = self.inner.project_topics(project_id);
        if offset > all.len() {
            return Err(BackendError::InvalidArgument(format!(
                "page token '{offset}' is past the end of the listing"
            )));
        }
        let end = offset.saturating_add(page_size).min(all.len());
        let topics = all.get(offset..end).map(<[Topic]>::to_vec).unwrap_or_default();
        let next_page_token = (end < all.len()).then(|| end.to_string());

        Ok(TopicPage {
            topics,
            next_page_token,
        })
    }

    async fn publish(
        &self,
        topic: &Topic,
        messages: &[Message],
    ) -> Result<Vec<MessageId>, BackendError> {
        self.inner
            .counters
            .publish_calls
            .fetch_add(1, Ordering::SeqCst);
        if let Some(err) = self.inner.faults().publish {
            return Err(err);
        }
        validate::batch(messages)?;

        let Some(mut record) = self.inner.topics.get_mut(&topic.path()) else {
            return Err(BackendError::NotFound(format!("topic not found: {topic}")));
        };

        let ids: Vec<MessageId> = messages
            .iter()
            .map(|_| {
                self.inner
                    .next_message_id
                    .fetch_add(1, Ordering::SeqCst)
                    .to_string()
            })
            .collect();
        record.messages.extend(ids.iter().cloned().zip(messages.iter().cloned()));
        Ok(ids)
    }
}
