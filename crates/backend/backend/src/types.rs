use std::collections::HashMap;
use std::fmt;

use bytes::Bytes;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

/// Scopes used when the caller does not request any: full platform access
/// plus the messaging-specific scope.
pub const DEFAULT_SCOPES: [&str; 2] = [
    "https://www.googleapis.com/auth/cloud-platform",
    "https://www.googleapis.com/auth/pubsub",
];

/// Backend-assigned identifier of a published message.
pub type MessageId = String;

/// An ordered, non-empty list of authorization scopes.
///
/// An empty request is replaced by [`DEFAULT_SCOPES`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct Scopes(Vec<String>);

impl Scopes {
    /// Build a scope list, substituting the defaults when `scopes` is empty.
    pub fn new<I, S>(scopes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let scopes: Vec<String> = scopes.into_iter().map(Into::into).collect();
        if scopes.is_empty() {
            Self::default()
        } else {
            Self(scopes)
        }
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    /// Returns `true` when these are exactly the default scopes.
    pub fn is_default(&self) -> bool {
        self.0.iter().map(String::as_str).eq(DEFAULT_SCOPES)
    }
}

impl Default for Scopes {
    fn default() -> Self {
        Self(DEFAULT_SCOPES.iter().map(|s| (*s).to_owned()).collect())
    }
}

impl From<Vec<String>> for Scopes {
    fn from(scopes: Vec<String>) -> Self {
        Self::new(scopes)
    }
}

impl From<Scopes> for Vec<String> {
    fn from(scopes: Scopes) -> Self {
        scopes.0
    }
}

/// A service-account identity used for the JWT bearer flow.
#[derive(Clone)]
pub struct ServiceAccountKey {
    email: String,
    private_key: SecretString,
}

impl ServiceAccountKey {
    /// Create a key from the account email and its PEM-encoded private key.
    pub fn new(email: impl Into<String>, private_key: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            private_key: SecretString::new(private_key.into()),
        }
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    /// The PEM-encoded private key.
    pub fn private_key(&self) -> &str {
        self.private_key.expose_secret()
    }
}

impl fmt::Debug for ServiceAccountKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceAccountKey")
            .field("email", &self.email)
            .field("private_key", &"[REDACTED]")
            .finish()
    }
}

/// How a session authenticates against the backend.
#[derive(Debug, Clone)]
pub enum Credentials {
    /// Credentials discovered from the execution environment.
    Ambient,
    /// An explicit service-account identity.
    ServiceAccount(ServiceAccountKey),
}

impl Credentials {
    /// Short label used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Ambient => "ambient",
            Self::ServiceAccount(_) => "service_account",
        }
    }
}

/// A topic on the backend, identified by project and short name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Topic {
    project: String,
    name: String,
}

impl Topic {
    pub fn new(project: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            project: project.into(),
            name: name.into(),
        }
    }

    /// Parse a fully-qualified `projects/{project}/topics/{name}` path.
    pub fn from_path(path: &str) -> Option<Self> {
        let rest = path.strip_prefix("projects/")?;
        let (project, name) = rest.split_once("/topics/")?;
        if project.is_empty() || name.is_empty() || project.contains('/') {
            return None;
        }
        Some(Self::new(project, name))
    }

    pub fn project(&self) -> &str {
        &self.project
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The fully-qualified topic path.
    pub fn path(&self) -> String {
        format!("projects/{}/topics/{}", self.project, self.name)
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "projects/{}/topics/{}", self.project, self.name)
    }
}

/// A message payload plus optional attributes. Never inspected by pubgate.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Message {
    pub data: Bytes,
    pub attributes: HashMap<String, String>,
    pub ordering_key: Option<String>,
}

impl Message {
    pub fn new(data: impl Into<Bytes>) -> Self {
        Self {
            data: data.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub fn with_ordering_key(mut self, key: impl Into<String>) -> Self {
        self.ordering_key = Some(key.into());
        self
    }
}

/// One page of a topic enumeration.
#[derive(Debug, Clone, Default)]
pub struct TopicPage {
    pub topics: Vec<Topic>,
    /// Token for the following page; `None` once enumeration is done.
    pub next_page_token: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_scopes_use_defaults() {
        let scopes = Scopes::new(Vec::<String>::new());
        assert_eq!(scopes.as_slice().len(), 2);
        assert_eq!(scopes.as_slice()[0], DEFAULT_SCOPES[0]);
        assert_eq!(scopes.as_slice()[1], DEFAULT_SCOPES[1]);
        assert!(scopes.is_default());
    }

    #[test]
    fn explicit_scopes_are_kept_in_order() {
        let scopes = Scopes::new(["b", "a"]);
        assert_eq!(scopes.as_slice(), ["b".to_owned(), "a".to_owned()]);
        assert!(!scopes.is_default());
    }

    #[test]
    fn scopes_deserialize_empty_list_to_defaults() {
        let scopes: Scopes = serde_json::from_str("[]").unwrap();
        assert!(scopes.is_default());
    }

    #[test]
    fn topic_path_parsing() {
        let topic = Topic::new("proj", "events");
        assert_eq!(topic.path(), "projects/proj/topics/events");
        assert_eq!(topic.to_string(), topic.path());
        assert_eq!(Topic::from_path("projects/proj/topics/events"), Some(topic));
        assert!(Topic::from_path("projects//topics/events").is_none());
        assert!(Topic::from_path("topics/events").is_none());
        assert!(Topic::from_path("projects/proj/topics/").is_none());
    }

    #[test]
    fn message_builder() {
        let msg = Message::new("hello")
            .with_attribute("source", "sensor")
            .with_ordering_key("device-1");
        assert_eq!(msg.data, Bytes::from_static(b"hello"));
        assert_eq!(msg.attributes.get("source").map(String::as_str), Some("sensor"));
        assert_eq!(msg.ordering_key.as_deref(), Some("device-1"));
    }
}
