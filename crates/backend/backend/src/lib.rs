pub mod backend;
pub mod error;
pub mod testing;
pub mod types;

pub use backend::{BackendSession, ConnectRequest, PubSubBackend};
pub use error::BackendError;
pub use types::{
    Credentials, DEFAULT_SCOPES, Message, MessageId, Scopes, ServiceAccountKey, Topic, TopicPage,
};
