//! Topic-idempotent publishing to a managed publish/subscribe service.
//!
//! A [`PublishGateway`] lazily opens one authenticated [`Session`] (service
//! account JWT or ambient default credentials) and publishes batches to named
//! topics, creating a topic the first time it is missing. Sessions can also
//! be established and passed around explicitly with [`establish_session`].
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use pubgate_gateway::{GatewayConfig, Message, PublishGateway};
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example(backend: Arc<dyn pubgate_gateway::PubSubBackend>) -> Result<(), pubgate_gateway::GatewayError> {
//! let gateway = PublishGateway::new(backend, GatewayConfig::new("my-project"));
//! let cancel = CancellationToken::new();
//! gateway
//!     .publish("events", &[Message::new("hello")], &cancel)
//!     .await?;
//! # Ok(())
//! # }
//! ```

mod cancel;
pub mod config;
pub mod error;
pub mod gateway;
pub mod session;
pub mod telemetry;

pub use config::{CredentialsConfig, GatewayConfig};
pub use error::GatewayError;
pub use gateway::{PublishGateway, PublishGatewayBuilder};
pub use session::{Session, establish_session};

pub use pubgate_backend::{
    BackendError, Credentials, DEFAULT_SCOPES, Message, MessageId, PubSubBackend, Scopes, Topic,
};
