//! Google Cloud Pub/Sub backend for pubgate.
//!
//! - [`auth`] turns a [`ConnectRequest`](pubgate_backend::ConnectRequest)'s
//!   credential selection into Google credentials (service-account JWT or
//!   Application Default Credentials), scoped as requested.
//! - [`pubsub`] (`pubsub` feature) implements
//!   [`PubSubBackend`](pubgate_backend::PubSubBackend) on top of the
//!   `google-cloud-pubsub` topic admin and publisher clients.

pub mod auth;
pub mod error;

#[cfg(feature = "pubsub")]
pub mod pubsub;

pub use error::GcpBackendError;

#[cfg(feature = "pubsub")]
pub use pubsub::GcpBackend;
