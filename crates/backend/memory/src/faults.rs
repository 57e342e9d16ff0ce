use std::time::Duration;

use pubgate_backend::BackendError;

/// Failures and delays injected into a [`MemoryBackend`](crate::MemoryBackend).
///
/// Every injected error is returned on each matching call until cleared.
#[derive(Debug, Clone, Default)]
pub struct Faults {
    /// Returned by `connect`.
    pub connect: Option<BackendError>,
    /// Returned by `get_topic`.
    pub get_topic: Option<BackendError>,
    /// Returned by `create_topic`.
    pub create_topic: Option<BackendError>,
    /// Returned by `publish`.
    pub publish: Option<BackendError>,
    /// Returned by `list_topics` for every page after the first `n` pages.
    pub list_after_pages: Option<(usize, BackendError)>,
    /// Time `connect` takes before answering.
    pub connect_delay: Option<Duration>,
}

impl Faults {
    #[must_use]
    pub fn connect(mut self, err: BackendError) -> Self {
        self.connect = Some(err);
        self
    }

    #[must_use]
    pub fn get_topic(mut self, err: BackendError) -> Self {
        self.get_topic = Some(err);
        self
    }

    #[must_use]
    pub fn create_topic(mut self, err: BackendError) -> Self {
        self.create_topic = Some(err);
        self
    }

    #[must_use]
    pub fn publish(mut self, err: BackendError) -> Self {
        self.publish = Some(err);
        self
    }

    #[must_use]
    pub fn list_after_pages(mut self, pages: usize, err: BackendError) -> Self {
        self.list_after_pages = Some((pages, err));
        self
    }

    #[must_use]
    pub fn connect_delay(mut self, delay: Duration) -> Self {
        self.connect_delay = Some(delay);
        self
    }
}
