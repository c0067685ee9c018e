use std::time::Duration;

/// Configuration for the shared filer transport
#[derive(Debug, Clone)]
pub struct FilerConfig {
    /// TCP connect timeout for new connections
    pub connect_timeout: Duration,

    /// Optional deadline for a whole request, body included
    ///
    /// Off by default: streamed transfers of large blobs have no sensible
    /// fixed deadline. Set it for small-payload workloads.
    pub request_timeout: Option<Duration>,

    /// User agent presented to the store
    pub user_agent: String,

    /// Bound of progress channels created by convenience constructors
    pub progress_capacity: usize,
}

impl Default for FilerConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            request_timeout: None,
            user_agent: concat!("seaweed-filer/", env!("CARGO_PKG_VERSION")).to_string(),
            progress_capacity: crate::progress::DEFAULT_PROGRESS_CAPACITY,
        }
    }
}

impl FilerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    pub fn with_user_agent<S: Into<String>>(mut self, user_agent: S) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn with_progress_capacity(mut self, capacity: usize) -> Self {
        self.progress_capacity = capacity;
        self
    }
}
