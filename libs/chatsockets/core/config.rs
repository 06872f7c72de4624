use crate::traits::ReconnectPolicy;
use std::time::Duration;

/// Configuration for one run of a [`SocketClient`](crate::SocketClient)
///
/// The URL usually embeds credentials in its query string, so logging
/// goes through [`endpoint`](Self::endpoint) instead.
#[derive(Debug, Clone)]
pub struct SocketConfig {
    /// WebSocket URL (wss:// or ws://), including query parameters
    pub(crate) url: String,

    /// What to do after an unexpected drop
    pub(crate) reconnect: ReconnectPolicy,

    /// How often the dispatch thread wakes up to check for shutdown
    pub(crate) dispatch_poll: Duration,
}

impl SocketConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            reconnect: ReconnectPolicy::default(),
            dispatch_poll: Duration::from_millis(50),
        }
    }

    pub fn reconnect(mut self, policy: ReconnectPolicy) -> Self {
        self.reconnect = policy;
        self
    }

    pub fn dispatch_poll(mut self, interval: Duration) -> Self {
        self.dispatch_poll = interval;
        self
    }

    /// Get a reference to the full URL
    pub fn url(&self) -> &str {
        &self.url
    }

    /// URL without its query string
    pub fn endpoint(&self) -> &str {
        self.url.split('?').next().unwrap_or(&self.url)
    }

    pub fn reconnect_policy(&self) -> &ReconnectPolicy {
        &self.reconnect
    }
}
