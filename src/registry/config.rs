//! Registry configuration

use std::time::Duration;

/// Configuration options for [`super::StreamRegistry`]
#[derive(Debug, Clone)]
pub struct RegistryConfig {
    /// How long a stream survives after its publisher disconnects while
    /// subscribers remain, waiting for the publisher to reconnect
    pub publisher_grace_period: Duration,

    /// How long a stream without publisher and subscribers is kept
    pub idle_stream_timeout: Duration,

    /// How often the cleanup task runs
    pub cleanup_interval: Duration,

    /// Per-subscriber queue depth, in chunks; a full queue refuses writes
    pub subscriber_queue_capacity: usize,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            publisher_grace_period: Duration::from_secs(10),
            idle_stream_timeout: Duration::from_secs(60),
            cleanup_interval: Duration::from_secs(5),
            subscriber_queue_capacity: 64,
        }
    }
}

impl RegistryConfig {
    /// Set the publisher grace period
    pub fn publisher_grace_period(mut self, period: Duration) -> Self {
        self.publisher_grace_period = period;
        self
    }

    /// Set the idle stream timeout
    pub fn idle_stream_timeout(mut self, timeout: Duration) -> Self {
        self.idle_stream_timeout = timeout;
        self
    }

    /// Set the cleanup interval
    pub fn cleanup_interval(mut self, interval: Duration) -> Self {
        self.cleanup_interval = interval;
        self
    }

    /// Set the subscriber queue capacity
    pub fn subscriber_queue_capacity(mut self, capacity: usize) -> Self {
        self.subscriber_queue_capacity = capacity;
        self
    }
}
