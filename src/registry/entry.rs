//! Per-stream registry state

use std::time::Instant;

use crate::broadcast::{Broadcast, StreamInfo};

use super::rate::RateEstimator;

/// State of a stream entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamState {
    /// Stream has an active publisher
    Active,
    /// Publisher disconnected, within grace period
    GracePeriod,
    /// No publisher, waiting for cleanup
    Idle,
}

/// Entry for a single stream in the registry
pub struct StreamEntry {
    /// The relay engine; shared by the publisher's reconnects
    pub(super) broadcast: Broadcast,

    /// Current publisher's session ID (None if no publisher)
    pub publisher_id: Option<u64>,

    /// Current stream state
    pub state: StreamState,

    /// When the stream was created
    pub created_at: Instant,

    /// When the publisher disconnected (for grace period tracking)
    pub publisher_disconnected_at: Option<Instant>,

    /// Ingest byte-rate estimate
    pub(super) rate: RateEstimator,
}

impl StreamEntry {
    pub(super) fn new() -> Self {
        Self {
            broadcast: Broadcast::new(),
            publisher_id: None,
            state: StreamState::Idle,
            created_at: Instant::now(),
            publisher_disconnected_at: None,
            rate: RateEstimator::new(),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.broadcast.subscriber_count()
    }

    pub fn has_publisher(&self) -> bool {
        self.publisher_id.is_some()
    }

    pub(super) fn stats(&self) -> StreamStats {
        StreamStats {
            subscriber_count: self.subscriber_count(),
            has_publisher: self.has_publisher(),
            state: self.state,
            info: *self.broadcast.info(),
            ingest_rate_mean: self.rate.mean(),
            ingest_rate_std_dev: self.rate.std_dev(),
        }
    }
}

/// Statistics for a stream
#[derive(Debug, Clone)]
pub struct StreamStats {
    /// Number of active subscribers
    pub subscriber_count: usize,
    /// Whether the stream has an active publisher
    pub has_publisher: bool,
    /// Current stream state
    pub state: StreamState,
    /// Track metadata of the current segment
    pub info: StreamInfo,
    /// Smoothed ingest rate, bytes per cleanup interval
    pub ingest_rate_mean: f64,
    /// Deviation of the ingest rate
    pub ingest_rate_std_dev: f64,
}
