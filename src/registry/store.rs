//! Stream registry implementation
//!
//! The central registry that manages all active broadcasts and routes
//! producer bytes to their subscribers.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use bytes::Bytes;
use tokio::sync::{mpsc, Mutex, RwLock};

use crate::broadcast::SubscriberId;

use super::config::RegistryConfig;
use super::entry::{StreamEntry, StreamState, StreamStats};
use super::error::RegistryError;
use super::sink::ChannelSink;

/// Central registry for all active streams
///
/// Thread-safe via `RwLock`. Read-heavy workloads (existence checks,
/// per-stream routing) benefit from the concurrent read access; each
/// stream's engine is serialized by its own entry lock, satisfying the
/// `Broadcast` single-owner contract.
pub struct StreamRegistry {
    /// Map of stream name to stream entry
    streams: RwLock<HashMap<String, Arc<Mutex<StreamEntry>>>>,

    /// Configuration
    config: RegistryConfig,
}

impl StreamRegistry {
    /// Create a new stream registry with default configuration
    pub fn new() -> Self {
        Self::with_config(RegistryConfig::default())
    }

    /// Create a new stream registry with custom configuration
    pub fn with_config(config: RegistryConfig) -> Self {
        Self {
            streams: RwLock::new(HashMap::new()),
            config,
        }
    }

    /// Get the registry configuration
    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    /// Register a publisher for a stream
    ///
    /// If the stream doesn't exist, it is created. If it exists and is in
    /// grace period, the publisher reclaims it and attached subscribers
    /// keep playing. Returns an error if the stream already has an active
    /// publisher.
    pub async fn register_publisher(
        &self,
        name: &str,
        session_id: u64,
    ) -> Result<(), RegistryError> {
        let mut streams = self.streams.write().await;

        if let Some(entry_arc) = streams.get(name) {
            let mut entry = entry_arc.lock().await;

            if entry.state == StreamState::Active && entry.publisher_id.is_some() {
                return Err(RegistryError::StreamAlreadyPublishing(name.to_string()));
            }

            entry.publisher_id = Some(session_id);
            entry.publisher_disconnected_at = None;
            entry.state = StreamState::Active;

            tracing::info!(
                stream = %name,
                session_id,
                subscribers = entry.subscriber_count(),
                "Publisher registered (existing stream)"
            );
        } else {
            let mut entry = StreamEntry::new();
            entry.publisher_id = Some(session_id);
            entry.state = StreamState::Active;

            streams.insert(name.to_string(), Arc::new(Mutex::new(entry)));

            tracing::info!(stream = %name, session_id, "Publisher registered (new stream)");
        }

        Ok(())
    }

    /// Unregister a publisher from a stream
    ///
    /// The stream enters grace period if there are active subscribers,
    /// allowing the publisher to reconnect and resume with a fresh
    /// segment; otherwise it goes idle.
    pub async fn unregister_publisher(&self, name: &str, session_id: u64) {
        let streams = self.streams.read().await;

        if let Some(entry_arc) = streams.get(name) {
            let mut entry = entry_arc.lock().await;

            if entry.publisher_id != Some(session_id) {
                tracing::warn!(
                    stream = %name,
                    expected = ?entry.publisher_id,
                    actual = session_id,
                    "Publisher unregister mismatch"
                );
                return;
            }

            entry.publisher_id = None;
            entry.publisher_disconnected_at = Some(Instant::now());

            if entry.subscriber_count() > 0 {
                entry.state = StreamState::GracePeriod;
                tracing::info!(
                    stream = %name,
                    session_id,
                    subscribers = entry.subscriber_count(),
                    grace_period_secs = self.config.publisher_grace_period.as_secs(),
                    "Publisher disconnected, entering grace period"
                );
            } else {
                entry.state = StreamState::Idle;
                tracing::info!(
                    stream = %name,
                    session_id,
                    "Publisher disconnected, no subscribers"
                );
            }
        }
    }

    /// Feed producer bytes into a stream
    ///
    /// A fatal [`BroadcastError`](crate::error::BroadcastError) is
    /// surfaced as `RegistryError::Broadcast`; the caller should close the
    /// producer connection and unregister.
    pub async fn send(
        &self,
        name: &str,
        session_id: u64,
        data: &[u8],
    ) -> Result<(), RegistryError> {
        let streams = self.streams.read().await;

        let entry_arc = streams
            .get(name)
            .ok_or_else(|| RegistryError::StreamNotFound(name.to_string()))?;
        let mut entry = entry_arc.lock().await;

        if entry.publisher_id != Some(session_id) {
            return Err(RegistryError::PublisherMismatch);
        }

        entry.rate.push(data.len());
        entry.broadcast.send(data)?;
        Ok(())
    }

    /// Subscribe to a stream
    ///
    /// Returns the subscriber id and a bounded queue of relayed chunks.
    /// Captured headers are replayed into the queue before this returns,
    /// unless `skip_headers` is set (a reconnecting consumer that already
    /// holds the `EBML` header; the segment prefix is still replayed).
    pub async fn subscribe(
        &self,
        name: &str,
        skip_headers: bool,
    ) -> Result<(SubscriberId, mpsc::Receiver<Bytes>), RegistryError> {
        let streams = self.streams.read().await;

        let entry_arc = streams
            .get(name)
            .ok_or_else(|| RegistryError::StreamNotFound(name.to_string()))?;
        let mut entry = entry_arc.lock().await;

        // Subscribing during grace period is fine; the publisher may return.
        if entry.state == StreamState::Idle && entry.publisher_id.is_none() {
            return Err(RegistryError::StreamNotActive(name.to_string()));
        }

        let (tx, rx) = mpsc::channel(self.config.subscriber_queue_capacity);
        let id = entry
            .broadcast
            .connect(Box::new(ChannelSink::new(tx)), skip_headers);

        tracing::info!(
            stream = %name,
            subscriber = %id,
            subscribers = entry.subscriber_count(),
            "Subscriber added"
        );

        Ok((id, rx))
    }

    /// Unsubscribe from a stream. A no-op for unknown streams or ids.
    pub async fn unsubscribe(&self, name: &str, id: SubscriberId) {
        let streams = self.streams.read().await;

        if let Some(entry_arc) = streams.get(name) {
            let mut entry = entry_arc.lock().await;
            entry.broadcast.disconnect(id);

            tracing::debug!(
                stream = %name,
                subscriber = %id,
                subscribers = entry.subscriber_count(),
                "Subscriber removed"
            );
        }
    }

    /// Check if a stream exists and has an active publisher
    pub async fn has_active_stream(&self, name: &str) -> bool {
        let streams = self.streams.read().await;

        if let Some(entry_arc) = streams.get(name) {
            let entry = entry_arc.lock().await;
            entry.state == StreamState::Active && entry.publisher_id.is_some()
        } else {
            false
        }
    }

    /// Check if a stream exists (active or in grace period)
    pub async fn stream_exists(&self, name: &str) -> bool {
        let streams = self.streams.read().await;

        if let Some(entry_arc) = streams.get(name) {
            let entry = entry_arc.lock().await;
            matches!(entry.state, StreamState::Active | StreamState::GracePeriod)
        } else {
            false
        }
    }

    /// Get stream statistics
    pub async fn stream_stats(&self, name: &str) -> Option<StreamStats> {
        let streams = self.streams.read().await;

        if let Some(entry_arc) = streams.get(name) {
            let entry = entry_arc.lock().await;
            Some(entry.stats())
        } else {
            None
        }
    }

    /// Get total number of streams
    pub async fn stream_count(&self) -> usize {
        self.streams.read().await.len()
    }

    /// Run cleanup once
    ///
    /// Advances the rate estimators and removes streams that have been in
    /// grace period longer than `publisher_grace_period` or idle longer
    /// than `idle_stream_timeout`.
    pub async fn cleanup(&self) {
        let mut streams = self.streams.write().await;
        let now = Instant::now();

        let mut expired = Vec::new();
        for (name, entry_arc) in streams.iter() {
            // An entry busy with a send is not stale; skip it.
            let Ok(mut entry) = entry_arc.try_lock() else {
                continue;
            };
            entry.rate.tick();

            let remove = match entry.state {
                StreamState::GracePeriod => entry
                    .publisher_disconnected_at
                    .map(|t| now.duration_since(t) > self.config.publisher_grace_period)
                    .unwrap_or(false),
                StreamState::Idle => {
                    let since = entry.publisher_disconnected_at.unwrap_or(entry.created_at);
                    now.duration_since(since) > self.config.idle_stream_timeout
                }
                StreamState::Active => false,
            };

            if remove {
                expired.push(name.clone());
            }
        }

        for name in expired {
            if let Some(entry_arc) = streams.remove(&name) {
                if let Ok(mut entry) = entry_arc.try_lock() {
                    entry.broadcast.stop();
                }
                tracing::info!(stream = %name, "Stream removed by cleanup");
            }
        }
    }

    /// Spawn the background cleanup task
    ///
    /// Returns a handle that can be used to abort the task.
    pub fn spawn_cleanup_task(self: &Arc<Self>) -> tokio::task::JoinHandle<()> {
        let registry = Arc::clone(self);
        let interval = registry.config.cleanup_interval;

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                registry.cleanup().await;
            }
        })
    }
}

impl Default for StreamRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use bytes::BytesMut;

    use super::*;
    use crate::ebml::codec::write_tag_header;
    use crate::ebml::tags::{
        TAG_CLUSTER, TAG_EBML, TAG_INFO, TAG_SIMPLE_BLOCK, TAG_TIMECODE, TAG_TIMECODE_SCALE,
        TAG_TRACKS, TAG_TRACK_ENTRY, TAG_TRACK_NUMBER,
    };

    fn element(id: u32, payload: &[u8]) -> Vec<u8> {
        let mut out = BytesMut::new();
        write_tag_header(&mut out, id, payload.len() as u64);
        out.extend_from_slice(payload);
        out.to_vec()
    }

    fn headers() -> Vec<u8> {
        let mut bytes = element(TAG_EBML, b"\x42\x86\x81\x01");
        bytes.extend([0x18, 0x53, 0x80, 0x67, 0xFF]); // Segment, indeterminate
        bytes.extend(element(
            TAG_INFO,
            &element(TAG_TIMECODE_SCALE, &1_000_000u32.to_be_bytes()),
        ));
        bytes.extend(element(
            TAG_TRACKS,
            &element(TAG_TRACK_ENTRY, &element(TAG_TRACK_NUMBER, &[0])),
        ));
        bytes
    }

    fn keyframe_cluster(tc: u8) -> Vec<u8> {
        let mut payload = element(TAG_TIMECODE, &[tc]);
        payload.extend(element(TAG_SIMPLE_BLOCK, &[0x80, 0x00, 0x00, 0x80, 0xAA]));
        element(TAG_CLUSTER, &payload)
    }

    #[tokio::test]
    async fn test_register_publisher_conflict() {
        let registry = StreamRegistry::new();

        registry.register_publisher("live", 1).await.unwrap();
        assert!(registry.has_active_stream("live").await);

        let result = registry.register_publisher("live", 2).await;
        assert!(matches!(
            result,
            Err(RegistryError::StreamAlreadyPublishing(_))
        ));
    }

    #[tokio::test]
    async fn test_subscribe_requires_stream() {
        let registry = StreamRegistry::new();
        let result = registry.subscribe("missing", false).await;
        assert!(matches!(result, Err(RegistryError::StreamNotFound(_))));
    }

    #[tokio::test]
    async fn test_headers_replayed_through_queue() {
        let registry = StreamRegistry::new();
        registry.register_publisher("live", 1).await.unwrap();
        registry.send("live", 1, &headers()).await.unwrap();

        let (_id, mut rx) = registry.subscribe("live", false).await.unwrap();

        let first = rx.try_recv().unwrap();
        assert_eq!(first.as_ref(), element(TAG_EBML, b"\x42\x86\x81\x01"));
        let second = rx.try_recv().unwrap();
        assert!(second.starts_with(&[0x18, 0x53, 0x80, 0x67, 0xFF]));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_cluster_flows_to_subscriber() {
        let registry = StreamRegistry::new();
        registry.register_publisher("live", 1).await.unwrap();
        registry.send("live", 1, &headers()).await.unwrap();

        let (_id, mut rx) = registry.subscribe("live", false).await.unwrap();
        rx.try_recv().unwrap();
        rx.try_recv().unwrap();

        registry.send("live", 1, &keyframe_cluster(0)).await.unwrap();
        assert_eq!(rx.try_recv().unwrap().as_ref(), keyframe_cluster(0));
    }

    #[tokio::test]
    async fn test_send_verifies_publisher() {
        let registry = StreamRegistry::new();
        registry.register_publisher("live", 1).await.unwrap();

        let result = registry.send("live", 99, &headers()).await;
        assert_eq!(result, Err(RegistryError::PublisherMismatch));
    }

    #[tokio::test]
    async fn test_fatal_producer_error_surfaces() {
        let registry = StreamRegistry::new();
        registry.register_publisher("live", 1).await.unwrap();

        let result = registry.send("live", 1, &[0x00, 0x80]).await;
        assert!(matches!(result, Err(RegistryError::Broadcast(_))));
    }

    #[tokio::test]
    async fn test_grace_period_and_reclaim() {
        let registry = StreamRegistry::new();
        registry.register_publisher("live", 1).await.unwrap();
        registry.send("live", 1, &headers()).await.unwrap();

        let (_id, _rx) = registry.subscribe("live", false).await.unwrap();

        registry.unregister_publisher("live", 1).await;
        let stats = registry.stream_stats("live").await.unwrap();
        assert_eq!(stats.state, StreamState::GracePeriod);
        assert!(registry.stream_exists("live").await);
        assert!(!registry.has_active_stream("live").await);

        // New subscribers may still join while the publisher is away.
        assert!(registry.subscribe("live", false).await.is_ok());

        // The returning publisher reclaims the stream.
        registry.register_publisher("live", 2).await.unwrap();
        let stats = registry.stream_stats("live").await.unwrap();
        assert_eq!(stats.state, StreamState::Active);
        assert_eq!(stats.subscriber_count, 2);
    }

    #[tokio::test]
    async fn test_idle_without_subscribers() {
        let registry = StreamRegistry::new();
        registry.register_publisher("live", 1).await.unwrap();
        registry.unregister_publisher("live", 1).await;

        let stats = registry.stream_stats("live").await.unwrap();
        assert_eq!(stats.state, StreamState::Idle);
        assert!(!registry.stream_exists("live").await);

        // Idle also refuses new subscribers.
        let result = registry.subscribe("live", false).await;
        assert!(matches!(result, Err(RegistryError::StreamNotActive(_))));
    }

    #[tokio::test]
    async fn test_unsubscribe_is_idempotent() {
        let registry = StreamRegistry::new();
        registry.register_publisher("live", 1).await.unwrap();

        let (id, _rx) = registry.subscribe("live", false).await.unwrap();
        registry.unsubscribe("live", id).await;
        registry.unsubscribe("live", id).await;

        let stats = registry.stream_stats("live").await.unwrap();
        assert_eq!(stats.subscriber_count, 0);
    }

    #[tokio::test]
    async fn test_cleanup_removes_expired_grace_period() {
        let config = RegistryConfig::default()
            .publisher_grace_period(Duration::from_millis(10));
        let registry = StreamRegistry::with_config(config);

        registry.register_publisher("live", 1).await.unwrap();
        let (_id, _rx) = registry.subscribe("live", false).await.unwrap();
        registry.unregister_publisher("live", 1).await;

        tokio::time::sleep(Duration::from_millis(30)).await;
        registry.cleanup().await;

        assert_eq!(registry.stream_count().await, 0);
    }

    #[tokio::test]
    async fn test_cleanup_keeps_active_streams() {
        let config = RegistryConfig::default()
            .publisher_grace_period(Duration::from_millis(1))
            .idle_stream_timeout(Duration::from_millis(1));
        let registry = StreamRegistry::with_config(config);

        registry.register_publisher("live", 1).await.unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;
        registry.cleanup().await;

        assert_eq!(registry.stream_count().await, 1);
    }

    #[tokio::test]
    async fn test_stats_capture_stream_info() {
        let registry = StreamRegistry::new();
        registry.register_publisher("live", 1).await.unwrap();
        registry.send("live", 1, &headers()).await.unwrap();
        registry.cleanup().await;

        let stats = registry.stream_stats("live").await.unwrap();
        assert!(stats.has_publisher);
        assert!(stats.ingest_rate_mean > 0.0);
    }
}
