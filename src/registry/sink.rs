//! Channel-backed subscriber sink
//!
//! Bridges the engine's synchronous write seam to an async consumer: each
//! chunk is copied into a `Bytes` and offered to a bounded `mpsc` queue
//! with `try_send`, so the engine never blocks on a slow transport.

use bytes::Bytes;
use tokio::sync::mpsc;

use crate::broadcast::ChunkSink;

/// [`ChunkSink`] feeding a bounded `mpsc` queue
///
/// A full queue refuses the chunk. For media bytes that makes the engine
/// resynchronize this subscriber on the next keyframe; for forced header
/// bytes it means the consumer has stalled beyond saving, and the
/// transport should drop it. A closed queue (receiver gone) refuses
/// everything until the subscriber is disconnected.
pub struct ChannelSink {
    tx: mpsc::Sender<Bytes>,
}

impl ChannelSink {
    pub fn new(tx: mpsc::Sender<Bytes>) -> Self {
        Self { tx }
    }
}

impl ChunkSink for ChannelSink {
    fn write_chunk(&mut self, data: &[u8], _force: bool) -> bool {
        self.tx.try_send(Bytes::copy_from_slice(data)).is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delivers_until_full() {
        let (tx, mut rx) = mpsc::channel(2);
        let mut sink = ChannelSink::new(tx);

        assert!(sink.write_chunk(b"one", false));
        assert!(sink.write_chunk(b"two", false));
        assert!(!sink.write_chunk(b"three", false));

        assert_eq!(rx.try_recv().unwrap().as_ref(), b"one");
        assert_eq!(rx.try_recv().unwrap().as_ref(), b"two");
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_refuses_after_receiver_dropped() {
        let (tx, rx) = mpsc::channel(2);
        let mut sink = ChannelSink::new(tx);
        drop(rx);
        assert!(!sink.write_chunk(b"chunk", true));
    }
}
