//! Subscriber records and the write seam
//!
//! The engine's only output channel is [`ChunkSink::write_chunk`], invoked
//! synchronously from `Broadcast::send` and `Broadcast::connect`. A sink
//! must not block and must not reenter the `Broadcast` it is registered
//! with; refusing a chunk (`false`) is the back-pressure signal.

use std::sync::atomic::{AtomicI32, Ordering};

/// Identifier handed out by `Broadcast::connect`
///
/// Ids are drawn from one process-wide counter, so they never repeat
/// within a process, but they are only meaningful to the `Broadcast` that
/// issued them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriberId(pub i32);

impl std::fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

static NEXT_SUBSCRIBER_ID: AtomicI32 = AtomicI32::new(0);

pub(crate) fn next_subscriber_id() -> SubscriberId {
    SubscriberId(NEXT_SUBSCRIBER_ID.fetch_add(1, Ordering::Relaxed))
}

/// Destination for relayed bytes
///
/// `force` marks header/metadata bytes the transport must not drop for
/// flow-control reasons. The return value reports whether the chunk was
/// accepted; a refused media chunk makes the engine resynchronize this
/// subscriber on the next keyframe instead of retrying.
pub trait ChunkSink {
    fn write_chunk(&mut self, data: &[u8], force: bool) -> bool;
}

impl<F> ChunkSink for F
where
    F: FnMut(&[u8], bool) -> bool,
{
    fn write_chunk(&mut self, data: &[u8], force: bool) -> bool {
        self(data, force)
    }
}

/// Per-subscriber fan-out state
pub(crate) struct Subscriber {
    pub(crate) id: SubscriberId,
    pub(crate) sink: Box<dyn ChunkSink + Send>,
    /// Suppresses the `EBML` header and live header-byte forwarding; set
    /// by reconnecting subscribers that already hold the headers.
    pub(crate) skip_headers: bool,
    /// One bit per track, set once this subscriber has been fed a keyframe
    /// for that track. Cleared wholesale when a write is refused.
    pub(crate) keyframes: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_are_unique_and_increasing() {
        let a = next_subscriber_id();
        let b = next_subscriber_id();
        assert!(b.0 > a.0);
    }

    #[test]
    fn test_closure_is_a_sink() {
        let mut seen = Vec::new();
        let mut sink = |data: &[u8], force: bool| {
            seen.push((data.to_vec(), force));
            true
        };
        assert!(sink.write_chunk(b"abc", true));
        assert_eq!(seen, vec![(b"abc".to_vec(), true)]);
    }
}
