//! Multi-stream relay registry
//!
//! The registry manages many independent broadcasts keyed by stream name
//! and bridges the synchronous [`Broadcast`](crate::broadcast::Broadcast)
//! engine to concurrent transports.
//!
//! # Architecture
//!
//! ```text
//!                          Arc<StreamRegistry>
//!                     ┌───────────────────────────┐
//!                     │ streams: HashMap<name,    │
//!                     │   StreamEntry {           │
//!                     │     broadcast: Broadcast, │
//!                     │     publisher_id, state,  │
//!                     │   }                       │
//!                     │ >                         │
//!                     └───────────┬───────────────┘
//!                                 │
//!         ┌───────────────────────┼───────────────────────┐
//!         │                       │                       │
//!         ▼                       ▼                       ▼
//!    [Publisher]            [Subscriber]            [Subscriber]
//!    send(name, bytes)      rx.recv()               rx.recv()
//!         │                       ▲                       ▲
//!         └─► Broadcast::send ──► ChannelSink ── mpsc ────┘
//! ```
//!
//! Each subscriber owns a bounded `mpsc` queue; the engine's write
//! callback becomes `try_send`, so a slow consumer never blocks the
//! producer and instead resynchronizes on the next keyframe.
//!
//! A publisher that drops mid-stream leaves its entry in a grace period:
//! reconnecting within the window reclaims the same `Broadcast`, whose
//! engine then swallows the repeated `EBML` header and re-captures the new
//! segment's track info, so attached subscribers keep playing.

pub mod config;
pub mod entry;
pub mod error;
pub mod rate;
pub mod sink;
pub mod store;

pub use config::RegistryConfig;
pub use entry::{StreamEntry, StreamState, StreamStats};
pub use error::RegistryError;
pub use sink::ChannelSink;
pub use store::StreamRegistry;
