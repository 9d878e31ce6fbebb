//! Single-stream broadcast engine
//!
//! One producer, many subscribers:
//!
//! ```text
//!                       Broadcast
//!            ┌──────────────────────────────┐
//!  send() ──►│ input buffer ─► tag parser   │
//!            │    │                         │
//!            │    ├─► ebml_header (once)    │
//!            │    ├─► tracks_prefix (per    │
//!            │    │   segment)              │
//!            │    └─► cluster rewriter      │
//!            │            │                 │
//!            │   subscribers: [ChunkSink]   │
//!            └────┬─────────┬─────────┬─────┘
//!                 ▼         ▼         ▼
//!             write_chunk write_chunk write_chunk
//! ```
//!
//! The engine is synchronous and single-owner; serialization across
//! threads is the caller's job (see [`crate::registry`] for an async
//! wrapper). Sinks are invoked inline from `send` and `connect` and must
//! not reenter the `Broadcast`.

pub mod stream;
pub mod subscriber;

pub use stream::{Broadcast, StreamInfo};
pub use subscriber::{ChunkSink, SubscriberId};
