//! Live WebM broadcast relay
//!
//! A stateful stream transformer for one-to-many live WebM distribution:
//! a single producer feeds a raw EBML/Matroska-subset byte stream, and any
//! number of subscribers attach at arbitrary points in time, each
//! receiving a stream their decoder will actually play:
//!
//! - the `EBML` header and the current segment's `Info`/`Tracks` prefix
//!   are captured and replayed to late joiners;
//! - per track, a subscriber's stream starts at a keyframe, so no block
//!   ever references a frame the subscriber missed;
//! - cluster timecodes are rewritten to stay monotonic across segment
//!   restarts;
//! - seeking metadata (`SeekHead`, `Cues`, `Chapters`, …) is stripped,
//!   and non-canonical indeterminate `Segment` lengths are recoded for
//!   picky decoders.
//!
//! # Quick start
//!
//! ```
//! use webm_relay::Broadcast;
//!
//! let mut cast = Broadcast::new();
//!
//! // Attach a subscriber; chunks arrive through the callback.
//! let id = cast.connect(Box::new(|chunk: &[u8], _force: bool| {
//!     // hand `chunk` to the transport; `false` would request a keyframe resync
//!     !chunk.is_empty()
//! }), false);
//!
//! // Feed producer bytes as they arrive, in any chunking.
//! # let producer_bytes: &[u8] = &[0x1A, 0x45, 0xDF, 0xA3, 0x80];
//! cast.send(producer_bytes)?;
//!
//! cast.disconnect(id);
//! # Ok::<(), webm_relay::BroadcastError>(())
//! ```
//!
//! The [`Broadcast`] engine is synchronous and single-owner. For serving
//! many named streams to concurrent transports, [`registry::StreamRegistry`]
//! wraps engines behind async locks and per-subscriber bounded queues.

pub mod broadcast;
pub mod ebml;
pub mod error;
pub mod registry;

pub use broadcast::{Broadcast, ChunkSink, StreamInfo, SubscriberId};
pub use error::{BroadcastError, EbmlError};
