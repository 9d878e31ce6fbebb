//! EBML parsing and rewriting for the WebM subset
//!
//! This module provides:
//! - Tag-id constants for the elements a live relay cares about
//! - VarInt and tag-header codec over a sliding input buffer
//! - The cluster rewriting passes (keyframe stripping, timecode
//!   monotonicity, segment-length normalization)
//!
//! Everything here is pure byte transformation; stream state and fan-out
//! live in [`crate::broadcast`].

pub mod buffer;
pub mod codec;
pub mod rewrite;
pub mod tags;

pub use buffer::StreamBuffer;
pub use codec::{parse_tag, parse_varint, write_varint, Tag, Varint};
pub use rewrite::{
    adjust_timecode, cluster_track_mask, normalize_segment_length, strip_reference_frames,
    StrippedCluster, MAX_TRACKS,
};
pub use tags::INDETERMINATE;
