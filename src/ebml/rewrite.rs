//! Cluster rewriting passes
//!
//! Three buffer-rewriting passes make the relayed stream tolerable to
//! mainstream decoders:
//!
//! - [`strip_reference_frames`]: a late joiner must not receive a block
//!   that references a frame it never saw. A keyframe guarantees that no
//!   later block references anything before it, while referencing nothing
//!   itself, so per track, everything before the first keyframe is cut.
//! - [`adjust_timecode`]: decoders drop frames whose timecodes go
//!   backwards, even across segments. When the producer restarts a segment
//!   at zero, cluster timecodes are shifted to stay monotonic.
//! - [`normalize_segment_length`]: Chrome only accepts the shortest
//!   encoding (`0xFF`) of an indeterminate `Segment` length; longer
//!   encodings are recoded in place with a `Void` filler.

use bytes::{Bytes, BytesMut};

use crate::ebml::codec::{
    parse_child, parse_fixed_uint, parse_tag, parse_varint, write_fixed_uint, write_fixed_uint_at,
    write_tag_header, Tag, Varint,
};
use crate::ebml::tags::{
    INDETERMINATE, TAG_BLOCK, TAG_BLOCK_GROUP, TAG_CLUSTER, TAG_PREV_SIZE, TAG_REFERENCE_BLOCK,
    TAG_SEGMENT, TAG_SIMPLE_BLOCK, TAG_TIMECODE, TAG_VOID,
};
use crate::error::EbmlError;

/// One track index bit per position; a block track must fit this mask.
pub const MAX_TRACKS: u64 = 64;

/// A cluster copy with its pre-keyframe blocks removed
#[derive(Debug, Clone, PartialEq)]
pub struct StrippedCluster {
    pub data: Bytes,
    /// Tracks whose first forwarded block is a keyframe, one bit per track
    pub keyframe_tracks: u64,
}

fn complete_cluster(data: &[u8]) -> Result<(Tag, usize), EbmlError> {
    let tag = parse_tag(data)?.ok_or(EbmlError::NotACluster)?;
    if tag.id != TAG_CLUSTER {
        return Err(EbmlError::NotACluster);
    }
    match tag.total_len() {
        Some(total) if total <= data.len() => Ok((tag, total)),
        _ => Err(EbmlError::NotACluster),
    }
}

/// Track number of a `SimpleBlock` (or bare `Block`) payload.
///
/// The varint must be followed by at least the 2-byte timecode delta and
/// the flags byte, and the track must fit the keyframe mask.
fn block_track(body: &[u8]) -> Result<Varint, EbmlError> {
    let track = parse_varint(body, false)?.ok_or(EbmlError::Malformed)?;
    if body.len() < track.consumed + 3 {
        return Err(EbmlError::Malformed);
    }
    if track.value >= MAX_TRACKS {
        return Err(EbmlError::TrackOutOfRange(track.value));
    }
    Ok(track)
}

/// A `BlockGroup` holds a single `Block` plus metadata tags; of those we
/// only care about `ReferenceBlock`, whose value being absent or zero
/// marks the block as a keyframe.
fn scan_block_group(payload: &[u8]) -> Result<(Varint, u64), EbmlError> {
    let mut track = None;
    let mut reference = 0u64;

    let mut off = 0;
    while off < payload.len() {
        let child = parse_child(&payload[off..])?;
        let total = child.total_len().ok_or(EbmlError::Truncated)?;
        let body = child.payload(&payload[off..off + total]);

        match child.id {
            TAG_BLOCK => track = Some(block_track(body)?),
            TAG_REFERENCE_BLOCK => reference = parse_fixed_uint(body),
            _ => {}
        }
        off += total;
    }

    let track = track.ok_or(EbmlError::BlockGroupWithoutBlock)?;
    Ok((track, reference))
}

/// Copy `cluster`, dropping `PrevSize` and every block that precedes its
/// track's first keyframe. Returns `None` if no track produced a keyframe
/// (the copy would carry no usable blocks).
pub fn strip_reference_frames(cluster: &[u8]) -> Result<Option<StrippedCluster>, EbmlError> {
    let (tag, total) = complete_cluster(cluster)?;

    let mut out = BytesMut::with_capacity(total);
    out.extend_from_slice(&cluster[..tag.header_len]);

    let mut found = 0u64;
    let payload = &cluster[tag.header_len..total];
    let mut off = 0;

    while off < payload.len() {
        let child = parse_child(&payload[off..])?;
        let child_total = child.total_len().ok_or(EbmlError::Truncated)?;
        let encoded = &payload[off..off + child_total];
        off += child_total;

        match child.id {
            // Meaningless to a subscriber that missed the previous cluster.
            TAG_PREV_SIZE => continue,
            TAG_SIMPLE_BLOCK => {
                let body = child.payload(encoded);
                let track = block_track(body)?;
                let bit = 1u64 << track.value;
                if found & bit == 0 {
                    if body[track.consumed + 2] & 0x80 == 0 {
                        continue;
                    }
                    found |= bit;
                }
            }
            TAG_BLOCK_GROUP => {
                let (track, reference) = scan_block_group(child.payload(encoded))?;
                let bit = 1u64 << track.value;
                if reference != 0 && found & bit == 0 {
                    continue;
                }
                found |= bit;
            }
            _ => {}
        }

        out.extend_from_slice(encoded);
    }

    if found == 0 {
        return Ok(None);
    }

    // The stripped payload never grew, so the new length fits the original
    // varint width. The id is 4 bytes; the length field follows it.
    let new_length = (out.len() - tag.header_len) as u64;
    let width = tag.header_len - 4;
    write_fixed_uint_at(&mut out[4..], new_length | 1u64 << (7 * width), width);

    Ok(Some(StrippedCluster { data: out.freeze(), keyframe_tracks: found }))
}

/// Bit mask of the tracks carried by this cluster's blocks.
pub fn cluster_track_mask(cluster: &[u8]) -> Result<u64, EbmlError> {
    let (tag, total) = complete_cluster(cluster)?;

    let mut mask = 0u64;
    let payload = &cluster[tag.header_len..total];
    let mut off = 0;

    while off < payload.len() {
        let child = parse_child(&payload[off..])?;
        let child_total = child.total_len().ok_or(EbmlError::Truncated)?;
        let encoded = &payload[off..off + child_total];

        match child.id {
            TAG_SIMPLE_BLOCK => {
                let track = block_track(child.payload(encoded))?;
                mask |= 1u64 << track.value;
            }
            TAG_BLOCK_GROUP => {
                let (track, _) = scan_block_group(child.payload(encoded))?;
                mask |= 1u64 << track.value;
            }
            _ => {}
        }
        off += child_total;
    }

    Ok(mask)
}

/// Shift a cluster's `Timecode` so it never falls below `minimum`.
///
/// `shift` and `minimum` persist across clusters: `shift` grows when a new
/// segment restarts the clock, `minimum` tracks the largest timecode sent
/// so far. Returns `None` when the cluster can go out unchanged
/// (`shift == 0`); otherwise the rewritten copy carries the timecode in a
/// fixed 8-byte encoding.
pub fn adjust_timecode(
    cluster: &[u8],
    shift: &mut u64,
    minimum: &mut u64,
) -> Result<Option<Bytes>, EbmlError> {
    let (tag, total) = complete_cluster(cluster)?;

    let payload = &cluster[tag.header_len..total];
    let mut off = 0;

    while off < payload.len() {
        let child = parse_child(&payload[off..])?;
        let child_total = child.total_len().ok_or(EbmlError::Truncated)?;

        if child.id == TAG_TIMECODE {
            let tc = parse_fixed_uint(child.payload(&payload[off..off + child_total]));

            if *shift + tc < *minimum {
                *shift = *minimum - tc;
            }
            let tc_out = tc + *shift;
            *minimum = tc_out;

            if *shift == 0 {
                return Ok(None);
            }

            // There is only one Timecode in a cluster. This is it.
            let mut out = BytesMut::with_capacity(total + 8);
            write_tag_header(&mut out, TAG_CLUSTER, tag.length + 8 - child.length);
            out.extend_from_slice(&payload[..off]);
            write_tag_header(&mut out, TAG_TIMECODE, 8);
            write_fixed_uint(&mut out, tc_out, 8);
            out.extend_from_slice(&payload[off + child_total..]);
            return Ok(Some(out.freeze()));
        }

        off += child_total;
    }

    Err(EbmlError::MissingTimecode)
}

/// Recode a non-canonical indeterminate `Segment` length in place.
///
/// `header` must start at the segment tag. The length field collapses to
/// the 1-byte `0xFF` and the freed bytes become a `Void` tag filling the
/// rest of the original header. Returns whether a rewrite happened; the
/// 1- and 2-byte encodings are left alone (the former is already
/// canonical, the latter has no room for the filler).
pub fn normalize_segment_length(header: &mut [u8], tag: &Tag) -> bool {
    if tag.id != TAG_SEGMENT || tag.length != INDETERMINATE || tag.header_len < 7 {
        return false;
    }

    header[4] = 0xFF;
    header[5] = TAG_VOID as u8;
    header[6] = 0x80 | (tag.header_len - 7) as u8;
    true
}
