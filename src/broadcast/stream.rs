//! The broadcast engine
//!
//! [`Broadcast`] is a stateful stream transformer: one producer feeds it a
//! WebM byte stream through [`Broadcast::send`], and every attached
//! subscriber receives a *playable* stream no matter when it attached:
//!
//! - the `EBML` header and the current segment's `Info`/`Tracks` prefix are
//!   captured and replayed to late joiners;
//! - a subscriber's first blocks per track start at a keyframe;
//! - cluster timecodes never decrease, even when the producer restarts a
//!   segment at zero;
//! - seeking-related metadata (`SeekHead`, `Cues`, …) is removed, since
//!   its offsets are meaningless mid-stream.
//!
//! A `Broadcast` is a single-owner object: `send`, `connect`, `disconnect`
//! and `stop` must be externally serialized, and every operation runs to
//! completion synchronously. A reconnecting producer can keep feeding the
//! same `Broadcast`; its repeated `EBML` header is dropped and its new
//! segment re-captures the tracks prefix.

use crate::ebml::buffer::StreamBuffer;
use crate::ebml::codec::{parse_child, parse_fixed_uint, parse_tag, Tag};
use crate::ebml::rewrite::{
    adjust_timecode, cluster_track_mask, normalize_segment_length, strip_reference_frames,
    StrippedCluster, MAX_TRACKS,
};
use crate::ebml::tags::{
    TAG_AUDIO, TAG_CHAPTERS, TAG_CLUSTER, TAG_CUES, TAG_DURATION, TAG_EBML, TAG_INFO,
    TAG_PIXEL_HEIGHT, TAG_PIXEL_WIDTH, TAG_PREV_SIZE, TAG_SEEK_HEAD, TAG_SEGMENT, TAG_TAGS,
    TAG_TIMECODE_SCALE, TAG_TRACKS, TAG_TRACK_ENTRY, TAG_TRACK_NUMBER, TAG_VIDEO, TAG_VOID,
};
use crate::error::BroadcastError;

use super::subscriber::{next_subscriber_id, ChunkSink, Subscriber, SubscriberId};

/// Cap on any non-`Segment` top-level tag, clusters included. A producer
/// declaring more than this is broken or hostile.
const MAX_TAG_SIZE: u64 = 1024 * 1024;

/// The only timecode resolution the shift arithmetic supports (1 ms).
const EXPECTED_TIMECODE_SCALE: u64 = 1_000_000;

/// Metadata gleaned from the current segment's `TrackEntry` tags
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StreamInfo {
    pub has_video: bool,
    pub has_audio: bool,
    /// Dimensions of the last video track seen in `Tracks`.
    pub width: u64,
    pub height: u64,
}

/// Per-stream relay state: parser, captured headers, subscribers
#[derive(Default)]
pub struct Broadcast {
    /// Bytes received but not yet parsed to a complete tag.
    input: StreamBuffer,
    /// The first `EBML` top-level tag, captured once per lifetime.
    ebml_header: StreamBuffer,
    /// Current `Segment` header plus `Info`/`Tracks`; reset per segment.
    tracks_prefix: StreamBuffer,
    /// Added to incoming cluster timecodes to keep them monotonic.
    timecode_shift: u64,
    /// Largest shifted cluster timecode emitted so far.
    timecode_last: u64,
    saw_segments: bool,
    saw_clusters: bool,
    info: StreamInfo,
    subscribers: Vec<Subscriber>,
}

impl Broadcast {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed producer bytes. Partial tags are buffered until complete; a
    /// fatal error means the stream is beyond recovery and the producer
    /// connection should be closed.
    pub fn send(&mut self, data: &[u8]) -> Result<(), BroadcastError> {
        self.input.append(data);

        loop {
            let Some(tag) = parse_tag(self.input.view())? else {
                break; // incomplete header, wait for more
            };

            // A Segment is consumed as its bare header; its children are
            // parsed as top-level tags in this same loop. Everything else,
            // clusters included, is consumed as one complete unit.
            let frame_len = if tag.id == TAG_SEGMENT {
                tag.header_len
            } else {
                match tag.total_len() {
                    Some(total) if total as u64 <= MAX_TAG_SIZE => total,
                    _ => {
                        return Err(BroadcastError::TagTooLarge { id: tag.id, size: tag.length })
                    }
                }
            };

            if frame_len > self.input.len() {
                break; // complete header, incomplete payload
            }

            if tag.id == TAG_SEGMENT {
                normalize_segment_length(self.input.view_mut(), &tag);
            }

            if tag.id == TAG_CLUSTER {
                self.relay_cluster(frame_len)?;
            } else {
                self.relay_metadata(&tag, frame_len)?;
            }

            self.input.shift(frame_len);
        }

        Ok(())
    }

    /// Attach a subscriber. Captured header bytes are replayed
    /// synchronously before any live data can reach the sink.
    pub fn connect(&mut self, mut sink: Box<dyn ChunkSink + Send>, skip_headers: bool) -> SubscriberId {
        if !skip_headers && !self.ebml_header.is_empty() {
            sink.write_chunk(self.ebml_header.view(), true);
        }
        // Always replayed: the subscriber may be joining a new segment.
        if !self.tracks_prefix.is_empty() {
            sink.write_chunk(self.tracks_prefix.view(), true);
        }

        let id = next_subscriber_id();
        self.subscribers.push(Subscriber { id, sink, skip_headers, keyframes: 0 });
        id
    }

    /// Detach a subscriber. A no-op if the id is unknown.
    pub fn disconnect(&mut self, id: SubscriberId) {
        self.subscribers.retain(|s| s.id != id);
    }

    /// Release all buffers and drop every subscriber.
    pub fn stop(&mut self) {
        self.input.clear();
        self.ebml_header.clear();
        self.tracks_prefix.clear();
        self.subscribers = Vec::new();
    }

    /// Track metadata of the current segment.
    pub fn info(&self) -> &StreamInfo {
        &self.info
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    /// Whether a `Segment` has been seen yet.
    pub fn saw_segments(&self) -> bool {
        self.saw_segments
    }

    /// Whether any cluster has been relayed in the current segment.
    pub fn saw_clusters(&self) -> bool {
        self.saw_clusters
    }

    fn relay_metadata(&mut self, tag: &Tag, frame_len: usize) -> Result<(), BroadcastError> {
        match tag.id {
            TAG_SEGMENT => {
                self.saw_segments = true;
                self.saw_clusters = false;
                self.info = StreamInfo::default();
                self.tracks_prefix.clear();
            }
            TAG_INFO => self.sanitize_info(tag, frame_len)?,
            TAG_TRACKS => self.scan_tracks(tag, frame_len)?,
            _ => {}
        }

        match tag.id {
            TAG_EBML => {
                // The header is the same in all WebMs; repeats mean the
                // producer reconnected and are dropped.
                if self.ebml_header.is_empty() {
                    let frame = &self.input.view()[..frame_len];
                    self.ebml_header.append(frame);
                    for sub in self.subscribers.iter_mut() {
                        if !sub.skip_headers {
                            sub.sink.write_chunk(frame, true);
                        }
                    }
                }
            }
            TAG_SEGMENT | TAG_INFO | TAG_TRACKS => {
                let frame = &self.input.view()[..frame_len];
                self.tracks_prefix.append(frame);
                for sub in self.subscribers.iter_mut() {
                    if !sub.skip_headers {
                        sub.sink.write_chunk(frame, true);
                    }
                }
            }
            // Offsets and seeking are meaningless in a live relay.
            TAG_SEEK_HEAD | TAG_CUES | TAG_CHAPTERS | TAG_PREV_SIZE | TAG_VOID | TAG_TAGS => {}
            other => return Err(BroadcastError::UnknownTag(other)),
        }

        Ok(())
    }

    /// Enforce millisecond timecode resolution and void any `Duration`
    /// child in place: a live stream must not advertise one.
    fn sanitize_info(&mut self, tag: &Tag, frame_len: usize) -> Result<(), BroadcastError> {
        let mut scale = 0u64;
        let mut off = tag.header_len;

        while off < frame_len {
            let (child, total) = {
                let view = self.input.view();
                let child = parse_child(&view[off..frame_len])?;
                let total = child.total_len().ok_or(crate::error::EbmlError::Truncated)?;
                if child.id == TAG_TIMECODE_SCALE {
                    scale = parse_fixed_uint(child.payload(&view[off..off + total]));
                }
                (child, total)
            };

            if child.id == TAG_DURATION {
                let filler = total - 2;
                if filler > 0x7F {
                    return Err(BroadcastError::DurationTooLong(total as u64));
                }
                let buf = self.input.view_mut();
                buf[off] = TAG_VOID as u8;
                buf[off + 1] = 0x80 | filler as u8;
            }

            off += total;
        }

        if scale != EXPECTED_TIMECODE_SCALE {
            return Err(BroadcastError::InvalidTimecodeScale(scale));
        }
        Ok(())
    }

    fn scan_tracks(&mut self, tag: &Tag, frame_len: usize) -> Result<(), BroadcastError> {
        let view = &self.input.view()[..frame_len];
        let payload = tag.payload(view);

        let mut entries = Vec::new();
        let mut off = 0;
        while off < payload.len() {
            let child = parse_child(&payload[off..])?;
            let total = child.total_len().ok_or(crate::error::EbmlError::Truncated)?;
            if child.id == TAG_TRACK_ENTRY {
                entries.push(child.payload(&payload[off..off + total]).to_vec());
            }
            off += total;
        }

        for entry in &entries {
            self.scan_track_entry(entry)?;
        }
        Ok(())
    }

    /// Validate a `TrackEntry`'s track number against the keyframe mask
    /// width and capture audio/video metadata.
    fn scan_track_entry(&mut self, payload: &[u8]) -> Result<(), BroadcastError> {
        let mut off = 0;
        while off < payload.len() {
            let child = parse_child(&payload[off..])?;
            let total = child.total_len().ok_or(crate::error::EbmlError::Truncated)?;
            let body = child.payload(&payload[off..off + total]);

            match child.id {
                TAG_TRACK_NUMBER => {
                    let n = parse_fixed_uint(body);
                    if n >= MAX_TRACKS {
                        return Err(BroadcastError::TrackOutOfRange(n));
                    }
                }
                TAG_AUDIO => self.info.has_audio = true,
                TAG_VIDEO => {
                    self.info.has_video = true;
                    let mut voff = 0;
                    while voff < body.len() {
                        let vchild = parse_child(&body[voff..])?;
                        let vtotal = vchild.total_len().ok_or(crate::error::EbmlError::Truncated)?;
                        let vbody = vchild.payload(&body[voff..voff + vtotal]);
                        match vchild.id {
                            TAG_PIXEL_WIDTH => self.info.width = parse_fixed_uint(vbody),
                            TAG_PIXEL_HEIGHT => self.info.height = parse_fixed_uint(vbody),
                            _ => {}
                        }
                        voff += vtotal;
                    }
                }
                _ => {}
            }
            off += total;
        }
        Ok(())
    }

    fn relay_cluster(&mut self, frame_len: usize) -> Result<(), BroadcastError> {
        let adjusted = {
            let frame = &self.input.view()[..frame_len];
            adjust_timecode(frame, &mut self.timecode_shift, &mut self.timecode_last)?
        };
        self.saw_clusters = true;

        let view = self.input.view();
        let cluster: &[u8] = adjusted.as_deref().unwrap_or(&view[..frame_len]);

        let mask = cluster_track_mask(cluster)?;

        // The stripped copy is computed at most once per cluster and shared
        // by every subscriber that still waits for keyframes.
        let mut stripped: Option<Option<StrippedCluster>> = None;

        for sub in self.subscribers.iter_mut() {
            if sub.keyframes & mask == mask {
                if !sub.sink.write_chunk(cluster, false) {
                    sub.keyframes = 0;
                }
                continue;
            }

            if stripped.is_none() {
                stripped = Some(strip_reference_frames(cluster)?);
            }
            match stripped.as_ref().and_then(|s| s.as_ref()) {
                // No keyframes at all; this cluster has nothing for a
                // subscriber that is still synchronizing.
                None => {}
                Some(sc) => {
                    if sub.sink.write_chunk(&sc.data, false) {
                        sub.keyframes |= sc.keyframe_tracks;
                    } else {
                        sub.keyframes = 0;
                    }
                }
            }
        }

        Ok(())
    }
}
