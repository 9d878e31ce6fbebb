//! EBML tag identifiers for the WebM subset we relay
//!
//! Ids keep their length-marker bit, as they appear on the wire
//! (e.g. `Cluster` = `0x1F43B675`, a 4-byte id).
//! Reference: <https://www.matroska.org/technical/elements.html>

pub const TAG_EBML: u32 = 0x1A45_DFA3;
pub const TAG_VOID: u32 = 0xEC;
pub const TAG_SEGMENT: u32 = 0x1853_8067;
pub const TAG_SEEK_HEAD: u32 = 0x114D_9B74;
pub const TAG_INFO: u32 = 0x1549_A966;
pub const TAG_TIMECODE_SCALE: u32 = 0x2AD7_B1;
pub const TAG_DURATION: u32 = 0x4489;
pub const TAG_TRACKS: u32 = 0x1654_AE6B;
pub const TAG_TRACK_ENTRY: u32 = 0xAE;
pub const TAG_TRACK_NUMBER: u32 = 0xD7;
pub const TAG_VIDEO: u32 = 0xE0;
pub const TAG_PIXEL_WIDTH: u32 = 0xB0;
pub const TAG_PIXEL_HEIGHT: u32 = 0xBA;
pub const TAG_AUDIO: u32 = 0xE1;
pub const TAG_CLUSTER: u32 = 0x1F43_B675;
pub const TAG_TIMECODE: u32 = 0xE7;
pub const TAG_PREV_SIZE: u32 = 0xAB;
pub const TAG_SIMPLE_BLOCK: u32 = 0xA3;
pub const TAG_BLOCK_GROUP: u32 = 0xA0;
pub const TAG_BLOCK: u32 = 0xA1;
pub const TAG_REFERENCE_BLOCK: u32 = 0xFB;
pub const TAG_CUES: u32 = 0x1C53_BB6B;
pub const TAG_CHAPTERS: u32 = 0x1043_A770;
pub const TAG_TAGS: u32 = 0x1254_C367;

/// Reserved length value marking a container whose end is implied by the
/// start of the next same-level tag.
pub const INDETERMINATE: u64 = 0x00FF_FFFF_FFFF_FFFF;

/// Raw encodings (marker bit included) that decode to [`INDETERMINATE`],
/// indexed by encoded length minus one.
pub(crate) const INDETERMINATE_CODINGS: [u64; 8] = [
    0xFF,
    0x7FFF,
    0x3F_FFFF,
    0x1FFF_FFFF,
    0x0F_FFFF_FFFF,
    0x07FF_FFFF_FFFF,
    0x03_FFFF_FFFF_FFFF,
    0x01FF_FFFF_FFFF_FFFF,
];
