//! Error types for the relay core
//!
//! Two classes of failure exist (parser incompleteness is not one of them;
//! it is the normal "wait for more bytes" loop exit):
//!
//! - [`EbmlError`]: the byte stream violates the EBML structure we rely on.
//! - [`BroadcastError`]: a fatal producer error. Once `Broadcast::send`
//!   returns one of these, the stream is unusable and the transport should
//!   tear down the producer connection.
//!
//! Per-subscriber write failures are *not* errors: a refused write clears
//! the subscriber's keyframe mask and the engine moves on.

/// Error type for EBML parsing and cluster rewriting
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EbmlError {
    /// A varint started with a zero byte, or a tag's structure is broken
    Malformed,
    /// A child tag claims more payload than its parent contains
    Truncated,
    /// The rewriter was handed something that is not a complete `Cluster`
    NotACluster,
    /// A `Cluster` has no `Timecode` child
    MissingTimecode,
    /// A `BlockGroup` contains no `Block`
    BlockGroupWithoutBlock,
    /// A block's track number does not fit the 64-track keyframe mask
    TrackOutOfRange(u64),
}

impl std::fmt::Display for EbmlError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EbmlError::Malformed => write!(f, "malformed EBML"),
            EbmlError::Truncated => write!(f, "EBML tag extends past its container"),
            EbmlError::NotACluster => write!(f, "expected a complete Cluster tag"),
            EbmlError::MissingTimecode => write!(f, "Cluster has no Timecode"),
            EbmlError::BlockGroupWithoutBlock => write!(f, "BlockGroup contains no Block"),
            EbmlError::TrackOutOfRange(n) => write!(f, "track number out of range: {}", n),
        }
    }
}

impl std::error::Error for EbmlError {}

/// Fatal producer error returned by `Broadcast::send`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BroadcastError {
    /// The stream violates the EBML structure
    Ebml(EbmlError),
    /// A non-`Segment` top-level tag exceeds the 1 MiB cap
    TagTooLarge { id: u32, size: u64 },
    /// A top-level tag we have no business forwarding
    UnknownTag(u32),
    /// A `TrackEntry` declares a track number outside `[0, 64)`
    TrackOutOfRange(u64),
    /// `TimecodeScale` is not 1 ms (or is missing); timecode rewriting
    /// assumes millisecond resolution
    InvalidTimecodeScale(u64),
    /// An `Info` `Duration` too long to be voided in place
    DurationTooLong(u64),
}

impl std::fmt::Display for BroadcastError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BroadcastError::Ebml(e) => write!(f, "{}", e),
            BroadcastError::TagTooLarge { id, size } => {
                write!(f, "tag {:#x} too large: {} bytes", id, size)
            }
            BroadcastError::UnknownTag(id) => write!(f, "unknown top-level tag {:#x}", id),
            BroadcastError::TrackOutOfRange(n) => write!(f, "track number out of range: {}", n),
            BroadcastError::InvalidTimecodeScale(s) => {
                write!(f, "unsupported timecode scale: {}", s)
            }
            BroadcastError::DurationTooLong(n) => {
                write!(f, "Duration tag too large to void: {} bytes", n)
            }
        }
    }
}

impl std::error::Error for BroadcastError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            BroadcastError::Ebml(e) => Some(e),
            _ => None,
        }
    }
}

impl From<EbmlError> for BroadcastError {
    fn from(e: EbmlError) -> Self {
        match e {
            EbmlError::TrackOutOfRange(n) => BroadcastError::TrackOutOfRange(n),
            other => BroadcastError::Ebml(other),
        }
    }
}
