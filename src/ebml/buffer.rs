//! Sliding input buffer
//!
//! The parse loop consumes tags from the front while the producer appends
//! at the back. [`StreamBuffer`] wraps `BytesMut` so the front discard is
//! an amortized O(1) head-offset bump; the head space is reclaimed when a
//! later append needs capacity.

use bytes::{Buf, BytesMut};

/// Capacity is grown in whole increments to keep reallocation rare.
const BUFFER_INCREMENT: usize = 4096;

/// Growable byte buffer with cheap head-shift and tail-append
#[derive(Debug, Default)]
pub struct StreamBuffer {
    buf: BytesMut,
}

impl StreamBuffer {
    /// Create an empty buffer. No memory is allocated until the first append.
    pub fn new() -> Self {
        Self { buf: BytesMut::new() }
    }

    /// Append bytes at the back, growing capacity in [`BUFFER_INCREMENT`] steps.
    pub fn append(&mut self, data: &[u8]) {
        let needed = self.buf.len() + data.len();
        if needed > self.buf.capacity() {
            let rounded = needed.div_ceil(BUFFER_INCREMENT) * BUFFER_INCREMENT;
            self.buf.reserve(rounded - self.buf.len());
        }
        self.buf.extend_from_slice(data);
    }

    /// Contiguous view of the live region.
    pub fn view(&self) -> &[u8] {
        &self.buf
    }

    /// Mutable view of the live region, for in-place header rewrites.
    pub fn view_mut(&mut self) -> &mut [u8] {
        &mut self.buf
    }

    /// Logically discard the first `n` bytes of the live region.
    ///
    /// # Panics
    ///
    /// Panics if `n` exceeds the live region.
    pub fn shift(&mut self, n: usize) {
        self.buf.advance(n);
    }

    /// Length of the live region.
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Drop all contents and release the backing memory.
    pub fn clear(&mut self) {
        self.buf = BytesMut::new();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_then_view() {
        let mut buf = StreamBuffer::new();
        buf.append(b"hello");
        buf.append(b" world");
        assert_eq!(buf.view(), b"hello world");
        assert_eq!(buf.len(), 11);
    }

    #[test]
    fn test_shift_discards_front() {
        let mut buf = StreamBuffer::new();
        buf.append(b"abcdef");
        buf.shift(2);
        assert_eq!(buf.view(), b"cdef");

        // Appending after a shift keeps the remaining bytes intact.
        buf.append(b"gh");
        assert_eq!(buf.view(), b"cdefgh");
    }

    #[test]
    fn test_chunked_appends_then_full_shift_leaves_empty() {
        let mut buf = StreamBuffer::new();
        let mut total = 0;
        for chunk in [&b"ab"[..], &b""[..], &b"cdefg"[..], &b"h"[..]] {
            buf.append(chunk);
            total += chunk.len();
        }
        buf.shift(total);
        assert!(buf.is_empty());
        assert_eq!(buf.view(), b"");
    }

    #[test]
    fn test_capacity_grows_in_increments() {
        let mut buf = StreamBuffer::new();
        buf.append(&[0u8; 100]);
        assert!(buf.buf.capacity() >= BUFFER_INCREMENT);

        buf.append(&[0u8; BUFFER_INCREMENT]);
        assert!(buf.buf.capacity() >= 2 * BUFFER_INCREMENT);
    }

    #[test]
    fn test_clear_releases_memory() {
        let mut buf = StreamBuffer::new();
        buf.append(&[0u8; 8192]);
        buf.clear();
        assert!(buf.is_empty());
        assert_eq!(buf.buf.capacity(), 0);
    }

    #[test]
    fn test_view_mut_rewrites_in_place() {
        let mut buf = StreamBuffer::new();
        buf.append(b"xyz");
        buf.view_mut()[1] = b'!';
        assert_eq!(buf.view(), b"x!z");
    }
}
