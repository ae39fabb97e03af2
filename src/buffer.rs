//! Cache-line aligned heap buffers with scoped lifetime.

use crate::error::{BenchError, BenchResult};
use std::alloc::{self, Layout};
use std::ops::{Deref, DerefMut};
use std::ptr::{self, NonNull};

/// Alignment of every benchmark buffer.
pub const CACHE_LINE_ALIGN: usize = 64;

/// Owned, aligned byte buffer. Memory is released when the value is dropped.
pub struct AlignedBuffer {
    ptr: NonNull<u8>,
    layout: Layout,
}

impl AlignedBuffer {
    /// Allocate `len` bytes aligned to [`CACHE_LINE_ALIGN`] and set every
    /// byte to `fill`, which also forces the pages to be backed.
    pub fn filled(len: usize, fill: u8) -> BenchResult<Self> {
        let layout = Layout::from_size_align(len, CACHE_LINE_ALIGN)
            .map_err(|_| BenchError::AllocationFailure { bytes: len })?;
        if layout.size() == 0 {
            return Err(BenchError::AllocationFailure { bytes: 0 });
        }

        // SAFETY: layout has a non-zero size.
        let raw = unsafe { alloc::alloc(layout) };
        let ptr = NonNull::new(raw).ok_or(BenchError::AllocationFailure { bytes: len })?;

        // SAFETY: `ptr` is valid for `len` writes.
        unsafe { ptr::write_bytes(ptr.as_ptr(), fill, len) };

        Ok(AlignedBuffer { ptr, layout })
    }

    /// The buffer viewed as whole 64-bit words; a trailing partial word is
    /// not included.
    pub fn words(&self) -> &[u64] {
        // SAFETY: the base is 64-byte aligned, the length is rounded down to
        // whole words and every bit pattern is a valid `u64`.
        unsafe { std::slice::from_raw_parts(self.ptr.as_ptr().cast::<u64>(), self.layout.size() / 8) }
    }

    pub fn words_mut(&mut self) -> &mut [u64] {
        // SAFETY: as in `words`, with exclusive access through `&mut self`.
        unsafe { std::slice::from_raw_parts_mut(self.ptr.as_ptr().cast::<u64>(), self.layout.size() / 8) }
    }
}

impl Deref for AlignedBuffer {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        // SAFETY: the allocation is initialised and lives as long as `self`.
        unsafe { std::slice::from_raw_parts(self.ptr.as_ptr(), self.layout.size()) }
    }
}

impl DerefMut for AlignedBuffer {
    fn deref_mut(&mut self) -> &mut [u8] {
        // SAFETY: as above, and `&mut self` guarantees exclusive access.
        unsafe { std::slice::from_raw_parts_mut(self.ptr.as_ptr(), self.layout.size()) }
    }
}

impl Drop for AlignedBuffer {
    fn drop(&mut self) {
        // SAFETY: allocated in `filled` with exactly this layout.
        unsafe { alloc::dealloc(self.ptr.as_ptr(), self.layout) };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filled_buffer_is_aligned_and_initialised() {
        let buf = AlignedBuffer::filled(4096 + 7, 0xAA).unwrap();
        assert_eq!(buf.len(), 4103);
        assert_eq!(buf.as_ptr() as usize % CACHE_LINE_ALIGN, 0);
        assert!(buf.iter().all(|&b| b == 0xAA));
    }

    #[test]
    fn writes_are_visible_through_deref() {
        let mut buf = AlignedBuffer::filled(128, 0).unwrap();
        buf[127] = 9;
        assert_eq!(buf[127], 9);
    }

    #[test]
    fn word_view_covers_whole_words() {
        let mut buf = AlignedBuffer::filled(8 * 5 + 3, 0).unwrap();
        assert_eq!(buf.words().len(), 5);
        buf.words_mut()[4] = u64::MAX;
        assert!(buf[32..40].iter().all(|&b| b == 0xFF));
        assert!(buf[40..].iter().all(|&b| b == 0));
    }

    #[test]
    fn length_comes_from_the_byte_view() {
        let buf = AlignedBuffer::filled(1, 0).unwrap();
        assert_eq!(buf.len(), 1);
        assert!(!buf.is_empty());
    }

    #[test]
    fn zero_length_is_rejected() {
        assert!(matches!(
            AlignedBuffer::filled(0, 0),
            Err(BenchError::AllocationFailure { bytes: 0 })
        ));
    }

    #[test]
    fn absurd_length_fails_cleanly() {
        assert!(matches!(
            AlignedBuffer::filled(usize::MAX - 8, 0),
            Err(BenchError::AllocationFailure { .. })
        ));
    }
}
