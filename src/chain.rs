//! Pointer-chase chain construction and traversal.
//!
//! A buffer is cut into `n` line-sized slots. A uniformly shuffled ordering of
//! the slots is linked into a ring, so each slot's first word holds the byte
//! offset of the next slot and following the offsets visits every slot once
//! per lap. Linking consecutive positions of one permutation can only ever
//! produce a single cycle of length `n`.

use crate::error::{BenchError, BenchResult};
use crate::rng::IndexRng;
use std::hint::black_box;
use std::mem::{align_of, size_of};
use std::ptr;
use std::sync::atomic::{Ordering, fence};

/// Granularity used when no cache line size is known.
pub const DEFAULT_LINE_SIZE: usize = 64;

const WORD: usize = size_of::<usize>();

/// A built chain, borrowing the buffer it lives in.
#[derive(Debug, Clone, Copy)]
pub struct Chain<'a> {
    buf: &'a [u8],
    slots: usize,
    line_size: usize,
}

/// Link the first `total_bytes` of `buffer` into a single random cycle of
/// `line_size`-byte slots.
///
/// Besides writing the successor offsets, the last byte of each slot is
/// written so that every page of the chain is physically backed before it is
/// timed.
pub fn build_chain<'a>(
    buffer: &'a mut [u8],
    total_bytes: usize,
    line_size: usize,
    rng: &mut IndexRng,
) -> BenchResult<Chain<'a>> {
    if line_size <= WORD || line_size % WORD != 0 {
        return Err(BenchError::InvalidLineSize { line_size });
    }
    if total_bytes > buffer.len() {
        return Err(BenchError::BufferTooShort {
            total_bytes,
            len: buffer.len(),
        });
    }
    if buffer.as_ptr() as usize % align_of::<usize>() != 0 {
        return Err(BenchError::MisalignedBuffer);
    }
    let slots = total_bytes / line_size;
    if slots < 2 {
        return Err(BenchError::InsufficientSize {
            total_bytes,
            line_size,
        });
    }

    fence(Ordering::SeqCst);

    // Fisher-Yates
    let mut order: Vec<usize> = (0..slots).collect();
    for i in (1..slots).rev() {
        let j = rng.next_usize(i + 1);
        order.swap(i, j);
    }

    for (pos, &slot) in order.iter().enumerate() {
        let next = order[(pos + 1) % slots];
        let at = slot * line_size;
        buffer[at..at + WORD].copy_from_slice(&(next * line_size).to_ne_bytes());
    }

    for slot in 0..slots {
        buffer[slot * line_size + line_size - 1] = slot as u8;
    }

    fence(Ordering::SeqCst);

    Ok(Chain {
        buf: &*buffer,
        slots,
        line_size,
    })
}

impl<'a> Chain<'a> {
    /// Number of slots in the cycle.
    pub fn slots(&self) -> usize {
        self.slots
    }

    pub fn line_size(&self) -> usize {
        self.line_size
    }

    /// Bytes covered by the chain.
    pub fn span(&self) -> usize {
        self.slots * self.line_size
    }

    /// Byte offset stored in the slot starting at `offset`.
    pub fn successor(&self, offset: usize) -> usize {
        let mut word = [0u8; WORD];
        word.copy_from_slice(&self.buf[offset..offset + WORD]);
        usize::from_ne_bytes(word)
    }

    /// Follow `hops` successor pointers from the slot at `start` and return
    /// the offset reached.
    ///
    /// Each load is volatile and its address depends on the value of the
    /// previous load, so the hops can neither be elided nor overlapped.
    #[inline(never)]
    pub fn chase(&self, start: usize, hops: usize) -> usize {
        assert!(
            start < self.span() && start % self.line_size == 0,
            "chase must start on a slot boundary"
        );
        let base = self.buf.as_ptr();
        let mut offset = start;

        // SAFETY: `start` is a slot start and every stored offset is a slot
        // start inside `buf`; slot starts are word aligned because the buffer
        // base is and `line_size` is a multiple of the word size.
        let load = |offset: usize| unsafe { ptr::read_volatile(base.add(offset).cast::<usize>()) };

        // Unroll 8x to reduce loop overhead relative to memory latency
        for _ in 0..hops / 8 {
            offset = load(offset);
            offset = load(offset);
            offset = load(offset);
            offset = load(offset);
            offset = load(offset);
            offset = load(offset);
            offset = load(offset);
            offset = load(offset);
        }
        for _ in 0..hops % 8 {
            offset = load(offset);
        }

        black_box(offset)
    }
}
