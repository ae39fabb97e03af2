//! Unbiased random index generation.
//!
//! Indices are derived by scaling the full 64-bit generator output onto the
//! requested range (multiply, then keep the high word) rather than by taking
//! a modulo, so low-order bit patterns of the generator never favour a
//! particular index.

use log::debug;
use rand::rngs::SmallRng;
use rand::{RngCore, SeedableRng};
use std::time::{SystemTime, UNIX_EPOCH};

/// Random index source for shuffles and random-access benchmarks.
///
/// Not suitable for anything security related.
#[derive(Debug, Clone)]
pub struct IndexRng {
    inner: SmallRng,
}

impl IndexRng {
    /// Seed once from the high-resolution clock. Meant to be called a single
    /// time per process and then threaded through every test.
    pub fn from_clock() -> Self {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default();
        let seed = nanos.as_secs() ^ u64::from(nanos.subsec_nanos()).rotate_left(32);
        debug!("Seeding index generator with {seed:#018x}");
        Self::with_seed(seed)
    }

    /// Deterministic generator, used by tests.
    pub fn with_seed(seed: u64) -> Self {
        IndexRng {
            inner: SmallRng::seed_from_u64(seed),
        }
    }

    /// Uniform index in `[0, bound)`. Returns 0 when `bound` is 0 or 1.
    #[inline]
    pub fn next_index(&mut self, bound: u64) -> u64 {
        let raw = self.inner.next_u64();
        ((u128::from(raw) * u128::from(bound)) >> 64) as u64
    }

    /// Uniform index in `[0, bound)` as a `usize`.
    #[inline]
    pub fn next_usize(&mut self, bound: usize) -> usize {
        self.next_index(bound as u64) as usize
    }

    /// Fill `out` with indices in `[0, bound)`.
    pub fn fill_indices(&mut self, out: &mut [usize], bound: usize) {
        for slot in out.iter_mut() {
            *slot = self.next_usize(bound);
        }
    }
}
