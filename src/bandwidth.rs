//! Sequential, random and copy bandwidth tests.
//!
//! Straight timed loops over 64-bit words. Random tests pre-generate their
//! indices so index generation stays outside the timed region.

use crate::buffer::AlignedBuffer;
use crate::rng::IndexRng;
use crate::timer;
use std::hint::black_box;

/// Passes over the buffer per bandwidth test
pub const DEFAULT_ITERATIONS: usize = 3;

/// Number of random accesses per iteration
pub const DEFAULT_RANDOM_ACCESSES: usize = 1_000_000;

const WORD_BYTES: u64 = 8;
const GIB: f64 = 1024.0 * 1024.0 * 1024.0;

/// Timing of one bandwidth test.
#[derive(Debug, Clone, PartialEq)]
pub struct BandwidthSample {
    pub name: &'static str,
    pub seconds: f64,
    /// Bytes moved across all iterations.
    pub bytes: u64,
    /// Individual accesses, for random-access tests only.
    pub accesses: Option<u64>,
}

impl BandwidthSample {
    pub fn gib_per_sec(&self) -> f64 {
        if self.seconds > 0.0 {
            self.bytes as f64 / GIB / self.seconds
        } else {
            0.0
        }
    }

    pub fn mib_per_sec(&self) -> f64 {
        self.gib_per_sec() * 1024.0
    }

    /// Million operations per second.
    pub fn miops(&self) -> Option<f64> {
        self.accesses.map(|n| {
            if self.seconds > 0.0 {
                n as f64 / self.seconds / 1e6
            } else {
                0.0
            }
        })
    }
}

/// Sum every word of the buffer, `iterations` times.
pub fn sequential_read(buf: &AlignedBuffer, iterations: usize) -> BandwidthSample {
    let words = buf.words();
    let ((), seconds) = timer::time(|| {
        for _ in 0..iterations {
            let sum = words.iter().fold(0u64, |acc, &w| acc.wrapping_add(w));
            black_box(sum);
        }
    });
    BandwidthSample {
        name: "Sequential Read",
        seconds,
        bytes: words.len() as u64 * WORD_BYTES * iterations as u64,
        accesses: None,
    }
}

/// Store each word's index into it, `iterations` times.
pub fn sequential_write(buf: &mut AlignedBuffer, iterations: usize) -> BandwidthSample {
    let words = buf.words_mut();
    let bytes = words.len() as u64 * WORD_BYTES * iterations as u64;
    let ((), seconds) = timer::time(|| {
        for _ in 0..iterations {
            for (i, w) in words.iter_mut().enumerate() {
                *w = i as u64;
            }
            black_box(&mut *words);
        }
    });
    BandwidthSample {
        name: "Sequential Write",
        seconds,
        bytes,
        accesses: None,
    }
}

/// Read `accesses` uniformly random words per iteration.
pub fn random_read(
    buf: &AlignedBuffer,
    iterations: usize,
    accesses: usize,
    rng: &mut IndexRng,
) -> BandwidthSample {
    let words = buf.words();
    let indices = random_indices(accesses, words.len(), rng);
    let ((), seconds) = timer::time(|| {
        for _ in 0..iterations {
            let mut sum = 0u64;
            for &i in &indices {
                sum = sum.wrapping_add(words[i]);
            }
            black_box(sum);
        }
    });
    random_sample("Random Read", seconds, indices.len(), iterations)
}

/// Write `accesses` uniformly random words per iteration.
pub fn random_write(
    buf: &mut AlignedBuffer,
    iterations: usize,
    accesses: usize,
    rng: &mut IndexRng,
) -> BandwidthSample {
    let words = buf.words_mut();
    let indices = random_indices(accesses, words.len(), rng);
    let ((), seconds) = timer::time(|| {
        for _ in 0..iterations {
            for (n, &i) in indices.iter().enumerate() {
                words[i] = n as u64;
            }
            black_box(&mut *words);
        }
    });
    random_sample("Random Write", seconds, indices.len(), iterations)
}

/// Copy `src` into `dst`, `iterations` times. Both the read and the write side
/// count towards the bytes moved.
pub fn copy(src: &AlignedBuffer, dst: &mut AlignedBuffer, iterations: usize) -> BandwidthSample {
    let len = src.len().min(dst.len());
    let ((), seconds) = timer::time(|| {
        for _ in 0..iterations {
            dst[..len].copy_from_slice(&src[..len]);
            black_box(&mut dst[..len]);
        }
    });
    BandwidthSample {
        name: "Memory Copy",
        seconds,
        bytes: 2 * len as u64 * iterations as u64,
        accesses: None,
    }
}

fn random_indices(accesses: usize, words: usize, rng: &mut IndexRng) -> Vec<usize> {
    if words == 0 {
        return Vec::new();
    }
    let mut indices = vec![0usize; accesses];
    rng.fill_indices(&mut indices, words);
    indices
}

fn random_sample(
    name: &'static str,
    seconds: f64,
    accesses: usize,
    iterations: usize,
) -> BandwidthSample {
    let total = accesses as u64 * iterations as u64;
    BandwidthSample {
        name,
        seconds,
        bytes: total * WORD_BYTES,
        accesses: Some(total),
    }
}
