//! Per-access latency measurement by pointer chasing.

use crate::buffer::AlignedBuffer;
use crate::chain::build_chain;
use crate::error::{BenchError, BenchResult};
use crate::rng::IndexRng;
use crate::timer;
use log::{debug, warn};
use std::sync::atomic::{Ordering, fence};

/// Number of accesses per latency test
pub const DEFAULT_LATENCY_ACCESSES: usize = 100_000;

/// Warm-up laps over the whole chain before timing starts.
const WARMUP_LAPS: usize = 3;

/// Total times below this are dominated by timer resolution.
const MIN_RELIABLE_SECS: f64 = 1e-6;

/// Fill pattern written before the chain is built.
const LATENCY_FILL: u8 = 0xCC;

/// Outcome of one timed traversal.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LatencyMeasurement {
    pub avg_latency_ns: f64,
    pub elapsed_secs: f64,
    pub accesses: usize,
    pub slots: usize,
    /// Set when the total elapsed time was too short to trust.
    pub low_confidence: bool,
}

/// A labeled, classified latency measurement ready for reporting.
#[derive(Debug, Clone, PartialEq)]
pub struct LatencyResult {
    pub label: String,
    pub buffer_size_bytes: u64,
    pub measurement: LatencyMeasurement,
    pub classified_level: String,
}

/// Build a chain over the first `total_bytes` of `buffer`, warm it up, then
/// time exactly `num_accesses` dependent loads.
pub fn measure(
    buffer: &mut [u8],
    total_bytes: usize,
    num_accesses: usize,
    line_size: usize,
    rng: &mut IndexRng,
) -> BenchResult<LatencyMeasurement> {
    if num_accesses == 0 {
        return Err(BenchError::ZeroAccesses);
    }

    let chain = build_chain(buffer, total_bytes, line_size, rng)?;
    let slots = chain.slots();

    let parked = chain.chase(0, WARMUP_LAPS * slots);
    fence(Ordering::SeqCst);

    let start = timer::now();
    let end_offset = chain.chase(parked, num_accesses);
    let end = timer::now();
    fence(Ordering::SeqCst);

    let elapsed_secs = timer::elapsed(start, end);
    debug!("{slots} slots, {num_accesses} hops in {elapsed_secs:.9} s, ended at offset {end_offset}");

    let low_confidence = elapsed_secs < MIN_RELIABLE_SECS;
    if low_confidence {
        warn!(
            "Latency run over {total_bytes} bytes took only {:.3} us; result is likely a timer resolution artifact",
            elapsed_secs * 1e6
        );
    }

    Ok(LatencyMeasurement {
        avg_latency_ns: elapsed_secs * 1e9 / num_accesses as f64,
        elapsed_secs,
        accesses: num_accesses,
        slots,
        low_confidence,
    })
}

/// Allocate a fresh buffer of `size_bytes`, measure it and release it.
pub fn measure_size(
    size_bytes: usize,
    num_accesses: usize,
    line_size: usize,
    rng: &mut IndexRng,
) -> BenchResult<LatencyMeasurement> {
    let mut buffer = AlignedBuffer::filled(size_bytes, LATENCY_FILL)?;
    measure(&mut buffer, size_bytes, num_accesses, line_size, rng)
}
