//! Benchmark orchestration: the bandwidth suite over two primary buffers and
//! the latency suite over a size plan.

use crate::bandwidth::{self, BandwidthSample};
use crate::buffer::AlignedBuffer;
use crate::classify::Classifier;
use crate::config::BenchConfig;
use crate::error::{BenchError, BenchResult};
use crate::latency::{LatencyResult, measure_size};
use crate::plan::PlanEntry;
use crate::rng::IndexRng;
use log::{error, info, warn};

const PRIMARY_FILL: u8 = 0xAA;
const SECONDARY_FILL: u8 = 0x55;

/// The two buffers the bandwidth tests run over.
pub struct PrimaryBuffers {
    pub src: AlignedBuffer,
    pub dst: AlignedBuffer,
}

impl PrimaryBuffers {
    /// Allocate and initialise both buffers. Failing either one is fatal
    /// for the bandwidth suite.
    pub fn allocate(bytes: usize) -> BenchResult<Self> {
        info!("Initializing {bytes}-byte buffers");
        let src = AlignedBuffer::filled(bytes, PRIMARY_FILL)?;
        let dst = AlignedBuffer::filled(bytes, SECONDARY_FILL)?;
        Ok(PrimaryBuffers { src, dst })
    }
}

/// Run every bandwidth test in report order.
pub fn run_bandwidth(
    buffers: &mut PrimaryBuffers,
    cfg: &BenchConfig,
    rng: &mut IndexRng,
) -> Vec<BandwidthSample> {
    let PrimaryBuffers { src, dst } = buffers;
    vec![
        bandwidth::sequential_read(src, cfg.iterations),
        bandwidth::sequential_write(src, cfg.iterations),
        bandwidth::random_read(src, cfg.iterations, cfg.random_accesses, rng),
        bandwidth::random_write(src, cfg.iterations, cfg.random_accesses, rng),
        bandwidth::copy(src, dst, cfg.iterations),
    ]
}

/// Measure and classify every plan entry. Entries that cannot run are
/// reported and skipped; the remaining sizes still run.
pub fn run_latency(
    plan: &[PlanEntry],
    classifier: &Classifier,
    cfg: &BenchConfig,
    rng: &mut IndexRng,
) -> Vec<LatencyResult> {
    let mut results = Vec::with_capacity(plan.len());

    for entry in plan {
        let outcome = usize::try_from(entry.buffer_size_bytes)
            .map_err(|_| BenchError::AllocationFailure {
                bytes: usize::MAX,
            })
            .and_then(|size| measure_size(size, cfg.latency_accesses, cfg.line_size, rng));

        match outcome {
            Ok(measurement) => {
                let level = classifier.classify(entry.buffer_size_bytes, measurement.avg_latency_ns);
                results.push(LatencyResult {
                    label: entry.label.clone(),
                    buffer_size_bytes: entry.buffer_size_bytes,
                    measurement,
                    classified_level: level.to_string(),
                });
            }
            Err(e @ BenchError::InsufficientSize { .. }) => {
                warn!("Skipping latency test {}: {e}", entry.label);
            }
            Err(e) => {
                error!("Latency test {} failed: {e}", entry.label);
            }
        }
    }

    results
}
