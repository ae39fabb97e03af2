//! Command-line configuration.
//!
//! Invalid numeric input never aborts a run: it falls back to the default
//! with a warning.

use crate::bandwidth::{DEFAULT_ITERATIONS, DEFAULT_RANDOM_ACCESSES};
use crate::chain::DEFAULT_LINE_SIZE;
use crate::latency::DEFAULT_LATENCY_ACCESSES;
use clap::Parser;
use log::warn;

/// Bandwidth buffer size used when none (or an invalid one) is given.
pub const DEFAULT_SIZE_MB: usize = 64;

const MIB: usize = 1024 * 1024;

#[derive(Parser, Debug)]
#[command(
    name = "memprobe",
    version,
    about = "Memory bandwidth and cache-hierarchy latency benchmark"
)]
pub struct Cli {
    /// Bandwidth test buffer size in MiB
    #[arg(value_name = "SIZE_MB", allow_negative_numbers = true)]
    pub size_mb: Option<String>,

    /// Passes over the buffer per bandwidth test
    #[arg(long, default_value_t = DEFAULT_ITERATIONS)]
    pub iterations: usize,

    /// Random accesses per iteration in random bandwidth tests
    #[arg(long, default_value_t = DEFAULT_RANDOM_ACCESSES)]
    pub random_accesses: usize,

    /// Dependent loads timed per latency test size
    #[arg(long, default_value_t = DEFAULT_LATENCY_ACCESSES)]
    pub latency_accesses: usize,

    /// Pointer-chase slot size in bytes
    #[arg(long, default_value_t = DEFAULT_LINE_SIZE)]
    pub line_size: usize,

    /// Pin the benchmark thread to this CPU core
    #[arg(long, value_name = "ID")]
    pub core: Option<usize>,

    /// Run the benchmark thread at maximum priority
    #[arg(long)]
    pub max_priority: bool,

    /// Skip the bandwidth tests
    #[arg(long)]
    pub skip_bandwidth: bool,

    /// Skip the latency tests
    #[arg(long)]
    pub skip_latency: bool,
}

/// Fully resolved benchmark settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BenchConfig {
    pub size_mb: usize,
    pub iterations: usize,
    pub random_accesses: usize,
    pub latency_accesses: usize,
    pub line_size: usize,
    pub pin_core: Option<usize>,
    pub max_priority: bool,
    pub run_bandwidth: bool,
    pub run_latency: bool,
}

impl Default for BenchConfig {
    fn default() -> Self {
        BenchConfig {
            size_mb: DEFAULT_SIZE_MB,
            iterations: DEFAULT_ITERATIONS,
            random_accesses: DEFAULT_RANDOM_ACCESSES,
            latency_accesses: DEFAULT_LATENCY_ACCESSES,
            line_size: DEFAULT_LINE_SIZE,
            pin_core: None,
            max_priority: false,
            run_bandwidth: true,
            run_latency: true,
        }
    }
}

impl BenchConfig {
    pub fn from_cli(cli: Cli) -> Self {
        BenchConfig {
            size_mb: parse_size_mb(cli.size_mb.as_deref()),
            iterations: non_zero_or(cli.iterations, DEFAULT_ITERATIONS, "--iterations"),
            random_accesses: non_zero_or(
                cli.random_accesses,
                DEFAULT_RANDOM_ACCESSES,
                "--random-accesses",
            ),
            latency_accesses: non_zero_or(
                cli.latency_accesses,
                DEFAULT_LATENCY_ACCESSES,
                "--latency-accesses",
            ),
            line_size: non_zero_or(cli.line_size, DEFAULT_LINE_SIZE, "--line-size"),
            pin_core: cli.core,
            max_priority: cli.max_priority,
            run_bandwidth: !cli.skip_bandwidth,
            run_latency: !cli.skip_latency,
        }
    }

    /// Bandwidth buffer size in bytes.
    pub fn buffer_bytes(&self) -> usize {
        self.size_mb.saturating_mul(MIB)
    }
}

/// Interpret the positional size argument, falling back to
/// [`DEFAULT_SIZE_MB`] on missing, non-numeric, zero or oversized input.
pub fn parse_size_mb(raw: Option<&str>) -> usize {
    let Some(raw) = raw else {
        return DEFAULT_SIZE_MB;
    };
    match raw.trim().parse::<usize>() {
        Ok(mb) if mb > 0 && mb.checked_mul(MIB).is_some() => mb,
        _ => {
            warn!("Invalid size specified ({raw:?}). Using default {DEFAULT_SIZE_MB} MB");
            DEFAULT_SIZE_MB
        }
    }
}

fn non_zero_or(value: usize, default: usize, flag: &str) -> usize {
    if value == 0 {
        warn!("{flag} must be positive, using default {default}");
        default
    } else {
        value
    }
}
