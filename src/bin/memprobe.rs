//! Memory bandwidth and cache-hierarchy latency benchmark.
//!
//! Usage: `memprobe [SIZE_MB] [--latency-accesses N] [--core ID] ...`

use clap::Parser;
use log::{error, info, warn};
use memprobe_rs::classify::Classifier;
use memprobe_rs::config::{BenchConfig, Cli};
use memprobe_rs::rng::IndexRng;
use memprobe_rs::suite::{self, PrimaryBuffers};
use memprobe_rs::{plan, report, topology};
use std::process::ExitCode;

// use faster/smaller `mimalloc` allocator
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

/// Pin and prioritise the benchmark thread as requested. Failures only warn.
fn place_thread(cfg: &BenchConfig) {
    if let Some(cpu_num) = cfg.pin_core {
        let core_num = core_affinity::CoreId { id: cpu_num };
        if !core_affinity::set_for_current(core_num) {
            warn!("Couldn't pin benchmark to CPU core {cpu_num} (NOTE: this is expected on macOS)");
        } else {
            info!("Benchmark pinned to CPU core {cpu_num}");
        }
    }

    if cfg.max_priority
        && thread_priority::set_current_thread_priority(thread_priority::ThreadPriority::Max)
            .is_err()
    {
        warn!("Couldn't set benchmark thread to maximum priority");
    }
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cfg = BenchConfig::from_cli(Cli::parse());
    place_thread(&cfg);

    let cores = std::thread::available_parallelism().map_or(1, |n| n.get());
    println!("{}", report::header(&cfg, cores));

    let mut rng = IndexRng::from_clock();
    let topology = topology::discover();
    println!("{}", report::topology_table(&topology));

    if cfg.run_bandwidth {
        let mut buffers = match PrimaryBuffers::allocate(cfg.buffer_bytes()) {
            Ok(buffers) => buffers,
            Err(e) => {
                error!("Failed to allocate memory buffers: {e}");
                return ExitCode::FAILURE;
            }
        };

        println!("Running bandwidth tests...");
        println!("{}", report::bandwidth_header());
        for sample in suite::run_bandwidth(&mut buffers, &cfg, &mut rng) {
            println!("{}", report::bandwidth_line(&sample));
        }
        println!();
    }

    let classifier = Classifier::new(topology.clone());
    if cfg.run_latency {
        let plan = plan::plan(&topology);
        println!("Running memory access latency tests...");
        println!("{}", report::latency_header());
        for result in suite::run_latency(&plan, &classifier, &cfg, &mut rng) {
            println!("{}", report::latency_line(&result));
        }
        println!();
    }

    println!("{}", report::notes(&cfg, classifier.is_heuristic()));
    ExitCode::SUCCESS
}
