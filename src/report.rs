//! Human-readable report formatting.
//!
//! Every function returns the text to print so the binary decides where it
//! goes.

use crate::bandwidth::BandwidthSample;
use crate::config::BenchConfig;
use crate::latency::LatencyResult;
use crate::topology::CacheTopology;

const RULE: &str = "------------------------------------------------------------------------";

/// Convert number of bytes to formatted string
pub fn format_size(bytes: f64) -> String {
    const GB: f64 = 1024.0 * 1024.0 * 1024.0;
    const MB: f64 = 1024.0 * 1024.0;
    const KB: f64 = 1024.0;

    if bytes >= GB {
        format!("{:.2} GiB", bytes / GB)
    } else if bytes >= MB {
        format!("{:.2} MiB", bytes / MB)
    } else if bytes >= KB {
        format!("{:.2} KiB", bytes / KB)
    } else {
        format!("{:.2} B", bytes)
    }
}

/// Convert number of bytes to formatted string for fixed-width integer string
pub fn format_size_fixed_int(bytes: u64) -> String {
    const GB: u64 = 1024 * 1024 * 1024;
    const MB: u64 = 1024 * 1024;
    const KB: u64 = 1024;

    if bytes >= GB && bytes % GB == 0 {
        format!("{:>4} GiB", bytes / GB)
    } else if bytes >= MB && bytes % MB == 0 {
        format!("{:>4} MiB", bytes / MB)
    } else if bytes >= KB && bytes % KB == 0 {
        format!("{:>4} KiB", bytes / KB)
    } else if bytes >= KB {
        format_size(bytes as f64)
    } else {
        format!("{:>4} B", bytes)
    }
}

pub fn header(cfg: &BenchConfig, cores: usize) -> String {
    [
        "Memory Bandwidth & Latency Test".to_string(),
        "===============================".to_string(),
        format!(
            "Buffer size: {} MB ({} bytes)",
            cfg.size_mb,
            cfg.buffer_bytes()
        ),
        format!("Iterations: {}", cfg.iterations),
        format!("Random accesses per iteration: {}", cfg.random_accesses),
        format!("Latency accesses per size: {}", cfg.latency_accesses),
        format!("CPU cores available: {cores}"),
    ]
    .join("\n")
}

pub fn topology_table(topology: &CacheTopology) -> String {
    if topology.is_empty() {
        return "Detected cache hierarchy:\n  (not available, latency levels use heuristic thresholds)"
            .to_string();
    }
    let mut lines = vec![
        "Detected cache hierarchy:".to_string(),
        format!(
            "  {:<6} {:<12} {:>10} {:>6} {:>6} {:>6}",
            "Level", "Type", "Size", "Line", "Ways", "CPUs"
        ),
    ];
    lines.extend(topology.caches().iter().map(|c| {
        format!(
            "  {:<6} {:<12} {:>10} {:>6} {:>6} {:>6}",
            format!("L{}", c.level),
            c.kind.to_string(),
            format_size_fixed_int(c.size_bytes),
            c.line_size_bytes,
            c.associativity,
            c.shared_cpu_count
        )
    }));
    lines.join("\n")
}

pub fn bandwidth_header() -> String {
    format!("{:<20}  {:<50}\n{RULE}", "Test", "Bandwidth")
}

pub fn bandwidth_line(sample: &BandwidthSample) -> String {
    match sample.miops() {
        Some(miops) => format!(
            "{:<20}: {:>8.3} GB/s ({:>8.1} MB/s) - {:.1} MIOPS - Time: {:.3} seconds",
            sample.name,
            sample.gib_per_sec(),
            sample.mib_per_sec(),
            miops,
            sample.seconds
        ),
        None => format!(
            "{:<20}: {:>8.3} GB/s ({:>8.1} MB/s) - Time: {:.3} seconds",
            sample.name,
            sample.gib_per_sec(),
            sample.mib_per_sec(),
            sample.seconds
        ),
    }
}

pub fn latency_header() -> String {
    format!(
        "{:<14} {:>12} {:>12} {:<13} {:>10}\n{RULE}",
        "Buffer Size", "ns/access", "us/access", "Level", "Accesses"
    )
}

pub fn latency_line(result: &LatencyResult) -> String {
    let m = &result.measurement;
    let flag = if m.low_confidence { "  (low confidence)" } else { "" };
    format!(
        "{:<14} {:>12.1} {:>12.3} {:<13} {:>10}{flag}",
        result.label,
        m.avg_latency_ns,
        m.avg_latency_ns / 1000.0,
        result.classified_level,
        m.accesses
    )
}

/// Closing notes, covering only the test groups that actually ran.
pub fn notes(cfg: &BenchConfig, heuristic: bool) -> String {
    let mut lines = vec!["Notes:".to_string()];
    if cfg.run_bandwidth {
        lines.extend([
            "- Sequential Read/Write: linear memory access patterns".to_string(),
            "- Random Read/Write: uniformly random word accesses".to_string(),
            "- Memory Copy: combined read+write bandwidth".to_string(),
            "- MIOPS: million operations per second".to_string(),
            format!(
                "- Random tests use {} accesses per iteration",
                cfg.random_accesses
            ),
        ]);
    }
    if cfg.run_latency {
        lines.push(format!(
            "- Latency tests chase {} dependent pointers through a random single-cycle chain of {}-byte slots",
            cfg.latency_accesses, cfg.line_size
        ));
        if heuristic {
            lines.push("- Cache levels were guessed from uncalibrated latency thresholds".to_string());
        }
    }
    lines.push("- Results may vary based on CPU cache, memory type, and system load".to_string());
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::latency::LatencyMeasurement;
    use crate::topology::{CacheDescriptor, CacheKind};

    #[test]
    fn sizes_are_formatted() {
        assert_eq!(format_size(512.0), "512.00 B");
        assert_eq!(format_size(1536.0), "1.50 KiB");
        assert_eq!(format_size_fixed_int(48 * 1024), "  48 KiB");
        assert_eq!(format_size_fixed_int(32 * 1024 * 1024), "  32 MiB");
        assert_eq!(format_size_fixed_int(1536 * 1024), "1536 KiB");
        assert_eq!(format_size_fixed_int(1500), "1.46 KiB");
        assert_eq!(format_size_fixed_int(12), "  12 B");
    }

    #[test]
    fn header_reports_buffer() {
        let text = header(&BenchConfig::default(), 8);
        assert!(text.contains("Buffer size: 64 MB (67108864 bytes)"));
        assert!(text.contains("CPU cores available: 8"));
    }

    #[test]
    fn topology_table_lists_every_cache() {
        let topo = CacheTopology::from_descriptors(vec![
            CacheDescriptor::new(1, CacheKind::Data, 32 * 1024),
            CacheDescriptor::new(3, CacheKind::Unified, 16 * 1024 * 1024),
        ]);
        let text = topology_table(&topo);
        assert!(text.contains("L1     Data"));
        assert!(text.contains("16 MiB"));
        assert!(topology_table(&CacheTopology::unknown()).contains("not available"));
    }

    #[test]
    fn notes_follow_the_tests_that_ran() {
        let full = notes(&BenchConfig::default(), true);
        assert!(full.contains("Sequential Read/Write"));
        assert!(full.contains("dependent pointers"));
        assert!(full.contains("uncalibrated"));

        let latency_only = BenchConfig {
            run_bandwidth: false,
            ..BenchConfig::default()
        };
        let text = notes(&latency_only, false);
        assert!(!text.contains("Sequential Read"));
        assert!(!text.contains("MIOPS"));
        assert!(text.contains("dependent pointers"));
        assert!(!text.contains("uncalibrated"));

        let bandwidth_only = BenchConfig {
            run_latency: false,
            ..BenchConfig::default()
        };
        let text = notes(&bandwidth_only, true);
        assert!(text.contains("Memory Copy"));
        assert!(!text.contains("dependent pointers"));
        assert!(!text.contains("uncalibrated"));
    }

    #[test]
    fn random_lines_include_miops() {
        let sample = BandwidthSample {
            name: "Random Read",
            seconds: 1.0,
            bytes: 8_000_000,
            accesses: Some(1_000_000),
        };
        assert!(bandwidth_line(&sample).contains("1.0 MIOPS"));
        let seq = BandwidthSample {
            accesses: None,
            ..sample
        };
        assert!(!bandwidth_line(&seq).contains("MIOPS"));
    }

    #[test]
    fn latency_line_marks_low_confidence() {
        let result = LatencyResult {
            label: "16KB(L1)".into(),
            buffer_size_bytes: 16 * 1024,
            measurement: LatencyMeasurement {
                avg_latency_ns: 1.25,
                elapsed_secs: 5e-7,
                accesses: 400,
                slots: 256,
                low_confidence: true,
            },
            classified_level: "L1 Cache".into(),
        };
        let line = latency_line(&result);
        assert!(line.starts_with("16KB(L1)"));
        assert!(line.contains("400"));
        assert!(line.contains("L1 Cache"));
        assert!(line.ends_with("(low confidence)"));
    }
}
