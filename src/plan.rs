//! Latency test-size planning.
//!
//! With a known hierarchy every data-capable level is bracketed by one size
//! that fits (half its capacity) and one that spills (one and a half times
//! its capacity). Without one a fixed ladder is used.

use crate::topology::CacheTopology;

const KIB: u64 = 1024;
const MIB: u64 = 1024 * KIB;

/// Upper bound on plan length.
pub const MAX_PLAN_ENTRIES: usize = 20;

/// Smallest size of every topology-driven plan.
const BASE_SIZE: u64 = 4 * KIB;

/// Fitting sizes below this are skipped.
const MIN_FIT_SIZE: u64 = 8 * KIB;

/// Main-memory sizes appended to every topology-driven plan.
const RAM_SIZES: [u64; 3] = [32 * MIB, 64 * MIB, 128 * MIB];

/// Sizes used when the hierarchy is unknown.
const FALLBACK_LADDER: [u64; 7] = [
    4 * KIB,
    16 * KIB,
    256 * KIB,
    MIB,
    4 * MIB,
    16 * MIB,
    64 * MIB,
];

/// One latency test to run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanEntry {
    pub buffer_size_bytes: u64,
    pub label: String,
}

impl PlanEntry {
    fn new(buffer_size_bytes: u64, label: String) -> Self {
        PlanEntry {
            buffer_size_bytes,
            label,
        }
    }
}

/// Latency test sizes for `topology`, ascending by size.
///
/// Only the levels the classifier can name are bracketed. Cache-derived
/// sizes below [`BASE_SIZE`] are dropped, and where a cache-derived size
/// equals a main-memory size the cache label wins.
pub fn plan(topology: &CacheTopology) -> Vec<PlanEntry> {
    if topology.is_empty() {
        return FALLBACK_LADDER
            .iter()
            .map(|&size| PlanEntry::new(size, size_label(size)))
            .collect();
    }

    let mut entries = vec![PlanEntry::new(BASE_SIZE, size_label(BASE_SIZE))];
    for cache in topology.data_caches() {
        let fit = cache.size_bytes / 2;
        if fit >= MIN_FIT_SIZE {
            entries.push(PlanEntry::new(
                fit,
                format!("{}(L{})", size_label(fit), cache.level),
            ));
        }
        let spill = cache.size_bytes + cache.size_bytes / 2;
        if spill > BASE_SIZE {
            entries.push(PlanEntry::new(
                spill,
                format!("{}(>L{})", size_label(spill), cache.level),
            ));
        }
    }

    entries.sort_by_key(|e| e.buffer_size_bytes);
    entries.dedup_by_key(|e| e.buffer_size_bytes);
    entries.truncate(MAX_PLAN_ENTRIES - RAM_SIZES.len());

    // Stable sort keeps cache entries ahead of equal-sized RAM entries, so
    // the dedup below drops the RAM duplicate.
    entries.extend(
        RAM_SIZES
            .iter()
            .map(|&size| PlanEntry::new(size, format!("{}(RAM)", size_label(size)))),
    );
    entries.sort_by_key(|e| e.buffer_size_bytes);
    entries.dedup_by_key(|e| e.buffer_size_bytes);
    entries
}

/// Compact size label such as `"4KB"`, `"1.5MB"` or `"128MB"`.
pub fn size_label(bytes: u64) -> String {
    let (unit, suffix) = if bytes >= MIB {
        (MIB, "MB")
    } else if bytes >= KIB {
        (KIB, "KB")
    } else {
        return format!("{bytes}B");
    };
    if bytes % unit == 0 {
        format!("{}{suffix}", bytes / unit)
    } else {
        format!("{:.1}{suffix}", bytes as f64 / unit as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::topology::{CacheDescriptor, CacheKind};

    fn sizes(entries: &[PlanEntry]) -> Vec<u64> {
        entries.iter().map(|e| e.buffer_size_bytes).collect()
    }

    fn labels(entries: &[PlanEntry]) -> Vec<&str> {
        entries.iter().map(|e| e.label.as_str()).collect()
    }

    #[test]
    fn unknown_topology_uses_fixed_ladder() {
        let p = plan(&CacheTopology::unknown());
        assert_eq!(
            labels(&p),
            vec!["4KB", "16KB", "256KB", "1MB", "4MB", "16MB", "64MB"]
        );
    }

    #[test]
    fn desktop_hierarchy_is_bracketed() {
        let topo = CacheTopology::from_descriptors(vec![
            CacheDescriptor::new(1, CacheKind::Data, 32 * KIB),
            CacheDescriptor::new(1, CacheKind::Instruction, 32 * KIB),
            CacheDescriptor::new(2, CacheKind::Unified, MIB),
            CacheDescriptor::new(3, CacheKind::Unified, 16 * MIB),
        ]);
        let p = plan(&topo);
        assert_eq!(
            labels(&p),
            vec![
                "4KB",
                "16KB(L1)",
                "48KB(>L1)",
                "512KB(L2)",
                "1.5MB(>L2)",
                "8MB(L3)",
                "24MB(>L3)",
                "32MB(RAM)",
                "64MB(RAM)",
                "128MB(RAM)",
            ]
        );
    }

    #[test]
    fn small_fit_sizes_are_skipped() {
        let topo =
            CacheTopology::from_descriptors(vec![CacheDescriptor::new(1, CacheKind::Data, 8 * KIB)]);
        let p = plan(&topo);
        assert_eq!(labels(&p)[..2], ["4KB", "12KB(>L1)"]);
    }

    #[test]
    fn plans_are_ascending_and_end_in_ram_sizes() {
        let topo = CacheTopology::from_descriptors(vec![
            CacheDescriptor::new(2, CacheKind::Unified, 2 * MIB),
            CacheDescriptor::new(3, CacheKind::Unified, 4 * MIB),
            CacheDescriptor::new(3, CacheKind::Unified, 96 * MIB),
        ]);
        let p = plan(&topo);
        let s = sizes(&p);
        assert!(s.windows(2).all(|w| w[0] <= w[1]), "{s:?}");
        for size in RAM_SIZES {
            assert!(p.iter().any(|e| e.buffer_size_bytes == size && e.label.ends_with("(RAM)")));
        }
        assert!(p.len() <= MAX_PLAN_ENTRIES);
        assert_eq!(p.last().unwrap().label, "144MB(>L3)");
    }

    #[test]
    fn tiny_caches_never_precede_base_size() {
        let topo =
            CacheTopology::from_descriptors(vec![CacheDescriptor::new(1, CacheKind::Data, 2 * KIB)]);
        let p = plan(&topo);
        assert_eq!(labels(&p), vec!["4KB", "32MB(RAM)", "64MB(RAM)", "128MB(RAM)"]);
    }

    #[test]
    fn cache_label_wins_over_equal_ram_size() {
        let topo = CacheTopology::from_descriptors(vec![CacheDescriptor::new(
            3,
            CacheKind::Unified,
            64 * MIB,
        )]);
        let p = plan(&topo);
        assert_eq!(
            labels(&p),
            vec!["4KB", "32MB(L3)", "64MB(RAM)", "96MB(>L3)", "128MB(RAM)"]
        );
        let s = sizes(&p);
        assert!(s.windows(2).all(|w| w[0] < w[1]), "{s:?}");
    }

    #[test]
    fn untyped_caches_are_not_bracketed() {
        let topo = CacheTopology::from_descriptors(vec![
            CacheDescriptor::new(1, CacheKind::Data, 32 * KIB),
            CacheDescriptor::new(2, CacheKind::Unknown, 2 * MIB),
        ]);
        let p = plan(&topo);
        assert_eq!(
            labels(&p),
            vec!["4KB", "16KB(L1)", "48KB(>L1)", "32MB(RAM)", "64MB(RAM)", "128MB(RAM)"]
        );
        let classifier = crate::classify::Classifier::new(topo);
        assert_eq!(classifier.classify(MIB, 20.0).to_string(), "Main Memory");
    }

    #[test]
    fn plan_is_deterministic() {
        let topo =
            CacheTopology::from_descriptors(vec![CacheDescriptor::new(2, CacheKind::Unified, 256 * KIB)]);
        assert_eq!(plan(&topo), plan(&topo));
    }

    #[test]
    fn size_labels() {
        assert_eq!(size_label(512), "512B");
        assert_eq!(size_label(4 * KIB), "4KB");
        assert_eq!(size_label(48 * KIB), "48KB");
        assert_eq!(size_label(1536 * KIB), "1.5MB");
        assert_eq!(size_label(128 * MIB), "128MB");
    }
}
