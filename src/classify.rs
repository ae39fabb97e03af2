//! Mapping working-set sizes and latencies onto the cache hierarchy.

use crate::topology::CacheTopology;
use std::fmt;

const KIB: u64 = 1024;
const MIB: u64 = 1024 * KIB;

/// Latency thresholds used when no topology is known.
///
/// These are rough figures for desktop parts of a particular era, not
/// calibrated values; treat them as a replaceable default.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HeuristicThresholds {
    pub l1_max_bytes: u64,
    pub l1_max_ns: f64,
    pub l2_max_bytes: u64,
    pub l2_max_ns: f64,
    pub l3_max_bytes: u64,
    pub l3_max_ns: f64,
}

impl Default for HeuristicThresholds {
    fn default() -> Self {
        HeuristicThresholds {
            l1_max_bytes: 32 * KIB,
            l1_max_ns: 5.0,
            l2_max_bytes: 512 * KIB,
            l2_max_ns: 15.0,
            l3_max_bytes: 8 * MIB,
            l3_max_ns: 50.0,
        }
    }
}

/// Where a working set is expected to live.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MemoryLevel {
    Cache(u32),
    MainMemory,
}

impl MemoryLevel {
    /// Ordering key: deeper levels rank higher.
    pub fn rank(self) -> u32 {
        match self {
            MemoryLevel::Cache(level) => level,
            MemoryLevel::MainMemory => u32::MAX,
        }
    }
}

impl fmt::Display for MemoryLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MemoryLevel::Cache(level) => write!(f, "L{level} Cache"),
            MemoryLevel::MainMemory => f.write_str("Main Memory"),
        }
    }
}

/// Classifies measurements against a discovered topology, or against
/// [`HeuristicThresholds`] when the topology is empty.
#[derive(Debug, Clone, Default)]
pub struct Classifier {
    topology: CacheTopology,
    thresholds: HeuristicThresholds,
}

impl Classifier {
    pub fn new(topology: CacheTopology) -> Self {
        Classifier {
            topology,
            thresholds: HeuristicThresholds::default(),
        }
    }

    pub fn with_thresholds(mut self, thresholds: HeuristicThresholds) -> Self {
        self.thresholds = thresholds;
        self
    }

    /// Whether classification falls back to the latency heuristic.
    pub fn is_heuristic(&self) -> bool {
        self.topology.is_empty()
    }

    /// The level a buffer of `buffer_size` bytes fits in.
    ///
    /// With a topology the smallest data-capable cache at least as large as
    /// the buffer wins and the latency is ignored.
    pub fn classify(&self, buffer_size: u64, avg_latency_ns: f64) -> MemoryLevel {
        if self.topology.is_empty() {
            return self.classify_heuristic(buffer_size, avg_latency_ns);
        }
        self.topology
            .data_caches()
            .find(|c| c.size_bytes >= buffer_size)
            .map_or(MemoryLevel::MainMemory, |c| MemoryLevel::Cache(c.level))
    }

    fn classify_heuristic(&self, buffer_size: u64, ns: f64) -> MemoryLevel {
        let t = &self.thresholds;
        if buffer_size <= t.l1_max_bytes {
            if ns < t.l1_max_ns {
                MemoryLevel::Cache(1)
            } else {
                MemoryLevel::Cache(2)
            }
        } else if buffer_size <= t.l2_max_bytes {
            if ns < t.l2_max_ns {
                MemoryLevel::Cache(2)
            } else {
                MemoryLevel::Cache(3)
            }
        } else if buffer_size <= t.l3_max_bytes && ns < t.l3_max_ns {
            MemoryLevel::Cache(3)
        } else {
            MemoryLevel::MainMemory
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::topology::{CacheDescriptor, CacheKind};
    use proptest::prelude::*;

    fn two_unified() -> CacheTopology {
        CacheTopology::from_descriptors(vec![
            CacheDescriptor::new(3, CacheKind::Unified, 8 * MIB),
            CacheDescriptor::new(2, CacheKind::Unified, 256 * KIB),
        ])
    }

    fn desktop() -> CacheTopology {
        CacheTopology::from_descriptors(vec![
            CacheDescriptor::new(1, CacheKind::Data, 32 * KIB),
            CacheDescriptor::new(1, CacheKind::Instruction, 32 * KIB),
            CacheDescriptor::new(2, CacheKind::Unified, 512 * KIB),
            CacheDescriptor::new(3, CacheKind::Unified, 16 * MIB),
        ])
    }

    #[test]
    fn two_unified_levels() {
        let c = Classifier::new(two_unified());
        assert_eq!(c.classify(128 * KIB, 0.0).to_string(), "L2 Cache");
        assert_eq!(c.classify(16 * MIB, 0.0).to_string(), "Main Memory");
        assert_eq!(c.classify(4 * MIB, 1000.0), MemoryLevel::Cache(3));
    }

    #[test]
    fn instruction_caches_are_ignored() {
        let topo = CacheTopology::from_descriptors(vec![
            CacheDescriptor::new(1, CacheKind::Instruction, 64 * KIB),
            CacheDescriptor::new(2, CacheKind::Unified, MIB),
        ]);
        let c = Classifier::new(topo);
        assert_eq!(c.classify(16 * KIB, 1.0), MemoryLevel::Cache(2));
    }

    #[test]
    fn exact_capacity_still_fits() {
        let c = Classifier::new(desktop());
        assert_eq!(c.classify(32 * KIB, 99.0), MemoryLevel::Cache(1));
        assert_eq!(c.classify(32 * KIB + 1, 99.0), MemoryLevel::Cache(2));
    }

    #[test]
    fn heuristic_thresholds() {
        let c = Classifier::new(CacheTopology::unknown());
        assert!(c.is_heuristic());
        let cases = [
            (4 * KIB, 1.0, "L1 Cache"),
            (32 * KIB, 6.0, "L2 Cache"),
            (256 * KIB, 10.0, "L2 Cache"),
            (512 * KIB, 15.0, "L3 Cache"),
            (4 * MIB, 40.0, "L3 Cache"),
            (8 * MIB, 50.0, "Main Memory"),
            (64 * MIB, 1.0, "Main Memory"),
        ];
        for (size, ns, want) in cases {
            assert_eq!(c.classify(size, ns).to_string(), want, "{size} B at {ns} ns");
        }
    }

    #[test]
    fn thresholds_are_replaceable() {
        let c = Classifier::new(CacheTopology::unknown()).with_thresholds(HeuristicThresholds {
            l1_max_ns: 1.0,
            ..HeuristicThresholds::default()
        });
        assert_eq!(c.classify(4 * KIB, 2.0), MemoryLevel::Cache(2));
    }

    proptest! {
        #[test]
        fn classification_is_monotonic(a in 1u64..(64 * MIB), b in 1u64..(64 * MIB)) {
            let topo = desktop();
            let c = Classifier::new(topo.clone());
            let (small, large) = if a <= b { (a, b) } else { (b, a) };
            let (ls, ll) = (c.classify(small, 0.0), c.classify(large, 0.0));
            prop_assert!(ls.rank() <= ll.rank());

            if let MemoryLevel::Cache(level) = ls {
                let capacity = topo
                    .data_caches()
                    .filter(|d| d.level == level)
                    .map(|d| d.size_bytes)
                    .max()
                    .unwrap();
                prop_assert!(capacity >= small);
            }
        }
    }
}
