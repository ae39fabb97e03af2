//! Cache hierarchy discovery.
//!
//! Reads the per-index cache attributes that Linux exposes under
//! `/sys/devices/system/cpu/cpu0/cache/indexN/`. Discovery is a single
//! best-effort pass: a missing index directory ends the scan, a missing or
//! unparsable attribute only zeroes that field, and a machine without any
//! cache information yields an empty [`CacheTopology`].

use log::{debug, warn};
use std::fmt;
use std::fs;
use std::path::Path;

/// Conventional sysfs location of the cache attributes of the first CPU.
pub const SYSFS_CACHE_ROOT: &str = "/sys/devices/system/cpu/cpu0/cache";

/// Number of `indexN` directories read.
pub const MAX_CACHE_INDICES: usize = 8;

/// Number of descriptors retained in a topology.
pub const MAX_CACHE_LEVELS: usize = 4;

/// Unified caches up to this size are assumed to be L2, larger ones L3.
const L2_UNIFIED_LIMIT: u64 = 1024 * 1024;

/// What a cache stores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheKind {
    Data,
    Instruction,
    Unified,
    Unknown,
}

impl CacheKind {
    fn parse(raw: &str) -> Self {
        match raw.trim() {
            "Data" => CacheKind::Data,
            "Instruction" => CacheKind::Instruction,
            "Unified" => CacheKind::Unified,
            _ => CacheKind::Unknown,
        }
    }

    /// Whether data loads can hit in this cache.
    pub fn holds_data(self) -> bool {
        matches!(self, CacheKind::Data | CacheKind::Unified)
    }
}

impl fmt::Display for CacheKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CacheKind::Data => "Data",
            CacheKind::Instruction => "Instruction",
            CacheKind::Unified => "Unified",
            CacheKind::Unknown => "Unknown",
        };
        f.write_str(name)
    }
}

/// One cache as reported by the operating system.
///
/// `associativity` and `shared_cpu_count` are informational only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheDescriptor {
    pub level: u32,
    pub kind: CacheKind,
    pub size_bytes: u64,
    pub line_size_bytes: u32,
    pub associativity: u32,
    pub shared_cpu_count: u32,
}

impl CacheDescriptor {
    pub fn new(level: u32, kind: CacheKind, size_bytes: u64) -> Self {
        CacheDescriptor {
            level,
            kind,
            size_bytes,
            line_size_bytes: 64,
            associativity: 0,
            shared_cpu_count: 0,
        }
    }
}

/// Immutable, size-ordered view of the cache hierarchy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheTopology {
    caches: Vec<CacheDescriptor>,
}

impl CacheTopology {
    /// An empty topology, which puts every consumer into heuristic mode.
    pub fn unknown() -> Self {
        Self::default()
    }

    /// Build a topology from arbitrary descriptors: sorted ascending by size
    /// and truncated to [`MAX_CACHE_LEVELS`] entries.
    pub fn from_descriptors(mut caches: Vec<CacheDescriptor>) -> Self {
        caches.sort_by_key(|c| c.size_bytes);
        caches.truncate(MAX_CACHE_LEVELS);
        CacheTopology { caches }
    }

    pub fn is_empty(&self) -> bool {
        self.caches.is_empty()
    }

    pub fn len(&self) -> usize {
        self.caches.len()
    }

    /// All descriptors, ascending by size.
    pub fn caches(&self) -> &[CacheDescriptor] {
        &self.caches
    }

    /// Descriptors that can hold data, ascending by size, skipping entries
    /// whose size could not be read.
    pub fn data_caches(&self) -> impl Iterator<Item = &CacheDescriptor> {
        self.caches
            .iter()
            .filter(|c| c.kind.holds_data() && c.size_bytes > 0)
    }
}

/// Discover the hierarchy of the first CPU from sysfs.
pub fn discover() -> CacheTopology {
    discover_at(Path::new(SYSFS_CACHE_ROOT))
}

/// Discover the hierarchy from a sysfs-shaped tree rooted at `root`.
pub fn discover_at(root: &Path) -> CacheTopology {
    let mut found = Vec::new();

    for index in 0..MAX_CACHE_INDICES {
        let dir = root.join(format!("index{index}"));
        if !dir.is_dir() {
            debug!("No cache index {index} under {}", root.display());
            break;
        }
        found.push(read_descriptor(&dir, found.len()));
    }

    if found.is_empty() {
        warn!(
            "No cache topology available under {}, falling back to heuristic classification",
            root.display()
        );
    }

    CacheTopology::from_descriptors(found)
}

fn read_descriptor(dir: &Path, position: usize) -> CacheDescriptor {
    let kind = read_attr(dir, "type")
        .map(|s| CacheKind::parse(&s))
        .unwrap_or(CacheKind::Unknown);
    let size_bytes = read_attr(dir, "size")
        .and_then(|s| parse_cache_size(&s))
        .unwrap_or(0);
    let line_size_bytes = read_attr(dir, "coherency_line_size")
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(0);
    let associativity = read_attr(dir, "ways_of_associativity")
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(0);
    let shared_cpu_count = read_attr(dir, "shared_cpu_list")
        .and_then(|s| count_cpu_list(&s))
        .unwrap_or(0);

    let level = assign_level(kind, size_bytes, position);
    debug!(
        "{}: L{level} {kind} {size_bytes} B, line {line_size_bytes} B, {associativity}-way",
        dir.display()
    );

    CacheDescriptor {
        level,
        kind,
        size_bytes,
        line_size_bytes,
        associativity,
        shared_cpu_count,
    }
}

fn read_attr(dir: &Path, name: &str) -> Option<String> {
    match fs::read_to_string(dir.join(name)) {
        Ok(s) => Some(s),
        Err(e) => {
            warn!("Cache attribute {}/{name} unavailable ({e}), using default", dir.display());
            None
        }
    }
}

/// Split instruction/data caches are first level; unified caches are L2 up to
/// 1 MiB and L3 beyond; anything else is leveled by discovery position.
fn assign_level(kind: CacheKind, size_bytes: u64, position: usize) -> u32 {
    match kind {
        CacheKind::Data | CacheKind::Instruction => 1,
        CacheKind::Unified if size_bytes == 0 => position as u32 + 1,
        CacheKind::Unified if size_bytes <= L2_UNIFIED_LIMIT => 2,
        CacheKind::Unified => 3,
        CacheKind::Unknown => position as u32 + 1,
    }
}

/// Parse a sysfs size such as `"48K"`, `"2048K"`, `"1M"` or `"512"`.
pub fn parse_cache_size(raw: &str) -> Option<u64> {
    let raw = raw.trim();
    let (digits, unit) = match raw.char_indices().last()? {
        (i, 'K' | 'k') => (&raw[..i], 1024),
        (i, 'M' | 'm') => (&raw[..i], 1024 * 1024),
        (i, 'G' | 'g') => (&raw[..i], 1024 * 1024 * 1024),
        _ => (raw, 1),
    };
    digits.trim().parse::<u64>().ok()?.checked_mul(unit)
}

/// Count the CPUs in a list such as `"0-3,8,10-11"`.
pub fn count_cpu_list(raw: &str) -> Option<u32> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    let mut total = 0u32;
    for part in raw.split(',') {
        let count = match part.split_once('-') {
            Some((lo, hi)) => {
                let lo: u32 = lo.trim().parse().ok()?;
                let hi: u32 = hi.trim().parse().ok()?;
                hi.checked_sub(lo)?.checked_add(1)?
            }
            None => {
                part.trim().parse::<u32>().ok()?;
                1
            }
        };
        total = total.checked_add(count)?;
    }
    Some(total)
}
