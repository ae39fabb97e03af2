//! Memory subsystem benchmarking: bandwidth loops plus pointer-chasing
//! latency measurements correlated against the detected cache hierarchy.
//!
//! Discovery runs once and yields an immutable [`topology::CacheTopology`],
//! which feeds both the size [`plan`] and the level [`classify`]er. Each
//! planned size gets a fresh buffer, a random single-cycle chain and a timed
//! traversal.

pub mod bandwidth;
pub mod buffer;
pub mod chain;
pub mod classify;
pub mod config;
pub mod error;
pub mod latency;
pub mod plan;
pub mod report;
pub mod rng;
pub mod suite;
pub mod timer;
pub mod topology;

pub use error::{BenchError, BenchResult};
