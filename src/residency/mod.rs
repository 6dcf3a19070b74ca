//! Residency tracking and TTL-based eviction of claimed parcels.

mod evictor;
mod stats;
mod sweeper;
mod tracker;

pub use evictor::{CleanupSummary, Evictor};
pub use stats::ResidencyStats;
pub use sweeper::{EvictionSweeper, SweepSummary, run_sweep, spawn_sweeper};
pub use tracker::ResidencyTracker;
