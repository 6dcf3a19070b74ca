use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Policy knobs for residency tracking and eviction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResidencyPolicy {
    /// Period of the background sweep in milliseconds.
    pub sweep_interval_ms: u64,
    /// Base time a claimed parcel may stay resident without activity, in
    /// milliseconds.
    pub base_ttl_ms: u64,
    /// Tracked-count capacity above which a sweep halves the TTL.
    pub max_resident: usize,
    /// Grace window between an unclaim and the deferred unload check, in
    /// milliseconds.
    pub unclaim_grace_ms: u64,
    /// Chebyshev radius, in cells, of the nearby-occupant exclusion.
    pub occupant_radius: i32,
}

impl Default for ResidencyPolicy {
    fn default() -> Self {
        Self {
            sweep_interval_ms: 300_000,
            base_ttl_ms: 300_000,
            max_resident: 100,
            unclaim_grace_ms: 5_000,
            occupant_radius: 2,
        }
    }
}

impl ResidencyPolicy {
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_millis(self.sweep_interval_ms)
    }

    pub fn base_ttl(&self) -> Duration {
        Duration::from_millis(self.base_ttl_ms)
    }

    pub fn unclaim_grace(&self) -> Duration {
        Duration::from_millis(self.unclaim_grace_ms)
    }

    /// Whether a sweep over `tracked` entries runs in aggressive mode.
    pub fn aggressive(&self, tracked: usize) -> bool {
        tracked > self.max_resident
    }

    /// Effective eviction threshold for a sweep over `tracked` entries:
    /// half the base TTL under residency pressure, the full TTL otherwise.
    pub fn effective_threshold(&self, tracked: usize) -> Duration {
        if self.aggressive(tracked) {
            self.base_ttl() / 2
        } else {
            self.base_ttl()
        }
    }
}
