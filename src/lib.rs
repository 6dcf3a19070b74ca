// ============================================================================
// Parcelward Library
// ============================================================================
//
// Bounded-memory residency manager for claimed world parcels. Claimed
// parcels that stay resident indefinitely leak memory, so residency is
// tracked per parcel and evicted on a TTL, cross-checked against a
// persistent ownership ledger, with safety gates for occupants and
// externally pinned parcels, plus an administrative emergency drain.

pub mod config;
pub mod core;
pub mod facade;
pub mod ledger;
pub mod residency;
pub mod world;

// Re-export main types for convenience
pub use config::ResidencyPolicy;
pub use core::{Claim, ClaimRecord, OwnerKind, ParcelError, ParcelKey, Result};
pub use facade::ParcelKeeper;
pub use ledger::{LedgerStore, OwnershipLedger, UnclaimObserver};
pub use residency::{
    CleanupSummary, EvictionSweeper, Evictor, ResidencyStats, ResidencyTracker, SweepSummary,
    run_sweep, spawn_sweeper,
};
pub use world::WorldHost;
