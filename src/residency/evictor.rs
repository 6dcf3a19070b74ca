//! Safety-gated parcel unloading, deferred eviction after unclaim, and the
//! administrative emergency drain.

use crate::config::ResidencyPolicy;
use crate::core::ParcelKey;
use crate::ledger::{OwnershipLedger, UnclaimObserver};
use crate::residency::ResidencyTracker;
use crate::world::WorldHost;
use log::{debug, info, warn};
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::time::sleep;

/// Outcome of an emergency drain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CleanupSummary {
    /// Keys an unload was attempted for.
    pub attempted: usize,
    /// Keys the world runtime actually unloaded.
    pub unloaded: usize,
}

pub struct Evictor {
    tracker: Arc<ResidencyTracker>,
    ledger: Arc<OwnershipLedger>,
    world: Arc<dyn WorldHost>,
    policy: ResidencyPolicy,
    runtime: Handle,
}

impl Evictor {
    /// Must be called from within a tokio runtime; the handle is captured
    /// so deferred unload checks can be scheduled from any thread later.
    pub fn new(
        tracker: Arc<ResidencyTracker>,
        ledger: Arc<OwnershipLedger>,
        world: Arc<dyn WorldHost>,
        policy: ResidencyPolicy,
    ) -> Self {
        Self {
            tracker,
            ledger,
            world,
            policy,
            runtime: Handle::current(),
        }
    }

    pub(crate) fn tracker(&self) -> &ResidencyTracker {
        &self.tracker
    }

    pub(crate) fn world(&self) -> &dyn WorldHost {
        self.world.as_ref()
    }

    pub(crate) fn policy(&self) -> &ResidencyPolicy {
        &self.policy
    }

    /// The only path that performs a physical unload. Declines silently
    /// when the parcel is not loaded, is pinned by another subsystem, or
    /// has live occupants; returns whether an unload was requested.
    pub fn force_unload(&self, key: &ParcelKey) -> bool {
        force_unload_with(&self.tracker, self.world.as_ref(), key)
    }

    /// Administrative last resort: attempts an unload for every tracked
    /// parcel regardless of age, then drops all tracking state outright.
    pub fn emergency_cleanup(&self) -> CleanupSummary {
        warn!("Emergency cleanup triggered, draining all tracked parcels");

        let snapshot = self.tracker.entries();
        let attempted = snapshot.len();
        let mut unloaded = 0;
        for (key, _) in &snapshot {
            if force_unload_with(&self.tracker, self.world.as_ref(), key) {
                unloaded += 1;
            }
        }
        self.tracker.clear_all();

        warn!(
            "Emergency cleanup complete: attempted {}, unloaded {}",
            attempted, unloaded
        );
        CleanupSummary { attempted, unloaded }
    }
}

impl UnclaimObserver for Evictor {
    /// Called synchronously by the ledger inside unclaim. Untracks the
    /// parcel immediately so it no longer counts toward capacity, then
    /// schedules a one-shot deferred check: if the parcel is still loaded
    /// and still unclaimed after the grace window, it is force-unloaded.
    /// The deferral lets operations already in flight finish first.
    fn unclaimed(&self, key: &ParcelKey) {
        self.tracker.untrack(key);
        debug!("Scheduling unclaimed parcel {} for deferred unload", key);

        let key = key.clone();
        let tracker = Arc::clone(&self.tracker);
        let ledger = Arc::clone(&self.ledger);
        let world = Arc::clone(&self.world);
        let grace = self.policy.unclaim_grace();
        // Unclaims may arrive from threads outside the runtime; the
        // captured handle keeps the deferred check schedulable anyway.
        self.runtime.spawn(async move {
            sleep(grace).await;
            if world.is_parcel_loaded(&key) && !ledger.is_claimed(&key) {
                force_unload_with(&tracker, world.as_ref(), &key);
            }
        });
    }
}

/// Shared by the evictor methods and the deferred check task, which
/// outlives the borrow of the evictor itself.
fn force_unload_with(tracker: &ResidencyTracker, world: &dyn WorldHost, key: &ParcelKey) -> bool {
    if !world.is_parcel_loaded(key) {
        return false;
    }
    if world.is_externally_pinned(key) || world.occupant_count(key) > 0 {
        return false;
    }
    world.unload_parcel(key);
    tracker.untrack(key);
    info!("Force unloaded parcel {}", key);
    true
}
