//! Process-wide service wiring for the residency core.

use crate::config::ResidencyPolicy;
use crate::core::{Claim, OwnerKind, ParcelKey, Result};
use crate::ledger::{LedgerStore, OwnershipLedger, UnclaimObserver};
use crate::residency::{
    CleanupSummary, EvictionSweeper, Evictor, ResidencyStats, ResidencyTracker, spawn_sweeper,
};
use crate::world::WorldHost;
use std::sync::Arc;

/// The residency core, constructed once at startup and handed to every
/// collaborator that needs it. Owns the ownership ledger, the residency
/// tracker, the evictor, and the background sweep worker; there are no
/// process-wide singletons.
///
/// Load/unload notifications arrive through `on_parcel_load` /
/// `on_parcel_unload`; territory management drives `claim` / `unclaim`;
/// the admin surface is `statistics` and `emergency_cleanup`. Must be
/// started from within a tokio runtime.
pub struct ParcelKeeper {
    ledger: Arc<OwnershipLedger>,
    tracker: Arc<ResidencyTracker>,
    evictor: Arc<Evictor>,
    sweeper: Option<EvictionSweeper>,
}

impl ParcelKeeper {
    /// Loads the ledger from the store, wires the evictor to the ledger's
    /// unclaim events, and spawns the periodic sweeper.
    pub fn start(
        world: Arc<dyn WorldHost>,
        store: LedgerStore,
        policy: ResidencyPolicy,
    ) -> Result<Self> {
        let ledger = Arc::new(OwnershipLedger::open(store));
        let tracker = Arc::new(ResidencyTracker::new(Arc::clone(&ledger)));
        let evictor = Arc::new(Evictor::new(
            Arc::clone(&tracker),
            Arc::clone(&ledger),
            world,
            policy,
        ));
        ledger.subscribe(Arc::clone(&evictor) as Arc<dyn UnclaimObserver>)?;
        let sweeper = spawn_sweeper(Arc::clone(&evictor));

        Ok(Self {
            ledger,
            tracker,
            evictor,
            sweeper: Some(sweeper),
        })
    }

    // ------------------------------------------------------------------
    // World-runtime notifications
    // ------------------------------------------------------------------

    pub fn on_parcel_load(&self, key: &ParcelKey) {
        self.tracker.on_load(key);
    }

    pub fn on_parcel_unload(&self, key: &ParcelKey) {
        self.tracker.on_unload(key);
    }

    pub fn on_parcel_pinned(&self, key: &ParcelKey) {
        self.tracker.mark_pinned(key);
    }

    pub fn on_parcel_unpinned(&self, key: &ParcelKey) {
        self.tracker.clear_pinned(key);
    }

    // ------------------------------------------------------------------
    // Territory-management surface
    // ------------------------------------------------------------------

    pub fn claim(&self, key: ParcelKey, owner_id: impl Into<String>, kind: OwnerKind) -> Result<()> {
        self.ledger.claim(key, owner_id, kind)
    }

    pub fn unclaim(&self, key: &ParcelKey) -> Result<()> {
        self.ledger.unclaim(key)
    }

    pub fn unclaim_all_by_owner(&self, owner_id: &str) -> Result<Vec<ParcelKey>> {
        self.ledger.unclaim_all_by_owner(owner_id)
    }

    pub fn get_claim(&self, key: &ParcelKey) -> Claim {
        self.ledger.get(key)
    }

    pub fn ledger(&self) -> &Arc<OwnershipLedger> {
        &self.ledger
    }

    // ------------------------------------------------------------------
    // Admin surface
    // ------------------------------------------------------------------

    pub fn statistics(&self) -> ResidencyStats {
        self.tracker.statistics()
    }

    pub fn emergency_cleanup(&self) -> CleanupSummary {
        self.evictor.emergency_cleanup()
    }

    /// Stops scheduling further sweeps; in-flight deferred checks simply
    /// run to completion.
    pub async fn shutdown(mut self) -> Result<()> {
        if let Some(sweeper) = self.sweeper.take() {
            sweeper.stop().await?;
        }
        Ok(())
    }
}
