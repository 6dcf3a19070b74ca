//! Persistent ownership ledger: the single source of truth for parcel
//! claims, and the trigger for eviction on unclaim.

mod persistence;

pub use persistence::LedgerStore;

use crate::core::{Claim, ClaimRecord, OwnerKind, ParcelKey, Result};
use log::{error, info};
use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard};

/// Observer seam for unclaim events. The ledger publishes; interested
/// parties (the evictor) subscribe. Observers are invoked synchronously
/// before the unclaim call returns.
pub trait UnclaimObserver: Send + Sync {
    fn unclaimed(&self, key: &ParcelKey);
}

pub struct OwnershipLedger {
    claims: RwLock<HashMap<ParcelKey, ClaimRecord>>,
    store: LedgerStore,
    observers: RwLock<Vec<Arc<dyn UnclaimObserver>>>,
}

impl OwnershipLedger {
    /// Opens the ledger, loading whatever the store currently holds. A
    /// missing or unreadable document starts an empty ledger.
    pub fn open(store: LedgerStore) -> Self {
        let claims = store.load();
        if !claims.is_empty() {
            info!(
                "Loaded {} claimed parcels from {}",
                claims.len(),
                store.path().display()
            );
        }
        Self {
            claims: RwLock::new(claims),
            store,
            observers: RwLock::new(Vec::new()),
        }
    }

    pub fn subscribe(&self, observer: Arc<dyn UnclaimObserver>) -> Result<()> {
        self.observers.write()?.push(observer);
        Ok(())
    }

    // Queries never fail: a poisoned lock still yields the map.
    fn read_claims(&self) -> RwLockReadGuard<'_, HashMap<ParcelKey, ClaimRecord>> {
        match self.claims.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Claim state of a parcel; absent keys are `Claim::Wilderness`.
    pub fn get(&self, key: &ParcelKey) -> Claim {
        self.read_claims()
            .get(key)
            .cloned()
            .map(Claim::Claimed)
            .unwrap_or(Claim::Wilderness)
    }

    pub fn is_claimed(&self, key: &ParcelKey) -> bool {
        self.read_claims().contains_key(key)
    }

    pub fn owner_of(&self, key: &ParcelKey) -> Option<String> {
        self.read_claims().get(key).map(|record| record.owner_id.clone())
    }

    /// Every claim held by the given owner.
    pub fn claims_of_owner(&self, owner_id: &str) -> Vec<ClaimRecord> {
        self.read_claims()
            .values()
            .filter(|record| record.owner_id == owner_id)
            .cloned()
            .collect()
    }

    pub fn claim_count(&self) -> usize {
        self.read_claims().len()
    }

    /// Whether any of the four axis neighbours is claimed by the given
    /// owner. Used by upstream claim policy, not by eviction.
    pub fn is_adjacent_claimed_by_same_owner(&self, key: &ParcelKey, owner_id: &str) -> bool {
        let claims = self.read_claims();
        key.adjacent()
            .iter()
            .any(|neighbour| claims.get(neighbour).is_some_and(|r| r.owner_id == owner_id))
    }

    /// Inserts or overwrites the claim record and persists the ledger.
    /// Re-claiming an already-claimed key simply overwrites.
    pub fn claim(&self, key: ParcelKey, owner_id: impl Into<String>, kind: OwnerKind) -> Result<()> {
        let record = ClaimRecord::new(key.clone(), owner_id, kind);
        self.claims.write()?.insert(key, record);
        self.persist();
        Ok(())
    }

    /// Removes the claim if present (no-op otherwise), persists, and
    /// notifies every unclaim observer before returning.
    pub fn unclaim(&self, key: &ParcelKey) -> Result<()> {
        let removed = self.claims.write()?.remove(key).is_some();
        if !removed {
            return Ok(());
        }
        self.persist();
        self.notify_unclaimed(key);
        info!("Unclaimed parcel {}", key);
        Ok(())
    }

    /// Removes every claim held by the owner; returns the affected keys.
    /// Each removed key fires the same unclaim notification as a single
    /// unclaim, exactly once.
    pub fn unclaim_all_by_owner(&self, owner_id: &str) -> Result<Vec<ParcelKey>> {
        let removed: Vec<ParcelKey> = {
            let mut claims = self.claims.write()?;
            let keys: Vec<ParcelKey> = claims
                .iter()
                .filter(|(_, record)| record.owner_id == owner_id)
                .map(|(key, _)| key.clone())
                .collect();
            for key in &keys {
                claims.remove(key);
            }
            keys
        };

        if removed.is_empty() {
            return Ok(removed);
        }
        self.persist();
        for key in &removed {
            self.notify_unclaimed(key);
        }
        info!("Unclaimed {} parcels owned by {}", removed.len(), owner_id);
        Ok(removed)
    }

    /// Full-snapshot persist. A failed save is logged; the in-memory ledger
    /// stays authoritative for the running process.
    fn persist(&self) {
        let snapshot = self.read_claims().clone();
        if let Err(err) = self.store.save(&snapshot) {
            error!(
                "Failed to persist ownership ledger to {}: {}",
                self.store.path().display(),
                err
            );
        }
    }

    fn notify_unclaimed(&self, key: &ParcelKey) {
        let observers = match self.observers.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        for observer in observers.iter() {
            observer.unclaimed(key);
        }
    }
}
