//! In-memory bookkeeping of which claimed parcels are currently resident.

use crate::core::ParcelKey;
use crate::ledger::OwnershipLedger;
use crate::residency::ResidencyStats;
use log::debug;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock, RwLockWriteGuard};
use tokio::time::Instant;

/// Tracks load timestamps for claimed parcels only. Entries are created on
/// load events, removed on unload events, sweeper eviction, unclaim
/// notifications, or emergency drain.
pub struct ResidencyTracker {
    ledger: Arc<OwnershipLedger>,
    entries: RwLock<HashMap<ParcelKey, Instant>>,
    pinned: RwLock<HashSet<ParcelKey>>,
}

impl ResidencyTracker {
    pub fn new(ledger: Arc<OwnershipLedger>) -> Self {
        Self {
            ledger,
            entries: RwLock::new(HashMap::new()),
            pinned: RwLock::new(HashSet::new()),
        }
    }

    // Tracker operations never fail: a poisoned lock still yields the map.
    fn entries_mut(&self) -> RwLockWriteGuard<'_, HashMap<ParcelKey, Instant>> {
        match self.entries.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn pinned_mut(&self) -> RwLockWriteGuard<'_, HashSet<ParcelKey>> {
        match self.pinned.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Load notification from the world runtime. Only claimed parcels are
    /// tracked; wilderness loads are ignored entirely.
    pub fn on_load(&self, key: &ParcelKey) {
        if !self.ledger.is_claimed(key) {
            return;
        }
        let mut entries = self.entries_mut();
        entries.insert(key.clone(), Instant::now());
        debug!("Claimed parcel loaded: {} | total tracked: {}", key, entries.len());
    }

    /// Unload notification from the world runtime. Unconditional removal,
    /// idempotent.
    pub fn on_unload(&self, key: &ParcelKey) {
        if self.untrack(key) {
            debug!(
                "Claimed parcel unloaded: {} | total tracked: {}",
                key,
                self.tracked_count()
            );
        }
    }

    /// Removes any entry and pin mark for the key; returns whether an entry
    /// was present.
    pub fn untrack(&self, key: &ParcelKey) -> bool {
        let removed = self.entries_mut().remove(key).is_some();
        self.pinned_mut().remove(key);
        removed
    }

    pub fn mark_pinned(&self, key: &ParcelKey) {
        self.pinned_mut().insert(key.clone());
    }

    pub fn clear_pinned(&self, key: &ParcelKey) {
        self.pinned_mut().remove(key);
    }

    pub fn loaded_at(&self, key: &ParcelKey) -> Option<Instant> {
        match self.entries.read() {
            Ok(guard) => guard.get(key).copied(),
            Err(poisoned) => poisoned.into_inner().get(key).copied(),
        }
    }

    pub fn is_tracked(&self, key: &ParcelKey) -> bool {
        self.loaded_at(key).is_some()
    }

    pub fn tracked_count(&self) -> usize {
        match self.entries.read() {
            Ok(guard) => guard.len(),
            Err(poisoned) => poisoned.into_inner().len(),
        }
    }

    /// Copy-on-read snapshot of all entries, so a sweep never holds the
    /// lock across its scan.
    pub fn entries(&self) -> Vec<(ParcelKey, Instant)> {
        match self.entries.read() {
            Ok(guard) => guard.iter().map(|(k, t)| (k.clone(), *t)).collect(),
            Err(poisoned) => poisoned
                .into_inner()
                .iter()
                .map(|(k, t)| (k.clone(), *t))
                .collect(),
        }
    }

    /// Drops all tracking state outright. Returns how many entries were
    /// cleared.
    pub fn clear_all(&self) -> usize {
        let mut entries = self.entries_mut();
        let cleared = entries.len();
        entries.clear();
        drop(entries);
        self.pinned_mut().clear();
        cleared
    }

    pub fn statistics(&self) -> ResidencyStats {
        let pinned = match self.pinned.read() {
            Ok(guard) => guard.len(),
            Err(poisoned) => poisoned.into_inner().len(),
        };
        ResidencyStats {
            tracked: self.tracked_count(),
            pinned,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::OwnerKind;
    use crate::ledger::LedgerStore;
    use tempfile::TempDir;

    fn key(x: i32, z: i32) -> ParcelKey {
        ParcelKey::new("w", x, z)
    }

    fn tracker_with_claims(dir: &TempDir, claimed: &[ParcelKey]) -> ResidencyTracker {
        let ledger = Arc::new(OwnershipLedger::open(LedgerStore::new(
            dir.path().join("claims.json"),
        )));
        for k in claimed {
            ledger.claim(k.clone(), "T1", OwnerKind::Settlement).unwrap();
        }
        ResidencyTracker::new(ledger)
    }

    #[test]
    fn only_claimed_loads_are_tracked() {
        let dir = TempDir::new().unwrap();
        let tracker = tracker_with_claims(&dir, &[key(0, 0)]);

        tracker.on_load(&key(0, 0));
        tracker.on_load(&key(9, 9));
        assert_eq!(tracker.tracked_count(), 1);
        assert!(tracker.is_tracked(&key(0, 0)));
        assert!(!tracker.is_tracked(&key(9, 9)));
    }

    #[test]
    fn reloading_overwrites_the_timestamp() {
        let dir = TempDir::new().unwrap();
        let tracker = tracker_with_claims(&dir, &[key(0, 0)]);

        tracker.on_load(&key(0, 0));
        let first = tracker.loaded_at(&key(0, 0)).unwrap();
        tracker.on_load(&key(0, 0));
        let second = tracker.loaded_at(&key(0, 0)).unwrap();
        assert!(second >= first);
        assert_eq!(tracker.tracked_count(), 1);
    }

    #[test]
    fn unload_removes_idempotently() {
        let dir = TempDir::new().unwrap();
        let tracker = tracker_with_claims(&dir, &[key(0, 0)]);

        tracker.on_load(&key(0, 0));
        tracker.on_unload(&key(0, 0));
        assert_eq!(tracker.tracked_count(), 0);
        // Second unload and unload of a never-tracked key are both no-ops.
        tracker.on_unload(&key(0, 0));
        tracker.on_unload(&key(5, 5));
        assert_eq!(tracker.tracked_count(), 0);
    }

    #[test]
    fn pin_marks_feed_statistics() {
        let dir = TempDir::new().unwrap();
        let tracker = tracker_with_claims(&dir, &[key(0, 0), key(1, 0)]);

        tracker.on_load(&key(0, 0));
        tracker.on_load(&key(1, 0));
        tracker.mark_pinned(&key(1, 0));
        assert_eq!(tracker.statistics(), ResidencyStats { tracked: 2, pinned: 1 });

        tracker.on_unload(&key(1, 0));
        assert_eq!(tracker.statistics(), ResidencyStats { tracked: 1, pinned: 0 });
    }

    #[test]
    fn clear_all_drops_everything() {
        let dir = TempDir::new().unwrap();
        let tracker = tracker_with_claims(&dir, &[key(0, 0), key(1, 0)]);
        tracker.on_load(&key(0, 0));
        tracker.on_load(&key(1, 0));
        tracker.mark_pinned(&key(0, 0));

        assert_eq!(tracker.clear_all(), 2);
        assert_eq!(tracker.statistics(), ResidencyStats { tracked: 0, pinned: 0 });
    }
}
