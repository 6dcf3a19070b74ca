/// ParcelKeeper integration tests
///
/// Drives the whole core through the facade: background sweeper, ledger
/// persistence across restarts, and the admin surface.
/// Run with: cargo test --test keeper_tests

use parcelward::{
    Claim, LedgerStore, OwnerKind, ParcelKeeper, ParcelKey, ResidencyPolicy, WorldHost,
};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;

#[derive(Default)]
struct FakeWorld {
    loaded: Mutex<HashSet<ParcelKey>>,
    occupants: Mutex<HashMap<ParcelKey, usize>>,
    unload_requests: Mutex<Vec<ParcelKey>>,
}

impl WorldHost for FakeWorld {
    fn is_parcel_loaded(&self, key: &ParcelKey) -> bool {
        self.loaded.lock().unwrap().contains(key)
    }

    fn occupant_count(&self, key: &ParcelKey) -> usize {
        self.occupants.lock().unwrap().get(key).copied().unwrap_or(0)
    }

    fn is_externally_pinned(&self, _key: &ParcelKey) -> bool {
        false
    }

    fn unload_parcel(&self, key: &ParcelKey) {
        self.unload_requests.lock().unwrap().push(key.clone());
        self.loaded.lock().unwrap().remove(key);
    }

    fn connected_occupant_positions(&self) -> Vec<ParcelKey> {
        Vec::new()
    }
}

fn key(x: i32, z: i32) -> ParcelKey {
    ParcelKey::new("overworld", x, z)
}

fn short_policy() -> ResidencyPolicy {
    ResidencyPolicy {
        sweep_interval_ms: 60_000,
        base_ttl_ms: 30_000,
        unclaim_grace_ms: 5_000,
        ..ResidencyPolicy::default()
    }
}

#[tokio::test(start_paused = true)]
async fn keeper_tracks_claimed_loads_and_reports_statistics() {
    let dir = TempDir::new().unwrap();
    let world = Arc::new(FakeWorld::default());
    let keeper = ParcelKeeper::start(
        Arc::clone(&world) as Arc<dyn WorldHost>,
        LedgerStore::new(dir.path().join("claims.json")),
        ResidencyPolicy::default(),
    )
    .unwrap();

    keeper.claim(key(0, 0), "T1", OwnerKind::Settlement).unwrap();
    world.loaded.lock().unwrap().insert(key(0, 0));
    keeper.on_parcel_load(&key(0, 0));
    keeper.on_parcel_load(&key(9, 9)); // wilderness, ignored
    keeper.on_parcel_pinned(&key(0, 0));

    let stats = keeper.statistics();
    assert_eq!(stats.tracked, 1);
    assert_eq!(stats.pinned, 1);

    keeper.on_parcel_unload(&key(0, 0));
    let stats = keeper.statistics();
    assert_eq!(stats.tracked, 0);
    assert_eq!(stats.pinned, 0);

    keeper.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn background_sweeper_evicts_stale_entries() {
    let dir = TempDir::new().unwrap();
    let world = Arc::new(FakeWorld::default());
    let keeper = ParcelKeeper::start(
        Arc::clone(&world) as Arc<dyn WorldHost>,
        LedgerStore::new(dir.path().join("claims.json")),
        short_policy(),
    )
    .unwrap();

    keeper.claim(key(0, 0), "T1", OwnerKind::Settlement).unwrap();
    world.loaded.lock().unwrap().insert(key(0, 0));
    keeper.on_parcel_load(&key(0, 0));

    // By the first sweep at 60s the entry is well past the 30s TTL.
    tokio::time::sleep(Duration::from_secs(61)).await;

    assert_eq!(keeper.statistics().tracked, 0);
    assert!(!world.is_parcel_loaded(&key(0, 0)));
    assert_eq!(world.unload_requests.lock().unwrap().as_slice(), &[key(0, 0)]);

    keeper.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn unclaim_through_the_keeper_untracks_and_defers_unload() {
    let dir = TempDir::new().unwrap();
    let world = Arc::new(FakeWorld::default());
    let keeper = ParcelKeeper::start(
        Arc::clone(&world) as Arc<dyn WorldHost>,
        LedgerStore::new(dir.path().join("claims.json")),
        short_policy(),
    )
    .unwrap();

    keeper.claim(key(1, 1), "T1", OwnerKind::Settlement).unwrap();
    world.loaded.lock().unwrap().insert(key(1, 1));
    keeper.on_parcel_load(&key(1, 1));

    keeper.unclaim(&key(1, 1)).unwrap();
    assert_eq!(keeper.get_claim(&key(1, 1)), Claim::Wilderness);
    assert_eq!(keeper.statistics().tracked, 0);
    assert!(world.is_parcel_loaded(&key(1, 1)));

    tokio::time::sleep(Duration::from_secs(6)).await;
    assert!(!world.is_parcel_loaded(&key(1, 1)));

    keeper.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn claims_survive_a_keeper_restart() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("claims.json");
    let world = Arc::new(FakeWorld::default());

    let keeper = ParcelKeeper::start(
        Arc::clone(&world) as Arc<dyn WorldHost>,
        LedgerStore::new(&path),
        ResidencyPolicy::default(),
    )
    .unwrap();
    keeper.claim(key(4, -2), "R7", OwnerKind::Federation).unwrap();
    keeper.shutdown().await.unwrap();

    let keeper = ParcelKeeper::start(
        Arc::clone(&world) as Arc<dyn WorldHost>,
        LedgerStore::new(&path),
        ResidencyPolicy::default(),
    )
    .unwrap();
    let claim = keeper.get_claim(&key(4, -2));
    let record = claim.record().unwrap();
    assert_eq!(record.owner_id, "R7");
    assert_eq!(record.kind, OwnerKind::Federation);
    assert!(keeper
        .ledger()
        .is_adjacent_claimed_by_same_owner(&key(5, -2), "R7"));

    keeper.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn emergency_cleanup_through_the_keeper() {
    let dir = TempDir::new().unwrap();
    let world = Arc::new(FakeWorld::default());
    let keeper = ParcelKeeper::start(
        Arc::clone(&world) as Arc<dyn WorldHost>,
        LedgerStore::new(dir.path().join("claims.json")),
        ResidencyPolicy::default(),
    )
    .unwrap();

    for x in 0..5 {
        keeper.claim(key(x, 0), "T1", OwnerKind::Settlement).unwrap();
        world.loaded.lock().unwrap().insert(key(x, 0));
        keeper.on_parcel_load(&key(x, 0));
    }
    world.occupants.lock().unwrap().insert(key(4, 0), 2);

    let summary = keeper.emergency_cleanup();
    assert_eq!(summary.attempted, 5);
    assert_eq!(summary.unloaded, 4);
    assert_eq!(keeper.statistics().tracked, 0);
    // The occupied parcel was spared physically but dropped from tracking.
    assert!(world.is_parcel_loaded(&key(4, 0)));

    keeper.shutdown().await.unwrap();
}
