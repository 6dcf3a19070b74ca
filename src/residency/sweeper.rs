//! Periodic TTL sweep over tracked residency entries.

use crate::core::{ParcelError, ParcelKey, Result};
use crate::residency::Evictor;
use log::info;
use std::sync::Arc;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{Instant, sleep};

/// What one sweep pass did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SweepSummary {
    pub evicted: usize,
    pub still_tracked: usize,
    pub aggressive: bool,
}

/// One sweep pass. Snapshot-then-mutate: the scan walks a copy of the
/// tracker so concurrent load/unload traffic never invalidates it. Entries
/// older than the effective threshold are evicted unless a connected
/// occupant sits within the exclusion radius; excluded entries stay tracked
/// and are re-evaluated next run.
pub fn run_sweep(evictor: &Evictor) -> SweepSummary {
    let policy = evictor.policy();
    let snapshot = evictor.tracker().entries();
    let tracked = snapshot.len();
    let aggressive = policy.aggressive(tracked);
    let threshold = policy.effective_threshold(tracked);
    let occupants = evictor.world().connected_occupant_positions();
    let now = Instant::now();

    let mut evicted = 0;
    for (key, loaded_at) in &snapshot {
        if now.duration_since(*loaded_at) <= threshold {
            continue;
        }
        if occupant_nearby(&occupants, key, policy.occupant_radius) {
            continue;
        }
        if evictor.force_unload(key) {
            evicted += 1;
        }
    }

    let summary = SweepSummary {
        evicted,
        still_tracked: evictor.tracker().tracked_count(),
        aggressive,
    };
    if summary.evicted > 0 || tracked > policy.max_resident / 2 {
        info!(
            "Sweep complete: evicted {}, still tracking {}, aggressive: {}",
            summary.evicted, summary.still_tracked, summary.aggressive
        );
    }
    summary
}

fn occupant_nearby(occupants: &[ParcelKey], key: &ParcelKey, radius: i32) -> bool {
    occupants.iter().any(|position| {
        position.world_id == key.world_id
            && (position.x - key.x).abs() <= radius
            && (position.z - key.z).abs() <= radius
    })
}

/// Handle to the background sweep task.
pub struct EvictionSweeper {
    stop_tx: Option<oneshot::Sender<()>>,
    join_handle: Option<JoinHandle<()>>,
}

impl EvictionSweeper {
    /// Signals the worker to stop and waits for it to finish.
    pub async fn stop(mut self) -> Result<()> {
        if let Some(stop_tx) = self.stop_tx.take() {
            let _ = stop_tx.send(());
        }
        if let Some(join_handle) = self.join_handle.take() {
            join_handle
                .await
                .map_err(|err| ParcelError::Task(format!("sweeper join: {}", err)))?;
        }
        Ok(())
    }
}

impl Drop for EvictionSweeper {
    fn drop(&mut self) {
        if let Some(stop_tx) = self.stop_tx.take() {
            let _ = stop_tx.send(());
        }
        if let Some(join_handle) = self.join_handle.take() {
            join_handle.abort();
        }
    }
}

/// Spawns the periodic sweep worker. Must be called from within a tokio
/// runtime.
pub fn spawn_sweeper(evictor: Arc<Evictor>) -> EvictionSweeper {
    let interval = evictor.policy().sweep_interval();
    let (stop_tx, mut stop_rx) = oneshot::channel::<()>();

    let join_handle = tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = &mut stop_rx => {
                    break;
                }
                _ = sleep(interval) => {
                    run_sweep(&evictor);
                }
            }
        }
    });

    EvictionSweeper {
        stop_tx: Some(stop_tx),
        join_handle: Some(join_handle),
    }
}
