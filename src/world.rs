use crate::core::ParcelKey;

/// Collaborator surface implemented by the world runtime. Every call is a
/// cheap lookup or a best-effort request; none may block for unbounded time.
pub trait WorldHost: Send + Sync {
    /// Whether the parcel is currently held in active memory.
    fn is_parcel_loaded(&self, key: &ParcelKey) -> bool;

    /// Number of live entities physically present in the parcel.
    fn occupant_count(&self, key: &ParcelKey) -> usize;

    /// Whether another subsystem has force-loaded the parcel.
    fn is_externally_pinned(&self, key: &ParcelKey) -> bool;

    /// Best-effort unload request; the host may ignore it if conditions
    /// changed since the caller checked.
    fn unload_parcel(&self, key: &ParcelKey);

    /// Parcel positions of every connected occupant.
    fn connected_occupant_positions(&self) -> Vec<ParcelKey>;
}
