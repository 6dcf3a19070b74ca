use serde::{Deserialize, Serialize};
use std::fmt;

/// Unique address of a grid cell: world id plus two integer coordinates.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ParcelKey {
    pub world_id: String,
    pub x: i32,
    pub z: i32,
}

impl ParcelKey {
    pub fn new(world_id: impl Into<String>, x: i32, z: i32) -> Self {
        Self {
            world_id: world_id.into(),
            x,
            z,
        }
    }

    /// Stable `"x,z,worldID"` form used as the persistence map key.
    pub fn storage_key(&self) -> String {
        format!("{},{},{}", self.x, self.z, self.world_id)
    }

    /// Parses the `"x,z,worldID"` form. The world id may itself contain
    /// commas; malformed input yields `None`, never a panic.
    pub fn from_storage_key(raw: &str) -> Option<Self> {
        let mut parts = raw.splitn(3, ',');
        let x = parts.next()?.trim().parse().ok()?;
        let z = parts.next()?.trim().parse().ok()?;
        let world_id = parts.next()?;
        if world_id.is_empty() {
            return None;
        }
        Some(Self::new(world_id, x, z))
    }

    /// The four axis neighbours in the same world.
    pub fn adjacent(&self) -> [ParcelKey; 4] {
        [
            ParcelKey::new(self.world_id.clone(), self.x + 1, self.z),
            ParcelKey::new(self.world_id.clone(), self.x - 1, self.z),
            ParcelKey::new(self.world_id.clone(), self.x, self.z + 1),
            ParcelKey::new(self.world_id.clone(), self.x, self.z - 1),
        ]
    }
}

impl fmt::Display for ParcelKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{},{}", self.x, self.z, self.world_id)
    }
}

/// Kind of entity holding a claim. Chosen at claim time and stored
/// structurally; the tag prefix in the owner id is only consulted when
/// reading documents written before the kind field existed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OwnerKind {
    Settlement,
    Federation,
    Landmark,
}

impl OwnerKind {
    /// Fallback inference from the tag older documents embed in the owner id
    /// (`T…` settlement, `R…` federation, `L…` landmark).
    pub fn from_legacy_tag(owner_id: &str) -> Option<Self> {
        match owner_id.chars().next() {
            Some('T') => Some(Self::Settlement),
            Some('R') => Some(Self::Federation),
            Some('L') => Some(Self::Landmark),
            _ => None,
        }
    }
}

impl fmt::Display for OwnerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Settlement => "settlement",
            Self::Federation => "federation",
            Self::Landmark => "landmark",
        };
        write!(f, "{}", name)
    }
}

/// A durable record that a parcel is owned by some entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClaimRecord {
    pub key: ParcelKey,
    pub owner_id: String,
    pub kind: OwnerKind,
}

impl ClaimRecord {
    pub fn new(key: ParcelKey, owner_id: impl Into<String>, kind: OwnerKind) -> Self {
        Self {
            key,
            owner_id: owner_id.into(),
            kind,
        }
    }
}

/// Claim state of a parcel. Absence of a record is `Wilderness`, never a
/// null at the API surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Claim {
    Claimed(ClaimRecord),
    Wilderness,
}

impl Claim {
    pub fn is_claimed(&self) -> bool {
        matches!(self, Self::Claimed(_))
    }

    pub fn record(&self) -> Option<&ClaimRecord> {
        match self {
            Self::Claimed(record) => Some(record),
            Self::Wilderness => None,
        }
    }

    pub fn owner_id(&self) -> Option<&str> {
        self.record().map(|record| record.owner_id.as_str())
    }
}
