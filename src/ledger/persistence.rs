//! Durable storage for the ownership ledger: one pretty-printed JSON
//! document mapping `"x,z,worldID"` keys to claim objects.

use crate::core::{ClaimRecord, OwnerKind, ParcelKey, Result};
use log::{error, warn};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

/// One persisted claim. `ownerKind` is an additive field: documents written
/// before it existed load through the legacy owner-id tag instead, and
/// unknown fields in newer documents are skipped on read.
#[derive(Debug, Serialize, Deserialize)]
struct StoredClaim {
    x: i32,
    z: i32,
    #[serde(rename = "worldID")]
    world_id: String,
    #[serde(rename = "ownerID")]
    owner_id: String,
    #[serde(rename = "ownerKind", default, skip_serializing_if = "Option::is_none")]
    owner_kind: Option<OwnerKind>,
}

pub struct LedgerStore {
    path: PathBuf,
}

impl LedgerStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Best-effort load. A missing file is an empty ledger; an unreadable
    /// file or a malformed entry is logged and skipped, never fatal.
    pub fn load(&self) -> HashMap<ParcelKey, ClaimRecord> {
        let mut claims = HashMap::new();
        if !self.path.exists() {
            return claims;
        }

        let file = match File::open(&self.path) {
            Ok(file) => file,
            Err(err) => {
                error!("Failed to open ledger document {}: {}", self.path.display(), err);
                return claims;
            }
        };

        let raw: HashMap<String, serde_json::Value> =
            match serde_json::from_reader(BufReader::new(file)) {
                Ok(raw) => raw,
                Err(err) => {
                    error!("Failed to parse ledger document {}: {}", self.path.display(), err);
                    return claims;
                }
            };

        for (key_str, value) in raw {
            if ParcelKey::from_storage_key(&key_str).is_none() {
                warn!("Skipping malformed parcel key '{}'", key_str);
                continue;
            }
            let stored: StoredClaim = match serde_json::from_value(value) {
                Ok(stored) => stored,
                Err(err) => {
                    warn!("Skipping malformed claim entry '{}': {}", key_str, err);
                    continue;
                }
            };
            let kind = match stored
                .owner_kind
                .or_else(|| OwnerKind::from_legacy_tag(&stored.owner_id))
            {
                Some(kind) => kind,
                None => {
                    warn!(
                        "Skipping claim '{}': cannot determine owner kind for '{}'",
                        key_str, stored.owner_id
                    );
                    continue;
                }
            };
            let key = ParcelKey::new(stored.world_id, stored.x, stored.z);
            claims.insert(key.clone(), ClaimRecord::new(key, stored.owner_id, kind));
        }
        claims
    }

    /// Full-snapshot overwrite via temp file + rename, pretty-printed.
    /// Parent-directory creation is idempotent.
    pub fn save(&self, claims: &HashMap<ParcelKey, ClaimRecord>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut document = BTreeMap::new();
        for record in claims.values() {
            document.insert(
                record.key.storage_key(),
                StoredClaim {
                    x: record.key.x,
                    z: record.key.z,
                    world_id: record.key.world_id.clone(),
                    owner_id: record.owner_id.clone(),
                    owner_kind: Some(record.kind),
                },
            );
        }

        let temp_path = self.path.with_extension("tmp");
        let file = File::create(&temp_path)?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, &document)?;
        writer.flush()?;
        fs::rename(&temp_path, &self.path)?;
        Ok(())
    }
}
