//! Atomic snapshot persistence for the Cross-Reference Database.
//!
//! A `save` writes to a temp file then renames over the canonical path,
//! so a crash mid-write never leaves a half-written snapshot in place —
//! readers either see the prior snapshot or the new one, never a mix.

use std::fs;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{ElixirError, ElixirResult};
use crate::family::Family;
use crate::types::{BlobHash, BlobNum, DefOccurrence, RefOccurrence, TagName, TreeEntry};

use super::database::CrossRefDatabase;

#[derive(Serialize, Deserialize)]
pub(super) struct DatabaseSnapshot {
    pub blob_hashes: Vec<BlobHash>,
    pub blob_paths: Vec<(BlobNum, Vec<PathBuf>)>,
    pub tag_tree: Vec<(TagName, Vec<TreeEntry>)>,
    pub tag_indexed: Vec<(TagName, bool)>,
    pub defs: Vec<(String, Vec<DefOccurrence>)>,
    pub refs: Vec<(String, Vec<RefOccurrence>)>,
    pub defs_status: Vec<((BlobNum, Family), bool)>,
    pub refs_status: Vec<((BlobNum, Family), bool)>,
}

/// Bounded retry budget for the temp-write-then-rename, per spec §7:
/// `DatabaseBusy` failures are retried with backoff before escalating.
const MAX_SAVE_ATTEMPTS: u32 = 4;
const INITIAL_BACKOFF: std::time::Duration = std::time::Duration::from_millis(20);

pub struct DatabasePersistence {
    base_path: PathBuf,
}

impl DatabasePersistence {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn snapshot_path(&self) -> PathBuf {
        self.base_path.join("database.bin")
    }

    pub(super) fn save(&self, snapshot: &DatabaseSnapshot) -> ElixirResult<()> {
        fs::create_dir_all(&self.base_path).map_err(|source| ElixirError::DatabaseCorrupt {
            path: self.base_path.clone(),
            reason: format!("could not create data directory: {source}"),
        })?;

        let bytes = bincode::serialize(snapshot).map_err(|source| ElixirError::DatabaseCorrupt {
            path: self.snapshot_path(),
            reason: format!("failed to serialize snapshot: {source}"),
        })?;

        let temp_path = self.snapshot_path().with_extension("tmp");
        let mut backoff = INITIAL_BACKOFF;

        for attempt in 1..=MAX_SAVE_ATTEMPTS {
            let result = fs::write(&temp_path, &bytes).and_then(|_| fs::rename(&temp_path, self.snapshot_path()));

            match result {
                Ok(()) => return Ok(()),
                Err(source) if attempt < MAX_SAVE_ATTEMPTS => {
                    std::thread::sleep(backoff);
                    backoff *= 2;
                }
                Err(source) => {
                    return Err(ElixirError::DatabaseBusy {
                        reason: format!(
                            "failed to persist snapshot at '{}' after {attempt} attempts: {source}",
                            self.snapshot_path().display()
                        ),
                    });
                }
            }
        }

        unreachable!("loop always returns within MAX_SAVE_ATTEMPTS iterations")
    }

    pub fn exists(&self) -> bool {
        self.snapshot_path().exists()
    }

    /// Load a database from its persisted snapshot, or construct an
    /// empty one if no snapshot exists yet (first `update` run).
    pub fn load(&self) -> ElixirResult<CrossRefDatabase> {
        if !self.exists() {
            return Ok(CrossRefDatabase::new());
        }

        let bytes = fs::read(self.snapshot_path()).map_err(|source| ElixirError::DatabaseCorrupt {
            path: self.snapshot_path(),
            reason: format!("failed to read snapshot: {source}"),
        })?;

        let snapshot: DatabaseSnapshot = bincode::deserialize(&bytes).map_err(|source| ElixirError::DatabaseCorrupt {
            path: self.snapshot_path(),
            reason: format!("failed to deserialize snapshot: {source}"),
        })?;

        Ok(CrossRefDatabase::from_snapshot(snapshot))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::family::Family;
    use crate::types::{BlobNum, DefKind, TagName};
    use tempfile::TempDir;

    #[test]
    fn save_then_load_round_trips_state() {
        let temp = TempDir::new().unwrap();
        let persistence = DatabasePersistence::new(temp.path().to_path_buf());

        let db = CrossRefDatabase::new();
        let (num, _) = db.blobs.intern(BlobHash::from_bytes([1; 20]));
        db.blobs.add_path(num, PathBuf::from("main.c"));
        db.append_def(
            "main",
            DefOccurrence {
                blob: num,
                line: 1,
                kind: DefKind::from("function"),
                family: Family::C,
            },
        );
        db.set_tag_tree(TagName::from("v1"), vec![]);

        let batch = db.begin(TagName::from("v1"));
        batch.commit(&persistence).unwrap();

        let loaded = persistence.load().unwrap();
        assert!(loaded.is_indexed(&TagName::from("v1")));
        assert_eq!(loaded.defs_for("main").len(), 1);
        assert_eq!(loaded.blobs.hash_for(num), Some(BlobHash::from_bytes([1; 20])));
    }

    #[test]
    fn load_without_prior_snapshot_is_empty() {
        let temp = TempDir::new().unwrap();
        let persistence = DatabasePersistence::new(temp.path().to_path_buf());
        let db = persistence.load().unwrap();
        assert!(db.blobs.is_empty());
    }
}
