//! Blob Identity Store: the dense bijective mapping between a blob's
//! content hash and its monotonically allocated number.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::RwLock;

use dashmap::DashMap;

use crate::types::{BlobHash, BlobNum};

/// The hash↔number bijection, held behind a single lock so allocating a
/// number and recording its hash happen as one atomic step. Paths are
/// tracked separately since they never need to be consistent with the
/// allocation itself.
#[derive(Default)]
struct Identities {
    hash_to_num: HashMap<BlobHash, BlobNum>,
    num_to_hash: Vec<BlobHash>,
}

#[derive(Default)]
pub struct BlobIdentityStore {
    identities: RwLock<Identities>,
    num_to_paths: DashMap<BlobNum, Vec<PathBuf>>,
}

impl BlobIdentityStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Intern a blob hash, allocating a new number if this is the first
    /// time it's been seen. Returns `(number, is_new)`. Atomic across
    /// concurrent callers: the existence check, allocation, and both
    /// sides of the bijection are updated under one write lock, so two
    /// racing calls for different hashes can never interleave their
    /// allocation with their bookkeeping.
    pub fn intern(&self, hash: BlobHash) -> (BlobNum, bool) {
        {
            let identities = self.identities.read().unwrap();
            if let Some(existing) = identities.hash_to_num.get(&hash) {
                return (*existing, false);
            }
        }

        let mut identities = self.identities.write().unwrap();
        if let Some(existing) = identities.hash_to_num.get(&hash) {
            return (*existing, false);
        }

        let raw = identities.num_to_hash.len() as u32 + 1;
        let num = BlobNum::new(raw).expect("allocator never yields zero");
        identities.num_to_hash.push(hash);
        identities.hash_to_num.insert(hash, num);
        (num, true)
    }

    pub fn hash_for(&self, num: BlobNum) -> Option<BlobHash> {
        self.identities.read().unwrap().num_to_hash.get(num.index()).copied()
    }

    pub fn num_for(&self, hash: &BlobHash) -> Option<BlobNum> {
        self.identities.read().unwrap().hash_to_num.get(hash).copied()
    }

    /// Record that a blob number is reachable under `path` for at least
    /// one tag. Paths accumulate; a blob keeps every path it has ever
    /// been seen under across all indexed tags.
    pub fn add_path(&self, num: BlobNum, path: PathBuf) {
        let mut paths = self.num_to_paths.entry(num).or_default();
        if !paths.contains(&path) {
            paths.push(path);
        }
    }

    pub fn paths_for(&self, num: BlobNum) -> Vec<PathBuf> {
        self.num_to_paths.get(&num).map(|entry| entry.clone()).unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.identities.read().unwrap().num_to_hash.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Dense list of every interned hash, ordered by blob number — the
    /// serializable form persisted by the database snapshot.
    pub fn snapshot_hashes(&self) -> Vec<BlobHash> {
        self.identities.read().unwrap().num_to_hash.clone()
    }

    pub fn snapshot_paths(&self) -> Vec<(BlobNum, Vec<PathBuf>)> {
        self.num_to_paths
            .iter()
            .map(|entry| (*entry.key(), entry.value().clone()))
            .collect()
    }

    /// Rebuild a store from a previously persisted snapshot. The
    /// hash→number map and the allocation counter are both derived from
    /// `hashes`, since it is ordered by blob number and dense by
    /// construction.
    pub fn from_snapshot(hashes: Vec<BlobHash>, paths: Vec<(BlobNum, Vec<PathBuf>)>) -> Self {
        let mut hash_to_num = HashMap::with_capacity(hashes.len());
        for (idx, hash) in hashes.iter().enumerate() {
            let num = BlobNum::new(idx as u32 + 1).expect("snapshot index is never zero-based here");
            hash_to_num.insert(*hash, num);
        }
        let num_to_paths = DashMap::with_capacity(paths.len());
        for (num, p) in paths {
            num_to_paths.insert(num, p);
        }
        Self {
            identities: RwLock::new(Identities {
                hash_to_num,
                num_to_hash: hashes,
            }),
            num_to_paths,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hash(byte: u8) -> BlobHash {
        BlobHash::from_bytes([byte; 20])
    }

    #[test]
    fn interning_is_idempotent() {
        let store = BlobIdentityStore::new();
        let (num1, new1) = store.intern(hash(1));
        let (num2, new2) = store.intern(hash(1));
        assert_eq!(num1, num2);
        assert!(new1);
        assert!(!new2);
    }

    #[test]
    fn numbers_are_dense_and_start_at_one() {
        let store = BlobIdentityStore::new();
        let (n1, _) = store.intern(hash(1));
        let (n2, _) = store.intern(hash(2));
        let (n3, _) = store.intern(hash(3));
        assert_eq!(n1.get(), 1);
        assert_eq!(n2.get(), 2);
        assert_eq!(n3.get(), 3);
    }

    #[test]
    fn hash_and_num_are_mutually_invertible() {
        let store = BlobIdentityStore::new();
        let h = hash(7);
        let (num, _) = store.intern(h);
        assert_eq!(store.hash_for(num), Some(h));
        assert_eq!(store.num_for(&h), Some(num));
    }

    #[test]
    fn paths_accumulate_without_duplication() {
        let store = BlobIdentityStore::new();
        let (num, _) = store.intern(hash(1));
        store.add_path(num, PathBuf::from("a.c"));
        store.add_path(num, PathBuf::from("b.c"));
        store.add_path(num, PathBuf::from("a.c"));
        let mut paths = store.paths_for(num);
        paths.sort();
        assert_eq!(paths, vec![PathBuf::from("a.c"), PathBuf::from("b.c")]);
    }
}
