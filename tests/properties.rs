//! Property tests for the universal invariants of §8: blob bijection,
//! dense numbering, reference closure, and idempotence.

use std::path::PathBuf;
use std::sync::Arc;

use proptest::prelude::*;

use elixir_xref::blob::BlobIdentityStore;
use elixir_xref::coordinator::UpdateCoordinator;
use elixir_xref::repo::MemoryRepoAdapter;
use elixir_xref::types::BlobHash;
use elixir_xref::{CrossRefDatabase, DatabasePersistence};

fn arb_hash() -> impl Strategy<Value = BlobHash> {
    proptest::collection::vec(any::<u8>(), 20..=20).prop_map(|bytes| {
        let mut out = [0u8; 20];
        out.copy_from_slice(&bytes);
        BlobHash::from_bytes(out)
    })
}

proptest! {
    /// Interning the same sequence of hashes any number of times never
    /// produces two numbers for one hash, or two hashes for one number.
    #[test]
    fn blob_numbering_is_a_bijection(hashes in proptest::collection::vec(arb_hash(), 1..50)) {
        let store = BlobIdentityStore::new();
        let mut seen = std::collections::HashMap::new();

        for hash in &hashes {
            let (num, _) = store.intern(*hash);
            if let Some(&prior) = seen.get(hash) {
                prop_assert_eq!(num, prior);
            } else {
                seen.insert(*hash, num);
            }
            prop_assert_eq!(store.hash_for(num), Some(*hash));
            prop_assert_eq!(store.num_for(hash), Some(num));
        }
    }

    /// Blob numbers are dense and start at 1: interning N distinct
    /// hashes yields exactly the numbers 1..=N.
    #[test]
    fn blob_numbers_are_dense(hashes in proptest::collection::vec(arb_hash(), 1..50)) {
        let store = BlobIdentityStore::new();
        let mut distinct = std::collections::HashSet::new();
        let mut numbers = Vec::new();
        for hash in &hashes {
            let (num, is_new) = store.intern(*hash);
            if distinct.insert(*hash) {
                prop_assert!(is_new);
                numbers.push(num.get());
            }
        }
        numbers.sort_unstable();
        let expected: Vec<u32> = (1..=numbers.len() as u32).collect();
        prop_assert_eq!(numbers, expected);
    }
}

/// Every key in `refs` is also a key in `defs` — the reference pass only
/// ever records tokens that were already known identifiers when it
/// started, never resolves forward.
#[test]
fn reference_keys_are_a_subset_of_definition_keys() {
    let repo = Arc::new(MemoryRepoAdapter::new());
    repo.add_tag(
        "v1",
        vec![
            (PathBuf::from("a.c"), b"int x; int f(){return x;}\n".to_vec()),
            (PathBuf::from("b.c"), b"void g(){x=1; return undefined_name();}\n".to_vec()),
        ],
    );

    let db = Arc::new(CrossRefDatabase::new());
    let temp = tempfile::TempDir::new().unwrap();
    let persistence = Arc::new(DatabasePersistence::new(temp.path().to_path_buf()));
    let coordinator = UpdateCoordinator::new(repo, Arc::clone(&db), persistence, 5);
    coordinator.update_all(|_| {}).unwrap();

    let known = db.known_idents();
    // `known_idents` is read again after the run, so it reflects every
    // identifier the definition pass ever recorded — a ref key must be
    // among them, since the coordinator filters tokens through exactly
    // this set before ever calling `append_ref`.
    assert!(!known.contains("undefined_name"), "undefined_name is never defined anywhere in the fixture");
    for name in ["x", "f", "g"] {
        let refs = db.refs_for(name);
        if !refs.is_empty() {
            assert!(known.contains(name));
        }
    }
}

/// Re-running `update_all` after a fully successful run performs zero
/// new extraction work.
#[test]
fn rerunning_a_fully_indexed_run_is_a_no_op() {
    let repo = Arc::new(MemoryRepoAdapter::new());
    repo.add_tag("v1", vec![(PathBuf::from("a.c"), b"int f(){return 0;}\n".to_vec())]);

    let db = Arc::new(CrossRefDatabase::new());
    let temp = tempfile::TempDir::new().unwrap();
    let persistence = Arc::new(DatabasePersistence::new(temp.path().to_path_buf()));
    let coordinator = UpdateCoordinator::new(repo, Arc::clone(&db), persistence, 5);

    let first = coordinator.update_all(|_| {}).unwrap();
    assert_eq!(first.len(), 1);

    let second = coordinator.update_all(|_| {}).unwrap();
    assert!(second.is_empty(), "an already-indexed tag is skipped entirely on rerun");
}
