//! In-process Repo Adapter fixture used by tests and property tests.
//!
//! Holds tag trees and blob content directly so test code can assert on
//! exactly what bytes a blob contains, without a real git repository on
//! disk.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::RwLock;

use sha1::{Digest, Sha1};

use super::RepoAdapter;
use crate::error::{ElixirError, ElixirResult};
use crate::types::{BlobHash, TagName, TreeEntry};

fn hash_content(bytes: &[u8]) -> BlobHash {
    let mut hasher = Sha1::new();
    // git hashes the "blob <len>\0" header along with the content; match
    // that so two adapters asked to hash the same bytes agree.
    hasher.update(format!("blob {}\0", bytes.len()).as_bytes());
    hasher.update(bytes);
    let digest = hasher.finalize();
    let mut out = [0u8; 20];
    out.copy_from_slice(&digest);
    BlobHash::from_bytes(out)
}

#[derive(Default)]
pub struct MemoryRepoAdapter {
    tags: RwLock<BTreeMap<TagName, Vec<(PathBuf, Vec<u8>)>>>,
    /// Order tags were added in, oldest first. `add_tag` on an already-
    /// present tag does not move it — it simulates a retag, not a new
    /// release.
    tag_order: RwLock<Vec<TagName>>,
    blobs: RwLock<BTreeMap<BlobHash, Vec<u8>>>,
}

impl MemoryRepoAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a tag with the given `(path, content)` listing.
    /// Content hashing happens here, mirroring what a real VCS backend
    /// would have already done before this adapter ever sees the tag.
    /// Tags are considered newest-first in the reverse of the order
    /// they were first added, matching the ordering `tags()` promises.
    pub fn add_tag(&self, tag: impl Into<TagName>, files: Vec<(PathBuf, Vec<u8>)>) {
        let tag = tag.into();
        let mut blobs = self.blobs.write().unwrap();
        let mut entries = Vec::with_capacity(files.len());
        for (path, content) in files {
            let hash = hash_content(&content);
            blobs.entry(hash).or_insert_with(|| content.clone());
            entries.push((path, content));
        }
        let is_new = !self.tags.read().unwrap().contains_key(&tag);
        self.tags.write().unwrap().insert(tag.clone(), entries);
        if is_new {
            self.tag_order.write().unwrap().push(tag);
        }
    }

    /// Remove a blob from the backing store without touching any tag's
    /// tree listing, simulating a repository that has lost an object it
    /// still claims to reference.
    pub fn drop_blob(&self, hash: &BlobHash) {
        self.blobs.write().unwrap().remove(hash);
    }
}

impl RepoAdapter for MemoryRepoAdapter {
    fn tags(&self) -> ElixirResult<Vec<TagName>> {
        let mut order = self.tag_order.read().unwrap().clone();
        order.reverse();
        Ok(order)
    }

    fn tag_tree(&self, tag: &TagName) -> ElixirResult<Vec<TreeEntry>> {
        let tags = self.tags.read().unwrap();
        let files = tags.get(tag).ok_or_else(|| ElixirError::TagAborted {
            tag: tag.clone(),
            reason: format!("tag '{}' not found", tag.0),
        })?;
        Ok(files
            .iter()
            .map(|(path, content)| TreeEntry {
                path: path.clone(),
                hash: hash_content(content),
            })
            .collect())
    }

    fn read_blob(&self, hash: &BlobHash) -> ElixirResult<Vec<u8>> {
        self.blobs
            .read()
            .unwrap()
            .get(hash)
            .cloned()
            .ok_or(ElixirError::BlobMissing { hash: *hash })
    }
}
