use dashmap::DashMap;

use crate::blob::BlobIdentityStore;
use crate::family::Family;
use crate::types::{BlobNum, DefOccurrence, RefOccurrence, TagName, TreeEntry};

use super::persistence::DatabasePersistence;

/// Canonical in-memory state of the six logical maps, plus the durable
/// persistence boundary.
///
/// The coordinator is the only writer; extraction workers only ever see
/// `&self` through read-only helper methods, so the per-key guard this
/// type provides (one `DashMap` shard lock per key) is never contended
/// by concurrent list-appends to the *same* key.
#[derive(Default)]
pub struct CrossRefDatabase {
    pub blobs: BlobIdentityStore,
    tag_tree: DashMap<TagName, Vec<TreeEntry>>,
    tag_indexed: DashMap<TagName, bool>,
    defs: DashMap<String, Vec<DefOccurrence>>,
    refs: DashMap<String, Vec<RefOccurrence>>,
    /// Reverse index from blob to the identifiers defined in it, kept in
    /// lockstep with `defs` so a per-file query never has to scan every
    /// identifier in the database.
    blob_defs: DashMap<BlobNum, Vec<(String, DefOccurrence)>>,
    /// `true` once the definition pass has succeeded for a
    /// `(blob, family)` pair; `false` means it was attempted and failed
    /// (the pair is marked partial and retried on the next update).
    defs_status: DashMap<(BlobNum, Family), bool>,
    refs_status: DashMap<(BlobNum, Family), bool>,
}

impl CrossRefDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_tag_tree(&self, tag: TagName, entries: Vec<TreeEntry>) {
        self.tag_tree.insert(tag, entries);
    }

    pub fn tag_tree(&self, tag: &TagName) -> Option<Vec<TreeEntry>> {
        self.tag_tree.get(tag).map(|entry| entry.clone())
    }

    pub fn is_indexed(&self, tag: &TagName) -> bool {
        self.tag_indexed.get(tag).map(|v| *v).unwrap_or(false)
    }

    pub fn tags(&self) -> Vec<(TagName, bool)> {
        self.tag_indexed.iter().map(|entry| (entry.key().clone(), *entry.value())).collect()
    }

    /// Append one definition occurrence under an identifier's key. Never
    /// overwrites a prior occurrence — definitions only ever accumulate.
    pub fn append_def(&self, name: &str, occurrence: DefOccurrence) {
        self.blob_defs
            .entry(occurrence.blob)
            .or_default()
            .push((name.to_string(), occurrence.clone()));
        self.defs.entry(name.to_string()).or_default().push(occurrence);
    }

    pub fn defs_for(&self, name: &str) -> Vec<DefOccurrence> {
        self.defs.get(name).map(|entry| entry.clone()).unwrap_or_default()
    }

    /// Every `(identifier, occurrence)` defined in a given blob, across
    /// all families it was indexed under.
    pub fn defs_in_blob(&self, blob: BlobNum) -> Vec<(String, DefOccurrence)> {
        self.blob_defs.get(&blob).map(|entry| entry.clone()).unwrap_or_default()
    }

    /// The full key set of `defs` as it stood when the reference pass
    /// for a tag starts — the set of identifiers a reference can
    /// possibly resolve to.
    pub fn known_idents(&self) -> std::collections::HashSet<String> {
        self.defs.iter().map(|entry| entry.key().clone()).collect()
    }

    /// Append reference lines for `(blob, family)` under an identifier's
    /// key, merging into an existing occurrence for the same blob and
    /// family if one is already present rather than creating a
    /// duplicate entry.
    pub fn append_ref(&self, name: &str, blob: BlobNum, family: crate::family::Family, mut lines: Vec<u32>) {
        let mut entries = self.refs.entry(name.to_string()).or_default();
        if let Some(existing) = entries.iter_mut().find(|r| r.blob == blob && r.family == family) {
            existing.lines.append(&mut lines);
            existing.lines.sort_unstable();
            existing.lines.dedup();
        } else {
            lines.sort_unstable();
            lines.dedup();
            entries.push(RefOccurrence { blob, family, lines });
        }
    }

    pub fn refs_for(&self, name: &str) -> Vec<RefOccurrence> {
        self.refs.get(name).map(|entry| entry.clone()).unwrap_or_default()
    }

    /// Whether `(blob, family)` still needs its definition pass run: it
    /// is either wholly new or was previously marked partial.
    pub fn needs_defs(&self, blob: BlobNum, family: Family) -> bool {
        !matches!(self.defs_status.get(&(blob, family)), Some(v) if *v)
    }

    pub fn mark_defs(&self, blob: BlobNum, family: Family, success: bool) {
        self.defs_status.insert((blob, family), success);
    }

    /// Whether `(blob, family)` still needs its reference pass run.
    pub fn needs_refs(&self, blob: BlobNum, family: Family) -> bool {
        !matches!(self.refs_status.get(&(blob, family)), Some(v) if *v)
    }

    pub fn mark_refs(&self, blob: BlobNum, family: Family, success: bool) {
        self.refs_status.insert((blob, family), success);
    }

    /// Identifiers whose `defs` or `refs` key starts with `prefix`, in
    /// sorted order — the stable ordering persisted keys are queried
    /// under.
    pub fn iter_prefix(&self, prefix: &str) -> Vec<String> {
        let mut matches: std::collections::BTreeSet<String> = self
            .defs
            .iter()
            .map(|e| e.key().clone())
            .filter(|k| k.starts_with(prefix))
            .collect();
        matches.extend(self.refs.iter().map(|e| e.key().clone()).filter(|k| k.starts_with(prefix)));
        matches.into_iter().collect()
    }

    pub(super) fn to_snapshot(&self) -> super::persistence::DatabaseSnapshot {
        super::persistence::DatabaseSnapshot {
            blob_hashes: self.blobs.snapshot_hashes(),
            blob_paths: self.blobs.snapshot_paths(),
            tag_tree: self.tag_tree.iter().map(|e| (e.key().clone(), e.value().clone())).collect(),
            tag_indexed: self.tag_indexed.iter().map(|e| (e.key().clone(), *e.value())).collect(),
            defs: self.defs.iter().map(|e| (e.key().clone(), e.value().clone())).collect(),
            refs: self.refs.iter().map(|e| (e.key().clone(), e.value().clone())).collect(),
            defs_status: self.defs_status.iter().map(|e| (*e.key(), *e.value())).collect(),
            refs_status: self.refs_status.iter().map(|e| (*e.key(), *e.value())).collect(),
        }
    }

    pub(super) fn from_snapshot(snapshot: super::persistence::DatabaseSnapshot) -> Self {
        let blobs = BlobIdentityStore::from_snapshot(snapshot.blob_hashes, snapshot.blob_paths);
        let tag_tree = DashMap::new();
        for (tag, entries) in snapshot.tag_tree {
            tag_tree.insert(tag, entries);
        }
        let tag_indexed = DashMap::new();
        for (tag, indexed) in snapshot.tag_indexed {
            tag_indexed.insert(tag, indexed);
        }
        let defs = DashMap::new();
        let blob_defs: DashMap<BlobNum, Vec<(String, DefOccurrence)>> = DashMap::new();
        for (name, occurrences) in snapshot.defs {
            for occurrence in &occurrences {
                blob_defs.entry(occurrence.blob).or_default().push((name.clone(), occurrence.clone()));
            }
            defs.insert(name, occurrences);
        }
        let refs = DashMap::new();
        for (name, occurrences) in snapshot.refs {
            refs.insert(name, occurrences);
        }
        let defs_status = DashMap::new();
        for (key, value) in snapshot.defs_status {
            defs_status.insert(key, value);
        }
        let refs_status = DashMap::new();
        for (key, value) in snapshot.refs_status {
            refs_status.insert(key, value);
        }
        Self {
            blobs,
            tag_tree,
            tag_indexed,
            defs,
            refs,
            blob_defs,
            defs_status,
            refs_status,
        }
    }

    /// Begin a batch for `tag`. The batch must be explicitly committed
    /// or aborted; dropping it uncommitted only logs a warning, since
    /// any writes made through `self` during the batch are already live
    /// in memory regardless of commit/abort — persistence, not
    /// visibility, is what `commit` controls.
    pub fn begin<'a>(&'a self, tag: TagName) -> Batch<'a> {
        Batch {
            db: self,
            tag,
            completed: false,
        }
    }
}

/// Tracks the commit/abort discipline for one tag's update: the
/// `indexed` flag is only ever set, and only ever durably persisted,
/// inside [`Batch::commit`].
pub struct Batch<'a> {
    db: &'a CrossRefDatabase,
    tag: TagName,
    completed: bool,
}

impl Batch<'_> {
    pub fn tag(&self) -> &TagName {
        &self.tag
    }

    /// Persist the full database snapshot, with this tag marked indexed,
    /// and only once that succeeds mark it indexed in memory too. Crash
    /// safety depends on `indexed` never being set in memory before this
    /// call succeeds.
    pub fn commit(mut self, persistence: &DatabasePersistence) -> crate::error::ElixirResult<()> {
        let mut snapshot = self.db.to_snapshot();
        match snapshot.tag_indexed.iter_mut().find(|(tag, _)| *tag == self.tag) {
            Some((_, indexed)) => *indexed = true,
            None => snapshot.tag_indexed.push((self.tag.clone(), true)),
        }
        persistence.save(&snapshot)?;
        self.db.tag_indexed.insert(self.tag.clone(), true);
        self.completed = true;
        Ok(())
    }

    /// Persist intermediate progress (e.g. after the definition pass)
    /// without marking the tag indexed.
    pub fn checkpoint(&self, persistence: &DatabasePersistence) -> crate::error::ElixirResult<()> {
        let snapshot = self.db.to_snapshot();
        persistence.save(&snapshot)
    }

    pub fn abort(mut self, reason: String) -> crate::error::ElixirError {
        self.completed = true;
        crate::error::ElixirError::TagAborted {
            tag: self.tag.clone(),
            reason,
        }
    }
}

impl Drop for Batch<'_> {
    fn drop(&mut self) {
        if !self.completed {
            tracing::warn!(tag = %self.tag, "batch dropped without explicit commit or abort");
        }
    }
}
