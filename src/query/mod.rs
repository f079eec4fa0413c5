//! Query Interface: read-only lookups over an indexed tag.

pub mod rest;

use std::path::Path;

use crate::storage::CrossRefDatabase;
use crate::types::{BlobNum, DefOccurrence, RefOccurrence, TagName};

pub struct FileQueryResult {
    pub path: std::path::PathBuf,
    pub blob: BlobNum,
    pub definitions: Vec<(String, DefOccurrence)>,
}

pub struct IdentQueryResult {
    pub name: String,
    pub definitions: Vec<DefOccurrence>,
    pub references: Vec<RefOccurrence>,
}

pub struct QueryInterface<'a> {
    db: &'a CrossRefDatabase,
}

impl<'a> QueryInterface<'a> {
    pub fn new(db: &'a CrossRefDatabase) -> Self {
        Self { db }
    }

    /// Every identifier defined within the blob a tag's tree maps
    /// `path` to. Returns `None` if the tag is unindexed or the path
    /// isn't present in its tree.
    pub fn file(&self, tag: &TagName, path: &Path) -> Option<FileQueryResult> {
        let tree = self.db.tag_tree(tag)?;
        let entry = tree.iter().find(|e| e.path == path)?;
        let blob = self.db.blobs.num_for(&entry.hash)?;
        Some(FileQueryResult {
            path: entry.path.clone(),
            blob,
            definitions: self.db.defs_in_blob(blob),
        })
    }

    /// Every definition and reference of `name` in blobs reachable from
    /// `tag`'s tree, optionally narrowed to one family. Families are a
    /// closed set, so narrowing is a plain filter rather than a separate
    /// index. Returns `None` if the tag is unindexed.
    pub fn ident(&self, tag: &TagName, name: &str, family: Option<crate::family::Family>) -> Option<IdentQueryResult> {
        let tree = self.db.tag_tree(tag)?;
        let blobs_in_tag: std::collections::HashSet<BlobNum> =
            tree.iter().filter_map(|e| self.db.blobs.num_for(&e.hash)).collect();

        let mut definitions = self.db.defs_for(name);
        let mut references = self.db.refs_for(name);
        definitions.retain(|d| blobs_in_tag.contains(&d.blob));
        references.retain(|r| blobs_in_tag.contains(&r.blob));
        if let Some(family) = family {
            definitions.retain(|d| d.family == family);
            references.retain(|r| r.family == family);
        }
        Some(IdentQueryResult {
            name: name.to_string(),
            definitions,
            references,
        })
    }

    /// Identifiers starting with `prefix`, for prefix-search UIs.
    pub fn complete(&self, prefix: &str) -> Vec<String> {
        self.db.iter_prefix(prefix)
    }
}
