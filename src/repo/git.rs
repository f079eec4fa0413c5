//! Production Repo Adapter backed by a real git object store via `gix`.
//!
//! Tags, trees, and blobs are read straight from the repository's object
//! database; nothing is shelled out to the `git` binary.

use std::path::{Path, PathBuf};

use gix::bstr::ByteSlice;
use gix::objs::tree::EntryKind;

use super::RepoAdapter;
use crate::error::{ElixirError, ElixirResult};
use crate::types::{BlobHash, TagName, TreeEntry};

pub struct GitRepoAdapter {
    repo_path: PathBuf,
    repo: gix::Repository,
}

impl GitRepoAdapter {
    pub fn open(repo_path: impl AsRef<Path>) -> ElixirResult<Self> {
        let repo_path = repo_path.as_ref().to_path_buf();
        let repo = gix::open(&repo_path).map_err(|source| ElixirError::RepoUnavailable {
            path: repo_path.clone(),
            source: Box::new(source),
        })?;
        Ok(Self { repo_path, repo })
    }

    fn object_id_to_hash(id: gix::ObjectId) -> BlobHash {
        let mut bytes = [0u8; 20];
        bytes.copy_from_slice(&id.as_bytes()[..20]);
        BlobHash::from_bytes(bytes)
    }

    /// Build a matcher from the tag tree's root `.gitignore`, if any, so
    /// overrides tracked in the tree itself are honored the same way they
    /// would be for a checked-out working copy. Tree enumeration always
    /// comes from the object graph above this — this only decides which
    /// of those already-enumerated paths to drop.
    fn root_gitignore(&self, entries: &[TreeEntry]) -> Option<ignore::gitignore::Gitignore> {
        let gitignore_entry = entries.iter().find(|e| e.path == Path::new(".gitignore"))?;
        let bytes = self.read_blob(&gitignore_entry.hash).ok()?;
        let text = String::from_utf8_lossy(&bytes);

        let mut builder = ignore::gitignore::GitignoreBuilder::new(&self.repo_path);
        for line in text.lines() {
            let _ = builder.add_line(None, line);
        }
        builder.build().ok()
    }
}

impl RepoAdapter for GitRepoAdapter {
    fn tags(&self) -> ElixirResult<Vec<TagName>> {
        let refs = self.repo.references().map_err(|source| ElixirError::RepoUnavailable {
            path: self.repo_path.clone(),
            source: Box::new(source),
        })?;

        let mut tags: Vec<(TagName, i64)> = refs
            .tags()
            .map_err(|source| ElixirError::RepoUnavailable {
                path: self.repo_path.clone(),
                source: Box::new(source),
            })?
            .filter_map(Result::ok)
            .filter_map(|mut reference| {
                let name = reference.name().shorten().to_str().ok()?.to_string();
                let seconds = reference.peel_to_commit().ok().and_then(|c| c.time().ok()).map(|t| t.seconds).unwrap_or(0);
                Some((TagName::from(name), seconds))
            })
            .collect();

        // Newest-first: the tagged commit's committer time, descending.
        tags.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| b.0.cmp(&a.0)));

        Ok(tags.into_iter().map(|(tag, _)| tag).collect())
    }

    fn tag_tree(&self, tag: &TagName) -> ElixirResult<Vec<TreeEntry>> {
        let ref_name = format!("refs/tags/{}", tag.0);
        let mut reference = self
            .repo
            .find_reference(ref_name.as_str())
            .map_err(|_| ElixirError::TagAborted {
                tag: tag.clone(),
                reason: format!("tag '{}' not found", tag.0),
            })?;

        let commit = reference
            .peel_to_commit()
            .map_err(|source| ElixirError::TagAborted {
                tag: tag.clone(),
                reason: format!("could not peel tag to a commit: {source}"),
            })?;

        let tree = commit.tree().map_err(|source| ElixirError::TagAborted {
            tag: tag.clone(),
            reason: format!("could not load tree for commit: {source}"),
        })?;

        let mut recorder = gix::traverse::tree::Recorder::default();
        tree.traverse()
            .breadthfirst(&mut recorder)
            .map_err(|source| ElixirError::TagAborted {
                tag: tag.clone(),
                reason: format!("tree traversal failed: {source}"),
            })?;

        let entries: Vec<TreeEntry> = recorder
            .records
            .into_iter()
            .filter(|record| matches!(record.mode.kind(), EntryKind::Blob | EntryKind::BlobExecutable))
            .filter_map(|record| {
                let path = record.filepath.to_path().ok()?.to_path_buf();
                Some(TreeEntry {
                    path,
                    hash: Self::object_id_to_hash(record.oid),
                })
            })
            .collect();

        let Some(matcher) = self.root_gitignore(&entries) else {
            return Ok(entries);
        };
        Ok(entries.into_iter().filter(|e| !matcher.matched(&e.path, false).is_ignore()).collect())
    }

    fn read_blob(&self, hash: &BlobHash) -> ElixirResult<Vec<u8>> {
        let oid = gix::ObjectId::from_bytes_or_panic(hash.as_bytes());
        let object = self.repo.find_object(oid).map_err(|_| ElixirError::BlobMissing { hash: *hash })?;
        let blob = object.try_into_blob().map_err(|_| ElixirError::BlobMissing { hash: *hash })?;
        Ok(blob.data.clone())
    }
}
