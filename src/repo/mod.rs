//! Repo Adapter: the boundary between the indexing engine and whatever
//! version control system actually stores the tagged source tree.

mod git;
mod memory;

pub use git::GitRepoAdapter;
pub use memory::MemoryRepoAdapter;

use crate::error::ElixirResult;
use crate::types::{BlobHash, TagName, TreeEntry};

/// Everything the rest of the engine needs from a version control
/// backend. Implementations never need to expose history, diffs, or
/// branches — only the set of tags and the immutable content they name.
pub trait RepoAdapter: Send + Sync {
    /// All tags currently known to the repository, ordered newest-first
    /// by the backend's own notion of release order (for `GitRepoAdapter`,
    /// the tagged commit's committer time).
    fn tags(&self) -> ElixirResult<Vec<TagName>>;

    /// The full `(path, blob hash)` listing for a tag's tree.
    fn tag_tree(&self, tag: &TagName) -> ElixirResult<Vec<TreeEntry>>;

    /// Raw bytes for a blob. Returns `BlobMissing` if the backend cannot
    /// find it (the blob list promised a hash the object store doesn't
    /// actually hold).
    fn read_blob(&self, hash: &BlobHash) -> ElixirResult<Vec<u8>>;

    /// The tag considered "current" — the first entry of [`Self::tags`]'s
    /// newest-first ordering. Backends may override this if "current" is
    /// not simply "newest" under their policy.
    fn latest(&self) -> ElixirResult<TagName> {
        self.tags()?
            .into_iter()
            .next()
            .ok_or_else(|| crate::error::ElixirError::Other("repository has no tags".to_string()))
    }
}
