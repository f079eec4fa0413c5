//! Error taxonomy for the cross-reference indexing engine.
//!
//! Variants correspond exactly to the error kinds a caller needs to
//! distinguish: whether to abort the whole `update` run, mark a single
//! blob partial and continue, retry with backoff, or give up on one tag.

use std::path::PathBuf;

use thiserror::Error;

use crate::types::{BlobHash, TagName};

#[derive(Error, Debug)]
pub enum ElixirError {
    /// The repo backend could not be reached or opened at all. Fatal:
    /// aborts the entire `update` run.
    #[error("repository unavailable at '{path}': {source}")]
    RepoUnavailable {
        path: PathBuf,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// A blob referenced by a tag's tree could not be read from the repo
    /// backend. Local: the blob is marked partial, the tag continues.
    #[error("blob {hash} missing from repository")]
    BlobMissing { hash: BlobHash },

    /// A family extractor failed on a specific blob (parser panic
    /// boundary, malformed input, timeout). Local: the blob is marked
    /// partial, extraction continues with the rest of the tag.
    #[error("extraction failed for blob {hash} ({family}): {reason}")]
    ExtractorFailed {
        hash: BlobHash,
        family: String,
        reason: String,
    },

    /// The database could not accept a write right now (lock contention,
    /// transient I/O pressure). Retry with bounded backoff; escalates to
    /// fatal if retries are exhausted.
    #[error("database busy: {reason}")]
    DatabaseBusy { reason: String },

    /// The persisted database failed to deserialize or its invariants
    /// are violated on load. Fatal: no automatic recovery.
    #[error("database corrupt at '{path}': {reason}")]
    DatabaseCorrupt { path: PathBuf, reason: String },

    /// The update for a tag was cancelled before it committed.
    /// Retriable: a subsequent `update` run will pick the tag back up.
    #[error("update for tag '{tag}' aborted: {reason}")]
    TagAborted { tag: TagName, reason: String },

    #[error("configuration error: {reason}")]
    Config { reason: String },

    #[error("{0}")]
    Other(String),
}

impl ElixirError {
    pub fn recovery_suggestions(&self) -> Vec<&'static str> {
        match self {
            Self::RepoUnavailable { .. } => vec![
                "check that the repository path is correct and reachable",
                "verify credentials if the backend requires authentication",
            ],
            Self::BlobMissing { .. } => vec![
                "the blob will be marked partial; it is retried on the next update",
            ],
            Self::ExtractorFailed { .. } => vec![
                "the blob will be marked partial; it is retried on the next update",
                "check the extractor logs for the specific parse failure",
            ],
            Self::DatabaseBusy { .. } => {
                vec!["the operation will be retried with backoff automatically"]
            }
            Self::DatabaseCorrupt { .. } => vec![
                "restore the database from a prior snapshot if one exists",
                "re-run update from scratch after removing the corrupt database file",
            ],
            Self::TagAborted { .. } => {
                vec!["re-run update; the tag is not marked indexed so it will retry in full"]
            }
            Self::Config { .. } => vec!["check ELIXIR_* environment variables and the config file"],
            Self::Other(_) => vec![],
        }
    }

    /// Whether this error should abort the entire `update` run rather
    /// than being contained to a single blob or tag.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::RepoUnavailable { .. } | Self::DatabaseCorrupt { .. })
    }
}

pub type ElixirResult<T> = Result<T, ElixirError>;
