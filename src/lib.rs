//! Cross-reference indexing engine for tagged releases of a
//! content-addressed source tree: blobs, definitions, and references
//! extracted once per tag and persisted for fast lookup.

pub mod blob;
pub mod cli;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod extract;
pub mod family;
pub mod logging;
pub mod query;
pub mod repo;
pub mod storage;
pub mod types;

pub use config::Settings;
pub use error::{ElixirError, ElixirResult};
pub use storage::{CrossRefDatabase, DatabasePersistence};
