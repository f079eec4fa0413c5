//! Cross-Reference Database: the durable, concurrently-writable store
//! of tag trees, definitions, and references.

mod database;
mod persistence;

pub use database::{Batch, CrossRefDatabase};
pub use persistence::DatabasePersistence;
