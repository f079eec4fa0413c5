//! Tags command - list tags the repo reports and their indexed status.

use crate::error::ElixirResult;
use crate::repo::RepoAdapter;
use crate::storage::CrossRefDatabase;

pub fn run(repo: &impl RepoAdapter, db: &CrossRefDatabase) -> ElixirResult<()> {
    let mut tags = repo.tags()?;
    tags.sort_by(|a, b| a.0.cmp(&b.0));

    if tags.is_empty() {
        println!("No tags found.");
        return Ok(());
    }

    for tag in tags {
        let status = if db.is_indexed(&tag) { "indexed" } else { "pending" };
        println!("{:<30} {}", tag.0, status);
    }
    Ok(())
}
