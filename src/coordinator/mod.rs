//! Update Coordinator: the two-pass pipeline that turns a tag's tree
//! listing into committed definitions and references.
//!
//! Pass 1 (definitions) must fully commit before pass 2 (references)
//! starts — `known_idents` is fixed at the start of pass 2 and never
//! grows mid-pass, so a reference can only resolve to a definition that
//! existed before any reference extraction began.

use std::sync::Arc;

use crossbeam_channel::bounded;

use crate::error::{ElixirError, ElixirResult};
use crate::extract::{extractor_for, DefRecord, TokenOccurrence};
use crate::family::Family;
use crate::repo::RepoAdapter;
use crate::storage::{CrossRefDatabase, DatabasePersistence};
use crate::types::{BlobHash, BlobNum, DefOccurrence, TagName};

/// A unit of extraction work: one family's worth of lexing for one blob.
#[derive(Clone)]
struct WorkItem {
    blob: BlobNum,
    hash: BlobHash,
    family: Family,
}

enum DefResult {
    Ok { blob: BlobNum, family: Family, defs: Vec<DefRecord> },
    Err { blob: BlobNum, family: Family, error: ElixirError },
}

enum RefResult {
    Ok {
        blob: BlobNum,
        family: Family,
        tokens: Vec<TokenOccurrence>,
    },
    Err {
        blob: BlobNum,
        family: Family,
        error: ElixirError,
    },
}

#[derive(Debug, Clone, Default)]
pub struct UpdateReport {
    pub tag: TagName,
    pub new_blobs: usize,
    pub new_defs: usize,
    pub new_refs: usize,
    pub partial_blobs: usize,
}

pub struct UpdateCoordinator<R: RepoAdapter> {
    repo: Arc<R>,
    db: Arc<CrossRefDatabase>,
    persistence: Arc<DatabasePersistence>,
    workers: usize,
}

impl<R: RepoAdapter + 'static> UpdateCoordinator<R> {
    pub fn new(repo: Arc<R>, db: Arc<CrossRefDatabase>, persistence: Arc<DatabasePersistence>, workers: usize) -> Self {
        Self {
            repo,
            db,
            persistence,
            workers: workers.max(crate::config::MIN_WORKERS),
        }
    }

    /// Update every tag the repo reports that isn't already indexed.
    /// A tag already marked `indexed` costs nothing beyond listing it.
    pub fn update_all(&self, mut on_progress: impl FnMut(&UpdateReport)) -> ElixirResult<Vec<UpdateReport>> {
        let tags = self.repo.tags()?;
        let mut reports = Vec::with_capacity(tags.len());
        for tag in tags {
            if self.db.is_indexed(&tag) {
                continue;
            }
            let report = self.update_tag(&tag)?;
            on_progress(&report);
            reports.push(report);
        }
        Ok(reports)
    }

    /// Update a single named tag, regardless of whether other tags are
    /// still pending. Callers are responsible for checking
    /// `db.is_indexed` first if they want to skip already-indexed tags.
    pub fn update_single(&self, tag: &TagName) -> ElixirResult<UpdateReport> {
        self.update_tag(tag)
    }

    fn update_tag(&self, tag: &TagName) -> ElixirResult<UpdateReport> {
        let tree = self.repo.tag_tree(tag)?;
        let batch = self.db.begin(tag.clone());

        let mut new_blobs = 0usize;
        let mut def_items = Vec::new();
        let mut all_items = Vec::new();

        for entry in &tree {
            let (num, is_new) = self.db.blobs.intern(entry.hash);
            if is_new {
                new_blobs += 1;
            }
            self.db.blobs.add_path(num, entry.path.clone());

            for family in Family::classify_all(&entry.path) {
                let item = WorkItem {
                    blob: num,
                    hash: entry.hash,
                    family,
                };
                if self.db.needs_defs(num, family) {
                    def_items.push(item.clone());
                }
                all_items.push(item);
            }
        }

        self.db.set_tag_tree(tag.clone(), tree);

        let (new_defs, partial_defs) = self.run_definition_pass(&def_items)?;
        batch.checkpoint(&self.persistence)?;

        let known_idents = self.db.known_idents();
        // Every classified (blob, family) pair still needing a reference
        // pass, not just the ones that also needed a definition pass —
        // a blob whose defs already committed in a prior, interrupted run
        // must still get its references extracted here.
        let ref_items: Vec<WorkItem> = all_items
            .into_iter()
            .filter(|item| self.db.needs_refs(item.blob, item.family))
            .collect();
        let (new_refs, partial_refs) = self.run_reference_pass(&ref_items, &known_idents)?;

        batch.commit(&self.persistence)?;

        Ok(UpdateReport {
            tag: tag.clone(),
            new_blobs,
            new_defs,
            new_refs,
            partial_blobs: partial_defs + partial_refs,
        })
    }

    fn run_definition_pass(&self, items: &[WorkItem]) -> ElixirResult<(usize, usize)> {
        let (work_tx, work_rx) = bounded::<WorkItem>(self.workers * 2);
        let (result_tx, result_rx) = bounded::<DefResult>(self.workers * 2);

        let handles: Vec<_> = (0..self.workers)
            .map(|_| {
                let work_rx = work_rx.clone();
                let result_tx = result_tx.clone();
                let repo = Arc::clone(&self.repo);
                std::thread::spawn(move || {
                    while let Ok(item) = work_rx.recv() {
                        let outcome = extract_defs(repo.as_ref(), &item);
                        if result_tx.send(outcome).is_err() {
                            break;
                        }
                    }
                })
            })
            .collect();
        drop(result_tx);
        drop(work_rx);

        for item in items {
            work_tx.send(item.clone()).map_err(|_| ElixirError::Other("definition work channel closed".into()))?;
        }
        drop(work_tx);

        let mut new_defs = 0usize;
        let mut partial = 0usize;
        while let Ok(result) = result_rx.recv() {
            match result {
                DefResult::Ok { blob, family, defs } => {
                    for def in defs {
                        self.db.append_def(
                            &def.name,
                            DefOccurrence {
                                blob,
                                line: def.line,
                                kind: def.kind,
                                family,
                            },
                        );
                        new_defs += 1;
                    }
                    self.db.mark_defs(blob, family, true);
                }
                DefResult::Err { blob, family, error } => {
                    tracing::warn!(%blob, family = %family, %error, "definition extraction failed, marking partial");
                    self.db.mark_defs(blob, family, false);
                    partial += 1;
                }
            }
        }

        for handle in handles {
            let _ = handle.join();
        }

        Ok((new_defs, partial))
    }

    fn run_reference_pass(
        &self,
        items: &[WorkItem],
        known_idents: &std::collections::HashSet<String>,
    ) -> ElixirResult<(usize, usize)> {
        let (work_tx, work_rx) = bounded::<WorkItem>(self.workers * 2);
        let (result_tx, result_rx) = bounded::<RefResult>(self.workers * 2);

        let handles: Vec<_> = (0..self.workers)
            .map(|_| {
                let work_rx = work_rx.clone();
                let result_tx = result_tx.clone();
                let repo = Arc::clone(&self.repo);
                std::thread::spawn(move || {
                    while let Ok(item) = work_rx.recv() {
                        let outcome = tokenize(repo.as_ref(), &item);
                        if result_tx.send(outcome).is_err() {
                            break;
                        }
                    }
                })
            })
            .collect();
        drop(result_tx);
        drop(work_rx);

        for item in items {
            work_tx.send(item.clone()).map_err(|_| ElixirError::Other("reference work channel closed".into()))?;
        }
        drop(work_tx);

        let mut new_refs = 0usize;
        let mut partial = 0usize;
        while let Ok(result) = result_rx.recv() {
            match result {
                RefResult::Ok { blob, family, tokens } => {
                    let mut by_name: std::collections::HashMap<String, Vec<u32>> = std::collections::HashMap::new();
                    // A token on the same line as that identifier's own
                    // definition in this blob is not a reference.
                    for token in tokens {
                        if !known_idents.contains(&token.name) {
                            continue;
                        }
                        if self.is_defining_line(&token.name, blob, token.line) {
                            continue;
                        }
                        by_name.entry(token.name).or_default().push(token.line);
                    }
                    for (name, lines) in by_name {
                        new_refs += lines.len();
                        self.db.append_ref(&name, blob, family, lines);
                    }
                    self.db.mark_refs(blob, family, true);
                }
                RefResult::Err { blob, family, error } => {
                    tracing::warn!(%blob, family = %family, %error, "reference extraction failed, marking partial");
                    self.db.mark_refs(blob, family, false);
                    partial += 1;
                }
            }
        }

        for handle in handles {
            let _ = handle.join();
        }

        Ok((new_refs, partial))
    }

    /// Whether `name` has a definition occurrence in `blob` on `line` —
    /// the same-line exclusion rule for reference recording.
    fn is_defining_line(&self, name: &str, blob: BlobNum, line: u32) -> bool {
        self.db.defs_for(name).iter().any(|d| d.blob == blob && d.line == line)
    }
}

fn extract_defs<R: RepoAdapter + ?Sized>(repo: &R, item: &WorkItem) -> DefResult {
    match repo.read_blob(&item.hash).and_then(|bytes| decode(bytes)) {
        Ok(source) => match extractor_for(item.family).extract_defs(&source) {
            Ok(defs) => DefResult::Ok {
                blob: item.blob,
                family: item.family,
                defs,
            },
            Err(error) => DefResult::Err {
                blob: item.blob,
                family: item.family,
                error,
            },
        },
        Err(error) => DefResult::Err {
            blob: item.blob,
            family: item.family,
            error,
        },
    }
}

fn tokenize<R: RepoAdapter + ?Sized>(repo: &R, item: &WorkItem) -> RefResult {
    match repo.read_blob(&item.hash).and_then(|bytes| decode(bytes)) {
        Ok(source) => match extractor_for(item.family).tokenize(&source) {
            Ok(tokens) => RefResult::Ok {
                blob: item.blob,
                family: item.family,
                tokens,
            },
            Err(error) => RefResult::Err {
                blob: item.blob,
                family: item.family,
                error,
            },
        },
        Err(error) => RefResult::Err {
            blob: item.blob,
            family: item.family,
            error,
        },
    }
}

fn decode(bytes: Vec<u8>) -> ElixirResult<String> {
    String::from_utf8(bytes).map_err(|_| ElixirError::Other("blob is not valid UTF-8".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repo::MemoryRepoAdapter;
    use std::path::PathBuf;

    fn fresh_coordinator() -> (UpdateCoordinator<MemoryRepoAdapter>, tempfile::TempDir) {
        let repo = Arc::new(MemoryRepoAdapter::new());
        let db = Arc::new(CrossRefDatabase::new());
        let temp = tempfile::TempDir::new().unwrap();
        let persistence = Arc::new(DatabasePersistence::new(temp.path().to_path_buf()));
        (UpdateCoordinator::new(repo, db, persistence, 5), temp)
    }

    #[test]
    fn update_indexes_a_single_tag() {
        let (coordinator, _temp) = fresh_coordinator();
        coordinator.repo.add_tag(
            "v1",
            vec![(
                PathBuf::from("main.c"),
                b"int add(int a, int b) { return a + b; }\nint main() { return add(1, 2); }\n".to_vec(),
            )],
        );

        let reports = coordinator.update_all(|_| {}).unwrap();
        assert_eq!(reports.len(), 1);
        assert!(reports[0].new_defs >= 2);
        assert!(coordinator.db.is_indexed(&TagName::from("v1")));

        let refs = coordinator.db.refs_for("add");
        assert_eq!(refs.len(), 1);
        assert!(refs[0].lines.contains(&2));
    }

    #[test]
    fn rerunning_update_is_idempotent() {
        let (coordinator, _temp) = fresh_coordinator();
        coordinator.repo.add_tag(
            "v1",
            vec![(PathBuf::from("main.c"), b"int main() { return 0; }\n".to_vec())],
        );
        coordinator.update_all(|_| {}).unwrap();
        let reports = coordinator.update_all(|_| {}).unwrap();
        assert!(reports.is_empty(), "already-indexed tags are skipped entirely");
    }
}
