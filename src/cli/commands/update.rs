//! Update command - run the two-pass coordinator over un-indexed tags.

use std::sync::Arc;

use indicatif::{ProgressBar, ProgressStyle};

use crate::coordinator::UpdateCoordinator;
use crate::error::ElixirResult;
use crate::repo::RepoAdapter;
use crate::storage::{CrossRefDatabase, DatabasePersistence};
use crate::types::TagName;

pub struct UpdateArgs {
    pub workers: usize,
    pub tag: Option<String>,
    pub quiet: bool,
}

pub fn run<R: RepoAdapter + 'static>(
    args: UpdateArgs,
    repo: Arc<R>,
    db: Arc<CrossRefDatabase>,
    persistence: Arc<DatabasePersistence>,
) -> ElixirResult<()> {
    let coordinator = UpdateCoordinator::new(repo.clone(), Arc::clone(&db), persistence, args.workers);

    let bar = (!args.quiet).then(|| {
        let bar = ProgressBar::new_spinner();
        bar.set_style(
            ProgressStyle::with_template("{spinner} {msg} [{elapsed_precise}]")
                .expect("progress bar style template should compile"),
        );
        bar.enable_steady_tick(std::time::Duration::from_millis(100));
        bar
    });

    let report_fn = |report: &crate::coordinator::UpdateReport| {
        if let Some(bar) = &bar {
            bar.set_message(format!(
                "{}: {} new blobs, {} defs, {} refs, {} partial",
                report.tag, report.new_blobs, report.new_defs, report.new_refs, report.partial_blobs
            ));
        }
    };

    let reports = if let Some(tag) = &args.tag {
        let tag = TagName::from(tag.as_str());
        if db.is_indexed(&tag) {
            println!("Tag '{tag}' is already indexed.");
            return Ok(());
        }
        let report = coordinator.update_single(&tag)?;
        report_fn(&report);
        vec![report]
    } else {
        coordinator.update_all(report_fn)?
    };

    if let Some(bar) = bar {
        bar.finish_and_clear();
    }

    if reports.is_empty() {
        println!("Nothing to update; every tag is already indexed.");
    } else {
        for report in &reports {
            println!(
                "tag {} indexed {} {} {}",
                report.tag, report.new_blobs, report.new_defs, report.new_refs
            );
        }
    }

    Ok(())
}
