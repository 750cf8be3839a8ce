/*!
 * Job orchestration: drive every requested path through discovery,
 * classification, scheduling, overwriting and unlinking, and collect a
 * terminal outcome for each
 */

use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use indicatif::ProgressBar;
use rayon::prelude::*;

use crate::classify::{classify, Classified, ProfileCache};
use crate::config::{Config, FailurePolicy};
use crate::error::Result;
use crate::overwrite::{OverwriteStatus, PassWriter};
use crate::report::PathResult;
use crate::schedule::{build_plan, OverwritePlan};
use crate::types::{FailureKind, FileId, Outcome, SkipReason, Target};
use crate::unlink::Unlinker;
use crate::utils::truncate_for_display;
use crate::walker::Walker;

/// One unit of overwrite work: a unique inode plus every directory entry
/// naming it. The content is overwritten once; each entry is removed.
struct WorkItem {
    target: Target,
    plan: OverwritePlan,
    aliases: Vec<PathBuf>,
}

/// What a finished run produced, before the report is assembled
#[derive(Debug)]
pub struct JobSummary {
    /// Terminal outcome for every requested and discovered path
    pub results: Vec<PathResult>,
    /// Bytes written across all passes and targets
    pub bytes_written: u64,
    /// Whether cancellation was requested during the run
    pub cancelled: bool,
}

/// A batch destruction job over the configured input paths
pub struct ObliterationJob {
    /// Job configuration
    config: Config,
    /// Progress bar fed with bytes written
    progress: Arc<ProgressBar>,
    /// Cooperative cancellation flag shared with signal handlers
    cancel: Arc<AtomicBool>,
}

impl ObliterationJob {
    /// Create a new job
    pub fn new(config: Config, progress: Arc<ProgressBar>) -> Self {
        Self {
            config,
            progress,
            cancel: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Flag that asks the job to stop accepting new targets
    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    /// Run the whole batch and collect one outcome per path.
    ///
    /// Discovery and classification are sequential; overwriting runs on
    /// the rayon pool with one worker per unique inode. Cancellation
    /// drains the batch: a started target finishes its current pass and
    /// still loses its entries, unstarted ones are recorded as cancelled
    /// skips. A failure under the abort policy drains the batch the same
    /// way.
    pub fn run(&self) -> Result<JobSummary> {
        let mut results = Vec::new();
        let mut targets = Vec::new();
        let mut directories = Vec::new();
        let mut seen = HashSet::new();
        let abort = AtomicBool::new(false);

        self.discover(&mut results, &mut targets, &mut directories, &mut seen, &abort);
        let items = self.assemble(targets)?;

        if self.config.dry_run {
            for item in &items {
                results.extend(settle_item(item, |_| Outcome::Skipped {
                    reason: SkipReason::DryRun,
                }));
            }
            return Ok(JobSummary {
                results,
                bytes_written: 0,
                cancelled: self.cancel.load(Ordering::SeqCst),
            });
        }

        let total_bytes: u64 = items.iter().map(|item| item.plan.total_bytes()).sum();
        self.progress.set_length(total_bytes);

        let writer = PassWriter::new(Arc::clone(&self.progress), Arc::clone(&self.cancel));
        let unlinker = Unlinker::new(&self.config);

        let executed: Vec<Vec<PathResult>> = items
            .par_iter()
            .map(|item| self.execute_item(item, &writer, &unlinker, &abort))
            .collect();
        for batch in executed {
            results.extend(batch);
        }

        let drained = self.cancel.load(Ordering::SeqCst) || abort.load(Ordering::SeqCst);
        if self.config.remove_empty_dirs && !drained {
            for dir in &directories {
                unlinker.remove_dir_if_empty(dir);
            }
        }

        Ok(JobSummary {
            results,
            bytes_written: self.progress.position(),
            cancelled: self.cancel.load(Ordering::SeqCst),
        })
    }

    /// Resolve every input into classified targets, expansion directories
    /// and early terminal outcomes
    fn discover(
        &self,
        results: &mut Vec<PathResult>,
        targets: &mut Vec<Target>,
        directories: &mut Vec<PathBuf>,
        seen: &mut HashSet<PathBuf>,
        abort: &AtomicBool,
    ) {
        let walker = Walker::new(&self.config);
        let mut profiles = ProfileCache::new();

        for input in &self.config.paths {
            if !seen.insert(input.clone()) {
                continue;
            }
            if self.cancel.load(Ordering::SeqCst) || abort.load(Ordering::SeqCst) {
                results.push(settled(input, Outcome::Skipped {
                    reason: SkipReason::Cancelled,
                }));
                continue;
            }

            // Missing inputs fail at the input stage; everything after
            // discovery that vanishes is a classification failure instead
            if let Err(err) = fs::symlink_metadata(input) {
                self.record_failure(
                    results,
                    abort,
                    input,
                    FailureKind::Input,
                    format!("cannot access: {}", err),
                );
                continue;
            }

            match classify(input, self.config.follow_symlinks, &mut profiles) {
                Ok(Classified::File(target)) => targets.push(target),
                Ok(Classified::Skip(reason)) => {
                    results.push(settled(input, Outcome::Skipped { reason }))
                }
                Ok(Classified::Directory) => {
                    self.expand_directory(
                        &walker,
                        input,
                        results,
                        targets,
                        directories,
                        seen,
                        abort,
                        &mut profiles,
                    );
                    results.push(settled(input, Outcome::Skipped {
                        reason: SkipReason::Directory,
                    }));
                }
                Err(err) => {
                    self.record_failure(results, abort, input, err.failure_kind(), err.to_string())
                }
            }
        }
    }

    /// Expand one directory input and classify everything inside it
    #[allow(clippy::too_many_arguments)]
    fn expand_directory(
        &self,
        walker: &Walker,
        root: &Path,
        results: &mut Vec<PathResult>,
        targets: &mut Vec<Target>,
        directories: &mut Vec<PathBuf>,
        seen: &mut HashSet<PathBuf>,
        abort: &AtomicBool,
        profiles: &mut ProfileCache,
    ) {
        let output = walker.expand(root);
        directories.extend(output.directories);

        for (path, detail) in output.failures {
            self.record_failure(results, abort, &path, FailureKind::Traversal, detail);
        }
        for path in output.excluded {
            results.push(settled(&path, Outcome::Skipped {
                reason: SkipReason::Excluded,
            }));
        }
        for path in output.candidates {
            if !seen.insert(path.clone()) {
                continue;
            }
            if self.cancel.load(Ordering::SeqCst) || abort.load(Ordering::SeqCst) {
                results.push(settled(&path, Outcome::Skipped {
                    reason: SkipReason::Cancelled,
                }));
                continue;
            }
            match classify(&path, self.config.follow_symlinks, profiles) {
                Ok(Classified::File(target)) => targets.push(target),
                Ok(Classified::Skip(reason)) => {
                    results.push(settled(&path, Outcome::Skipped { reason }))
                }
                // A candidate that turned into a directory was replaced
                // underneath us between walk and classification
                Ok(Classified::Directory) => results.push(settled(&path, Outcome::Skipped {
                    reason: SkipReason::Directory,
                })),
                Err(err) => {
                    self.record_failure(results, abort, &path, err.failure_kind(), err.to_string())
                }
            }
        }
    }

    /// Record a failed path and honor the abort policy
    fn record_failure(
        &self,
        results: &mut Vec<PathResult>,
        abort: &AtomicBool,
        path: &Path,
        kind: FailureKind,
        detail: String,
    ) {
        results.push(settled(path, Outcome::Failed { kind, detail }));
        if self.config.failure_policy == FailurePolicy::AbortOnFirstFailure {
            abort.store(true, Ordering::SeqCst);
        }
    }

    /// Deduplicate targets by inode and attach an overwrite plan to each
    /// unique one. The first claimant becomes the primary; later entries
    /// for the same inode ride along as aliases, so each inode's content
    /// is overwritten by exactly one worker.
    fn assemble(&self, targets: Vec<Target>) -> Result<Vec<WorkItem>> {
        let mut items: Vec<WorkItem> = Vec::new();
        let mut claims: HashMap<FileId, usize> = HashMap::new();

        for target in targets {
            match target.file_id {
                Some(id) => match claims.entry(id) {
                    Entry::Occupied(slot) => {
                        let item = &mut items[*slot.get()];
                        // Canonicalization can collapse two inputs into one
                        // spelling; only distinct entries become aliases
                        if item.target.path != target.path
                            && !item.aliases.contains(&target.path)
                        {
                            item.aliases.push(target.path);
                        }
                    }
                    Entry::Vacant(slot) => {
                        let plan =
                            build_plan(self.config.passes, &self.config.patterns, target.span)?;
                        slot.insert(items.len());
                        items.push(WorkItem {
                            target,
                            plan,
                            aliases: Vec::new(),
                        });
                    }
                },
                None => {
                    let plan = build_plan(self.config.passes, &self.config.patterns, target.span)?;
                    items.push(WorkItem {
                        target,
                        plan,
                        aliases: Vec::new(),
                    });
                }
            }
        }
        Ok(items)
    }

    /// Destroy one work item and settle outcomes for its primary path and
    /// every alias
    fn execute_item(
        &self,
        item: &WorkItem,
        writer: &PassWriter,
        unlinker: &Unlinker,
        abort: &AtomicBool,
    ) -> Vec<PathResult> {
        let path = &item.target.path;

        if self.cancel.load(Ordering::SeqCst) || abort.load(Ordering::SeqCst) {
            return settle_item(item, |_| Outcome::Skipped {
                reason: SkipReason::Cancelled,
            });
        }

        let name = path.file_name().unwrap_or_default().to_string_lossy();
        self.progress.set_message(format!(
            "Current target: {}",
            truncate_for_display(&name, 40)
        ));

        let report = writer.execute(&item.target, &item.plan);
        let planned = item.plan.passes.len();

        let results = match report.status {
            OverwriteStatus::Complete => settle_item(item, |entry| {
                match unlinker.unlink(entry) {
                    Ok(()) => Outcome::Destroyed {
                        confidence: item.target.profile.confidence(),
                    },
                    Err(err) => Outcome::PartiallyOverwritten {
                        passes_completed: report.passes_completed,
                        passes_planned: planned,
                        entry_removed: false,
                        detail: err.to_string(),
                    },
                }
            }),
            OverwriteStatus::Cancelled => {
                if report.passes_completed == 0 {
                    settle_item(item, |_| Outcome::Skipped {
                        reason: SkipReason::Cancelled,
                    })
                } else {
                    // A started target still loses its entries; cancellation
                    // only forgoes the remaining passes
                    settle_item(item, |entry| match unlinker.unlink(entry) {
                        Ok(()) => Outcome::PartiallyOverwritten {
                            passes_completed: report.passes_completed,
                            passes_planned: planned,
                            entry_removed: true,
                            detail: "cancelled between passes".to_string(),
                        },
                        Err(err) => Outcome::PartiallyOverwritten {
                            passes_completed: report.passes_completed,
                            passes_planned: planned,
                            entry_removed: false,
                            detail: format!("cancelled between passes, {}", err),
                        },
                    })
                }
            }
            OverwriteStatus::Failed { kind, ref detail } => {
                let outcome = if report.passes_completed == 0 {
                    Outcome::Failed {
                        kind,
                        detail: detail.clone(),
                    }
                } else {
                    Outcome::PartiallyOverwritten {
                        passes_completed: report.passes_completed,
                        passes_planned: planned,
                        entry_removed: false,
                        detail: detail.clone(),
                    }
                };
                settle_item(item, |entry| {
                    if entry == path {
                        outcome.clone()
                    } else {
                        shared_content_outcome(&outcome, path)
                    }
                })
            }
        };

        if self.config.failure_policy == FailurePolicy::AbortOnFirstFailure
            && results.iter().any(|r| {
                matches!(
                    r.outcome,
                    Outcome::Failed { .. } | Outcome::PartiallyOverwritten { .. }
                )
            })
        {
            abort.store(true, Ordering::SeqCst);
        }

        for result in &results {
            tracing::debug!(
                path = %result.path.display(),
                outcome = result.outcome.label(),
                "target settled"
            );
        }
        results
    }
}

/// Build one settled result
fn settled(path: &Path, outcome: Outcome) -> PathResult {
    PathResult {
        path: path.to_path_buf(),
        outcome,
    }
}

/// Settle the primary path and every alias of a work item
fn settle_item<F>(item: &WorkItem, mut outcome_for: F) -> Vec<PathResult>
where
    F: FnMut(&Path) -> Outcome,
{
    let mut results = Vec::with_capacity(1 + item.aliases.len());
    results.push(settled(&item.target.path, outcome_for(&item.target.path)));
    for alias in &item.aliases {
        results.push(settled(alias, outcome_for(alias)));
    }
    results
}

/// Mirror a primary outcome onto an alias entry, noting the shared inode
fn shared_content_outcome(primary: &Outcome, primary_path: &Path) -> Outcome {
    match primary {
        Outcome::Failed { kind, detail } => Outcome::Failed {
            kind: *kind,
            detail: format!("content shared with {}: {}", primary_path.display(), detail),
        },
        Outcome::PartiallyOverwritten {
            passes_completed,
            passes_planned,
            detail,
            ..
        } => Outcome::PartiallyOverwritten {
            passes_completed: *passes_completed,
            passes_planned: *passes_planned,
            entry_removed: false,
            detail: format!("content shared with {}: {}", primary_path.display(), detail),
        },
        other => other.clone(),
    }
}
