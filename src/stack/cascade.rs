use super::graph::BranchGraph;
use super::store::StackState;
use crate::errors::{Result, StackError};
use crate::git::{RebaseStep, VersionControl};
use crate::utils::spinner::SpinnerPrinter;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::rc::Rc;
use tracing::{debug, info, warn};

/// Checkpoint of a sync that stopped on a conflict, a declined step or an error.
///
/// Persisted with the graph so a later invocation can pick up at `cursor`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct CascadeState {
    /// Branches to replay, parents first
    pub plan: Vec<String>,
    /// Index into `plan` of the branch being replayed
    pub cursor: usize,
    /// Parent tip the in-flight branch is being replayed onto. `None` when no rebase
    /// was started for the branch at the cursor.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub onto: Option<String>,
    /// Branch checked out before the sync started
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_branch: Option<String>,
    pub started_at: DateTime<Utc>,
}

impl CascadeState {
    pub fn new(plan: Vec<String>, original_branch: Option<String>) -> Self {
        Self {
            plan,
            cursor: 0,
            onto: None,
            original_branch,
            started_at: Utc::now(),
        }
    }

    /// Branch at the cursor
    pub fn current_branch(&self) -> Option<&str> {
        self.plan.get(self.cursor).map(String::as_str)
    }

    /// Branches after the one at the cursor
    pub fn remaining(&self) -> &[String] {
        self.plan.get(self.cursor + 1..).unwrap_or(&[])
    }

    pub(crate) fn validate(&self, graph: &BranchGraph) -> std::result::Result<(), String> {
        if self.cursor >= self.plan.len() {
            return Err(format!(
                "sync cursor {} is outside a plan of {} branches",
                self.cursor,
                self.plan.len()
            ));
        }
        if let Some(untracked) = self.plan.iter().find(|name| !graph.contains(name)) {
            return Err(format!("sync plan names untracked branch '{untracked}'"));
        }
        Ok(())
    }
}

/// What a step is about to replay, shown before the rebase runs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepPreview {
    pub branch: String,
    pub parent: String,
    /// Subject lines of the commits that will be replayed, oldest first
    pub commits: Vec<String>,
}

/// Asked before each rebase. `false` pauses the sync in front of that branch.
pub type StepApproval = Rc<dyn Fn(&StepPreview) -> Result<bool>>;

/// Options for a cascade run
#[derive(Clone)]
pub struct CascadeOptions {
    /// Check out the starting branch again once the plan is exhausted
    pub return_to_original_branch: bool,
    /// Optional printer for progress-aware output (e.g., CLI spinners)
    pub progress_printer: Option<SpinnerPrinter>,
    /// Optional confirmation asked with the preview of every rebase
    pub approve_step: Option<StepApproval>,
}

impl Default for CascadeOptions {
    fn default() -> Self {
        Self {
            return_to_original_branch: true,
            progress_printer: None,
            approve_step: None,
        }
    }
}

/// A branch that was replayed during a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RebasedBranch {
    pub branch: String,
    pub parent: String,
    pub onto: String,
    pub new_tip: String,
}

/// What a run did, in plan order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CascadeReport {
    pub rebased: Vec<RebasedBranch>,
    pub up_to_date: Vec<String>,
    /// Planned branches that no longer existed and were untracked
    pub skipped_missing: Vec<String>,
}

impl CascadeReport {
    pub fn summary(&self) -> String {
        let mut parts = vec![format!("{} rebased", self.rebased.len())];
        parts.push(format!("{} already up to date", self.up_to_date.len()));
        if !self.skipped_missing.is_empty() {
            parts.push(format!("{} missing", self.skipped_missing.len()));
        }
        parts.join(", ")
    }
}

/// Terminal (or suspended) state of a cascade run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CascadeOutcome {
    Completed(CascadeReport),
    Suspended {
        branch: String,
        files: Vec<String>,
        report: CascadeReport,
    },
    /// Stopped in front of `branch` because its step was not approved
    Paused {
        branch: String,
        report: CascadeReport,
    },
    Aborted {
        branch: String,
    },
}

/// Why the replay loop stopped before exhausting the plan
enum Halt {
    Conflict { branch: String, files: Vec<String> },
    Declined { branch: String },
}

/// Replays branches onto their parents' current tips, parents first.
///
/// The engine mutates the [`StackState`] it is handed: tip bookkeeping goes into the
/// graph and a suspension leaves its checkpoint in `state.cascade`. The checkpoint is
/// also left in place when a step fails with an error, so the plan survives for
/// `continue` or `abort`. Persisting that state is the caller's job.
pub struct RebaseEngine<'a, V: VersionControl + ?Sized> {
    vcs: &'a V,
    options: CascadeOptions,
}

impl<'a, V: VersionControl + ?Sized> RebaseEngine<'a, V> {
    pub fn new(vcs: &'a V, options: CascadeOptions) -> Self {
        Self { vcs, options }
    }

    /// Branches a cascade from `root` would visit
    pub fn plan(&self, state: &StackState, root: &str) -> Result<Vec<String>> {
        Ok(state.graph.descendants_in_topo_order(root)?)
    }

    /// Start a new cascade at `root` (trunk cascades to every tracked branch)
    pub fn start(&self, state: &mut StackState, root: &str) -> Result<CascadeOutcome> {
        state.ensure_no_cascade()?;

        let plan = self.plan(state, root)?;
        let original_branch = self.vcs.current_branch().ok();
        info!("Planned sync from '{}': {}", root, plan.join(" -> "));

        self.run(state, CascadeState::new(plan, original_branch), CascadeReport::default())
    }

    /// Pick a suspended cascade back up after the conflict was resolved
    pub fn resume(&self, state: &mut StackState) -> Result<CascadeOutcome> {
        let mut cascade = state.cascade.take().ok_or(StackError::NoCascade)?;
        let mut report = CascadeReport::default();

        match self.settle_in_flight(state, &mut cascade, &mut report) {
            Ok(None) => self.run(state, cascade, report),
            Ok(Some(files)) => {
                let branch = cascade.current_branch().unwrap_or_default().to_string();
                debug!("'{}' still has {} conflicted files", branch, files.len());
                state.cascade = Some(cascade);
                Ok(CascadeOutcome::Suspended {
                    branch,
                    files,
                    report,
                })
            }
            Err(e) => {
                state.cascade = Some(cascade);
                Err(e)
            }
        }
    }

    /// Roll the in-flight branch back and drop the rest of the plan.
    ///
    /// Branches already replayed earlier in the run keep their new history.
    pub fn abort(&self, state: &mut StackState) -> Result<CascadeOutcome> {
        let cascade = state.cascade.take().ok_or(StackError::NoCascade)?;
        let branch = cascade.current_branch().unwrap_or_default().to_string();

        if self.vcs.rebase_in_progress() {
            if let Err(e) = self.vcs.abort_rebase() {
                state.cascade = Some(cascade);
                return Err(e);
            }
        }
        info!(
            "Aborted sync at '{}', dropped {} remaining branches",
            branch,
            cascade.remaining().len()
        );

        self.return_to(&cascade);
        Ok(CascadeOutcome::Aborted { branch })
    }

    /// Finish the step the cascade stopped in. `Some(files)` means it is still conflicted.
    fn settle_in_flight(
        &self,
        state: &mut StackState,
        cascade: &mut CascadeState,
        report: &mut CascadeReport,
    ) -> Result<Option<Vec<String>>> {
        let Some(branch) = cascade.current_branch().map(str::to_string) else {
            return Ok(None);
        };
        // No rebase was started for this branch, running the step again is enough
        let Some(onto) = cascade.onto.clone() else {
            return Ok(None);
        };

        let step = if self.vcs.rebase_in_progress() {
            self.vcs.continue_rebase()?
        } else if !self.vcs.branch_exists(&branch) {
            cascade.onto = None;
            return Ok(None);
        } else {
            // Finished or dropped outside of gst; only accept it if the branch now sits on `onto`
            let tip = self.vcs.tip_of(&branch)?;
            if self.vcs.merge_base(&onto, &tip)?.as_deref() != Some(onto.as_str()) {
                return Err(StackError::CascadePending(format!(
                    "no rebase is in progress and '{branch}' is not based on its parent. Run `gst abort` to discard the sync"
                )));
            }
            RebaseStep::Completed { new_tip: tip }
        };

        match step {
            RebaseStep::Completed { new_tip } => {
                let parent = state.graph.parent_of(&branch)?.clone();
                let parent_name = state.graph.parent_name(&parent).to_string();
                info!("Resolved conflict in '{}', now at {}", branch, short(&new_tip));
                self.print(format!("   ├─ {branch} → {parent_name}"));
                state
                    .graph
                    .set_last_known_parent_tip(&branch, onto.clone())?;
                report.rebased.push(RebasedBranch {
                    branch,
                    parent: parent_name,
                    onto,
                    new_tip,
                });
                cascade.cursor += 1;
                cascade.onto = None;
                Ok(None)
            }
            RebaseStep::Conflicted { files } => Ok(Some(files)),
        }
    }

    /// Drive the plan from the cursor. Any error leaves the checkpoint in `state`.
    fn run(
        &self,
        state: &mut StackState,
        mut cascade: CascadeState,
        mut report: CascadeReport,
    ) -> Result<CascadeOutcome> {
        let halt = match self.replay(state, &mut cascade, &mut report) {
            Ok(halt) => halt,
            Err(e) => {
                warn!(
                    "Sync stopped at '{}': {}",
                    cascade.current_branch().unwrap_or_default(),
                    e
                );
                state.cascade = Some(cascade);
                return Err(e);
            }
        };

        match halt {
            None => {
                state.cascade = None;
                self.return_to(&cascade);
                Ok(CascadeOutcome::Completed(report))
            }
            Some(Halt::Conflict { branch, files }) => {
                state.cascade = Some(cascade);
                Ok(CascadeOutcome::Suspended {
                    branch,
                    files,
                    report,
                })
            }
            Some(Halt::Declined { branch }) => {
                state.cascade = Some(cascade);
                Ok(CascadeOutcome::Paused { branch, report })
            }
        }
    }

    fn replay(
        &self,
        state: &mut StackState,
        cascade: &mut CascadeState,
        report: &mut CascadeReport,
    ) -> Result<Option<Halt>> {
        while let Some(branch) = cascade.current_branch().map(str::to_string) {
            if !self.vcs.branch_exists(&branch) {
                self.drop_missing(state, cascade, &branch)?;
                report.skipped_missing.push(branch);
                continue;
            }

            let parent = state.graph.parent_of(&branch)?.clone();
            let parent_name = state.graph.parent_name(&parent).to_string();
            let parent_tip = self.vcs.tip_of(&parent_name)?;
            let last_known = state
                .graph
                .node(&branch)
                .and_then(|node| node.last_known_parent_tip.clone());

            if last_known.as_deref() == Some(parent_tip.as_str()) {
                debug!("'{}' is up to date with '{}'", branch, parent_name);
                report.up_to_date.push(branch);
                cascade.cursor += 1;
                continue;
            }

            let branch_tip = self.vcs.tip_of(&branch)?;
            let merge_base = self.vcs.merge_base(&parent_tip, &branch_tip)?;
            if merge_base.as_deref() == Some(parent_tip.as_str()) {
                // Already contains the parent tip, only the bookkeeping is stale
                debug!("'{}' already contains {}", branch, short(&parent_tip));
                state.graph.set_last_known_parent_tip(&branch, parent_tip)?;
                report.up_to_date.push(branch);
                cascade.cursor += 1;
                continue;
            }

            let upstream = match last_known.or(merge_base) {
                Some(upstream) => upstream,
                None => {
                    return Err(StackError::branch(format!(
                        "'{branch}' shares no history with '{parent_name}'"
                    )))
                }
            };

            let preview = StepPreview {
                branch: branch.clone(),
                parent: parent_name.clone(),
                commits: self.vcs.commits_between(&upstream, &branch)?,
            };
            self.announce(&preview);
            if let Some(approve) = &self.options.approve_step {
                if !approve(&preview)? {
                    info!("Sync paused before '{}'", branch);
                    return Ok(Some(Halt::Declined { branch }));
                }
            }

            info!(
                "Rebasing '{}' onto '{}' ({})",
                branch,
                parent_name,
                short(&parent_tip)
            );
            cascade.onto = Some(parent_tip.clone());

            let step = match self.vcs.rebase(&branch, &parent_tip, &upstream) {
                Ok(step) => step,
                Err(e) => {
                    if !self.vcs.rebase_in_progress() {
                        cascade.onto = None;
                    }
                    return Err(e);
                }
            };

            match step {
                RebaseStep::Completed { new_tip } => {
                    self.print(format!("   ├─ {branch} → {parent_name}"));
                    state
                        .graph
                        .set_last_known_parent_tip(&branch, parent_tip.clone())?;
                    report.rebased.push(RebasedBranch {
                        branch,
                        parent: parent_name,
                        onto: parent_tip,
                        new_tip,
                    });
                    cascade.cursor += 1;
                    cascade.onto = None;
                }
                RebaseStep::Conflicted { files } => {
                    warn!(
                        "Conflict while rebasing '{}' onto '{}', suspending at {}/{}",
                        branch,
                        parent_name,
                        cascade.cursor + 1,
                        cascade.plan.len()
                    );
                    self.print(format!("   └─ {branch} → {parent_name} (conflict)"));
                    return Ok(Some(Halt::Conflict { branch, files }));
                }
            }
        }

        Ok(None)
    }

    /// Untrack a planned branch that vanished. Its children move onto its parent and
    /// keep their recorded base, so the vanished commits are dropped from them.
    fn drop_missing(
        &self,
        state: &mut StackState,
        cascade: &mut CascadeState,
        branch: &str,
    ) -> Result<()> {
        warn!("Branch '{}' no longer exists, untracking it", branch);
        self.print(format!("   - {branch} (missing, untracked)"));
        state.graph.remove_branch(branch)?;
        cascade.plan.remove(cascade.cursor);
        cascade.onto = None;
        Ok(())
    }

    fn announce(&self, preview: &StepPreview) {
        self.print(format!(
            "   Rebasing these commits in {} onto {}:",
            preview.branch, preview.parent
        ));
        for subject in &preview.commits {
            self.print(format!("     * {subject}"));
        }
    }

    fn return_to(&self, cascade: &CascadeState) {
        if !self.options.return_to_original_branch {
            return;
        }
        let Some(original) = cascade.original_branch.as_deref() else {
            return;
        };
        if !self.vcs.branch_exists(original) {
            debug!("Original branch '{}' is gone, staying put", original);
            return;
        }
        if self.vcs.current_branch().ok().as_deref() == Some(original) {
            return;
        }
        if let Err(e) = self.vcs.checkout(original) {
            warn!("Could not switch back to '{}': {}", original, e);
        }
    }

    fn print(&self, line: String) {
        if let Some(printer) = &self.options.progress_printer {
            printer.println(line);
        }
    }
}

fn short(hash: &str) -> &str {
    hash.get(..8).unwrap_or(hash)
}
