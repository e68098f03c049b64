use super::StackContext;
use crate::cli::output::Output;
use crate::errors::{Result, StackError};
use crate::git::VersionControl;
use crate::stack::{
    CascadeOptions, CascadeOutcome, CascadeReport, RebaseEngine, StepApproval, StepPreview,
};
use crate::utils::spinner::Spinner;
use console::style;
use dialoguer::{theme::ColorfulTheme, Confirm};
use std::rc::Rc;
use tracing::info;

/// Rebase every tracked branch onto the current tip of its parent, starting from trunk
pub fn sync() -> Result<()> {
    let mut ctx = StackContext::load()?;
    ctx.state.ensure_no_cascade()?;
    ctx.ensure_clean_worktree()?;

    if ctx.settings.sync.prune_missing_branches {
        prune_missing_branches(&mut ctx)?;
    }

    let trunk = ctx.trunk().to_string();
    let spinner = Spinner::new(format!("Syncing stack onto '{trunk}'..."));
    let options = cascade_options(&ctx, &spinner)?;
    let engine = RebaseEngine::new(&ctx.repo, options);
    let outcome = engine.start(&mut ctx.state, &trunk);
    spinner.stop();

    finish(&ctx, outcome)
}

/// Resume a sync that stopped on a conflict, a declined step or an error
pub fn continue_sync() -> Result<()> {
    let mut ctx = StackContext::load()?;

    let spinner = Spinner::new("Continuing sync...");
    let options = cascade_options(&ctx, &spinner)?;
    let engine = RebaseEngine::new(&ctx.repo, options);
    let outcome = engine.resume(&mut ctx.state);
    spinner.stop();

    finish(&ctx, outcome)
}

/// Abandon a suspended sync
pub fn abort() -> Result<()> {
    let mut ctx = StackContext::load()?;

    let options = CascadeOptions {
        return_to_original_branch: ctx.settings.sync.return_to_original_branch,
        ..CascadeOptions::default()
    };
    let engine = RebaseEngine::new(&ctx.repo, options);
    let outcome = engine.abort(&mut ctx.state);

    finish(&ctx, outcome)
}

fn cascade_options(ctx: &StackContext, spinner: &Spinner) -> Result<CascadeOptions> {
    let approve_step = if ctx.settings.sync.confirm {
        if !console::Term::stderr().is_term() {
            return Err(StackError::prompt(
                "sync.confirm is on but there is no interactive terminal to confirm on",
            ));
        }
        let printer = spinner.printer();
        let approve: StepApproval = Rc::new(move |preview: &StepPreview| {
            printer.suspend(|| {
                Confirm::with_theme(&ColorfulTheme::default())
                    .with_prompt(format!(
                        "Rebase '{}' onto '{}'? (no pauses the sync here)",
                        preview.branch, preview.parent
                    ))
                    .default(true)
                    .interact()
                    .map_err(|e| StackError::prompt(format!("Input error: {e}")))
            })
        });
        Some(approve)
    } else {
        None
    };

    Ok(CascadeOptions {
        return_to_original_branch: ctx.settings.sync.return_to_original_branch,
        progress_printer: Some(spinner.printer()),
        approve_step,
    })
}

/// Persist whatever the engine recorded, then report. Bookkeeping from the steps that did
/// complete is kept even when a later one failed.
fn finish(ctx: &StackContext, outcome: Result<CascadeOutcome>) -> Result<()> {
    ctx.save()?;
    match outcome {
        Ok(outcome) => report(outcome),
        Err(e) => {
            if ctx.state.cascade.is_some() {
                Output::tip("The sync is kept. Fix the problem, then run `gst continue`, or `gst abort` to drop it");
            }
            Err(e)
        }
    }
}

/// Untrack branches whose git branch is gone, handing their children to their parent
fn prune_missing_branches(ctx: &mut StackContext) -> Result<()> {
    let missing: Vec<String> = ctx
        .state
        .graph
        .branches()
        .into_iter()
        .map(|(name, _)| name.to_string())
        .filter(|name| !ctx.repo.branch_exists(name))
        .collect();

    for branch in missing {
        let removed = ctx.state.graph.remove_branch(&branch)?;
        let parent = ctx.state.graph.parent_name(&removed.parent).to_string();
        info!("Pruned missing branch '{}'", branch);
        Output::info(format!(
            "'{}' no longer exists, untracked it (children moved onto '{}')",
            style(&branch).cyan(),
            parent
        ));
    }
    Ok(())
}

fn report(outcome: CascadeOutcome) -> Result<()> {
    match outcome {
        CascadeOutcome::Completed(report) => {
            print_missing(&report);
            if report.rebased.is_empty() {
                Output::success(format!("Stack already up to date ({})", report.summary()));
            } else {
                Output::success(format!("Stack synced: {}", report.summary()));
            }
            Ok(())
        }
        CascadeOutcome::Suspended {
            branch,
            files,
            report,
        } => {
            print_missing(&report);
            if !report.rebased.is_empty() {
                Output::info(format!("Before stopping: {}", report.summary()));
            }
            Output::warning(format!(
                "Conflict while rebasing '{}'",
                style(&branch).cyan()
            ));
            for file in &files {
                Output::bullet(file);
            }
            Output::next_steps(&[
                "Resolve the conflicts and stage them with `git add`",
                "Run `gst continue` to carry on with the rest of the stack",
                "Or run `gst abort` to stop here",
            ]);
            Err(StackError::CascadePending(format!(
                "'{branch}' has unresolved conflicts"
            )))
        }
        CascadeOutcome::Paused { branch, report } => {
            print_missing(&report);
            if !report.rebased.is_empty() {
                Output::info(format!("Before stopping: {}", report.summary()));
            }
            Output::info(format!(
                "Sync paused before rebasing '{}'",
                style(&branch).cyan()
            ));
            Output::next_steps(&[
                "Rebase it yourself if you want to edit its commits (`git rebase -i <parent>`)",
                "Run `gst continue` to carry on from that branch",
                "Or run `gst abort` to stop here",
            ]);
            Ok(())
        }
        CascadeOutcome::Aborted { branch } => {
            Output::success(format!(
                "Sync aborted, '{}' restored to its state before the rebase",
                style(&branch).cyan()
            ));
            Ok(())
        }
    }
}

fn print_missing(report: &CascadeReport) {
    for branch in &report.skipped_missing {
        Output::warning(format!("'{branch}' no longer exists, untracked it"));
    }
}
