use super::StackContext;
use crate::cli::output::Output;
use crate::errors::{GraphError, Result, StackError};
use crate::git::VersionControl;
use console::style;
use dialoguer::{theme::ColorfulTheme, Confirm};
use tracing::{debug, warn};

/// Create a branch on top of `parent` (trunk when omitted, `.` for the current branch) and track it
pub fn new_branch(name: String, parent: Option<String>) -> Result<()> {
    let mut ctx = StackContext::load()?;
    ctx.state.ensure_no_cascade()?;

    let parent = match parent.as_deref() {
        None => ctx.trunk().to_string(),
        Some(".") => ctx.current_branch()?,
        Some(parent) => parent.to_string(),
    };

    // Check the graph first so a rejected branch never reaches git
    if name == ctx.trunk() {
        return Err(GraphError::TrunkNotTrackable(name).into());
    }
    if ctx.state.graph.contains(&name) {
        return Err(GraphError::DuplicateBranch(name).into());
    }
    ctx.state.graph.resolve_parent(&parent)?;
    if ctx.repo.branch_exists(&name) {
        return Err(StackError::branch(format!(
            "Branch '{name}' already exists. Check it out and run `gst track <parent>` instead"
        )));
    }

    let parent_tip = ctx.repo.tip_of(&parent)?;
    ctx.repo.create_branch(&name, &parent_tip)?;
    if let Err(e) = ctx.repo.checkout(&name) {
        // Leave nothing behind so the same `gst new` can be retried
        if let Err(cleanup) = ctx.repo.delete_branch(&name) {
            warn!("Could not remove '{}' after the failed checkout: {}", name, cleanup);
        }
        return Err(e);
    }
    ctx.state
        .graph
        .add_branch(&name, &parent, Some(parent_tip))?;
    ctx.save()?;

    Output::success(format!(
        "Created and switched to '{}' on top of '{}'",
        style(&name).cyan(),
        style(&parent).cyan()
    ));
    Ok(())
}

/// Track the current branch with the given parent
pub fn track(parent: String) -> Result<()> {
    let mut ctx = StackContext::load()?;
    ctx.state.ensure_no_cascade()?;

    let branch = ctx.current_branch()?;
    if !ctx.repo.branch_exists(&parent) {
        return Err(StackError::branch(format!("Branch '{parent}' does not exist")));
    }
    if branch == parent {
        return Err(StackError::validation("A branch cannot be its own parent"));
    }
    if branch == ctx.trunk() {
        return Err(GraphError::TrunkNotTrackable(branch).into());
    }

    let parent_tip = ctx.repo.tip_of(&parent)?;
    let branch_tip = ctx.repo.tip_of(&branch)?;
    let base = ctx.repo.merge_base(&parent_tip, &branch_tip)?;
    debug!("Merge base of '{}' and '{}': {:?}", branch, parent, base);

    let current_parent = ctx
        .state
        .graph
        .node(&branch)
        .map(|node| ctx.state.graph.parent_name(&node.parent).to_string());

    match current_parent {
        Some(current) if current == parent => {
            Output::info(format!(
                "Parent of '{}' is already '{}', no changes needed",
                style(&branch).cyan(),
                style(&parent).cyan()
            ));
            return Ok(());
        }
        Some(current) => {
            if ctx.settings.track.confirm_reparent
                && !confirm(&format!(
                    "Switch the parent of '{branch}' from '{current}' to '{parent}'?"
                ))?
            {
                Output::info("Parent left unchanged");
                return Ok(());
            }
            ctx.state.graph.set_parent(&branch, &parent, base)?;
            Output::success(format!(
                "Moved '{}' from '{}' to '{}'",
                style(&branch).cyan(),
                current,
                style(&parent).cyan()
            ));
            Output::tip("Run `gst sync` to replay it onto its new parent");
        }
        None => {
            ctx.state.graph.add_branch(&branch, &parent, base)?;
            Output::success(format!(
                "Tracking '{}' on top of '{}'",
                style(&branch).cyan(),
                style(&parent).cyan()
            ));
        }
    }

    ctx.save()
}

/// Stop tracking a branch (the current one by default). The git branch stays.
///
/// Its commits stay in the children too: each child is rebased from its merge base with
/// the new parent on the next sync, rather than from the untracked branch's old tip.
pub fn untrack(name: Option<String>) -> Result<()> {
    let mut ctx = StackContext::load()?;
    ctx.state.ensure_no_cascade()?;

    let name = match name {
        Some(name) => name,
        None => ctx.current_branch()?,
    };
    let children = ctx.state.graph.children_of(&name);
    let removed = ctx.state.graph.remove_branch(&name)?;
    let new_parent = ctx.state.graph.parent_name(&removed.parent).to_string();

    if ctx.repo.branch_exists(&new_parent) {
        let parent_tip = ctx.repo.tip_of(&new_parent)?;
        for child in children.iter().filter(|child| ctx.repo.branch_exists(child)) {
            let child_tip = ctx.repo.tip_of(child)?;
            if let Some(base) = ctx.repo.merge_base(&parent_tip, &child_tip)? {
                debug!("'{}' now based on {} from '{}'", child, base, new_parent);
                ctx.state.graph.set_last_known_parent_tip(child, base)?;
            }
        }
    }
    ctx.save()?;

    Output::success(format!("Stopped tracking '{}'", style(&name).cyan()));
    for child in children {
        Output::sub_item(format!("'{child}' now sits on '{new_parent}'"));
    }
    Ok(())
}

/// Untrack a branch and delete it from git
pub fn delete(name: String) -> Result<()> {
    let mut ctx = StackContext::load()?;
    ctx.state.ensure_no_cascade()?;

    if name == ctx.trunk() {
        return Err(StackError::branch("The trunk branch cannot be deleted"));
    }
    if ctx.current_branch()? == name {
        return Err(StackError::branch(format!(
            "Cannot delete '{name}' while it is checked out. Switch to another branch first"
        )));
    }

    let tracked = ctx.state.graph.contains(&name);
    let exists = ctx.repo.branch_exists(&name);
    if !tracked && !exists {
        return Err(StackError::branch(format!("Branch '{name}' does not exist")));
    }

    let children = ctx.state.graph.children_of(&name);
    if exists {
        ctx.repo.delete_branch(&name)?;
    }
    if tracked {
        ctx.state.graph.remove_branch(&name)?;
        ctx.save()?;
    }

    Output::success(format!("Deleted '{}'", style(&name).cyan()));
    if !children.is_empty() {
        Output::sub_item(format!(
            "Re-parented {}. Run `gst sync` to drop the deleted commits from them",
            children.join(", ")
        ));
    }
    Ok(())
}

fn confirm(prompt: &str) -> Result<bool> {
    if !console::Term::stderr().is_term() {
        return Err(StackError::prompt(format!(
            "{prompt} (needs an interactive terminal, or set track.confirm_reparent to false)"
        )));
    }
    Confirm::with_theme(&ColorfulTheme::default())
        .with_prompt(prompt)
        .default(false)
        .interact()
        .map_err(|e| StackError::prompt(format!("Input error: {e}")))
}
