use super::StackContext;
use crate::cli::output::Output;
use crate::errors::{NavigationError, Result, StackError};
use crate::git::VersionControl;
use crate::stack::navigator;
use console::style;
use dialoguer::{theme::ColorfulTheme, Select};

/// Check out the child of the current branch, asking which one when there are several
pub fn up() -> Result<()> {
    let ctx = StackContext::load()?;
    ctx.state.ensure_no_cascade()?;
    let current = ctx.current_branch()?;

    let child = match navigator::step_up(&ctx.state.graph, &current) {
        Ok(child) => child,
        Err(NavigationError::AmbiguousChildren { branch, candidates }) => {
            choose_child(branch, candidates)?
        }
        Err(e) => return Err(e.into()),
    };

    ctx.repo.checkout(&child)?;
    Output::success(format!("Switched to '{}'", style(&child).cyan()));
    Ok(())
}

/// Check out the parent of the current branch
pub fn down() -> Result<()> {
    let ctx = StackContext::load()?;
    ctx.state.ensure_no_cascade()?;
    let current = ctx.current_branch()?;

    let parent = navigator::step_down(&ctx.state.graph, &current)?;
    let parent = ctx.state.graph.parent_name(&parent).to_string();

    ctx.repo.checkout(&parent)?;
    Output::success(format!("Switched to '{}'", style(&parent).cyan()));
    Ok(())
}

fn choose_child(branch: String, candidates: Vec<String>) -> Result<String> {
    if !console::Term::stderr().is_term() {
        Output::warning(format!("'{branch}' has several children:"));
        for (i, candidate) in candidates.iter().enumerate() {
            Output::numbered_item(i + 1, candidate);
        }
        Output::tip("Check one out directly with `git switch <branch>`");
        return Err(NavigationError::AmbiguousChildren { branch, candidates }.into());
    }

    let selection = Select::with_theme(&ColorfulTheme::default())
        .with_prompt(format!("'{branch}' has several children, pick one"))
        .items(&candidates[..])
        .default(0)
        .interact_opt()
        .map_err(|e| StackError::prompt(format!("Input error: {e}")))?;

    match selection {
        Some(index) => Ok(candidates[index].clone()),
        None => Err(NavigationError::AmbiguousChildren { branch, candidates }.into()),
    }
}
