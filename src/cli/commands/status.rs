use super::StackContext;
use crate::cli::output::Output;
use crate::errors::Result;
use crate::git::VersionControl;
use console::style;

/// Show trunk, the current branch and any suspended sync
pub fn run() -> Result<()> {
    let ctx = StackContext::load()?;
    let current = ctx.current_branch()?;

    Output::section("Repository");
    Output::sub_item(format!("Trunk: {}", style(ctx.trunk()).cyan()));
    Output::sub_item(format!("Current branch: {}", style(&current).cyan()));
    Output::sub_item(format!("Tracked branches: {}", ctx.state.graph.len()));
    Output::sub_item(format!("State file: {}", ctx.store.path().display()));

    if let Ok(ancestors) = ctx.state.graph.ancestors(&current) {
        if ancestors.len() > 1 {
            Output::sub_item(format!("Stack: {}", ancestors.join(" → ")));
        }
    }

    let Some(cascade) = &ctx.state.cascade else {
        Output::spacing();
        Output::success("No sync in progress");
        return Ok(());
    };

    Output::section("Suspended sync");
    Output::sub_item(format!(
        "Started: {}",
        cascade.started_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    let in_flight = cascade.onto.is_some();
    for (i, branch) in cascade.plan.iter().enumerate() {
        let marker = match i.cmp(&cascade.cursor) {
            std::cmp::Ordering::Less => style("done").green(),
            std::cmp::Ordering::Equal if in_flight => style("conflict").red(),
            std::cmp::Ordering::Equal => style("next").yellow(),
            std::cmp::Ordering::Greater => style("pending").dim(),
        };
        Output::numbered_item(i + 1, format!("{branch} ({marker})"));
    }
    if in_flight && !ctx.repo.rebase_in_progress() {
        Output::warning("No git rebase is in progress for the suspended branch");
    }
    Output::next_steps(&["gst continue", "gst abort"]);
    Ok(())
}
