use super::StackContext;
use crate::errors::Result;
use crate::git::VersionControl;
use crate::stack::BranchGraph;
use console::style;
use std::collections::HashSet;

/// Print the tracked branches as a tree rooted at trunk
pub fn run() -> Result<()> {
    let ctx = StackContext::load()?;
    let current = ctx.current_branch().unwrap_or_default();

    for line in render_tree(&ctx.state.graph, &ctx.repo, &current)? {
        println!("{line}");
    }

    let untracked = untracked_branches(&ctx.state.graph, &ctx.repo)?;
    if !untracked.is_empty() {
        println!();
        println!("{}", style("Branches not tracked by gitstack:").red());
        for branch in untracked {
            println!("* {branch}");
        }
    }

    if let Some(cascade) = &ctx.state.cascade {
        println!();
        println!(
            "{} sync suspended on '{}'. Resolve it, then run `gst continue` or `gst abort`",
            style("⚠").yellow(),
            cascade.current_branch().unwrap_or_default()
        );
    }
    Ok(())
}

/// Tree lines: trunk, then each branch indented under its parent followed by its own commits.
/// A tracked branch that no longer exists locally gets no line of its own; its children are
/// drawn in its place, measured against the nearest ancestor that still exists.
pub fn render_tree<V: VersionControl + ?Sized>(
    graph: &BranchGraph,
    vcs: &V,
    current: &str,
) -> Result<Vec<String>> {
    let mut lines = vec![highlight(graph.trunk(), current)];
    for root in graph.children_of(graph.trunk()) {
        render_branch(graph, vcs, current, &root, graph.trunk(), 1, &mut lines)?;
    }
    Ok(lines)
}

fn render_branch<V: VersionControl + ?Sized>(
    graph: &BranchGraph,
    vcs: &V,
    current: &str,
    branch: &str,
    parent: &str,
    depth: usize,
    lines: &mut Vec<String>,
) -> Result<()> {
    if !vcs.branch_exists(branch) {
        for child in graph.children_of(branch) {
            render_branch(graph, vcs, current, &child, parent, depth, lines)?;
        }
        return Ok(());
    }

    let gap = " ".repeat(2 * (depth - 1));
    lines.push(format!("{gap}↳ {}", highlight(branch, current)));

    let commits = if vcs.branch_exists(parent) {
        vcs.commits_between(parent, branch)?
    } else {
        Vec::new()
    };
    if commits.is_empty() {
        lines.push(format!("{gap}  {}", style("empty branch").red()));
    }
    for subject in commits {
        lines.push(format!("{gap}  {}", style(subject).dim()));
    }

    for child in graph.children_of(branch) {
        render_branch(graph, vcs, current, &child, branch, depth + 1, lines)?;
    }
    Ok(())
}

/// Local branches that are neither trunk nor tracked
pub fn untracked_branches<V: VersionControl + ?Sized>(
    graph: &BranchGraph,
    vcs: &V,
) -> Result<Vec<String>> {
    let tracked: HashSet<&str> = graph.branches().into_iter().map(|(name, _)| name).collect();
    Ok(vcs
        .list_branches()?
        .into_iter()
        .filter(|branch| branch != graph.trunk() && !tracked.contains(branch.as_str()))
        .collect())
}

fn highlight(branch: &str, current: &str) -> String {
    if branch == current {
        style(branch).green().bold().to_string()
    } else {
        branch.to_string()
    }
}
