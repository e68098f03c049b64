//! One-step moves through a stack.
//!
//! The navigator only answers questions about the graph. It never checks anything
//! out and never picks between siblings on the user's behalf.

use super::graph::{BranchGraph, Parent};
use crate::errors::NavigationError;

/// The single child of `current`, further from trunk.
///
/// Several children yield [`NavigationError::AmbiguousChildren`] carrying the
/// candidates so the caller can ask the user.
pub fn step_up(graph: &BranchGraph, current: &str) -> Result<String, NavigationError> {
    if current != graph.trunk() && !graph.contains(current) {
        return Err(NavigationError::NotTracked(current.to_string()));
    }

    let mut children = graph.children_of(current);
    match children.len() {
        0 => Err(NavigationError::AtTopOfStack(current.to_string())),
        1 => Ok(children.remove(0)),
        _ => Err(NavigationError::AmbiguousChildren {
            branch: current.to_string(),
            candidates: children,
        }),
    }
}

/// The parent of `current`, closer to trunk
pub fn step_down(graph: &BranchGraph, current: &str) -> Result<Parent, NavigationError> {
    if current == graph.trunk() {
        return Err(NavigationError::AtBottomOfStack(current.to_string()));
    }

    graph
        .parent_of(current)
        .cloned()
        .map_err(|_| NavigationError::NotTracked(current.to_string()))
}
