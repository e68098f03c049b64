use crate::errors::GraphError;
use std::collections::{HashMap, HashSet};
use std::fmt;

/// Where a tracked branch hangs in the forest
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Parent {
    /// The implicit root every stack starts from
    Trunk,
    /// Another tracked branch
    Branch(String),
}

impl Parent {
    pub fn as_branch(&self) -> Option<&str> {
        match self {
            Parent::Trunk => None,
            Parent::Branch(name) => Some(name),
        }
    }

    pub fn is_trunk(&self) -> bool {
        matches!(self, Parent::Trunk)
    }
}

impl fmt::Display for Parent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Parent::Trunk => write!(f, "<trunk>"),
            Parent::Branch(name) => write!(f, "{name}"),
        }
    }
}

/// A tracked branch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BranchNode {
    pub parent: Parent,
    /// Parent tip this branch was last rebased onto (or forked from)
    pub last_known_parent_tip: Option<String>,
    /// Registration order, used as the deterministic sibling order
    seq: u64,
}

/// Forest of tracked branches keyed by name.
///
/// Only parent pointers are stored. Children are derived on demand so there is a
/// single source of truth for the topology.
#[derive(Debug, Clone)]
pub struct BranchGraph {
    trunk: String,
    nodes: HashMap<String, BranchNode>,
    next_seq: u64,
}

impl BranchGraph {
    /// Create an empty graph rooted at the given trunk branch
    pub fn new(trunk: impl Into<String>) -> Self {
        Self {
            trunk: trunk.into(),
            nodes: HashMap::new(),
            next_seq: 0,
        }
    }

    pub fn trunk(&self) -> &str {
        &self.trunk
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.nodes.contains_key(name)
    }

    pub fn node(&self, name: &str) -> Option<&BranchNode> {
        self.nodes.get(name)
    }

    /// All tracked branches in registration order
    pub fn branches(&self) -> Vec<(&str, &BranchNode)> {
        let mut entries: Vec<_> = self
            .nodes
            .iter()
            .map(|(name, node)| (name.as_str(), node))
            .collect();
        entries.sort_by_key(|(_, node)| node.seq);
        entries
    }

    /// Resolve a branch name given by the user into a parent reference
    pub fn resolve_parent(&self, name: &str) -> Result<Parent, GraphError> {
        if name == self.trunk {
            Ok(Parent::Trunk)
        } else if self.nodes.contains_key(name) {
            Ok(Parent::Branch(name.to_string()))
        } else {
            Err(GraphError::UnknownParent(name.to_string()))
        }
    }

    /// Branch name a parent reference points at
    pub fn parent_name<'a>(&'a self, parent: &'a Parent) -> &'a str {
        match parent {
            Parent::Trunk => &self.trunk,
            Parent::Branch(name) => name,
        }
    }

    /// Start tracking `name` on top of `parent` (trunk or a tracked branch)
    pub fn add_branch(
        &mut self,
        name: &str,
        parent: &str,
        last_known_parent_tip: Option<String>,
    ) -> Result<(), GraphError> {
        if name == self.trunk {
            return Err(GraphError::TrunkNotTrackable(name.to_string()));
        }
        if self.nodes.contains_key(name) {
            return Err(GraphError::DuplicateBranch(name.to_string()));
        }
        let parent = self.resolve_parent(parent)?;
        self.insert_raw(name.to_string(), parent, last_known_parent_tip);
        Ok(())
    }

    /// Move a tracked branch onto a new parent.
    ///
    /// Fails without touching the graph when `parent` is `name` itself or one of its descendants.
    pub fn set_parent(
        &mut self,
        name: &str,
        parent: &str,
        last_known_parent_tip: Option<String>,
    ) -> Result<(), GraphError> {
        if !self.nodes.contains_key(name) {
            return Err(GraphError::UnknownBranch(name.to_string()));
        }
        let new_parent = self.resolve_parent(parent)?;
        if let Parent::Branch(candidate) = &new_parent {
            if candidate == name || self.is_ancestor_of(name, candidate) {
                return Err(GraphError::CycleDetected {
                    branch: name.to_string(),
                    parent: candidate.clone(),
                });
            }
        }

        if let Some(node) = self.nodes.get_mut(name) {
            node.parent = new_parent;
            node.last_known_parent_tip = last_known_parent_tip;
        }
        Ok(())
    }

    pub fn parent_of(&self, name: &str) -> Result<&Parent, GraphError> {
        self.nodes
            .get(name)
            .map(|node| &node.parent)
            .ok_or_else(|| GraphError::UnknownBranch(name.to_string()))
    }

    /// Record the parent tip a branch now sits on
    pub fn set_last_known_parent_tip(&mut self, name: &str, tip: String) -> Result<(), GraphError> {
        let node = self
            .nodes
            .get_mut(name)
            .ok_or_else(|| GraphError::UnknownBranch(name.to_string()))?;
        node.last_known_parent_tip = Some(tip);
        Ok(())
    }

    /// Direct children of `name` (trunk's name yields the stack roots), in registration order
    pub fn children_of(&self, name: &str) -> Vec<String> {
        let target = if name == self.trunk {
            Parent::Trunk
        } else {
            Parent::Branch(name.to_string())
        };

        let mut children: Vec<_> = self
            .nodes
            .iter()
            .filter(|(_, node)| node.parent == target)
            .map(|(child, node)| (node.seq, child.clone()))
            .collect();
        children.sort();
        children.into_iter().map(|(_, child)| child).collect()
    }

    /// `name` followed by each ancestor, ending with trunk
    pub fn ancestors(&self, name: &str) -> Result<Vec<String>, GraphError> {
        if name == self.trunk {
            return Ok(vec![self.trunk.clone()]);
        }

        let mut chain = vec![name.to_string()];
        let mut seen = HashSet::new();
        seen.insert(name.to_string());
        let mut current = self.parent_of(name)?;

        while let Parent::Branch(parent) = current {
            if !seen.insert(parent.clone()) {
                return Err(GraphError::CycleDetected {
                    branch: name.to_string(),
                    parent: parent.clone(),
                });
            }
            chain.push(parent.clone());
            current = self.parent_of(parent)?;
        }

        chain.push(self.trunk.clone());
        Ok(chain)
    }

    /// `name` and everything stacked on it, parents always before children.
    ///
    /// Depth-first, siblings in registration order, so a whole sub-stack is listed
    /// before its next sibling. For trunk, trunk itself is left out.
    pub fn descendants_in_topo_order(&self, name: &str) -> Result<Vec<String>, GraphError> {
        let mut order = Vec::new();
        let mut pending = if name == self.trunk {
            let mut roots = self.children_of(name);
            roots.reverse();
            roots
        } else if self.nodes.contains_key(name) {
            vec![name.to_string()]
        } else {
            return Err(GraphError::UnknownBranch(name.to_string()));
        };

        let mut visited = HashSet::new();
        while let Some(branch) = pending.pop() {
            if !visited.insert(branch.clone()) {
                continue;
            }
            let mut children = self.children_of(&branch);
            children.reverse();
            pending.extend(children);
            order.push(branch);
        }

        Ok(order)
    }

    /// Stop tracking `name`, handing its direct children to its parent.
    ///
    /// Children keep their `last_known_parent_tip`, so the next sync replays only
    /// their own commits onto the new parent.
    pub fn remove_branch(&mut self, name: &str) -> Result<BranchNode, GraphError> {
        let removed = self
            .nodes
            .remove(name)
            .ok_or_else(|| GraphError::UnknownBranch(name.to_string()))?;

        let orphaned = Parent::Branch(name.to_string());
        for node in self.nodes.values_mut() {
            if node.parent == orphaned {
                node.parent = removed.parent.clone();
            }
        }

        Ok(removed)
    }

    /// Whether `ancestor` lies on the parent chain of `name`
    pub fn is_ancestor_of(&self, ancestor: &str, name: &str) -> bool {
        let mut current = self.nodes.get(name).map(|node| &node.parent);
        let mut steps = 0;
        while let Some(Parent::Branch(parent)) = current {
            if parent == ancestor {
                return true;
            }
            steps += 1;
            if steps > self.nodes.len() {
                return false;
            }
            current = self.nodes.get(parent).map(|node| &node.parent);
        }
        false
    }

    /// Insert without checks. Callers must run [`BranchGraph::validate`] afterwards.
    pub(crate) fn insert_raw(
        &mut self,
        name: String,
        parent: Parent,
        last_known_parent_tip: Option<String>,
    ) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.nodes.insert(
            name,
            BranchNode {
                parent,
                last_known_parent_tip,
                seq,
            },
        );
    }

    /// Check the forest invariants: trunk untracked, parents tracked, no cycles
    pub fn validate(&self) -> Result<(), GraphError> {
        if self.nodes.contains_key(&self.trunk) {
            return Err(GraphError::TrunkNotTrackable(self.trunk.clone()));
        }

        for (name, node) in &self.nodes {
            if let Parent::Branch(parent) = &node.parent {
                if !self.nodes.contains_key(parent) {
                    return Err(GraphError::UnknownParent(parent.clone()));
                }
            }
            self.ancestors(name)?;
        }

        Ok(())
    }
}
