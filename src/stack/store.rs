use super::cascade::CascadeState;
use super::graph::{BranchGraph, Parent};
use crate::config::Settings;
use crate::errors::{Result, StackError};
use crate::utils::atomic_file;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

const STATE_VERSION: u32 = 1;

/// Persisted form of a tracked branch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BranchRecord {
    pub name: String,
    /// Parent branch; absent means trunk
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_known_parent_tip: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct StateFile {
    version: u32,
    #[serde(default)]
    branches: Vec<BranchRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    cascade: Option<CascadeState>,
}

/// Everything a command invocation loads up front and writes back at the end
#[derive(Debug, Clone)]
pub struct StackState {
    pub graph: BranchGraph,
    /// Checkpoint of a sync suspended on a conflict
    pub cascade: Option<CascadeState>,
}

impl StackState {
    pub fn new(trunk: impl Into<String>) -> Self {
        Self {
            graph: BranchGraph::new(trunk),
            cascade: None,
        }
    }

    /// Refuse topology changes while a sync is waiting on a conflict
    pub fn ensure_no_cascade(&self) -> Result<()> {
        match &self.cascade {
            Some(cascade) => Err(StackError::CascadePending(format!(
                "'{}' needs conflict resolution. Run `gst continue` or `gst abort` first",
                cascade.current_branch().unwrap_or("<unknown>")
            ))),
            None => Ok(()),
        }
    }
}

/// Durable home of the branch graph, a single JSON file inside the git directory
#[derive(Debug, Clone)]
pub struct StackStore {
    path: PathBuf,
}

impl StackStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store for a repository, located by the configured state file name
    pub fn for_repository(git_dir: &Path, settings: &Settings) -> Self {
        Self::new(git_dir.join(&settings.stack.state_file))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the stack state. A missing file is an empty graph.
    pub fn load(&self, trunk: &str) -> Result<StackState> {
        if !self.path.exists() {
            debug!("No state file at {:?}, starting empty", self.path);
            return Ok(StackState::new(trunk));
        }

        let content = fs::read_to_string(&self.path).map_err(|e| {
            StackError::state(format!("Failed to read {}: {e}", self.path.display()))
        })?;
        let file: StateFile = serde_json::from_str(&content).map_err(|e| {
            StackError::state(format!(
                "Failed to parse {}: {e}. Remove it and re-track your branches",
                self.path.display()
            ))
        })?;

        let state = Self::build_state(trunk, file).map_err(|reason| {
            StackError::state(format!(
                "{} is inconsistent: {reason}. Remove it and re-track your branches",
                self.path.display()
            ))
        })?;

        debug!(
            "Loaded {} tracked branches from {:?}",
            state.graph.len(),
            self.path
        );
        Ok(state)
    }

    fn build_state(trunk: &str, file: StateFile) -> std::result::Result<StackState, String> {
        if file.version != STATE_VERSION {
            return Err(format!("unsupported state version {}", file.version));
        }

        let mut graph = BranchGraph::new(trunk);
        let mut seen = HashSet::new();
        for record in file.branches {
            if !seen.insert(record.name.clone()) {
                return Err(format!("branch '{}' is listed twice", record.name));
            }
            let parent = match record.parent {
                Some(parent) if parent != trunk => Parent::Branch(parent),
                _ => Parent::Trunk,
            };
            graph.insert_raw(record.name, parent, record.last_known_parent_tip);
        }
        graph.validate().map_err(|e| e.to_string())?;

        if let Some(cascade) = &file.cascade {
            cascade.validate(&graph)?;
        }

        Ok(StackState {
            graph,
            cascade: file.cascade,
        })
    }

    /// Replace the persisted state in one rename, never leaving a partial file behind
    pub fn save(&self, state: &StackState) -> Result<()> {
        if let Some(dir) = self.path.parent() {
            if !dir.as_os_str().is_empty() && !dir.exists() {
                fs::create_dir_all(dir)?;
            }
        }

        let branches = state
            .graph
            .branches()
            .into_iter()
            .map(|(name, node)| BranchRecord {
                name: name.to_string(),
                parent: node.parent.as_branch().map(str::to_string),
                last_known_parent_tip: node.last_known_parent_tip.clone(),
            })
            .collect();

        let file = StateFile {
            version: STATE_VERSION,
            branches,
            cascade: state.cascade.clone(),
        };

        atomic_file::write_json(&self.path, &file)?;
        debug!("Saved stack state to {:?}", self.path);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store_in(dir: &TempDir) -> StackStore {
        StackStore::new(dir.path().join(".gitstack"))
    }

    #[test]
    fn test_missing_file_is_empty_graph() {
        let dir = TempDir::new().unwrap();
        let state = store_in(&dir).load("main").unwrap();
        assert!(state.graph.is_empty());
        assert!(state.cascade.is_none());
    }

    #[test]
    fn test_save_then_load_preserves_topology_and_order() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        let mut state = StackState::new("main");
        state.graph.add_branch("b", "main", Some("t1".into())).unwrap();
        state.graph.add_branch("a", "main", Some("t1".into())).unwrap();
        state.graph.add_branch("c", "b", Some("b1".into())).unwrap();
        // Re-parent an early branch below a later one
        state.graph.set_parent("a", "c", Some("c1".into())).unwrap();
        store.save(&state).unwrap();

        let loaded = store.load("main").unwrap();
        assert_eq!(loaded.graph.len(), 3);
        assert_eq!(
            loaded.graph.parent_of("a").unwrap(),
            &Parent::Branch("c".into())
        );
        assert_eq!(
            loaded
                .graph
                .node("c")
                .unwrap()
                .last_known_parent_tip
                .as_deref(),
            Some("b1")
        );
        let names: Vec<_> = loaded.graph.branches().into_iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["b", "a", "c"]);
    }

    #[test]
    fn test_garbage_is_state_error() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        fs::write(store.path(), "{ not json").unwrap();

        let err = store.load("main").unwrap_err();
        assert!(matches!(err, StackError::State(_)));
        assert_eq!(err.exit_code(), crate::errors::EXIT_CORRUPT_STATE);
    }

    #[test]
    fn test_cycle_on_disk_is_state_error() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        fs::write(
            store.path(),
            r#"{"version":1,"branches":[{"name":"x","parent":"y"},{"name":"y","parent":"x"}]}"#,
        )
        .unwrap();

        assert!(matches!(store.load("main"), Err(StackError::State(_))));
    }

    #[test]
    fn test_duplicate_record_is_state_error() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        fs::write(
            store.path(),
            r#"{"version":1,"branches":[{"name":"x"},{"name":"x"}]}"#,
        )
        .unwrap();

        assert!(matches!(store.load("main"), Err(StackError::State(_))));
    }

    #[test]
    fn test_trunk_named_parent_means_trunk() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        fs::write(
            store.path(),
            r#"{"version":1,"branches":[{"name":"x","parent":"main"}]}"#,
        )
        .unwrap();

        let state = store.load("main").unwrap();
        assert_eq!(state.graph.parent_of("x").unwrap(), &Parent::Trunk);
    }

    #[test]
    fn test_save_leaves_no_temp_file() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        store.save(&StackState::new("main")).unwrap();

        let leftovers: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_name().to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty());
        assert!(store.path().exists());
    }
}
