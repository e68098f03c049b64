pub mod branch;
pub mod completions;
pub mod config;
pub mod navigate;
pub mod print;
pub mod status;
pub mod sync;

use crate::config::{load_settings, Settings};
use crate::errors::{Result, StackError};
use crate::git::{get_current_repository, GitRepository, VersionControl};
use crate::stack::{StackState, StackStore};
use tracing::debug;

/// Everything a stack command works with, loaded once per invocation
pub struct StackContext {
    pub repo: GitRepository,
    pub settings: Settings,
    pub store: StackStore,
    pub state: StackState,
}

impl StackContext {
    /// Open the repository in the current directory and load its stack
    pub fn load() -> Result<Self> {
        let repo = get_current_repository()?;
        let settings = load_settings(repo.git_dir())?;
        let trunk = settings.resolve_trunk(&repo)?;
        debug!("Using trunk '{}'", trunk);
        let store = StackStore::for_repository(repo.git_dir(), &settings);
        let state = store.load(&trunk)?;

        Ok(Self {
            repo,
            settings,
            store,
            state,
        })
    }

    pub fn trunk(&self) -> &str {
        self.state.graph.trunk()
    }

    pub fn save(&self) -> Result<()> {
        self.store.save(&self.state)
    }

    pub fn current_branch(&self) -> Result<String> {
        self.repo.current_branch()
    }

    /// Refuse to rewrite history on top of uncommitted changes
    pub fn ensure_clean_worktree(&self) -> Result<()> {
        if self.repo.is_dirty()? {
            return Err(StackError::branch(
                "Working tree has uncommitted changes. Commit or stash them first",
            ));
        }
        Ok(())
    }
}
