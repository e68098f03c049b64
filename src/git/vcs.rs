use crate::errors::Result;

/// Result of replaying a branch onto a new base
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RebaseStep {
    /// Every commit applied, the branch now points at `new_tip`
    Completed { new_tip: String },
    /// Replay stopped on a commit that needs manual resolution
    Conflicted { files: Vec<String> },
}

impl RebaseStep {
    pub fn is_conflicted(&self) -> bool {
        matches!(self, RebaseStep::Conflicted { .. })
    }
}

/// The version-control primitives the stack logic is built on.
///
/// Commit identities are plain hex strings. Branch names are local branch names.
pub trait VersionControl {
    fn current_branch(&self) -> Result<String>;

    fn create_branch(&self, name: &str, start_point: &str) -> Result<()>;

    fn tip_of(&self, branch: &str) -> Result<String>;

    fn branch_exists(&self, branch: &str) -> bool;

    fn list_branches(&self) -> Result<Vec<String>>;

    /// Best common ancestor of two commits, if they share history
    fn merge_base(&self, a: &str, b: &str) -> Result<Option<String>>;

    /// Replay the commits of `branch` that are not reachable from `upstream` onto `onto`
    fn rebase(&self, branch: &str, onto: &str, upstream: &str) -> Result<RebaseStep>;

    /// Whether a rebase is waiting for conflict resolution
    fn rebase_in_progress(&self) -> bool;

    /// Finish the suspended rebase once conflicts are resolved
    fn continue_rebase(&self) -> Result<RebaseStep>;

    /// Drop the suspended rebase and restore the branch to where it started
    fn abort_rebase(&self) -> Result<()>;

    fn checkout(&self, branch: &str) -> Result<()>;

    fn delete_branch(&self, branch: &str) -> Result<()>;

    /// Subject lines of commits reachable from `tip` but not `base`, oldest first
    fn commits_between(&self, base: &str, tip: &str) -> Result<Vec<String>>;
}
