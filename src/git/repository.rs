use super::vcs::{RebaseStep, VersionControl};
use crate::errors::{Result, StackError};
use git2::{BranchType, ErrorCode, Oid, Repository, RepositoryState, Signature};
use std::path::Path;
use tracing::{debug, info};

/// Wrapper around git2::Repository with the operations gitstack needs
pub struct GitRepository {
    repo: Repository,
}

impl GitRepository {
    /// Open a Git repository at the given path
    pub fn open(path: &Path) -> Result<Self> {
        let repo = Repository::discover(path)
            .map_err(|e| StackError::config(format!("Not a git repository: {e}")))?;

        if repo.workdir().is_none() {
            return Err(StackError::config("Repository has no working directory"));
        }

        Ok(Self { repo })
    }

    /// Git directory shared by all worktrees of this repository
    pub fn git_dir(&self) -> &Path {
        self.repo.commondir()
    }

    /// Get the current branch name
    pub fn get_current_branch(&self) -> Result<String> {
        let head = self
            .repo
            .head()
            .map_err(|e| StackError::branch(format!("Could not get HEAD: {e}")))?;

        if let Some(name) = head.shorthand().filter(|_| head.is_branch()) {
            Ok(name.to_string())
        } else {
            // Detached HEAD - return commit hash
            let commit = head
                .peel_to_commit()
                .map_err(|e| StackError::branch(format!("Could not get HEAD commit: {e}")))?;
            Ok(format!("HEAD@{}", commit.id()))
        }
    }

    /// Get the HEAD commit hash
    pub fn get_head_commit_hash(&self) -> Result<String> {
        let head = self
            .repo
            .head()
            .map_err(|e| StackError::branch(format!("Could not get HEAD: {e}")))?;

        let commit = head
            .peel_to_commit()
            .map_err(|e| StackError::branch(format!("Could not get HEAD commit: {e}")))?;

        Ok(commit.id().to_string())
    }

    /// Check if tracked files have uncommitted changes
    pub fn is_dirty(&self) -> Result<bool> {
        let statuses = self.repo.statuses(None)?;

        for status in statuses.iter() {
            let flags = status.status();

            if flags.intersects(
                git2::Status::INDEX_MODIFIED
                    | git2::Status::INDEX_NEW
                    | git2::Status::INDEX_DELETED
                    | git2::Status::INDEX_RENAMED
                    | git2::Status::WT_MODIFIED
                    | git2::Status::WT_DELETED
                    | git2::Status::CONFLICTED,
            ) {
                return Ok(true);
            }
        }

        Ok(false)
    }

    /// Get the commit hash at the head of a branch
    pub fn get_branch_head(&self, branch_name: &str) -> Result<String> {
        let branch = self
            .repo
            .find_branch(branch_name, BranchType::Local)
            .map_err(|e| {
                StackError::branch(format!("Could not find branch '{branch_name}': {e}"))
            })?;

        let commit = branch.get().peel_to_commit().map_err(|e| {
            StackError::branch(format!(
                "Could not get commit for branch '{branch_name}': {e}"
            ))
        })?;

        Ok(commit.id().to_string())
    }

    /// Check for merge conflicts in the index
    pub fn has_conflicts(&self) -> Result<bool> {
        let mut index = self.repo.index()?;
        index.read(false)?;
        Ok(index.has_conflicts())
    }

    /// Get list of conflicted files
    pub fn get_conflicted_files(&self) -> Result<Vec<String>> {
        let mut index = self.repo.index()?;
        index.read(false)?;

        let mut conflicts = Vec::new();
        for conflict in index.conflicts()? {
            let conflict = conflict?;
            let entry = conflict.our.or(conflict.their).or(conflict.ancestor);
            if let Some(path) = entry.and_then(|e| String::from_utf8(e.path).ok()) {
                conflicts.push(path);
            }
        }

        Ok(conflicts)
    }

    /// Get a signature for commits
    fn get_signature(&self) -> Result<Signature<'static>> {
        // Try to get signature from Git config
        if let Ok(config) = self.repo.config() {
            if let (Ok(name), Ok(email)) = (
                config.get_string("user.name"),
                config.get_string("user.email"),
            ) {
                return Ok(Signature::now(&name, &email)?);
            }
        }

        // Fallback to default signature
        Ok(Signature::now("gitstack", "gitstack@localhost")?)
    }

    fn parse_oid(&self, commit: &str) -> Result<Oid> {
        Oid::from_str(commit)
            .map_err(|e| StackError::branch(format!("Invalid commit id '{commit}': {e}")))
    }

    /// Commit the operation the rebase stopped on. `Some` means it is still conflicted.
    fn commit_current_operation(
        &self,
        rebase: &mut git2::Rebase<'_>,
        signature: &Signature<'_>,
    ) -> Result<Option<RebaseStep>> {
        if self.has_conflicts()? {
            return Ok(Some(RebaseStep::Conflicted {
                files: self.get_conflicted_files()?,
            }));
        }

        match rebase.commit(None, signature, None) {
            Ok(oid) => {
                debug!("Replayed commit as {}", oid);
                Ok(None)
            }
            Err(e) if e.code() == ErrorCode::Applied => {
                debug!("Patch already applied upstream, skipping");
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Apply the remaining operations of a rebase and finish it
    fn drive_rebase(&self, rebase: &mut git2::Rebase<'_>) -> Result<RebaseStep> {
        let signature = self.get_signature()?;

        while let Some(operation) = rebase.next() {
            operation?;
            if let Some(conflicted) = self.commit_current_operation(rebase, &signature)? {
                return Ok(conflicted);
            }
        }

        rebase.finish(Some(&signature))?;
        let new_tip = self.get_head_commit_hash()?;
        Ok(RebaseStep::Completed { new_tip })
    }
}

impl VersionControl for GitRepository {
    fn current_branch(&self) -> Result<String> {
        self.get_current_branch()
    }

    fn create_branch(&self, name: &str, start_point: &str) -> Result<()> {
        let target_obj = self.repo.revparse_single(start_point).map_err(|e| {
            StackError::branch(format!("Could not find target '{start_point}': {e}"))
        })?;
        let target_commit = target_obj.peel_to_commit().map_err(|e| {
            StackError::branch(format!("Target '{start_point}' is not a commit: {e}"))
        })?;

        self.repo.branch(name, &target_commit, false).map_err(|e| {
            StackError::branch(format!("Could not create branch '{name}': {e}"))
        })?;

        info!("Created branch '{}' at {}", name, start_point);
        Ok(())
    }

    fn tip_of(&self, branch: &str) -> Result<String> {
        self.get_branch_head(branch)
    }

    fn branch_exists(&self, branch: &str) -> bool {
        self.repo.find_branch(branch, BranchType::Local).is_ok()
    }

    fn list_branches(&self) -> Result<Vec<String>> {
        let mut branch_names = Vec::new();
        for branch in self.repo.branches(Some(BranchType::Local))? {
            let (branch, _) = branch?;
            if let Some(name) = branch.name()? {
                branch_names.push(name.to_string());
            }
        }
        branch_names.sort();
        Ok(branch_names)
    }

    fn merge_base(&self, a: &str, b: &str) -> Result<Option<String>> {
        let a = self.parse_oid(a)?;
        let b = self.parse_oid(b)?;
        match self.repo.merge_base(a, b) {
            Ok(oid) => Ok(Some(oid.to_string())),
            Err(e) if e.code() == ErrorCode::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn rebase(&self, branch: &str, onto: &str, upstream: &str) -> Result<RebaseStep> {
        debug!(
            "Rebasing {} onto {} (upstream {})",
            branch, onto, upstream
        );

        let branch_ref = self
            .repo
            .find_reference(&format!("refs/heads/{branch}"))
            .map_err(|e| StackError::branch(format!("Could not find branch '{branch}': {e}")))?;
        let branch_commit = self.repo.reference_to_annotated_commit(&branch_ref)?;
        let upstream_commit = self.repo.find_annotated_commit(self.parse_oid(upstream)?)?;
        let onto_commit = self.repo.find_annotated_commit(self.parse_oid(onto)?)?;

        let mut options = git2::RebaseOptions::new();
        let mut rebase = self.repo.rebase(
            Some(&branch_commit),
            Some(&upstream_commit),
            Some(&onto_commit),
            Some(&mut options),
        )?;

        self.drive_rebase(&mut rebase)
    }

    fn rebase_in_progress(&self) -> bool {
        matches!(
            self.repo.state(),
            RepositoryState::Rebase
                | RepositoryState::RebaseInteractive
                | RepositoryState::RebaseMerge
        )
    }

    fn continue_rebase(&self) -> Result<RebaseStep> {
        let mut rebase = self
            .repo
            .open_rebase(None)
            .map_err(|e| StackError::branch(format!("No rebase to continue: {e}")))?;
        let signature = self.get_signature()?;

        if let Some(conflicted) = self.commit_current_operation(&mut rebase, &signature)? {
            return Ok(conflicted);
        }
        self.drive_rebase(&mut rebase)
    }

    fn abort_rebase(&self) -> Result<()> {
        let mut rebase = self
            .repo
            .open_rebase(None)
            .map_err(|e| StackError::branch(format!("No rebase to abort: {e}")))?;
        rebase.abort()?;
        info!("Rebase aborted, branch restored");
        Ok(())
    }

    fn checkout(&self, name: &str) -> Result<()> {
        let branch = self
            .repo
            .find_branch(name, BranchType::Local)
            .map_err(|e| StackError::branch(format!("Could not find branch '{name}': {e}")))?;

        let tree = branch.get().peel_to_tree().map_err(|e| {
            StackError::branch(format!("Could not get tree for branch '{name}': {e}"))
        })?;

        let mut checkout = git2::build::CheckoutBuilder::new();
        checkout.safe();
        self.repo
            .checkout_tree(tree.as_object(), Some(&mut checkout))
            .map_err(|e| StackError::branch(format!("Could not checkout branch '{name}': {e}")))?;

        self.repo
            .set_head(&format!("refs/heads/{name}"))
            .map_err(|e| StackError::branch(format!("Could not update HEAD to '{name}': {e}")))?;

        info!("Switched to branch '{}'", name);
        Ok(())
    }

    fn delete_branch(&self, name: &str) -> Result<()> {
        let mut branch = self
            .repo
            .find_branch(name, BranchType::Local)
            .map_err(|e| StackError::branch(format!("Could not find branch '{name}': {e}")))?;

        branch
            .delete()
            .map_err(|e| StackError::branch(format!("Could not delete branch '{name}': {e}")))?;

        info!("Deleted branch '{}'", name);
        Ok(())
    }

    fn commits_between(&self, base: &str, tip: &str) -> Result<Vec<String>> {
        let base_oid = self.repo.revparse_single(base)?.peel_to_commit()?.id();
        let tip_oid = self.repo.revparse_single(tip)?.peel_to_commit()?.id();

        let mut revwalk = self.repo.revwalk()?;
        revwalk.set_sorting(git2::Sort::TOPOLOGICAL | git2::Sort::REVERSE)?;
        revwalk.push(tip_oid)?;
        revwalk.hide(base_oid)?;

        let mut subjects = Vec::new();
        for oid in revwalk {
            let commit = self.repo.find_commit(oid?)?;
            if commit.parent_count() > 1 {
                continue;
            }
            subjects.push(commit.summary().unwrap_or("").to_string());
        }

        Ok(subjects)
    }
}
