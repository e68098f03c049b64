//! Test helpers shared by the binary-driven integration tests.
//!
//! Every repository lives in its own temp dir next to a private HOME, so a developer's
//! global gitstack config never leaks into a test run.

use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};
use tempfile::TempDir;

/// Run a git command in `repo_path`, panicking with its stderr on failure
pub fn git(repo_path: &Path, args: &[&str]) -> String {
    let output = Command::new("git")
        .args(args)
        .current_dir(repo_path)
        .output()
        .expect("git should be runnable");

    if !output.status.success() {
        panic!(
            "Git command failed: git {}\nStderr: {}",
            args.join(" "),
            String::from_utf8_lossy(&output.stderr)
        );
    }
    String::from_utf8_lossy(&output.stdout).trim().to_string()
}

/// Create a repository on `main` with one commit. Returns the temp dir and the repo path.
pub fn create_test_git_repo() -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let repo_path = temp_dir.path().join("repo");
    std::fs::create_dir_all(&repo_path).unwrap();
    std::fs::create_dir_all(temp_dir.path().join("home")).unwrap();

    git(&repo_path, &["init", "-q"]);
    git(&repo_path, &["symbolic-ref", "HEAD", "refs/heads/main"]);
    git(&repo_path, &["config", "user.name", "Test User"]);
    git(&repo_path, &["config", "user.email", "test@example.com"]);
    git(&repo_path, &["config", "commit.gpgsign", "false"]);
    git(&repo_path, &["config", "core.autocrlf", "false"]);

    commit_file(&repo_path, "README.md", "# Test Repository\n", "Initial commit");

    (temp_dir, repo_path)
}

/// Write a file and commit it
pub fn commit_file(repo_path: &Path, filename: &str, content: &str, message: &str) {
    std::fs::write(repo_path.join(filename), content).unwrap();
    git(repo_path, &["add", filename]);
    git(repo_path, &["commit", "-q", "-m", message]);
}

pub fn branch_tip(repo_path: &Path, branch: &str) -> String {
    git(repo_path, &["rev-parse", &format!("refs/heads/{branch}")])
}

pub fn current_branch(repo_path: &Path) -> String {
    git(repo_path, &["rev-parse", "--abbrev-ref", "HEAD"])
}

/// Whether `ancestor` is reachable from `descendant`
#[allow(dead_code)]
pub fn is_ancestor(repo_path: &Path, ancestor: &str, descendant: &str) -> bool {
    Command::new("git")
        .args(["merge-base", "--is-ancestor", ancestor, descendant])
        .current_dir(repo_path)
        .status()
        .map(|status| status.success())
        .unwrap_or(false)
}

/// Commit subjects on `tip` that are not on `base`, oldest first
#[allow(dead_code)]
pub fn subjects_between(repo_path: &Path, base: &str, tip: &str) -> Vec<String> {
    let log = git(
        repo_path,
        &["log", "--reverse", "--format=%s", &format!("{base}..{tip}")],
    );
    log.lines().map(str::to_string).collect()
}

/// Run the gst binary against a test repository
pub fn run_gst(repo_path: &Path, args: &[&str]) -> Output {
    let home = repo_path
        .parent()
        .map(|dir| dir.join("home"))
        .unwrap_or_else(|| repo_path.to_path_buf());

    Command::new(env!("CARGO_BIN_EXE_gst"))
        .args(args)
        .arg("--no-color")
        .current_dir(repo_path)
        .env("HOME", home)
        .env_remove("GITSTACK_FILE")
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .expect("gst binary should be runnable")
}

/// Parsed contents of the repository's stack state file
#[allow(dead_code)]
pub fn read_state(repo_path: &Path) -> serde_json::Value {
    let content = std::fs::read_to_string(repo_path.join(".git").join(".gitstack"))
        .expect("state file should exist");
    serde_json::from_str(&content).expect("state file should be valid JSON")
}

/// The persisted record for `name`, if tracked
#[allow(dead_code)]
pub fn branch_record(repo_path: &Path, name: &str) -> Option<serde_json::Value> {
    read_state(repo_path)["branches"]
        .as_array()?
        .iter()
        .find(|record| record["name"] == name)
        .cloned()
}

/// Assert CLI command succeeds with helpful error messages
pub fn assert_cli_success(output: &Output, operation: &str) {
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        let stdout = String::from_utf8_lossy(&output.stdout);
        panic!(
            "{operation} failed:\nExit code: {}\nStderr: {stderr}\nStdout: {stdout}",
            output.status.code().unwrap_or(-1)
        );
    }
}

/// Assert CLI command fails with the given exit code and message
#[allow(dead_code)]
pub fn assert_cli_failure(output: &Output, operation: &str, code: i32, expected_error: &str) {
    let stderr = String::from_utf8_lossy(&output.stderr);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert_eq!(
        output.status.code(),
        Some(code),
        "{operation} exited with the wrong code.\nStderr: {stderr}\nStdout: {stdout}"
    );
    assert!(
        stderr.contains(expected_error) || stdout.contains(expected_error),
        "{operation} failed but didn't contain expected error '{expected_error}'.\nStderr: {stderr}\nStdout: {stdout}"
    );
}

/// Check if CLI command output contains expected content
#[allow(dead_code)]
pub fn assert_output_contains(output: &Output, expected_content: &str, context: &str) {
    let stderr = String::from_utf8_lossy(&output.stderr);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(
        stderr.contains(expected_content) || stdout.contains(expected_content),
        "{context}: Expected to find '{expected_content}' in output.\nStderr: {stderr}\nStdout: {stdout}"
    );
}
