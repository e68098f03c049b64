//! End-to-end tests for branch lifecycle and navigation commands

#[path = "integration/test_helpers.rs"]
mod test_helpers;

use test_helpers::*;

#[test]
fn test_new_creates_checks_out_and_tracks() {
    let (_tmp, repo_path) = create_test_git_repo();
    let main_tip = branch_tip(&repo_path, "main");

    assert_cli_success(&run_gst(&repo_path, &["new", "a"]), "gst new a");
    assert_eq!(current_branch(&repo_path), "a");
    assert_eq!(branch_tip(&repo_path, "a"), main_tip);

    let a = branch_record(&repo_path, "a").unwrap();
    assert!(a.get("parent").is_none(), "omitted parent means trunk");
    assert_eq!(a["last_known_parent_tip"], main_tip.as_str());

    assert_cli_success(&run_gst(&repo_path, &["b", "b", "."]), "gst b b .");
    assert_eq!(current_branch(&repo_path), "b");
    assert_eq!(branch_record(&repo_path, "b").unwrap()["parent"], "a");

    git(&repo_path, &["checkout", "-q", "main"]);
    assert_cli_success(&run_gst(&repo_path, &["branch", "c", "b"]), "gst branch c b");
    assert_eq!(branch_record(&repo_path, "c").unwrap()["parent"], "b");
}

#[test]
fn test_new_rejects_duplicates_and_unknown_parents() {
    let (_tmp, repo_path) = create_test_git_repo();
    assert_cli_success(&run_gst(&repo_path, &["new", "a"]), "gst new a");

    let output = run_gst(&repo_path, &["new", "a"]);
    assert_cli_failure(&output, "duplicate new", 1, "already tracked");

    let output = run_gst(&repo_path, &["new", "x", "nowhere"]);
    assert_cli_failure(&output, "unknown parent", 1, "nowhere");
    assert!(branch_record(&repo_path, "x").is_none());
    assert!(git(&repo_path, &["branch", "--list", "x"]).is_empty());
}

#[test]
fn test_print_shows_tree_commits_and_untracked() {
    let (_tmp, repo_path) = create_test_git_repo();
    assert_cli_success(&run_gst(&repo_path, &["new", "a"]), "gst new a");
    commit_file(&repo_path, "a.txt", "a\n", "Add feature a");
    assert_cli_success(&run_gst(&repo_path, &["new", "b", "."]), "gst new b .");
    git(&repo_path, &["branch", "stray", "main"]);

    let output = run_gst(&repo_path, &["print"]);
    assert_cli_success(&output, "gst print");
    let stdout = String::from_utf8_lossy(&output.stdout);

    let lines: Vec<&str> = stdout.lines().collect();
    assert_eq!(lines[0], "main");
    assert_eq!(lines[1], "↳ a");
    assert_eq!(lines[2], "  Add feature a");
    assert_eq!(lines[3], "  ↳ b");
    assert_eq!(lines[4], "    empty branch");
    assert!(stdout.contains("Branches not tracked by gitstack:"));
    assert!(stdout.contains("* stray"));
}

#[test]
fn test_print_keeps_children_of_deleted_branch() {
    let (_tmp, repo_path) = create_test_git_repo();
    assert_cli_success(&run_gst(&repo_path, &["new", "a"]), "gst new a");
    commit_file(&repo_path, "a.txt", "a\n", "A1");
    assert_cli_success(&run_gst(&repo_path, &["new", "b", "."]), "gst new b .");
    commit_file(&repo_path, "b.txt", "b\n", "B1");
    assert_cli_success(&run_gst(&repo_path, &["new", "c", "."]), "gst new c .");
    git(&repo_path, &["checkout", "-q", "main"]);
    git(&repo_path, &["branch", "-D", "a"]);

    let output = run_gst(&repo_path, &["print"]);
    assert_cli_success(&output, "gst print");
    let stdout = String::from_utf8_lossy(&output.stdout);

    let lines: Vec<&str> = stdout.lines().collect();
    assert_eq!(lines[0], "main");
    assert_eq!(lines[1], "↳ b");
    assert_eq!(lines[2], "  A1");
    assert_eq!(lines[3], "  B1");
    assert_eq!(lines[4], "  ↳ c");
    assert_eq!(lines[5], "    empty branch");
    assert!(!stdout.contains("↳ a"));
}

#[test]
fn test_new_leaves_no_branch_when_checkout_fails() {
    let (_tmp, repo_path) = create_test_git_repo();
    assert_cli_success(&run_gst(&repo_path, &["new", "a"]), "gst new a");
    commit_file(&repo_path, "a.txt", "a\n", "A1");
    // Switching to main would have to remove this modified file
    std::fs::write(repo_path.join("a.txt"), "local edit\n").unwrap();

    let output = run_gst(&repo_path, &["new", "x", "main"]);
    assert_cli_failure(&output, "new over a blocking edit", 1, "checkout");
    assert!(git(&repo_path, &["branch", "--list", "x"]).is_empty());
    assert!(branch_record(&repo_path, "x").is_none());
    assert_eq!(current_branch(&repo_path), "a");

    git(&repo_path, &["checkout", "--", "a.txt"]);
    assert_cli_success(&run_gst(&repo_path, &["new", "x", "main"]), "retried gst new x");
    assert_eq!(current_branch(&repo_path), "x");
}

#[test]
fn test_up_and_down_walk_the_stack() {
    let (_tmp, repo_path) = create_test_git_repo();
    assert_cli_success(&run_gst(&repo_path, &["new", "a"]), "gst new a");
    assert_cli_success(&run_gst(&repo_path, &["new", "b", "."]), "gst new b .");
    git(&repo_path, &["checkout", "-q", "main"]);

    assert_cli_success(&run_gst(&repo_path, &["up"]), "up to a");
    assert_eq!(current_branch(&repo_path), "a");
    assert_cli_success(&run_gst(&repo_path, &["u"]), "up to b");
    assert_eq!(current_branch(&repo_path), "b");

    let output = run_gst(&repo_path, &["up"]);
    assert_cli_failure(&output, "up from the top", 3, "top of the stack");
    assert_eq!(current_branch(&repo_path), "b");

    assert_cli_success(&run_gst(&repo_path, &["down"]), "down to a");
    assert_eq!(current_branch(&repo_path), "a");
    assert_cli_success(&run_gst(&repo_path, &["d"]), "down to main");
    assert_eq!(current_branch(&repo_path), "main");

    let output = run_gst(&repo_path, &["down"]);
    assert_eq!(output.status.code(), Some(3));
    assert_eq!(current_branch(&repo_path), "main");
}

#[test]
fn test_up_with_several_children_needs_a_choice() {
    let (_tmp, repo_path) = create_test_git_repo();
    assert_cli_success(&run_gst(&repo_path, &["new", "left"]), "gst new left");
    git(&repo_path, &["checkout", "-q", "main"]);
    assert_cli_success(&run_gst(&repo_path, &["new", "right"]), "gst new right");
    git(&repo_path, &["checkout", "-q", "main"]);

    let output = run_gst(&repo_path, &["up"]);
    assert_cli_failure(&output, "ambiguous up", 3, "has 2 children: left, right");
    assert_eq!(current_branch(&repo_path), "main");
}

#[test]
fn test_navigation_on_untracked_branch() {
    let (_tmp, repo_path) = create_test_git_repo();
    git(&repo_path, &["checkout", "-q", "-b", "loose"]);

    let output = run_gst(&repo_path, &["down"]);
    assert_cli_failure(&output, "down from untracked", 3, "loose");
}

#[test]
fn test_track_registers_existing_branch() {
    let (_tmp, repo_path) = create_test_git_repo();
    let main_tip = branch_tip(&repo_path, "main");
    git(&repo_path, &["checkout", "-q", "-b", "feature"]);
    commit_file(&repo_path, "f.txt", "f\n", "F1");

    assert_cli_success(&run_gst(&repo_path, &["track", "main"]), "gst track main");
    let feature = branch_record(&repo_path, "feature").unwrap();
    assert_eq!(feature["last_known_parent_tip"], main_tip.as_str());

    let output = run_gst(&repo_path, &["t", "main"]);
    assert_cli_success(&output, "repeated track");
    assert_output_contains(&output, "no changes needed", "repeated track notice");

    let output = run_gst(&repo_path, &["track", "feature"]);
    assert_cli_failure(&output, "self parent", 1, "own parent");

    let output = run_gst(&repo_path, &["track", "missing"]);
    assert_cli_failure(&output, "missing parent", 1, "does not exist");

    git(&repo_path, &["checkout", "-q", "main"]);
    let output = run_gst(&repo_path, &["track", "feature"]);
    assert_cli_failure(&output, "tracking trunk", 1, "cannot be tracked");
}

#[test]
fn test_reparent_asks_unless_disabled() {
    let (_tmp, repo_path) = create_test_git_repo();
    assert_cli_success(&run_gst(&repo_path, &["new", "a"]), "gst new a");
    git(&repo_path, &["checkout", "-q", "main"]);
    assert_cli_success(&run_gst(&repo_path, &["new", "b"]), "gst new b");

    // No terminal to confirm on
    let output = run_gst(&repo_path, &["track", "a"]);
    assert_eq!(output.status.code(), Some(3));
    assert!(branch_record(&repo_path, "b").unwrap().get("parent").is_none());

    assert_cli_success(
        &run_gst(&repo_path, &["config", "set", "track.confirm_reparent", "false"]),
        "disable confirmation",
    );
    assert_cli_success(&run_gst(&repo_path, &["track", "a"]), "re-parent b onto a");
    assert_eq!(branch_record(&repo_path, "b").unwrap()["parent"], "a");

    // a cannot move on top of its own child
    git(&repo_path, &["checkout", "-q", "a"]);
    let output = run_gst(&repo_path, &["track", "b"]);
    assert_cli_failure(&output, "cyclic track", 1, "cycle");
    assert!(branch_record(&repo_path, "a").unwrap().get("parent").is_none());
}

#[test]
fn test_untrack_and_delete_reparent_children() {
    let (_tmp, repo_path) = create_test_git_repo();
    assert_cli_success(&run_gst(&repo_path, &["new", "a"]), "gst new a");
    assert_cli_success(&run_gst(&repo_path, &["new", "b", "."]), "gst new b .");
    assert_cli_success(&run_gst(&repo_path, &["new", "c", "."]), "gst new c .");

    assert_cli_success(&run_gst(&repo_path, &["untrack", "b"]), "gst untrack b");
    assert!(branch_record(&repo_path, "b").is_none());
    assert_eq!(branch_record(&repo_path, "c").unwrap()["parent"], "a");
    assert!(!git(&repo_path, &["branch", "--list", "b"]).is_empty());

    let output = run_gst(&repo_path, &["delete", "c"]);
    assert_cli_failure(&output, "delete checked out", 1, "checked out");

    git(&repo_path, &["checkout", "-q", "main"]);
    assert_cli_success(&run_gst(&repo_path, &["delete", "a"]), "gst delete a");
    assert!(git(&repo_path, &["branch", "--list", "a"]).is_empty());
    assert!(branch_record(&repo_path, "c").unwrap().get("parent").is_none());
}

#[test]
fn test_status_and_config_commands() {
    let (_tmp, repo_path) = create_test_git_repo();

    let output = run_gst(&repo_path, &["status"]);
    assert_cli_success(&output, "gst status");
    assert_output_contains(&output, "Trunk: main", "status trunk");
    assert_output_contains(&output, "No sync in progress", "status cascade");

    assert_cli_success(
        &run_gst(&repo_path, &["config", "set", "sync.prune_missing_branches", "false"]),
        "config set",
    );
    let output = run_gst(&repo_path, &["config", "get", "sync.prune_missing_branches"]);
    assert_cli_success(&output, "config get");
    assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "false");

    let output = run_gst(&repo_path, &["config", "set", "sync.nope", "1"]);
    assert_cli_failure(&output, "unknown key", 1, "Unknown config key");

    assert_cli_success(
        &run_gst(&repo_path, &["config", "unset", "sync.prune_missing_branches"]),
        "config unset",
    );
    let output = run_gst(&repo_path, &["config", "get", "sync.prune_missing_branches"]);
    assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "true");
}

#[test]
fn test_configured_trunk_is_used() {
    let (_tmp, repo_path) = create_test_git_repo();
    git(&repo_path, &["branch", "-m", "main", "develop"]);

    let output = run_gst(&repo_path, &["print"]);
    assert_cli_failure(&output, "no trunk candidate", 1, "No trunk branch found");

    assert_cli_success(
        &run_gst(&repo_path, &["config", "set", "stack.trunk", "develop"]),
        "set trunk",
    );
    assert_cli_success(&run_gst(&repo_path, &["new", "a"]), "gst new a on develop");
    assert!(branch_record(&repo_path, "a").unwrap().get("parent").is_none());
}
