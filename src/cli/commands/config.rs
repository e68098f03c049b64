use crate::cli::output::Output;
use crate::cli::ConfigAction;
use crate::config::{self, ConfigScope, CONFIG_KEYS};
use crate::errors::{Result, StackError};
use crate::git::get_current_repository;
use std::path::{Path, PathBuf};

/// Handle configuration commands
pub fn run(action: ConfigAction) -> Result<()> {
    match action {
        ConfigAction::Get { key } => get_config_value(&key),
        ConfigAction::Set { key, value, global } => set_config_value(&key, &value, scope(global)),
        ConfigAction::Unset { key, global } => unset_config_value(&key, scope(global)),
        ConfigAction::List => list_config_values(),
    }
}

fn scope(global: bool) -> ConfigScope {
    if global {
        ConfigScope::Global
    } else {
        ConfigScope::Repository
    }
}

fn repo_git_dir() -> Result<PathBuf> {
    Ok(get_current_repository()?.git_dir().to_path_buf())
}

fn target_path(scope: ConfigScope) -> Result<PathBuf> {
    match scope {
        ConfigScope::Global => config::global_config_path(),
        ConfigScope::Repository => {
            let git_dir = repo_git_dir().map_err(|e| {
                StackError::config(format!("{e}. Use --global outside a repository"))
            })?;
            config::config_path(scope, &git_dir)
        }
    }
}

fn get_config_value(key: &str) -> Result<()> {
    let settings = config::load_settings(&repo_git_dir()?)?;
    let value = settings.get_value(key)?;
    println!("{value}");
    Ok(())
}

fn set_config_value(key: &str, value: &str, scope: ConfigScope) -> Result<()> {
    let path = target_path(scope)?;
    config::set_in_file(&path, key, value)?;
    Output::success(format!("Configuration updated: {key} = {value}"));
    describe_target(&path);

    if key == "stack.state_file" {
        Output::tip("Existing stack state is not moved. Re-track branches or move the old file yourself");
    }
    Ok(())
}

fn unset_config_value(key: &str, scope: ConfigScope) -> Result<()> {
    let path = target_path(scope)?;
    if config::unset_in_file(&path, key)? {
        Output::success(format!("Configuration removed: {key}"));
        describe_target(&path);
    } else {
        Output::info(format!("{key} is not set in {}", path.display()));
    }
    Ok(())
}

fn list_config_values() -> Result<()> {
    let settings = config::load_settings(&repo_git_dir()?)?;

    Output::section("Effective configuration");
    for key in CONFIG_KEYS {
        let value = settings.get_value(key)?;
        let shown = if value.is_empty() { "<unset>".to_string() } else { value };
        println!("  {key} = {shown}");
    }
    Ok(())
}

fn describe_target(path: &Path) {
    Output::sub_item(format!("Written to {}", path.display()));
}
