use crate::errors::{Result, StackError};
use crate::git::VersionControl;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Every key `gst config` understands
pub const CONFIG_KEYS: &[&str] = &[
    "stack.trunk",
    "stack.trunk_candidates",
    "stack.state_file",
    "sync.return_to_original_branch",
    "sync.prune_missing_branches",
    "sync.confirm",
    "track.confirm_reparent",
];

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub stack: StackSettings,
    pub sync: SyncSettings,
    pub track: TrackSettings,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StackSettings {
    /// Explicit trunk branch, overrides candidate detection
    pub trunk: Option<String>,
    /// Branches tried in order when no trunk is configured
    pub trunk_candidates: Vec<String>,
    /// State file name, relative to the git directory
    pub state_file: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncSettings {
    pub return_to_original_branch: bool,
    pub prune_missing_branches: bool,
    /// Ask before each rebase, after showing the commits it will replay
    pub confirm: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackSettings {
    pub confirm_reparent: bool,
}

impl Default for StackSettings {
    fn default() -> Self {
        Self {
            trunk: None,
            trunk_candidates: vec!["main".to_string(), "master".to_string()],
            state_file: ".gitstack".to_string(),
        }
    }
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            return_to_original_branch: true,
            prune_missing_branches: true,
            confirm: false,
        }
    }
}

impl Default for TrackSettings {
    fn default() -> Self {
        Self {
            confirm_reparent: true,
        }
    }
}

impl Settings {
    /// Get a configuration value by key
    pub fn get_value(&self, key: &str) -> Result<String> {
        let value = match key {
            "stack.trunk" => self.stack.trunk.clone().unwrap_or_default(),
            "stack.trunk_candidates" => self.stack.trunk_candidates.join(","),
            "stack.state_file" => self.stack.state_file.clone(),
            "sync.return_to_original_branch" => self.sync.return_to_original_branch.to_string(),
            "sync.prune_missing_branches" => self.sync.prune_missing_branches.to_string(),
            "sync.confirm" => self.sync.confirm.to_string(),
            "track.confirm_reparent" => self.track.confirm_reparent.to_string(),
            _ => return Err(StackError::config(format!("Unknown config key: {key}"))),
        };
        Ok(value)
    }

    /// Parse a user-supplied value for `key` into its JSON form
    pub fn parse_value(key: &str, value: &str) -> Result<Value> {
        let parse_bool = |value: &str| {
            value
                .parse::<bool>()
                .map(Value::Bool)
                .map_err(|_| StackError::config(format!("Invalid boolean value: {value}")))
        };

        match key {
            "stack.trunk" | "stack.state_file" => {
                if value.trim().is_empty() {
                    return Err(StackError::config(format!("{key} cannot be empty")));
                }
                Ok(Value::String(value.trim().to_string()))
            }
            "stack.trunk_candidates" => {
                let candidates: Vec<Value> = value
                    .split(',')
                    .map(str::trim)
                    .filter(|candidate| !candidate.is_empty())
                    .map(|candidate| Value::String(candidate.to_string()))
                    .collect();
                if candidates.is_empty() {
                    return Err(StackError::config("At least one trunk candidate is required"));
                }
                Ok(Value::Array(candidates))
            }
            "sync.return_to_original_branch"
            | "sync.prune_missing_branches"
            | "sync.confirm"
            | "track.confirm_reparent" => parse_bool(value),
            _ => Err(StackError::config(format!("Unknown config key: {key}"))),
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.stack.trunk.is_none() && self.stack.trunk_candidates.is_empty() {
            return Err(StackError::config(
                "No trunk configured and no trunk candidates to try",
            ));
        }

        let state_file = std::path::Path::new(&self.stack.state_file);
        if self.stack.state_file.is_empty() || state_file.is_absolute() {
            return Err(StackError::config(format!(
                "stack.state_file must be a relative file name, got '{}'",
                self.stack.state_file
            )));
        }

        Ok(())
    }

    /// Trunk branch for this repository
    pub fn resolve_trunk<V: VersionControl + ?Sized>(&self, vcs: &V) -> Result<String> {
        if let Some(trunk) = &self.stack.trunk {
            if vcs.branch_exists(trunk) {
                return Ok(trunk.clone());
            }
            return Err(StackError::config(format!(
                "Configured trunk '{trunk}' does not exist"
            )));
        }

        self.stack
            .trunk_candidates
            .iter()
            .find(|candidate| vcs.branch_exists(candidate))
            .cloned()
            .ok_or_else(|| {
                StackError::config(format!(
                    "No trunk branch found (tried {}). Set one with `gst config set stack.trunk <branch>`",
                    self.stack.trunk_candidates.join(", ")
                ))
            })
    }
}
