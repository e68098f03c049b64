pub mod settings;

pub use settings::{Settings, StackSettings, SyncSettings, TrackSettings, CONFIG_KEYS};

use crate::errors::{Result, StackError};
use crate::utils::atomic_file;
use config::{Config, Environment, File, FileFormat, FileSourceFile};
use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Environment variable that overrides the state file location
pub const STATE_FILE_ENV: &str = "GITSTACK_FILE";

/// Name of the per-repository config file inside the git directory
pub const REPO_CONFIG_FILE: &str = "gitstack-config.json";

/// Which config file a `gst config` change targets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigScope {
    Global,
    Repository,
}

/// Get the global configuration directory (~/.gitstack/)
pub fn get_config_dir() -> Result<PathBuf> {
    let home_dir =
        dirs::home_dir().ok_or_else(|| StackError::config("Could not find home directory"))?;
    Ok(home_dir.join(".gitstack"))
}

pub fn global_config_path() -> Result<PathBuf> {
    Ok(get_config_dir()?.join("config.json"))
}

pub fn repo_config_path(git_dir: &Path) -> PathBuf {
    git_dir.join(REPO_CONFIG_FILE)
}

pub fn config_path(scope: ConfigScope, git_dir: &Path) -> Result<PathBuf> {
    match scope {
        ConfigScope::Global => global_config_path(),
        ConfigScope::Repository => Ok(repo_config_path(git_dir)),
    }
}

/// Prefix of environment variables that override individual keys,
/// e.g. `GITSTACK_SYNC__CONFIRM=true` for `sync.confirm`
pub const ENV_PREFIX: &str = "GITSTACK";

/// Load effective settings: defaults, then the global file, then the repository file,
/// then the environment.
pub fn load_settings(git_dir: &Path) -> Result<Settings> {
    let mut builder = Config::builder();

    // Missing home directory just means there is no global layer
    if let Ok(global) = global_config_path() {
        builder = builder.add_source(json_file(&global));
    }
    let config = builder
        .add_source(json_file(&repo_config_path(git_dir)))
        .add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        )
        .build()
        .map_err(|e| StackError::config(format!("Failed to load configuration: {e}")))?;

    let mut settings: Settings = config
        .try_deserialize()
        .map_err(|e| StackError::config(format!("Invalid configuration: {e}")))?;
    settings.validate()?;

    if let Ok(state_file) = std::env::var(STATE_FILE_ENV) {
        if !state_file.trim().is_empty() {
            debug!("State file overridden by {STATE_FILE_ENV}: {state_file}");
            settings.stack.state_file = state_file;
        }
    }

    Ok(settings)
}

fn json_file(path: &Path) -> File<FileSourceFile, FileFormat> {
    File::from(path).format(FileFormat::Json).required(false)
}

/// Read one config layer as raw JSON. A missing file is an empty layer.
pub fn read_layer(path: &Path) -> Result<Value> {
    if !path.exists() {
        return Ok(Value::Object(Map::new()));
    }

    let content = fs::read_to_string(path)
        .map_err(|e| StackError::config(format!("Failed to read {}: {e}", path.display())))?;
    let value: Value = serde_json::from_str(&content)
        .map_err(|e| StackError::config(format!("Failed to parse {}: {e}", path.display())))?;

    if !value.is_object() {
        return Err(StackError::config(format!(
            "{} must contain a JSON object",
            path.display()
        )));
    }
    Ok(value)
}

/// Set a dotted key in one config file, validating the value first
pub fn set_in_file(path: &Path, key: &str, value: &str) -> Result<()> {
    let parsed = Settings::parse_value(key, value)?;
    let mut layer = read_layer(path)?;
    set_path(&mut layer, key, parsed);

    // Reject a layer that would not deserialize on the next load
    let settings: Settings = serde_json::from_value(layer.clone())
        .map_err(|e| StackError::config(format!("Invalid configuration: {e}")))?;
    settings.validate()?;

    write_layer(path, &layer)
}

/// Remove a dotted key from one config file. Returns whether it was present.
pub fn unset_in_file(path: &Path, key: &str) -> Result<bool> {
    if !CONFIG_KEYS.contains(&key) {
        return Err(StackError::config(format!("Unknown config key: {key}")));
    }

    let mut layer = read_layer(path)?;
    let removed = remove_path(&mut layer, key);
    if removed {
        write_layer(path, &layer)?;
    }
    Ok(removed)
}

fn write_layer(path: &Path, layer: &Value) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| {
            StackError::config(format!("Failed to create config directory: {e}"))
        })?;
    }
    atomic_file::write_json(path, layer)
}

fn set_path(root: &mut Value, key: &str, value: Value) {
    let mut current = root;
    let mut parts = key.split('.').peekable();
    while let Some(part) = parts.next() {
        if !current.is_object() {
            *current = Value::Object(Map::new());
        }
        let Value::Object(map) = current else {
            return;
        };
        if parts.peek().is_none() {
            map.insert(part.to_string(), value);
            return;
        }
        current = map
            .entry(part.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
    }
}

fn remove_path(root: &mut Value, key: &str) -> bool {
    let Some((section, field)) = key.split_once('.') else {
        return false;
    };
    let Some(Value::Object(map)) = root.get_mut(section) else {
        return false;
    };
    let removed = map.remove(field).is_some();
    if map.is_empty() {
        if let Value::Object(root) = root {
            root.remove(section);
        }
    }
    removed
}
