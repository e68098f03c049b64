use crate::errors::{Result, StackError};
use serde::Serialize;
use std::fs;
use std::path::Path;

/// Progress spinner used while long git operations run
pub mod spinner;

/// Atomic file operations to prevent corruption during writes
pub mod atomic_file {
    use super::*;

    /// Write JSON data to a file atomically using a temporary file + rename strategy
    pub fn write_json<T: Serialize>(path: &Path, data: &T) -> Result<()> {
        let content = serde_json::to_string_pretty(data)
            .map_err(|e| StackError::config(format!("Failed to serialize data: {e}")))?;

        write_string(path, &content)
    }

    /// Write string content to a file atomically using a temporary file + rename strategy
    pub fn write_string(path: &Path, content: &str) -> Result<()> {
        // Create temporary file in the same directory as the target
        let temp_path = temp_path_for(path);

        fs::write(&temp_path, content)
            .map_err(|e| StackError::config(format!("Failed to write temporary file: {e}")))?;

        atomic_rename(&temp_path, path)
    }

    fn temp_path_for(path: &Path) -> std::path::PathBuf {
        let mut name = path.file_name().unwrap_or_default().to_os_string();
        name.push(".tmp");
        path.with_file_name(name)
    }

    /// Platform-specific atomic rename operation
    #[cfg(windows)]
    fn atomic_rename(temp_path: &Path, final_path: &Path) -> Result<()> {
        // Windows: More robust rename with retry on failure
        const MAX_RETRIES: u32 = 3;
        const RETRY_DELAY: std::time::Duration = std::time::Duration::from_millis(100);

        let mut attempt = 1;
        loop {
            match fs::rename(temp_path, final_path) {
                Ok(()) => return Ok(()),
                Err(e) if attempt >= MAX_RETRIES => {
                    let _ = fs::remove_file(temp_path);
                    return Err(StackError::config(format!(
                        "Failed to finalize file write after {MAX_RETRIES} attempts on Windows: {e}"
                    )));
                }
                Err(_) => {
                    attempt += 1;
                    std::thread::sleep(RETRY_DELAY);
                }
            }
        }
    }

    #[cfg(not(windows))]
    fn atomic_rename(temp_path: &Path, final_path: &Path) -> Result<()> {
        fs::rename(temp_path, final_path).map_err(|e| {
            let _ = fs::remove_file(temp_path);
            StackError::config(format!("Failed to finalize file write: {e}"))
        })
    }

    #[cfg(test)]
    mod tests {
        use super::*;
        use tempfile::TempDir;

        #[test]
        fn test_write_string_replaces_content() {
            let dir = TempDir::new().unwrap();
            let target = dir.path().join("state.json");

            write_string(&target, "first").unwrap();
            write_string(&target, "second").unwrap();

            assert_eq!(fs::read_to_string(&target).unwrap(), "second");
            assert!(!dir.path().join("state.json.tmp").exists());
        }

        #[test]
        fn test_temp_path_keeps_dotfile_name() {
            let path = Path::new("/repo/.git/.gitstack");
            assert_eq!(temp_path_for(path), Path::new("/repo/.git/.gitstack.tmp"));
        }

        #[test]
        fn test_failed_write_leaves_original_untouched() {
            let dir = TempDir::new().unwrap();
            let target = dir.path().join("state.json");
            write_string(&target, "original").unwrap();

            // A directory squatting on the temp path makes the write fail
            fs::create_dir(dir.path().join("state.json.tmp")).unwrap();
            assert!(write_string(&target, "new").is_err());

            assert_eq!(fs::read_to_string(&target).unwrap(), "original");
        }
    }
}
