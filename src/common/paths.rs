//! Configuration, log, and scratch directory paths
//!
//! Uses the directories crate for platform-appropriate locations:
//! - Linux: `~/.config/chain-harness/`
//! - macOS: `~/Library/Application Support/chain-harness/`
//! - Windows: `%APPDATA%\chain-harness\`

use std::io;
use std::path::{Path, PathBuf};

/// Project name used for config and data directories
const PROJECT_NAME: &str = "chain-harness";

/// Environment variable overriding the config file location
pub const CONFIG_ENV: &str = "CHAIN_HARNESS_CONFIG";

/// Get the configuration directory path
pub fn config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", PROJECT_NAME)
        .map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the path to the configuration file
///
/// `CHAIN_HARNESS_CONFIG` takes precedence over the platform location.
pub fn config_path() -> Option<PathBuf> {
    if let Ok(path) = std::env::var(CONFIG_ENV) {
        return Some(PathBuf::from(path));
    }
    config_dir().map(|dir| dir.join("config.toml"))
}

/// Get the path to the harness log directory
pub fn log_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", PROJECT_NAME)
        .map(|dirs| dirs.data_dir().join("logs"))
}

/// Directory where built contract artifacts are written
pub fn artifact_dir() -> PathBuf {
    directories::ProjectDirs::from("", "", PROJECT_NAME)
        .map(|dirs| dirs.cache_dir().join("artifacts"))
        .unwrap_or_else(|| std::env::temp_dir().join(PROJECT_NAME).join("artifacts"))
}

/// Resolve `path` against `base` unless it is already absolute
pub fn resolve(base: &Path, path: &Path) -> PathBuf {
    if path.is_relative() {
        base.join(path)
    } else {
        path.to_path_buf()
    }
}

/// Ensure the parent directory of a file exists
pub fn ensure_parent(path: &Path) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_dir_is_valid() {
        let dir = config_dir();
        assert!(dir.is_some());
    }

    #[test]
    fn test_resolve_keeps_absolute_paths() {
        let base = Path::new("/scenarios");
        assert_eq!(
            resolve(base, Path::new("/tmp/node.log")),
            PathBuf::from("/tmp/node.log")
        );
        assert_eq!(
            resolve(base, Path::new("contracts/amax.token")),
            PathBuf::from("/scenarios/contracts/amax.token")
        );
    }

    #[test]
    fn test_ensure_parent_creates_missing_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("nested").join("deeper").join("node.log");
        ensure_parent(&file).unwrap();
        assert!(file.parent().unwrap().is_dir());
    }
}
