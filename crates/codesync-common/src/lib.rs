//! Centralized directory structure management for codesync
//!
//! Directory layout:
//! ```text
//! codesync_data/
//! └── local/           # SQLite command store
//! ```

use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable overriding the data root.
pub const ROOT_ENV: &str = "CODESYNC_ROOT";

const DEFAULT_ROOT: &str = "codesync_data";

#[derive(Deserialize, Debug, Default)]
struct CodesyncConfig {
    data_root: Option<PathBuf>,
}

/// Get the global configuration path
fn get_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("codesync").join("config.json"))
}

/// Load the persistent root from config file
pub fn load_persistent_root() -> Option<PathBuf> {
    let path = get_config_path()?;
    if !path.exists() {
        return None;
    }

    match fs::read_to_string(&path) {
        Ok(content) => match serde_json::from_str::<CodesyncConfig>(&content) {
            Ok(config) => config.data_root,
            Err(e) => {
                warn!("Failed to parse config file at {:?}: {}", path, e);
                None
            }
        },
        Err(e) => {
            warn!("Failed to read config file at {:?}: {}", path, e);
            None
        }
    }
}

/// Data root from `CODESYNC_ROOT`, the persistent config, or the default
pub fn data_root() -> PathBuf {
    if let Ok(val) = std::env::var(ROOT_ENV) {
        return PathBuf::from(val);
    }

    if let Some(root) = load_persistent_root() {
        return root;
    }

    PathBuf::from(DEFAULT_ROOT)
}

/// Local data directory (SQLite)
pub fn local_dir_in(root: &Path) -> PathBuf {
    root.join("local")
}

/// Command database path under `root`
pub fn db_path_in(root: &Path) -> PathBuf {
    local_dir_in(root).join("commands.sqlite")
}

/// Ensure a single directory exists
pub fn ensure_dir(path: &Path) -> anyhow::Result<()> {
    if !path.exists() {
        fs::create_dir_all(path)?;
        info!("Created directory: {:?}", path);
    }
    Ok(())
}

/// Ensure a file's parent directory exists
pub fn ensure_parent(path: &Path) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        ensure_dir(parent)?;
    }
    Ok(())
}

/// Create the directory structure under `root` and return it canonicalized
pub fn init_structure_in(root: &Path) -> anyhow::Result<PathBuf> {
    ensure_dir(root)?;
    ensure_dir(&local_dir_in(root))?;

    let canonical = fs::canonicalize(root).unwrap_or_else(|_| root.to_path_buf());
    info!("codesync directory structure initialized at: {:?}", canonical);
    Ok(canonical)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_layout_under_root() {
        let root = PathBuf::from("some_root");
        assert_eq!(local_dir_in(&root), root.join("local"));
        assert!(db_path_in(&root).ends_with("local/commands.sqlite"));
    }

    #[test]
    fn test_init_structure_creates_local_dir() {
        let dir = tempdir().unwrap();
        let root = init_structure_in(&dir.path().join("codesync_data")).unwrap();
        assert!(local_dir_in(&root).is_dir());
    }

    #[test]
    fn test_ensure_parent() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("nested").join("file.db");
        ensure_parent(&file).unwrap();
        assert!(dir.path().join("nested").is_dir());
        assert!(!file.exists());
    }
}
