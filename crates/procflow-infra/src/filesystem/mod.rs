//! Data directory layout for procflow.

use std::path::{Path, PathBuf};

/// Environment variable overriding the data directory.
pub const DATA_DIR_ENV: &str = "PROCFLOW_DATA_DIR";

/// Resolve the data directory from environment or platform defaults.
///
/// Priority:
/// 1. `PROCFLOW_DATA_DIR` environment variable
/// 2. `~/.procflow`
/// 3. `.procflow` in the current directory
pub fn resolve_data_dir() -> PathBuf {
    if let Ok(dir) = std::env::var(DATA_DIR_ENV) {
        return PathBuf::from(dir);
    }

    if let Some(home) = dirs::home_dir() {
        return home.join(".procflow");
    }

    PathBuf::from(".procflow")
}

/// Create the data directory if needed and return the database file path.
pub async fn prepare_data_dir(data_dir: &Path, database_file: &str) -> std::io::Result<PathBuf> {
    tokio::fs::create_dir_all(data_dir).await?;
    Ok(data_dir.join(database_file))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_resolve_data_dir_from_env() {
        // SAFETY: no other test in this crate reads or writes this variable.
        unsafe {
            std::env::set_var(DATA_DIR_ENV, "/tmp/test-procflow");
        }
        let dir = resolve_data_dir();
        assert_eq!(dir, PathBuf::from("/tmp/test-procflow"));
        unsafe {
            std::env::remove_var(DATA_DIR_ENV);
        }
    }

    #[tokio::test]
    async fn test_prepare_data_dir_creates_nested_dirs() {
        let dir = tempdir().unwrap();
        let data_dir = dir.path().join("a").join("b");

        let db = prepare_data_dir(&data_dir, "procflow.db").await.unwrap();
        assert!(data_dir.is_dir());
        assert_eq!(db, data_dir.join("procflow.db"));
    }
}
