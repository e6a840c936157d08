//! Path utilities for wheelforge

use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};

/// Ensure a directory exists
pub fn ensure_dir(path: &Path) -> Result<()> {
    if !path.exists() {
        std::fs::create_dir_all(path)
            .with_context(|| format!("Failed to create directory: {}", path.display()))?;
    }
    Ok(())
}

/// Remove a file if it is present
pub fn remove_if_exists(path: &Path) -> Result<bool> {
    if path.is_file() {
        std::fs::remove_file(path)
            .with_context(|| format!("Failed to remove {}", path.display()))?;
        return Ok(true);
    }
    Ok(false)
}

/// Append `PROJECT_DIR=<folder>` to the file named by `GITHUB_ENV`
///
/// Returns whether anything was written. Outside GitHub Actions the variable
/// is unset (or points nowhere) and this is a no-op.
pub fn export_project_dir(folder: &str) -> Result<bool> {
    let Ok(env_file) = std::env::var("GITHUB_ENV") else {
        return Ok(false);
    };
    let env_file = Path::new(&env_file);
    if !env_file.is_file() {
        return Ok(false);
    }

    let mut file = OpenOptions::new()
        .append(true)
        .open(env_file)
        .with_context(|| format!("Failed to open {}", env_file.display()))?;
    writeln!(file, "PROJECT_DIR={}", folder)
        .with_context(|| format!("Failed to write {}", env_file.display()))?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use tempfile::TempDir;

    #[test]
    fn test_ensure_dir_is_idempotent() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("a").join("dist");
        ensure_dir(&dir).unwrap();
        ensure_dir(&dir).unwrap();
        assert!(dir.is_dir());
    }

    #[test]
    fn test_remove_if_exists() {
        let tmp = TempDir::new().unwrap();
        let file = tmp.path().join("activestate.yaml");
        assert!(!remove_if_exists(&file).unwrap());
        std::fs::write(&file, "project: x").unwrap();
        assert!(remove_if_exists(&file).unwrap());
        assert!(!file.exists());
    }

    #[test]
    #[serial]
    fn test_export_project_dir_appends() {
        let tmp = TempDir::new().unwrap();
        let env_file = tmp.path().join("github_env");
        std::fs::write(&env_file, "FOO=1\n").unwrap();

        std::env::set_var("GITHUB_ENV", &env_file);
        let written = export_project_dir("demo101500").unwrap();
        std::env::remove_var("GITHUB_ENV");

        assert!(written);
        let content = std::fs::read_to_string(&env_file).unwrap();
        assert_eq!(content, "FOO=1\nPROJECT_DIR=demo101500\n");
    }

    #[test]
    #[serial]
    fn test_export_project_dir_without_env() {
        std::env::remove_var("GITHUB_ENV");
        assert!(!export_project_dir("demo").unwrap());
    }
}
