//! Reading the commit id out of `activestate.yaml`
//!
//! After `state push` the `project` field holds a URL that ends in the
//! commit id, e.g. `https://platform.activestate.com/acme/demo?commitID=<uuid>`.

use std::path::Path;

use serde::Deserialize;

use crate::error::WheelforgeError;

/// Length of a commit id (a hyphenated UUID)
pub const COMMIT_ID_LEN: usize = 36;

#[derive(Debug, Deserialize)]
struct ProjectFile {
    project: Option<String>,
}

/// Trailing commit id of a project URL
///
/// Shorter values are returned whole.
pub fn trailing_commit_id(project: &str) -> String {
    let count = project.chars().count();
    project
        .chars()
        .skip(count.saturating_sub(COMMIT_ID_LEN))
        .collect()
}

/// Parse the project document and extract its commit id
pub fn parse_commit_id(content: &str) -> Result<String, WheelforgeError> {
    let file: ProjectFile =
        serde_yaml::from_str(content).map_err(|e| WheelforgeError::ConfigParseFailed {
            message: e.to_string(),
        })?;

    let project = file.project.ok_or_else(|| WheelforgeError::ConfigParseFailed {
        message: "no 'project' field".to_string(),
    })?;

    Ok(trailing_commit_id(&project))
}

/// Read and parse the project file at `path`
pub fn read_commit_id(path: &Path) -> Result<String, WheelforgeError> {
    let content =
        std::fs::read_to_string(path).map_err(|e| WheelforgeError::ConfigParseFailed {
            message: format!("{}: {}", path.display(), e),
        })?;
    parse_commit_id(&content)
}
