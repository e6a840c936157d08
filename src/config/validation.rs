//! Argument validation with helpful error messages
//!
//! Everything here runs before the pipeline touches the filesystem or the
//! network, so a bad argument never leaves a half-created project behind.

use anyhow::{Context, Result};
use regex::Regex;

use crate::error::WheelforgeError;

/// Two or three dot-separated numeric components
const VERSION_PATTERN: &str = r"^\d+(\.\d+){1,2}$";

/// Validate a package version such as `2.31` or `2.31.0`
pub fn validate_version(version: &str) -> Result<()> {
    let pattern = Regex::new(VERSION_PATTERN).context("Invalid version pattern")?;
    if !pattern.is_match(version) {
        return Err(WheelforgeError::InvalidVersion {
            version: version.to_string(),
        }
        .into());
    }
    Ok(())
}

/// Validate an organization, project or package name
///
/// The name ends up inside a `org/project` id and a folder name, so it must
/// be non-empty and free of path separators and whitespace.
pub fn validate_name(argument: &str, value: &str) -> Result<()> {
    let message = if value.trim().is_empty() {
        Some("must not be empty".to_string())
    } else if value.contains(['/', '\\']) {
        Some(format!("'{}' must not contain path separators", value))
    } else if value.chars().any(char::is_whitespace) {
        Some(format!("'{}' must not contain whitespace", value))
    } else {
        None
    };

    match message {
        Some(message) => Err(WheelforgeError::InvalidArgument {
            argument: argument.to_string(),
            message,
        }
        .into()),
        None => Ok(()),
    }
}
