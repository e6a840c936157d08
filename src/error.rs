//! Error types and helpers for user-friendly error messages
//!
//! Every failure the pipeline can report is a variant of [`WheelforgeError`].
//! Fatal ones abort the run; `ConfigParseFailed` and `ArtifactsUnavailable`
//! are only ever printed as warnings and the run carries on degraded.

use thiserror::Error;

use crate::exec::subprocess::redact_args;

/// Custom error types with helpful context and suggestions
#[derive(Error, Debug)]
pub enum WheelforgeError {
    /// A command-line argument is malformed
    #[error("Invalid {argument}: {message}")]
    InvalidArgument { argument: String, message: String },

    /// Unknown platform token in the platform list
    #[error("Invalid platform: {token}. Valid options are {valid}.")]
    InvalidPlatform { token: String, valid: String },

    /// Version string does not look like `1.2` or `1.2.3`
    #[error("Invalid version number: {version}. Example of valid version: '1.2.3'")]
    InvalidVersion { version: String },

    /// An external tool exited with a non-zero status
    #[error("Command failed: {command}")]
    ExternalCommandFailed {
        command: String,
        exit_code: i32,
        output: String,
    },

    /// The persisted project configuration could not be read
    #[error("Failed to parse project configuration: {message}")]
    ConfigParseFailed { message: String },

    /// The artifact query never returned an `artifacts` field
    #[error("No artifacts reported for commit '{commit}' after {attempts} attempt(s)")]
    ArtifactsUnavailable { commit: String, attempts: u32 },

    /// The remote build ended in a failure state
    #[error("Remote build {plan_id} failed with state '{state}'")]
    BuildFailed { plan_id: String, state: String },

    /// The remote build did not finish within the configured limit
    #[error("Gave up waiting for build {plan_id} after {waited_secs}s")]
    PollTimeout { plan_id: String, waited_secs: u64 },

    /// A service response lacked a field the pipeline depends on
    #[error("Malformed response from {endpoint}: missing '{field}'")]
    MalformedResponse { endpoint: String, field: String },

    /// Uploading to the package index failed
    #[error("Upload to '{repository}' failed: {message}")]
    UploadFailed { repository: String, message: String },

    /// Tool/executable not found
    #[error("Missing tool: {tool}")]
    MissingTool {
        tool: String,
        required_for: String,
        hint: String,
    },

    /// Package index credentials were not supplied
    #[error("Missing package index credentials ({variable})")]
    MissingCredentials { variable: String },
}

impl WheelforgeError {
    /// Create an external command failure from the program, its args and captured output
    pub fn command_failed(
        program: &str,
        args: &[String],
        exit_code: i32,
        stdout: &str,
        stderr: &str,
    ) -> Self {
        let mut output = String::new();
        output.push_str(stdout.trim_end());
        if !stderr.trim().is_empty() {
            if !output.is_empty() {
                output.push('\n');
            }
            output.push_str(stderr.trim_end());
        }

        Self::ExternalCommandFailed {
            command: format!("{} {}", program, redact_args(args)),
            exit_code,
            output,
        }
    }

    /// Create a missing tool error
    pub fn missing_tool(
        tool: impl Into<String>,
        required_for: impl Into<String>,
        hint: impl Into<String>,
    ) -> Self {
        Self::MissingTool {
            tool: tool.into(),
            required_for: required_for.into(),
            hint: hint.into(),
        }
    }

    /// Create a malformed response error
    pub fn malformed(endpoint: impl Into<String>, field: impl Into<String>) -> Self {
        Self::MalformedResponse {
            endpoint: endpoint.into(),
            field: field.into(),
        }
    }

    /// Hint shown under the error, if any
    pub fn hint(&self) -> Option<String> {
        match self {
            Self::InvalidPlatform { .. } => Some(hints::platforms().to_string()),
            Self::InvalidVersion { .. } => {
                Some("Use two or three numeric components, e.g. '2.31' or '2.31.0'".to_string())
            }
            Self::MissingTool {
                hint, required_for, ..
            } => Some(format!("Required for {}.\n{}", required_for, hint)),
            Self::MissingCredentials { .. } => Some(hints::credentials().to_string()),
            Self::BuildFailed { .. } => {
                Some("Inspect the build log for the project on the platform dashboard".to_string())
            }
            Self::PollTimeout { .. } => Some(
                "The build may still finish remotely; raise --max-wait or drop it to wait indefinitely"
                    .to_string(),
            ),
            _ => None,
        }
    }

    /// Display error with formatting and hints
    pub fn display_with_hints(&self) {
        use console::style;

        eprintln!("\n{} {}", style("ERROR:").red().bold(), self);

        if let Self::ExternalCommandFailed {
            exit_code, output, ..
        } = self
        {
            eprintln!("\n{} exit code {}", style("STATUS:").cyan().bold(), exit_code);
            if !output.is_empty() {
                eprintln!("\n{}", style("OUTPUT:").cyan().bold());
                for line in output.lines() {
                    eprintln!("  {}", line);
                }
            }
        }

        if let Some(h) = self.hint() {
            eprintln!("\n{} {}", style("HINT:").yellow().bold(), h);
        }

        eprintln!();
    }
}

/// Common error hints
pub mod hints {
    /// Get hint for a missing State Tool
    pub fn state_tool() -> &'static str {
        "Install the State Tool and make sure `state` is on your PATH:\n\
         • https://docs.activestate.com/platform/state/install/\n\
         • Or point --state-bin / WHEELFORGE_STATE_BIN at the binary"
    }

    /// Get hint for a missing twine
    pub fn twine() -> &'static str {
        "Install twine into the active Python environment:\n\
         • pip install twine\n\
         • Or point --twine-bin / WHEELFORGE_TWINE_BIN at the binary"
    }

    /// Get hint for the accepted platform names
    pub fn platforms() -> &'static str {
        "Pass a comma separated list such as 'win,lin,mac'.\n\
         Run `wheelforge platforms` to see every accepted name."
    }

    /// Get hint for upload credentials
    pub fn credentials() -> &'static str {
        "Set PYPI_USER and PYPI_PASS in the environment or in a .env file,\n\
         or pass --pypi-user / --pypi-pass."
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_failed_joins_output() {
        let err = WheelforgeError::command_failed(
            "state",
            &["push".to_string(), "-n".to_string()],
            1,
            "partial\n",
            "boom\n",
        );

        match &err {
            WheelforgeError::ExternalCommandFailed {
                command,
                exit_code,
                output,
            } => {
                assert_eq!(command, "state push -n");
                assert_eq!(*exit_code, 1);
                assert_eq!(output, "partial\nboom");
            }
            other => panic!("unexpected variant: {:?}", other),
        }
        assert_eq!(err.to_string(), "Command failed: state push -n");
    }

    #[test]
    fn test_invalid_platform_names_token() {
        let err = WheelforgeError::InvalidPlatform {
            token: "bsd".to_string(),
            valid: "windows, linux, mac".to_string(),
        };
        assert!(err.to_string().contains("bsd"));
        assert!(err.to_string().contains("windows, linux, mac"));
        assert!(err.hint().is_some());
    }
}
