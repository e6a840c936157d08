//! Subprocess execution in an explicit working directory

use std::path::Path;
use std::process::{Command, ExitStatus};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};

use crate::error::WheelforgeError;

/// Result of a subprocess execution
#[derive(Debug, Clone)]
pub struct CommandResult {
    /// Whether the command succeeded (exit code 0)
    pub success: bool,

    /// Process exit code
    pub exit_code: i32,

    /// Captured standard output
    pub stdout: String,

    /// Captured standard error
    pub stderr: String,

    /// Execution duration
    pub duration: Duration,
}

impl CommandResult {
    /// Create a CommandResult from an exit status
    pub fn from_status(status: ExitStatus, stdout: String, stderr: String, duration: Duration) -> Self {
        let exit_code = status.code().unwrap_or(-1);
        Self {
            success: status.success(),
            exit_code,
            stdout,
            stderr,
            duration,
        }
    }
}

/// Something that can run an external program and capture its output
///
/// The working directory is always passed explicitly; nothing here touches
/// the process-wide current directory.
pub trait CommandRunner {
    fn run(&self, program: &str, args: &[String], cwd: &Path) -> Result<CommandResult>;

    /// Run and turn a non-zero exit into [`WheelforgeError::ExternalCommandFailed`]
    fn run_checked(&self, program: &str, args: &[String], cwd: &Path) -> Result<CommandResult> {
        let result = self.run(program, args, cwd)?;
        if !result.success {
            return Err(WheelforgeError::command_failed(
                program,
                args,
                result.exit_code,
                &result.stdout,
                &result.stderr,
            )
            .into());
        }
        Ok(result)
    }
}

/// Runs real processes, capturing stdout and stderr
#[derive(Debug, Clone, Default)]
pub struct SystemRunner {
    verbose: bool,
}

impl SystemRunner {
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }
}

impl CommandRunner for SystemRunner {
    fn run(&self, program: &str, args: &[String], cwd: &Path) -> Result<CommandResult> {
        if self.verbose {
            eprintln!("Executing: {} {} (in {})", program, redact_args(args), cwd.display());
        }

        let start = Instant::now();
        let output = Command::new(program)
            .args(args)
            .current_dir(cwd)
            .output()
            .with_context(|| format!("Failed to execute {}", program))?;

        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();
        let result = CommandResult::from_status(output.status, stdout, stderr, start.elapsed());

        if self.verbose {
            eprintln!(
                "Finished {} in {:.1?} (exit code {})",
                program, result.duration, result.exit_code
            );
        }
        Ok(result)
    }
}

/// Join args for display, masking the value after a password flag
pub fn redact_args(args: &[String]) -> String {
    let mut shown = Vec::with_capacity(args.len());
    let mut mask_next = false;
    for arg in args {
        if mask_next {
            shown.push("***");
            mask_next = false;
            continue;
        }
        mask_next = matches!(arg.as_str(), "-p" | "--password");
        shown.push(arg.as_str());
    }
    shown.join(" ")
}

/// Check if a command exists in PATH
pub fn command_exists(program: &str) -> bool {
    which::which(program).is_ok()
}
