//! Upload of downloaded wheels with twine

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::config::PublishSettings;
use crate::error::WheelforgeError;
use crate::exec::subprocess::CommandRunner;
use crate::utils::terminal;

/// Every file directly inside `dist_dir`, sorted
pub fn collect_files(dist_dir: &Path) -> Result<Vec<PathBuf>> {
    let pattern = format!("{}/*", glob::Pattern::escape(&dist_dir.to_string_lossy()));

    let mut files = Vec::new();
    for entry in glob::glob(&pattern).context("Invalid dist folder pattern")? {
        let path = entry.context("Failed to read dist folder entry")?;
        if path.is_file() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

pub struct Publisher<'a, R: CommandRunner> {
    runner: &'a R,
    twine_bin: &'a str,
    settings: &'a PublishSettings,
}

impl<'a, R: CommandRunner> Publisher<'a, R> {
    pub fn new(runner: &'a R, twine_bin: &'a str, settings: &'a PublishSettings) -> Self {
        Self {
            runner,
            twine_bin,
            settings,
        }
    }

    /// Arguments for `twine upload`
    pub fn upload_args(&self, files: &[PathBuf]) -> Vec<String> {
        let mut args = vec![
            "upload".to_string(),
            "-r".to_string(),
            self.settings.repository.clone(),
        ];
        args.extend(files.iter().map(|f| f.to_string_lossy().to_string()));
        args.extend([
            "-u".to_string(),
            self.settings.credentials.user.clone(),
            "-p".to_string(),
            self.settings.credentials.password.clone(),
            "--non-interactive".to_string(),
        ]);
        args
    }

    /// Upload everything in `dist_dir` in one twine invocation
    pub fn publish(&self, dist_dir: &Path, cwd: &Path) -> Result<usize> {
        terminal::print_step(&format!("Uploading wheel(s) to {}...", self.settings.repository));

        let files = collect_files(dist_dir)?;
        if files.is_empty() {
            return Err(WheelforgeError::UploadFailed {
                repository: self.settings.repository.clone(),
                message: format!("no files in {}", dist_dir.display()),
            }
            .into());
        }

        let result = self
            .runner
            .run(self.twine_bin, &self.upload_args(&files), cwd)?;
        if !result.success {
            let output = if result.stderr.trim().is_empty() {
                result.stdout.trim()
            } else {
                result.stderr.trim()
            };
            return Err(WheelforgeError::UploadFailed {
                repository: self.settings.repository.clone(),
                message: format!("twine exited with code {}: {}", result.exit_code, output),
            }
            .into());
        }

        Ok(files.len())
    }
}
