//! Remote project driver
//!
//! Drives the State Tool through the fixed mutation sequence that creates a
//! project, adds platforms and installs the package:
//!
//! ```text
//! init <id> <lang> → push -n → platforms add <tag> -n (each) → pull -n
//!   → install <pkg@ver> -n → push -n
//! ```
//!
//! Every invocation runs in the project folder via an explicit working
//! directory. A non-zero exit aborts the sequence; nothing is retried.

use std::path::PathBuf;

use anyhow::Result;
use serde::Deserialize;

use super::platforms::Platform;
use crate::config::{project_yaml, PackageSpec, ProjectHandle, PROJECT_CONFIG_FILE};
use crate::error::WheelforgeError;
use crate::exec::subprocess::{CommandResult, CommandRunner};
use crate::utils::{paths, terminal};

/// Output of `state export recipe`
#[derive(Debug, Deserialize)]
struct RecipeExport {
    recipe_id: Option<String>,
}

/// Issues project mutations through the State Tool
pub struct ProjectDriver<'a, R: CommandRunner> {
    runner: &'a R,
    state_bin: &'a str,
    project_dir: PathBuf,
}

impl<'a, R: CommandRunner> ProjectDriver<'a, R> {
    pub fn new(runner: &'a R, state_bin: &'a str, project_dir: impl Into<PathBuf>) -> Self {
        Self {
            runner,
            state_bin,
            project_dir: project_dir.into(),
        }
    }

    fn state(&self, args: &[&str]) -> Result<CommandResult> {
        let args: Vec<String> = args.iter().map(|a| a.to_string()).collect();
        self.runner
            .run_checked(self.state_bin, &args, &self.project_dir)
    }

    /// Create the project folder and clear a stale project file
    pub fn prepare_dir(&self) -> Result<()> {
        if !self.project_dir.exists() {
            terminal::print_info(&format!("Creating folder {}", self.project_dir.display()));
        }
        paths::ensure_dir(&self.project_dir)?;

        if paths::remove_if_exists(&self.project_dir.join(PROJECT_CONFIG_FILE))? {
            terminal::print_info(&format!("Removed stale {}", PROJECT_CONFIG_FILE));
        }
        Ok(())
    }

    /// Run the full mutation sequence and return the resulting commit id
    ///
    /// `host` is the platform to leave out of the platform list (the local
    /// machine), or `None` to add every requested platform. The commit id is
    /// empty when the project file cannot be parsed.
    pub fn setup(
        &self,
        handle: &ProjectHandle,
        language: &str,
        platforms: &[Platform],
        host: Option<Platform>,
        package: &PackageSpec,
    ) -> Result<String> {
        terminal::print_step("Creating project...");
        self.state(&["init", &handle.id(), language])?;

        terminal::print_step("Pushing project to platform...");
        self.state(&["push", "-n"])?;

        for platform in platforms {
            if Some(*platform) == host {
                terminal::print_info(&format!("Skipping {} (host platform)", platform));
                continue;
            }
            terminal::print_step(&format!("Adding {}...", platform));
            self.state(&["platforms", "add", platform.build_tag(), "-n"])?;
        }

        terminal::print_step("Syncing changes with platform...");
        self.state(&["pull", "-n"])?;

        terminal::print_step(&format!("Adding {} to project...", package.requirement()));
        self.state(&["install", &package.requirement(), "-n"])?;

        terminal::print_step("Pushing project to platform...");
        self.state(&["push", "-n"])?;

        terminal::print_step("Gathering commit id...");
        Ok(self.commit_id())
    }

    /// Commit id from the project file, or empty with a warning
    pub fn commit_id(&self) -> String {
        match project_yaml::read_commit_id(&self.project_dir.join(PROJECT_CONFIG_FILE)) {
            Ok(id) => id,
            Err(e) => {
                terminal::print_warning(&e.to_string());
                String::new()
            }
        }
    }

    /// Export the build recipe and return its id
    pub fn export_recipe(&self) -> Result<String> {
        terminal::print_step("Exporting recipe...");
        let result = self.state(&["export", "recipe", "-n"])?;

        let export: RecipeExport = serde_json::from_str(result.stdout.trim())
            .map_err(|_| WheelforgeError::malformed("state export recipe", "recipe_id"))?;
        export
            .recipe_id
            .ok_or_else(|| WheelforgeError::malformed("state export recipe", "recipe_id").into())
    }
}
