//! Build command implementation

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use clap::Args;

use crate::config::{
    validation, Credentials, Endpoints, PackageSpec, PollPolicy, ProjectHandle, PublishSettings,
    Settings, Tools, DEFAULT_BUILD_URL, DEFAULT_DIST_DIR, DEFAULT_LANGUAGE, DEFAULT_MEDIATOR_URL,
    DEFAULT_REPOSITORY,
};
use crate::error::{hints, WheelforgeError};
use crate::exec::subprocess::{command_exists, SystemRunner};
use crate::pipeline::platforms::resolve_platforms;
use crate::pipeline::poller::ThreadSleeper;
use crate::pipeline::service::HttpBuildService;
use crate::pipeline::{Pipeline, WheelRequest};
use crate::utils::terminal;

/// Build wheels for a package on the remote build service
#[derive(Args, Debug)]
pub struct BuildCommand {
    /// Organization that owns the new project
    pub org_name: String,

    /// Project name (a HHMMSS suffix is appended)
    pub project_name: String,

    /// Python package to build
    pub package_name: String,

    /// Package version, e.g. 2.31.0
    #[arg(value_name = "VERSION")]
    pub package_version: String,

    /// Comma separated platforms (win, lin, mac)
    pub platforms: String,

    /// Upload the downloaded wheels to the package index
    #[arg(long)]
    pub publish: bool,

    /// Also add the platform of this machine
    #[arg(long)]
    pub include_host: bool,

    /// Directory in which the project folder is created
    #[arg(long, default_value = ".")]
    pub work_dir: PathBuf,

    /// Folder, inside the project folder, that receives the wheels
    #[arg(long, default_value = DEFAULT_DIST_DIR)]
    pub dist_dir: String,

    /// Language tag for the new project
    #[arg(long, default_value = DEFAULT_LANGUAGE)]
    pub language: String,

    /// Build service endpoint
    #[arg(long, env = "WHEELFORGE_BUILD_URL", default_value = DEFAULT_BUILD_URL)]
    pub build_url: String,

    /// Artifact query endpoint
    #[arg(long, env = "WHEELFORGE_MEDIATOR_URL", default_value = DEFAULT_MEDIATOR_URL)]
    pub mediator_url: String,

    /// State Tool executable
    #[arg(long, env = "WHEELFORGE_STATE_BIN", default_value = "state")]
    pub state_bin: String,

    /// twine executable
    #[arg(long, env = "WHEELFORGE_TWINE_BIN", default_value = "twine")]
    pub twine_bin: String,

    /// Package index to upload to
    #[arg(long, default_value = DEFAULT_REPOSITORY)]
    pub repository: String,

    /// Seconds between build status checks
    #[arg(long, default_value_t = 5, value_parser = clap::value_parser!(u64).range(5..))]
    pub poll_interval: u64,

    /// Give up waiting for the build after this many seconds
    #[arg(long)]
    pub max_wait: Option<u64>,

    /// Stop polling when the build reports a failure state
    #[arg(long)]
    pub fail_on_build_error: bool,

    /// Package index user name
    #[arg(long, env = "PYPI_USER", hide_env_values = true)]
    pub pypi_user: Option<String>,

    /// Package index password or token
    #[arg(long, env = "PYPI_PASS", hide_env_values = true)]
    pub pypi_pass: Option<String>,
}

impl BuildCommand {
    /// Execute the build command
    pub fn execute(self, verbose: bool) -> Result<()> {
        validation::validate_name("organization", &self.org_name)?;
        validation::validate_name("project", &self.project_name)?;
        validation::validate_name("package", &self.package_name)?;
        let platforms = resolve_platforms(&self.platforms)?;
        validation::validate_version(&self.package_version)?;

        let settings = self.settings(verbose)?;
        self.check_tools(&settings)?;

        let request = WheelRequest {
            handle: ProjectHandle::new(&self.org_name, &self.project_name, &chrono::Local::now()),
            package: PackageSpec::new(&self.package_name, &self.package_version),
            platforms,
        };

        println!("Building wheels for {}\n", request.package.requirement());
        println!("  Project:   {}", request.handle.id());
        println!(
            "  Platforms: {}",
            request
                .platforms
                .iter()
                .map(|p| p.to_string())
                .collect::<Vec<_>>()
                .join(", ")
        );
        println!();

        let runner = SystemRunner::new(settings.verbose);
        let service = HttpBuildService::new(settings.endpoints.clone(), settings.verbose)?;
        let report = Pipeline::new(&settings, &runner, &service, &ThreadSleeper)
            .run(&request, &self.work_dir)?;

        println!();
        terminal::print_info(&format!("Commit: {}", report.commit_id));
        terminal::print_info(&format!("Build plan: {}", report.plan_id));
        terminal::print_success(&format!(
            "Downloaded {} wheel(s) into {}",
            report.downloaded.len(),
            report.project_dir.join(&settings.dist_dir_name).display()
        ));
        for path in &report.downloaded {
            println!("  • {}", path.display());
        }
        if report.published > 0 {
            terminal::print_success(&format!(
                "Uploaded {} file(s) to {}",
                report.published, self.repository
            ));
        }
        println!("\n✅ Done!");
        Ok(())
    }

    /// Gather everything the run needs into one struct
    fn settings(&self, verbose: bool) -> Result<Settings> {
        let publish = if self.publish {
            let user = self
                .pypi_user
                .clone()
                .ok_or_else(|| WheelforgeError::MissingCredentials {
                    variable: "PYPI_USER".to_string(),
                })?;
            let password = self
                .pypi_pass
                .clone()
                .ok_or_else(|| WheelforgeError::MissingCredentials {
                    variable: "PYPI_PASS".to_string(),
                })?;
            Some(PublishSettings {
                repository: self.repository.clone(),
                credentials: Credentials { user, password },
            })
        } else {
            None
        };

        Ok(Settings {
            endpoints: Endpoints {
                build_url: self.build_url.clone(),
                mediator_url: self.mediator_url.clone(),
            },
            tools: Tools {
                state_bin: self.state_bin.clone(),
                twine_bin: self.twine_bin.clone(),
            },
            language: self.language.clone(),
            dist_dir_name: self.dist_dir.clone(),
            poll: PollPolicy {
                interval: Duration::from_secs(self.poll_interval),
                max_wait: self.max_wait.map(Duration::from_secs),
                fail_on_error: self.fail_on_build_error,
            },
            publish,
            skip_host_platform: !self.include_host,
            verbose,
        })
    }

    /// Make sure the external tools are installed before touching anything
    fn check_tools(&self, settings: &Settings) -> Result<()> {
        if !command_exists(&settings.tools.state_bin) {
            return Err(WheelforgeError::missing_tool(
                &settings.tools.state_bin,
                "creating and configuring the remote project",
                hints::state_tool(),
            )
            .into());
        }

        if settings.publish.is_some() && !command_exists(&settings.tools.twine_bin) {
            return Err(WheelforgeError::missing_tool(
                &settings.tools.twine_bin,
                "uploading wheels",
                hints::twine(),
            )
            .into());
        }

        Ok(())
    }
}
