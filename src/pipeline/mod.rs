//! Remote wheel build pipeline
//!
//! One strictly sequential run per invocation:
//!
//! ```text
//! platforms → project (State Tool) → poller (build service)
//!   → artifacts (mediator) → download → publish (optional)
//! ```
//!
//! ## Modules
//!
//! - `platforms` - Platform name resolution and build tags
//! - `project` - State Tool mutation sequence and recipe export
//! - `service` - Build service endpoints and their typed responses
//! - `poller` - Build submission and status polling
//! - `artifacts` - Artifact query with bounded retry
//! - `download` - Wheel filtering, renaming and streaming
//! - `publish` - twine upload
//!
//! All file operations are scoped by explicit paths derived from the work
//! directory; the process current directory is never changed.

pub mod artifacts;
pub mod download;
pub mod platforms;
pub mod poller;
pub mod project;
pub mod publish;
pub mod service;

use std::path::{Path, PathBuf};

use anyhow::Result;

use crate::config::{PackageSpec, ProjectHandle, Settings};
use crate::exec::subprocess::CommandRunner;
use crate::utils::{paths, terminal};

use artifacts::ArtifactResolver;
use download::Downloader;
use platforms::Platform;
use poller::{BuildPoller, Sleeper};
use project::ProjectDriver;
use publish::Publisher;
use service::BuildService;

/// What to build
#[derive(Debug, Clone)]
pub struct WheelRequest {
    pub handle: ProjectHandle,
    pub package: PackageSpec,
    pub platforms: Vec<Platform>,
}

/// What a finished run produced
#[derive(Debug, Clone)]
pub struct PipelineReport {
    pub project_dir: PathBuf,
    pub commit_id: String,
    pub plan_id: String,
    pub downloaded: Vec<PathBuf>,
    pub published: usize,
}

/// Wires the stages together over injected collaborators
pub struct Pipeline<'a, R: CommandRunner, S: BuildService, Z: Sleeper> {
    settings: &'a Settings,
    runner: &'a R,
    service: &'a S,
    sleeper: &'a Z,
}

impl<'a, R: CommandRunner, S: BuildService, Z: Sleeper> Pipeline<'a, R, S, Z> {
    pub fn new(settings: &'a Settings, runner: &'a R, service: &'a S, sleeper: &'a Z) -> Self {
        Self {
            settings,
            runner,
            service,
            sleeper,
        }
    }

    /// Run every stage for `request`, creating the project folder under `work_dir`
    pub fn run(&self, request: &WheelRequest, work_dir: &Path) -> Result<PipelineReport> {
        let folder = request.handle.folder_name();
        let project_dir = work_dir.join(&folder);

        terminal::print_step("Creating project folder...");
        let driver = ProjectDriver::new(self.runner, &self.settings.tools.state_bin, &project_dir);
        driver.prepare_dir()?;

        if paths::export_project_dir(&folder)? {
            terminal::print_info(&format!("Added PROJECT_DIR={} to GITHUB_ENV", folder));
        }

        let host = if self.settings.skip_host_platform {
            Platform::host()
        } else {
            None
        };
        let commit_id = driver.setup(
            &request.handle,
            &self.settings.language,
            &request.platforms,
            host,
            &request.package,
        )?;

        let recipe_id = driver.export_recipe()?;
        let plan_id =
            BuildPoller::new(self.service, self.sleeper, &self.settings.poll).run(&recipe_id)?;

        let response = ArtifactResolver::new(self.service).resolve(&commit_id)?;

        let dist_dir = project_dir.join(&self.settings.dist_dir_name);
        let downloaded = Downloader::new(self.service, &dist_dir, request.package.root_token())
            .download_all(&response)?;
        if downloaded.is_empty() {
            terminal::print_warning("No matching wheels were downloaded");
        }

        let published = match &self.settings.publish {
            Some(publish) => Publisher::new(self.runner, &self.settings.tools.twine_bin, publish)
                .publish(&dist_dir, &project_dir)?,
            None => 0,
        };

        Ok(PipelineReport {
            project_dir,
            commit_id,
            plan_id,
            downloaded,
            published,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Credentials, PublishSettings, PROJECT_CONFIG_FILE};
    use crate::error::WheelforgeError;
    use crate::exec::subprocess::testing::FakeRunner;
    use crate::pipeline::service::testing::{query_response, FakeService};
    use chrono::{FixedOffset, TimeZone};
    use serial_test::serial;
    use std::cell::Cell;
    use std::time::Duration;
    use tempfile::TempDir;

    const COMMIT: &str = "0f3c7a52-9b1e-4c3d-8a6f-2b7e1d9c4a10";

    #[derive(Default)]
    struct CountingSleeper {
        count: Cell<u32>,
    }

    impl Sleeper for CountingSleeper {
        fn sleep(&self, duration: Duration) {
            assert!(duration >= Duration::from_secs(5));
            self.count.set(self.count.get() + 1);
        }
    }

    fn request() -> WheelRequest {
        let now = FixedOffset::east_opt(0)
            .unwrap()
            .with_ymd_and_hms(2026, 10, 19, 10, 15, 0)
            .unwrap();
        WheelRequest {
            handle: ProjectHandle::new("acme", "demo", &now),
            package: PackageSpec::new("requests", "2.31.0"),
            platforms: platforms::resolve_platforms("win,lin,mac").unwrap(),
        }
    }

    fn runner() -> FakeRunner {
        FakeRunner::new()
            .writes(
                "push -n",
                PROJECT_CONFIG_FILE,
                &format!("project: https://platform.activestate.com/acme/demo101500?commitID={}\n", COMMIT),
            )
            .reply("export recipe -n", 0, r#"{"recipe_id": "recipe-9"}"#)
    }

    fn service() -> FakeService {
        FakeService::new()
            .with_states(&[Some("building"), Some("building"), Some("build_succeeded")])
            .with_queries(vec![
                query_response(r#"{"data":{"builds":{"builds":[]}}}"#),
                query_response(
                    r#"{"data":{"builds":{"builds":[
                        {"platform_id":"w","artifacts":[
                            {"name":"requests","mime_type":"application/x-python-wheel+zip","uri":"https://dl.test/w/requests-2.31.0-py3-none-win_amd64.whl"},
                            {"name":"certifi","mime_type":"application/x-python-wheel+zip","uri":"https://dl.test/w/certifi-2023.7.22-py3-none-any.whl"}
                        ]},
                        {"platform_id":"l","artifacts":[
                            {"name":"requests","mime_type":"application/x-python-wheel+zip","uri":"https://dl.test/l/requests-2.31.0-py3-none-manylinux.whl"},
                            {"name":"requests","mime_type":"application/json","uri":"https://dl.test/l/requests-2.31.0-meta.json"}
                        ]}
                    ]}}}"#,
                ),
            ])
            .with_file("https://dl.test/w/requests-2.31.0-py3-none-win_amd64.whl", b"w")
            .with_file("https://dl.test/l/requests-2.31.0-py3-none-manylinux.whl", b"l")
    }

    fn settings() -> Settings {
        Settings {
            skip_host_platform: false,
            ..Settings::default()
        }
    }

    #[test]
    #[serial]
    fn test_end_to_end() {
        std::env::remove_var("GITHUB_ENV");
        let tmp = TempDir::new().unwrap();
        let runner = runner();
        let service = service();
        let sleeper = CountingSleeper::default();
        let settings = settings();

        let report = Pipeline::new(&settings, &runner, &service, &sleeper)
            .run(&request(), tmp.path())
            .unwrap();

        let project_dir = tmp.path().join("demo101500");
        assert_eq!(report.project_dir, project_dir);
        assert_eq!(report.commit_id, COMMIT);
        assert_eq!(report.plan_id, "plan-1");
        assert_eq!(report.published, 0);

        assert_eq!(
            runner.lines(),
            vec![
                "init acme/demo101500 python3@3.10.8",
                "push -n",
                "platforms add Windows@10.0.17134.1 -n",
                "platforms add Linux@4.18.0 -n",
                "platforms add Darwin@19.0.0 -n",
                "pull -n",
                "install requests@2.31.0 -n",
                "push -n",
                "export recipe -n",
            ]
        );
        assert!(runner.calls.borrow().iter().all(|c| c.cwd == project_dir));

        assert_eq!(*service.submitted.borrow(), vec!["recipe-9"]);
        assert_eq!(service.status_calls.borrow().len(), 3);
        assert_eq!(sleeper.count.get(), 2);
        assert_eq!(*service.query_calls.borrow(), vec![COMMIT, COMMIT]);

        let dist = project_dir.join("dist");
        assert_eq!(
            report.downloaded,
            vec![
                dist.join("requests-2.31.0-4-py3-none-win_amd64.whl"),
                dist.join("requests-2.31.0-4-py3-none-manylinux.whl"),
            ]
        );
        assert_eq!(std::fs::read_dir(&dist).unwrap().count(), 2);
    }

    #[test]
    #[serial]
    fn test_end_to_end_with_publish() {
        std::env::remove_var("GITHUB_ENV");
        let tmp = TempDir::new().unwrap();
        let runner = runner();
        let service = service();
        let sleeper = CountingSleeper::default();
        let settings = Settings {
            publish: Some(PublishSettings {
                repository: "testpypi".to_string(),
                credentials: Credentials {
                    user: "me".to_string(),
                    password: "secret".to_string(),
                },
            }),
            ..settings()
        };

        let report = Pipeline::new(&settings, &runner, &service, &sleeper)
            .run(&request(), tmp.path())
            .unwrap();

        assert_eq!(report.published, 2);
        let calls = runner.calls.borrow();
        let upload = calls.last().unwrap();
        assert_eq!(upload.program, "twine");
        assert_eq!(upload.args[0], "upload");
    }

    #[test]
    #[serial]
    fn test_command_failure_aborts_before_build() {
        std::env::remove_var("GITHUB_ENV");
        let tmp = TempDir::new().unwrap();
        let runner = runner().reply("install requests@2.31.0 -n", 1, "no such package");
        let service = service();
        let sleeper = CountingSleeper::default();
        let settings = settings();

        let err = Pipeline::new(&settings, &runner, &service, &sleeper)
            .run(&request(), tmp.path())
            .unwrap_err();

        assert!(matches!(
            err.downcast_ref::<WheelforgeError>(),
            Some(WheelforgeError::ExternalCommandFailed { .. })
        ));
        assert!(service.submitted.borrow().is_empty());
        assert!(tmp.path().join("demo101500").is_dir());
    }

    #[test]
    #[serial]
    fn test_missing_commit_downloads_nothing() {
        std::env::remove_var("GITHUB_ENV");
        let tmp = TempDir::new().unwrap();
        let runner = FakeRunner::new().reply("export recipe -n", 0, r#"{"recipe_id": "r"}"#);
        let service = service();
        let sleeper = CountingSleeper::default();
        let settings = settings();

        let report = Pipeline::new(&settings, &runner, &service, &sleeper)
            .run(&request(), tmp.path())
            .unwrap();

        assert_eq!(report.commit_id, "");
        assert!(report.downloaded.is_empty());
        assert!(service.query_calls.borrow().is_empty());
        assert!(report.project_dir.join("dist").is_dir());
    }
}
