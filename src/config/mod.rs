//! Run configuration
//!
//! Everything the pipeline needs is gathered once into [`Settings`] at
//! startup and handed to each stage. Nothing is read from the environment
//! after that point.

pub mod project_yaml;
pub mod validation;

use std::time::Duration;

use chrono::{DateTime, TimeZone};

/// Build submission endpoint
pub const DEFAULT_BUILD_URL: &str = "https://platform.activestate.com/sv/head-chef/v2/builds";

/// GraphQL mediator endpoint used to look up artifacts
pub const DEFAULT_MEDIATOR_URL: &str = "https://platform.activestate.com/sv/mediator/api";

/// Language tag given to `state init`
pub const DEFAULT_LANGUAGE: &str = "python3@3.10.8";

/// Project configuration file written by the State Tool
pub const PROJECT_CONFIG_FILE: &str = "activestate.yaml";

/// MIME type of wheel artifacts
pub const WHEEL_MIME_TYPE: &str = "application/x-python-wheel+zip";

/// Default upload target
pub const DEFAULT_REPOSITORY: &str = "testpypi";

/// Default artifact folder inside the project folder
pub const DEFAULT_DIST_DIR: &str = "dist";

/// Polling never runs faster than this
pub const MIN_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Remote service locations
#[derive(Debug, Clone)]
pub struct Endpoints {
    pub build_url: String,
    pub mediator_url: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            build_url: DEFAULT_BUILD_URL.to_string(),
            mediator_url: DEFAULT_MEDIATOR_URL.to_string(),
        }
    }
}

impl Endpoints {
    /// Status URL for a build plan
    pub fn status_url(&self, plan_id: &str) -> String {
        format!("{}/{}", self.build_url.trim_end_matches('/'), plan_id)
    }
}

/// External tool binaries
#[derive(Debug, Clone)]
pub struct Tools {
    pub state_bin: String,
    pub twine_bin: String,
}

impl Default for Tools {
    fn default() -> Self {
        Self {
            state_bin: "state".to_string(),
            twine_bin: "twine".to_string(),
        }
    }
}

/// How the build-status loop behaves
#[derive(Debug, Clone)]
pub struct PollPolicy {
    /// Sleep between status requests
    pub interval: Duration,
    /// Upper bound on total waiting; `None` waits forever
    pub max_wait: Option<Duration>,
    /// Treat known failure states as terminal
    pub fail_on_error: bool,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: MIN_POLL_INTERVAL,
            max_wait: None,
            fail_on_error: false,
        }
    }
}

/// Package index credentials
#[derive(Clone)]
pub struct Credentials {
    pub user: String,
    pub password: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("user", &self.user)
            .field("password", &"***")
            .finish()
    }
}

/// Upload settings, present only when publishing was requested
#[derive(Debug, Clone)]
pub struct PublishSettings {
    pub repository: String,
    pub credentials: Credentials,
}

/// Settings for one run
#[derive(Debug, Clone)]
pub struct Settings {
    pub endpoints: Endpoints,
    pub tools: Tools,
    pub language: String,
    pub dist_dir_name: String,
    pub poll: PollPolicy,
    pub publish: Option<PublishSettings>,
    pub skip_host_platform: bool,
    pub verbose: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            endpoints: Endpoints::default(),
            tools: Tools::default(),
            language: DEFAULT_LANGUAGE.to_string(),
            dist_dir_name: DEFAULT_DIST_DIR.to_string(),
            poll: PollPolicy::default(),
            publish: None,
            skip_host_platform: true,
            verbose: false,
        }
    }
}

/// A freshly created remote project: `org/name<suffix>`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectHandle {
    pub org: String,
    pub name: String,
    pub suffix: String,
}

impl ProjectHandle {
    /// Create a handle whose suffix is the `HHMMSS` of `now`
    pub fn new<Tz: TimeZone>(org: &str, name: &str, now: &DateTime<Tz>) -> Self
    where
        Tz::Offset: std::fmt::Display,
    {
        Self {
            org: org.to_string(),
            name: name.to_string(),
            suffix: now.format("%H%M%S").to_string(),
        }
    }

    /// Local folder name and remote project name
    pub fn folder_name(&self) -> String {
        format!("{}{}", self.name, self.suffix)
    }

    /// Fully qualified id passed to `state init`
    pub fn id(&self) -> String {
        format!("{}/{}", self.org, self.folder_name())
    }
}

/// The package to build
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageSpec {
    pub name: String,
    pub version: String,
}

impl PackageSpec {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
        }
    }

    /// `name@version` as understood by `state install`
    pub fn requirement(&self) -> String {
        format!("{}@{}", self.name, self.version)
    }

    /// Token every wanted wheel filename contains
    pub fn root_token(&self) -> String {
        self.name.replace('-', "_")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{FixedOffset, TimeZone};

    #[test]
    fn test_project_handle_id() {
        let now = FixedOffset::east_opt(0)
            .unwrap()
            .with_ymd_and_hms(2026, 10, 19, 9, 5, 7)
            .unwrap();
        let handle = ProjectHandle::new("acme", "demo", &now);
        assert_eq!(handle.suffix, "090507");
        assert_eq!(handle.folder_name(), "demo090507");
        assert_eq!(handle.id(), "acme/demo090507");
    }

    #[test]
    fn test_package_spec() {
        let spec = PackageSpec::new("typing-extensions", "4.8.0");
        assert_eq!(spec.requirement(), "typing-extensions@4.8.0");
        assert_eq!(spec.root_token(), "typing_extensions");
    }

    #[test]
    fn test_status_url() {
        let endpoints = Endpoints {
            build_url: "https://example.test/builds/".to_string(),
            mediator_url: String::new(),
        };
        assert_eq!(endpoints.status_url("abc"), "https://example.test/builds/abc");
    }

    #[test]
    fn test_credentials_debug_hides_password() {
        let creds = Credentials {
            user: "me".to_string(),
            password: "hunter2".to_string(),
        };
        assert!(!format!("{:?}", creds).contains("hunter2"));
    }
}
