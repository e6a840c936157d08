//! Build service client
//!
//! Typed request/response shapes for the three endpoints the pipeline talks
//! to, behind the [`BuildService`] trait. Every response field is optional;
//! callers decide what an absent field means.

use std::io::Read;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Deserializer};
use serde_json::json;

use crate::config::Endpoints;

/// Response of `POST <build-url>`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BuildSubmitResponse {
    pub build_plan_id: Option<String>,
}

/// Response of `GET <build-url>/<plan-id>`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BuildStatusResponse {
    pub build_state: Option<String>,
}

/// One artifact produced by a build
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ArtifactDescriptor {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub mime_type: String,
    #[serde(default)]
    pub uri: String,
}

impl ArtifactDescriptor {
    /// Last path segment of the download URI
    pub fn file_name(&self) -> &str {
        match self.uri.rfind('/') {
            Some(pos) => &self.uri[pos + 1..],
            None => &self.uri,
        }
    }
}

/// One per-platform build in the artifact query result
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BuildEntry {
    pub platform_id: Option<String>,
    /// `None` only when the key is absent; `null` reads as an empty list
    #[serde(default, deserialize_with = "present_list")]
    pub artifacts: Option<Vec<ArtifactDescriptor>>,
}

fn present_list<'de, D, T>(deserializer: D) -> Result<Option<Vec<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<Vec<T>>::deserialize(deserializer).map(|list| Some(list.unwrap_or_default()))
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BuildCollection {
    pub builds: Option<Vec<BuildEntry>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct QueryData {
    pub builds: Option<BuildCollection>,
}

/// Response of the artifact query, `data.builds.builds[].artifacts[]`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ArtifactQueryResponse {
    pub data: Option<QueryData>,
}

impl ArtifactQueryResponse {
    /// Build entries, empty when any level is absent
    pub fn builds(&self) -> &[BuildEntry] {
        self.data
            .as_ref()
            .and_then(|d| d.builds.as_ref())
            .and_then(|b| b.builds.as_deref())
            .unwrap_or(&[])
    }

    /// Whether any build entry carries an `artifacts` field
    pub fn has_artifacts(&self) -> bool {
        self.builds().iter().any(|b| b.artifacts.is_some())
    }
}

/// GraphQL query for the builds of a commit
pub fn artifact_query(commit_id: &str) -> String {
    // JSON string escaping is valid GraphQL string syntax
    let commit = serde_json::to_string(commit_id).unwrap_or_else(|_| "\"\"".to_string());
    format!(
        r#"{{
  builds(commit_id: {commit}) {{
    ... on Builds {{
      builds {{
        ... on BuildSuccess {{
          platform_id
          artifacts {{
            name
            mime_type
            uri
          }}
        }}
      }}
    }}
  }}
}}"#
    )
}

/// Remote build service operations
pub trait BuildService {
    /// Submit a recipe for building
    fn submit_build(&self, recipe_id: &str) -> Result<BuildSubmitResponse>;

    /// Current state of a build plan
    fn build_status(&self, plan_id: &str) -> Result<BuildStatusResponse>;

    /// Builds and artifacts for a commit
    fn query_artifacts(&self, commit_id: &str) -> Result<ArtifactQueryResponse>;

    /// Open a download stream for an artifact URI
    fn fetch(&self, uri: &str) -> Result<Box<dyn Read>>;
}

/// Whole-request limit for the JSON endpoints
pub const API_TIMEOUT: Duration = Duration::from_secs(300);

/// Connection limit shared by API calls and downloads
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// HTTP implementation on blocking reqwest clients
///
/// Downloads use their own client without a whole-request timeout, since the
/// body of a large wheel is streamed for as long as it takes.
pub struct HttpBuildService {
    client: reqwest::blocking::Client,
    download_client: reqwest::blocking::Client,
    endpoints: Endpoints,
    verbose: bool,
}

impl HttpBuildService {
    pub fn new(endpoints: Endpoints, verbose: bool) -> Result<Self> {
        let client = Self::client_builder()
            .timeout(API_TIMEOUT)
            .build()
            .context("Failed to create HTTP client")?;
        let download_client = Self::client_builder()
            .timeout(None)
            .build()
            .context("Failed to create download client")?;

        Ok(Self {
            client,
            download_client,
            endpoints,
            verbose,
        })
    }

    fn client_builder() -> reqwest::blocking::ClientBuilder {
        reqwest::blocking::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .user_agent(format!("wheelforge/{}", env!("CARGO_PKG_VERSION")))
    }

    fn trace(&self, method: &str, url: &str) {
        if self.verbose {
            eprintln!("{} {}", method, url);
        }
    }

    fn check(response: reqwest::blocking::Response, url: &str) -> Result<reqwest::blocking::Response> {
        let status = response.status();
        if !status.is_success() {
            bail!("Request to {} failed: HTTP {}", url, status.as_u16());
        }
        Ok(response)
    }
}

impl BuildService for HttpBuildService {
    fn submit_build(&self, recipe_id: &str) -> Result<BuildSubmitResponse> {
        let url = &self.endpoints.build_url;
        self.trace("POST", url);

        let response = self
            .client
            .post(url)
            .json(&json!({ "recipe_id": recipe_id }))
            .send()
            .with_context(|| format!("Failed to submit build to {}", url))?;

        Self::check(response, url)?
            .json()
            .with_context(|| format!("Failed to parse build submission response from {}", url))
    }

    fn build_status(&self, plan_id: &str) -> Result<BuildStatusResponse> {
        let url = self.endpoints.status_url(plan_id);
        self.trace("GET", &url);

        let response = self
            .client
            .get(&url)
            .send()
            .with_context(|| format!("Failed to fetch build status from {}", url))?;

        Self::check(response, &url)?
            .json()
            .with_context(|| format!("Failed to parse build status from {}", url))
    }

    fn query_artifacts(&self, commit_id: &str) -> Result<ArtifactQueryResponse> {
        let url = &self.endpoints.mediator_url;
        self.trace("POST", url);

        let body = json!({
            "query": artifact_query(commit_id),
            "variables": { "commit": commit_id },
        });
        let response = self
            .client
            .post(url)
            .json(&body)
            .send()
            .with_context(|| format!("Failed to query artifacts from {}", url))?;

        Self::check(response, url)?
            .json()
            .with_context(|| format!("Failed to parse artifact query response from {}", url))
    }

    fn fetch(&self, uri: &str) -> Result<Box<dyn Read>> {
        self.trace("GET", uri);

        let response = self
            .download_client
            .get(uri)
            .send()
            .with_context(|| format!("Failed to download {}", uri))?;

        Ok(Box::new(Self::check(response, uri)?))
    }
}
