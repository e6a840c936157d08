//! Artifact resolution for a commit
//!
//! The mediator can lag behind the build service, so the query is retried
//! a bounded number of times until a build entry carries an `artifacts`
//! field. There is no delay between attempts. Running out of attempts is
//! not fatal: the last response is returned and the downloader simply finds
//! nothing to fetch.

use anyhow::Result;

use super::service::{ArtifactQueryResponse, BuildService};
use crate::error::WheelforgeError;
use crate::utils::terminal;

/// Query attempts before giving up
pub const MAX_ATTEMPTS: u32 = 3;

pub struct ArtifactResolver<'a, S: BuildService> {
    service: &'a S,
    max_attempts: u32,
}

impl<'a, S: BuildService> ArtifactResolver<'a, S> {
    pub fn new(service: &'a S) -> Self {
        Self {
            service,
            max_attempts: MAX_ATTEMPTS,
        }
    }

    /// Look up the builds of `commit_id`
    pub fn resolve(&self, commit_id: &str) -> Result<ArtifactQueryResponse> {
        if commit_id.is_empty() {
            terminal::print_warning(
                &WheelforgeError::ArtifactsUnavailable {
                    commit: String::new(),
                    attempts: 0,
                }
                .to_string(),
            );
            return Ok(ArtifactQueryResponse::default());
        }

        let mut response = ArtifactQueryResponse::default();
        for attempt in 1..=self.max_attempts {
            terminal::print_step(&format!(
                "Gathering artifacts (attempt {}/{})...",
                attempt, self.max_attempts
            ));
            response = self.service.query_artifacts(commit_id)?;
            if response.has_artifacts() {
                return Ok(response);
            }
        }

        terminal::print_warning(
            &WheelforgeError::ArtifactsUnavailable {
                commit: commit_id.to_string(),
                attempts: self.max_attempts,
            }
            .to_string(),
        );
        Ok(response)
    }
}
