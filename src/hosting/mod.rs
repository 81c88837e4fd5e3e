//! Hosting-provider client abstraction.
//!
//! [`HostingProvider`] is the capability the pipeline fetches through;
//! [`github::GitHubClient`] implements it over the GitHub REST API. Clients
//! are stateless across calls and never cache: every call re-fetches.

pub mod github;
pub mod raw;

use std::future::Future;
use std::sync::LazyLock;
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;

use crate::error::AnalysisError;
use crate::models::{Branch, Repository};

pub use raw::{RawCommit, RawFileChange};

/// A page of raw commits plus the number available upstream.
#[derive(Debug, Clone, Default)]
pub struct CommitPage {
    /// Raw commits in provider order.
    pub commits: Vec<RawCommit>,
    /// Commits available on the branch upstream (at least `commits.len()`).
    pub total_available: usize,
}

/// Capability for fetching repository data from a hosting provider.
#[async_trait]
pub trait HostingProvider: Send + Sync {
    /// Fetch repository metadata, including the language breakdown.
    async fn fetch_repository(&self, full_name: &str) -> Result<Repository, AnalysisError>;

    /// Fetch up to `limit` raw commits of `branch`, newest first as the provider orders them.
    ///
    /// `None` means one page of the provider's configured page size.
    async fn fetch_commits(
        &self,
        full_name: &str,
        branch: &str,
        limit: Option<usize>,
    ) -> Result<CommitPage, AnalysisError>;

    /// Fetch the per-file changes of a single commit, in provider order.
    async fn fetch_file_changes(
        &self,
        full_name: &str,
        sha: &str,
    ) -> Result<Vec<RawFileChange>, AnalysisError>;

    /// List the branches of a repository.
    async fn fetch_branches(&self, full_name: &str) -> Result<Vec<Branch>, AnalysisError>;
}

static FULL_NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9._-]+/[A-Za-z0-9._-]+$").unwrap());

static REPO_URL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:https?://)?(?:www\.)?github\.com/([^/\s]+)/([^/\s#?]+)").unwrap()
});

static SHA_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[0-9a-fA-F]{4,64}$").unwrap());

/// Validate an `owner/name` repository identifier.
pub fn validate_full_name(full_name: &str) -> Result<(), AnalysisError> {
    let dot_segment = full_name.split('/').any(|s| s == "." || s == "..");
    if FULL_NAME_RE.is_match(full_name) && !dot_segment {
        Ok(())
    } else {
        Err(AnalysisError::validation(format!(
            "repository must be in 'owner/name' form, got '{full_name}'"
        )))
    }
}

/// Accept `owner/name` or a GitHub URL and return `owner/name`.
pub fn parse_repository(input: &str) -> Result<String, AnalysisError> {
    let input = input.trim();
    let full_name = match REPO_URL_RE.captures(input) {
        Some(caps) => {
            let name = caps[2].strip_suffix(".git").unwrap_or(&caps[2]);
            format!("{}/{name}", &caps[1])
        }
        None => input.to_string(),
    };
    validate_full_name(&full_name)?;
    Ok(full_name)
}

/// Validate a commit SHA (abbreviated or full).
pub fn validate_sha(sha: &str) -> Result<(), AnalysisError> {
    if SHA_RE.is_match(sha) {
        Ok(())
    } else {
        Err(AnalysisError::validation(format!("invalid commit sha '{sha}'")))
    }
}

/// Validate a branch name: non-empty, no whitespace or control characters.
pub fn validate_branch(branch: &str) -> Result<(), AnalysisError> {
    if branch.is_empty() || branch.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return Err(AnalysisError::validation(format!(
            "invalid branch name '{branch}'"
        )));
    }
    Ok(())
}

/// Validate an optional commit limit: when present it must be positive.
pub fn validate_limit(limit: Option<usize>) -> Result<(), AnalysisError> {
    match limit {
        Some(0) => Err(AnalysisError::validation("limit must be a positive integer")),
        _ => Ok(()),
    }
}

/// Bounded retry policy for transient provider failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt.
    pub max_retries: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            initial_backoff: Duration::from_millis(500),
            max_backoff: Duration::from_secs(8),
        }
    }
}

impl RetryPolicy {
    /// A policy that never retries.
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    /// Compute the backoff duration for a retry attempt using exponential backoff.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let backoff = self
            .initial_backoff
            .saturating_mul(2u32.saturating_pow(attempt));
        backoff.min(self.max_backoff)
    }
}

/// Whether an error is a transient failure worth retrying inside the client.
///
/// Rate limiting is excluded: it surfaces to the caller with
/// its retry-after advisory instead of being queued here.
pub fn is_transient(err: &AnalysisError) -> bool {
    matches!(err, AnalysisError::Transport(_))
}

/// Run `op`, retrying transient failures with exponential backoff.
///
/// On exhaustion the last error is returned with its kind unchanged.
pub async fn with_retries<T, F, Fut>(
    policy: &RetryPolicy,
    label: &str,
    mut op: F,
) -> Result<T, AnalysisError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, AnalysisError>>,
{
    let mut attempt = 0;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if is_transient(&e) && attempt < policy.max_retries => {
                let backoff = policy.backoff(attempt);
                tracing::debug!(
                    %label,
                    attempt = attempt + 1,
                    max = policy.max_retries,
                    backoff_ms = backoff.as_millis() as u64,
                    error = %e,
                    "retrying transient provider failure"
                );
                tokio::time::sleep(backoff).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}
