//! GitHub REST API client.
//!
//! Maps HTTP status codes and rate-limit headers onto [`AnalysisError`]
//! kinds, follows page-number pagination for commit and branch listings, and retries
//! transient failures (5xx, connection errors) under a bounded policy.

use std::sync::LazyLock;
use std::time::Duration;

use async_trait::async_trait;
use indexmap::IndexMap;
use regex::Regex;
use reqwest::header::{ACCEPT, HeaderMap, LINK, RETRY_AFTER};
use reqwest::{Response, StatusCode};
use serde::de::DeserializeOwned;

use crate::config::HostingConfig;
use crate::constants::{GITHUB_API_VERSION, USER_AGENT};
use crate::error::AnalysisError;
use crate::models::{Branch, Repository};

use super::raw::{RawBranch, RawCommit, RawFileChange, RawRepository};
use super::{
    CommitPage, HostingProvider, RetryPolicy, validate_branch, validate_full_name,
    validate_limit, validate_sha, with_retries,
};

/// GitHub's maximum `per_page` value.
pub const MAX_PAGE_SIZE: usize = 100;

/// Upper bound on branch listing pages (100 branches each).
const MAX_BRANCH_PAGES: usize = 50;

/// Maximum length of an API error body to include in error messages.
const ERROR_BODY_PREVIEW_LEN: usize = 300;

/// Extracts the page number of the `rel="last"` entry of a `Link` header.
static LAST_PAGE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"<[^>]*[?&]page=(\d+)[^>]*>;\s*rel="last""#).unwrap()
});

/// Stateless GitHub client. Holds configuration only; no response caching.
pub struct GitHubClient {
    http: reqwest::Client,
    api_url: String,
    token: Option<String>,
    page_size: usize,
    retry: RetryPolicy,
}

impl GitHubClient {
    /// Create a client from hosting configuration.
    pub fn new(config: &HostingConfig) -> Result<Self, AnalysisError> {
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(config.timeout_secs.max(1)))
            .build()
            .map_err(|e| AnalysisError::Transport(format!("failed to create HTTP client: {e}")))?;

        Ok(Self::with_http(config, http))
    }

    /// Create a client around an already configured `reqwest::Client`.
    pub fn with_http(config: &HostingConfig, http: reqwest::Client) -> Self {
        Self {
            http,
            api_url: config.api_url.trim_end_matches('/').to_string(),
            token: config.token.clone(),
            page_size: config.page_size.clamp(1, MAX_PAGE_SIZE),
            retry: config.retry_policy(),
        }
    }

    /// Issue a GET, retrying transport failures and 5xx responses.
    ///
    /// Non-5xx error statuses are returned as-is for the caller to classify.
    async fn get(&self, path: &str, query: &[(&str, String)]) -> Result<Response, AnalysisError> {
        let url = format!("{}{path}", self.api_url);
        let url = &url;
        let client = self;

        with_retries(&self.retry, path, move || async move {
            let mut request = client
                .http
                .get(url)
                .query(query)
                .header(ACCEPT, "application/vnd.github+json")
                .header("X-GitHub-Api-Version", GITHUB_API_VERSION);
            if let Some(ref token) = client.token {
                request = request.bearer_auth(token);
            }

            let response = request
                .send()
                .await
                .map_err(|e| AnalysisError::Transport(format!("{path}: {e}")))?;

            if response.status().is_server_error() {
                return Err(AnalysisError::Transport(format!(
                    "{path}: HTTP {}",
                    response.status()
                )));
            }
            Ok(response)
        })
        .await
    }

    /// GET and decode a JSON body, classifying error statuses.
    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
        what: &str,
    ) -> Result<T, AnalysisError> {
        let response = ensure_success(self.get(path, query).await?, what).await?;
        response
            .json::<T>()
            .await
            .map_err(|e| AnalysisError::Transport(format!("failed to decode {what}: {e}")))
    }
}

#[async_trait]
impl HostingProvider for GitHubClient {
    async fn fetch_repository(&self, full_name: &str) -> Result<Repository, AnalysisError> {
        validate_full_name(full_name)?;
        let what = format!("repository {full_name}");
        let path = format!("/repos/{full_name}");
        let languages_path = format!("{path}/languages");

        tracing::debug!(%full_name, "fetching repository metadata");
        let (raw, languages) = tokio::try_join!(
            self.get_json::<RawRepository>(&path, &[], &what),
            self.get_json::<IndexMap<String, u64>>(&languages_path, &[], &what),
        )?;

        Ok(raw.into_repository(languages))
    }

    async fn fetch_commits(
        &self,
        full_name: &str,
        branch: &str,
        limit: Option<usize>,
    ) -> Result<CommitPage, AnalysisError> {
        validate_full_name(full_name)?;
        validate_branch(branch)?;
        validate_limit(limit)?;

        let wanted = limit.unwrap_or(self.page_size);
        let per_page = wanted.min(self.page_size);
        let what = format!("branch '{branch}' of {full_name}");
        let path = format!("/repos/{full_name}/commits");

        let mut commits: Vec<RawCommit> = Vec::with_capacity(wanted);
        let mut last_page = None;
        let mut page = 1usize;

        loop {
            let query = [
                ("sha", branch.to_string()),
                ("per_page", per_page.to_string()),
                ("page", page.to_string()),
            ];
            tracing::debug!(%full_name, %branch, page, per_page, "fetching commit page");
            let response = self.get(&path, &query).await?;

            // GitHub answers 409 for a repository without any commits.
            if response.status() == StatusCode::CONFLICT {
                tracing::debug!(%full_name, "repository is empty");
                break;
            }

            let response = ensure_success(response, &what).await?;
            if page == 1 {
                last_page = parse_last_page(response.headers());
            }

            let batch: Vec<RawCommit> = response
                .json()
                .await
                .map_err(|e| AnalysisError::Transport(format!("failed to decode {what}: {e}")))?;
            let short_page = batch.len() < per_page;
            commits.extend(batch);

            if commits.len() >= wanted || short_page {
                break;
            }
            page += 1;
        }

        commits.truncate(wanted);
        let total_available = estimate_total(last_page, per_page, commits.len());

        Ok(CommitPage {
            commits,
            total_available,
        })
    }

    async fn fetch_file_changes(
        &self,
        full_name: &str,
        sha: &str,
    ) -> Result<Vec<RawFileChange>, AnalysisError> {
        validate_full_name(full_name)?;
        validate_sha(sha)?;
        let what = format!("commit {sha} of {full_name}");
        let path = format!("/repos/{full_name}/commits/{sha}");

        let detail: RawCommit = self.get_json(&path, &[], &what).await?;
        Ok(detail.files.unwrap_or_default())
    }

    async fn fetch_branches(&self, full_name: &str) -> Result<Vec<Branch>, AnalysisError> {
        validate_full_name(full_name)?;
        let what = format!("branches of {full_name}");
        let path = format!("/repos/{full_name}/branches");

        let mut branches = Vec::new();
        for page in 1..=MAX_BRANCH_PAGES {
            let query = [
                ("per_page", MAX_PAGE_SIZE.to_string()),
                ("page", page.to_string()),
            ];
            tracing::debug!(%full_name, page, "fetching branch page");
            let batch: Vec<RawBranch> = self.get_json(&path, &query, &what).await?;
            let short_page = batch.len() < MAX_PAGE_SIZE;
            branches.extend(batch.into_iter().map(Branch::from));
            if short_page {
                return Ok(branches);
            }
        }

        tracing::warn!(%full_name, listed = branches.len(), "branch listing stopped at page cap");
        Ok(branches)
    }
}

/// Pass successful responses through; turn error statuses into typed errors.
async fn ensure_success(response: Response, what: &str) -> Result<Response, AnalysisError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let headers = response.headers().clone();
    let body = response.text().await.unwrap_or_default();
    Err(classify_response(
        status,
        &headers,
        &body,
        what,
        chrono::Utc::now().timestamp(),
    ))
}

/// Map an error response onto an [`AnalysisError`] kind.
///
/// `now_epoch` is the current Unix time, used to turn `x-ratelimit-reset`
/// into a relative retry-after.
pub fn classify_response(
    status: StatusCode,
    headers: &HeaderMap,
    body: &str,
    what: &str,
    now_epoch: i64,
) -> AnalysisError {
    let message = api_message(body).unwrap_or_else(|| {
        status
            .canonical_reason()
            .unwrap_or("unknown error")
            .to_string()
    });

    match status.as_u16() {
        401 => AnalysisError::Unauthorized(format!("{what}: {message}")),
        403 | 429 if is_rate_limited(status, headers, &message) => AnalysisError::RateLimited {
            retry_after: retry_after(headers, now_epoch),
        },
        403 => AnalysisError::Unauthorized(format!("{what}: {message}")),
        404 | 422 => AnalysisError::NotFound(format!("{what}: {message}")),
        _ => AnalysisError::Transport(format!("{what}: HTTP {status}: {message}")),
    }
}

/// Whether a 403/429 response is a throttling signal rather than a permission denial.
fn is_rate_limited(status: StatusCode, headers: &HeaderMap, message: &str) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS
        || header_str(headers, "x-ratelimit-remaining") == Some("0")
        || headers.contains_key(RETRY_AFTER)
        || message.to_lowercase().contains("rate limit")
}

/// Retry-after advisory from `retry-after` seconds or the `x-ratelimit-reset` epoch.
fn retry_after(headers: &HeaderMap, now_epoch: i64) -> Option<Duration> {
    if let Some(secs) = headers
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
    {
        return Some(Duration::from_secs(secs));
    }

    let reset = header_str(headers, "x-ratelimit-reset")?.trim().parse::<i64>().ok()?;
    Some(Duration::from_secs(reset.saturating_sub(now_epoch).max(0) as u64))
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

/// Extract the `message` field of a GitHub error body.
fn api_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    let message = value.get("message")?.as_str()?;
    Some(message.chars().take(ERROR_BODY_PREVIEW_LEN).collect())
}

/// Page number of the `rel="last"` link, if the response is paginated.
pub fn parse_last_page(headers: &HeaderMap) -> Option<usize> {
    let link = headers.get(LINK)?.to_str().ok()?;
    LAST_PAGE_RE
        .captures(link)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// Lower-bound estimate of upstream commits from the last page number.
fn estimate_total(last_page: Option<usize>, per_page: usize, fetched: usize) -> usize {
    match last_page {
        Some(last) if last > 1 => ((last - 1) * per_page + 1).max(fetched),
        _ => fetched,
    }
}
