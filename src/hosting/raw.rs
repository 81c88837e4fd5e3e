//! Provider-shaped records as returned by the GitHub REST API.
//!
//! Every field is optional or defaulted: providers drift, elide large
//! payloads, and omit stats on list endpoints. Nothing downstream of
//! [`crate::normalize`] sees these types.

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::models::{Branch, Owner, Repository};

/// A commit as listed by `GET /repos/{owner}/{repo}/commits`
/// or returned by `GET /repos/{owner}/{repo}/commits/{sha}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawCommit {
    pub sha: String,
    pub html_url: Option<String>,
    pub commit: RawCommitDetail,
    /// Present only on the single-commit endpoint.
    pub stats: Option<RawStats>,
    /// Present only on the single-commit endpoint.
    pub files: Option<Vec<RawFileChange>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawCommitDetail {
    pub message: String,
    pub author: Option<RawSignature>,
    pub committer: Option<RawSignature>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawSignature {
    pub name: Option<String>,
    pub email: Option<String>,
    pub date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawStats {
    pub additions: Option<u64>,
    pub deletions: Option<u64>,
    pub total: Option<u64>,
}

/// A file entry of a commit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawFileChange {
    pub filename: String,
    /// `added`, `removed`, `modified`, `renamed`, `copied`, `changed`, `unchanged`.
    pub status: Option<String>,
    pub additions: Option<u64>,
    pub deletions: Option<u64>,
    pub changes: Option<u64>,
    pub patch: Option<String>,
    pub previous_filename: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawOwner {
    pub login: String,
    #[serde(rename = "type")]
    pub owner_type: Option<String>,
    pub avatar_url: Option<String>,
    pub html_url: Option<String>,
}

/// `GET /repos/{owner}/{repo}`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawRepository {
    pub name: String,
    pub full_name: String,
    pub description: Option<String>,
    pub html_url: Option<String>,
    pub clone_url: Option<String>,
    pub ssh_url: Option<String>,
    pub language: Option<String>,
    pub stargazers_count: u64,
    pub forks_count: u64,
    pub watchers_count: u64,
    pub open_issues_count: u64,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    pub pushed_at: Option<DateTime<Utc>>,
    pub default_branch: Option<String>,
    pub private: bool,
    pub owner: RawOwner,
}

impl RawRepository {
    /// Map into the internal model, attaching the separately fetched language breakdown.
    pub fn into_repository(self, languages: IndexMap<String, u64>) -> Repository {
        let url = self
            .html_url
            .unwrap_or_else(|| format!("https://github.com/{}", self.full_name));
        let clone_url = self
            .clone_url
            .unwrap_or_else(|| format!("{url}.git"));
        let ssh_url = self
            .ssh_url
            .unwrap_or_else(|| format!("git@github.com:{}.git", self.full_name));
        Repository {
            name: self.name,
            full_name: self.full_name,
            description: self.description.filter(|d| !d.trim().is_empty()),
            url,
            clone_url,
            ssh_url,
            language: self.language,
            languages,
            stars: self.stargazers_count,
            forks: self.forks_count,
            watchers: self.watchers_count,
            open_issues: self.open_issues_count,
            created_at: self.created_at,
            updated_at: self.updated_at,
            pushed_at: self.pushed_at,
            default_branch: self.default_branch.unwrap_or_else(|| "main".to_string()),
            is_private: self.private,
            owner: Owner {
                owner_type: self.owner.owner_type.unwrap_or_else(|| "User".to_string()),
                avatar_url: self.owner.avatar_url.unwrap_or_default(),
                url: self
                    .owner
                    .html_url
                    .unwrap_or_else(|| format!("https://github.com/{}", self.owner.login)),
                login: self.owner.login,
            },
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawBranchCommit {
    pub sha: Option<String>,
}

/// `GET /repos/{owner}/{repo}/branches`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawBranch {
    pub name: String,
    pub protected: bool,
    pub commit: RawBranchCommit,
}

impl From<RawBranch> for Branch {
    fn from(raw: RawBranch) -> Self {
        Branch {
            name: raw.name,
            protected: raw.protected,
            head_sha: raw.commit.sha,
        }
    }
}
