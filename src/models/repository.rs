//! Repository metadata types.

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// The account that owns a repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Owner {
    pub login: String,
    /// Account type as reported by the provider (`User`, `Organization`, ...).
    #[serde(rename = "type")]
    pub owner_type: String,
    pub avatar_url: String,
    pub url: String,
}

/// Repository metadata as fetched from the hosting provider.
///
/// Immutable once fetched for a snapshot; refreshed only by re-fetching.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Repository {
    pub name: String,
    /// `owner/name`.
    pub full_name: String,
    pub description: Option<String>,
    /// Browser URL.
    pub url: String,
    pub clone_url: String,
    pub ssh_url: String,
    /// Primary language as reported by the provider.
    pub language: Option<String>,
    /// Language → byte count, in provider order (largest first on GitHub).
    pub languages: IndexMap<String, u64>,
    pub stars: u64,
    pub forks: u64,
    pub watchers: u64,
    pub open_issues: u64,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    pub pushed_at: Option<DateTime<Utc>>,
    pub default_branch: String,
    pub is_private: bool,
    pub owner: Owner,
}

impl Repository {
    /// Primary language, falling back to the language with the most bytes.
    pub fn primary_language(&self) -> Option<&str> {
        self.language.as_deref().or_else(|| {
            self.languages
                .iter()
                .max_by(|a, b| a.1.cmp(b.1).then_with(|| b.0.cmp(a.0)))
                .map(|(name, _)| name.as_str())
        })
    }

    /// Share of each language in percent, in the order of `languages`.
    pub fn language_shares(&self) -> Vec<(String, f64)> {
        let total = self
            .languages
            .values()
            .fold(0u64, |acc, bytes| acc.saturating_add(*bytes));
        if total == 0 {
            return Vec::new();
        }
        self.languages
            .iter()
            .map(|(name, bytes)| (name.clone(), *bytes as f64 * 100.0 / total as f64))
            .collect()
    }
}

/// A branch listed by the hosting provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Branch {
    pub name: String,
    pub protected: bool,
    /// SHA of the branch head commit, when reported.
    pub head_sha: Option<String>,
}
