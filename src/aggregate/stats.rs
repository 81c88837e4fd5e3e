//! Derived summary figures over a snapshot.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use serde::Serialize;
use strum::{Display, EnumIter, IntoEnumIterator};

use crate::models::{AnalysisSnapshot, Commit};

/// Number of files listed in [`SnapshotStats::hot_files`].
const HOT_FILES: usize = 5;

/// Conventional-commit category of a message headline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Display, EnumIter)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum CommitType {
    Feat,
    Fix,
    Docs,
    Style,
    Refactor,
    Test,
    Chore,
    Other,
}

impl CommitType {
    /// Classify by the lowercase prefix of the headline.
    pub fn of(commit: &Commit) -> Self {
        let headline = commit.headline().trim_start().to_lowercase();
        CommitType::iter()
            .filter(|t| *t != CommitType::Other)
            .find(|t| headline.starts_with(&t.to_string()))
            .unwrap_or(CommitType::Other)
    }
}

/// Per-author activity within a snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContributorStats {
    pub name: String,
    pub email: String,
    pub commits: usize,
    pub additions: u64,
    pub deletions: u64,
    pub last_commit: DateTime<Utc>,
}

/// Aggregate figures for a snapshot. Never stored on the snapshot itself.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SnapshotStats {
    pub commits: usize,
    pub total_commits: usize,
    pub additions: u64,
    pub deletions: u64,
    /// Distinct file paths touched, 0 when file changes were not fetched.
    pub files_touched: usize,
    /// By commit count descending; ties keep most-recent-first order.
    pub contributors: Vec<ContributorStats>,
    /// Non-zero categories in declaration order.
    pub commit_types: Vec<(CommitType, usize)>,
    /// Files with the most changed lines, largest first.
    pub hot_files: Vec<(String, u64)>,
    pub oldest: Option<DateTime<Utc>>,
    pub newest: Option<DateTime<Utc>>,
    pub anomalies: usize,
}

impl SnapshotStats {
    pub fn from_snapshot(snapshot: &AnalysisSnapshot) -> Self {
        let commits = snapshot.commits();

        let mut contributors: Vec<ContributorStats> = Vec::new();
        let mut by_email: HashMap<String, usize> = HashMap::new();
        for commit in commits {
            let key = contributor_key(commit);
            let idx = *by_email.entry(key).or_insert_with(|| {
                contributors.push(ContributorStats {
                    name: commit.author.name.clone(),
                    email: commit.author.email.clone(),
                    commits: 0,
                    additions: 0,
                    deletions: 0,
                    last_commit: commit.author.date,
                });
                contributors.len() - 1
            });
            let entry = &mut contributors[idx];
            entry.commits += 1;
            entry.additions = entry.additions.saturating_add(commit.stats.additions);
            entry.deletions = entry.deletions.saturating_add(commit.stats.deletions);
            entry.last_commit = entry.last_commit.max(commit.author.date);
        }
        // Stable sort keeps first-seen (most recent) order among equals.
        contributors.sort_by(|a, b| b.commits.cmp(&a.commits));

        let mut type_counts: HashMap<CommitType, usize> = HashMap::new();
        for commit in commits {
            *type_counts.entry(CommitType::of(commit)).or_default() += 1;
        }
        let commit_types = CommitType::iter()
            .filter_map(|t| type_counts.get(&t).map(|n| (t, *n)))
            .collect();

        let mut touched = HashSet::new();
        let mut churn: HashMap<&str, u64> = HashMap::new();
        for file in commits
            .iter()
            .filter_map(|c| c.file_changes.as_deref())
            .flatten()
        {
            touched.insert(file.filename.as_str());
            let lines = churn.entry(file.filename.as_str()).or_default();
            *lines = lines.saturating_add(file.changes);
        }
        let mut hot_files: Vec<(String, u64)> = churn
            .into_iter()
            .map(|(name, lines)| (name.to_string(), lines))
            .collect();
        hot_files.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        hot_files.truncate(HOT_FILES);

        Self {
            commits: commits.len(),
            total_commits: snapshot.total_commits(),
            additions: commits
                .iter()
                .fold(0u64, |acc, c| acc.saturating_add(c.stats.additions)),
            deletions: commits
                .iter()
                .fold(0u64, |acc, c| acc.saturating_add(c.stats.deletions)),
            files_touched: touched.len(),
            contributors,
            commit_types,
            hot_files,
            oldest: commits.last().map(|c| c.author.date),
            newest: commits.first().map(|c| c.author.date),
            anomalies: snapshot.anomalies().len(),
        }
    }
}

/// Group by email when present, else by name.
fn contributor_key(commit: &Commit) -> String {
    if commit.author.email.is_empty() {
        commit.author.name.clone()
    } else {
        commit.author.email.to_lowercase()
    }
}
