//! Analysis snapshot: repository metadata plus a bounded commit history.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::commit::{Anomaly, Commit};
use super::repository::Repository;

/// Identity of a snapshot: (repository, branch, limit, fetch time).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct SnapshotId {
    pub full_name: String,
    pub branch: String,
    pub commits_limit: usize,
    pub fetched_at: DateTime<Utc>,
}

/// An immutable bundle of repository metadata and newest-first commits.
///
/// Only the aggregator constructs snapshots, so the ordering and length
/// invariants hold for every instance. Re-querying produces a new snapshot;
/// an existing one is never mutated. Share it with `Arc`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisSnapshot {
    repository: Repository,
    branch: String,
    commits: Vec<Commit>,
    total_commits: usize,
    commits_limit: usize,
    fetched_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    anomalies: Vec<Anomaly>,
}

impl AnalysisSnapshot {
    pub(crate) fn new(
        repository: Repository,
        branch: String,
        commits: Vec<Commit>,
        total_commits: usize,
        commits_limit: usize,
        fetched_at: DateTime<Utc>,
        anomalies: Vec<Anomaly>,
    ) -> Self {
        debug_assert!(commits.len() <= commits_limit);
        Self {
            repository,
            branch,
            commits,
            total_commits,
            commits_limit,
            fetched_at,
            anomalies,
        }
    }

    pub fn repository(&self) -> &Repository {
        &self.repository
    }

    pub fn branch(&self) -> &str {
        &self.branch
    }

    /// Commits, newest first.
    pub fn commits(&self) -> &[Commit] {
        &self.commits
    }

    /// Number of commits available upstream; may exceed `commits().len()`.
    pub fn total_commits(&self) -> usize {
        self.total_commits
    }

    /// The limit that was applied when fetching.
    pub fn commits_limit(&self) -> usize {
        self.commits_limit
    }

    pub fn fetched_at(&self) -> DateTime<Utc> {
        self.fetched_at
    }

    /// Normalization repairs recorded for the commits in this snapshot.
    pub fn anomalies(&self) -> &[Anomaly] {
        &self.anomalies
    }

    /// The most recent `n` commits (all of them if `n` exceeds the length).
    pub fn most_recent(&self, n: usize) -> &[Commit] {
        &self.commits[..n.min(self.commits.len())]
    }

    pub fn id(&self) -> SnapshotId {
        SnapshotId {
            full_name: self.repository.full_name.clone(),
            branch: self.branch.clone(),
            commits_limit: self.commits_limit,
            fetched_at: self.fetched_at,
        }
    }
}
