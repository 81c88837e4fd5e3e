//! Snapshot assembly.
//!
//! Combines repository metadata and normalized commits into an immutable
//! [`AnalysisSnapshot`]: newest-first by author date, ties broken by sha,
//! truncated to the requested limit.

pub mod stats;

use std::cmp::Ordering;
use std::collections::HashSet;

use chrono::{DateTime, Utc};

use crate::error::AnalysisError;
use crate::models::{AnalysisSnapshot, Commit, Repository};
use crate::normalize::Normalized;

pub use stats::{CommitType, ContributorStats, SnapshotStats};

/// Snapshot ordering: author date descending, then sha ascending.
pub fn newest_first(a: &Commit, b: &Commit) -> Ordering {
    b.author
        .date
        .cmp(&a.author.date)
        .then_with(|| a.sha.cmp(&b.sha))
}

/// Assemble a snapshot from normalized commits.
///
/// `upstream_total` is raised to at least the number of commits kept.
/// Duplicate shas (overlapping pages) keep their first occurrence.
pub fn assemble(
    repository: Repository,
    branch: &str,
    commits: Vec<Normalized>,
    requested_limit: usize,
    upstream_total: usize,
    fetched_at: DateTime<Utc>,
) -> Result<AnalysisSnapshot, AnalysisError> {
    if requested_limit == 0 {
        return Err(AnalysisError::validation("limit must be a positive integer"));
    }

    let mut seen = HashSet::new();
    let mut commits: Vec<Normalized> = commits
        .into_iter()
        .filter(|n| seen.insert(n.commit.sha.clone()))
        .collect();

    if commits.is_empty() {
        return Err(AnalysisError::EmptyBranch {
            repository: repository.full_name,
            branch: branch.to_string(),
        });
    }

    commits.sort_by(|a, b| newest_first(&a.commit, &b.commit));
    commits.truncate(requested_limit);

    let mut kept = Vec::with_capacity(commits.len());
    let mut anomalies = Vec::new();
    for normalized in commits {
        kept.push(normalized.commit);
        anomalies.extend(normalized.anomalies);
    }

    let total = upstream_total.max(kept.len());
    tracing::debug!(
        repository = %repository.full_name,
        %branch,
        kept = kept.len(),
        total,
        anomalies = anomalies.len(),
        "assembled snapshot"
    );

    Ok(AnalysisSnapshot::new(
        repository,
        branch.to_string(),
        kept,
        total,
        requested_limit,
        fetched_at,
        anomalies,
    ))
}

/// Summary figures for a snapshot.
pub fn stats(snapshot: &AnalysisSnapshot) -> SnapshotStats {
    SnapshotStats::from_snapshot(snapshot)
}


#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;
    use crate::error::ErrorKind;
    use crate::models::{Anomaly, AnomalyKind};
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    fn now() -> DateTime<Utc> {
        Utc.timestamp_opt(1_800_000_000, 0).unwrap()
    }

    fn shas(snapshot: &AnalysisSnapshot) -> Vec<&str> {
        snapshot.commits().iter().map(|c| c.sha.as_str()).collect()
    }

    #[test]
    fn orders_newest_first_and_truncates() {
        let commits = vec![
            normalized(commit_at("c1", 100, "one")),
            normalized(commit_at("c3", 300, "three")),
            normalized(commit_at("c2", 200, "two")),
            normalized(commit_at("c5", 500, "five")),
            normalized(commit_at("c4", 400, "four")),
        ];
        let snapshot =
            assemble(repository("octo/demo"), "main", commits, 3, 5, now()).unwrap();

        assert_eq!(shas(&snapshot), vec!["c5", "c4", "c3"]);
        assert_eq!(snapshot.total_commits(), 5);
        assert_eq!(snapshot.commits_limit(), 3);
        assert_eq!(snapshot.branch(), "main");
        assert_eq!(snapshot.fetched_at(), now());
    }

    #[test]
    fn equal_dates_tie_break_on_sha() {
        let commits = vec![
            normalized(commit_at("bbb", 100, "b")),
            normalized(commit_at("aaa", 100, "a")),
            normalized(commit_at("ccc", 50, "c")),
        ];
        let snapshot =
            assemble(repository("octo/demo"), "main", commits, 10, 0, now()).unwrap();
        assert_eq!(shas(&snapshot), vec!["aaa", "bbb", "ccc"]);
    }

    #[test]
    fn total_is_at_least_kept() {
        let commits = vec![normalized(commit_at("a", 1, "a")), normalized(commit_at("b", 2, "b"))];
        let snapshot =
            assemble(repository("octo/demo"), "main", commits, 10, 0, now()).unwrap();
        assert_eq!(snapshot.total_commits(), 2);
    }

    #[test]
    fn duplicate_shas_are_dropped() {
        let commits = vec![
            normalized(commit_at("a", 1, "first")),
            normalized(commit_at("a", 1, "first again")),
        ];
        let snapshot =
            assemble(repository("octo/demo"), "main", commits, 10, 2, now()).unwrap();
        assert_eq!(snapshot.commits().len(), 1);
        assert_eq!(snapshot.commits()[0].message, "first");
    }

    #[test]
    fn empty_branch_fails() {
        let err = assemble(repository("octo/demo"), "dev", vec![], 10, 0, now()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::EmptyBranch);
        assert_eq!(err.to_string(), "branch 'dev' of octo/demo has no commits");
    }

    #[test]
    fn zero_limit_is_validation() {
        let commits = vec![normalized(commit_at("a", 1, "a"))];
        let err = assemble(repository("octo/demo"), "main", commits, 0, 1, now()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[test]
    fn anomalies_of_truncated_commits_are_dropped() {
        let anomaly = |sha: &str| Anomaly {
            sha: sha.to_string(),
            filename: None,
            kind: AnomalyKind::MissingTimestamp,
        };
        let commits = vec![
            Normalized {
                commit: commit_at("new", 200, "kept"),
                anomalies: vec![anomaly("new")],
            },
            Normalized {
                commit: commit_at("old", 100, "dropped"),
                anomalies: vec![anomaly("old")],
            },
        ];
        let snapshot =
            assemble(repository("octo/demo"), "main", commits, 1, 2, now()).unwrap();
        assert_eq!(snapshot.anomalies().len(), 1);
        assert_eq!(snapshot.anomalies()[0].sha, "new");
    }
}
