//! Commit normalization.
//!
//! Turns provider-shaped [`RawCommit`]/[`RawFileChange`] records into the
//! internal [`Commit`] model. Pure: no network, no clock. Every repair of
//! inconsistent provider data is recorded as an [`Anomaly`] instead of
//! being silently absorbed.

pub mod patch;

use chrono::{DateTime, Utc};

use crate::hosting::raw::{RawCommit, RawFileChange, RawSignature};
use crate::models::{
    Anomaly, AnomalyKind, Commit, CommitStats, FileChange, FileStatus, Signature,
};

use patch::count_patch_lines;

const UNKNOWN_AUTHOR: &str = "unknown";

/// A normalized commit together with the repairs applied to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Normalized {
    pub commit: Commit,
    pub anomalies: Vec<Anomaly>,
}

/// Normalize one raw commit.
///
/// `files` overrides `raw.files` when given (the list endpoint omits files,
/// so they are usually fetched separately). With neither, `file_changes` is
/// `None`.
pub fn normalize(raw: &RawCommit, files: Option<&[RawFileChange]>) -> Normalized {
    let mut anomalies = Vec::new();
    let sha = raw.sha.clone();

    let file_changes = files
        .or(raw.files.as_deref())
        .map(|files| {
            files
                .iter()
                .map(|f| normalize_file(&sha, f, &mut anomalies))
                .collect::<Vec<_>>()
        });

    let stats = commit_stats(raw, file_changes.as_deref(), &mut anomalies);
    let (author, committer) = signatures(raw, &mut anomalies);

    if !anomalies.is_empty() {
        tracing::debug!(sha = %sha, count = anomalies.len(), "repaired provider commit data");
    }

    Normalized {
        commit: Commit {
            sha,
            message: raw.commit.message.clone(),
            author,
            committer,
            url: raw.html_url.clone().unwrap_or_default(),
            stats,
            file_changes,
        },
        anomalies,
    }
}

/// Normalize a single file entry.
pub fn normalize_file(sha: &str, raw: &RawFileChange, anomalies: &mut Vec<Anomaly>) -> FileChange {
    let mut record = |kind| {
        anomalies.push(Anomaly {
            sha: sha.to_string(),
            filename: Some(raw.filename.clone()),
            kind,
        })
    };

    let previous_filename = raw
        .previous_filename
        .clone()
        .filter(|p| !p.is_empty());

    let status = match raw.status.as_deref().map(str::parse::<FileStatus>) {
        Some(Ok(FileStatus::Renamed)) if previous_filename.is_none() => {
            record(AnomalyKind::RenameWithoutPreviousFilename);
            FileStatus::Modified
        }
        Some(Ok(status)) => status,
        Some(Err(_)) => {
            record(AnomalyKind::UnknownStatus {
                raw: raw.status.clone().unwrap_or_default(),
            });
            FileStatus::Modified
        }
        None => {
            record(AnomalyKind::UnknownStatus { raw: String::new() });
            FileStatus::Modified
        }
    };

    let (additions, deletions) = match (raw.additions, raw.deletions) {
        (Some(a), Some(d)) => (a, d),
        (a, d) => {
            let counted = raw
                .patch
                .as_deref()
                .map(count_patch_lines)
                .unwrap_or_default();
            (a.unwrap_or(counted.additions), d.unwrap_or(counted.deletions))
        }
    };

    let changes = additions.saturating_add(deletions);
    match raw.changes {
        Some(reported) if reported != changes => record(AnomalyKind::ChangesMismatch {
            reported,
            derived: changes,
        }),
        _ => {}
    }

    FileChange {
        filename: raw.filename.clone(),
        status,
        // Only renames carry a previous name.
        previous_filename: previous_filename.filter(|_| status == FileStatus::Renamed),
        additions,
        deletions,
        changes,
        patch: raw.patch.clone(),
    }
}

fn commit_stats(
    raw: &RawCommit,
    files: Option<&[FileChange]>,
    anomalies: &mut Vec<Anomaly>,
) -> CommitStats {
    let reported = raw
        .stats
        .as_ref()
        .and_then(|s| Some((s.additions?, s.deletions?, s.total)));

    let stats = match (reported, files) {
        (Some((additions, deletions, _)), _) => CommitStats::new(additions, deletions),
        (None, Some(files)) => CommitStats::new(
            files.iter().fold(0u64, |acc, f| acc.saturating_add(f.additions)),
            files.iter().fold(0u64, |acc, f| acc.saturating_add(f.deletions)),
        ),
        (None, None) => CommitStats::default(),
    };

    if let Some((_, _, Some(total))) = reported.filter(|r| r.2 != Some(stats.total)) {
        anomalies.push(Anomaly {
            sha: raw.sha.clone(),
            filename: None,
            kind: AnomalyKind::StatsMismatch {
                reported: total,
                derived: stats.total,
            },
        });
    }

    stats
}

/// Author and committer signatures, each falling back to the other.
fn signatures(raw: &RawCommit, anomalies: &mut Vec<Anomaly>) -> (Signature, Signature) {
    let author = raw.commit.author.as_ref();
    let committer = raw.commit.committer.as_ref();

    let author_date = author.and_then(|s| s.date).or(committer.and_then(|s| s.date));
    let committer_date = committer.and_then(|s| s.date).or(author_date);

    let author_date = author_date.unwrap_or_else(|| {
        anomalies.push(Anomaly {
            sha: raw.sha.clone(),
            filename: None,
            kind: AnomalyKind::MissingTimestamp,
        });
        DateTime::<Utc>::UNIX_EPOCH
    });

    (
        signature(author.or(committer), author_date),
        signature(committer.or(author), committer_date.unwrap_or(author_date)),
    )
}

fn signature(raw: Option<&RawSignature>, date: DateTime<Utc>) -> Signature {
    let name = raw
        .and_then(|s| s.name.clone())
        .filter(|n| !n.trim().is_empty())
        .unwrap_or_else(|| UNKNOWN_AUTHOR.to_string());
    let email = raw.and_then(|s| s.email.clone()).unwrap_or_default();
    Signature { name, email, date }
}
