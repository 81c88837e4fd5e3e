//! Commit and file-change types.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Name, email, and timestamp of an author or committer.
///
/// Authorship and the time a commit was applied can differ (rebases,
/// cherry-picks), so commits carry both.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signature {
    pub name: String,
    pub email: String,
    pub date: DateTime<Utc>,
}

/// Line-count aggregate for a commit.
///
/// Construct with [`CommitStats::new`] so `total` always equals
/// `additions + deletions`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitStats {
    pub additions: u64,
    pub deletions: u64,
    pub total: u64,
}

impl CommitStats {
    pub fn new(additions: u64, deletions: u64) -> Self {
        Self {
            additions,
            deletions,
            total: additions.saturating_add(deletions),
        }
    }
}

/// How a file was touched by a commit.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum FileStatus {
    Added,
    Removed,
    Modified,
    /// Always paired with `FileChange::previous_filename`.
    Renamed,
}

/// A single file touched by a commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileChange {
    pub filename: String,
    pub status: FileStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous_filename: Option<String>,
    pub additions: u64,
    pub deletions: u64,
    /// Always `additions + deletions` after normalization.
    pub changes: u64,
    /// Unified diff body; `None` when the provider elides large diffs.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub patch: Option<String>,
}

/// A normalized commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Commit {
    pub sha: String,
    pub message: String,
    pub author: Signature,
    pub committer: Signature,
    pub url: String,
    pub stats: CommitStats,
    /// Files touched, in provider order. `None` when file changes were not fetched.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_changes: Option<Vec<FileChange>>,
}

impl Commit {
    /// First line of the commit message.
    pub fn headline(&self) -> &str {
        self.message.lines().next().unwrap_or("").trim_end()
    }

    /// Abbreviated SHA (first 7 characters).
    pub fn short_sha(&self) -> &str {
        abbreviate_sha(&self.sha)
    }

    /// Number of files touched, or 0 when file changes were not fetched.
    pub fn file_count(&self) -> usize {
        self.file_changes.as_ref().map_or(0, Vec::len)
    }
}

/// First 7 characters of a sha, cut on a char boundary.
pub fn abbreviate_sha(sha: &str) -> &str {
    let end = sha
        .char_indices()
        .nth(7)
        .map(|(i, _)| i)
        .unwrap_or(sha.len());
    &sha[..end]
}

/// A repair applied while normalizing provider data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Anomaly {
    pub sha: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    pub kind: AnomalyKind,
}

/// What was wrong with the provider record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AnomalyKind {
    /// `renamed` without a previous filename; recorded as `modified`.
    RenameWithoutPreviousFilename,
    /// Status outside the closed set; recorded as `modified`.
    UnknownStatus { raw: String },
    /// Reported commit total disagreed with additions + deletions.
    StatsMismatch { reported: u64, derived: u64 },
    /// Reported per-file changes disagreed with additions + deletions.
    ChangesMismatch { reported: u64, derived: u64 },
    /// No author or committer date was supplied.
    MissingTimestamp,
}

impl fmt::Display for Anomaly {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let short = abbreviate_sha(&self.sha);
        match &self.filename {
            Some(file) => write!(f, "{short} {file}: ")?,
            None => write!(f, "{short}: ")?,
        }
        match &self.kind {
            AnomalyKind::RenameWithoutPreviousFilename => {
                write!(f, "renamed without previous filename, treated as modified")
            }
            AnomalyKind::UnknownStatus { raw } => {
                write!(f, "unknown status '{raw}', treated as modified")
            }
            AnomalyKind::StatsMismatch { reported, derived } => {
                write!(f, "reported total {reported} != additions + deletions {derived}")
            }
            AnomalyKind::ChangesMismatch { reported, derived } => {
                write!(f, "reported changes {reported} != additions + deletions {derived}")
            }
            AnomalyKind::MissingTimestamp => write!(f, "no timestamp supplied"),
        }
    }
}
