//! Question/answer exchanges bound to the snapshot they were computed from.

use std::sync::Arc;

use clap::ValueEnum;
use serde::{Serialize, Serializer};
use strum::{Display, EnumString};

use super::snapshot::AnalysisSnapshot;

/// One question/answer pair.
///
/// Holds a shared reference to its snapshot; the snapshot is never copied
/// or mutated. `commits_analyzed <= commits_limit <= snapshot.commits().len()`
/// and `commits_limit <= requested_commits`.
#[derive(Debug, Clone, Serialize)]
pub struct QaExchange {
    pub question: String,
    #[serde(serialize_with = "serialize_snapshot_id")]
    pub snapshot: Arc<AnalysisSnapshot>,
    pub commits_analyzed: usize,
    /// Commits the context was bounded to.
    pub commits_limit: usize,
    /// Commits the caller asked for; larger than `commits_limit` when the
    /// branch held fewer.
    pub requested_commits: usize,
    pub model: String,
    pub answer: String,
    /// Whether any detail was dropped to fit the context budget.
    pub context_truncated: bool,
    /// SHA-256 of the context document the answer was computed from.
    pub context_fingerprint: String,
}

/// Tone of a generated commit-history summary.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Display, EnumString, ValueEnum,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum StoryStyle {
    /// Flowing prose about what the team accomplished.
    #[default]
    Narrative,
    /// Focus on architecture, files, and implementation details.
    Technical,
    /// Short, plain-language highlights.
    Casual,
}

/// A generated summary of a snapshot's commit history.
#[derive(Debug, Clone, Serialize)]
pub struct CommitStory {
    pub style: StoryStyle,
    #[serde(serialize_with = "serialize_snapshot_id")]
    pub snapshot: Arc<AnalysisSnapshot>,
    pub commits_analyzed: usize,
    pub model: String,
    pub story: String,
}

/// One question answered over several repositories at once.
#[derive(Debug, Clone, Serialize)]
pub struct MultiRepoExchange {
    pub question: String,
    /// In the order the repositories were given.
    #[serde(serialize_with = "serialize_snapshot_ids")]
    pub snapshots: Vec<Arc<AnalysisSnapshot>>,
    /// Most recent commits taken from each repository.
    pub per_repo_commits: usize,
    /// Commits whose header made it into the context, across all repositories.
    pub commits_analyzed: usize,
    pub model: String,
    pub answer: String,
    pub context_truncated: bool,
    pub context_fingerprint: String,
}

fn serialize_snapshot_ids<S: Serializer>(
    snapshots: &[Arc<AnalysisSnapshot>],
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.collect_seq(snapshots.iter().map(|s| s.id()))
}

fn serialize_snapshot_id<S: Serializer>(
    snapshot: &Arc<AnalysisSnapshot>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    snapshot.id().serialize(serializer)
}
