//! Output renderers: terminal and JSON.

pub mod json;
pub mod terminal;

use crate::aggregate::SnapshotStats;
use crate::models::{AnalysisSnapshot, Branch, CommitStory, MultiRepoExchange, QaExchange};

/// Trait for rendering pipeline results to an output format.
pub trait OutputRenderer {
    /// Render a snapshot with its derived statistics.
    fn render_analysis(&self, snapshot: &AnalysisSnapshot, stats: &SnapshotStats) -> String;

    /// Render a question/answer exchange.
    fn render_exchange(&self, exchange: &QaExchange) -> String;

    /// Render a question answered across several repositories.
    fn render_multi_exchange(&self, exchange: &MultiRepoExchange) -> String;

    /// Render a generated commit story.
    fn render_story(&self, story: &CommitStory) -> String;

    /// Render the branch list of a repository.
    fn render_branches(&self, repository: &str, branches: &[Branch]) -> String;
}
