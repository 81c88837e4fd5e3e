//! JSON output renderer.
//!
//! Every document carries a `snapshot` identity so answers can be traced
//! back to the data they were computed from.

use serde_json::json;

use crate::aggregate::SnapshotStats;
use crate::models::{AnalysisSnapshot, Branch, CommitStory, MultiRepoExchange, QaExchange};
use crate::output::OutputRenderer;

/// JSON output renderer.
pub struct JsonRenderer;

impl OutputRenderer for JsonRenderer {
    fn render_analysis(&self, snapshot: &AnalysisSnapshot, stats: &SnapshotStats) -> String {
        let output = json!({
            "snapshot": snapshot.id(),
            "repository": snapshot.repository(),
            "commits": snapshot.commits(),
            "anomalies": snapshot.anomalies(),
            "stats": stats,
        });
        pretty(&output)
    }

    fn render_exchange(&self, exchange: &QaExchange) -> String {
        pretty(&json!(exchange))
    }

    fn render_multi_exchange(&self, exchange: &MultiRepoExchange) -> String {
        pretty(&json!(exchange))
    }

    fn render_story(&self, story: &CommitStory) -> String {
        pretty(&json!(story))
    }

    fn render_branches(&self, repository: &str, branches: &[Branch]) -> String {
        pretty(&json!({
            "repository": repository,
            "branches": branches,
        }))
    }
}

fn pretty(value: &serde_json::Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| "{}".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use chrono::{TimeZone, Utc};
    use pretty_assertions::assert_eq;

    use crate::aggregate::test_support::*;
    use crate::aggregate::{assemble, stats};

    fn snapshot() -> AnalysisSnapshot {
        assemble(
            repository("octo/demo"),
            "main",
            vec![
                normalized(commit_at(&"a".repeat(40), 200, "feat: add parser")),
                normalized(commit_at(&"b".repeat(40), 100, "fix: typo")),
            ],
            5,
            2,
            Utc.timestamp_opt(1_700_000_000, 0).unwrap(),
        )
        .unwrap()
    }

    #[test]
    fn render_analysis_json() {
        let snapshot = snapshot();
        let output = JsonRenderer.render_analysis(&snapshot, &stats(&snapshot));
        let parsed: serde_json::Value = serde_json::from_str(&output).unwrap();

        assert_eq!(parsed["snapshot"]["full_name"], "octo/demo");
        assert_eq!(parsed["snapshot"]["commits_limit"], 5);
        assert_eq!(parsed["commits"].as_array().unwrap().len(), 2);
        assert_eq!(parsed["commits"][0]["message"], "feat: add parser");
        assert_eq!(parsed["stats"]["commits"], 2);
    }

    #[test]
    fn render_exchange_serializes_snapshot_identity() {
        let snapshot = Arc::new(snapshot());
        let exchange = QaExchange {
            question: "What changed?".into(),
            snapshot: Arc::clone(&snapshot),
            commits_analyzed: 2,
            commits_limit: 2,
            requested_commits: 5,
            model: "gpt-x".into(),
            answer: "A parser was added.".into(),
            context_truncated: false,
            context_fingerprint: "abc".into(),
        };
        let parsed: serde_json::Value =
            serde_json::from_str(&JsonRenderer.render_exchange(&exchange)).unwrap();

        assert_eq!(parsed["answer"], "A parser was added.");
        assert_eq!(parsed["snapshot"]["branch"], "main");
        assert_eq!(parsed["commits_limit"], 2);
        assert_eq!(parsed["requested_commits"], 5);
        assert!(parsed["snapshot"].get("commits").is_none());
    }

    #[test]
    fn render_multi_exchange_lists_snapshot_identities_in_order() {
        let first = Arc::new(snapshot());
        let mut repo = repository("octo/api");
        repo.default_branch = "trunk".into();
        let second = Arc::new(
            assemble(
                repo,
                "trunk",
                vec![normalized(commit_at(&"c".repeat(40), 300, "feat: endpoint"))],
                3,
                1,
                Utc.timestamp_opt(1_700_000_000, 0).unwrap(),
            )
            .unwrap(),
        );
        let exchange = MultiRepoExchange {
            question: "How do they connect?".into(),
            snapshots: vec![first, second],
            per_repo_commits: 3,
            commits_analyzed: 3,
            model: "gpt-x".into(),
            answer: "Over REST.".into(),
            context_truncated: false,
            context_fingerprint: "abc".into(),
        };
        let parsed: serde_json::Value =
            serde_json::from_str(&JsonRenderer.render_multi_exchange(&exchange)).unwrap();

        let ids = parsed["snapshots"].as_array().unwrap();
        assert_eq!(ids.len(), 2);
        assert_eq!(ids[0]["full_name"], "octo/demo");
        assert_eq!(ids[1]["full_name"], "octo/api");
        assert_eq!(ids[1]["branch"], "trunk");
        assert_eq!(parsed["per_repo_commits"], 3);
    }

    #[test]
    fn render_empty_branches_json() {
        let output = JsonRenderer.render_branches("octo/demo", &[]);
        let parsed: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(parsed["branches"].as_array().unwrap().len(), 0);
    }
}
