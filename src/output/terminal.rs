//! Terminal renderer: styled flowing text, no tables.

use colored::Colorize;

use crate::aggregate::SnapshotStats;
use crate::models::{
    AnalysisSnapshot, Branch, Commit, CommitStory, MultiRepoExchange, QaExchange, abbreviate_sha,
};
use crate::output::OutputRenderer;

const RULE: &str = "───────────────────────────────────";

/// Terminal output renderer with colored, flowing text.
pub struct TerminalRenderer;

impl OutputRenderer for TerminalRenderer {
    fn render_analysis(&self, snapshot: &AnalysisSnapshot, stats: &SnapshotStats) -> String {
        let repo = snapshot.repository();
        let mut output = String::new();

        output.push_str(&format!(
            " {}  {}\n",
            repo.full_name.bold(),
            repo.description.as_deref().unwrap_or("").dimmed()
        ));
        output.push_str(&format!(
            "   {} {} · {} of {} commits · ★ {} · forks {} · issues {}\n",
            "branch".dimmed(),
            snapshot.branch().cyan(),
            stats.commits,
            stats.total_commits,
            repo.stars,
            repo.forks,
            repo.open_issues,
        ));
        let shares = repo.language_shares();
        if !shares.is_empty() {
            let langs: Vec<String> = shares
                .iter()
                .map(|(name, pct)| format!("{name} {pct:.1}%"))
                .collect();
            output.push_str(&format!("   {} {}\n", "languages".dimmed(), langs.join(", ")));
        }
        output.push('\n');

        for commit in snapshot.commits() {
            render_commit(&mut output, commit);
        }

        output.push_str(&format!("{}\n", RULE.dimmed()));
        output.push_str(&format!(
            " {} lines: {} {}\n",
            stats.additions.saturating_add(stats.deletions).to_string().bold(),
            format!("+{}", stats.additions).green(),
            format!("-{}", stats.deletions).red(),
        ));
        if stats.files_touched > 0 {
            output.push_str(&format!(" {} files touched\n", stats.files_touched.to_string().bold()));
        }
        if !stats.contributors.is_empty() {
            let people: Vec<String> = stats
                .contributors
                .iter()
                .map(|c| format!("{} ({})", c.name, c.commits))
                .collect();
            output.push_str(&format!(" {} {}\n", "contributors:".cyan(), people.join(", ")));
        }
        if !stats.commit_types.is_empty() {
            let types: Vec<String> = stats
                .commit_types
                .iter()
                .map(|(t, n)| format!("{t} {n}"))
                .collect();
            output.push_str(&format!(" {} {}\n", "types:".cyan(), types.join(", ")));
        }
        if !stats.hot_files.is_empty() {
            output.push_str(&format!(" {}\n", "hot files:".cyan()));
            for (file, lines) in &stats.hot_files {
                output.push_str(&format!("   {file} ({lines} lines)\n"));
            }
        }
        if stats.anomalies > 0 {
            output.push_str(&format!(
                " {} {} provider record(s) repaired during normalization\n",
                "⚠".yellow().bold(),
                stats.anomalies,
            ));
        }

        output
    }

    fn render_exchange(&self, exchange: &QaExchange) -> String {
        let mut output = String::new();
        output.push_str(&format!(" {} {}\n\n", "?".cyan().bold(), exchange.question.bold()));
        output.push_str(exchange.answer.trim_end());
        output.push_str("\n\n");
        output.push_str(&format!("{}\n", RULE.dimmed()));
        output.push_str(&format!(
            " {}\n",
            format!(
                "{} · {} of {} commits on {} · {}",
                exchange.snapshot.repository().full_name,
                exchange.commits_analyzed,
                exchange.commits_limit,
                exchange.snapshot.branch(),
                exchange.model,
            )
            .dimmed()
        ));
        if exchange.requested_commits > exchange.commits_limit {
            output.push_str(&format!(
                " {}\n",
                format!(
                    "asked for {} commits; the branch has {}",
                    exchange.requested_commits, exchange.commits_limit
                )
                .dimmed()
            ));
        }
        render_footer(&mut output, exchange.context_truncated);
        output
    }

    fn render_multi_exchange(&self, exchange: &MultiRepoExchange) -> String {
        let mut output = String::new();
        output.push_str(&format!(" {} {}\n\n", "?".cyan().bold(), exchange.question.bold()));
        output.push_str(exchange.answer.trim_end());
        output.push_str("\n\n");
        output.push_str(&format!("{}\n", RULE.dimmed()));
        for snapshot in &exchange.snapshots {
            output.push_str(&format!(
                " {}\n",
                format!(
                    "{} · {} of {} commits on {}",
                    snapshot.repository().full_name,
                    snapshot.most_recent(exchange.per_repo_commits).len(),
                    snapshot.total_commits(),
                    snapshot.branch(),
                )
                .dimmed()
            ));
        }
        output.push_str(&format!(
            " {}\n",
            format!(
                "{} commits across {} repositories · {}",
                exchange.commits_analyzed,
                exchange.snapshots.len(),
                exchange.model
            )
            .dimmed()
        ));
        render_footer(&mut output, exchange.context_truncated);
        output
    }

    fn render_story(&self, story: &CommitStory) -> String {
        let mut output = String::new();
        output.push_str(&format!(
            " {} {}\n\n",
            story.snapshot.repository().full_name.bold(),
            format!("({} story)", story.style).dimmed(),
        ));
        output.push_str(story.story.trim_end());
        output.push_str("\n\n");
        output.push_str(&format!("{}\n", RULE.dimmed()));
        output.push_str(&format!(
            " {}\n",
            format!(
                "{} commits on {} · {}",
                story.commits_analyzed,
                story.snapshot.branch(),
                story.model
            )
            .dimmed()
        ));
        output.push_str(&format!(" {}\n", crate::constants::AI_DISCLOSURE.dimmed()));
        output
    }

    fn render_branches(&self, repository: &str, branches: &[Branch]) -> String {
        if branches.is_empty() {
            return format!("  No branches found for {repository}.\n");
        }
        let mut output = format!(" {}\n", repository.bold());
        for branch in branches {
            let head = branch
                .head_sha
                .as_deref()
                .map(abbreviate_sha)
                .unwrap_or("");
            output.push_str(&format!("   {}  {}", head.dimmed(), branch.name));
            if branch.protected {
                output.push_str(&format!(" {}", "protected".yellow()));
            }
            output.push('\n');
        }
        output
    }
}

/// Truncation warning and AI disclosure shared by answer renderings.
fn render_footer(output: &mut String, context_truncated: bool) {
    if context_truncated {
        output.push_str(&format!(
            " {} {}\n",
            "⚠".yellow().bold(),
            "some commit detail was omitted to fit the model context".yellow(),
        ));
    }
    output.push_str(&format!(" {}\n", crate::constants::AI_DISCLOSURE.dimmed()));
}

fn render_commit(output: &mut String, commit: &Commit) {
    output.push_str(&format!(
        " {}  {}\n",
        commit.short_sha().yellow(),
        commit.headline().bold()
    ));
    let files = match commit.file_changes {
        Some(ref files) => format!(" · {} file(s)", files.len()),
        None => String::new(),
    };
    output.push_str(&format!(
        "          {}{}\n",
        format!(
            "{} · {} · +{} -{}",
            commit.author.name,
            commit.author.date.format("%Y-%m-%d %H:%M"),
            commit.stats.additions,
            commit.stats.deletions,
        )
        .dimmed(),
        files.dimmed(),
    ));
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use chrono::{TimeZone, Utc};

    use crate::aggregate::test_support::*;
    use crate::aggregate::{assemble, stats};
    use crate::models::StoryStyle;

    fn snapshot() -> Arc<AnalysisSnapshot> {
        let mut with_files = commit_at(&"a".repeat(40), 200, "feat: add parser\n\nDetails.");
        with_files.file_changes = Some(vec![file("src/parser.rs", None)]);
        Arc::new(
            assemble(
                repository("octo/demo"),
                "main",
                vec![
                    normalized(with_files),
                    normalized(commit_at(&"b".repeat(40), 100, "fix: typo")),
                ],
                5,
                12,
                Utc.timestamp_opt(1_700_000_000, 0).unwrap(),
            )
            .unwrap(),
        )
    }

    #[test]
    fn render_analysis_lists_commits_newest_first() {
        let snapshot = snapshot();
        let output = TerminalRenderer.render_analysis(&snapshot, &stats(&snapshot));
        assert!(output.contains("octo/demo"));
        assert!(output.contains("2 of 12 commits"));
        assert!(output.contains("Rust 90.0%"));
        let parser = output.find("feat: add parser").unwrap();
        let typo = output.find("fix: typo").unwrap();
        assert!(parser < typo);
        assert!(output.contains("1 file(s)"));
        assert!(!output.contains("Details."));
    }

    #[test]
    fn render_exchange_shows_disclosure_and_truncation() {
        let exchange = QaExchange {
            question: "What changed?".into(),
            snapshot: snapshot(),
            commits_analyzed: 1,
            commits_limit: 2,
            requested_commits: 10,
            model: "gpt-x".into(),
            answer: "A parser was added.".into(),
            context_truncated: true,
            context_fingerprint: "abc".into(),
        };
        let output = TerminalRenderer.render_exchange(&exchange);
        assert!(output.contains("A parser was added."));
        assert!(output.contains("1 of 2 commits on main"));
        assert!(output.contains("asked for 10 commits; the branch has 2"));
        assert!(output.contains("omitted"));
        assert!(output.contains(crate::constants::AI_DISCLOSURE));
    }

    #[test]
    fn render_multi_exchange_lists_each_repository() {
        let exchange = MultiRepoExchange {
            question: "How do they connect?".into(),
            snapshots: vec![snapshot(), snapshot()],
            per_repo_commits: 1,
            commits_analyzed: 2,
            model: "gpt-x".into(),
            answer: "Over REST.".into(),
            context_truncated: false,
            context_fingerprint: "abc".into(),
        };
        let output = TerminalRenderer.render_multi_exchange(&exchange);
        assert!(output.contains("Over REST."));
        assert_eq!(output.matches("octo/demo · 1 of 12 commits on main").count(), 2);
        assert!(output.contains("2 commits across 2 repositories"));
        assert!(!output.contains("omitted"));
        assert!(output.contains(crate::constants::AI_DISCLOSURE));
    }

    #[test]
    fn render_story_names_style() {
        let story = CommitStory {
            style: StoryStyle::Casual,
            snapshot: snapshot(),
            commits_analyzed: 2,
            model: "gpt-x".into(),
            story: "Parser shipped.".into(),
        };
        let output = TerminalRenderer.render_story(&story);
        assert!(output.contains("casual story"));
        assert!(output.contains("Parser shipped."));
    }

    #[test]
    fn render_branches_marks_protected() {
        let branches = vec![
            Branch {
                name: "main".into(),
                protected: true,
                head_sha: Some("c".repeat(40)),
            },
            Branch {
                name: "dev".into(),
                protected: false,
                head_sha: Some("éééééééééé".into()),
            },
        ];
        let output = TerminalRenderer.render_branches("octo/demo", &branches);
        assert!(output.contains("main"));
        assert!(output.contains("protected"));
        assert!(output.contains("ccccccc"));
        assert!(output.contains("ééééééé"));
        assert!(TerminalRenderer.render_branches("octo/demo", &[]).contains("No branches"));
    }
}
