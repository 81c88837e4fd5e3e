//! Context documents spanning several repositories.

use std::sync::Arc;

use indexmap::IndexSet;
use strum::Display;

use crate::models::{AnalysisSnapshot, Repository};

use super::{ContextDocument, ContextOptions, Draft};

/// Rough role of a repository, guessed from its name and description.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum ProjectKind {
    Frontend,
    Backend,
    Mobile,
    Database,
    Documentation,
    Other,
}

impl ProjectKind {
    /// Classify by whole-word keywords; the first matching kind wins.
    pub fn of(repository: &Repository) -> Self {
        const KEYWORDS: &[(ProjectKind, &[&str])] = &[
            (
                ProjectKind::Frontend,
                &["frontend", "client", "ui", "react", "vue", "angular", "web"],
            ),
            (
                ProjectKind::Backend,
                &["backend", "api", "server", "node", "express", "django", "flask"],
            ),
            (
                ProjectKind::Mobile,
                &["mobile", "app", "ios", "android", "flutter"],
            ),
            (
                ProjectKind::Database,
                &["database", "db", "sql", "mongo", "postgres", "schema"],
            ),
            (ProjectKind::Documentation, &["docs", "documentation"]),
        ];

        let text = format!(
            "{} {}",
            repository.name,
            repository.description.as_deref().unwrap_or("")
        )
        .to_lowercase();
        let words: Vec<&str> = text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
            .collect();

        KEYWORDS
            .iter()
            .find(|(_, keywords)| keywords.iter().any(|k| words.contains(k)))
            .map_or(ProjectKind::Other, |(kind, _)| *kind)
    }
}

/// Build one context document covering several repositories.
///
/// Each repository gets its own section with up to `per_repo_commits` of
/// its most recent commits, followed by a cross-repository summary. The
/// budget rules are those of [`super::build_context`]; when commits have to
/// go, the oldest commits of every section go before any recent one.
pub fn build_multi_context(
    snapshots: &[Arc<AnalysisSnapshot>],
    per_repo_commits: usize,
    options: &ContextOptions,
) -> ContextDocument {
    let mut draft = Draft::default();
    draft.summary("=== MULTI-PROJECT ANALYSIS ===");
    draft.summary(format!("Total repositories analyzed: {}", snapshots.len()));

    for (idx, snapshot) in snapshots.iter().enumerate() {
        let name = &snapshot.repository().name;
        draft.summary("");
        draft.summary(format!("=== REPOSITORY {}: {name} ===", idx + 1));
        draft.repository(
            Some(idx),
            snapshot,
            per_repo_commits,
            options,
            &format!("--- Recent Commits for {name} ---"),
        );
    }

    draft.summary("");
    draft.summary("=== CROSS-REPOSITORY ANALYSIS ===");
    for line in cross_repository_lines(snapshots) {
        draft.summary(line);
    }

    draft.finish(options.char_budget)
}

fn cross_repository_lines(snapshots: &[Arc<AnalysisSnapshot>]) -> Vec<String> {
    let kinds: Vec<ProjectKind> = snapshots
        .iter()
        .map(|s| ProjectKind::of(s.repository()))
        .collect();

    let languages: IndexSet<&str> = snapshots
        .iter()
        .flat_map(|s| s.repository().languages.keys().map(String::as_str))
        .collect();

    let mut shared_authors: Vec<&str> = Vec::new();
    let mut seen: IndexSet<&str> = IndexSet::new();
    for snapshot in snapshots {
        let emails: IndexSet<&str> = snapshot
            .commits()
            .iter()
            .map(|c| c.author.email.as_str())
            .collect();
        for email in emails {
            if !seen.insert(email) && !shared_authors.contains(&email) {
                shared_authors.push(email);
            }
        }
    }

    let has = |kind| kinds.contains(&kind);
    let mut connections = Vec::new();
    if has(ProjectKind::Frontend) && has(ProjectKind::Backend) {
        connections.push("Frontend-Backend API Integration");
    }
    if has(ProjectKind::Mobile) && has(ProjectKind::Backend) {
        connections.push("Mobile-Backend API Integration");
    }
    if has(ProjectKind::Database) {
        connections.push("Database Integration");
    }
    if has(ProjectKind::Documentation) {
        connections.push("Documentation & Code Alignment");
    }

    let or_none = |items: Vec<String>| {
        if items.is_empty() {
            "none".to_string()
        } else {
            items.join(", ")
        }
    };

    vec![
        format!(
            "Detected Project Types: {}",
            or_none(kinds.iter().map(ToString::to_string).collect())
        ),
        format!(
            "Technologies Used: {}",
            or_none(languages.iter().map(|l| l.to_string()).collect())
        ),
        format!(
            "Shared Authors: {}",
            or_none(shared_authors.iter().map(|a| a.to_string()).collect())
        ),
        format!(
            "Potential Connections: {}",
            or_none(connections.iter().map(|c| c.to_string()).collect())
        ),
    ]
}
