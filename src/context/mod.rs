//! Context document assembly.
//!
//! Renders a snapshot into a bounded, deterministic plain-text digest for
//! the answer backend: a repository summary, then the most recent commits
//! with their file lists and patch bodies. Rendering produces an ordered
//! list of [`budget::Segment`]s; [`budget::plan`] decides which survive.
//! [`build_multi_context`] lays several repositories out in one document
//! under the same budget.

pub mod budget;
pub mod multi;

use sha2::{Digest, Sha256};

use crate::models::{AnalysisSnapshot, Commit, FileChange, FileStatus};

use budget::{Segment, SegmentKind};

pub use multi::{ProjectKind, build_multi_context};

/// Default character budget for a context document.
pub const DEFAULT_CHAR_BUDGET: usize = 24_000;

/// Default per-patch line cap.
pub const DEFAULT_MAX_PATCH_LINES: usize = 200;

/// Knobs for [`build_context`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContextOptions {
    /// Hard upper bound on document size, in characters.
    pub char_budget: usize,
    /// Patches longer than this are cut at a line boundary before planning.
    pub max_patch_lines: usize,
    /// Render patch bodies at all.
    pub include_patches: bool,
}

impl Default for ContextOptions {
    fn default() -> Self {
        Self {
            char_budget: DEFAULT_CHAR_BUDGET,
            max_patch_lines: DEFAULT_MAX_PATCH_LINES,
            include_patches: true,
        }
    }
}

/// A rendered context document and what it contains.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextDocument {
    pub text: String,
    /// Commits whose header made it into the document.
    pub commits_included: usize,
    pub patches_included: usize,
    /// Patches dropped to fit the budget.
    pub patches_dropped: usize,
    /// Whether any segment was dropped or any patch was line-capped.
    pub truncated: bool,
    /// Size of `text` in characters.
    pub char_count: usize,
}

impl ContextDocument {
    /// SHA-256 of the document text, hex encoded.
    pub fn fingerprint(&self) -> String {
        hex::encode(Sha256::digest(self.text.as_bytes()))
    }
}

/// Build the context document for the `max_commits` most recent commits.
///
/// Same snapshot and options always produce byte-identical text, and the
/// text never exceeds `options.char_budget` characters.
pub fn build_context(
    snapshot: &AnalysisSnapshot,
    max_commits: usize,
    options: &ContextOptions,
) -> ContextDocument {
    let mut draft = Draft::default();
    draft.summary("=== REPOSITORY INFORMATION ===");
    draft.repository(None, snapshot, max_commits, options, "=== RECENT COMMITS ===");
    draft.finish(options.char_budget)
}

/// Segments of a document under construction.
#[derive(Default)]
struct Draft {
    segments: Vec<Segment>,
    count_lines: Vec<CountLine>,
    patches_capped: bool,
}

/// A `Commits: showing` summary line, restated once the plan is known.
struct CountLine {
    segment: usize,
    group: Option<usize>,
    total: usize,
}

impl Draft {
    /// Push one summary line; returns its segment index.
    fn summary(&mut self, line: impl Into<String>) -> usize {
        let mut text = line.into();
        text.push('\n');
        self.segments
            .push(Segment::new(SegmentKind::Summary, text, None, None));
        self.segments.len() - 1
    }

    /// Repository summary lines followed by its most recent commits.
    fn repository(
        &mut self,
        group: Option<usize>,
        snapshot: &AnalysisSnapshot,
        max_commits: usize,
        options: &ContextOptions,
        commits_heading: &str,
    ) {
        let commits = snapshot.most_recent(max_commits);
        let total = snapshot.total_commits();

        for line in repository_lines(snapshot) {
            self.summary(line);
        }
        let segment = self.summary(commits_line(commits.len(), total));
        self.count_lines.push(CountLine {
            segment,
            group,
            total,
        });
        self.summary("");
        self.summary(commits_heading);

        for (idx, commit) in commits.iter().enumerate() {
            self.patches_capped |= push_commit(&mut self.segments, group, idx, commit, options);
        }
    }

    fn finish(mut self, char_budget: usize) -> ContextDocument {
        let plan = budget::plan(&self.segments, char_budget);

        // Restate counts from the surviving headers. A count only shrinks,
        // so the line never outgrows the plan.
        for line in &self.count_lines {
            let kept = self
                .segments
                .iter()
                .zip(&plan.keep)
                .filter(|(s, keep)| {
                    **keep && s.kind == SegmentKind::CommitHeader && s.group == line.group
                })
                .count();
            self.segments[line.segment] = Segment::new(
                SegmentKind::Summary,
                format!("{}\n", commits_line(kept, line.total)),
                None,
                None,
            );
        }

        let mut text = String::with_capacity(plan.size);
        let mut char_count = 0;
        for (segment, keep) in self.segments.iter().zip(&plan.keep) {
            if *keep {
                text.push_str(&segment.text);
                char_count += segment.len();
            }
        }

        let patches_dropped = plan.dropped(&self.segments, SegmentKind::Patch);
        let truncated = self.patches_capped || plan.keep.iter().any(|k| !k);
        if truncated {
            tracing::debug!(
                budget = char_budget,
                planned = self.segments.iter().map(Segment::len).sum::<usize>(),
                kept = char_count,
                patches_dropped,
                "context truncated to fit budget"
            );
        }

        ContextDocument {
            commits_included: plan.kept(&self.segments, SegmentKind::CommitHeader),
            patches_included: plan.kept(&self.segments, SegmentKind::Patch),
            patches_dropped,
            truncated,
            char_count,
            text,
        }
    }
}

fn commits_line(showing: usize, total: usize) -> String {
    format!("Commits: showing {showing} of {total} on branch")
}

/// Metadata lines of one repository, without a heading.
fn repository_lines(snapshot: &AnalysisSnapshot) -> Vec<String> {
    let repo = snapshot.repository();
    let or_na = |value: Option<String>| value.unwrap_or_else(|| "N/A".to_string());

    let languages = repo
        .language_shares()
        .iter()
        .map(|(name, share)| format!("{name} {share:.1}%"))
        .collect::<Vec<_>>()
        .join(", ");

    vec![
        format!("Name: {}", repo.name),
        format!("Full Name: {}", repo.full_name),
        format!("Description: {}", or_na(repo.description.clone())),
        format!("Language: {}", or_na(repo.primary_language().map(str::to_string))),
        format!(
            "Languages: {}",
            if languages.is_empty() { "N/A".to_string() } else { languages }
        ),
        format!("Stars: {}", repo.stars),
        format!("Forks: {}", repo.forks),
        format!("Open Issues: {}", repo.open_issues),
        format!("Created: {}", or_na(repo.created_at.map(|d| d.to_rfc3339()))),
        format!("Last Updated: {}", or_na(repo.updated_at.map(|d| d.to_rfc3339()))),
        format!("Default Branch: {}", repo.default_branch),
        format!("Analyzed Branch: {}", snapshot.branch()),
        format!("Private: {}", repo.is_private),
        format!("Owner: {} ({})", repo.owner.login, repo.owner.owner_type),
    ]
}

/// Render one commit. Returns whether any of its patches was line-capped.
fn push_commit(
    segments: &mut Vec<Segment>,
    group: Option<usize>,
    idx: usize,
    commit: &Commit,
    options: &ContextOptions,
) -> bool {
    segments.push(
        Segment::new(
            SegmentKind::CommitHeader,
            commit_header(idx, commit),
            Some(idx),
            None,
        )
        .in_group(group),
    );

    let Some(files) = commit.file_changes.as_deref() else {
        return false;
    };

    let mut capped = false;
    for (file_idx, file) in files.iter().enumerate() {
        segments.push(
            Segment::new(
                SegmentKind::FileLine,
                file_line(file),
                Some(idx),
                Some(file_idx),
            )
            .in_group(group),
        );

        if !options.include_patches {
            continue;
        }
        if let Some(patch) = file.patch.as_deref().filter(|p| !p.trim().is_empty()) {
            let (body, was_capped) = patch_body(patch, options.max_patch_lines);
            capped |= was_capped;
            segments.push(
                Segment::new(SegmentKind::Patch, body, Some(idx), Some(file_idx))
                    .in_group(group),
            );
        }
    }
    capped
}

fn commit_header(idx: usize, commit: &Commit) -> String {
    let mut out = format!("\nCommit {}:\n  SHA: {}\n", idx + 1, commit.sha);

    let mut message = commit.message.trim_end().lines();
    out.push_str(&format!("  Message: {}\n", message.next().unwrap_or("")));
    for line in message {
        out.push_str(&format!("    {line}\n"));
    }

    out.push_str(&format!(
        "  Author: {} ({})\n  Date: {}\n  Changes: +{} -{} ({} total)\n",
        commit.author.name,
        commit.author.email,
        commit.author.date.to_rfc3339(),
        commit.stats.additions,
        commit.stats.deletions,
        commit.stats.total,
    ));
    if let Some(files) = &commit.file_changes {
        out.push_str(&format!("  Files Changed: {}\n", files.len()));
    }
    out
}

fn file_line(file: &FileChange) -> String {
    let status = match (file.status, &file.previous_filename) {
        (FileStatus::Renamed, Some(prev)) => format!("renamed from {prev}"),
        (status, _) => status.to_string(),
    };
    format!(
        "    - {} ({status}, +{} -{})\n",
        file.filename, file.additions, file.deletions
    )
}

/// Indent a patch under its file line, keeping at most `max_lines` lines.
fn patch_body(patch: &str, max_lines: usize) -> (String, bool) {
    let total = patch.lines().count();
    let mut out = String::from("      Code Changes:\n");
    for line in patch.lines().take(max_lines) {
        out.push_str("        ");
        out.push_str(line);
        out.push('\n');
    }
    let capped = total > max_lines;
    if capped {
        out.push_str(&format!("        ... ({} more lines)\n", total - max_lines));
    }
    (out, capped)
}
