//! Budget planning over an ordered list of document segments.
//!
//! Planning never edits segment text: each segment is kept whole or
//! dropped, so the final document is always cut at line boundaries.

/// What a segment renders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SegmentKind {
    /// One line of the repository summary.
    Summary,
    /// SHA, author, date, message, and stats of one commit.
    CommitHeader,
    /// One entry of a commit's file list.
    FileLine,
    /// The (possibly line-capped) patch body of one file.
    Patch,
}

/// A unit of the context document. Text always ends with a newline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub kind: SegmentKind,
    pub text: String,
    /// Index of the commit in snapshot order (0 = newest).
    pub commit: Option<usize>,
    /// Index of the file within its commit.
    pub file: Option<usize>,
    /// Repository section in a multi-repository document.
    pub group: Option<usize>,
    len: usize,
}

impl Segment {
    pub fn new(kind: SegmentKind, text: String, commit: Option<usize>, file: Option<usize>) -> Self {
        debug_assert!(text.ends_with('\n'));
        let len = text.chars().count();
        Self {
            kind,
            text,
            commit,
            file,
            group: None,
            len,
        }
    }

    pub fn in_group(mut self, group: Option<usize>) -> Self {
        self.group = group;
        self
    }

    /// Sort key for drop order: older commits rank higher, then later
    /// repository sections, then later files.
    fn age(&self) -> (Option<usize>, Option<usize>, Option<usize>) {
        (self.commit, self.group, self.file)
    }

    /// Size in characters.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

/// Which segments survive the budget.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Plan {
    /// Parallel to the input segments.
    pub keep: Vec<bool>,
    /// Total characters of the kept segments.
    pub size: usize,
}

impl Plan {
    pub fn dropped(&self, segments: &[Segment], kind: SegmentKind) -> usize {
        segments
            .iter()
            .zip(&self.keep)
            .filter(|(s, keep)| s.kind == kind && !**keep)
            .count()
    }

    pub fn kept(&self, segments: &[Segment], kind: SegmentKind) -> usize {
        segments
            .iter()
            .zip(&self.keep)
            .filter(|(s, keep)| s.kind == kind && **keep)
            .count()
    }
}

/// Decide which segments fit within `budget` characters.
///
/// Drop order:
/// 1. patches, largest first (ties: later commit, then later file)
/// 2. file lines, oldest commit first
/// 3. commit headers, oldest first
/// 4. summary lines, from the end
///
/// Commit indices count from the newest commit of each repository section,
/// so with several sections the oldest commits of all of them go before
/// any section loses a recent one.
pub fn plan(segments: &[Segment], budget: usize) -> Plan {
    let mut keep = vec![true; segments.len()];
    let mut size: usize = segments.iter().map(Segment::len).sum();

    if size <= budget {
        return Plan { keep, size };
    }

    let mut patches: Vec<usize> = indices_of(segments, SegmentKind::Patch).collect();
    patches.sort_by(|&a, &b| {
        let (sa, sb) = (&segments[a], &segments[b]);
        sb.len().cmp(&sa.len()).then_with(|| sb.age().cmp(&sa.age()))
    });

    let oldest_first = |kind| {
        let mut indices: Vec<usize> = indices_of(segments, kind).collect();
        indices.sort_by(|&a, &b| segments[b].age().cmp(&segments[a].age()));
        indices
    };
    let file_lines = oldest_first(SegmentKind::FileLine);
    let headers = oldest_first(SegmentKind::CommitHeader);
    let summary = indices_of(segments, SegmentKind::Summary).rev();

    let drop_order = patches.into_iter().chain(file_lines).chain(headers).chain(summary);
    for idx in drop_order {
        if size <= budget {
            break;
        }
        keep[idx] = false;
        size -= segments[idx].len();
    }

    Plan { keep, size }
}

fn indices_of(
    segments: &[Segment],
    kind: SegmentKind,
) -> impl DoubleEndedIterator<Item = usize> + '_ {
    segments
        .iter()
        .enumerate()
        .filter(move |(_, s)| s.kind == kind)
        .map(|(i, _)| i)
}
