//! Line accounting over GitHub patch bodies.
//!
//! GitHub's per-file `patch` is the hunk portion of a unified diff: it starts
//! at the first `@@` header, without the `diff --git` or `---`/`+++` lines.

/// Added and removed line counts of a patch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LineCounts {
    pub additions: u64,
    pub deletions: u64,
}

/// Count `+` and `-` lines inside the hunks of a patch.
///
/// Lines before the first hunk header are ignored, so a removed line whose
/// content starts with `--` is still counted as a deletion.
pub fn count_patch_lines(patch: &str) -> LineCounts {
    let mut counts = LineCounts::default();
    let mut in_hunk = false;

    for line in patch.lines() {
        if line.starts_with("@@") {
            in_hunk = parse_hunk_header(line).is_some();
            continue;
        }
        if !in_hunk {
            continue;
        }

        match line.as_bytes().first() {
            Some(b'+') => counts.additions += 1,
            Some(b'-') => counts.deletions += 1,
            // context, blank context, or "\ No newline at end of file"
            Some(b' ') | Some(b'\\') | None => {}
            // Unknown line format, stop counting this hunk
            Some(_) => in_hunk = false,
        }
    }

    counts
}

/// Parse a `@@ -old_start,old_count +new_start,new_count @@ header` line.
fn parse_hunk_header(line: &str) -> Option<(u32, u32, u32, u32)> {
    let line = line.strip_prefix("@@ ")?;
    let end = line.find(" @@")?;
    let (old, new) = line[..end].split_once(' ')?;

    let (old_start, old_count) = parse_range(old.strip_prefix('-')?)?;
    let (new_start, new_count) = parse_range(new.strip_prefix('+')?)?;

    Some((old_start, old_count, new_start, new_count))
}

/// Parse "start,count" or "start" (count defaults to 1).
fn parse_range(s: &str) -> Option<(u32, u32)> {
    if let Some((start, count)) = s.split_once(',') {
        Some((start.parse().ok()?, count.parse().ok()?))
    } else {
        Some((s.parse().ok()?, 1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_simple_hunk() {
        let patch = "@@ -1,5 +1,6 @@\n fn main() {\n-    println!(\"Hello\");\n+    println!(\"Hello, world!\");\n+    println!(\"Goodbye!\");\n     let x = 42;\n }";
        assert_eq!(
            count_patch_lines(patch),
            LineCounts {
                additions: 2,
                deletions: 1
            }
        );
    }

    #[test]
    fn counts_multiple_hunks_and_markers() {
        let patch = "@@ -1,2 +1,2 @@\n-a\n+b\n\\ No newline at end of file\n@@ -10,3 +10,4 @@ fn some_function() {\n ctx\n\n+added\n ctx";
        assert_eq!(
            count_patch_lines(patch),
            LineCounts {
                additions: 2,
                deletions: 1
            }
        );
    }

    #[test]
    fn removed_line_that_looks_like_header_is_counted() {
        let patch = "@@ -1,2 +1,1 @@\n--- a comment in sql\n keep";
        assert_eq!(count_patch_lines(patch).deletions, 1);
    }

    #[test]
    fn text_outside_hunks_is_ignored() {
        assert_eq!(count_patch_lines(""), LineCounts::default());
        assert_eq!(count_patch_lines("+not a hunk\n-either"), LineCounts::default());
    }

    #[test]
    fn hunk_header_single_line_ranges() {
        assert_eq!(parse_hunk_header("@@ -3 +3 @@"), Some((3, 1, 3, 1)));
        assert_eq!(parse_hunk_header("@@ garbage @@"), None);
    }
}
