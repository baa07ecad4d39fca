use std::fmt;
use std::ops::Range;

use herald_core::FileSnapshotPair;
use serde::Serialize;

use crate::lines::{is_blank, split_lines};
use crate::matcher::{SequenceMatcher, Tag};

/// Hunks with fewer new-side lines than this are dropped, except for a
/// single non-blank line.
pub const MIN_HUNK_LINES: usize = 3;

/// What a hunk does to the file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HunkKind {
    /// Lines added, nothing removed.
    Insert,
    /// Lines removed, nothing added.
    Delete,
    /// Lines removed and different lines added in their place.
    Replace,
}

impl fmt::Display for HunkKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HunkKind::Insert => write!(f, "insert"),
            HunkKind::Delete => write!(f, "delete"),
            HunkKind::Replace => write!(f, "replace"),
        }
    }
}

/// One contiguous change between the before and after text of a file.
///
/// Ranges are zero-based and half-open line indices.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Hunk {
    /// Repository path.
    pub path: String,
    /// Change kind.
    pub kind: HunkKind,
    /// Lines `[i1, i2)` of the before text.
    pub before_range: Range<usize>,
    /// Lines `[j1, j2)` of the after text.
    pub after_range: Range<usize>,
    /// `before[i1..i2]`.
    pub before_lines: Vec<String>,
    /// `after[j1..j2]`.
    pub after_lines: Vec<String>,
}

impl Hunk {
    /// 1-based line of the after text a comment on this hunk attaches to.
    pub fn target_line(&self) -> u32 {
        u32::try_from(self.after_range.start + 1).unwrap_or(u32::MAX)
    }

    /// `true` if this hunk is worth a review comment.
    pub fn is_significant(&self) -> bool {
        is_significant(&self.after_lines)
    }
}

/// Significance filter applied to a hunk's new-side lines.
///
/// Two independent checks, in order:
/// 1. fewer than [`MIN_HUNK_LINES`] lines is rejected unless it is exactly
///    one non-blank line;
/// 2. all-blank content is rejected whatever its length.
///
/// # Examples
///
/// ```
/// use herald_difflens::hunk::is_significant;
///
/// assert!(is_significant(&["x".to_string()]));
/// assert!(!is_significant(&["".to_string()]));
/// assert!(!is_significant(&["a".to_string(), "b".to_string()]));
/// assert!(!is_significant(&[" ".to_string(), "".to_string(), "\t".to_string()]));
/// ```
pub fn is_significant<S: AsRef<str>>(after_lines: &[S]) -> bool {
    if after_lines.len() < MIN_HUNK_LINES {
        let single_meaningful = after_lines.len() == 1 && !is_blank(after_lines[0].as_ref());
        if !single_meaningful {
            return false;
        }
    }
    after_lines.iter().any(|l| !is_blank(l.as_ref()))
}

/// Every non-equal region between the two texts, in file order, before
/// any filtering.
///
/// # Examples
///
/// ```
/// use herald_core::FileSnapshotPair;
/// use herald_difflens::hunk::{diff_hunks, HunkKind};
///
/// let pair = FileSnapshotPair::new("/a", "a\nb\n", "a\nb\n\n");
/// let hunks = diff_hunks(&pair);
/// assert_eq!(hunks.len(), 1);
/// assert_eq!(hunks[0].kind, HunkKind::Insert);
/// ```
pub fn diff_hunks(pair: &FileSnapshotPair) -> Vec<Hunk> {
    let before = split_lines(&pair.before_text);
    let after = split_lines(&pair.after_text);

    SequenceMatcher::new(&before, &after)
        .opcodes()
        .into_iter()
        .filter_map(|op| {
            let kind = match op.tag {
                Tag::Equal => return None,
                Tag::Insert => HunkKind::Insert,
                Tag::Delete => HunkKind::Delete,
                Tag::Replace => HunkKind::Replace,
            };
            Some(Hunk {
                path: pair.path.clone(),
                kind,
                before_range: op.i1..op.i2,
                after_range: op.j1..op.j2,
                before_lines: to_owned(&before[op.i1..op.i2]),
                after_lines: to_owned(&after[op.j1..op.j2]),
            })
        })
        .collect()
}

/// Significant hunks of one file, in discovery order.
///
/// # Examples
///
/// ```
/// use herald_core::FileSnapshotPair;
/// use herald_difflens::hunk::segment;
///
/// let pair = FileSnapshotPair::new("/a", "a\nb\nc\n", "a\nx\nc\n");
/// let hunks = segment(&pair);
/// assert_eq!(hunks.len(), 1);
/// assert_eq!(hunks[0].target_line(), 2);
/// ```
pub fn segment(pair: &FileSnapshotPair) -> Vec<Hunk> {
    diff_hunks(pair)
        .into_iter()
        .filter(Hunk::is_significant)
        .collect()
}

fn to_owned(lines: &[&str]) -> Vec<String> {
    lines.iter().map(|l| (*l).to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pair(before: &str, after: &str) -> FileSnapshotPair {
        FileSnapshotPair::new("/src/app.ts", before, after)
    }

    fn lines(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn identical_texts_have_no_hunks() {
        let text = "one\ntwo\n\nthree\n";
        assert!(diff_hunks(&pair(text, text)).is_empty());
        assert!(segment(&pair("", "")).is_empty());
    }

    #[test]
    fn trailing_newline_change_is_invisible_to_alignment() {
        assert!(diff_hunks(&pair("a\nb", "a\nb\n")).is_empty());
    }

    #[test]
    fn one_line_replace_is_kept() {
        let hunks = segment(&pair("a\nb\nc", "a\nx\nc"));
        assert_eq!(hunks.len(), 1);
        let h = &hunks[0];
        assert_eq!(h.kind, HunkKind::Replace);
        assert_eq!(h.before_range, 1..2);
        assert_eq!(h.after_range, 1..2);
        assert_eq!(h.before_lines, lines(&["b"]));
        assert_eq!(h.after_lines, lines(&["x"]));
        assert_eq!(h.target_line(), 2);
    }

    #[test]
    fn single_blank_insert_is_dropped() {
        let raw = diff_hunks(&pair("a\nb", "a\nb\n\n"));
        assert_eq!(raw.len(), 1);
        assert_eq!(raw[0].kind, HunkKind::Insert);
        assert_eq!(raw[0].after_lines, lines(&[""]));
        assert!(segment(&pair("a\nb", "a\nb\n\n")).is_empty());
    }

    #[test]
    fn two_line_insert_is_dropped() {
        let hunks = segment(&pair("a\nz", "a\nb\nc\nz"));
        assert!(hunks.is_empty());
    }

    #[test]
    fn three_line_insert_is_kept() {
        let hunks = segment(&pair("a\nz", "a\nb\nc\nd\nz"));
        assert_eq!(hunks.len(), 1);
        assert_eq!(hunks[0].kind, HunkKind::Insert);
        assert_eq!(hunks[0].after_range, 1..4);
        assert_eq!(hunks[0].before_range, 1..1);
        assert_eq!(hunks[0].target_line(), 2);
    }

    #[test]
    fn three_blank_lines_are_dropped() {
        assert!(!is_significant(&lines(&["", "  ", "\t"])));
        assert!(segment(&pair("a\nz", "a\n\n  \n\t\nz")).is_empty());
    }

    #[test]
    fn mostly_blank_long_hunk_is_kept() {
        assert!(is_significant(&lines(&["", "x", ""])));
    }

    #[test]
    fn deletions_never_survive() {
        let raw = diff_hunks(&pair("a\nb\nc\nd\ne", "a\ne"));
        assert_eq!(raw.len(), 1);
        assert_eq!(raw[0].kind, HunkKind::Delete);
        assert!(raw[0].after_lines.is_empty());
        assert!(segment(&pair("a\nb\nc\nd\ne", "a\ne")).is_empty());
    }

    #[test]
    fn hunks_are_ordered_and_disjoint() {
        let before = "1\n2\n3\n4\n5\n6\n7\n8\n9\n";
        let after = "1\nX\n3\n4\nA\nB\nC\n6\n7\n8\nY\n";
        let hunks = diff_hunks(&pair(before, after));
        assert!(hunks.len() >= 3);
        for w in hunks.windows(2) {
            assert!(w[0].before_range.end <= w[1].before_range.start);
            assert!(w[0].after_range.end <= w[1].after_range.start);
        }
    }

    #[test]
    fn surviving_hunks_satisfy_filter_shape() {
        let before = "a\nb\nc\nd\ne\nf\n";
        let after = "a\nB\nc\n\nd\nE1\nE2\nE3\nf\n";
        for h in segment(&pair(before, after)) {
            assert!(!h.after_lines.is_empty());
            assert!(
                h.after_lines.len() >= MIN_HUNK_LINES
                    || (h.after_lines.len() == 1 && !is_blank(&h.after_lines[0]))
            );
        }
    }
}
