use herald_core::FileSnapshotPair;

use crate::lines::{split_lines_keep_ends, strip_terminator};
use crate::matcher::{SequenceMatcher, Tag};

/// Lines of unchanged context around each change.
pub const DEFAULT_CONTEXT: usize = 3;

/// Emitted after a rendered line that had no terminator.
pub const NO_NEWLINE_MARKER: &str = "\\ No newline at end of file";

/// Render a unified diff of `pair` as a list of lines (without terminators).
///
/// Lines are compared with their terminators, so a change that only adds
/// or removes the final newline is reported. Returns an empty list when the
/// texts are identical.
///
/// # Examples
///
/// ```
/// use herald_core::FileSnapshotPair;
/// use herald_difflens::unified::unified_diff;
///
/// let pair = FileSnapshotPair::new("/src/a.rs", "a\nb\nc\n", "a\nx\nc\n");
/// let lines = unified_diff(&pair, 3);
/// assert_eq!(lines[0], "--- a/src/a.rs");
/// assert_eq!(lines[1], "+++ b/src/a.rs");
/// assert_eq!(lines[2], "@@ -1,3 +1,3 @@");
/// assert_eq!(&lines[3..], [" a", "-b", "+x", " c"]);
/// ```
pub fn unified_diff(pair: &FileSnapshotPair, context: usize) -> Vec<String> {
    let before = split_lines_keep_ends(&pair.before_text);
    let after = split_lines_keep_ends(&pair.after_text);

    let groups = SequenceMatcher::new(&before, &after).grouped_opcodes(context);
    if groups.is_empty() {
        return Vec::new();
    }

    let path = pair.path.trim_start_matches('/');
    let mut out = vec![format!("--- a/{path}"), format!("+++ b/{path}")];
    for group in groups {
        let (Some(first), Some(last)) = (group.first(), group.last()) else {
            continue;
        };
        out.push(format!(
            "@@ -{} +{} @@",
            format_range(first.i1, last.i2),
            format_range(first.j1, last.j2)
        ));
        for op in &group {
            match op.tag {
                Tag::Equal => push_lines(&mut out, ' ', &before[op.i1..op.i2]),
                Tag::Delete => push_lines(&mut out, '-', &before[op.i1..op.i2]),
                Tag::Insert => push_lines(&mut out, '+', &after[op.j1..op.j2]),
                Tag::Replace => {
                    push_lines(&mut out, '-', &before[op.i1..op.i2]);
                    push_lines(&mut out, '+', &after[op.j1..op.j2]);
                }
            }
        }
    }
    out
}

/// A unified diff of `pair` capped at `max_lines` rendered lines, joined
/// with newlines. Used to bound prompt size.
///
/// # Examples
///
/// ```
/// use herald_core::FileSnapshotPair;
/// use herald_difflens::unified::excerpt;
///
/// let pair = FileSnapshotPair::new("/a", "1\n", "2\n");
/// assert_eq!(excerpt(&pair, 3, 3), "--- a/a\n+++ b/a\n@@ -1 +1 @@");
/// ```
pub fn excerpt(pair: &FileSnapshotPair, context: usize, max_lines: usize) -> String {
    let mut lines = unified_diff(pair, context);
    lines.truncate(max_lines);
    lines.join("\n")
}

fn push_lines(out: &mut Vec<String>, prefix: char, lines: &[&str]) {
    for line in lines {
        let body = strip_terminator(line);
        out.push(format!("{prefix}{body}"));
        if body.len() == line.len() {
            out.push(NO_NEWLINE_MARKER.to_string());
        }
    }
}

/// `start,length` in 1-based unified-diff notation; a single line omits the
/// length and an empty range points at the line before it.
fn format_range(start: usize, stop: usize) -> String {
    let length = stop - start;
    match length {
        1 => format!("{}", start + 1),
        0 => format!("{start},0"),
        _ => format!("{},{length}", start + 1),
    }
}
