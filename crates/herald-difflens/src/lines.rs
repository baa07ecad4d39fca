//! The two line tokenizations used by the diff code.
//!
//! Alignment compares lines without their terminators, so `"x"` and `"x\n"`
//! are the same token. Unified rendering keeps terminators, so a file that
//! only gained or lost its final newline still shows up as changed.

/// Split `text` into lines, dropping terminators.
///
/// Recognizes `\n`, `\r\n`, `\r` and the other Unicode line boundaries
/// (`\x0b`, `\x0c`, `\x1c`–`\x1e`, `\u{85}`, `\u{2028}`, `\u{2029}`).
/// A trailing terminator does not produce an empty final line.
///
/// # Examples
///
/// ```
/// use herald_difflens::lines::split_lines;
///
/// assert_eq!(split_lines("a\r\nb\n"), vec!["a", "b"]);
/// assert!(split_lines("").is_empty());
/// assert_eq!(split_lines("\n"), vec![""]);
/// ```
pub fn split_lines(text: &str) -> Vec<&str> {
    tokenize(text).map(|(line, term)| &line[..line.len() - term]).collect()
}

/// Split `text` into lines, keeping each line's terminator.
///
/// # Examples
///
/// ```
/// use herald_difflens::lines::split_lines_keep_ends;
///
/// assert_eq!(split_lines_keep_ends("a\r\nb"), vec!["a\r\n", "b"]);
/// ```
pub fn split_lines_keep_ends(text: &str) -> Vec<&str> {
    tokenize(text).map(|(line, _)| line).collect()
}

/// Strip one trailing line terminator, if present.
pub fn strip_terminator(line: &str) -> &str {
    let term = terminator_len(line);
    &line[..line.len() - term]
}

/// `true` when `line` is empty or whitespace only.
pub fn is_blank(line: &str) -> bool {
    line.trim().is_empty()
}

fn is_boundary(c: char) -> bool {
    matches!(
        c,
        '\n' | '\r' | '\x0b' | '\x0c' | '\x1c' | '\x1d' | '\x1e' | '\u{85}' | '\u{2028}' | '\u{2029}'
    )
}

fn terminator_len(line: &str) -> usize {
    if line.ends_with("\r\n") {
        2
    } else {
        line.chars()
            .next_back()
            .filter(|c| is_boundary(*c))
            .map_or(0, char::len_utf8)
    }
}

/// Yields `(line_with_terminator, terminator_byte_len)`.
fn tokenize(text: &str) -> impl Iterator<Item = (&str, usize)> {
    let mut rest = text;
    std::iter::from_fn(move || {
        if rest.is_empty() {
            return None;
        }
        let (end, term) = match rest.char_indices().find(|(_, c)| is_boundary(*c)) {
            Some((idx, '\r')) if rest[idx + 1..].starts_with('\n') => (idx + 2, 2),
            Some((idx, c)) => (idx + c.len_utf8(), c.len_utf8()),
            None => (rest.len(), 0),
        };
        let (line, tail) = rest.split_at(end);
        rest = tail;
        Some((line, term))
    })
}
