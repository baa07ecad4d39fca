use std::fmt::Write;

use herald_core::{FileSnapshotPair, PullRequestMeta};
use herald_difflens::hunk::Hunk;
use herald_difflens::unified::{excerpt, DEFAULT_CONTEXT};

const REVIEWER_PERSONA: &str = "\
You are a senior frontend engineer with deep expertise in best practices, performance, \
security, and user experience in modern web applications.";

const REVIEW_TASK: &str = "\
TASK:
Please produce a comprehensive Pull Request review that includes:
  1. Summary of Changes:
     - What features or components were added, removed, or refactored?
     - High-level description of the intent behind each change.

  2. UI/UX & Layout:
     - Evaluate consistency with established design patterns and visual language.
     - Identify broken layouts, responsiveness issues, or visual regressions.
     - Highlight any UI/UX improvements or inconsistencies (spacing, alignment, interactions).

  3. Best Practices & Style:
     - Consistency with existing code style (naming, patterns, formatting).
     - Performance considerations (rendering efficiency, bundle size, hooks usage).
     - Maintainability (separation of concerns, readability, reusability).

  4. Security & Accessibility:
     - Potential security vulnerabilities (XSS, injection, insecure dependencies).
     - Accessibility gaps (ARIA attributes, keyboard navigation, color contrast, screen reader support).

  5. Test Coverage:
     - Identify missing unit or integration tests for new or modified components.
     - Recommend specific test cases and strategies to improve coverage.

  6. Suggestions & References:
     - Provide concrete code snippets or links to relevant documentation and standards.

FORMAT:
- Use Markdown with headings for each section.
- Bullet-point feedback under each heading.
- If you reference a specific file or line number, prefix with `File: <path>`.
";

const HUNK_INSTRUCTION: &str = "Give a concise, clear summary for a code review comment. \
Only describe what and why, do not repeat the code.";

/// Build the narrative review prompt for a whole pull request.
///
/// Contains the metadata document as pretty JSON, the newline-joined list
/// of changed paths, and one unified-diff excerpt per file capped at
/// `excerpt_lines` rendered lines.
///
/// # Examples
///
/// ```
/// use herald_core::{FileSnapshotPair, PullRequestMeta};
/// use herald_review::prompt::build_review_prompt;
///
/// let meta = PullRequestMeta::from_json(serde_json::json!({"title": "Fix nav"})).unwrap();
/// let files = vec![FileSnapshotPair::new("/nav.tsx", "a\n", "b\n")];
/// let prompt = build_review_prompt(&meta, "/nav.tsx", &files, 200);
/// assert!(prompt.contains("\"title\": \"Fix nav\""));
/// assert!(prompt.contains("--- /nav.tsx ---"));
/// assert!(prompt.contains("+b"));
/// ```
pub fn build_review_prompt(
    meta: &PullRequestMeta,
    changed_paths: &str,
    files: &[FileSnapshotPair],
    excerpt_lines: usize,
) -> String {
    let metadata = serde_json::to_string_pretty(&meta.raw).unwrap_or_else(|_| "{}".into());

    let mut prompt = String::new();
    let _ = writeln!(prompt, "{REVIEWER_PERSONA}\n");
    let _ = writeln!(prompt, "PR Metadata:\n{metadata}\n");
    let _ = writeln!(
        prompt,
        "Changed Files:\nList of file paths that were modified:\n{changed_paths}\n"
    );
    prompt.push_str("File Contents:\n");
    prompt.push_str("For each file above, you have the 'before' and 'after' code as a unified diff.\n");
    for file in files {
        let diff = excerpt(file, DEFAULT_CONTEXT, excerpt_lines);
        let _ = writeln!(prompt, "--- {} ---\n{diff}\n", file.path);
    }
    prompt.push('\n');
    prompt.push_str(REVIEW_TASK);
    prompt
}

/// Build the summary request for one hunk.
///
/// # Examples
///
/// ```
/// use herald_core::FileSnapshotPair;
/// use herald_difflens::hunk::segment;
/// use herald_review::prompt::build_hunk_prompt;
///
/// let pair = FileSnapshotPair::new("/a.ts", "a\nb\nc\n", "a\nx\nc\n");
/// let hunk = &segment(&pair)[0];
/// let prompt = build_hunk_prompt(hunk);
/// assert!(prompt.starts_with("File: /a.ts\nLines 2-2:"));
/// assert!(prompt.contains("--- BEFORE ---\nb\n--- AFTER ---\nx\n"));
/// ```
pub fn build_hunk_prompt(hunk: &Hunk) -> String {
    format!(
        "File: {path}\n\
         Lines {start}-{end}: summarize the change below for a code reviewer.\n\
         --- BEFORE ---\n{before}\n\
         --- AFTER ---\n{after}\n\
         {HUNK_INSTRUCTION}",
        path = hunk.path,
        start = hunk.after_range.start + 1,
        end = hunk.after_range.end,
        before = hunk.before_lines.join("\n"),
        after = hunk.after_lines.join("\n"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use herald_difflens::hunk::segment;

    fn meta() -> PullRequestMeta {
        PullRequestMeta::from_json(serde_json::json!({
            "pullRequestId": 5,
            "title": "Responsive header",
            "createdBy": { "displayName": "Eve" }
        }))
        .unwrap()
    }

    #[test]
    fn review_prompt_has_every_section() {
        let files = vec![
            FileSnapshotPair::new("/a.css", "x\n", "y\n"),
            FileSnapshotPair::new("/b.tsx", "1\n2\n", "1\n3\n"),
        ];
        let prompt = build_review_prompt(&meta(), "/a.css\n/b.tsx", &files, 200);
        assert!(prompt.starts_with(REVIEWER_PERSONA));
        assert!(prompt.contains("\"createdBy\""));
        assert!(prompt.contains("modified:\n/a.css\n/b.tsx\n"));
        assert!(prompt.contains("--- /a.css ---\n--- a/a.css\n+++ b/a.css"));
        assert!(prompt.contains("--- /b.tsx ---"));
        for heading in [
            "Summary of Changes",
            "UI/UX & Layout",
            "Best Practices & Style",
            "Security & Accessibility",
            "Test Coverage",
            "Suggestions & References",
        ] {
            assert!(prompt.contains(heading), "missing {heading}");
        }
    }

    #[test]
    fn review_prompt_caps_excerpt() {
        let before: String = (0..50).map(|i| format!("old {i}\n")).collect();
        let after: String = (0..50).map(|i| format!("new {i}\n")).collect();
        let files = vec![FileSnapshotPair::new("/big.ts", before, after)];
        let prompt = build_review_prompt(&meta(), "/big.ts", &files, 5);
        assert!(prompt.contains("-old 1\n"));
        assert!(!prompt.contains("-old 2\n"));
    }

    #[test]
    fn hunk_prompt_uses_one_based_after_range() {
        let pair = FileSnapshotPair::new("/a.ts", "a\nz\n", "a\nb\nc\nd\nz\n");
        let hunks = segment(&pair);
        let prompt = build_hunk_prompt(&hunks[0]);
        assert!(prompt.contains("Lines 2-4: summarize"));
        assert!(prompt.contains("--- BEFORE ---\n\n--- AFTER ---\nb\nc\nd\n"));
        assert!(prompt.ends_with(HUNK_INSTRUCTION));
    }
}
