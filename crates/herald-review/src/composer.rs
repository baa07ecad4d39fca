//! Stage 3: snapshots to a narrative review and per-hunk inline comments.

use std::fmt;

use futures::stream::{self, StreamExt, TryStreamExt};
use herald_core::{
    FileSnapshotPair, InlineComment, PullRequestMeta, ReviewConfig, ReviewSummary, Result,
};
use herald_difflens::hunk::{segment, Hunk};
use serde::Serialize;
use tracing::{debug, info};

use crate::capability::TextGenerator;
use crate::fetcher::FetchedChanges;
use crate::prompt;

/// Whether the composer had anything to work with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ComposeStatus {
    /// A review and comments were generated.
    Composed,
    /// No reviewable file changed; nothing was generated.
    NoChanges,
}

impl fmt::Display for ComposeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ComposeStatus::Composed => write!(f, "review composed"),
            ComposeStatus::NoChanges => {
                write!(f, "no file changes detected; no inline comments posted")
            }
        }
    }
}

/// Output of the compose stage.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Composition {
    /// Outcome.
    pub status: ComposeStatus,
    /// Narrative review; `None` only for [`ComposeStatus::NoChanges`].
    pub summary: Option<ReviewSummary>,
    /// Comments in file order, then hunk discovery order.
    pub comments: Vec<InlineComment>,
    /// Significant hunks found across all files, before the per-file cap.
    pub hunks_found: usize,
}

impl Composition {
    fn no_changes() -> Self {
        Self {
            status: ComposeStatus::NoChanges,
            summary: None,
            comments: Vec::new(),
            hunks_found: 0,
        }
    }
}

/// Significant hunks of every file, capped at `max_per_file` each, in file
/// order then discovery order. Also returns the uncapped count.
///
/// # Examples
///
/// ```
/// use herald_core::FileSnapshotPair;
/// use herald_review::composer::select_hunks;
///
/// let files = vec![FileSnapshotPair::new("/a", "1\n2\n3\n", "x\n2\ny\n")];
/// let (hunks, found) = select_hunks(&files, 1);
/// assert_eq!(found, 2);
/// assert_eq!(hunks.len(), 1);
/// assert_eq!(hunks[0].target_line(), 1);
/// ```
pub fn select_hunks(files: &[FileSnapshotPair], max_per_file: usize) -> (Vec<Hunk>, usize) {
    let mut found = 0;
    let mut selected = Vec::new();
    for file in files {
        let hunks = segment(file);
        debug!(path = %file.path, hunks = hunks.len(), "segmented");
        found += hunks.len();
        selected.extend(hunks.into_iter().take(max_per_file));
    }
    (selected, found)
}

/// Generate the narrative review and the inline comments.
///
/// The narrative request and the per-hunk requests run concurrently; hunk
/// requests are bounded by `config.concurrency` and each result stays
/// attached to its hunk. With no files, returns
/// [`ComposeStatus::NoChanges`] without calling either generator.
///
/// # Errors
///
/// Propagates the first generator failure.
pub async fn compose(
    narrator: &dyn TextGenerator,
    summarizer: &dyn TextGenerator,
    meta: &PullRequestMeta,
    changes: &FetchedChanges,
    config: &ReviewConfig,
) -> Result<Composition> {
    if changes.is_empty() {
        info!("no reviewable file changes");
        return Ok(Composition::no_changes());
    }

    let (hunks, hunks_found) = select_hunks(&changes.files, config.max_comments_per_file);
    debug!(
        found = hunks_found,
        selected = hunks.len(),
        "hunks selected for comments"
    );

    let review_prompt =
        prompt::build_review_prompt(meta, &changes.diff, &changes.files, config.excerpt_lines);
    let narrative = narrator.generate(&review_prompt);

    let comments = stream::iter(hunks.iter())
        .map(|hunk| summarize(summarizer, hunk))
        .buffered(config.concurrency.max(1))
        .try_collect::<Vec<_>>();

    let (markdown_text, comments) = futures::try_join!(narrative, comments)?;
    info!(comments = comments.len(), "review composed");

    Ok(Composition {
        status: ComposeStatus::Composed,
        summary: Some(ReviewSummary { markdown_text }),
        comments,
        hunks_found,
    })
}

async fn summarize(summarizer: &dyn TextGenerator, hunk: &Hunk) -> Result<InlineComment> {
    let text = summarizer.generate(&prompt::build_hunk_prompt(hunk)).await?;
    Ok(InlineComment {
        path: hunk.path.clone(),
        line_number: hunk.target_line(),
        content: text.trim().to_string(),
    })
}
