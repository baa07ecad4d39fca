//! Stage 2: iteration to before/after snapshots of every reviewable file.

use std::collections::HashSet;

use futures::stream::{self, StreamExt, TryStreamExt};
use herald_core::{ChangedFile, FileSnapshotPair, Iteration, PullRequestRef, Result};
use serde::Serialize;
use tracing::{debug, info};

use crate::capability::{ContentFetcher, PullRequestSource};

/// Output of the fetch stage.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FetchedChanges {
    /// Snapshots in platform change order.
    pub files: Vec<FileSnapshotPair>,
    /// Newline-joined paths of `files`.
    pub diff: String,
}

impl FetchedChanges {
    /// `true` when no reviewable file changed.
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

/// Edited and renamed paths, in platform order, first occurrence only.
///
/// # Examples
///
/// ```
/// use herald_core::{ChangeKind, ChangedFile};
/// use herald_review::fetcher::reviewable_paths;
///
/// let changes = vec![
///     ChangedFile { path: "/a".into(), change_kind: ChangeKind::Edit },
///     ChangedFile { path: "/b".into(), change_kind: ChangeKind::Add },
///     ChangedFile { path: "/a".into(), change_kind: ChangeKind::Rename },
/// ];
/// assert_eq!(reviewable_paths(&changes), vec!["/a"]);
/// ```
pub fn reviewable_paths(changes: &[ChangedFile]) -> Vec<&str> {
    let mut seen = HashSet::new();
    changes
        .iter()
        .filter(|c| c.change_kind.is_reviewable())
        .map(|c| c.path.as_str())
        .filter(|p| seen.insert(*p))
        .collect()
}

/// List the iteration's changes and fetch both sides of every edited or
/// renamed file.
///
/// Up to `concurrency` files are fetched at once; the output keeps the
/// platform's order regardless of completion order.
///
/// # Errors
///
/// Propagates the first listing or content error; nothing is retried.
pub async fn fetch_changes(
    source: &dyn PullRequestSource,
    content: &dyn ContentFetcher,
    pr: &PullRequestRef,
    iteration: &Iteration,
    concurrency: usize,
) -> Result<FetchedChanges> {
    let changes = source.list_changes(pr, iteration.iteration_id).await?;
    let paths = reviewable_paths(&changes);
    debug!(
        listed = changes.len(),
        reviewable = paths.len(),
        "filtered change entries"
    );

    let files: Vec<FileSnapshotPair> = stream::iter(paths.iter().copied())
        .map(|path| fetch_pair(content, &pr.repository_id, path, iteration))
        .buffered(concurrency.max(1))
        .try_collect()
        .await?;

    let diff = files
        .iter()
        .map(|f| f.path.as_str())
        .collect::<Vec<_>>()
        .join("\n");
    info!(files = files.len(), "fetched file snapshots");
    Ok(FetchedChanges { files, diff })
}

async fn fetch_pair(
    content: &dyn ContentFetcher,
    repository_id: &str,
    path: &str,
    iteration: &Iteration,
) -> Result<FileSnapshotPair> {
    let (before, after) = futures::try_join!(
        content.fetch_text(repository_id, path, &iteration.base_commit),
        content.fetch_text(repository_id, path, &iteration.source_commit),
    )?;
    Ok(FileSnapshotPair::new(path, before, after))
}
