use std::fmt;

use herald_core::{HeraldConfig, InlineComment, PullRequestRef, ReviewConfig, Result};
use serde::Serialize;
use tracing::{info, info_span, Instrument};

use crate::capability::Capabilities;
use crate::composer::{self, ComposeStatus};
use crate::fetcher;
use crate::publisher::{self, PublishSettings};
use crate::resolver;

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum RunStatus {
    /// Comments posted and the review announced.
    Published,
    /// Everything generated, nothing posted.
    DryRun,
    /// No reviewable file changed.
    NoChanges,
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunStatus::Published => write!(f, "summary and inline comments posted"),
            RunStatus::DryRun => write!(f, "dry run; nothing posted"),
            RunStatus::NoChanges => {
                write!(f, "no file changes detected; no inline comments posted")
            }
        }
    }
}

/// Result of one review run.
///
/// # Examples
///
/// ```
/// use herald_core::PullRequestRef;
/// use herald_review::pipeline::{RunReport, RunStatus};
///
/// let report = RunReport {
///     pull_request: PullRequestRef::new("repo", 7),
///     title: "Add login".into(),
///     iteration_id: 2,
///     files_reviewed: 0,
///     hunks_found: 0,
///     comments: vec![],
///     comments_posted: 0,
///     announced: false,
///     summary: None,
///     status: RunStatus::NoChanges,
/// };
/// assert!(report.to_string().contains("no file changes"));
/// ```
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunReport {
    /// The reviewed pull request.
    pub pull_request: PullRequestRef,
    /// Pull request title.
    pub title: String,
    /// Iteration the review is based on.
    pub iteration_id: u64,
    /// Edited or renamed files that were diffed.
    pub files_reviewed: usize,
    /// Significant hunks before the per-file cap.
    pub hunks_found: usize,
    /// Generated inline comments.
    pub comments: Vec<InlineComment>,
    /// Inline comments actually posted.
    pub comments_posted: usize,
    /// Whether the chat announcement went out.
    pub announced: bool,
    /// Narrative review markdown.
    pub summary: Option<String>,
    /// Outcome.
    pub status: RunStatus,
}

/// Drives one pull request through resolve, fetch, compose and publish.
pub struct ReviewPipeline {
    caps: Capabilities,
    review: ReviewConfig,
    repository_name: Option<String>,
    publish: PublishSettings,
}

impl ReviewPipeline {
    /// Assemble a pipeline from capability handles and explicit settings.
    pub fn new(
        caps: Capabilities,
        review: ReviewConfig,
        repository_name: Option<String>,
        publish: PublishSettings,
    ) -> Self {
        Self {
            caps,
            review,
            repository_name,
            publish,
        }
    }

    /// Assemble a pipeline from loaded configuration.
    ///
    /// # Errors
    ///
    /// Returns [`herald_core::HeraldError::Config`] if the organization URL
    /// or project is missing.
    pub fn from_config(caps: Capabilities, config: &HeraldConfig, dry_run: bool) -> Result<Self> {
        let repository_name = if config.azure.resolve_by_name {
            config.azure.repository.clone()
        } else {
            None
        };
        Ok(Self::new(
            caps,
            config.review.clone(),
            repository_name,
            PublishSettings::from_config(config, dry_run)?,
        ))
    }

    /// Run every stage in order. The first error aborts the run; anything
    /// already posted stays posted.
    ///
    /// # Errors
    ///
    /// Propagates the failing stage's [`herald_core::HeraldError`].
    pub async fn run(&self, pull_request_id: u64) -> Result<RunReport> {
        let caps = &self.caps;

        let resolution = resolver::resolve(
            caps.source.as_ref(),
            pull_request_id,
            self.repository_name.as_deref(),
        )
        .instrument(info_span!("resolve", pull_request_id))
        .await?;

        let changes = fetcher::fetch_changes(
            caps.source.as_ref(),
            caps.content.as_ref(),
            &resolution.pull_request,
            &resolution.iteration,
            self.review.concurrency,
        )
        .instrument(info_span!("fetch", iteration = resolution.iteration.iteration_id))
        .await?;

        let composition = composer::compose(
            caps.narrator.as_ref(),
            caps.summarizer.as_ref(),
            &resolution.meta,
            &changes,
            &self.review,
        )
        .instrument(info_span!("compose", files = changes.files.len()))
        .await?;

        let publication = publisher::publish(
            caps.comments.as_ref(),
            caps.directory.as_ref(),
            caps.chat.as_ref(),
            &self.publish,
            &resolution,
            &composition,
        )
        .instrument(info_span!("publish", dry_run = self.publish.dry_run))
        .await?;

        let status = match composition.status {
            ComposeStatus::NoChanges => RunStatus::NoChanges,
            ComposeStatus::Composed if self.publish.dry_run => RunStatus::DryRun,
            ComposeStatus::Composed => RunStatus::Published,
        };
        info!(pr = %resolution.pull_request, %status, "run finished");

        Ok(RunReport {
            pull_request: resolution.pull_request,
            title: resolution.meta.title,
            iteration_id: resolution.iteration.iteration_id,
            files_reviewed: changes.files.len(),
            hunks_found: composition.hunks_found,
            comments: composition.comments,
            comments_posted: publication.comments_posted,
            announced: publication.announced,
            summary: composition.summary.map(|s| s.markdown_text),
            status,
        })
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Review of PR {}: {}", self.pull_request.pull_request_id, self.title)?;
        writeln!(f, "==============")?;
        writeln!(
            f,
            "Iteration: {} | Files: {} | Hunks: {} | Comments: {} (posted: {}) | Announced: {}\n",
            self.iteration_id,
            self.files_reviewed,
            self.hunks_found,
            self.comments.len(),
            self.comments_posted,
            if self.announced { "yes" } else { "no" },
        )?;

        for c in &self.comments {
            writeln!(f, "{}:{}", c.path, c.line_number)?;
            writeln!(f, "  {}", c.content)?;
            writeln!(f)?;
        }
        if let Some(summary) = &self.summary {
            writeln!(f, "{summary}\n")?;
        }
        writeln!(f, "Status: {}", self.status)
    }
}

impl RunReport {
    /// Render the report as markdown.
    ///
    /// # Examples
    ///
    /// ```
    /// use herald_core::{InlineComment, PullRequestRef};
    /// use herald_review::pipeline::{RunReport, RunStatus};
    ///
    /// let report = RunReport {
    ///     pull_request: PullRequestRef::new("repo", 7),
    ///     title: "Add login".into(),
    ///     iteration_id: 2,
    ///     files_reviewed: 1,
    ///     hunks_found: 1,
    ///     comments: vec![InlineComment {
    ///         path: "/a.ts".into(),
    ///         line_number: 4,
    ///         content: "Adds a guard.".into(),
    ///     }],
    ///     comments_posted: 1,
    ///     announced: true,
    ///     summary: Some("## Summary of Changes".into()),
    ///     status: RunStatus::Published,
    /// };
    /// let md = report.to_markdown();
    /// assert!(md.starts_with("# Review of PR 7: Add login"));
    /// assert!(md.contains("`/a.ts:4`"));
    /// ```
    pub fn to_markdown(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!(
            "# Review of PR {}: {}\n\n",
            self.pull_request.pull_request_id, self.title
        ));
        out.push_str(&format!(
            "**Iteration:** {} | **Files:** {} | **Hunks:** {} | **Comments:** {} (posted: {})\n\n",
            self.iteration_id,
            self.files_reviewed,
            self.hunks_found,
            self.comments.len(),
            self.comments_posted,
        ));

        if !self.comments.is_empty() {
            out.push_str("## Inline comments\n\n");
            for c in &self.comments {
                out.push_str(&format!("- `{}:{}` {}\n", c.path, c.line_number, c.content));
            }
            out.push('\n');
        }
        if let Some(summary) = &self.summary {
            out.push_str(summary);
            out.push_str("\n\n");
        }
        out.push_str(&format!("_{}_\n", self.status));
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(status: RunStatus) -> RunReport {
        RunReport {
            pull_request: PullRequestRef::new("repo", 11),
            title: "Sticky footer".into(),
            iteration_id: 3,
            files_reviewed: 2,
            hunks_found: 4,
            comments: vec![InlineComment {
                path: "/footer.css".into(),
                line_number: 12,
                content: "Pins the footer.".into(),
            }],
            comments_posted: 1,
            announced: true,
            summary: Some("## Summary of Changes\n- footer".into()),
            status,
        }
    }

    #[test]
    fn display_lists_comments_and_status() {
        let text = report(RunStatus::Published).to_string();
        assert!(text.contains("Review of PR 11: Sticky footer"));
        assert!(text.contains("/footer.css:12"));
        assert!(text.contains("Announced: yes"));
        assert!(text.contains("Status: summary and inline comments posted"));
    }

    #[test]
    fn markdown_includes_summary() {
        let md = report(RunStatus::DryRun).to_markdown();
        assert!(md.contains("## Inline comments"));
        assert!(md.contains("## Summary of Changes"));
        assert!(md.ends_with("_dry run; nothing posted_\n"));
    }

    #[test]
    fn report_serializes_camel_case() {
        let json = serde_json::to_value(report(RunStatus::NoChanges)).unwrap();
        assert_eq!(json["iterationId"], 3);
        assert_eq!(json["status"], "noChanges");
        assert_eq!(json["pullRequest"]["repositoryId"], "repo");
    }
}
