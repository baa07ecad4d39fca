//! Capability traits the pipeline stages depend on.
//!
//! Each trait is one narrow slice of a platform API. The stages take
//! `&dyn Trait` handles, so the Azure DevOps, Slack and LLM clients in this
//! crate can be swapped for in-memory fakes in tests.

use std::sync::Arc;

use async_trait::async_trait;
use herald_core::{
    ChangedFile, InlineComment, PullRequestMeta, PullRequestRef, RepositoryInfo, Result,
};
use serde::{Deserialize, Serialize};

/// An iteration entry as the platform lists it.
///
/// Commit ids are optional here; only the selected iteration has to carry
/// both (see [`herald_core::Iteration::new`]).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IterationRecord {
    /// Iteration number.
    pub id: u64,
    /// Head of the source branch.
    pub source_commit: Option<String>,
    /// Merge base with the target branch.
    pub base_commit: Option<String>,
}

/// A chat workspace member.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatUser {
    /// Platform user id, used in `<@ID>` mentions.
    pub id: String,
    /// Profile email, if the member has one.
    pub email: Option<String>,
}

/// Read access to pull requests and their iterations.
#[async_trait]
pub trait PullRequestSource: Send + Sync {
    /// Metadata for a pull request in the configured project.
    async fn get_pull_request(&self, pull_request_id: u64) -> Result<PullRequestMeta>;

    /// Every repository in the configured project.
    async fn list_repositories(&self) -> Result<Vec<RepositoryInfo>>;

    /// All iterations of a pull request, in whatever order the platform returns.
    async fn list_iterations(&self, pr: &PullRequestRef) -> Result<Vec<IterationRecord>>;

    /// Change entries of one iteration, in platform order.
    async fn list_changes(
        &self,
        pr: &PullRequestRef,
        iteration_id: u64,
    ) -> Result<Vec<ChangedFile>>;
}

/// File content at a commit.
#[async_trait]
pub trait ContentFetcher: Send + Sync {
    /// Text of `path` at `commit`. A path absent at that commit yields `""`.
    async fn fetch_text(&self, repository_id: &str, path: &str, commit: &str) -> Result<String>;
}

/// Writes inline review comments.
#[async_trait]
pub trait CommentPoster: Send + Sync {
    /// Open an active comment thread on the new version of `comment.path`.
    async fn post_comment(&self, pr: &PullRequestRef, comment: &InlineComment) -> Result<()>;
}

/// Chat workspace member lookup.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Every member of the workspace.
    async fn list_users(&self) -> Result<Vec<ChatUser>>;
}

/// Posts chat messages.
#[async_trait]
pub trait ChatPoster: Send + Sync {
    /// Post `text` to `channel`.
    async fn post_message(&self, channel: &str, text: &str) -> Result<()>;
}

/// Prompt in, text out.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Return the raw completion for `prompt`.
    async fn generate(&self, prompt: &str) -> Result<String>;
}

/// Every handle a run needs, resolved once at wiring time.
///
/// `narrator` writes the pull-request review and `summarizer` the per-hunk
/// comments; they are usually the same model at different temperatures.
#[derive(Clone)]
pub struct Capabilities {
    /// Pull request and iteration queries.
    pub source: Arc<dyn PullRequestSource>,
    /// File content at a commit.
    pub content: Arc<dyn ContentFetcher>,
    /// Inline comment threads.
    pub comments: Arc<dyn CommentPoster>,
    /// Chat member directory.
    pub directory: Arc<dyn UserDirectory>,
    /// Chat messages.
    pub chat: Arc<dyn ChatPoster>,
    /// Narrative review generator.
    pub narrator: Arc<dyn TextGenerator>,
    /// Per-hunk summary generator.
    pub summarizer: Arc<dyn TextGenerator>,
}
