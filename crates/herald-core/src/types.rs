use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::HeraldError;

/// Immutable identity of one review run.
///
/// # Examples
///
/// ```
/// use herald_core::PullRequestRef;
///
/// let pr = PullRequestRef::new("b1f2", 42);
/// assert_eq!(pr.to_string(), "b1f2!42");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PullRequestRef {
    /// Platform id of the repository (a GUID on Azure DevOps).
    pub repository_id: String,
    /// Numeric pull request id.
    pub pull_request_id: u64,
}

impl PullRequestRef {
    /// Build a reference from its parts.
    pub fn new(repository_id: impl Into<String>, pull_request_id: u64) -> Self {
        Self {
            repository_id: repository_id.into(),
            pull_request_id,
        }
    }
}

impl fmt::Display for PullRequestRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}!{}", self.repository_id, self.pull_request_id)
    }
}

/// One pushed revision of a pull request.
///
/// # Examples
///
/// ```
/// use herald_core::Iteration;
///
/// let it = Iteration::new(3, "abc123", "def456").unwrap();
/// assert_eq!(it.iteration_id, 3);
/// assert!(Iteration::new(4, "", "def456").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Iteration {
    /// Monotonically increasing iteration number.
    pub iteration_id: u64,
    /// Head commit of the source branch at this iteration.
    pub source_commit: String,
    /// Merge base with the target branch.
    pub base_commit: String,
}

impl Iteration {
    /// Build an iteration, rejecting empty commit ids.
    ///
    /// # Errors
    ///
    /// Returns [`HeraldError::Upstream`] if either commit id is blank.
    pub fn new(
        iteration_id: u64,
        source_commit: impl Into<String>,
        base_commit: impl Into<String>,
    ) -> Result<Self, HeraldError> {
        let source_commit = source_commit.into();
        let base_commit = base_commit.into();
        if source_commit.trim().is_empty() || base_commit.trim().is_empty() {
            return Err(HeraldError::upstream(format!(
                "iteration {iteration_id} is missing its source or base commit"
            )));
        }
        Ok(Self {
            iteration_id,
            source_commit,
            base_commit,
        })
    }
}

/// Kind of change the platform reports for a path.
///
/// # Examples
///
/// ```
/// use herald_core::ChangeKind;
///
/// assert_eq!(ChangeKind::parse("edit"), ChangeKind::Edit);
/// assert_eq!(ChangeKind::parse("edit, rename"), ChangeKind::Rename);
/// assert_eq!(ChangeKind::parse("add"), ChangeKind::Add);
/// assert!(ChangeKind::Edit.is_reviewable());
/// assert!(!ChangeKind::Delete.is_reviewable());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    /// Path introduced by the pull request.
    Add,
    /// Content changed in place.
    Edit,
    /// Path moved, possibly with edits.
    Rename,
    /// Path removed by the pull request.
    Delete,
    /// Anything else the platform reports (branch, encoding, lock...).
    Other,
}

impl ChangeKind {
    /// Parse a platform change type, including comma-joined flag sets such as
    /// `"edit, rename"`.
    ///
    /// Flags containing `add` or `delete` win over `edit`/`rename`: such a path
    /// has no meaningful before/after pair.
    pub fn parse(raw: &str) -> Self {
        let flags: Vec<String> = raw
            .split(',')
            .map(|f| f.trim().to_lowercase())
            .filter(|f| !f.is_empty())
            .collect();
        let has = |name: &str| flags.iter().any(|f| f == name);

        if has("add") {
            ChangeKind::Add
        } else if has("delete") {
            ChangeKind::Delete
        } else if has("rename") {
            ChangeKind::Rename
        } else if has("edit") {
            ChangeKind::Edit
        } else {
            ChangeKind::Other
        }
    }

    /// Only edits and renames take part in hunk-level review.
    pub fn is_reviewable(self) -> bool {
        matches!(self, ChangeKind::Edit | ChangeKind::Rename)
    }
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChangeKind::Add => write!(f, "add"),
            ChangeKind::Edit => write!(f, "edit"),
            ChangeKind::Rename => write!(f, "rename"),
            ChangeKind::Delete => write!(f, "delete"),
            ChangeKind::Other => write!(f, "other"),
        }
    }
}

/// A path listed in an iteration's change set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangedFile {
    /// Repository path, e.g. `/src/app.ts`.
    pub path: String,
    /// What happened to the path.
    pub change_kind: ChangeKind,
}

/// Before/after content of one changed path.
///
/// A side the platform reports as absent is an empty string.
///
/// # Examples
///
/// ```
/// use herald_core::FileSnapshotPair;
///
/// let pair = FileSnapshotPair::new("/a.txt", "a\nb\n", "a\nx\n");
/// assert_eq!(pair.path, "/a.txt");
/// assert!(!pair.is_unchanged());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileSnapshotPair {
    /// Repository path.
    pub path: String,
    /// Content at the base commit.
    pub before_text: String,
    /// Content at the source commit.
    pub after_text: String,
}

impl FileSnapshotPair {
    /// Build a pair from its parts.
    pub fn new(
        path: impl Into<String>,
        before_text: impl Into<String>,
        after_text: impl Into<String>,
    ) -> Self {
        Self {
            path: path.into(),
            before_text: before_text.into(),
            after_text: after_text.into(),
        }
    }

    /// `true` when both sides are byte-identical.
    pub fn is_unchanged(&self) -> bool {
        self.before_text == self.after_text
    }
}

/// A review comment anchored to a line of the new file version.
///
/// # Examples
///
/// ```
/// use herald_core::InlineComment;
///
/// let c = InlineComment {
///     path: "/src/app.ts".into(),
///     line_number: 12,
///     content: "Adds input validation.".into(),
/// };
/// assert_eq!(c.line_number, 12);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InlineComment {
    /// Repository path the comment is attached to.
    pub path: String,
    /// 1-based line in the new version.
    pub line_number: u32,
    /// Comment body.
    pub content: String,
}

/// The narrative review of the whole pull request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewSummary {
    /// Markdown returned by the text-generation service, unmodified.
    pub markdown_text: String,
}

/// A reviewer entry from pull request metadata.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reviewer {
    /// Sign-in name; an email address for most Azure DevOps accounts.
    #[serde(default)]
    pub unique_name: Option<String>,
    /// Explicit email, when the platform provides one.
    #[serde(default)]
    pub email: Option<String>,
    /// Human-readable name.
    #[serde(default)]
    pub display_name: Option<String>,
}

impl Reviewer {
    /// Case-folded email-like identity: `uniqueName`, falling back to `email`.
    ///
    /// # Examples
    ///
    /// ```
    /// use herald_core::Reviewer;
    ///
    /// let r = Reviewer {
    ///     unique_name: Some("Alice@Example.com".into()),
    ///     ..Reviewer::default()
    /// };
    /// assert_eq!(r.identity().as_deref(), Some("alice@example.com"));
    /// ```
    pub fn identity(&self) -> Option<String> {
        self.unique_name
            .as_deref()
            .filter(|s| !s.is_empty())
            .or_else(|| self.email.as_deref().filter(|s| !s.is_empty()))
            .map(str::to_lowercase)
    }
}

/// Repository block embedded in pull request metadata.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepositoryInfo {
    /// Repository id.
    #[serde(default)]
    pub id: String,
    /// Repository name.
    #[serde(default)]
    pub name: Option<String>,
}

/// Pull request metadata used for prompting and announcing.
///
/// The full platform document is kept in [`PullRequestMeta::raw`] so the
/// narrative prompt sees every field, not just the typed subset.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PullRequestMeta {
    /// Numeric pull request id.
    #[serde(default)]
    pub pull_request_id: u64,
    /// Title.
    #[serde(default)]
    pub title: String,
    /// Description body.
    #[serde(default)]
    pub description: Option<String>,
    /// Source branch ref.
    #[serde(default)]
    pub source_ref_name: Option<String>,
    /// Target branch ref.
    #[serde(default)]
    pub target_ref_name: Option<String>,
    /// Assigned reviewers.
    #[serde(default)]
    pub reviewers: Vec<Reviewer>,
    /// Owning repository.
    #[serde(default)]
    pub repository: RepositoryInfo,
    /// The document exactly as the platform returned it.
    #[serde(skip)]
    pub raw: serde_json::Value,
}

impl PullRequestMeta {
    /// Decode metadata from a platform JSON document, keeping the original.
    ///
    /// # Errors
    ///
    /// Returns [`HeraldError::Serialization`] if typed fields have the wrong shape.
    ///
    /// # Examples
    ///
    /// ```
    /// use herald_core::PullRequestMeta;
    ///
    /// let doc = serde_json::json!({
    ///     "pullRequestId": 7,
    ///     "title": "Add login",
    ///     "repository": { "id": "r-1", "name": "web" },
    ///     "reviewers": [{ "uniqueName": "bob@example.com" }]
    /// });
    /// let meta = PullRequestMeta::from_json(doc).unwrap();
    /// assert_eq!(meta.repository.id, "r-1");
    /// assert_eq!(meta.raw["title"], "Add login");
    /// ```
    pub fn from_json(doc: serde_json::Value) -> Result<Self, HeraldError> {
        let mut meta: Self = serde_json::from_value(doc.clone())?;
        meta.raw = doc;
        Ok(meta)
    }

    /// Case-folded reviewer identities, in metadata order, skipping entries
    /// without any email-like field.
    pub fn reviewer_identities(&self) -> Vec<String> {
        self.reviewers.iter().filter_map(Reviewer::identity).collect()
    }
}

/// Output format for CLI subcommands.
///
/// Implements [`FromStr`] so it can be used directly with `clap` argument parsing.
///
/// # Examples
///
/// ```
/// use herald_core::OutputFormat;
///
/// let fmt: OutputFormat = "json".parse().unwrap();
/// assert_eq!(fmt, OutputFormat::Json);
///
/// let fmt: OutputFormat = "md".parse().unwrap();
/// assert_eq!(fmt, OutputFormat::Markdown);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human-readable summary.
    #[default]
    Text,
    /// Machine-readable JSON with camelCase keys.
    Json,
    /// Markdown-formatted output.
    Markdown,
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::Markdown => write!(f, "markdown"),
        }
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            "markdown" | "md" => Ok(OutputFormat::Markdown),
            other => Err(format!("unknown output format: {other}")),
        }
    }
}
