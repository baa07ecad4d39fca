use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::HeraldError;

/// Top-level configuration loaded from `.herald.toml`.
///
/// Supports layered resolution: CLI flags > env vars > local config > defaults.
///
/// # Examples
///
/// ```
/// use herald_core::HeraldConfig;
///
/// let config = HeraldConfig::default();
/// assert_eq!(config.review.max_comments_per_file, 3);
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HeraldConfig {
    /// Azure DevOps connection settings.
    #[serde(default)]
    pub azure: AzureConfig,
    /// Slack announcement settings.
    #[serde(default)]
    pub slack: SlackConfig,
    /// LLM provider settings.
    #[serde(default)]
    pub llm: LlmConfig,
    /// Review behavior settings.
    #[serde(default)]
    pub review: ReviewConfig,
}

impl HeraldConfig {
    /// Load configuration from a TOML file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`HeraldError::Io`] if the file cannot be read, or
    /// [`HeraldError::Toml`] if the content is not valid TOML.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use herald_core::HeraldConfig;
    /// use std::path::Path;
    ///
    /// let config = HeraldConfig::from_file(Path::new(".herald.toml")).unwrap();
    /// ```
    pub fn from_file(path: &Path) -> Result<Self, HeraldError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns [`HeraldError::Toml`] if parsing fails.
    ///
    /// # Examples
    ///
    /// ```
    /// use herald_core::HeraldConfig;
    ///
    /// let toml = r#"
    /// [review]
    /// max_comments_per_file = 5
    /// "#;
    /// let config = HeraldConfig::from_toml(toml).unwrap();
    /// assert_eq!(config.review.max_comments_per_file, 5);
    /// ```
    pub fn from_toml(content: &str) -> Result<Self, HeraldError> {
        let config: Self = toml::from_str(content)?;
        Ok(config)
    }

    /// Overlay values from the process environment.
    pub fn apply_env(&mut self) {
        self.apply_env_from(|key| std::env::var(key).ok());
    }

    /// Overlay values from an arbitrary variable lookup.
    ///
    /// Empty values are ignored so an exported-but-blank variable never
    /// clobbers a value from the file.
    ///
    /// # Examples
    ///
    /// ```
    /// use herald_core::HeraldConfig;
    ///
    /// let mut config = HeraldConfig::default();
    /// config.apply_env_from(|key| match key {
    ///     "GPT_MODEL" => Some("gpt-4o".to_string()),
    ///     _ => None,
    /// });
    /// assert_eq!(config.llm.model, "gpt-4o");
    /// ```
    pub fn apply_env_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = get("AZURE_DEVOPS_ORG_URL") {
            self.azure.org_url = Some(v);
        }
        if let Some(v) = get("AZURE_DEVOPS_DEFAULT_PROJECT") {
            self.azure.project = Some(v);
        }
        if let Some(v) = get("AZURE_DEVOPS_DEFAULT_REPO") {
            self.azure.repository = Some(v);
        }
        if let Some(v) = get("AZURE_DEVOPS_PAT") {
            self.azure.pat = Some(v);
        }
        if let Some(v) = get("SLACK_BOT_TOKEN") {
            self.slack.bot_token = Some(v);
        }
        if let Some(v) = get("SLACK_TEAM_ID") {
            self.slack.team_id = Some(v);
        }
        if let Some(v) = get("SLACK_CHANNEL_IDS") {
            self.slack.channel_ids = v;
        }
        if let Some(v) = get("OPENAI_API_KEY") {
            self.llm.api_key = Some(v);
        }
        if let Some(v) = get("GPT_MODEL") {
            self.llm.model = v;
        }
    }

    /// Check that everything a run needs is present before any network call.
    ///
    /// Slack settings are only required when `announce` is `true`.
    ///
    /// # Errors
    ///
    /// Returns [`HeraldError::Config`] naming the first missing setting.
    pub fn validate(&self, announce: bool) -> Result<(), HeraldError> {
        require(&self.azure.org_url, "azure.org_url (AZURE_DEVOPS_ORG_URL)")?;
        require(&self.azure.project, "azure.project (AZURE_DEVOPS_DEFAULT_PROJECT)")?;
        require(&self.azure.pat, "azure.pat (AZURE_DEVOPS_PAT)")?;
        if self.azure.resolve_by_name {
            require(
                &self.azure.repository,
                "azure.repository (AZURE_DEVOPS_DEFAULT_REPO)",
            )?;
        }
        require(&self.llm.api_key, "llm.api_key (OPENAI_API_KEY)")?;
        if announce {
            require(&self.slack.bot_token, "slack.bot_token (SLACK_BOT_TOKEN)")?;
            self.slack.primary_channel()?;
        }
        if self.review.concurrency == 0 {
            return Err(HeraldError::Config(
                "review.concurrency must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

fn require(value: &Option<String>, name: &str) -> Result<(), HeraldError> {
    match value.as_deref().map(str::trim) {
        Some(v) if !v.is_empty() => Ok(()),
        _ => Err(HeraldError::Config(format!("{name} is not set"))),
    }
}

/// Azure DevOps connection settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AzureConfig {
    /// Organization URL, e.g. `https://dev.azure.com/contoso`.
    pub org_url: Option<String>,
    /// Project that owns the repository.
    pub project: Option<String>,
    /// Repository name, used when resolving the repository by name.
    pub repository: Option<String>,
    /// Personal access token.
    pub pat: Option<String>,
    /// Resolve the repository by listing the project's repositories instead
    /// of reading it from the pull request (default: false).
    #[serde(default)]
    pub resolve_by_name: bool,
}

/// Slack announcement settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SlackConfig {
    /// Bot token (`xoxb-...`).
    pub bot_token: Option<String>,
    /// Workspace id, forwarded to `users.list`.
    pub team_id: Option<String>,
    /// Comma-separated channel ids; only the first is used.
    #[serde(default)]
    pub channel_ids: String,
}

impl SlackConfig {
    /// The channel announcements go to: the first non-empty entry of
    /// [`SlackConfig::channel_ids`].
    ///
    /// # Errors
    ///
    /// Returns [`HeraldError::Config`] if the list has no entries.
    ///
    /// # Examples
    ///
    /// ```
    /// use herald_core::SlackConfig;
    ///
    /// let slack = SlackConfig {
    ///     channel_ids: "C01, C02".into(),
    ///     ..SlackConfig::default()
    /// };
    /// assert_eq!(slack.primary_channel().unwrap(), "C01");
    /// assert!(SlackConfig::default().primary_channel().is_err());
    /// ```
    pub fn primary_channel(&self) -> Result<&str, HeraldError> {
        self.channel_ids
            .split(',')
            .map(str::trim)
            .find(|c| !c.is_empty())
            .ok_or_else(|| HeraldError::Config("no Slack channel ids configured".into()))
    }
}

/// LLM provider configuration.
///
/// # Examples
///
/// ```
/// use herald_core::LlmConfig;
///
/// let config = LlmConfig::default();
/// assert_eq!(config.model, "gpt-4o-mini");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Provider name (any OpenAI-compatible endpoint).
    #[serde(default = "default_provider")]
    pub provider: String,
    /// Model identifier.
    #[serde(default = "default_model")]
    pub model: String,
    /// API key for the provider.
    pub api_key: Option<String>,
    /// Custom base URL for API requests.
    pub base_url: Option<String>,
    /// Sampling temperature for the narrative review (default: 0.1).
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    /// Sampling temperature for per-hunk summaries (default: 0.2).
    #[serde(default = "default_comment_temperature")]
    pub comment_temperature: f64,
}

fn default_provider() -> String {
    "openai".into()
}

fn default_model() -> String {
    "gpt-4o-mini".into()
}

fn default_temperature() -> f64 {
    0.1
}

fn default_comment_temperature() -> f64 {
    0.2
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: default_model(),
            api_key: None,
            base_url: None,
            temperature: default_temperature(),
            comment_temperature: default_comment_temperature(),
        }
    }
}

/// Review behavior configuration.
///
/// # Examples
///
/// ```
/// use herald_core::ReviewConfig;
///
/// let config = ReviewConfig::default();
/// assert_eq!(config.max_comments_per_file, 3);
/// assert_eq!(config.excerpt_lines, 200);
/// assert_eq!(config.concurrency, 4);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewConfig {
    /// Maximum inline comments per file (default: 3).
    #[serde(default = "default_max_comments_per_file")]
    pub max_comments_per_file: usize,
    /// Rendered unified-diff lines per file in the narrative prompt (default: 200).
    #[serde(default = "default_excerpt_lines")]
    pub excerpt_lines: usize,
    /// Upper bound on in-flight content fetches and summary requests (default: 4).
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
}

fn default_max_comments_per_file() -> usize {
    3
}

fn default_excerpt_lines() -> usize {
    200
}

fn default_concurrency() -> usize {
    4
}

impl Default for ReviewConfig {
    fn default() -> Self {
        Self {
            max_comments_per_file: default_max_comments_per_file(),
            excerpt_lines: default_excerpt_lines(),
            concurrency: default_concurrency(),
        }
    }
}
