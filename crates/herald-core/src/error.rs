/// Boxed cause attached to upstream failures.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors that can occur during a review run.
///
/// Every variant is fatal for the run: nothing in the pipeline retries.
/// Library crates use this type directly; it implements
/// [`miette::Diagnostic`] so the binary can render it with codes and hints.
///
/// # Examples
///
/// ```
/// use herald_core::HeraldError;
///
/// let err = HeraldError::Config("SLACK_CHANNEL_IDS is empty".into());
/// assert!(err.to_string().contains("SLACK_CHANNEL_IDS"));
/// ```
#[derive(Debug, thiserror::Error, miette::Diagnostic)]
pub enum HeraldError {
    /// A referenced repository, pull request or iteration does not exist.
    #[error("not found: {0}")]
    #[diagnostic(
        code(herald::not_found),
        help("check the pull request id and the azure.project / azure.repository settings")
    )]
    NotFound(String),

    /// Unexpected status, malformed payload or inconsistent data from a platform.
    #[error("upstream error: {message}")]
    #[diagnostic(code(herald::upstream))]
    Upstream {
        /// What the pipeline was doing when the platform misbehaved.
        message: String,
        /// Underlying transport or decoding failure, when there is one.
        #[source]
        source: Option<BoxError>,
    },

    /// Invalid or missing configuration.
    #[error("configuration error: {0}")]
    #[diagnostic(
        code(herald::config),
        help("run `herald init` for a template, or set the matching environment variable")
    )]
    Config(String),

    /// Text-generation API or response error.
    #[error("LLM error: {0}")]
    #[diagnostic(code(herald::llm))]
    Llm(String),

    /// Filesystem I/O failure.
    #[error("IO error: {0}")]
    #[diagnostic(code(herald::io))]
    Io(#[from] std::io::Error),

    /// JSON serialization / deserialization failure.
    #[error("serialization error: {0}")]
    #[diagnostic(code(herald::serialization))]
    Serialization(#[from] serde_json::Error),

    /// TOML deserialization failure.
    #[error("TOML parse error: {0}")]
    #[diagnostic(
        code(herald::toml),
        help("compare with the template written by `herald init`")
    )]
    Toml(#[from] toml::de::Error),
}

impl HeraldError {
    /// Upstream failure without an underlying cause.
    ///
    /// # Examples
    ///
    /// ```
    /// use herald_core::HeraldError;
    ///
    /// let err = HeraldError::upstream("iteration list is empty");
    /// assert_eq!(err.to_string(), "upstream error: iteration list is empty");
    /// ```
    pub fn upstream(message: impl Into<String>) -> Self {
        HeraldError::Upstream {
            message: message.into(),
            source: None,
        }
    }

    /// Upstream failure carrying the original cause.
    pub fn upstream_with<E>(message: impl Into<String>, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        HeraldError::Upstream {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// `true` for [`HeraldError::NotFound`].
    pub fn is_not_found(&self) -> bool {
        matches!(self, HeraldError::NotFound(_))
    }
}
