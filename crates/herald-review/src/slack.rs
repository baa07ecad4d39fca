use std::time::Duration;

use async_trait::async_trait;
use herald_core::{HeraldError, Result, SlackConfig};
use serde::Deserialize;
use tracing::debug;

use crate::capability::{ChatPoster, ChatUser, UserDirectory};

const DEFAULT_API_URL: &str = "https://slack.com/api";
const PAGE_SIZE: &str = "200";

/// Slack Web API client for member lookup and posting messages.
///
/// # Examples
///
/// ```
/// use herald_review::slack::SlackClient;
///
/// let client = SlackClient::with_base_url("http://localhost:9", "xoxb-test", None).unwrap();
/// ```
pub struct SlackClient {
    http: reqwest::Client,
    base_url: String,
    token: Option<String>,
    team_id: Option<String>,
}

impl SlackClient {
    /// Build a client from `[slack]` settings.
    ///
    /// A missing bot token is reported by the first API call, so a dry run
    /// can wire the client without Slack settings.
    ///
    /// # Errors
    ///
    /// Returns [`HeraldError::Upstream`] if the HTTP client cannot be built.
    pub fn new(config: &SlackConfig) -> Result<Self> {
        let mut client = Self::with_base_url(DEFAULT_API_URL, "", config.team_id.clone())?;
        client.token = config.bot_token.clone().filter(|t| !t.is_empty());
        Ok(client)
    }

    /// Build a client against an explicit API root (e.g. a test server).
    ///
    /// # Errors
    ///
    /// Returns [`HeraldError::Upstream`] if the HTTP client cannot be built.
    pub fn with_base_url(
        base_url: impl Into<String>,
        token: impl Into<String>,
        team_id: Option<String>,
    ) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| HeraldError::upstream_with("failed to create HTTP client", e))?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: Some(token.into()),
            team_id,
        })
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/{method}", self.base_url)
    }

    fn token(&self) -> Result<&str> {
        self.token
            .as_deref()
            .ok_or_else(|| HeraldError::Config("slack.bot_token is not set".into()))
    }
}

#[derive(Deserialize)]
struct Envelope<T> {
    ok: bool,
    error: Option<String>,
    #[serde(flatten)]
    body: T,
}

#[derive(Deserialize)]
struct UsersPage {
    #[serde(default)]
    members: Vec<Member>,
    response_metadata: Option<ResponseMetadata>,
}

#[derive(Deserialize)]
struct Member {
    id: String,
    #[serde(default)]
    profile: Profile,
}

#[derive(Deserialize, Default)]
struct Profile {
    email: Option<String>,
}

#[derive(Deserialize)]
struct ResponseMetadata {
    next_cursor: Option<String>,
}

/// Map a Slack envelope to its body, turning `ok: false` into an upstream error.
fn unwrap_envelope<T>(envelope: Envelope<T>, method: &str) -> Result<T> {
    if !envelope.ok {
        let reason = envelope.error.unwrap_or_else(|| "unknown_error".into());
        return Err(HeraldError::upstream(format!("slack {method} failed: {reason}")));
    }
    Ok(envelope.body)
}

async fn read_envelope<T: serde::de::DeserializeOwned>(
    response: reqwest::Response,
    method: &str,
) -> Result<T> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(HeraldError::upstream(format!(
            "slack {method} returned {status}: {body}"
        )));
    }
    let envelope: Envelope<T> = response
        .json()
        .await
        .map_err(|e| HeraldError::upstream_with(format!("slack {method}: malformed response"), e))?;
    unwrap_envelope(envelope, method)
}

#[async_trait]
impl UserDirectory for SlackClient {
    async fn list_users(&self) -> Result<Vec<ChatUser>> {
        let token = self.token()?;
        let mut users = Vec::new();
        let mut cursor: Option<String> = None;
        loop {
            let mut query: Vec<(&str, &str)> = vec![("limit", PAGE_SIZE)];
            if let Some(team) = self.team_id.as_deref() {
                query.push(("team_id", team));
            }
            if let Some(c) = cursor.as_deref() {
                query.push(("cursor", c));
            }
            let response = self
                .http
                .get(self.method_url("users.list"))
                .bearer_auth(token)
                .query(&query)
                .send()
                .await
                .map_err(|e| HeraldError::upstream_with("slack users.list: request failed", e))?;
            let page: UsersPage = read_envelope(response, "users.list").await?;

            users.extend(page.members.into_iter().map(|m| ChatUser {
                id: m.id,
                email: m.profile.email,
            }));
            cursor = page
                .response_metadata
                .and_then(|m| m.next_cursor)
                .filter(|c| !c.is_empty());
            if cursor.is_none() {
                break;
            }
            debug!(fetched = users.len(), "users.list next page");
        }
        debug!(count = users.len(), "loaded Slack directory");
        Ok(users)
    }
}

#[derive(Deserialize)]
struct PostedMessage {
    ts: Option<String>,
}

#[async_trait]
impl ChatPoster for SlackClient {
    async fn post_message(&self, channel: &str, text: &str) -> Result<()> {
        let token = self.token()?;
        let body = serde_json::json!({ "channel": channel, "text": text });
        let response = self
            .http
            .post(self.method_url("chat.postMessage"))
            .bearer_auth(token)
            .json(&body)
            .send()
            .await
            .map_err(|e| HeraldError::upstream_with("slack chat.postMessage: request failed", e))?;
        let posted: PostedMessage = read_envelope(response, "chat.postMessage").await?;
        debug!(%channel, ts = ?posted.ts, "posted Slack message");
        Ok(())
    }
}
