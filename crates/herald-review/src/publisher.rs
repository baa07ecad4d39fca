//! Stage 4: inline comments on the pull request and a chat announcement.

use std::collections::HashMap;

use herald_core::{
    HeraldConfig, HeraldError, InlineComment, PullRequestMeta, PullRequestRef, Result,
    ReviewSummary,
};
use serde::Serialize;
use tracing::{debug, info};

use crate::capability::{ChatPoster, ChatUser, CommentPoster, UserDirectory};
use crate::composer::{ComposeStatus, Composition};
use crate::resolver::Resolution;

/// Where and whether to publish.
#[derive(Debug, Clone, Default)]
pub struct PublishSettings {
    /// Organization URL used in the pull request link.
    pub org_url: String,
    /// Project used in the pull request link.
    pub project: String,
    /// Announcement channel; required unless `dry_run`.
    pub channel: Option<String>,
    /// Build everything but post nothing.
    pub dry_run: bool,
}

impl PublishSettings {
    /// Settings from loaded configuration.
    ///
    /// A missing channel is tolerated here and reported by [`publish`], so a
    /// dry run works without Slack settings.
    ///
    /// # Errors
    ///
    /// Returns [`HeraldError::Config`] if the organization URL or project is missing.
    pub fn from_config(config: &HeraldConfig, dry_run: bool) -> Result<Self> {
        let org_url = config
            .azure
            .org_url
            .clone()
            .ok_or_else(|| HeraldError::Config("azure.org_url is not set".into()))?;
        let project = config
            .azure
            .project
            .clone()
            .ok_or_else(|| HeraldError::Config("azure.project is not set".into()))?;
        Ok(Self {
            org_url,
            project,
            channel: config.slack.primary_channel().ok().map(str::to_string),
            dry_run,
        })
    }
}

/// Output of the publish stage.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Publication {
    /// Comment threads actually created.
    pub comments_posted: usize,
    /// `true` once the chat message was accepted.
    pub announced: bool,
    /// The announcement text, posted or not.
    pub message: Option<String>,
}

/// Web link to a pull request.
///
/// # Examples
///
/// ```
/// use herald_core::PullRequestRef;
/// use herald_review::publisher::pull_request_url;
///
/// let pr = PullRequestRef::new("web", 17);
/// assert_eq!(
///     pull_request_url("https://dev.azure.com/contoso/", "Shop", &pr),
///     "https://dev.azure.com/contoso/Shop/_git/web/pullrequest/17"
/// );
/// ```
pub fn pull_request_url(org_url: &str, project: &str, pr: &PullRequestRef) -> String {
    format!(
        "{}/{project}/_git/{}/pullrequest/{}",
        org_url.trim_end_matches('/'),
        pr.repository_id,
        pr.pull_request_id
    )
}

/// Case-folded email to user id, for members that have an email.
pub fn email_index(users: Vec<ChatUser>) -> HashMap<String, String> {
    users
        .into_iter()
        .filter_map(|u| {
            let email = u.email?.trim().to_lowercase();
            (!email.is_empty()).then_some((email, u.id))
        })
        .collect()
}

/// Render reviewer identities as mentions, comma-separated.
///
/// Known emails become `<@ID>`; unknown ones stay as the case-folded email.
/// An empty list renders `None`.
///
/// # Examples
///
/// ```
/// use std::collections::HashMap;
/// use herald_review::publisher::render_mentions;
///
/// let index = HashMap::from([("ann@x.io".to_string(), "U1".to_string())]);
/// let ids = vec!["ann@x.io".to_string(), "bo@x.io".to_string()];
/// assert_eq!(render_mentions(&ids, &index), "<@U1>, bo@x.io");
/// assert_eq!(render_mentions(&[], &index), "None");
/// ```
pub fn render_mentions(identities: &[String], index: &HashMap<String, String>) -> String {
    if identities.is_empty() {
        return "None".to_string();
    }
    identities
        .iter()
        .map(|email| {
            let email = email.to_lowercase();
            match index.get(&email) {
                Some(id) => format!("<@{id}>"),
                None => email,
            }
        })
        .collect::<Vec<_>>()
        .join(", ")
}

/// The announcement text.
///
/// # Examples
///
/// ```
/// use herald_review::publisher::build_message;
///
/// let text = build_message("https://x/p/_git/r/pullrequest/3", 3, "Fix nav", "None", "LGTM");
/// assert_eq!(
///     text,
///     "<https://x/p/_git/r/pullrequest/3|Pull Request 3>: Fix nav\n\n\
///      *Assigned Reviewer(s):* None\n\n\
///      *PR Review Summary:*\nLGTM"
/// );
/// ```
pub fn build_message(
    url: &str,
    pull_request_id: u64,
    title: &str,
    mentions: &str,
    summary: &str,
) -> String {
    format!(
        "<{url}|Pull Request {pull_request_id}>: {title}\n\n\
         *Assigned Reviewer(s):* {mentions}\n\n\
         *PR Review Summary:*\n{summary}"
    )
}

/// Post every comment in order, stopping at the first failure.
///
/// # Errors
///
/// Propagates the first posting error; earlier comments stay posted.
pub async fn post_comments(
    poster: &dyn CommentPoster,
    pr: &PullRequestRef,
    comments: &[InlineComment],
) -> Result<usize> {
    for (posted, comment) in comments.iter().enumerate() {
        poster.post_comment(pr, comment).await.inspect_err(|e| {
            debug!(posted, path = %comment.path, error = %e, "comment posting aborted");
        })?;
    }
    Ok(comments.len())
}

/// Post inline comments and announce the review.
///
/// Nothing is published when the composer reported no changes. In a dry run
/// the directory is not consulted and the message is only logged.
///
/// # Errors
///
/// - [`HeraldError::Config`] if no channel is configured for a real run,
///   checked before anything is posted.
/// - Any error from the comment poster, directory or chat poster.
pub async fn publish(
    comments_poster: &dyn CommentPoster,
    directory: &dyn UserDirectory,
    chat: &dyn ChatPoster,
    settings: &PublishSettings,
    resolution: &Resolution,
    composition: &Composition,
) -> Result<Publication> {
    let (ComposeStatus::Composed, Some(summary)) = (composition.status, &composition.summary)
    else {
        info!("nothing to publish");
        return Ok(Publication::default());
    };

    let pr = &resolution.pull_request;
    let url = pull_request_url(&settings.org_url, &settings.project, pr);
    let identities = resolution.meta.reviewer_identities();

    if settings.dry_run {
        let mentions = render_mentions(&identities, &HashMap::new());
        let message = announcement(&url, &resolution.meta, &mentions, summary);
        for c in &composition.comments {
            info!(path = %c.path, line = c.line_number, "dry run: would comment: {}", c.content);
        }
        info!(channel = ?settings.channel, "dry run: would announce:\n{message}");
        return Ok(Publication {
            comments_posted: 0,
            announced: false,
            message: Some(message),
        });
    }

    let channel = settings
        .channel
        .as_deref()
        .ok_or_else(|| HeraldError::Config("no Slack channel ids configured".into()))?;

    let comments_posted = post_comments(comments_poster, pr, &composition.comments).await?;
    info!(comments_posted, "inline comments posted");

    let index = email_index(directory.list_users().await?);
    let mentions = render_mentions(&identities, &index);
    let message = announcement(&url, &resolution.meta, &mentions, summary);
    chat.post_message(channel, &message).await?;
    info!(%channel, "review announced");

    Ok(Publication {
        comments_posted,
        announced: true,
        message: Some(message),
    })
}

fn announcement(url: &str, meta: &PullRequestMeta, mentions: &str, summary: &ReviewSummary) -> String {
    build_message(
        url,
        meta.pull_request_id,
        &meta.title,
        mentions,
        &summary.markdown_text,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_folds_case_and_skips_missing_emails() {
        let index = email_index(vec![
            ChatUser {
                id: "U1".into(),
                email: Some("Ann@X.io".into()),
            },
            ChatUser {
                id: "B1".into(),
                email: None,
            },
            ChatUser {
                id: "U2".into(),
                email: Some("  ".into()),
            },
        ]);
        assert_eq!(index.len(), 1);
        assert_eq!(index.get("ann@x.io").map(String::as_str), Some("U1"));
    }

    #[test]
    fn mentions_keep_reviewer_order() {
        let index = HashMap::from([
            ("a@x.io".to_string(), "UA".to_string()),
            ("c@x.io".to_string(), "UC".to_string()),
        ]);
        let ids = vec!["c@x.io".to_string(), "B@x.io".to_string(), "a@x.io".to_string()];
        assert_eq!(render_mentions(&ids, &index), "<@UC>, b@x.io, <@UA>");
    }

    #[test]
    fn settings_need_org_and_project_but_not_channel() {
        let mut config = HeraldConfig::default();
        assert!(PublishSettings::from_config(&config, true).is_err());
        config.azure.org_url = Some("https://dev.azure.com/o".into());
        config.azure.project = Some("p".into());
        let settings = PublishSettings::from_config(&config, true).unwrap();
        assert_eq!(settings.channel, None);
        config.slack.channel_ids = " ,C9,C8".into();
        let settings = PublishSettings::from_config(&config, false).unwrap();
        assert_eq!(settings.channel.as_deref(), Some("C9"));
    }

    #[test]
    fn url_trims_trailing_slash() {
        let pr = PullRequestRef::new("r", 1);
        assert_eq!(pull_request_url("https://h/o///", "p", &pr), "https://h/o/p/_git/r/pullrequest/1");
    }
}
