use std::time::Duration;

use async_trait::async_trait;
use herald_core::{
    AzureConfig, ChangeKind, ChangedFile, HeraldError, InlineComment, PullRequestMeta,
    PullRequestRef, RepositoryInfo, Result,
};
use reqwest::{header, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::capability::{CommentPoster, ContentFetcher, IterationRecord, PullRequestSource};

/// REST API version sent with every request.
pub const API_VERSION: &str = "7.1";

/// Azure DevOps Git REST client scoped to one project.
///
/// Authenticates with a personal access token as the basic-auth password.
///
/// # Examples
///
/// ```
/// use herald_review::azure::AzureDevOpsClient;
///
/// let client = AzureDevOpsClient::with_base_url("https://dev.azure.com/contoso/web", "pat").unwrap();
/// assert_eq!(client.base_url(), "https://dev.azure.com/contoso/web");
/// ```
pub struct AzureDevOpsClient {
    http: reqwest::Client,
    base_url: String,
    pat: String,
}

impl AzureDevOpsClient {
    /// Build a client from `[azure]` settings.
    ///
    /// # Errors
    ///
    /// Returns [`HeraldError::Config`] if the organization URL, project or
    /// token is missing.
    pub fn new(config: &AzureConfig) -> Result<Self> {
        let missing = |name: &str| HeraldError::Config(format!("azure.{name} is not set"));
        let org_url = config.org_url.as_deref().ok_or_else(|| missing("org_url"))?;
        let project = config.project.as_deref().ok_or_else(|| missing("project"))?;
        let pat = config.pat.as_deref().ok_or_else(|| missing("pat"))?;
        Self::with_base_url(
            format!("{}/{}", org_url.trim_end_matches('/'), project.trim_matches('/')),
            pat,
        )
    }

    /// Build a client against an explicit `{org}/{project}` base URL.
    ///
    /// # Errors
    ///
    /// Returns [`HeraldError::Upstream`] if the HTTP client cannot be built.
    pub fn with_base_url(base_url: impl Into<String>, pat: impl Into<String>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| HeraldError::upstream_with("failed to create HTTP client", e))?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            pat: pat.into(),
        })
    }

    /// `{org}/{project}` prefix of every request.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn git_url(&self, rest: &str) -> String {
        format!("{}/_apis/git/{rest}", self.base_url)
    }

    fn authed(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .basic_auth("", Some(&self.pat))
            .query(&[("api-version", API_VERSION)])
    }

    async fn send(&self, request: RequestBuilder, what: &str) -> Result<Response> {
        self.authed(request)
            .send()
            .await
            .map_err(|e| HeraldError::upstream_with(format!("{what}: request failed"), e))
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str, what: &str) -> Result<T> {
        debug!(%url, "GET");
        let response = self.send(self.http.get(url), what).await?;
        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(HeraldError::NotFound(what.to_string()));
        }
        let response = ensure_success(response, what).await?;
        response
            .json()
            .await
            .map_err(|e| HeraldError::upstream_with(format!("{what}: malformed response"), e))
    }
}

async fn ensure_success(response: Response, what: &str) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(HeraldError::upstream(format!(
        "{what}: Azure DevOps returned {status}: {body}"
    )))
}

#[derive(Deserialize)]
struct ValueList<T> {
    #[serde(default = "Vec::new")]
    value: Vec<T>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct IterationDto {
    id: u64,
    source_ref_commit: Option<CommitRef>,
    common_ref_commit: Option<CommitRef>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CommitRef {
    commit_id: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChangesDto {
    #[serde(default)]
    change_entries: Vec<ChangeEntryDto>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChangeEntryDto {
    item: Option<ItemDto>,
    #[serde(default)]
    change_type: String,
}

#[derive(Deserialize)]
struct ItemDto {
    path: Option<String>,
}

#[async_trait]
impl PullRequestSource for AzureDevOpsClient {
    async fn get_pull_request(&self, pull_request_id: u64) -> Result<PullRequestMeta> {
        let url = self.git_url(&format!("pullrequests/{pull_request_id}"));
        let doc: serde_json::Value = self
            .get_json(&url, &format!("pull request {pull_request_id}"))
            .await?;
        PullRequestMeta::from_json(doc)
    }

    async fn list_repositories(&self) -> Result<Vec<RepositoryInfo>> {
        let url = self.git_url("repositories");
        let list: ValueList<RepositoryInfo> = self.get_json(&url, "repository list").await?;
        Ok(list.value)
    }

    async fn list_iterations(&self, pr: &PullRequestRef) -> Result<Vec<IterationRecord>> {
        let url = self.git_url(&format!(
            "repositories/{}/pullRequests/{}/iterations",
            pr.repository_id, pr.pull_request_id
        ));
        let list: ValueList<IterationDto> = self
            .get_json(&url, &format!("iterations of {pr}"))
            .await?;
        Ok(list
            .value
            .into_iter()
            .map(|it| IterationRecord {
                id: it.id,
                source_commit: it.source_ref_commit.and_then(|c| c.commit_id),
                base_commit: it.common_ref_commit.and_then(|c| c.commit_id),
            })
            .collect())
    }

    async fn list_changes(
        &self,
        pr: &PullRequestRef,
        iteration_id: u64,
    ) -> Result<Vec<ChangedFile>> {
        let url = self.git_url(&format!(
            "repositories/{}/pullRequests/{}/iterations/{iteration_id}/changes",
            pr.repository_id, pr.pull_request_id
        ));
        let changes: ChangesDto = self
            .get_json(&url, &format!("changes of {pr} iteration {iteration_id}"))
            .await?;

        let mut files = Vec::with_capacity(changes.change_entries.len());
        for entry in changes.change_entries {
            let Some(path) = entry.item.and_then(|i| i.path) else {
                warn!(change_type = %entry.change_type, "change entry without a path");
                continue;
            };
            files.push(ChangedFile {
                path,
                change_kind: ChangeKind::parse(&entry.change_type),
            });
        }
        Ok(files)
    }
}

#[async_trait]
impl ContentFetcher for AzureDevOpsClient {
    async fn fetch_text(&self, repository_id: &str, path: &str, commit: &str) -> Result<String> {
        let url = self.git_url(&format!("repositories/{repository_id}/items"));
        let what = format!("{path}@{commit}");
        debug!(%path, %commit, "fetching item");
        let request = self.http.get(&url).query(&[
            ("path", path),
            ("includeContent", "true"),
            ("resolveLfs", "true"),
            ("versionDescriptor.versionType", "commit"),
            ("versionDescriptor.version", commit),
        ]);
        let response = self.send(request, &what).await?;
        if response.status() == StatusCode::NOT_FOUND {
            debug!(%path, %commit, "item absent at commit");
            return Ok(String::new());
        }
        let response = ensure_success(response, &what).await?;

        let is_json = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.contains("application/json"));
        if is_json {
            let doc: serde_json::Value = response
                .json()
                .await
                .map_err(|e| HeraldError::upstream_with(format!("{what}: malformed item"), e))?;
            Ok(doc
                .get("content")
                .and_then(|c| c.as_str())
                .unwrap_or_default()
                .to_string())
        } else {
            response
                .text()
                .await
                .map_err(|e| HeraldError::upstream_with(format!("{what}: unreadable body"), e))
        }
    }
}

#[async_trait]
impl CommentPoster for AzureDevOpsClient {
    async fn post_comment(&self, pr: &PullRequestRef, comment: &InlineComment) -> Result<()> {
        let url = self.git_url(&format!(
            "repositories/{}/pullRequests/{}/threads",
            pr.repository_id, pr.pull_request_id
        ));
        let position = serde_json::json!({ "line": comment.line_number, "offset": 1 });
        let body = serde_json::json!({
            "comments": [{
                "parentCommentId": 0,
                "content": comment.content,
                "commentType": 1,
            }],
            "status": "active",
            "threadContext": {
                "filePath": comment.path,
                "rightFileStart": position,
                "rightFileEnd": position,
            },
        });
        let what = format!("comment on {}:{}", comment.path, comment.line_number);
        debug!(path = %comment.path, line = comment.line_number, "posting comment thread");
        let response = self.send(self.http.post(&url).json(&body), &what).await?;
        ensure_success(response, &what).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server};

    fn route(path: &str) -> Matcher {
        Matcher::Regex(format!(r"^{path}(\?.*)?$"))
    }

    fn client(server: &Server) -> AzureDevOpsClient {
        AzureDevOpsClient::with_base_url(format!("{}/org/proj", server.url()), "secret").unwrap()
    }

    fn pr() -> PullRequestRef {
        PullRequestRef::new("repo-1", 42)
    }

    #[test]
    fn new_requires_org_project_and_token() {
        let mut config = AzureConfig {
            org_url: Some("https://dev.azure.com/contoso/".into()),
            project: Some("web".into()),
            ..AzureConfig::default()
        };
        assert!(matches!(
            AzureDevOpsClient::new(&config),
            Err(HeraldError::Config(_))
        ));
        config.pat = Some("p".into());
        let client = AzureDevOpsClient::new(&config).unwrap();
        assert_eq!(client.base_url(), "https://dev.azure.com/contoso/web");
    }

    #[tokio::test]
    async fn pull_request_is_fetched_with_basic_auth() {
        let mut server = Server::new_async().await;
        // base64(":secret")
        let mock = server
            .mock("GET", route("/org/proj/_apis/git/pullrequests/42"))
            .match_header("authorization", "Basic OnNlY3JldA==")
            .match_query(Matcher::UrlEncoded("api-version".into(), "7.1".into()))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                serde_json::json!({
                    "pullRequestId": 42,
                    "title": "Add login form",
                    "repository": { "id": "repo-1", "name": "web" },
                    "reviewers": [{ "uniqueName": "Dana@Contoso.com" }]
                })
                .to_string(),
            )
            .create_async()
            .await;

        let meta = client(&server).get_pull_request(42).await.unwrap();
        assert_eq!(meta.title, "Add login form");
        assert_eq!(meta.repository.id, "repo-1");
        assert_eq!(meta.reviewer_identities(), vec!["dana@contoso.com"]);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn missing_pull_request_is_not_found() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", route("/org/proj/_apis/git/pullrequests/9"))
            .with_status(404)
            .create_async()
            .await;

        let err = client(&server).get_pull_request(9).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn server_error_is_upstream() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", route("/org/proj/_apis/git/repositories"))
            .with_status(503)
            .with_body("unavailable")
            .create_async()
            .await;

        let err = client(&server).list_repositories().await.unwrap_err();
        assert!(matches!(err, HeraldError::Upstream { .. }));
    }

    #[tokio::test]
    async fn iterations_map_commit_ids() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock(
                "GET",
                route("/org/proj/_apis/git/repositories/repo-1/pullRequests/42/iterations"),
            )
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                serde_json::json!({
                    "count": 2,
                    "value": [
                        { "id": 1, "sourceRefCommit": { "commitId": "s1" }, "commonRefCommit": { "commitId": "b1" } },
                        { "id": 2, "sourceRefCommit": { "commitId": "s2" } }
                    ]
                })
                .to_string(),
            )
            .create_async()
            .await;

        let its = client(&server).list_iterations(&pr()).await.unwrap();
        assert_eq!(its.len(), 2);
        assert_eq!(its[0].source_commit.as_deref(), Some("s1"));
        assert_eq!(its[0].base_commit.as_deref(), Some("b1"));
        assert_eq!(its[1].base_commit, None);
    }

    #[tokio::test]
    async fn changes_parse_kinds_and_skip_pathless_entries() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock(
                "GET",
                route("/org/proj/_apis/git/repositories/repo-1/pullRequests/42/iterations/3/changes"),
            )
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                serde_json::json!({
                    "changeEntries": [
                        { "changeTrackingId": 1, "item": { "path": "/src/a.ts" }, "changeType": "edit" },
                        { "changeTrackingId": 2, "item": { "path": "/src/b.ts" }, "changeType": "add" },
                        { "changeTrackingId": 3, "changeType": "edit" },
                        { "changeTrackingId": 4, "item": { "path": "/src/c.ts" }, "changeType": "edit, rename" }
                    ]
                })
                .to_string(),
            )
            .create_async()
            .await;

        let files = client(&server).list_changes(&pr(), 3).await.unwrap();
        let got: Vec<(&str, ChangeKind)> = files
            .iter()
            .map(|f| (f.path.as_str(), f.change_kind))
            .collect();
        assert_eq!(
            got,
            vec![
                ("/src/a.ts", ChangeKind::Edit),
                ("/src/b.ts", ChangeKind::Add),
                ("/src/c.ts", ChangeKind::Rename),
            ]
        );
    }

    #[tokio::test]
    async fn item_content_from_json_or_raw_text() {
        let mut server = Server::new_async().await;
        let items = route("/org/proj/_apis/git/repositories/repo-1/items");
        let _json = server
            .mock("GET", items.clone())
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("path".into(), "/src/a.ts".into()),
                Matcher::UrlEncoded("versionDescriptor.version".into(), "base".into()),
                Matcher::UrlEncoded("versionDescriptor.versionType".into(), "commit".into()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json; charset=utf-8")
            .with_body(r#"{"path":"/src/a.ts","content":"old\n"}"#)
            .create_async()
            .await;
        let _raw = server
            .mock("GET", items.clone())
            .match_query(Matcher::UrlEncoded(
                "versionDescriptor.version".into(),
                "head".into(),
            ))
            .with_status(200)
            .with_header("content-type", "text/plain")
            .with_body("new\n")
            .create_async()
            .await;

        let c = client(&server);
        assert_eq!(c.fetch_text("repo-1", "/src/a.ts", "base").await.unwrap(), "old\n");
        assert_eq!(c.fetch_text("repo-1", "/src/a.ts", "head").await.unwrap(), "new\n");
    }

    #[tokio::test]
    async fn absent_item_is_empty_text() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", route("/org/proj/_apis/git/repositories/repo-1/items"))
            .with_status(404)
            .create_async()
            .await;

        let text = client(&server)
            .fetch_text("repo-1", "/gone.ts", "abc")
            .await
            .unwrap();
        assert_eq!(text, "");
    }

    #[tokio::test]
    async fn item_server_error_is_upstream() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", route("/org/proj/_apis/git/repositories/repo-1/items"))
            .with_status(500)
            .create_async()
            .await;

        let err = client(&server)
            .fetch_text("repo-1", "/a.ts", "abc")
            .await
            .unwrap_err();
        assert!(matches!(err, HeraldError::Upstream { .. }));
    }

    #[tokio::test]
    async fn comment_thread_targets_right_side_line() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock(
                "POST",
                route("/org/proj/_apis/git/repositories/repo-1/pullRequests/42/threads"),
            )
            .match_body(Matcher::PartialJson(serde_json::json!({
                "comments": [{ "parentCommentId": 0, "content": "Adds validation.", "commentType": 1 }],
                "status": "active",
                "threadContext": {
                    "filePath": "/src/a.ts",
                    "rightFileStart": { "line": 7, "offset": 1 },
                    "rightFileEnd": { "line": 7, "offset": 1 }
                }
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"id":1}"#)
            .create_async()
            .await;

        let comment = InlineComment {
            path: "/src/a.ts".into(),
            line_number: 7,
            content: "Adds validation.".into(),
        };
        client(&server).post_comment(&pr(), &comment).await.unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn rejected_comment_is_upstream() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock(
                "POST",
                route("/org/proj/_apis/git/repositories/repo-1/pullRequests/42/threads"),
            )
            .with_status(403)
            .create_async()
            .await;

        let comment = InlineComment {
            path: "/a".into(),
            line_number: 1,
            content: "x".into(),
        };
        let err = client(&server).post_comment(&pr(), &comment).await.unwrap_err();
        assert!(matches!(err, HeraldError::Upstream { .. }));
    }
}
