use async_trait::async_trait;
use base64::Engine;
use http::header::{HeaderName, AUTHORIZATION};
use octocrab::models::CommentId;
use octocrab::{Octocrab, Page};
use secrecy::{ExposeSecret, SecretString};
use url::Url;

use crate::error::TransportResult;
use crate::github::{
    CommentRef, GithubRepoName, IssueComment, PullRequest, PullRequestNumber, RepositoryClient,
    StatusEntry,
};

/// Maximum page size supported by the GitHub list endpoints.
const PER_PAGE: u8 = 100;

/// Creates a GitHub client authenticated with basic credentials of a user and its access token.
pub fn create_github_client(
    base_url: &str,
    username: &str,
    token: &SecretString,
) -> TransportResult<Octocrab> {
    let credentials = base64::prelude::BASE64_STANDARD
        .encode(format!("{username}:{}", token.expose_secret()));
    let client = Octocrab::builder()
        .base_uri(base_url)?
        .add_header(AUTHORIZATION, format!("Basic {credentials}"))
        .add_header(
            HeaderName::from_static("x-github-media-type"),
            "github.v3".to_string(),
        )
        .build()?;
    Ok(client)
}

/// Provides access to a single repository using the GitHub API.
pub struct GithubRepositoryClient {
    client: Octocrab,
    repo_name: GithubRepoName,
}

impl GithubRepositoryClient {
    pub fn new(client: Octocrab, repo_name: GithubRepoName) -> Self {
        Self { client, repo_name }
    }

    fn comments_route(&self, pr: PullRequestNumber) -> String {
        format!(
            "/repos/{}/{}/issues/{pr}/comments",
            self.repo_name.owner(),
            self.repo_name.name()
        )
    }
}

#[derive(serde::Serialize)]
struct ListQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    state: Option<&'static str>,
    per_page: u8,
}

#[derive(serde::Deserialize)]
struct PullRequestPayload {
    number: u64,
    #[serde(rename = "_links")]
    links: PullRequestLinks,
}

#[derive(serde::Deserialize)]
struct PullRequestLinks {
    statuses: Link,
}

#[derive(serde::Deserialize)]
struct Link {
    href: Url,
}

#[derive(serde::Deserialize)]
struct StatusPayload {
    context: String,
    target_url: Option<String>,
}

#[derive(serde::Serialize)]
struct CommentBody<'a> {
    body: &'a str,
}

#[async_trait]
impl RepositoryClient for GithubRepositoryClient {
    fn repository(&self) -> &GithubRepoName {
        &self.repo_name
    }

    async fn get_open_pull_requests(&self) -> TransportResult<Vec<PullRequest>> {
        // https://docs.github.com/en/rest/pulls/pulls#list-pull-requests
        let page: Page<PullRequestPayload> = self
            .client
            .get(
                format!(
                    "/repos/{}/{}/pulls",
                    self.repo_name.owner(),
                    self.repo_name.name()
                ),
                Some(&ListQuery {
                    state: Some("open"),
                    per_page: PER_PAGE,
                }),
            )
            .await?;
        let pull_requests = self.client.all_pages(page).await?;

        Ok(pull_requests
            .into_iter()
            .map(|pr| PullRequest {
                number: pr.number.into(),
                statuses_url: pr.links.statuses.href,
            })
            .collect())
    }

    async fn get_statuses(&self, pr: &PullRequest) -> TransportResult<Vec<StatusEntry>> {
        let page: Page<StatusPayload> = self
            .client
            .get(
                pr.statuses_url.as_str(),
                Some(&ListQuery {
                    state: None,
                    per_page: PER_PAGE,
                }),
            )
            .await?;
        let statuses = self.client.all_pages(page).await?;

        Ok(statuses
            .into_iter()
            .map(|status| StatusEntry {
                context: status.context,
                target_url: status.target_url,
            })
            .collect())
    }

    async fn get_comments(&self, pr: PullRequestNumber) -> TransportResult<Vec<CommentRef>> {
        let page: Page<CommentRef> = self
            .client
            .get(
                self.comments_route(pr),
                Some(&ListQuery {
                    state: None,
                    per_page: PER_PAGE,
                }),
            )
            .await?;
        Ok(self.client.all_pages(page).await?)
    }

    async fn get_comment(&self, comment: &CommentRef) -> TransportResult<IssueComment> {
        Ok(self.client.get(comment.url.as_str(), None::<&()>).await?)
    }

    async fn delete_comment(&self, comment: &IssueComment) -> TransportResult<()> {
        self.client
            .issues(self.repo_name.owner(), self.repo_name.name())
            .delete_comment(CommentId(comment.id))
            .await?;
        Ok(())
    }

    async fn post_comment(
        &self,
        pr: PullRequestNumber,
        text: &str,
    ) -> TransportResult<IssueComment> {
        Ok(self
            .client
            .post(self.comments_route(pr), Some(&CommentBody { body: text }))
            .await?)
    }
}
