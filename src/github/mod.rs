//! Contains definitions of common types (pull request, status, comment, repository name) needed
//! for working with GitHub repositories.
use std::fmt::{Display, Formatter};

use async_trait::async_trait;
use url::Url;

use crate::error::TransportResult;

mod client;

pub use client::{create_github_client, GithubRepositoryClient};

fn base_github_html_url() -> &'static str {
    "https://github.com"
}

/// Unique identifier of a GitHub repository
#[derive(Debug, PartialEq, Eq, Hash, Clone)]
pub struct GithubRepoName {
    owner: String,
    name: String,
}

impl GithubRepoName {
    /// Owner and name are kept as given, deployments are matched by the exact name.
    pub fn new(owner: &str, name: &str) -> Self {
        Self {
            owner: owner.to_string(),
            name: name.to_string(),
        }
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Resolves the number of a pull request of this repository from its web url,
    /// e.g. `https://github.com/<owner>/<name>/pull/<number>`.
    pub fn pull_request_from_url(&self, url: &str) -> Option<PullRequestNumber> {
        let prefix = format!(
            "{}/{}/{}/pull/",
            base_github_html_url(),
            self.owner,
            self.name
        );
        let head = url.get(..prefix.len())?;
        if !head.eq_ignore_ascii_case(&prefix) {
            return None;
        }
        let number = url[prefix.len()..]
            .split(['/', '?', '#'])
            .next()
            .unwrap_or_default();
        number.parse::<u64>().ok().map(PullRequestNumber)
    }
}

impl Display for GithubRepoName {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_fmt(format_args!("{}/{}", self.owner, self.name))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PullRequestNumber(pub u64);

impl From<u64> for PullRequestNumber {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl Display for PullRequestNumber {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        <u64 as Display>::fmt(&self.0, f)
    }
}

/// An open pull request, together with the location of its commit statuses.
#[derive(Clone, Debug)]
pub struct PullRequest {
    pub number: PullRequestNumber,
    pub statuses_url: Url,
}

/// A single commit status attached to the head of a pull request.
#[derive(Clone, Debug, PartialEq)]
pub struct StatusEntry {
    pub context: String,
    pub target_url: Option<String>,
}

/// A comment on a pull request, as returned by the single comment endpoint.
#[derive(Clone, Debug, serde::Deserialize, serde::Serialize)]
pub struct IssueComment {
    pub id: u64,
    pub url: Url,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default, deserialize_with = "author_login", rename(deserialize = "user"))]
    pub author: Option<String>,
}

fn author_login<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(serde::Deserialize)]
    struct Author {
        login: String,
    }

    let author: Option<Author> = serde::Deserialize::deserialize(deserializer)?;
    Ok(author.map(|author| author.login))
}

/// Reference to a comment, as returned by the comment listing endpoint.
/// The full comment has to be loaded from `url`.
#[derive(Clone, Debug, serde::Deserialize)]
pub struct CommentRef {
    pub id: u64,
    pub url: Url,
}

/// Provides functionality for working with a remote repository.
#[async_trait]
pub trait RepositoryClient: Sync {
    fn repository(&self) -> &GithubRepoName;

    /// Return all pull requests of the repository which are currently open.
    async fn get_open_pull_requests(&self) -> TransportResult<Vec<PullRequest>>;

    /// Return all commit statuses attached to the given pull request.
    async fn get_statuses(&self, pr: &PullRequest) -> TransportResult<Vec<StatusEntry>>;

    /// List the comments of the given pull request.
    async fn get_comments(&self, pr: PullRequestNumber) -> TransportResult<Vec<CommentRef>>;

    /// Load the full content of a listed comment.
    async fn get_comment(&self, comment: &CommentRef) -> TransportResult<IssueComment>;

    async fn delete_comment(&self, comment: &IssueComment) -> TransportResult<()>;

    /// Post a comment to the pull request with the given number.
    async fn post_comment(&self, pr: PullRequestNumber, text: &str)
        -> TransportResult<IssueComment>;
}
