//! Keeps a single "deployment ready" comment on a pull request.
//!
//! Previous deployment comments are recognized by their text: the configured message,
//! followed by a space and an `https` url of a deployment.
use futures::future::join_all;

use crate::config::Config;
use crate::error::{ConfigError, Error, TransportResult};
use crate::github::{
    create_github_client, GithubRepositoryClient, IssueComment, PullRequestNumber,
    RepositoryClient,
};
use crate::now::DEPLOYMENT_DOMAIN;

/// Recognizes deployment comments posted with a given message.
pub struct DeploymentCommentMatcher {
    /// The message, a space and the url scheme. Matched literally.
    prefix: String,
}

impl DeploymentCommentMatcher {
    pub fn new(message: &str) -> Self {
        Self {
            prefix: format!("{message} https://"),
        }
    }

    /// Returns `true` if `body` contains the message directly followed by a url which
    /// reaches into the deployment domain, e.g. `https://repo-abc.now.sh`. Anything after the
    /// domain (a slash, a path, punctuation) is allowed.
    pub fn matches(&self, body: &str) -> bool {
        let domain = format!(".{DEPLOYMENT_DOMAIN}");
        body.match_indices(&self.prefix).any(|(index, _)| {
            let url = body[index + self.prefix.len()..]
                .split(char::is_whitespace)
                .next()
                .unwrap_or_default();
            // The subdomain must not be empty.
            url.match_indices(&domain).any(|(position, _)| position > 0)
        })
    }
}

/// Outcome of a comment synchronization.
#[derive(Debug, serde::Serialize)]
pub struct CommentSyncResult {
    /// Ids of the previous deployment comments that were deleted.
    pub removed: Vec<u64>,
    /// The newly posted deployment comment.
    pub comment: IssueComment,
}

/// Validates the configuration and replaces the deployment comment of the configured PR.
pub async fn sync_comment(config: Config) -> Result<CommentSyncResult, Error> {
    let params = config.into_comment_params()?;
    let pr = params
        .repository
        .pull_request_from_url(&params.pr_url)
        .ok_or_else(|| ConfigError::InvalidPullRequestUrl {
            url: params.pr_url.clone(),
            repository: params.repository.to_string(),
        })?;

    let github = create_github_client(
        &params.github.api_url,
        &params.github.username,
        &params.github.token,
    )?;
    let client = GithubRepositoryClient::new(github, params.repository);

    Ok(sync_deployment_comment(
        &client,
        pr,
        &params.custom_message,
        &params.deployment_url,
    )
    .await?)
}

/// Deletes all deployment comments posted with `message` on the given PR and then posts
/// `<message> <deployment_url>` as a new comment.
///
/// The new comment is posted even if no previous comment was found.
pub async fn sync_deployment_comment<C: RepositoryClient>(
    client: &C,
    pr: PullRequestNumber,
    message: &str,
    deployment_url: &str,
) -> TransportResult<CommentSyncResult> {
    let comments = client.get_comments(pr).await?;
    // The listing does not reliably contain the full body, so each comment is loaded again.
    let comments = join_all(comments.iter().map(|comment| client.get_comment(comment)))
        .await
        .into_iter()
        .collect::<Result<Vec<_>, _>>()?;

    let matcher = DeploymentCommentMatcher::new(message);
    let outdated: Vec<IssueComment> = comments
        .into_iter()
        .filter(|comment| {
            comment
                .body
                .as_deref()
                .is_some_and(|body| matcher.matches(body))
        })
        .collect();

    if !outdated.is_empty() {
        tracing::info!(
            "Deleting {} previous deployment comment(s) from {}#{pr}",
            outdated.len(),
            client.repository()
        );
    }
    join_all(outdated.iter().map(|comment| client.delete_comment(comment)))
        .await
        .into_iter()
        .collect::<Result<Vec<_>, _>>()?;

    let comment = client
        .post_comment(pr, &format!("{message} {deployment_url}"))
        .await?;
    tracing::info!(
        "Posted deployment comment {} to {}#{pr}",
        comment.url,
        client.repository()
    );

    Ok(CommentSyncResult {
        removed: outdated.iter().map(|comment| comment.id).collect(),
        comment,
    })
}
