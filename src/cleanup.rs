//! Deletes preview deployments of a repository which are no longer used by any open pull request.
//!
//! A deployment is deleted only if it belongs to the repository, has finished building,
//! is not pointed to by an alias and its url is not the target of a deployment status
//! of any open pull request.
use std::collections::HashSet;

use futures::future::join_all;
use itertools::Itertools;

use crate::config::Config;
use crate::error::{Error, TransportResult};
use crate::github::{create_github_client, GithubRepositoryClient, RepositoryClient, StatusEntry};
use crate::now::{deployment_host, Alias, Deployment, DeploymentHost, DeploymentId, NowClient};

/// A finished, non-aliased deployment of the repository.
#[derive(Clone, Debug, PartialEq)]
pub struct CleanupCandidate {
    pub uid: DeploymentId,
    pub url: String,
}

/// A deployment that was deleted by the cleanup.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct DeletionResult {
    pub uid: DeploymentId,
    pub url: String,
    /// State reported by the deployment host after the deletion.
    pub state: Option<String>,
    /// Other fields of the deletion response of the host.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Validates the configuration and deletes all deployments which are not needed anymore.
pub async fn cleanup(config: Config) -> Result<Vec<DeletionResult>, Error> {
    let params = config.into_cleanup_params()?;

    let host = NowClient::new(params.deployment_host);
    let github = create_github_client(
        &params.github.api_url,
        &params.github.username,
        &params.github.token,
    )?;
    let repo = GithubRepositoryClient::new(github, params.repository);

    Ok(reconcile(&host, &repo, &params.context_name).await?)
}

/// Compares the deployments of the host with the open pull requests of the repository and
/// deletes deployments that are not referenced by any of them.
///
/// Per-PR status loads and deletions run concurrently. If any of them fails, the whole
/// run fails.
pub async fn reconcile<H: DeploymentHost, C: RepositoryClient>(
    host: &H,
    repo: &C,
    context_name: &str,
) -> TransportResult<Vec<DeletionResult>> {
    let aliases = host.get_aliases().await?;
    let deployments = host.get_deployments().await?;

    let aliased = aliased_urls(&aliases);
    let candidates = cleanup_candidates(deployments, repo.repository().name(), &aliased);
    tracing::debug!(
        "Found {} cleanup candidate(s) of {}",
        candidates.len(),
        repo.repository()
    );

    let pull_requests = repo.get_open_pull_requests().await?;
    let statuses = join_all(pull_requests.iter().map(|pr| repo.get_statuses(pr)))
        .await
        .into_iter()
        .collect::<Result<Vec<_>, _>>()?;
    let referenced = referenced_urls(statuses.iter().flatten(), context_name);
    tracing::debug!(
        "{} open PR(s) reference {} deployment(s)",
        pull_requests.len(),
        referenced.len()
    );

    let unused = unreferenced(candidates, &referenced);
    if unused.is_empty() {
        tracing::info!("No deployments of {} to delete", repo.repository());
        return Ok(vec![]);
    }
    tracing::info!(
        "Deleting deployments of {}: {}",
        repo.repository(),
        unused.iter().map(|deployment| &deployment.url).join(", ")
    );

    let deleted = join_all(
        unused
            .iter()
            .map(|deployment| host.delete_deployment(&deployment.uid)),
    )
    .await
    .into_iter()
    .collect::<Result<Vec<_>, _>>()?;

    Ok(unused
        .into_iter()
        .zip(deleted)
        .map(|(deployment, response)| DeletionResult {
            uid: response.uid,
            url: deployment.url,
            state: response.state,
            extra: response.extra,
        })
        .collect())
}

/// Urls of deployments that have an alias pointing to them.
pub fn aliased_urls(aliases: &[Alias]) -> HashSet<&str> {
    aliases
        .iter()
        .filter_map(|alias| alias.deployment.as_ref())
        .map(|target| target.url.as_str())
        .collect()
}

/// Selects deployments of the given repository that have finished building and are not aliased.
pub fn cleanup_candidates(
    deployments: Vec<Deployment>,
    repo_name: &str,
    aliased: &HashSet<&str>,
) -> Vec<CleanupCandidate> {
    deployments
        .into_iter()
        .filter(|deployment| deployment.name == repo_name)
        .filter_map(|deployment| match deployment.url {
            Some(url) if !aliased.contains(url.as_str()) => Some(CleanupCandidate {
                uid: deployment.uid,
                url,
            }),
            Some(_) => {
                tracing::debug!("Deployment {} is aliased, keeping it", deployment.uid);
                None
            }
            None => {
                tracing::debug!("Deployment {} is still building", deployment.uid);
                None
            }
        })
        .collect()
}

/// Deployment hosts targeted by statuses with the given context.
pub fn referenced_urls<'a>(
    statuses: impl IntoIterator<Item = &'a StatusEntry>,
    context_name: &str,
) -> HashSet<&'a str> {
    statuses
        .into_iter()
        .filter(|status| status.context == context_name)
        .filter_map(|status| status.target_url.as_deref())
        .filter_map(deployment_host)
        .collect()
}

/// Candidates which are not referenced by any open pull request.
pub fn unreferenced(
    candidates: Vec<CleanupCandidate>,
    referenced: &HashSet<&str>,
) -> Vec<CleanupCandidate> {
    candidates
        .into_iter()
        .filter(|candidate| !referenced.contains(candidate.url.as_str()))
        .collect()
}
