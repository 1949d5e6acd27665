use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};

use crate::config::DeploymentHostAccess;
use crate::error::TransportResult;
use crate::now::{Alias, DeletedDeployment, Deployment, DeploymentHost, DeploymentId};

/// Response of the deployment listing endpoint.
/// It contains both the deployments and the aliases pointing to them.
#[derive(serde::Deserialize)]
struct DeploymentListing {
    #[serde(default)]
    deployments: Vec<Deployment>,
    #[serde(default)]
    aliases: Vec<Alias>,
}

/// Deployment host client using the `now` REST API with a bearer token.
pub struct NowClient {
    client: reqwest::Client,
    api_url: String,
    token: SecretString,
}

impl NowClient {
    pub fn new(access: DeploymentHostAccess) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_url: access.api_url.trim_end_matches('/').to_string(),
            token: access.token,
        }
    }

    async fn load_listing(&self) -> TransportResult<DeploymentListing> {
        let listing = self
            .client
            .get(format!("{}/deployments", self.api_url))
            .bearer_auth(self.token.expose_secret())
            .send()
            .await?
            .error_for_status()?
            .json::<DeploymentListing>()
            .await?;
        tracing::trace!(
            "Loaded {} deployment(s) and {} alias(es)",
            listing.deployments.len(),
            listing.aliases.len()
        );
        Ok(listing)
    }
}

#[async_trait]
impl DeploymentHost for NowClient {
    async fn get_aliases(&self) -> TransportResult<Vec<Alias>> {
        Ok(self.load_listing().await?.aliases)
    }

    async fn get_deployments(&self) -> TransportResult<Vec<Deployment>> {
        Ok(self.load_listing().await?.deployments)
    }

    async fn delete_deployment(&self, uid: &DeploymentId) -> TransportResult<DeletedDeployment> {
        let deleted = self
            .client
            .delete(format!("{}/deployments/{uid}", self.api_url))
            .bearer_auth(self.token.expose_secret())
            .send()
            .await?
            .error_for_status()?
            .json::<DeletedDeployment>()
            .await?;
        Ok(deleted)
    }
}
