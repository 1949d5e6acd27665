//! Types and client of the deployment host, which runs a preview deployment for each build.
use std::fmt::{Display, Formatter};

use async_trait::async_trait;

use crate::error::TransportResult;

mod client;

pub use client::NowClient;

/// Every deployment is served from a subdomain of this domain.
pub const DEPLOYMENT_DOMAIN: &str = "now.sh";

/// Unique identifier of a deployment.
#[derive(Clone, Debug, PartialEq, Eq, Hash, serde::Deserialize, serde::Serialize)]
#[serde(transparent)]
pub struct DeploymentId(pub String);

impl From<&str> for DeploymentId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl Display for DeploymentId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        Display::fmt(&self.0, f)
    }
}

#[derive(Clone, Debug, serde::Deserialize)]
pub struct Deployment {
    pub uid: DeploymentId,
    /// Name of the project (repository) the deployment was built from.
    pub name: String,
    /// Host of the deployment, without a scheme.
    /// It is missing until the deployment has finished building.
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
}

/// A stable hostname pointing to a deployment.
#[derive(Clone, Debug, serde::Deserialize)]
pub struct Alias {
    #[serde(default)]
    pub alias: Option<String>,
    #[serde(default)]
    pub deployment: Option<AliasTarget>,
}

#[derive(Clone, Debug, serde::Deserialize)]
pub struct AliasTarget {
    pub url: String,
}

/// Confirmation of a deleted deployment.
#[derive(Clone, Debug, serde::Deserialize)]
pub struct DeletedDeployment {
    pub uid: DeploymentId,
    #[serde(default)]
    pub state: Option<String>,
    /// Remaining fields of the response.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Checks if `url` (with or without a scheme) points to the deployment domain.
/// Returns the host of the deployment without the scheme and a trailing slash.
pub fn deployment_host(url: &str) -> Option<&str> {
    let host = url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"))
        .unwrap_or(url);
    let host = host.strip_suffix('/').unwrap_or(host);
    host.strip_suffix(DEPLOYMENT_DOMAIN)?
        .strip_suffix('.')
        .filter(|subdomain| !subdomain.is_empty())?;
    Some(host)
}

/// Access to the deployments of an account on the deployment host.
#[async_trait]
pub trait DeploymentHost: Sync {
    /// Return all aliases of the account.
    async fn get_aliases(&self) -> TransportResult<Vec<Alias>>;

    /// Return all deployments of the account.
    async fn get_deployments(&self) -> TransportResult<Vec<Deployment>>;

    /// Shut down and delete the deployment with the given id.
    async fn delete_deployment(&self, uid: &DeploymentId) -> TransportResult<DeletedDeployment>;
}
