use thiserror::Error;

/// Input required by an operation was missing or malformed.
///
/// Always detected before any request is sent.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("Missing required configuration: {}", .0.join(", "))]
    MissingFields(Vec<&'static str>),
    #[error("Pull request url `{url}` does not point to a pull request of {repository}")]
    InvalidPullRequestUrl { url: String, repository: String },
}

/// A request to one of the remote services failed.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Deployment host request failed")]
    DeploymentHost(#[from] reqwest::Error),
    #[error("GitHub request failed")]
    Github(#[from] octocrab::Error),
    #[error("Cannot construct request: {0}")]
    InvalidRequest(String),
}

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Transport(#[from] TransportError),
}

pub type TransportResult<T> = Result<T, TransportError>;
