use secrecy::{ExposeSecret, SecretString};

use crate::error::ConfigError;
use crate::github::GithubRepoName;

pub const DEFAULT_CONTEXT_NAME: &str = "pr-deployment/deployment";
pub const DEFAULT_CUSTOM_MESSAGE: &str = "Beep boop. Your code has been deployed!";
pub const DEFAULT_NOW_API_URL: &str = "https://api.zeit.co/now";
pub const DEFAULT_GITHUB_API_URL: &str = "https://api.github.com";

/// All options recognized by the cleanup and comment operations.
///
/// Can be deserialized from a TOML file; missing keys fall back to [`Config::default`].
/// Which options are required depends on the operation, see [`Config::into_cleanup_params`]
/// and [`Config::into_comment_params`].
#[derive(serde::Deserialize, Debug)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Bearer token for the deployment host.
    pub now_token: Option<SecretString>,
    /// GitHub user that owns `github_token`.
    pub github_username: Option<String>,
    pub github_token: Option<SecretString>,
    pub repo_owner: Option<String>,
    pub repo_name: Option<String>,
    /// Context of the commit status which links a PR to its deployment.
    pub context_name: String,
    /// Text preceding the deployment url in the posted comment.
    pub custom_message: String,
    pub pr_url: Option<String>,
    pub deployment_url: Option<String>,
    pub now_api_url: String,
    pub github_api_url: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            now_token: None,
            github_username: None,
            github_token: None,
            repo_owner: None,
            repo_name: None,
            context_name: DEFAULT_CONTEXT_NAME.to_string(),
            custom_message: DEFAULT_CUSTOM_MESSAGE.to_string(),
            pr_url: None,
            deployment_url: None,
            now_api_url: DEFAULT_NOW_API_URL.to_string(),
            github_api_url: DEFAULT_GITHUB_API_URL.to_string(),
        }
    }
}

/// Credentials and endpoint of the deployment host API.
#[derive(Debug)]
pub struct DeploymentHostAccess {
    pub api_url: String,
    pub token: SecretString,
}

/// Credentials and endpoint of the GitHub API.
#[derive(Debug)]
pub struct GithubAccess {
    pub api_url: String,
    pub username: String,
    pub token: SecretString,
}

/// Validated input of the deployment cleanup.
#[derive(Debug)]
pub struct CleanupParams {
    pub deployment_host: DeploymentHostAccess,
    pub github: GithubAccess,
    pub repository: GithubRepoName,
    pub context_name: String,
}

/// Validated input of the deployment comment synchronization.
#[derive(Debug)]
pub struct CommentParams {
    pub github: GithubAccess,
    pub repository: GithubRepoName,
    pub pr_url: String,
    pub deployment_url: String,
    pub custom_message: String,
}

impl Config {
    pub fn into_cleanup_params(self) -> Result<CleanupParams, ConfigError> {
        let mut required = Required::default();
        let now_token = required.secret("now_token", self.now_token);
        let github_username = required.value("github_username", self.github_username);
        let github_token = required.secret("github_token", self.github_token);
        let repo_owner = required.value("repo_owner", self.repo_owner);
        let repo_name = required.value("repo_name", self.repo_name);
        required.check()?;

        Ok(CleanupParams {
            deployment_host: DeploymentHostAccess {
                api_url: self.now_api_url,
                token: now_token,
            },
            github: GithubAccess {
                api_url: self.github_api_url,
                username: github_username,
                token: github_token,
            },
            repository: GithubRepoName::new(&repo_owner, &repo_name),
            context_name: self.context_name,
        })
    }

    pub fn into_comment_params(self) -> Result<CommentParams, ConfigError> {
        let mut required = Required::default();
        let pr_url = required.value("pr_url", self.pr_url);
        let github_username = required.value("github_username", self.github_username);
        let github_token = required.secret("github_token", self.github_token);
        let repo_owner = required.value("repo_owner", self.repo_owner);
        let repo_name = required.value("repo_name", self.repo_name);
        let deployment_url = required.value("deployment_url", self.deployment_url);
        required.check()?;

        Ok(CommentParams {
            github: GithubAccess {
                api_url: self.github_api_url,
                username: github_username,
                token: github_token,
            },
            repository: GithubRepoName::new(&repo_owner, &repo_name),
            pr_url,
            deployment_url,
            custom_message: self.custom_message,
        })
    }
}

/// Collects the names of all missing options, so that they can be reported at once.
#[derive(Default)]
struct Required {
    missing: Vec<&'static str>,
}

impl Required {
    fn value(&mut self, name: &'static str, value: Option<String>) -> String {
        match value.filter(|value| !value.trim().is_empty()) {
            Some(value) => value,
            None => {
                self.missing.push(name);
                String::new()
            }
        }
    }

    fn secret(&mut self, name: &'static str, value: Option<SecretString>) -> SecretString {
        match value.filter(|value| !value.expose_secret().trim().is_empty()) {
            Some(value) => value,
            None => {
                self.missing.push(name);
                SecretString::new(String::new())
            }
        }
    }

    fn check(self) -> Result<(), ConfigError> {
        if self.missing.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::MissingFields(self.missing))
        }
    }
}
