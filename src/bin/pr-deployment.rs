use std::path::PathBuf;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use secrecy::SecretString;
use tracing_subscriber::EnvFilter;

use pr_deployment::{cleanup, sync_comment, Config};

#[derive(clap::Parser)]
struct Opts {
    /// TOML file with default values for all options.
    #[arg(long, env = "PR_DEPLOYMENT_CONFIG")]
    config: Option<PathBuf>,

    #[command(flatten)]
    github: GithubOpts,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args)]
struct GithubOpts {
    /// GitHub user used to access the repository.
    #[arg(long, env = "GH_AUTH_USERNAME", global = true)]
    github_username: Option<String>,

    /// Access token of the GitHub user.
    #[arg(long, env = "GH_AUTH_TOKEN", global = true, hide_env_values = true)]
    github_token: Option<String>,

    /// Owner of the repository.
    #[arg(long, env = "REPO_OWNER", global = true)]
    repo_owner: Option<String>,

    /// Name of the repository. Deployments are matched by this name.
    #[arg(long, env = "REPO_NAME", global = true)]
    repo_name: Option<String>,

    #[arg(long, env = "GITHUB_API_URL", global = true)]
    github_api_url: Option<String>,
}

#[derive(Subcommand)]
enum Command {
    /// Delete deployments which are not referenced by any open pull request.
    Cleanup {
        /// Token used to access the deployment host.
        #[arg(long, env = "NOW_TOKEN", hide_env_values = true)]
        now_token: Option<String>,

        /// Context of the commit status linking a pull request to its deployment.
        #[arg(long, env = "CONTEXT_NAME")]
        context_name: Option<String>,

        #[arg(long, env = "NOW_API_URL")]
        now_api_url: Option<String>,
    },
    /// Replace the deployment comment of a pull request.
    Comment {
        /// Web url of the pull request.
        #[arg(long, env = "PR_URL")]
        pr_url: Option<String>,

        /// Url of the deployment built from the pull request.
        #[arg(long, env = "DEPLOYMENT_URL")]
        deployment_url: Option<String>,

        /// Text posted before the deployment url.
        #[arg(long, env = "CUSTOM_MESSAGE")]
        custom_message: Option<String>,
    },
}

fn load_config(path: Option<&PathBuf>) -> anyhow::Result<Config> {
    let Some(path) = path else {
        return Ok(Config::default());
    };
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Cannot read config file {}", path.display()))?;
    toml::from_str(&content).with_context(|| format!("Cannot parse config file {}", path.display()))
}

/// Command line options take precedence over the values from the config file.
fn apply_opts(mut config: Config, github: GithubOpts, command: &mut Command) -> Config {
    fn set<T>(target: &mut T, value: Option<T>) {
        if let Some(value) = value {
            *target = value;
        }
    }
    fn set_opt<T>(target: &mut Option<T>, value: Option<T>) {
        if value.is_some() {
            *target = value;
        }
    }

    set_opt(&mut config.github_username, github.github_username);
    set_opt(
        &mut config.github_token,
        github.github_token.map(SecretString::new),
    );
    set_opt(&mut config.repo_owner, github.repo_owner);
    set_opt(&mut config.repo_name, github.repo_name);
    set(&mut config.github_api_url, github.github_api_url);

    match command {
        Command::Cleanup {
            now_token,
            context_name,
            now_api_url,
        } => {
            set_opt(&mut config.now_token, now_token.take().map(SecretString::new));
            set(&mut config.context_name, context_name.take());
            set(&mut config.now_api_url, now_api_url.take());
        }
        Command::Comment {
            pr_url,
            deployment_url,
            custom_message,
        } => {
            set_opt(&mut config.pr_url, pr_url.take());
            set_opt(&mut config.deployment_url, deployment_url.take());
            set(&mut config.custom_message, custom_message.take());
        }
    }
    config
}

fn try_main(opts: Opts) -> anyhow::Result<()> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Cannot build tokio runtime")?;

    let Opts {
        config,
        github,
        mut command,
    } = opts;
    let config = apply_opts(load_config(config.as_ref())?, github, &mut command);

    let output = match command {
        Command::Cleanup { .. } => {
            let deleted = runtime.block_on(cleanup(config))?;
            tracing::info!("Deleted {} deployment(s)", deleted.len());
            serde_json::to_string_pretty(&deleted)?
        }
        Command::Comment { .. } => {
            let result = runtime.block_on(sync_comment(config))?;
            serde_json::to_string_pretty(&result)?
        }
    };
    println!("{output}");
    Ok(())
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let opts = Opts::parse();
    if let Err(error) = try_main(opts) {
        eprintln!("Error: {error:?}");
        std::process::exit(1);
    }
}
