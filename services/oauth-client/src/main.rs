//! OAuth client command-line tool
//!
//! Thin shell over `CredentialManager`:
//! 1. Loads the client registration and storage path from TOML
//! 2. Opens the JSON token file
//! 3. Runs one manager operation for the given user and scope
//!
//! Logs go to stderr as JSON; stdout carries only the command result.

mod cli;
mod config;

use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context as _, Result};
use clap::Parser;
use credential_manager::CredentialManager;
use oauth_token::{Context, FileStorage, HttpTokenExchanger};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::cli::{Cli, Command};
use crate::config::Config;

#[tokio::main]
async fn main() -> Result<ExitCode> {
    // Initialize tracing with JSON output and LOG_LEVEL / RUST_LOG support
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_env("LOG_LEVEL")
                .or_else(|_| EnvFilter::try_from_default_env())
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(std::io::stderr),
        )
        .init();

    let cli = Cli::parse();

    info!(path = %cli.config.display(), "loading configuration");
    let config = Config::load(&cli.config)
        .with_context(|| format!("failed to load config from {}", cli.config.display()))?;

    let manager = build_manager(config).await?;
    let target = cli.command.target();
    let context = Context::new(target.user_id.as_str(), target.scope.as_deref())
        .context("invalid user or scope")?;

    if run(&manager, &cli.command, &context).await? {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::FAILURE)
    }
}

/// Wire file storage and the HTTP token endpoint into a manager.
async fn build_manager(config: Config) -> Result<CredentialManager> {
    let storage = FileStorage::load(config.storage.path.clone())
        .await
        .with_context(|| {
            format!(
                "failed to open token storage at {}",
                config.storage.path.display()
            )
        })?;

    let http_client = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.http.timeout_secs))
        .build()
        .context("failed to build HTTP client")?;

    let client_config = Arc::new(config.client);
    let exchanger = HttpTokenExchanger::new(http_client, client_config.clone());

    info!(
        client_config_id = %config.client_config_id,
        token_endpoint = %client_config.token_endpoint,
        "credential manager ready"
    );

    Ok(CredentialManager::new(
        config.client_config_id,
        client_config,
        Arc::new(storage),
        Arc::new(exchanger),
    )?)
}

/// Execute one command. Returns `false` when the user must re-authorize.
async fn run(manager: &CredentialManager, command: &Command, context: &Context) -> Result<bool> {
    match command {
        Command::AuthorizeUri(_) => {
            let uri = manager.get_authorize_uri(context, None).await?;
            println!("{uri}");
        }
        Command::AccessToken(_) => match manager.get_access_token(context).await? {
            Some(token) => println!("{} {}", token.token_type(), token.access_token()),
            None => {
                warn!(user_id = context.user_id(), "no usable credential");
                eprintln!("re-authorization required");
                return Ok(false);
            }
        },
        Command::Forget(_) => {
            manager.discard_access_token(context).await?;
            manager.delete_refresh_token(context).await?;
            info!(user_id = context.user_id(), "stored tokens removed");
        }
    }
    Ok(true)
}
