//! Command-line interface

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::info;

use crate::auth::{self, BrowserConsentFlow, ConsentFlow};
use crate::client::GmailMailbox;
use crate::config::Config;
use crate::error::{GmailError, Result};
use crate::models::CycleOutcome;
use crate::responder::AutoResponder;
use crate::scheduler::PollScheduler;

#[derive(Parser, Debug)]
#[command(name = "gmail-autoresponder")]
#[command(version)]
#[command(about = "Replies to unread Gmail messages with a fixed away message", long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    pub config: PathBuf,

    /// Path to OAuth2 credentials file
    #[arg(long, default_value = "credentials.json")]
    pub credentials: PathBuf,

    /// Path to token cache file
    #[arg(long, default_value = "token.json")]
    pub token_cache: PathBuf,

    /// Verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Authenticate with Gmail API
    Auth {
        /// Force re-authentication even if token exists
        #[arg(long)]
        force: bool,
    },

    /// Poll for unread mail and reply on a fixed interval
    Run {
        /// Run a single cycle and exit
        #[arg(long)]
        once: bool,
    },

    /// Generate example configuration file
    InitConfig {
        /// Path to create config file
        #[arg(short, long, default_value = "config.toml")]
        output: PathBuf,

        /// Overwrite existing file
        #[arg(long)]
        force: bool,
    },
}

/// Authorize, then run one cycle against a freshly built hub
pub async fn authorize_and_reply<F>(
    config: &Config,
    credentials: &Path,
    token_cache: &Path,
    flow: &F,
) -> Result<CycleOutcome>
where
    F: ConsentFlow + ?Sized,
{
    let token = auth::authorize(credentials, token_cache, flow).await?;
    let hub = auth::initialize_gmail_hub(&token).await?;
    let responder = AutoResponder::new(GmailMailbox::new(hub, &config.api), config);
    responder.run_cycle().await
}

/// `auth` command
pub async fn run_auth(cli: &Cli, force: bool) -> Result<String> {
    if force && cli.token_cache.exists() {
        tokio::fs::remove_file(&cli.token_cache).await?;
        info!("Removed existing token cache");
    }

    let token = auth::authorize(&cli.credentials, &cli.token_cache, &BrowserConsentFlow).await?;
    let hub = auth::initialize_gmail_hub(&token).await?;

    let (_, profile) = hub
        .users()
        .get_profile("me")
        .add_scope(auth::GMAIL_MODIFY_SCOPE)
        .doit()
        .await?;

    Ok(profile.email_address.unwrap_or_default())
}

/// `run` command
pub async fn run_responder(cli: &Cli, once: bool) -> Result<()> {
    let config = Config::load(&cli.config).await?;
    let scheduler = PollScheduler::new(config.schedule.interval());
    let cycle = || authorize_and_reply(&config, &cli.credentials, &cli.token_cache, &BrowserConsentFlow);

    if once {
        let outcome = scheduler.run_once(cycle).await?;
        info!("Cycle complete: {:?}", outcome);
        return Ok(());
    }

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    info!("Auto-responder running. Press Ctrl+C to stop.");
    let cycles = scheduler.run(cycle, shutdown).await;
    info!("Auto-responder stopped after {} cycle(s)", cycles);
    Ok(())
}

/// `init-config` command
pub async fn run_init_config(output: &Path, force: bool) -> Result<()> {
    if output.exists() && !force {
        return Err(GmailError::ConfigError(format!(
            "Configuration file already exists at {:?}. Use --force to overwrite.",
            output
        )));
    }

    Config::create_example(output).await
}
