use anyhow::Result;
use clap::Parser;
use gmail_autoresponder::cli::{self, Cli, Commands};
use gmail_autoresponder::error::GmailError;
use std::process;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    // Exit with proper code on error
    if let Err(e) = run().await {
        display_error(&e);
        eprintln!("\nFor help, run: gmail-autoresponder --help");
        process::exit(1);
    }
}

async fn run() -> Result<()> {
    // Several dependencies pull in rustls; pick one crypto provider up front.
    // aws-lc-rs everywhere except Windows, where ring avoids the NASM/CMake toolchain.
    #[cfg(not(windows))]
    rustls::crypto::aws_lc_rs::default_provider()
        .install_default()
        .map_err(|_| anyhow::anyhow!("Failed to install default crypto provider"))?;

    #[cfg(windows)]
    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|_| anyhow::anyhow!("Failed to install default crypto provider"))?;

    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("gmail_autoresponder=debug,info"))
    } else {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("gmail_autoresponder=info,warn"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();

    match &cli.command {
        Commands::Auth { force } => {
            tracing::info!("Authenticating with Gmail API...");
            let email = cli::run_auth(&cli, *force).await?;

            println!("Successfully authenticated with Gmail API");
            println!("Token cached at: {:?}", cli.token_cache);
            println!("Connected to account: {}", email);
            Ok(())
        }

        Commands::Run { once } => {
            tracing::info!("Gmail auto-responder starting...");
            cli::run_responder(&cli, *once).await?;
            Ok(())
        }

        Commands::InitConfig { output, force } => {
            tracing::info!("Generating example configuration file");
            cli::run_init_config(output, *force).await?;

            println!("Created example configuration file at: {:?}", output);
            println!("\nKey settings to review:");
            println!("  - schedule.interval_minutes: How often to check for unread mail");
            println!("  - reply.sender_name: Name shown in the From header of replies");
            println!("  - reply.body: The away message text");
            println!("  - poll.log_when_idle: Log when a cycle finds nothing");
            Ok(())
        }
    }
}

/// Display error with context
fn display_error(error: &anyhow::Error) {
    eprintln!("Error: {}", error);

    for cause in error.chain().skip(1) {
        eprintln!("  Caused by: {}", cause);
    }

    if let Some(gmail_err) = error.downcast_ref::<GmailError>() {
        match gmail_err {
            GmailError::AuthError(_) => {
                eprintln!("\nHint: Make sure your credentials.json file is valid.");
                eprintln!("      You can download it from Google Cloud Console.");
                eprintln!("      Try running: gmail-autoresponder auth --force");
            }
            GmailError::RateLimitExceeded { .. } => {
                eprintln!("\nHint: You've hit Gmail API rate limits.");
                eprintln!("      Wait a few seconds and try again.");
            }
            GmailError::ConfigError(_) => {
                eprintln!("\nHint: Check your configuration file for errors.");
                eprintln!("      Run: gmail-autoresponder init-config --force");
            }
            _ => {}
        }
    }
}
