//! Gmail Auto-Responder
//!
//! Polls a Gmail mailbox for unread mail, answers the newest message with a
//! fixed away message and marks it read.
//!
//! # Overview
//!
//! - **Authentication**: OAuth2 with an authorized-user token cache, falling
//!   back to an interactive browser consent
//! - **Mailbox**: list, get, send and relabel through the Gmail API, with
//!   timeouts and retry on transient errors
//! - **Responder**: one list, get, send, modify pass per cycle
//! - **Scheduler**: immediate first cycle, then a fixed interval
//!
//! # Example Usage
//!
//! ```no_run
//! use gmail_autoresponder::{auth, client::GmailMailbox, config::Config, responder::AutoResponder};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load("config.toml".as_ref()).await?;
//!
//!     let token = auth::authorize(
//!         "credentials.json".as_ref(),
//!         "token.json".as_ref(),
//!         &auth::BrowserConsentFlow,
//!     )
//!     .await?;
//!     let hub = auth::initialize_gmail_hub(&token).await?;
//!
//!     let responder = AutoResponder::new(GmailMailbox::new(hub, &config.api), &config);
//!     let outcome = responder.run_cycle().await?;
//!     println!("{:?}", outcome);
//!
//!     Ok(())
//! }
//! ```
//!
//! # Module Organization
//!
//! - [`auth`] - Token cache, consent flow and Gmail hub construction
//! - [`client`] - Mailbox trait and its Gmail API implementation
//! - [`cli`] - Command-line interface
//! - [`config`] - Configuration management
//! - [`error`] - Error types and result aliases
//! - [`models`] - Message and reply data structures
//! - [`responder`] - Poll cycle and reply composition
//! - [`scheduler`] - Repeating poll timer

pub mod auth;
pub mod cli;
pub mod client;
pub mod config;
pub mod error;
pub mod models;
pub mod responder;
pub mod scheduler;

pub use error::{GmailError, Result};

pub use models::{CycleOutcome, IncomingMessage, OutgoingReply, ReplyTemplate};

pub use config::{ApiConfig, Config, LabelConfig, PollConfig, ReplyConfig, ScheduleConfig};

pub use auth::{BrowserConsentFlow, ConsentFlow, GmailHub, SavedToken};
pub use client::{GmailMailbox, Mailbox};

pub use responder::AutoResponder;
pub use scheduler::PollScheduler;

pub use cli::{Cli, Commands};
