//! Mailbox operations used by the responder, and their Gmail API adapter

use async_trait::async_trait;
use google_gmail1::api::{Message, ModifyMessageRequest};
use std::future::Future;
use std::io::Cursor;
use std::time::Duration;
use tracing::{debug, warn};

use crate::auth::{GmailHub, GMAIL_MODIFY_SCOPE};
use crate::config::ApiConfig;
use crate::error::{GmailError, Result};
use crate::models::{IncomingMessage, OutgoingReply};

/// Gmail user id for the authorized account
const ME: &str = "me";

/// Trait defining mailbox operations for easier testing
#[async_trait]
pub trait Mailbox: Send + Sync {
    /// List message ids matching a query, a single page of at most `max_results`
    async fn list_message_ids(&self, query: &str, max_results: u32) -> Result<Vec<String>>;

    /// Fetch the headers of one message
    async fn get_message(&self, id: &str) -> Result<IncomingMessage>;

    /// Send a rendered reply, returning the id of the sent message
    async fn send_reply(&self, reply: &OutgoingReply) -> Result<String>;

    /// Add and remove labels on one message
    async fn modify_labels(&self, id: &str, add: &[String], remove: &[String]) -> Result<()>;
}

/// Gmail API mailbox with per-call timeouts and retry on transient errors.
///
/// Sending is never retried, so a reply cannot be duplicated here.
pub struct GmailMailbox {
    hub: GmailHub,
    max_retries: u32,
    request_timeout: Duration,
}

impl GmailMailbox {
    pub fn new(hub: GmailHub, api: &ApiConfig) -> Self {
        Self {
            hub,
            max_retries: api.max_retries,
            request_timeout: api.request_timeout(),
        }
    }

    /// Check if an error is retryable
    fn should_retry(error: &GmailError) -> bool {
        error.is_transient()
    }

    /// Execute an async operation with exponential backoff retry
    async fn with_retry<T, F, Fut>(
        operation_name: &str,
        max_retries: u32,
        mut operation: F,
    ) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut delay = Duration::from_secs(1);
        let mut attempts = 0;

        loop {
            attempts += 1;
            match operation().await {
                Ok(result) => return Ok(result),
                Err(e) if Self::should_retry(&e) && attempts <= max_retries => {
                    let wait = match &e {
                        GmailError::RateLimitExceeded { retry_after } => {
                            delay.max(Duration::from_secs(*retry_after))
                        }
                        _ => delay,
                    };
                    warn!(
                        "{} failed (attempt {}/{}): {}. Retrying in {:?}...",
                        operation_name,
                        attempts,
                        max_retries + 1,
                        e,
                        wait
                    );
                    tokio::time::sleep(wait).await;
                    delay = std::cmp::min(delay * 2, Duration::from_secs(30));
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Run one API call under the configured timeout
    async fn timed<T, Fut>(&self, operation_name: &str, call: Fut) -> Result<T>
    where
        Fut: Future<Output = std::result::Result<T, google_gmail1::Error>>,
    {
        match tokio::time::timeout(self.request_timeout, call).await {
            Ok(result) => result.map_err(GmailError::from),
            Err(_) => {
                warn!(
                    "Gmail API {} call timed out after {:?}",
                    operation_name, self.request_timeout
                );
                Err(GmailError::NetworkError(format!(
                    "API call timed out after {:?}",
                    self.request_timeout
                )))
            }
        }
    }
}

/// Turn a Gmail API message into the headers the responder uses
fn parse_incoming_message(msg: Message) -> Result<IncomingMessage> {
    let id = msg
        .id
        .ok_or_else(|| GmailError::InvalidMessageFormat("Missing message ID".to_string()))?;

    let headers = msg
        .payload
        .and_then(|p| p.headers)
        .unwrap_or_default();

    Ok(IncomingMessage::from_headers(
        id,
        msg.thread_id,
        headers
            .iter()
            .filter_map(|h| Some((h.name.as_deref()?, h.value.as_deref()?))),
    ))
}

fn non_empty(labels: &[String]) -> Option<Vec<String>> {
    if labels.is_empty() {
        None
    } else {
        Some(labels.to_vec())
    }
}

#[async_trait]
impl Mailbox for GmailMailbox {
    async fn list_message_ids(&self, query: &str, max_results: u32) -> Result<Vec<String>> {
        Self::with_retry("list_message_ids", self.max_retries, || async {
            let call = self
                .hub
                .users()
                .messages_list(ME)
                .q(query)
                .max_results(max_results)
                .add_scope(GMAIL_MODIFY_SCOPE)
                .doit();

            let (_, response) = self.timed("messages.list", call).await?;

            let ids: Vec<String> = response
                .messages
                .unwrap_or_default()
                .into_iter()
                .filter_map(|m| m.id)
                .collect();

            debug!("Query '{}' matched {} message(s)", query, ids.len());
            Ok(ids)
        })
        .await
    }

    async fn get_message(&self, id: &str) -> Result<IncomingMessage> {
        Self::with_retry("get_message", self.max_retries, || async {
            let call = self
                .hub
                .users()
                .messages_get(ME, id)
                .format("metadata")
                .add_metadata_headers("From")
                .add_metadata_headers("Subject")
                .add_metadata_headers("Message-ID")
                .add_scope(GMAIL_MODIFY_SCOPE)
                .doit();

            let (_, msg) = self.timed("messages.get", call).await?;
            parse_incoming_message(msg)
        })
        .await
    }

    async fn send_reply(&self, reply: &OutgoingReply) -> Result<String> {
        let metadata = Message {
            thread_id: reply.thread_id.clone(),
            ..Default::default()
        };
        let mime_type: mime::Mime = "message/rfc822"
            .parse()
            .map_err(|e: mime::FromStrError| GmailError::Unknown(e.to_string()))?;

        let call = self
            .hub
            .users()
            .messages_send(metadata, ME)
            .add_scope(GMAIL_MODIFY_SCOPE)
            .upload(Cursor::new(reply.raw.clone().into_bytes()), mime_type);

        let (_, sent) = self
            .timed("messages.send", call)
            .await
            .map_err(|e| GmailError::SendError(e.to_string()))?;

        sent.id
            .ok_or_else(|| GmailError::SendError("Sent message has no ID".to_string()))
    }

    async fn modify_labels(&self, id: &str, add: &[String], remove: &[String]) -> Result<()> {
        Self::with_retry("modify_labels", self.max_retries, || async {
            let request = ModifyMessageRequest {
                add_label_ids: non_empty(add),
                remove_label_ids: non_empty(remove),
            };

            let call = self
                .hub
                .users()
                .messages_modify(request, ME, id)
                .add_scope(GMAIL_MODIFY_SCOPE)
                .doit();

            self.timed("messages.modify", call).await?;
            Ok(())
        })
        .await
    }
}
