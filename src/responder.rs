//! Poll step, reply composition and relabelling
//!
//! One cycle handles at most the newest message matching the poll query:
//! list, read its `From` header, send the fixed reply, then mark it read.

use tracing::{debug, error, info};

use crate::client::Mailbox;
use crate::config::{Config, LabelConfig, PollConfig};
use crate::error::{GmailError, Result};
use crate::models::{CycleOutcome, OutgoingReply, ReplyTemplate};

impl ReplyTemplate {
    /// Render the reply as RFC 822 text.
    ///
    /// `In-Reply-To` and `References` both carry the source message id. Body
    /// line endings are normalised to CRLF and the result is trimmed.
    pub fn compose(&self, to: &str, in_reply_to: &str, thread_id: Option<&str>) -> OutgoingReply {
        let body = self.body.replace("\r\n", "\n").replace('\n', "\r\n");

        let lines = [
            "MIME-Version: 1.0".to_string(),
            "Content-Type: text/plain; charset=\"UTF-8\"".to_string(),
            format!("In-Reply-To: {}", in_reply_to),
            format!("References: {}", in_reply_to),
            format!("From: {}", self.sender_name),
            format!("To: {}", to),
            format!("Subject: {}", self.subject),
            String::new(),
            body,
        ];

        OutgoingReply {
            to: to.to_string(),
            in_reply_to: in_reply_to.to_string(),
            thread_id: thread_id.map(str::to_string),
            raw: lines.join("\r\n").trim().to_string(),
        }
    }
}

/// Replies to unread mail through a [`Mailbox`]
pub struct AutoResponder<M> {
    mailbox: M,
    poll: PollConfig,
    template: ReplyTemplate,
    labels: LabelConfig,
}

impl<M: Mailbox> AutoResponder<M> {
    pub fn new(mailbox: M, config: &Config) -> Self {
        Self {
            mailbox,
            poll: config.poll.clone(),
            template: config.reply.template(),
            labels: config.labels.clone(),
        }
    }

    /// Run one list, get, send, modify pass
    pub async fn run_cycle(&self) -> Result<CycleOutcome> {
        let ids = self
            .mailbox
            .list_message_ids(&self.poll.query, self.poll.max_results)
            .await?;

        // Only the newest match is handled; the rest wait for a later cycle
        let Some(message_id) = ids.into_iter().next() else {
            if self.poll.log_when_idle {
                info!("No new message");
            } else {
                debug!("No new message");
            }
            return Ok(CycleOutcome::NoNewMessage);
        };

        let message = self.mailbox.get_message(&message_id).await?;
        debug!(
            "Fetched {} (Message-ID {:?}, subject {:?})",
            message.id, message.message_id, message.subject
        );
        let sender = message.from.as_deref().ok_or_else(|| {
            GmailError::InvalidMessageFormat(format!(
                "Message {} has no From header",
                message.id
            ))
        })?;

        let reply = self
            .template
            .compose(sender, &message_id, message.thread_id.as_deref());

        let sent_id = match self.mailbox.send_reply(&reply).await {
            Ok(id) => id,
            Err(e) => {
                error!("Failed to send reply to {}: {}", sender, e);
                return Err(e);
            }
        };
        info!("Reply Sent Successfully");
        debug!("Reply {} sent to {} for message {}", sent_id, sender, message_id);

        // No rollback of the sent reply if this fails
        self.mailbox
            .modify_labels(&message_id, &self.labels.add, &self.labels.remove)
            .await
            .map_err(|e| {
                GmailError::LabelError(format!(
                    "Reply sent but relabelling {} failed: {}",
                    message_id, e
                ))
            })?;

        Ok(CycleOutcome::Replied {
            message_id,
            recipient: sender.to_string(),
            sent_id,
        })
    }
}
