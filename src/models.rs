use serde::{Deserialize, Serialize};

/// Headers of an incoming message that the responder cares about
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncomingMessage {
    pub id: String,
    pub thread_id: Option<String>,
    /// `From` header value, verbatim
    pub from: Option<String>,
    pub subject: Option<String>,
    /// RFC 822 `Message-ID` header
    pub message_id: Option<String>,
}

impl IncomingMessage {
    /// Build from raw `(name, value)` header pairs.
    ///
    /// Header names are matched exactly (`From`, `Subject`, `Message-ID`);
    /// the first occurrence wins.
    pub fn from_headers<'a, I>(id: String, thread_id: Option<String>, headers: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut message = Self {
            id,
            thread_id,
            ..Default::default()
        };

        for (name, value) in headers {
            match name {
                "From" if message.from.is_none() => message.from = Some(value.to_string()),
                "Subject" if message.subject.is_none() => {
                    message.subject = Some(value.to_string())
                }
                "Message-ID" if message.message_id.is_none() => {
                    message.message_id = Some(value.to_string())
                }
                _ => {}
            }
        }

        message
    }
}

/// Fixed reply text and the header values around it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplyTemplate {
    pub sender_name: String,
    pub subject: String,
    pub body: String,
}

/// A rendered reply ready to hand to the mailbox
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingReply {
    pub to: String,
    pub in_reply_to: String,
    pub thread_id: Option<String>,
    /// RFC 822 text, CRLF line endings
    pub raw: String,
}

impl OutgoingReply {
    /// Look up a header in the rendered text (header block only)
    pub fn header(&self, name: &str) -> Option<&str> {
        self.raw
            .split("\r\n")
            .take_while(|line| !line.is_empty())
            .find_map(|line| {
                let (key, value) = line.split_once(':')?;
                (key == name).then(|| value.trim_start())
            })
    }

    /// Body text after the blank line separating it from the headers
    pub fn body(&self) -> &str {
        self.raw
            .split_once("\r\n\r\n")
            .map(|(_, body)| body)
            .unwrap_or("")
    }
}

/// Result of one poll cycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    /// The unread query returned nothing
    NoNewMessage,
    /// A reply was sent and the source message relabelled
    Replied {
        message_id: String,
        recipient: String,
        sent_id: String,
    },
}
