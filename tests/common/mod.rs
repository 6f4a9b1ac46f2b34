//! Common test utilities and fixtures

#![allow(dead_code)]

use gmail_autoresponder::auth::{ConsentFlow, GmailHub};
use gmail_autoresponder::client::Mailbox;
use gmail_autoresponder::config::Config;
use gmail_autoresponder::error::Result;
use gmail_autoresponder::models::{IncomingMessage, OutgoingReply};
use google_gmail1::common::NoToken;
use google_gmail1::{hyper_rustls, hyper_util, Gmail};
use mockall::mock;
use serde_json::json;
use std::path::Path;

pub const INSTALLED_CREDENTIALS: &str = r#"{
    "installed": {
        "client_id": "test-client-id.apps.googleusercontent.com",
        "project_id": "test-project",
        "auth_uri": "https://accounts.google.com/o/oauth2/auth",
        "token_uri": "https://oauth2.googleapis.com/token",
        "client_secret": "test-secret",
        "redirect_uris": ["http://localhost"]
    }
}"#;

/// Create an incoming message with a From header
pub fn create_test_message(id: &str, from: &str) -> IncomingMessage {
    IncomingMessage {
        id: id.to_string(),
        thread_id: Some(format!("thread_{}", id)),
        from: Some(from.to_string()),
        subject: Some("Question about the invoice".to_string()),
        message_id: Some(format!("<{}@mail.example.com>", id)),
    }
}

/// Config with a recognisable sender name and otherwise default values
pub fn test_config() -> Config {
    let mut config = Config::default();
    config.reply.sender_name = "Jordan Lee".to_string();
    config.api.max_retries = 0;
    config.api.request_timeout_secs = 5;
    config
}

/// Create mock Gmail API message response (JSON), metadata format
pub fn mock_gmail_message_response(id: &str, thread_id: &str, from: &str) -> serde_json::Value {
    json!({
        "id": id,
        "threadId": thread_id,
        "labelIds": ["INBOX", "UNREAD"],
        "snippet": "Email snippet...",
        "payload": {
            "mimeType": "text/plain",
            "headers": [
                {"name": "From", "value": from},
                {"name": "Subject", "value": "Question about the invoice"},
                {"name": "To", "value": "me@example.com"},
                {"name": "Message-ID", "value": format!("<{}@mail.example.com>", id)}
            ]
        },
        "internalDate": "1704124800000",
        "sizeEstimate": 1234
    })
}

/// Create mock Gmail list messages response (JSON)
pub fn mock_gmail_list_response(message_ids: Vec<&str>) -> serde_json::Value {
    if message_ids.is_empty() {
        // Gmail omits "messages" entirely when nothing matches
        return json!({ "resultSizeEstimate": 0 });
    }

    let messages: Vec<serde_json::Value> = message_ids
        .iter()
        .map(|id| json!({ "id": id, "threadId": format!("thread_{}", id) }))
        .collect();

    json!({
        "messages": messages,
        "resultSizeEstimate": messages.len()
    })
}

/// Write a provider-issued client file into `dir`
pub async fn write_credentials(dir: &Path) -> std::path::PathBuf {
    let path = dir.join("credentials.json");
    tokio::fs::write(&path, INSTALLED_CREDENTIALS).await.unwrap();
    path
}

/// A hub that talks plain HTTP to `base` without any authorization header
pub fn unauthenticated_hub(base: &str) -> GmailHub {
    #[cfg(not(windows))]
    let provider = rustls::crypto::aws_lc_rs::default_provider();
    #[cfg(windows)]
    let provider = rustls::crypto::ring::default_provider();

    let tls = rustls::ClientConfig::builder_with_provider(provider.into())
        .with_safe_default_protocol_versions()
        .unwrap()
        .with_root_certificates(rustls::RootCertStore::empty())
        .with_no_client_auth();

    let client = hyper_util::client::legacy::Client::builder(hyper_util::rt::TokioExecutor::new())
        .build(
            hyper_rustls::HttpsConnectorBuilder::new()
                .with_tls_config(tls)
                .https_or_http()
                .enable_http1()
                .build(),
        );

    let mut hub = Gmail::new(client, NoToken);
    hub.base_url(format!("{}/", base));
    hub.root_url(format!("{}/", base));
    hub
}

// Mock implementation of Mailbox for testing
mock! {
    pub Mailbox {}

    #[async_trait::async_trait]
    impl Mailbox for Mailbox {
        async fn list_message_ids(&self, query: &str, max_results: u32) -> Result<Vec<String>>;
        async fn get_message(&self, id: &str) -> Result<IncomingMessage>;
        async fn send_reply(&self, reply: &OutgoingReply) -> Result<String>;
        async fn modify_labels(&self, id: &str, add: &[String], remove: &[String]) -> Result<()>;
    }
}

// Mock implementation of the interactive consent
mock! {
    pub ConsentFlow {}

    #[async_trait::async_trait]
    impl ConsentFlow for ConsentFlow {
        async fn authorize(&self, credentials_path: &Path) -> Result<String>;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_test_message() {
        let msg = create_test_message("msg1", "Jane <jane@example.com>");
        assert_eq!(msg.id, "msg1");
        assert_eq!(msg.thread_id.as_deref(), Some("thread_msg1"));
        assert_eq!(msg.from.as_deref(), Some("Jane <jane@example.com>"));
    }

    #[test]
    fn test_mock_gmail_list_response() {
        let response = mock_gmail_list_response(vec!["msg1", "msg2"]);
        assert_eq!(response["messages"].as_array().unwrap().len(), 2);

        let empty = mock_gmail_list_response(vec![]);
        assert!(empty.get("messages").is_none());
    }
}
