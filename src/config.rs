use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::error::{GmailError, Result};
use crate::models::ReplyTemplate;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub schedule: ScheduleConfig,
    #[serde(default)]
    pub poll: PollConfig,
    #[serde(default)]
    pub reply: ReplyConfig,
    #[serde(default)]
    pub labels: LabelConfig,
    #[serde(default)]
    pub api: ApiConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleConfig {
    #[serde(default = "default_interval_minutes")]
    pub interval_minutes: u64,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            interval_minutes: default_interval_minutes(),
        }
    }
}

impl ScheduleConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_minutes * 60)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollConfig {
    #[serde(default = "default_query")]
    pub query: String,
    #[serde(default = "default_max_results")]
    pub max_results: u32,
    /// Log "No new message" when a cycle finds nothing
    #[serde(default = "default_log_when_idle")]
    pub log_when_idle: bool,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            query: default_query(),
            max_results: default_max_results(),
            log_when_idle: default_log_when_idle(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplyConfig {
    #[serde(default = "default_sender_name")]
    pub sender_name: String,
    #[serde(default = "default_subject")]
    pub subject: String,
    #[serde(default = "default_body")]
    pub body: String,
}

impl Default for ReplyConfig {
    fn default() -> Self {
        Self {
            sender_name: default_sender_name(),
            subject: default_subject(),
            body: default_body(),
        }
    }
}

/// Placeholder in `reply.body` replaced by `reply.sender_name`
pub const SENDER_NAME_PLACEHOLDER: &str = "{sender_name}";

impl ReplyConfig {
    /// Build the reply template, signing the body with `sender_name`
    pub fn template(&self) -> ReplyTemplate {
        ReplyTemplate {
            sender_name: self.sender_name.clone(),
            subject: self.subject.clone(),
            body: self.body.replace(SENDER_NAME_PLACEHOLDER, &self.sender_name),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LabelConfig {
    #[serde(default = "default_remove_labels")]
    pub remove: Vec<String>,
    #[serde(default = "default_add_labels")]
    pub add: Vec<String>,
}

impl Default for LabelConfig {
    fn default() -> Self {
        Self {
            remove: default_remove_labels(),
            add: default_add_labels(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl ApiConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

fn default_interval_minutes() -> u64 {
    10
}

fn default_query() -> String {
    "is:unread".to_string()
}

fn default_max_results() -> u32 {
    1
}

fn default_log_when_idle() -> bool {
    true
}

fn default_sender_name() -> String {
    "Auto Responder".to_string()
}

fn default_subject() -> String {
    "no-reply".to_string()
}

fn default_body() -> String {
    "I hope this email finds you well. Thank you for reaching out to me.
I regret to inform you that I am currently out of the office on vacation and will not be able to respond to emails until my return soon. I apologize for any inconvenience this may cause.
If your matter is urgent, please contact 123456789 . Otherwise, I appreciate your understanding, and I will do my best to respond to your email promptly upon my return.

Thank you for your patience.

Best regards,
{sender_name}"
        .to_string()
}

fn default_remove_labels() -> Vec<String> {
    vec!["UNREAD".to_string()]
}

fn default_add_labels() -> Vec<String> {
    vec!["INBOX".to_string()]
}

fn default_max_retries() -> u32 {
    3
}

fn default_request_timeout_secs() -> u64 {
    30
}

impl Config {
    pub async fn load(path: &Path) -> Result<Self> {
        // If file doesn't exist, return default config with warning
        if !path.exists() {
            tracing::warn!("Config file not found at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| GmailError::ConfigError(format!("Failed to read config file: {}", e)))?;

        let config: Self = toml::from_str(&content)
            .map_err(|e| GmailError::ConfigError(format!("Failed to parse config file: {}", e)))?;

        config.validate()?;

        tracing::info!("Loaded configuration from {:?}", path);
        Ok(config)
    }

    pub async fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                GmailError::ConfigError(format!("Failed to create config directory: {}", e))
            })?;
        }

        let content = toml::to_string_pretty(self)
            .map_err(|e| GmailError::ConfigError(format!("Failed to serialize config: {}", e)))?;

        tokio::fs::write(path, content)
            .await
            .map_err(|e| GmailError::ConfigError(format!("Failed to write config file: {}", e)))?;

        tracing::info!("Saved configuration to {:?}", path);
        Ok(())
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.schedule.interval_minutes == 0 {
            return Err(GmailError::ConfigError(
                "schedule.interval_minutes must be at least 1".to_string(),
            ));
        }
        if self.schedule.interval_minutes > 1440 {
            return Err(GmailError::ConfigError(
                "schedule.interval_minutes cannot exceed 1440 (1 day)".to_string(),
            ));
        }

        if self.poll.query.trim().is_empty() {
            return Err(GmailError::ConfigError(
                "poll.query cannot be empty".to_string(),
            ));
        }
        if self.poll.max_results == 0 {
            return Err(GmailError::ConfigError(
                "poll.max_results must be at least 1".to_string(),
            ));
        }
        if self.poll.max_results > 500 {
            return Err(GmailError::ConfigError(
                "poll.max_results cannot exceed 500 (Gmail API page limit)".to_string(),
            ));
        }

        if self.reply.sender_name.trim().is_empty() {
            return Err(GmailError::ConfigError(
                "reply.sender_name cannot be empty".to_string(),
            ));
        }
        if self.reply.subject.trim().is_empty() {
            return Err(GmailError::ConfigError(
                "reply.subject cannot be empty".to_string(),
            ));
        }
        // Header values must stay on one line
        for (field, value) in [
            ("reply.sender_name", &self.reply.sender_name),
            ("reply.subject", &self.reply.subject),
        ] {
            if value.contains('\r') || value.contains('\n') {
                return Err(GmailError::ConfigError(format!(
                    "{} cannot contain line breaks",
                    field
                )));
            }
        }

        for label in self.labels.remove.iter().chain(self.labels.add.iter()) {
            if label.is_empty() {
                return Err(GmailError::ConfigError(
                    "labels.remove and labels.add cannot contain empty strings".to_string(),
                ));
            }
        }
        if let Some(label) = self.labels.add.iter().find(|l| self.labels.remove.contains(*l)) {
            return Err(GmailError::ConfigError(format!(
                "Label '{}' cannot be both added and removed",
                label
            )));
        }

        if self.api.max_retries > 10 {
            return Err(GmailError::ConfigError(
                "api.max_retries cannot exceed 10".to_string(),
            ));
        }
        if self.api.request_timeout_secs == 0 {
            return Err(GmailError::ConfigError(
                "api.request_timeout_secs must be greater than 0".to_string(),
            ));
        }

        tracing::debug!("Configuration validation passed");
        Ok(())
    }

    /// Create an example configuration file
    pub async fn create_example(path: &Path) -> Result<()> {
        let config = Self::default();
        config.save(path).await
    }
}
