use thiserror::Error;

/// Type alias for Result with GmailError
pub type Result<T> = std::result::Result<T, GmailError>;

/// Error types for the auto-responder
#[derive(Error, Debug)]
pub enum GmailError {
    /// Gmail API returned an error
    #[error("Gmail API error: {0}")]
    ApiError(String),

    /// Authentication or authorization failed
    #[error("Authentication failed: {0}")]
    AuthError(String),

    /// Rate limit exceeded - should retry after specified seconds
    #[error("Rate limit exceeded, retry after {retry_after} seconds")]
    RateLimitExceeded { retry_after: u64 },

    /// Network-related error (connection issues, timeouts, etc.)
    #[error("Network error: {0}")]
    NetworkError(String),

    /// Server returned 5xx error
    #[error("Server error (HTTP {status}): {message}")]
    ServerError { status: u16, message: String },

    /// Resource not found (404)
    #[error("Message not found: {0}")]
    MessageNotFound(String),

    /// Bad request (400)
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Forbidden (403)
    #[error("Access forbidden: {0}")]
    Forbidden(String),

    /// Message is missing data the responder needs
    #[error("Invalid message format: {0}")]
    InvalidMessageFormat(String),

    /// Sending the reply failed
    #[error("Failed to send reply: {0}")]
    SendError(String),

    /// Updating labels on the source message failed
    #[error("Label error: {0}")]
    LabelError(String),

    /// IO error (file operations, etc.)
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Generic catch-all error
    #[error("Unknown error: {0}")]
    Unknown(String),
}

impl GmailError {
    /// Check if the error is transient and should be retried
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            GmailError::RateLimitExceeded { .. }
                | GmailError::ServerError { .. }
                | GmailError::NetworkError(_)
        )
    }

    /// Check if the error is permanent and should not be retried
    pub fn is_permanent(&self) -> bool {
        !self.is_transient()
    }
}

/// Seconds to wait when the server gives no usable Retry-After
const DEFAULT_RETRY_AFTER: u64 = 5;

/// Parse the Retry-After header from an HTTP response
///
/// Accepts both delay-seconds ("120") and HTTP-date forms. Falls back to
/// 5 seconds when the header is missing, malformed or in the past.
fn parse_retry_after_header<B>(response: &hyper::Response<B>) -> u64 {
    let Some(value) = response
        .headers()
        .get("retry-after")
        .and_then(|v| v.to_str().ok())
    else {
        return DEFAULT_RETRY_AFTER;
    };

    if let Ok(seconds) = value.parse::<u64>() {
        return seconds;
    }

    httpdate::parse_http_date(value)
        .ok()
        .and_then(|date| date.duration_since(std::time::SystemTime::now()).ok())
        .map(|d| d.as_secs())
        .unwrap_or(DEFAULT_RETRY_AFTER)
}

/// Map an HTTP status to the matching error variant
fn from_status(status_code: u16, message: String, retry_after: u64) -> GmailError {
    match status_code {
        429 => GmailError::RateLimitExceeded { retry_after },
        404 => GmailError::MessageNotFound(message),
        400 => GmailError::BadRequest(message),
        401 => GmailError::AuthError(message),
        403 => GmailError::Forbidden(message),
        500..=599 => GmailError::ServerError {
            status: status_code,
            message,
        },
        _ => GmailError::ApiError(message),
    }
}

impl From<google_gmail1::Error> for GmailError {
    fn from(error: google_gmail1::Error) -> Self {
        match error {
            google_gmail1::Error::Failure(ref response) => {
                let status = response.status();
                let status_code = status.as_u16();
                let message = format!(
                    "HTTP {}: {}",
                    status_code,
                    status.canonical_reason().unwrap_or("Unknown")
                );

                from_status(status_code, message, parse_retry_after_header(response))
            }
            // The API sends JSON error bodies: {"error": {"code": 404, "message": "..."}}
            google_gmail1::Error::BadRequest(ref err) => {
                let code = err["error"]["code"].as_u64().and_then(|c| u16::try_from(c).ok());
                let message = err["error"]["message"]
                    .as_str()
                    .map(str::to_string)
                    .unwrap_or_else(|| err.to_string());

                match code {
                    Some(code) => from_status(
                        code,
                        format!("HTTP {}: {}", code, message),
                        DEFAULT_RETRY_AFTER,
                    ),
                    None => GmailError::BadRequest(message),
                }
            }
            google_gmail1::Error::HttpError(ref err) => {
                GmailError::NetworkError(format!("Connection error: {}", err))
            }
            google_gmail1::Error::Io(err) => GmailError::NetworkError(err.to_string()),
            google_gmail1::Error::MissingToken(err) => GmailError::AuthError(err.to_string()),
            _ => GmailError::ApiError(error.to_string()),
        }
    }
}
