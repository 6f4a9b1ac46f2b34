//! OAuth2 authorization for the Gmail API
//!
//! The token cache is a small "authorized user" JSON document:
//!
//! ```json
//! {"type": "authorized_user", "client_id": "...", "client_secret": "...", "refresh_token": "..."}
//! ```
//!
//! When it is missing or unreadable, an interactive browser consent is run
//! once and its refresh token is written back to the cache.

use async_trait::async_trait;
use google_gmail1::common::GetToken;
use google_gmail1::{hyper_rustls, hyper_util, yup_oauth2, Gmail};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info};
use yup_oauth2::authorized_user::AuthorizedUserSecret;
use yup_oauth2::storage::{TokenInfo, TokenStorage};

use crate::error::{GmailError, Result};

/// Read, send and relabel messages. No permanent deletion.
pub const GMAIL_MODIFY_SCOPE: &str = "https://www.googleapis.com/auth/gmail.modify";

/// Scopes requested during interactive consent
pub const SCOPES: &[&str] = &[GMAIL_MODIFY_SCOPE];

/// `type` value of a cached token
pub const AUTHORIZED_USER_TYPE: &str = "authorized_user";

/// Type alias for Gmail Hub to simplify type signatures
pub type GmailHub = Gmail<hyper_rustls::HttpsConnector<hyper_util::client::legacy::connect::HttpConnector>>;

/// Cached authorized-user credential (`token.json`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedToken {
    #[serde(rename = "type")]
    pub kind: String,
    pub client_id: String,
    pub client_secret: String,
    pub refresh_token: String,
}

impl SavedToken {
    pub fn new(client: &ClientKey, refresh_token: &str) -> Self {
        Self {
            kind: AUTHORIZED_USER_TYPE.to_string(),
            client_id: client.client_id.clone(),
            client_secret: client.client_secret.clone(),
            refresh_token: refresh_token.to_string(),
        }
    }
}

impl From<&SavedToken> for AuthorizedUserSecret {
    fn from(token: &SavedToken) -> Self {
        AuthorizedUserSecret {
            client_id: token.client_id.clone(),
            client_secret: token.client_secret.clone(),
            refresh_token: token.refresh_token.clone(),
            key_type: token.kind.clone(),
        }
    }
}

/// Provider-issued OAuth2 client file (`credentials.json`)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientSecretFile {
    #[serde(default)]
    pub installed: Option<ClientKey>,
    #[serde(default)]
    pub web: Option<ClientKey>,
}

impl ClientSecretFile {
    /// Desktop-app key if present, otherwise the web-app key
    pub fn key(&self) -> Option<&ClientKey> {
        self.installed.as_ref().or(self.web.as_ref())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientKey {
    pub client_id: String,
    pub client_secret: String,
}

/// Load the OAuth2 client file
pub async fn load_client_secret(path: &Path) -> Result<ClientSecretFile> {
    let content = tokio::fs::read_to_string(path).await.map_err(|e| {
        GmailError::AuthError(format!("Failed to read credentials {:?}: {}", path, e))
    })?;
    let file = serde_json::from_str(&content)?;
    Ok(file)
}

/// Read the token cache.
///
/// Any failure counts as "no saved credentials".
pub async fn load_saved_credentials(token_path: &Path) -> Option<SavedToken> {
    let content = match tokio::fs::read_to_string(token_path).await {
        Ok(content) => content,
        Err(e) => {
            debug!("No token cache at {:?}: {}", token_path, e);
            return None;
        }
    };

    match serde_json::from_str::<SavedToken>(&content) {
        Ok(token) if token.kind == AUTHORIZED_USER_TYPE => Some(token),
        Ok(token) => {
            debug!("Ignoring token cache of type '{}'", token.kind);
            None
        }
        Err(e) => {
            debug!("Ignoring unreadable token cache {:?}: {}", token_path, e);
            None
        }
    }
}

/// Write the token cache from the client file and a fresh refresh token.
///
/// Overwrites any existing cache.
pub async fn save_credentials(
    credentials_path: &Path,
    token_path: &Path,
    refresh_token: &str,
) -> Result<SavedToken> {
    let secret_file = load_client_secret(credentials_path).await?;
    let key = secret_file.key().ok_or_else(|| {
        GmailError::AuthError(format!(
            "{:?} has neither an 'installed' nor a 'web' client",
            credentials_path
        ))
    })?;

    let token = SavedToken::new(key, refresh_token);

    if let Some(parent) = token_path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await?;
        }
    }
    tokio::fs::write(token_path, serde_json::to_string(&token)?).await?;
    secure_token_file(token_path).await?;

    info!("Saved credentials to {:?}", token_path);
    Ok(token)
}

/// Interactive consent that yields a refresh token
#[async_trait]
pub trait ConsentFlow: Send + Sync {
    async fn authorize(&self, credentials_path: &Path) -> Result<String>;
}

/// Browser consent via yup-oauth2's installed-app flow.
///
/// Prints the consent URL and listens on a local port for the redirect.
#[derive(Debug, Default, Clone, Copy)]
pub struct BrowserConsentFlow;

#[async_trait]
impl ConsentFlow for BrowserConsentFlow {
    async fn authorize(&self, credentials_path: &Path) -> Result<String> {
        let secret = yup_oauth2::read_application_secret(credentials_path)
            .await
            .map_err(|e| GmailError::AuthError(format!("Failed to read credentials: {}", e)))?;

        let storage = CapturedTokenStorage::default();
        let auth = yup_oauth2::InstalledFlowAuthenticator::builder(
            secret,
            yup_oauth2::InstalledFlowReturnMethod::HTTPRedirect,
        )
        .with_storage(Box::new(storage.clone()))
        .build()
        .await
        .map_err(|e| GmailError::AuthError(format!("Failed to build authenticator: {}", e)))?;

        auth.token(SCOPES)
            .await
            .map_err(|e| GmailError::AuthError(format!("Failed to obtain token: {}", e)))?;

        storage.refresh_token().await.ok_or_else(|| {
            GmailError::AuthError("Consent completed without a refresh token".to_string())
        })
    }
}

/// In-memory token store that keeps whatever the consent flow produced
#[derive(Clone, Default)]
struct CapturedTokenStorage {
    token: Arc<Mutex<Option<TokenInfo>>>,
}

impl CapturedTokenStorage {
    async fn refresh_token(&self) -> Option<String> {
        self.token
            .lock()
            .await
            .as_ref()
            .and_then(|t| t.refresh_token.clone())
    }
}

#[async_trait]
impl TokenStorage for CapturedTokenStorage {
    async fn set(&self, _scopes: &[&str], token: TokenInfo) -> anyhow::Result<()> {
        *self.token.lock().await = Some(token);
        Ok(())
    }

    async fn get(&self, _scopes: &[&str]) -> Option<TokenInfo> {
        self.token.lock().await.clone()
    }
}

/// Load or request authorization.
///
/// A usable token cache short-circuits; otherwise `flow` runs once and its
/// result is persisted.
pub async fn authorize<F>(credentials_path: &Path, token_path: &Path, flow: &F) -> Result<SavedToken>
where
    F: ConsentFlow + ?Sized,
{
    if let Some(token) = load_saved_credentials(token_path).await {
        debug!("Using saved credentials from {:?}", token_path);
        return Ok(token);
    }

    info!("No saved credentials, starting interactive authorization");
    let refresh_token = flow.authorize(credentials_path).await?;
    save_credentials(credentials_path, token_path, &refresh_token).await
}

/// Initialize the Gmail API hub from a cached token
pub async fn initialize_gmail_hub(token: &SavedToken) -> Result<GmailHub> {
    let auth = yup_oauth2::AuthorizedUserAuthenticator::builder(AuthorizedUserSecret::from(token))
        .build()
        .await
        .map_err(|e| GmailError::AuthError(format!("Failed to build authenticator: {}", e)))?;

    build_hub(auth)
}

/// Build a hub around any token source
///
/// Uses HTTP/1 for compatibility with google-gmail1.
pub fn build_hub<A>(auth: A) -> Result<GmailHub>
where
    A: GetToken + 'static,
{
    let client = hyper_util::client::legacy::Client::builder(hyper_util::rt::TokioExecutor::new())
        .build(
            hyper_rustls::HttpsConnectorBuilder::new()
                .with_native_roots()
                .map_err(|e| {
                    GmailError::AuthError(format!("Failed to load TLS roots: {}", e))
                })?
                .https_or_http()
                .enable_http1()
                .build(),
        );

    Ok(Gmail::new(client, auth))
}

/// Restrict the token file to its owner (0600)
#[cfg(unix)]
pub async fn secure_token_file(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let mut perms = tokio::fs::metadata(path).await?.permissions();
    perms.set_mode(0o600);
    tokio::fs::set_permissions(path, perms).await?;
    Ok(())
}

/// Windows relies on the profile directory ACLs
#[cfg(windows)]
pub async fn secure_token_file(_path: &Path) -> Result<()> {
    Ok(())
}
