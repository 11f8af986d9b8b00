// =============================================================================
// FILE-BACKED CREDENTIAL STORE
// =============================================================================
//
// Owns the token file. Two ways in:
// - `obtain` (the `auth` command): may open a browser for consent.
// - `load_for_service` (the bot): never prompts; tells the operator to run
//   `auth` instead.
//
// It also implements `TokenSource`, caching the credential in memory and
// refreshing + re-persisting it when the access token runs out.

use super::consent_flow::{ClientSecret, ConsentFlow, TokenResponse};
use crate::config::AppConfig;
use crate::core::auth::{AuthError, Credential, TokenSource};
use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use std::path::PathBuf;
use tokio::sync::Mutex;

pub struct FileCredentialStore {
    token_path: PathBuf,
    client_secret_path: PathBuf,
    /// Scopes every API call needs. Used by the `TokenSource` impl.
    scopes: Vec<String>,
    http: Client,
    cached: Mutex<Option<Credential>>,
}

impl FileCredentialStore {
    pub fn new(
        token_path: impl Into<PathBuf>,
        client_secret_path: impl Into<PathBuf>,
        scopes: Vec<String>,
    ) -> Self {
        Self {
            token_path: token_path.into(),
            client_secret_path: client_secret_path.into(),
            scopes,
            http: Client::new(),
            cached: Mutex::new(None),
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(
            config.token_path.clone(),
            config.client_secret_path.clone(),
            config.scopes.clone(),
        )
    }

    /// Reads the token file. A missing or unreadable file is `None`.
    pub async fn load(&self) -> Option<Credential> {
        let content = match tokio::fs::read_to_string(&self.token_path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
            Err(e) => {
                tracing::warn!(
                    path = %self.token_path.display(),
                    "Failed to read token file: {}",
                    e
                );
                return None;
            }
        };

        match serde_json::from_str(&content) {
            Ok(credential) => Some(credential),
            Err(e) => {
                tracing::warn!(
                    path = %self.token_path.display(),
                    "Ignoring malformed token file: {}",
                    e
                );
                None
            }
        }
    }

    pub async fn save(&self, credential: &Credential) -> Result<(), AuthError> {
        if let Some(parent) = self.token_path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| AuthError::Storage(e.to_string()))?;
        }

        let json = serde_json::to_string_pretty(credential)
            .map_err(|e| AuthError::Storage(e.to_string()))?;
        tokio::fs::write(&self.token_path, json)
            .await
            .map_err(|e| AuthError::Storage(e.to_string()))?;

        tracing::info!(path = %self.token_path.display(), "Saved Google credential");
        Ok(())
    }

    /// Interactive: returns a usable credential, running browser consent
    /// when nothing stored can be used.
    pub async fn obtain(&self, scopes: &[String]) -> Result<Credential, AuthError> {
        if let Some(stored) = self.load().await {
            if stored.covers(scopes) {
                if !stored.is_expired_at(Utc::now()) {
                    return Ok(stored);
                }
                if stored.can_refresh() {
                    match self.refresh_and_persist(&stored).await {
                        Ok(refreshed) => return Ok(refreshed),
                        Err(e) => tracing::warn!("Refresh failed, asking for consent again: {}", e),
                    }
                }
            } else {
                tracing::info!("Stored credential lacks requested scopes, asking for consent");
            }
        }

        let secret = ClientSecret::from_file(&self.client_secret_path).await?;
        let credential = ConsentFlow::new(self.http.clone(), secret, scopes.to_vec())
            .run()
            .await?;
        self.save(&credential).await?;

        *self.cached.lock().await = Some(credential.clone());
        Ok(credential)
    }

    /// Non-interactive: stored credential, refreshed if needed, or
    /// `NotAuthorized`.
    pub async fn load_for_service(&self, scopes: &[String]) -> Result<Credential, AuthError> {
        let not_authorized = || AuthError::NotAuthorized(self.token_path.display().to_string());

        let stored = self.load().await.ok_or_else(not_authorized)?;
        if !stored.covers(scopes) {
            return Err(not_authorized());
        }
        if !stored.is_expired_at(Utc::now()) {
            return Ok(stored);
        }
        if !stored.can_refresh() {
            return Err(not_authorized());
        }

        self.refresh_and_persist(&stored).await
    }

    async fn refresh_and_persist(&self, stored: &Credential) -> Result<Credential, AuthError> {
        let refreshed = self.refresh(stored).await?;
        self.save(&refreshed).await?;
        Ok(refreshed)
    }

    /// Trades the refresh token for a new access token.
    async fn refresh(&self, stored: &Credential) -> Result<Credential, AuthError> {
        let refresh_token = stored
            .refresh_token
            .as_deref()
            .ok_or_else(|| AuthError::RefreshFailed("no refresh token".to_string()))?;

        let params = [
            ("client_id", stored.client_id.as_str()),
            ("client_secret", stored.client_secret.as_str()),
            ("refresh_token", refresh_token),
            ("grant_type", "refresh_token"),
        ];

        let response = self
            .http
            .post(&stored.token_uri)
            .form(&params)
            .send()
            .await
            .map_err(|e| AuthError::RefreshFailed(e.to_string()))?;

        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(AuthError::RefreshFailed(error_text));
        }

        let tokens: TokenResponse = response
            .json()
            .await
            .map_err(|e| AuthError::RefreshFailed(e.to_string()))?;

        tracing::info!("Refreshed Google access token");

        let mut refreshed = stored.clone();
        refreshed.expiry = tokens.expiry();
        if let Some(scopes) = tokens.granted_scopes() {
            refreshed.scopes = scopes;
        }
        // Google only sometimes rotates the refresh token.
        if let Some(rotated) = tokens.refresh_token {
            refreshed.refresh_token = Some(rotated);
        }
        refreshed.token = tokens.access_token;
        Ok(refreshed)
    }
}

#[async_trait]
impl TokenSource for FileCredentialStore {
    async fn access_token(&self) -> Result<String, AuthError> {
        // Held across the refresh so concurrent turns refresh only once.
        let mut cached = self.cached.lock().await;

        if let Some(credential) = cached.as_ref() {
            if credential.is_valid_for(&self.scopes, Utc::now()) {
                return Ok(credential.token.clone());
            }
        }

        let credential = match cached.take() {
            Some(expired) if expired.can_refresh() => self.refresh_and_persist(&expired).await?,
            _ => self.load_for_service(&self.scopes).await?,
        };

        let token = credential.token.clone();
        *cached = Some(credential);
        Ok(token)
    }
}
