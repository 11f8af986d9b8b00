// Credential model and the token port used by every Google API client.
//
// The core never touches the token file or the OAuth endpoints. It only
// knows what a credential looks like, when one is usable, and that
// somebody can hand out a bearer token on request (`TokenSource`).

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Tokens this close to expiry are treated as already expired.
const EXPIRY_SKEW_SECS: i64 = 60;

// ============================================================================
// ERRORS
// ============================================================================

/// Everything that can go wrong while obtaining a credential.
/// All of these are fatal for the run: nothing here is retried.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("No usable Google credential at {0}. Run the `auth` command to grant access.")]
    NotAuthorized(String),

    #[error("Failed to read OAuth client secret: {0}")]
    ClientSecret(String),

    #[error("Failed to start OAuth callback server: {0}")]
    CallbackServer(String),

    #[error("OAuth consent was not completed within {0} seconds")]
    Timeout(u64),

    #[error("OAuth consent failed: {0}")]
    Consent(String),

    #[error("Token exchange failed: {0}")]
    TokenExchange(String),

    #[error("Token refresh failed: {0}")]
    RefreshFailed(String),

    #[error("Credential storage error: {0}")]
    Storage(String),
}

// ============================================================================
// DOMAIN MODEL
// ============================================================================

/// A user credential for the Google APIs.
///
/// Field names follow Google's "authorized user" token file, so a token
/// written by other Google tooling for the same client can be reused as is.
/// Unknown fields in that file are ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Credential {
    /// Short-lived bearer token.
    pub token: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,

    pub token_uri: String,
    pub client_id: String,
    pub client_secret: String,

    /// Scopes that were granted during consent.
    #[serde(default)]
    pub scopes: Vec<String>,

    /// When `token` stops working. `None` means "unknown", which is
    /// treated as still valid.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry: Option<DateTime<Utc>>,
}

impl Credential {
    /// Does this credential carry every one of `requested`?
    pub fn covers(&self, requested: &[String]) -> bool {
        requested.iter().all(|scope| self.scopes.contains(scope))
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        match self.expiry {
            Some(expiry) => expiry - Duration::seconds(EXPIRY_SKEW_SECS) <= now,
            None => false,
        }
    }

    pub fn can_refresh(&self) -> bool {
        self.refresh_token
            .as_deref()
            .map(|t| !t.is_empty())
            .unwrap_or(false)
    }

    /// Usable right now for the requested scopes, without a refresh.
    pub fn is_valid_for(&self, requested: &[String], now: DateTime<Utc>) -> bool {
        !self.token.is_empty() && self.covers(requested) && !self.is_expired_at(now)
    }
}

// ============================================================================
// TOKEN PORT
// ============================================================================

/// Hands out a current bearer token, refreshing behind the scenes if needed.
#[async_trait]
pub trait TokenSource: Send + Sync {
    async fn access_token(&self) -> Result<String, AuthError>;
}

/// A fixed token for client tests.
#[cfg(test)]
pub struct StaticToken(pub String);

#[cfg(test)]
#[async_trait]
impl TokenSource for StaticToken {
    async fn access_token(&self) -> Result<String, AuthError> {
        Ok(self.0.clone())
    }
}
