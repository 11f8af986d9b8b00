//! Interactive OAuth consent for an installed app (authorization code + PKCE).
//!
//! A one-shot HTTP listener on 127.0.0.1 catches the redirect, the user
//! approves access in their browser, and the code is swapped for tokens.

use crate::core::auth::{AuthError, Credential};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::{Duration as ChronoDuration, Utc};
use rand::Rng;
use reqwest::{Client, Url};
use serde::Deserialize;
use sha2::{Digest, Sha256};
use std::path::Path;
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::Duration;
use tiny_http::{Header, Response, Server};

const DEFAULT_AUTH_URI: &str = "https://accounts.google.com/o/oauth2/auth";
const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

/// How long the user has to finish consent in the browser.
pub const CONSENT_TIMEOUT: Duration = Duration::from_secs(300);

const SUCCESS_PAGE: &str =
    "<html><body><h1>Authorization complete</h1><p>You can close this window.</p></body></html>";
const FAILURE_PAGE: &str =
    "<html><body><h1>Authorization failed</h1><p>Return to the terminal for details.</p></body></html>";

// =============================================================================
// CLIENT SECRET
// =============================================================================

/// The OAuth client downloaded from the Google Cloud console.
#[derive(Debug, Clone, Deserialize)]
pub struct ClientSecret {
    pub client_id: String,
    pub client_secret: String,
    #[serde(default = "default_auth_uri")]
    pub auth_uri: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_auth_uri() -> String {
    DEFAULT_AUTH_URI.to_string()
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

/// The console wraps the client in `installed` (desktop) or `web`.
#[derive(Debug, Deserialize)]
struct ClientSecretFile {
    installed: Option<ClientSecret>,
    web: Option<ClientSecret>,
}

impl ClientSecret {
    pub fn from_json(json: &str) -> Result<Self, AuthError> {
        let file: ClientSecretFile =
            serde_json::from_str(json).map_err(|e| AuthError::ClientSecret(e.to_string()))?;
        file.installed.or(file.web).ok_or_else(|| {
            AuthError::ClientSecret("expected an 'installed' or 'web' client".to_string())
        })
    }

    pub async fn from_file(path: &Path) -> Result<Self, AuthError> {
        let json = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| AuthError::ClientSecret(format!("{}: {}", path.display(), e)))?;
        Self::from_json(&json)
    }
}

// =============================================================================
// TOKEN ENDPOINT
// =============================================================================

/// Response of the token endpoint, for both code exchange and refresh.
#[derive(Debug, Deserialize)]
pub(super) struct TokenResponse {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_in: Option<i64>,
    /// Space-separated scopes actually granted.
    pub scope: Option<String>,
}

impl TokenResponse {
    pub fn granted_scopes(&self) -> Option<Vec<String>> {
        self.scope
            .as_ref()
            .map(|s| s.split_whitespace().map(str::to_string).collect())
    }

    pub fn expiry(&self) -> Option<chrono::DateTime<Utc>> {
        self.expires_in
            .map(|secs| Utc::now() + ChronoDuration::seconds(secs))
    }
}

// =============================================================================
// PKCE
// =============================================================================

/// 32 random bytes, base64url encoded. Also used for `state`.
fn random_token() -> String {
    let mut rng = rand::thread_rng();
    let bytes: Vec<u8> = (0..32).map(|_| rng.gen::<u8>()).collect();
    URL_SAFE_NO_PAD.encode(bytes)
}

/// S256 code challenge (RFC 7636).
fn code_challenge(verifier: &str) -> String {
    let digest = Sha256::digest(verifier.as_bytes());
    URL_SAFE_NO_PAD.encode(digest)
}

// =============================================================================
// CALLBACK LISTENER
// =============================================================================

type CallbackResult = Result<String, AuthError>;

/// One-shot redirect catcher on a dedicated thread.
struct CallbackListener {
    server: Arc<Server>,
    port: u16,
    rx: mpsc::Receiver<CallbackResult>,
}

impl CallbackListener {
    fn start(expected_state: String) -> Result<Self, AuthError> {
        let server = Server::http("127.0.0.1:0")
            .map_err(|e| AuthError::CallbackServer(e.to_string()))?;
        let port = server
            .server_addr()
            .to_ip()
            .map(|addr| addr.port())
            .ok_or_else(|| AuthError::CallbackServer("listener has no IP address".to_string()))?;

        let server = Arc::new(server);
        let (tx, rx) = mpsc::channel();
        let worker = Arc::clone(&server);
        thread::spawn(move || serve_callback(&worker, &tx, &expected_state));

        Ok(Self { server, port, rx })
    }

    fn redirect_uri(&self) -> String {
        format!("http://127.0.0.1:{}/", self.port)
    }

    /// Blocks (on the blocking pool) until the redirect arrives or `timeout` passes.
    async fn wait(self, timeout: Duration) -> Result<String, AuthError> {
        let Self { server, rx, .. } = self;
        let received = tokio::task::spawn_blocking(move || rx.recv_timeout(timeout))
            .await
            .map_err(|e| AuthError::Consent(e.to_string()))?;
        server.unblock();

        match received {
            Ok(result) => result,
            Err(mpsc::RecvTimeoutError::Timeout) => Err(AuthError::Timeout(timeout.as_secs())),
            Err(mpsc::RecvTimeoutError::Disconnected) => Err(AuthError::Consent(
                "callback listener stopped unexpectedly".to_string(),
            )),
        }
    }
}

/// Answers requests until one carries `code` or `error`. Anything else
/// (favicon requests and the like) gets a 404.
fn serve_callback(server: &Server, tx: &mpsc::Sender<CallbackResult>, expected_state: &str) {
    for request in server.incoming_requests() {
        let Some(result) = parse_callback(request.url(), expected_state) else {
            let _ = request.respond(Response::from_string("Not found").with_status_code(404));
            continue;
        };

        let page = if result.is_ok() { SUCCESS_PAGE } else { FAILURE_PAGE };
        let mut response = Response::from_string(page);
        if let Ok(content_type) = Header::from_bytes(&b"Content-Type"[..], &b"text/html"[..]) {
            response = response.with_header(content_type);
        }
        let _ = request.respond(response);
        let _ = tx.send(result);
        return;
    }
}

/// `None` when the request isn't the OAuth redirect at all.
fn parse_callback(request_url: &str, expected_state: &str) -> Option<CallbackResult> {
    let url = Url::parse("http://127.0.0.1")
        .and_then(|base| base.join(request_url))
        .ok()?;

    let mut code = None;
    let mut state = None;
    let mut error = None;
    for (key, value) in url.query_pairs() {
        match key.as_ref() {
            "code" => code = Some(value.into_owned()),
            "state" => state = Some(value.into_owned()),
            "error" => error = Some(value.into_owned()),
            _ => {}
        }
    }

    if let Some(error) = error {
        return Some(Err(AuthError::Consent(format!("access was not granted ({})", error))));
    }
    let code = code?;

    if state.as_deref() != Some(expected_state) {
        tracing::error!("OAuth state mismatch on callback");
        return Some(Err(AuthError::Consent("state verification failed".to_string())));
    }

    Some(Ok(code))
}

// =============================================================================
// CONSENT FLOW
// =============================================================================

pub struct ConsentFlow {
    http: Client,
    secret: ClientSecret,
    scopes: Vec<String>,
    timeout: Duration,
}

impl ConsentFlow {
    pub fn new(http: Client, secret: ClientSecret, scopes: Vec<String>) -> Self {
        Self {
            http,
            secret,
            scopes,
            timeout: CONSENT_TIMEOUT,
        }
    }

    /// Runs the whole browser round trip and returns the fresh credential.
    pub async fn run(&self) -> Result<Credential, AuthError> {
        let verifier = random_token();
        let state = random_token();

        let listener = CallbackListener::start(state.clone())?;
        let redirect_uri = listener.redirect_uri();
        let auth_url = self.authorization_url(&code_challenge(&verifier), &state, &redirect_uri)?;

        tracing::info!(redirect_uri = %redirect_uri, "Waiting for OAuth consent");
        println!(
            "Please visit this URL to authorize this application:\n{}",
            auth_url
        );
        if let Err(e) = open_browser(auth_url.as_str()) {
            tracing::warn!("Failed to open browser: {}", e);
        }

        let code = listener.wait(self.timeout).await?;
        self.exchange_code(&code, &verifier, &redirect_uri).await
    }

    fn authorization_url(
        &self,
        challenge: &str,
        state: &str,
        redirect_uri: &str,
    ) -> Result<Url, AuthError> {
        let scope = self.scopes.join(" ");
        Url::parse_with_params(
            &self.secret.auth_uri,
            &[
                ("client_id", self.secret.client_id.as_str()),
                ("redirect_uri", redirect_uri),
                ("response_type", "code"),
                ("scope", scope.as_str()),
                ("code_challenge", challenge),
                ("code_challenge_method", "S256"),
                ("state", state),
                ("access_type", "offline"),
                ("prompt", "consent"),
            ],
        )
        .map_err(|e| AuthError::ClientSecret(format!("invalid auth_uri: {}", e)))
    }

    async fn exchange_code(
        &self,
        code: &str,
        verifier: &str,
        redirect_uri: &str,
    ) -> Result<Credential, AuthError> {
        let params = [
            ("client_id", self.secret.client_id.as_str()),
            ("client_secret", self.secret.client_secret.as_str()),
            ("code", code),
            ("code_verifier", verifier),
            ("grant_type", "authorization_code"),
            ("redirect_uri", redirect_uri),
        ];

        let response = self
            .http
            .post(&self.secret.token_uri)
            .form(&params)
            .send()
            .await
            .map_err(|e| AuthError::TokenExchange(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(AuthError::TokenExchange(format!("{}: {}", status, text)));
        }

        let tokens: TokenResponse = response
            .json()
            .await
            .map_err(|e| AuthError::TokenExchange(e.to_string()))?;

        Ok(Credential {
            scopes: tokens.granted_scopes().unwrap_or_else(|| self.scopes.clone()),
            expiry: tokens.expiry(),
            token: tokens.access_token,
            refresh_token: tokens.refresh_token,
            token_uri: self.secret.token_uri.clone(),
            client_id: self.secret.client_id.clone(),
            client_secret: self.secret.client_secret.clone(),
        })
    }
}

fn open_browser(url: &str) -> std::io::Result<()> {
    #[cfg(target_os = "macos")]
    {
        std::process::Command::new("open").arg(url).spawn()?;
    }
    #[cfg(target_os = "windows")]
    {
        std::process::Command::new("cmd")
            .args(["/C", "start", "", url])
            .spawn()?;
    }
    #[cfg(all(unix, not(target_os = "macos")))]
    {
        std::process::Command::new("xdg-open").arg(url).spawn()?;
    }
    Ok(())
}
