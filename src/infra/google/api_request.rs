// Authorized GET shared by the Drive and Sheets clients.
//
// Every call asks the token source for a fresh bearer token first, so an
// expired access token is refreshed right before the request that needs it.

use crate::core::auth::TokenSource;
use crate::core::drive::ApiError;
use reqwest::{Client, StatusCode, Url};
use serde::de::DeserializeOwned;

/// Appends path segments to `base`, percent-encoding each one.
pub(crate) fn api_url(base: &str, segments: &[&str]) -> Result<Url, ApiError> {
    let mut url = Url::parse(base)
        .map_err(|e| ApiError::Transport(format!("invalid base URL {}: {}", base, e)))?;
    url.path_segments_mut()
        .map_err(|_| ApiError::Transport(format!("base URL cannot take a path: {}", base)))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

/// Sends an authorized GET and maps 404 and other failures to `ApiError`.
pub(crate) async fn authorized_get(
    client: &Client,
    tokens: &dyn TokenSource,
    url: Url,
) -> Result<reqwest::Response, ApiError> {
    let token = tokens.access_token().await?;

    tracing::debug!(url = %url, "Google API request");
    let response = client
        .get(url)
        .bearer_auth(token)
        .send()
        .await
        .map_err(|e| ApiError::Transport(e.to_string()))?;

    let status = response.status();
    if status == StatusCode::NOT_FOUND {
        return Err(ApiError::NotFound);
    }
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(ApiError::Status {
            status: status.as_u16(),
            body,
        });
    }

    Ok(response)
}

pub(crate) async fn get_json<T: DeserializeOwned>(
    client: &Client,
    tokens: &dyn TokenSource,
    url: Url,
) -> Result<T, ApiError> {
    authorized_get(client, tokens, url)
        .await?
        .json::<T>()
        .await
        .map_err(|e| ApiError::Decode(e.to_string()))
}

pub(crate) async fn get_bytes(
    client: &Client,
    tokens: &dyn TokenSource,
    url: Url,
) -> Result<Vec<u8>, ApiError> {
    let bytes = authorized_get(client, tokens, url)
        .await?
        .bytes()
        .await
        .map_err(|e| ApiError::Transport(e.to_string()))?;
    Ok(bytes.to_vec())
}
