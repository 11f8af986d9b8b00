// Ollama `/api/generate` client. One non-streaming request per summary,
// bounded by a per-request timeout. No retries.

use crate::core::summary::{SummaryError, SummaryProvider};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
}

#[derive(Deserialize, Debug)]
struct GenerateResponse {
    response: String,
}

pub struct OllamaClient {
    client: Client,
    url: String,
    model: String,
    timeout: Duration,
}

impl OllamaClient {
    pub fn new(url: impl Into<String>, model: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client: Client::new(),
            url: url.into(),
            model: model.into(),
            timeout,
        }
    }

    fn request_error(&self, err: reqwest::Error) -> SummaryError {
        if err.is_timeout() {
            SummaryError::Timeout(self.timeout.as_secs())
        } else if err.is_decode() {
            SummaryError::InvalidResponse(err.to_string())
        } else {
            SummaryError::Connection(err.to_string())
        }
    }
}

#[async_trait]
impl SummaryProvider for OllamaClient {
    async fn generate(&self, prompt: &str) -> Result<String, SummaryError> {
        let request_body = GenerateRequest {
            model: &self.model,
            prompt,
            stream: false,
        };

        let started = Instant::now();
        let response = self
            .client
            .post(&self.url)
            .timeout(self.timeout)
            .json(&request_body)
            .send()
            .await
            .map_err(|e| self.request_error(e))?;

        let status = response.status();
        if status != StatusCode::OK {
            tracing::warn!(
                status = status.as_u16(),
                model = %self.model,
                "Ollama returned an error status"
            );
            return Err(SummaryError::Status(status.as_u16()));
        }

        let body: GenerateResponse = response.json().await.map_err(|e| self.request_error(e))?;

        tracing::info!(
            model = %self.model,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Ollama summary received"
        );
        Ok(body.response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer, timeout: Duration) -> OllamaClient {
        OllamaClient::new(format!("{}/api/generate", server.uri()), "gemma:2b", timeout)
    }

    #[tokio::test]
    async fn posts_a_non_streaming_request_and_returns_the_response_field() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/generate"))
            .and(body_json(json!({
                "model": "gemma:2b",
                "prompt": "Summarize the following text:\nhello",
                "stream": false
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "model": "gemma:2b",
                "response": "A greeting.",
                "done": true
            })))
            .expect(1)
            .mount(&server)
            .await;

        let summary = client_for(&server, Duration::from_secs(5))
            .generate("Summarize the following text:\nhello")
            .await
            .unwrap();
        assert_eq!(summary, "A greeting.");
    }

    #[tokio::test]
    async fn server_error_reports_the_status_code() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_string("model crashed"))
            .expect(1)
            .mount(&server)
            .await;

        let err = client_for(&server, Duration::from_secs(5))
            .generate("x")
            .await
            .unwrap_err();
        assert_eq!(err, SummaryError::Status(500));
        assert!(err.to_string().contains("500"));
    }

    #[tokio::test]
    async fn slow_model_times_out_without_retrying() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"response": "late"}))
                    .set_delay(Duration::from_secs(3)),
            )
            .expect(1)
            .mount(&server)
            .await;

        let err = client_for(&server, Duration::from_secs(1))
            .generate("x")
            .await
            .unwrap_err();
        assert_eq!(err, SummaryError::Timeout(1));
        assert_eq!(
            err.to_string(),
            "Error: Ollama request timed out after 1 seconds."
        );
    }

    #[tokio::test]
    async fn unreachable_server_is_a_connection_error() {
        // Grab a free port, then close it so nothing is listening.
        let port = std::net::TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap()
            .port();
        let client = OllamaClient::new(
            format!("http://127.0.0.1:{}/api/generate", port),
            "gemma:2b",
            Duration::from_secs(5),
        );

        let err = client.generate("x").await.unwrap_err();
        assert!(matches!(err, SummaryError::Connection(_)));
        assert!(err.to_string().starts_with("Error connecting to Ollama:"));
    }

    #[tokio::test]
    async fn body_without_response_field_is_invalid() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"done": true})))
            .mount(&server)
            .await;

        let err = client_for(&server, Duration::from_secs(5))
            .generate("x")
            .await
            .unwrap_err();
        assert!(matches!(err, SummaryError::InvalidResponse(_)));
    }
}
