// Summarization: the prompt we send and how model failures read to the user.
// No Ollama or HTTP types here; `infra::ollama` implements `SummaryProvider`.

use async_trait::async_trait;
use thiserror::Error;

/// The prompt is this prefix followed directly by the (truncated) document.
pub const PROMPT_PREFIX: &str = "Summarize the following text:\n";

/// Documents longer than this many words are cut before summarizing.
pub const DEFAULT_MAX_WORDS: usize = 5000;

// ============================================================================
// ERRORS
// ============================================================================

/// A failed summary request. Each variant's text is sent to the user verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SummaryError {
    /// The model server answered with a non-200 status.
    #[error("Error summarizing with Ollama: {0}")]
    Status(u16),

    #[error("Error connecting to Ollama: {0}")]
    Connection(String),

    #[error("Error: Ollama request timed out after {0} seconds.")]
    Timeout(u64),

    /// 200, but the body did not carry a summary.
    #[error("Error reading Ollama response: {0}")]
    InvalidResponse(String),
}

// ============================================================================
// PROVIDER PORT
// ============================================================================

#[async_trait]
pub trait SummaryProvider: Send + Sync {
    /// One non-streaming completion for `prompt`. No retries.
    async fn generate(&self, prompt: &str) -> Result<String, SummaryError>;
}

// ============================================================================
// SERVICE
// ============================================================================

/// First `limit` whitespace-separated words of `text`, joined by single spaces.
///
/// Runs of whitespace (newlines included) collapse to one space even when
/// nothing is cut off.
pub fn truncate_words(text: &str, limit: usize) -> String {
    text.split_whitespace()
        .take(limit)
        .collect::<Vec<_>>()
        .join(" ")
}

pub struct SummaryService<P: SummaryProvider> {
    provider: P,
    max_words: usize,
}

impl<P: SummaryProvider> SummaryService<P> {
    pub fn new(provider: P, max_words: usize) -> Self {
        Self {
            provider,
            max_words,
        }
    }

    pub fn max_words(&self) -> usize {
        self.max_words
    }

    pub fn truncate(&self, text: &str) -> String {
        truncate_words(text, self.max_words)
    }

    pub fn build_prompt(&self, text: &str) -> String {
        format!("{}{}", PROMPT_PREFIX, text)
    }

    /// Summarizes already-truncated text.
    pub async fn summarize(&self, text: &str) -> Result<String, SummaryError> {
        let prompt = self.build_prompt(text);
        tracing::debug!(prompt_chars = prompt.len(), "Sending summary prompt");
        self.provider.generate(&prompt).await
    }
}
