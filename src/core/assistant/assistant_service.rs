// One conversation turn, front-end agnostic.
//
// Discord and the console both funnel user input through `handle_turn`. The
// service never returns an error to them: every failure becomes a message
// on the sink, and the outcome only tells the caller how the turn ended.

use super::drive::{DriveApi, DriveService, RemoteFile, SheetsApi};
use super::summary::{SummaryProvider, SummaryService};
use async_trait::async_trait;
use std::error::Error;

pub const USAGE_HINT: &str =
    "Tell me which Google Drive file to summarize, by name, file ID or link.";

/// Where a turn's status and result messages go.
#[async_trait]
pub trait ReplySink: Send + Sync {
    async fn send(&self, message: &str) -> Result<(), Box<dyn Error + Send + Sync>>;
}

/// How a turn ended. Mostly interesting to logs and tests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnOutcome {
    EmptyInput,
    /// The message already sent to the user.
    Failed(String),
    Summarized { file: RemoteFile, words: usize },
}

pub struct AssistantService<D: DriveApi, S: SheetsApi, P: SummaryProvider> {
    drive: DriveService<D, S>,
    summarizer: SummaryService<P>,
}

impl<D: DriveApi, S: SheetsApi, P: SummaryProvider> AssistantService<D, S, P> {
    pub fn new(drive: DriveService<D, S>, summarizer: SummaryService<P>) -> Self {
        Self { drive, summarizer }
    }

    pub async fn handle_turn(&self, input: &str, sink: &dyn ReplySink) -> TurnOutcome {
        let query = input.trim();
        if query.is_empty() {
            reply(sink, USAGE_HINT).await;
            return TurnOutcome::EmptyInput;
        }

        reply(sink, &format!("Processing {}, please wait...", query)).await;

        let (file, content) = match self.drive.fetch_content(query).await {
            Ok(found) => found,
            Err(e) => {
                let message = e.to_string();
                tracing::warn!(query = %query, "Could not read file: {}", message);
                reply(sink, &message).await;
                return TurnOutcome::Failed(message);
            }
        };

        let text = self.summarizer.truncate(&content);
        let words = text.split(' ').filter(|w| !w.is_empty()).count();
        tracing::info!(
            file_name = %file.name,
            words,
            limit = self.summarizer.max_words(),
            "Prepared text for summarization"
        );

        reply(sink, "Sending request to Ollama for summarization...").await;

        match self.summarizer.summarize(&text).await {
            Ok(summary) => {
                reply(sink, &format!("Summary of {}:\n{}", query, summary)).await;
                TurnOutcome::Summarized { file, words }
            }
            Err(e) => {
                let message = e.to_string();
                tracing::warn!(query = %query, "Summarization failed: {}", message);
                reply(sink, &message).await;
                TurnOutcome::Failed(message)
            }
        }
    }
}

/// A lost status message shouldn't end the turn.
async fn reply(sink: &dyn ReplySink, message: &str) {
    if let Err(e) = sink.send(message).await {
        tracing::warn!("Failed to deliver reply: {}", e);
    }
}
