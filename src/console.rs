// Console front-end: one turn, every message printed to stdout.

use crate::core::assistant::{ReplySink, TurnOutcome};
use crate::Assistant;
use async_trait::async_trait;
use std::error::Error;

pub struct ConsoleReply;

#[async_trait]
impl ReplySink for ConsoleReply {
    async fn send(&self, message: &str) -> Result<(), Box<dyn Error + Send + Sync>> {
        println!("{}", message);
        Ok(())
    }
}

pub async fn run_turn(assistant: &Assistant, query: &str) -> TurnOutcome {
    assistant.handle_turn(query, &ConsoleReply).await
}
