// The `/summarize` slash command.
//
// Same turn as a chat mention, only the replies go through the interaction.
// The interaction is deferred first: a turn outlives Discord's 3 s ack window.

use crate::core::assistant::ReplySink;
use crate::discord::chat::{chunk_message, DISCORD_MESSAGE_LIMIT};
use crate::Assistant;
use async_trait::async_trait;
use std::sync::Arc;

/// Type alias for our bot's context.
/// This is what every command receives as its first parameter.
pub type Error = Box<dyn std::error::Error + Send + Sync>;
pub type Context<'a> = poise::Context<'a, Data, Error>;

/// Data that's shared across all commands and events.
pub struct Data {
    pub assistant: Arc<Assistant>,
}

/// Replies to the invoking interaction, splitting long messages.
struct CommandReply<'a> {
    ctx: Context<'a>,
}

#[async_trait]
impl ReplySink for CommandReply<'_> {
    async fn send(&self, message: &str) -> Result<(), Error> {
        for chunk in chunk_message(message, DISCORD_MESSAGE_LIMIT) {
            self.ctx.say(chunk).await?;
        }
        Ok(())
    }
}

/// Summarize a Google Drive file with the local model.
#[poise::command(slash_command)]
pub async fn summarize(
    ctx: Context<'_>,
    #[description = "File name, file ID or Drive link"] file: String,
) -> Result<(), Error> {
    ctx.defer().await?;

    tracing::info!(user = %ctx.author().name, query = %file, "Summarize command");
    let sink = CommandReply { ctx };
    ctx.data().assistant.handle_turn(&file, &sink).await;

    Ok(())
}
