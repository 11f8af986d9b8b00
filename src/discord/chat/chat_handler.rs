// Chat front-end: a DM to the bot, or a guild message mentioning it, is one
// summarize request. The mention is stripped and the rest is the query.

use crate::core::assistant::ReplySink;
use crate::discord::{Data, Error};
use async_trait::async_trait;
use poise::serenity_prelude as serenity;
use std::sync::Arc;

/// Discord rejects messages longer than this (in characters).
pub const DISCORD_MESSAGE_LIMIT: usize = 2000;

/// Splits `text` into pieces of at most `limit` characters.
/// Always returns at least one piece, so an empty reply is still sent.
pub fn chunk_message(text: &str, limit: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    if chars.is_empty() {
        return vec![String::new()];
    }
    chars
        .chunks(limit.max(1))
        .map(|chunk| chunk.iter().collect())
        .collect()
}

/// Removes `<@id>` and `<@!id>` mentions of the bot and trims the rest.
pub fn extract_query(content: &str, bot_id: u64) -> String {
    content
        .replace(&format!("<@{}>", bot_id), "")
        .replace(&format!("<@!{}>", bot_id), "")
        .trim()
        .to_string()
}

/// Posts replies into the channel the request came from.
pub struct ChannelReply {
    http: Arc<serenity::Http>,
    channel_id: serenity::ChannelId,
}

impl ChannelReply {
    pub fn new(http: Arc<serenity::Http>, channel_id: serenity::ChannelId) -> Self {
        Self { http, channel_id }
    }
}

#[async_trait]
impl ReplySink for ChannelReply {
    async fn send(&self, message: &str) -> Result<(), Error> {
        for chunk in chunk_message(message, DISCORD_MESSAGE_LIMIT) {
            self.channel_id.say(&self.http, chunk).await?;
        }
        Ok(())
    }
}

/// Entry point for `FullEvent::Message`.
pub async fn handle_message(
    ctx: &serenity::Context,
    message: &serenity::Message,
    data: &Data,
) -> Result<(), Error> {
    // Ignore bot messages (including our own)
    if message.author.bot {
        return Ok(());
    }

    let bot_id = ctx.cache.current_user().id;
    let is_dm = message.guild_id.is_none();
    let mentioned = message.mentions.iter().any(|u| u.id == bot_id);
    if !is_dm && !mentioned {
        return Ok(());
    }

    let query = extract_query(&message.content, bot_id.get());
    tracing::info!(
        user = %message.author.name,
        channel_id = message.channel_id.get(),
        dm = is_dm,
        query = %query,
        "Chat request"
    );

    let _ = message.channel_id.broadcast_typing(&ctx.http).await;

    let sink = ChannelReply::new(Arc::clone(&ctx.http), message.channel_id);
    let outcome = data.assistant.handle_turn(&query, &sink).await;
    tracing::debug!(?outcome, "Chat turn finished");

    Ok(())
}
