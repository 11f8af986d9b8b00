// This is the entry point of the Drive summary bot.
//
// **Architecture Overview:**
// - `core/` = Business logic (platform-agnostic)
// - `infra/` = Implementations of core traits (Google APIs, Ollama, token file)
// - `discord/` = Discord-specific adapters (slash command, chat events)
// - `console` = the same turn, printed to stdout
//
// This file's job is to:
// 1. Load configuration
// 2. Initialize services (dependency injection)
// 3. Dispatch to the chosen front-end

// These attrs point each module declaration at a more descriptive root file
// so we don't end up with half a dozen mod.rs files that all look the same.
#[path = "core/core_layer.rs"]
mod core;
#[path = "discord/discord_layer.rs"]
mod discord;
#[path = "infra/infra_layer.rs"]
mod infra;

mod config;
mod console;

use crate::config::AppConfig;
use crate::core::assistant::{AssistantService, TurnOutcome};
use crate::core::auth::TokenSource;
use crate::core::drive::DriveService;
use crate::core::summary::SummaryService;
use crate::discord::{Data, Error};
use crate::infra::google::{FileCredentialStore, GoogleDriveClient, GoogleSheetsClient};
use crate::infra::ollama::OllamaClient;
use anyhow::Context as _;
use clap::{Parser, Subcommand};
use poise::serenity_prelude as serenity;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// The assistant wired to the real Google and Ollama clients.
/// Every front-end drives this one type.
pub type Assistant = AssistantService<GoogleDriveClient, GoogleSheetsClient, OllamaClient>;

#[derive(Parser)]
#[command(
    name = "drive-summary-bot",
    version,
    about = "Summarize Google Drive files with a local Ollama model"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the Discord bot (default)
    Bot,
    /// Authorize Google Drive and Sheets access in the browser
    Auth,
    /// Summarize one file and print the result
    Summarize {
        /// File name, file ID or Drive link
        #[arg(required = true)]
        query: Vec<String>,
    },
}

/// Event handler for non-command Discord events.
async fn event_handler(
    ctx: &serenity::Context,
    event: &serenity::FullEvent,
    _framework: poise::FrameworkContext<'_, Data, Error>,
    data: &Data,
) -> Result<(), Error> {
    if let serenity::FullEvent::Message { new_message } = event {
        if let Err(e) = discord::chat::handle_message(ctx, new_message, data).await {
            tracing::error!("Error handling chat message: {}", e);
        }
    }

    Ok(())
}

/// Wires the Google clients, the credential store and Ollama together.
///
/// `interactive` picks how a missing or unusable credential is handled:
/// browser consent (console use) or a startup error (bot use).
async fn build_assistant(config: &AppConfig, interactive: bool) -> anyhow::Result<Assistant> {
    let store = Arc::new(FileCredentialStore::from_config(config));
    if interactive {
        store.obtain(&config.scopes).await?;
    } else {
        store.load_for_service(&config.scopes).await?;
    }

    let tokens: Arc<dyn TokenSource> = store;
    let drive = Arc::new(GoogleDriveClient::new(
        config.drive_api_base.clone(),
        Arc::clone(&tokens),
    ));
    let sheets = Arc::new(GoogleSheetsClient::new(config.sheets_api_base.clone(), tokens));
    let ollama = OllamaClient::new(
        config.ollama_url.clone(),
        config.ollama_model.clone(),
        config.ollama_timeout,
    );

    Ok(AssistantService::new(
        DriveService::new(drive, sheets),
        SummaryService::new(ollama, config.summary_max_words),
    ))
}

async fn run_bot(config: AppConfig) -> anyhow::Result<()> {
    let token = config.discord_token.clone().context(
        "Missing DISCORD_TOKEN environment variable! Create a .env file with your bot token.",
    )?;

    let assistant = Arc::new(build_assistant(&config, false).await?);

    // ========================================================================
    // DISCORD FRAMEWORK SETUP
    // ========================================================================

    let intents = serenity::GatewayIntents::GUILD_MESSAGES
        | serenity::GatewayIntents::DIRECT_MESSAGES
        | serenity::GatewayIntents::MESSAGE_CONTENT // Required to read message content
        | serenity::GatewayIntents::GUILDS;

    let framework = poise::Framework::builder()
        .options(poise::FrameworkOptions {
            commands: vec![discord::commands::summarize::summarize()],
            event_handler: |ctx, event, framework, data| {
                Box::pin(event_handler(ctx, event, framework, data))
            },
            ..Default::default()
        })
        .setup(move |ctx, ready, framework| {
            Box::pin(async move {
                // Global registration can take a while to propagate.
                poise::builtins::register_globally(ctx, &framework.options().commands).await?;
                tracing::info!(user = %ready.user.name, "Bot is ready");

                Ok(Data { assistant })
            })
        })
        .build();

    let mut client = serenity::ClientBuilder::new(token, intents)
        .framework(framework)
        .await
        .context("Error creating Discord client")?;

    client.start().await.context("Error running bot")?;
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file (if it exists)
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = AppConfig::from_env()?;

    match cli.command.unwrap_or(Command::Bot) {
        Command::Bot => run_bot(config).await?,
        Command::Auth => {
            let store = FileCredentialStore::from_config(&config);
            store.obtain(&config.scopes).await?;
            println!("Authentication successful!");
        }
        Command::Summarize { query } => {
            let assistant = build_assistant(&config, true).await?;
            let outcome = console::run_turn(&assistant, &query.join(" ")).await;
            if let TurnOutcome::Failed(_) = outcome {
                std::process::exit(1);
            }
        }
    }

    Ok(())
}
