use std::io::{self, Write};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use wayfarer_agents::{ChatRouter, RouterError};
use wayfarer_core::{classify_intent, format_reply_with, ChatInput, FormatOptions};
use wayfarer_observability::{init_tracing, AppMetrics};
use wayfarer_providers::{build_http_client, CarSearch, Providers, ProvidersConfig};
use wayfarer_storage::Store;

#[derive(Debug, Parser)]
#[command(name = "wayfarer")]
#[command(about = "Wayfarer travel chat CLI")]
struct Cli {
    /// Persist sessions in sqlite instead of memory.
    #[arg(long, env = "WAYFARER_DATABASE_URL")]
    database_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Interactive chat through the full moderation and routing pipeline.
    Chat {
        /// Print replies as the HTML fragments the web client receives.
        #[arg(long)]
        html: bool,
        /// Prefix hotel, food and tip keywords with emojis in HTML output.
        #[arg(long, requires = "html")]
        emojis: bool,
    },
    /// Show which intent a message maps to, without calling providers.
    Classify { text: String },
    Weather { city: String },
    Hotels { city: String },
    Cars { city: String },
    /// Delete expired sessions from the store.
    Purge,
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing("wayfarer_cli");
    let cli = Cli::parse();

    match cli.command {
        Command::Classify { text } => {
            println!("{}", serde_json::to_string_pretty(&classify_intent(&text))?);
        }
        Command::Weather { city } => {
            let forecast = build_providers()?.weather.forecast(&city).await?;
            println!("{}", serde_json::to_string_pretty(&forecast)?);
        }
        Command::Hotels { city } => {
            let hotels = build_providers()?.hotels.search(&city).await?;
            println!("{}", serde_json::to_string_pretty(&hotels)?);
        }
        Command::Cars { city } => {
            let cars = build_providers()?
                .cars
                .search(&CarSearch::for_city(&city))
                .await?;
            println!("{}", serde_json::to_string_pretty(&cars)?);
        }
        Command::Chat { html, emojis } => {
            let router = build_router(cli.database_url.as_deref()).await?;
            let options = html.then_some(FormatOptions {
                keyword_emojis: emojis,
            });
            run_chat(router, options).await?;
        }
        Command::Purge => {
            let router = build_router(cli.database_url.as_deref()).await?;
            let purged = router.purge_expired_sessions().await?;
            println!("purged {purged} expired sessions");
        }
    }

    Ok(())
}

async fn run_chat(router: ChatRouter<Store>, html: Option<FormatOptions>) -> Result<()> {
    let mut session_id: Option<String> = None;

    println!("Wayfarer chat mode. type 'exit' to quit.");

    loop {
        print!("> ");
        io::stdout().flush()?;

        let mut line = String::new();
        if io::stdin().read_line(&mut line)? == 0 {
            break;
        }

        let message = line.trim();
        if message.eq_ignore_ascii_case("exit") || message.eq_ignore_ascii_case("quit") {
            break;
        }

        let reply = match router
            .handle_message(ChatInput::new(session_id.clone(), message))
            .await
        {
            Ok(reply) => reply,
            Err(RouterError::InvalidInput(reason)) => {
                println!("{reason}");
                continue;
            }
            Err(error) => return Err(error.into()),
        };
        session_id = Some(reply.session_id.clone());

        println!("\n{}\n", render_reply(&reply.reply_text, html));
    }

    Ok(())
}

fn render_reply(text: &str, html: Option<FormatOptions>) -> String {
    match html {
        Some(options) => format_reply_with(text, options),
        None => text.to_string(),
    }
}

fn build_providers() -> Result<Providers> {
    let client = build_http_client().context("failed to build HTTP client")?;
    Ok(Providers::from_config(client, &ProvidersConfig::from_env()))
}

async fn build_router(database_url: Option<&str>) -> Result<ChatRouter<Store>> {
    let store = match database_url {
        Some(database_url) => Store::sqlite(database_url).await?,
        None => Store::memory(),
    };

    Ok(ChatRouter::new(
        Arc::new(store),
        build_providers()?,
        AppMetrics::shared(),
    ))
}
