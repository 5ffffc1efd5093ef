//! Echo Bot Demo
//!
//! Wires the whole pipebot pipeline over the in-memory transport.
//!
//! By default a short scripted conversation is replayed and every outbound
//! call the bot made is printed as JSON. With `--interactive`, each stdin
//! line becomes a message; a line of the form `!press <data>` presses a
//! button on the last message instead.
//!
//! # Usage
//!
//! ```bash
//! cargo run --package echo-bot
//! cargo run --package echo-bot -- --interactive --name helper_bot
//! PIPEBOT_LOGGING__LEVEL=trace cargo run --package echo-bot
//! ```

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use pipebot::prelude::*;
use pipebot::runtime::config::ConfigLoader;
use pipebot::runtime::logging;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;

#[derive(Debug, Parser)]
#[command(name = "echo-bot", about = "Echo bot running over an in-memory transport")]
struct Args {
    /// Configuration file (defaults to searching for pipebot.toml).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Configuration profile.
    #[arg(short, long)]
    profile: Option<String>,

    /// Override the bot name from the configuration.
    #[arg(short, long)]
    name: Option<String>,

    /// Read messages from stdin instead of replaying the built-in script.
    #[arg(short, long)]
    interactive: bool,
}

// ============================================================================
// Handlers
// ============================================================================

const HELP_TEXT: &str = "*Echo Bot*\n\
    /echo <text> - Echo text\n\
    /ping - Pong!\n\
    /menu - Show a button menu\n\
    /help - This help";

fn handlers() -> Router {
    Router::new()
        .with(on_command("/echo").handle_message(|pipe| async move {
            let text = pipe.text_without_command();
            if text.is_empty() {
                return Err(HandlerError::msg("nothing to echo"));
            }
            pipe.send_message(text, None).await?;
            Ok(())
        }))
        .with(on_command("/ping").handle_message(|pipe| async move {
            pipe.send_message("Pong!", None).await?;
            Ok(())
        }))
        .with(on_commands(["/help", "/start"]).handle_message(|pipe| async move {
            pipe.send_message(HELP_TEXT, None).await?;
            Ok(())
        }))
        .with(on_command("/menu").handle_message(|pipe| async move {
            let options = SendOptions::default()
                .button_row(vec![
                    InlineButton::new("Red", "color:red"),
                    InlineButton::new("Blue", "color:blue"),
                ])
                .reply_to(pipe.message_id());
            pipe.send_message("Pick a color", Some(options)).await?;
            Ok(())
        }))
        .with(on_callback_prefix("color:").handle_callback(|pipe| async move {
            let color = pipe
                .callback_data()
                .and_then(|data| data.strip_prefix("color:"))
                .unwrap_or_default()
                .to_string();
            pipe.answer_callback(&format!("You picked {color}"), false)
                .await?;
            pipe.edit_message_text(&format!("{} picked *{color}*", pipe.initiator().first_name), None)
                .await?;
            Ok(())
        }))
}

fn script(user: &User, chat: &Chat) -> Vec<InboundEvent> {
    let message = |id, text: &str| Message::new(id, user.clone(), chat.clone(), text);
    let menu = Message::new(900, User::new(0, "echo-bot"), chat.clone(), "Pick a color");
    vec![
        message(1, "/start").into(),
        message(2, "/echo hello, pipebot").into(),
        message(3, "/echo@some_other_bot not for us").into(),
        message(4, "/echo").into(),
        message(5, "just chatting").into(),
        message(6, "/menu").into(),
        Callback::new("cb-1", user.clone(), menu, "color:blue").into(),
    ]
}

// ============================================================================
// Main Entry Point
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut loader = ConfigLoader::new();
    if let Some(path) = &args.config {
        loader = loader.file(path);
    }
    if let Some(profile) = &args.profile {
        loader = loader.profile(profile.as_str());
    }
    let mut config = loader.load().context("failed to load configuration")?;
    if let Some(name) = args.name {
        config.bot.name = name;
    }

    logging::init_from_config(&config.logging);

    let (transport, injector) = MemoryTransport::new();
    let bot = BotBuilder::from_settings(&config.bot, transport.clone())
        .router(handlers())
        .pre_listener(|pipe| {
            info!(
                from = %pipe.initiator().first_name,
                text = pipe.text(),
                callback = pipe.is_callback(),
                "Incoming"
            );
            true
        })
        .post_listener(|pipe, outcome| {
            info!(
                message_id = pipe.message_id(),
                handler = outcome.handler().unwrap_or("-"),
                "Processed"
            );
        })
        .build()?;

    let poll = config.bot.poll_interval();

    if args.interactive {
        let handle = bot.start(poll);
        let user = User::new(1, "You");
        let chat = Chat::private(1);
        let mut last: Option<Message> = None;
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        let mut next_id = 1;

        while let Some(line) = lines.next_line().await? {
            let press = line.strip_prefix("!press ").map(str::to_string);
            let event: InboundEvent = match (press, last.clone()) {
                (Some(data), Some(message)) => {
                    Callback::new(format!("cb-{next_id}"), user.clone(), message, data).into()
                }
                _ => {
                    let message = Message::new(next_id, user.clone(), chat.clone(), line);
                    last = Some(message.clone());
                    message.into()
                }
            };
            next_id += 1;
            injector.inject(event)?;
        }

        handle.shutdown().await?;
    } else {
        let events = script(&User::new(1, "Ann"), &Chat::private(1));
        let total = events.len() as u64;

        let handle = bot.start(poll);
        for event in events {
            injector.inject(event)?;
        }

        tokio::time::timeout(std::time::Duration::from_secs(5), async {
            while bot.stats().completed() < total {
                tokio::time::sleep(std::time::Duration::from_millis(10)).await;
            }
        })
        .await
        .context("scripted events did not finish")?;
        handle.shutdown().await?;

        println!("{}", serde_json::to_string_pretty(&transport.calls())?);
    }

    info!(stats = %bot.stats(), "Echo bot finished");
    Ok(())
}
