//! # Pipebot
//!
//! A dispatch core for chat bots.
//!
//! ## Overview
//!
//! Pipebot takes heterogeneous inbound events (text messages, button-press
//! callbacks, queries) from one transport, normalizes each into a [`Pipe`],
//! and routes it to the first registered handler whose check passes.
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────┐   ┌─────────────────┐   ┌──────────────────────────────────────────────┐
//! │ Transport │──▶│ messages (mpsc) │──▶│ per-event task:                              │
//! │           │──▶│ callbacks       │──▶│   Pipe ─▶ filter ─▶ pre ─▶ Router ─▶ post    │
//! │           │──▶│ queries         │   └──────────────────────────────────────────────┘
//! └───────────┘   └─────────────────┘
//! ```
//!
//! - **Transport**: talks to the messaging backend ([`core::Transport`])
//! - **Pipe**: one per event, the read/act handle handlers work with
//! - **Router**: first-match handler selection with typing and error replies
//! - **Listeners**: pre-route gates and post-route observers
//! - **Bot**: the three listening tasks and the per-event pipeline
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use pipebot::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let (transport, injector) = MemoryTransport::new();
//!
//!     let bot = BotBuilder::new("helper_bot", transport)
//!         .handler(on_command("/ping").handle_message(|pipe| async move {
//!             pipe.send_message("pong", None).await?;
//!             Ok(())
//!         }))
//!         .build()?;
//!
//!     bot.run_until_shutdown(Duration::from_secs(1)).await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - `toml-config`: TOML configuration files (default)
//! - `yaml-config`: YAML configuration files
//! - `json-log`: JSON log output

pub use pipebot_core as core;
pub use pipebot_framework as framework;
pub use pipebot_runtime as runtime;
pub use pipebot_transport as transport;

pub use pipebot_core::{InboundEvent, Pipe};
pub use pipebot_framework::{FnHandler, Handler, ListenerChain, RouteOutcome, Router};
pub use pipebot_runtime::{Bot, BotBuilder, BotHandle, BotStats, DispatchOutcome};

/// Prelude module for convenient imports.
///
/// ```rust,ignore
/// use pipebot::prelude::*;
/// ```
pub mod prelude {
    // Dispatch core
    pub use pipebot_runtime::{Bot, BotBuilder, BotHandle, BotStats, DispatchOutcome};

    // Handlers and routing
    pub use pipebot_framework::{
        FnHandler, Handler, ListenerChain, RouteOutcome, Router, on_any, on_callback_prefix,
        on_command, on_commands, on_text,
    };

    // Request handle and event model
    pub use pipebot_core::{
        BoxedTransport, Callback, CancellationToken, Chat, HandlerError, HandlerResult,
        InboundEvent, InlineButton, Message, ParseMode, Photo, Pipe, Query, SendOptions,
        Transport, User,
    };

    // In-process transport
    pub use pipebot_transport::{MemoryInjector, MemoryTransport};

    pub use std::sync::Arc;
    pub use std::time::Duration;
}
