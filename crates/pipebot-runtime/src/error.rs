//! Runtime error types.

use thiserror::Error;

use crate::config::ConfigError;
use pipebot_core::TransportError;

/// Errors that can occur while building or running a bot.
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// The bot could not be built from the given settings.
    #[error("Invalid bot: {0}")]
    InvalidBot(String),

    /// The transport's listen loop failed.
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// Configuration could not be loaded.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The bot task panicked or was cancelled.
    #[error("Bot task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Result type for runtime operations.
pub type RuntimeResult<T> = Result<T, RuntimeError>;
