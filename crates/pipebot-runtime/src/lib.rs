//! # Pipebot Runtime
//!
//! The dispatch core and its ambient services:
//!
//! - [`Bot`], [`BotBuilder`] and [`BotHandle`]: the per-event pipeline and
//!   the three listening tasks that feed it
//! - [`config`]: figment-based layered configuration
//! - [`logging`]: `tracing-subscriber` setup, installable globally or
//!   injected per bot as a [`tracing::Dispatch`]
//!
//! ```rust,ignore
//! use pipebot_runtime::{BotBuilder, config::load_config, logging};
//!
//! let config = load_config()?;
//! logging::init_from_config(&config.logging);
//!
//! let bot = BotBuilder::from_settings(&config.bot, transport)
//!     .handler(ping)
//!     .build()?;
//! bot.run_until_shutdown(config.bot.poll_interval()).await?;
//! ```

pub mod bot;
pub mod config;
pub mod error;
pub mod logging;
pub mod signal;

pub use bot::{Bot, BotBuilder, BotHandle, BotStats, DEFAULT_QUEUE_CAPACITY, DispatchOutcome};
pub use config::{
    BotSettings, ConfigError, ConfigLoader, ConfigResult, LoggingConfig, PipebotConfig,
};
pub use error::{RuntimeError, RuntimeResult};
pub use logging::{LoggingBuilder, SpanEvents};
pub use signal::shutdown_signal;

// Re-export tracing for use by other crates
pub use tracing;
pub use tracing_subscriber;

/// Prelude module for convenient imports.
///
/// This provides all the commonly used logging macros:
/// - `trace!`, `debug!`, `info!`, `warn!`, `error!`
/// - `span`, `event`
/// - `instrument` attribute
/// - `Level` for span creation
pub mod prelude {
    pub use tracing::{Level, debug, error, event, info, instrument, span, trace, warn};
}
