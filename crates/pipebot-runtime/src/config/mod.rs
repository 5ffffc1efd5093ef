//! Configuration module for the pipebot runtime.
//!
//! Layered loading (defaults, files, environment, programmatic overrides)
//! lives in [`loader`]; the schema in [`schema`]; sanity checks in
//! [`validation`].

pub mod error;
pub mod loader;
pub mod schema;
pub mod validation;

pub use error::{ConfigError, ConfigResult};
pub use loader::{ConfigLoader, Profile, load_config, load_config_from_file};
pub use schema::{
    BotSettings, LogFormat, LogLevel, LogOutput, LoggingConfig, PipebotConfig, SpanEventConfig,
};
pub use validation::validate_config;
