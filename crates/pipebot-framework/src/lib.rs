//! # Pipebot Framework
//!
//! Routing components built on top of [`pipebot_core`].
//!
//! This layer provides:
//! - The [`Handler`] trait and closure-based [`FnHandler`]
//! - Builder functions for common checks ([`on_command`], [`on_callback_prefix`], ...)
//! - The first-match [`Router`], usable directly or as a `tower::Service`
//! - The [`ListenerChain`] of pre-route gates and post-route observers
//!
//! The dispatch loop that feeds pipes through these lives in
//! `pipebot-runtime`.

pub mod builders;
pub mod handler;
pub mod listener;
pub mod router;

pub use builders::{on_any, on_callback_prefix, on_command, on_commands, on_text};
pub use handler::{BoxedHandler, CheckFn, FnHandler, Handler, OperationFn};
pub use listener::{ListenerChain, PostListener, PreListener};
pub use router::{ERROR_REPLY_PREFIX, RouteOutcome, Router};
