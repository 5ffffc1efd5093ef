//! Transport implementations for the pipebot dispatch framework.
//!
//! Network transports are provided by embedding applications through the
//! [`pipebot_core::Transport`] trait. This crate ships the in-process
//! [`MemoryTransport`], used to drive bots from tests, demos, and scripted
//! replays.
//!
//! ```rust,ignore
//! use pipebot_transport::MemoryTransport;
//!
//! let (transport, injector) = MemoryTransport::new();
//! injector.inject(message)?;
//! // ... run a bot over `transport` ...
//! assert_eq!(transport.sent_texts(), vec!["pong"]);
//! ```

pub mod memory;

pub use memory::{MemoryInjector, MemoryTransport, OperationKind, OutboundCall};
