//! # Pipebot Core
//!
//! The foundation layer of the pipebot dispatch framework.
//!
//! This crate defines everything the routing layers share:
//!
//! - **Event model**: [`InboundEvent`] and its [`Message`], [`Callback`] and
//!   [`Query`] variants
//! - **Command parsing**: [`parse_command`] splits `/cmd@bot args` into a
//!   [`CommandDescriptor`]
//! - **Unified request**: [`Pipe`], one per inbound event, the read/act
//!   handle handlers work with
//! - **Transport boundary**: the [`Transport`] trait and the bounded inbound
//!   channels ([`inbound_channels`])
//!
//! ```text
//! ┌───────────┐  InboundEvent   ┌──────────┐   &Pipe    ┌─────────┐
//! │ Transport │───────────────▶│   Pipe   │──────────▶│ Handler │
//! └───────────┘◀───────────────└──────────┘           └─────────┘
//!                send/edit/answer/delete/typing
//! ```

pub mod command;
pub mod error;
pub mod event;
pub mod options;
pub mod pipe;
pub mod transport;

pub use command::{
    ADDRESSEE_SEPARATOR, COMMAND_MARKER, CommandDescriptor, parse_command, strip_command,
};
pub use error::{
    HandlerError, HandlerResult, PipeError, PipeResult, TransportError, TransportResult,
};
pub use event::{Callback, Chat, ChatKind, InboundEvent, Message, MessageId, Query, User};
pub use options::{
    CallbackAnswer, ChatAction, InlineButton, ParseMode, Photo, PhotoSource, SendOptions,
    normalize_send_options,
};
pub use pipe::{Pipe, PipeSource};
pub use transport::{BoxedTransport, InboundReceivers, InboundSinks, Transport, inbound_channels};

// Re-exported so transports and runtimes agree on the stop signal type.
pub use tokio_util::sync::CancellationToken;

/// Prelude for common imports.
pub mod prelude {
    pub use super::command::{CommandDescriptor, parse_command};
    pub use super::error::{HandlerError, HandlerResult, TransportError, TransportResult};
    pub use super::event::{Callback, Chat, InboundEvent, Message, Query, User};
    pub use super::options::{InlineButton, ParseMode, Photo, SendOptions};
    pub use super::pipe::Pipe;
    pub use super::transport::{BoxedTransport, Transport};
}
