//! The unified per-event request handle.
//!
//! A [`Pipe`] normalizes a message event or a callback event into one
//! read/act interface. Handlers read the text, command and participants
//! from it and use it as their only channel back to the transport.
//!
//! One pipe is created per inbound event at the start of its unit of work
//! and dropped at the end; pipes are never shared between events.

use std::fmt;

use crate::command::{CommandDescriptor, parse_command, strip_command};
use crate::error::{PipeError, PipeResult, TransportResult};
use crate::event::{Callback, Chat, InboundEvent, Message, MessageId, User};
use crate::options::{CallbackAnswer, ChatAction, Photo, SendOptions, normalize_send_options};
use crate::transport::BoxedTransport;

/// What a pipe is built from: exactly one message or one callback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipeSource {
    Message(Message),
    Callback(Callback),
}

impl From<Message> for PipeSource {
    fn from(message: Message) -> Self {
        Self::Message(message)
    }
}

impl From<Callback> for PipeSource {
    fn from(callback: Callback) -> Self {
        Self::Callback(callback)
    }
}

/// The normalized request/response handle for one inbound event.
pub struct Pipe {
    /// The resolved message: the event's own message, or the callback's
    /// embedded one.
    message: Message,
    callback: Option<Callback>,
    transport: BoxedTransport,
}

impl Pipe {
    /// Builds a pipe from a source and a transport handle.
    pub fn new(source: impl Into<PipeSource>, transport: BoxedTransport) -> Self {
        match source.into() {
            PipeSource::Message(message) => Self {
                message,
                callback: None,
                transport,
            },
            PipeSource::Callback(callback) => Self {
                message: callback.message.clone(),
                callback: Some(callback),
                transport,
            },
        }
    }

    /// Builds a pipe from a nullable message/callback pair.
    ///
    /// Fails with [`PipeError::InvalidConstruction`] when both parts are
    /// absent or when the transport is absent. When only the callback is
    /// given, the message is taken from it. When both are given, the message
    /// is used as-is and the callback is kept alongside it.
    pub fn from_parts(
        message: Option<Message>,
        callback: Option<Callback>,
        transport: Option<BoxedTransport>,
    ) -> PipeResult<Self> {
        let transport = transport.ok_or(PipeError::invalid("no transport handle given"))?;

        match (message, callback) {
            (None, None) => Err(PipeError::invalid("expected a message or a callback")),
            (Some(message), callback) => Ok(Self {
                message,
                callback,
                transport,
            }),
            (None, Some(callback)) => Ok(Self::new(callback, transport)),
        }
    }

    /// Builds a pipe from an inbound event.
    ///
    /// Queries are not routable and fail with
    /// [`PipeError::InvalidConstruction`].
    pub fn from_event(event: InboundEvent, transport: BoxedTransport) -> PipeResult<Self> {
        match event {
            InboundEvent::Message(m) => Ok(Self::new(m, transport)),
            InboundEvent::Callback(c) => Ok(Self::new(c, transport)),
            InboundEvent::Query(_) => Err(PipeError::invalid("queries cannot be piped")),
        }
    }

    // ─── Read accessors ───────────────────────────────────────────────────────

    pub fn message_id(&self) -> MessageId {
        self.message.id
    }

    /// The raw message text.
    pub fn text(&self) -> &str {
        &self.message.text
    }

    /// The text with the leading command removed and whitespace trimmed.
    pub fn text_without_command(&self) -> &str {
        strip_command(&self.message.text)
    }

    /// The command token, marker included, or `""`.
    pub fn command(&self) -> &str {
        self.command_descriptor().command
    }

    /// The bot name the command is addressed to, or `""`.
    pub fn addressee(&self) -> &str {
        self.command_descriptor().addressee
    }

    pub fn command_descriptor(&self) -> CommandDescriptor<'_> {
        parse_command(&self.message.text)
    }

    /// The resolved message.
    pub fn message(&self) -> &Message {
        &self.message
    }

    /// The sender of the resolved message.
    ///
    /// For callback pipes this is the author of the message the button was
    /// attached to; see [`initiator`](Self::initiator) for the user who
    /// pressed it.
    pub fn sender(&self) -> &User {
        &self.message.sender
    }

    /// The user who triggered this event: the button presser for callbacks,
    /// the author for messages.
    pub fn initiator(&self) -> &User {
        self.callback
            .as_ref()
            .map_or(&self.message.sender, |c| &c.sender)
    }

    pub fn chat(&self) -> &Chat {
        &self.message.chat
    }

    pub fn callback(&self) -> Option<&Callback> {
        self.callback.as_ref()
    }

    pub fn callback_data(&self) -> Option<&str> {
        self.callback.as_ref().map(|c| c.data.as_str())
    }

    pub fn is_callback(&self) -> bool {
        self.callback.is_some()
    }

    pub fn transport(&self) -> &BoxedTransport {
        &self.transport
    }

    // ─── Actions ──────────────────────────────────────────────────────────────

    /// Sends a text message to this pipe's chat.
    pub async fn send_message(
        &self,
        text: &str,
        options: Option<SendOptions>,
    ) -> TransportResult<MessageId> {
        let options = normalize_send_options(options);
        self.transport
            .send_message(&self.message.chat, text, &options)
            .await
    }

    /// Replaces the text of this pipe's message.
    pub async fn edit_message_text(
        &self,
        text: &str,
        options: Option<SendOptions>,
    ) -> TransportResult<()> {
        let options = normalize_send_options(options);
        self.transport
            .edit_message_text(&self.message.chat, self.message.id, text, &options)
            .await
    }

    /// Sends a photo to this pipe's chat.
    pub async fn send_photo(
        &self,
        photo: &Photo,
        options: Option<SendOptions>,
    ) -> TransportResult<MessageId> {
        let options = normalize_send_options(options);
        self.transport
            .send_photo(&self.message.chat, photo, &options)
            .await
    }

    /// Answers the button press this pipe was built from.
    ///
    /// Message-only pipes pass `None` through; the transport decides how to
    /// fail.
    pub async fn answer_callback(&self, text: &str, alert: bool) -> TransportResult<()> {
        let answer = CallbackAnswer {
            text: text.to_string(),
            show_alert: alert,
        };
        self.transport
            .answer_callback(self.callback.as_ref(), &answer)
            .await
    }

    /// Deletes a message from this pipe's chat.
    pub async fn delete_message(&self, message_id: MessageId) -> TransportResult<()> {
        self.transport
            .delete_message(&self.message.chat, message_id)
            .await
    }

    /// Shows the "typing" indicator in this pipe's chat.
    pub async fn send_typing(&self) -> TransportResult<()> {
        self.transport
            .send_chat_action(&self.message.chat, ChatAction::Typing)
            .await
    }
}

impl fmt::Debug for Pipe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipe")
            .field("message", &self.message)
            .field("callback", &self.callback)
            .finish_non_exhaustive()
    }
}
