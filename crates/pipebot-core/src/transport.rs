//! Transport trait and inbound channel plumbing.
//!
//! A [`Transport`] is the external collaborator that talks to the messaging
//! backend. The dispatch core depends on exactly the operations below and
//! owns no wire format of its own.
//!
//! # Inbound flow
//!
//! ```text
//! Transport::listen ──▶ InboundSinks ──┬─▶ messages  (mpsc, bounded)
//!                                      ├─▶ callbacks (mpsc, bounded)
//!                                      └─▶ queries   (mpsc, bounded)
//! ```
//!
//! The channels are small and bounded; when one is full the transport's
//! delivery awaits, which is the only backpressure in the system.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::error::{TransportError, TransportResult};
use crate::event::{Callback, Chat, InboundEvent, Message, MessageId, Query};
use crate::options::{CallbackAnswer, ChatAction, Photo, SendOptions};

/// The backend-facing half of a bot.
///
/// Implementations must be cheap to share: the dispatch core holds one
/// `Arc<dyn Transport>` and hands clones of it to every per-event task.
/// Calls may block for as long as the backend needs; timeouts are the
/// transport's responsibility.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Delivers inbound events onto `sinks` until `stop` is cancelled.
    ///
    /// `poll` is the interval between backend polls for pull-based
    /// transports; push-based transports may ignore it.
    async fn listen(
        &self,
        sinks: InboundSinks,
        poll: Duration,
        stop: CancellationToken,
    ) -> TransportResult<()>;

    /// Sends a text message to `chat`, returning the new message id.
    async fn send_message(
        &self,
        chat: &Chat,
        text: &str,
        options: &SendOptions,
    ) -> TransportResult<MessageId>;

    /// Replaces the text of an existing message.
    async fn edit_message_text(
        &self,
        chat: &Chat,
        message_id: MessageId,
        text: &str,
        options: &SendOptions,
    ) -> TransportResult<()>;

    /// Sends a photo to `chat`, returning the new message id.
    async fn send_photo(
        &self,
        chat: &Chat,
        photo: &Photo,
        options: &SendOptions,
    ) -> TransportResult<MessageId>;

    /// Answers a button press.
    ///
    /// `callback` is `None` when the caller's request was not built from a
    /// callback; implementations should reject that.
    async fn answer_callback(
        &self,
        callback: Option<&Callback>,
        answer: &CallbackAnswer,
    ) -> TransportResult<()>;

    /// Deletes a message.
    async fn delete_message(&self, chat: &Chat, message_id: MessageId) -> TransportResult<()>;

    /// Shows a transient presence hint in `chat`.
    async fn send_chat_action(&self, chat: &Chat, action: ChatAction) -> TransportResult<()>;
}

/// A shared transport handle.
pub type BoxedTransport = Arc<dyn Transport>;

/// Sending half of the three inbound channels, handed to
/// [`Transport::listen`].
#[derive(Debug, Clone)]
pub struct InboundSinks {
    pub messages: mpsc::Sender<Message>,
    pub callbacks: mpsc::Sender<Callback>,
    pub queries: mpsc::Sender<Query>,
}

impl InboundSinks {
    /// Delivers an event onto the channel matching its kind.
    ///
    /// Waits while that channel is full. Fails with
    /// [`TransportError::Closed`] once the dispatch core has stopped reading.
    pub async fn deliver(&self, event: InboundEvent) -> TransportResult<()> {
        let sent = match event {
            InboundEvent::Message(m) => self.messages.send(m).await.is_ok(),
            InboundEvent::Callback(c) => self.callbacks.send(c).await.is_ok(),
            InboundEvent::Query(q) => self.queries.send(q).await.is_ok(),
        };
        if sent {
            Ok(())
        } else {
            Err(TransportError::Closed)
        }
    }
}

/// Receiving half of the three inbound channels, owned by the dispatch core.
#[derive(Debug)]
pub struct InboundReceivers {
    pub messages: mpsc::Receiver<Message>,
    pub callbacks: mpsc::Receiver<Callback>,
    pub queries: mpsc::Receiver<Query>,
}

/// Creates the three inbound channels, each with `capacity` slots.
///
/// # Panics
///
/// Panics if `capacity` is zero, like [`mpsc::channel`].
pub fn inbound_channels(capacity: usize) -> (InboundSinks, InboundReceivers) {
    let (messages_tx, messages_rx) = mpsc::channel(capacity);
    let (callbacks_tx, callbacks_rx) = mpsc::channel(capacity);
    let (queries_tx, queries_rx) = mpsc::channel(capacity);

    let sinks = InboundSinks {
        messages: messages_tx,
        callbacks: callbacks_tx,
        queries: queries_tx,
    };
    let receivers = InboundReceivers {
        messages: messages_rx,
        callbacks: callbacks_rx,
        queries: queries_rx,
    };
    (sinks, receivers)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::User;
    use tokio_test::{assert_err, assert_ok};

    fn message(id: MessageId) -> Message {
        Message::new(id, User::new(1, "Ann"), Chat::private(1), "hi")
    }

    #[tokio::test]
    async fn test_deliver_routes_by_kind() {
        let (sinks, mut rx) = inbound_channels(4);

        assert_ok!(sinks.deliver(message(1).into()).await);
        let cb = Callback::new("c1", User::new(2, "Bob"), message(2), "x");
        assert_ok!(sinks.deliver(cb.into()).await);
        let q = Query {
            id: "q1".into(),
            sender: User::new(3, "Cid"),
            text: "weather".into(),
        };
        assert_ok!(sinks.deliver(q.into()).await);

        assert_eq!(rx.messages.recv().await.unwrap().id, 1);
        assert_eq!(rx.callbacks.recv().await.unwrap().id, "c1");
        assert_eq!(rx.queries.recv().await.unwrap().id, "q1");
    }

    #[tokio::test]
    async fn test_deliver_after_receiver_dropped_fails() {
        let (sinks, rx) = inbound_channels(1);
        drop(rx);
        let err = assert_err!(sinks.deliver(message(1).into()).await);
        assert_eq!(err, TransportError::Closed);
    }
}
