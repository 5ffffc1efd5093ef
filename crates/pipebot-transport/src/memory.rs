//! In-process transport.
//!
//! [`MemoryTransport`] stands in for a real messaging backend. Inbound events
//! are injected through a [`MemoryInjector`]; every outbound call is recorded
//! as an [`OutboundCall`] and can be inspected afterwards. Individual
//! operations can be made to fail with [`MemoryTransport::fail_on`].

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use pipebot_core::{
    Callback, CallbackAnswer, CancellationToken, Chat, ChatAction, InboundEvent, InboundSinks,
    MessageId, Photo, SendOptions, Transport, TransportError, TransportResult,
};
use serde::Serialize;
use tokio::sync::{Notify, mpsc};
use tracing::{debug, trace};

/// The kind of an outbound operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    SendMessage,
    EditMessageText,
    SendPhoto,
    AnswerCallback,
    DeleteMessage,
    ChatAction,
}

impl OperationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SendMessage => "send_message",
            Self::EditMessageText => "edit_message_text",
            Self::SendPhoto => "send_photo",
            Self::AnswerCallback => "answer_callback",
            Self::DeleteMessage => "delete_message",
            Self::ChatAction => "send_chat_action",
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A recorded outbound call.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum OutboundCall {
    SendMessage {
        chat_id: i64,
        text: String,
        options: SendOptions,
    },
    EditMessageText {
        chat_id: i64,
        message_id: MessageId,
        text: String,
        options: SendOptions,
    },
    SendPhoto {
        chat_id: i64,
        photo: Photo,
        options: SendOptions,
    },
    AnswerCallback {
        callback_id: Option<String>,
        answer: CallbackAnswer,
    },
    DeleteMessage {
        chat_id: i64,
        message_id: MessageId,
    },
    ChatAction {
        chat_id: i64,
        action: ChatAction,
    },
}

impl OutboundCall {
    pub fn kind(&self) -> OperationKind {
        match self {
            Self::SendMessage { .. } => OperationKind::SendMessage,
            Self::EditMessageText { .. } => OperationKind::EditMessageText,
            Self::SendPhoto { .. } => OperationKind::SendPhoto,
            Self::AnswerCallback { .. } => OperationKind::AnswerCallback,
            Self::DeleteMessage { .. } => OperationKind::DeleteMessage,
            Self::ChatAction { .. } => OperationKind::ChatAction,
        }
    }

    /// The chat this call targets, if any.
    pub fn chat_id(&self) -> Option<i64> {
        match self {
            Self::SendMessage { chat_id, .. }
            | Self::EditMessageText { chat_id, .. }
            | Self::SendPhoto { chat_id, .. }
            | Self::DeleteMessage { chat_id, .. }
            | Self::ChatAction { chat_id, .. } => Some(*chat_id),
            Self::AnswerCallback { .. } => None,
        }
    }
}

/// Feeds inbound events into a [`MemoryTransport`].
#[derive(Debug, Clone)]
pub struct MemoryInjector {
    tx: mpsc::UnboundedSender<InboundEvent>,
}

impl MemoryInjector {
    /// Queues an event for delivery.
    ///
    /// Fails with [`TransportError::Closed`] if the transport was dropped.
    pub fn inject(&self, event: impl Into<InboundEvent>) -> TransportResult<()> {
        self.tx
            .send(event.into())
            .map_err(|_| TransportError::Closed)
    }
}

/// A transport that keeps everything in memory.
pub struct MemoryTransport {
    inbound: Mutex<Option<mpsc::UnboundedReceiver<InboundEvent>>>,
    calls: Mutex<Vec<OutboundCall>>,
    failures: Mutex<HashMap<OperationKind, String>>,
    next_message_id: AtomicI64,
    recorded: Notify,
}

impl MemoryTransport {
    /// Creates a transport and the injector that feeds it.
    pub fn new() -> (Arc<Self>, MemoryInjector) {
        let (tx, rx) = mpsc::unbounded_channel();
        let transport = Arc::new(Self {
            inbound: Mutex::new(Some(rx)),
            calls: Mutex::new(Vec::new()),
            failures: Mutex::new(HashMap::new()),
            next_message_id: AtomicI64::new(1000),
            recorded: Notify::new(),
        });
        (transport, MemoryInjector { tx })
    }

    /// Makes every subsequent call of `kind` fail with
    /// [`TransportError::Rejected`]. The call is still recorded.
    pub fn fail_on(&self, kind: OperationKind, reason: impl Into<String>) {
        self.failures.lock().insert(kind, reason.into());
    }

    /// Stops failing calls of `kind`.
    pub fn recover(&self, kind: OperationKind) {
        self.failures.lock().remove(&kind);
    }

    /// Returns a snapshot of all recorded calls, oldest first.
    pub fn calls(&self) -> Vec<OutboundCall> {
        self.calls.lock().clone()
    }

    /// Returns the recorded calls of one kind.
    pub fn calls_of(&self, kind: OperationKind) -> Vec<OutboundCall> {
        self.calls
            .lock()
            .iter()
            .filter(|c| c.kind() == kind)
            .cloned()
            .collect()
    }

    /// Returns the texts of all `send_message` calls.
    pub fn sent_texts(&self) -> Vec<String> {
        self.calls
            .lock()
            .iter()
            .filter_map(|c| match c {
                OutboundCall::SendMessage { text, .. } => Some(text.clone()),
                _ => None,
            })
            .collect()
    }

    /// Forgets all recorded calls.
    pub fn clear(&self) {
        self.calls.lock().clear();
    }

    /// Waits until at least `count` calls have been recorded.
    ///
    /// Wrap in `tokio::time::timeout` when the calls come from spawned tasks.
    pub async fn wait_for_calls(&self, count: usize) {
        loop {
            let notified = self.recorded.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if self.calls.lock().len() >= count {
                return;
            }
            notified.await;
        }
    }

    fn record(&self, call: OutboundCall) -> TransportResult<()> {
        let kind = call.kind();
        trace!(operation = %kind, "Recording outbound call");
        self.calls.lock().push(call);
        self.recorded.notify_waiters();

        match self.failures.lock().get(&kind) {
            Some(reason) => Err(TransportError::Rejected {
                operation: kind.as_str(),
                reason: reason.clone(),
            }),
            None => Ok(()),
        }
    }

    fn allocate_message_id(&self) -> MessageId {
        self.next_message_id.fetch_add(1, Ordering::Relaxed)
    }
}

#[async_trait]
impl Transport for MemoryTransport {
    /// Forwards injected events until `stop` is cancelled. `poll` is ignored:
    /// events are pushed as soon as they are injected.
    async fn listen(
        &self,
        sinks: InboundSinks,
        _poll: Duration,
        stop: CancellationToken,
    ) -> TransportResult<()> {
        let Some(mut rx) = self.inbound.lock().take() else {
            return Err(TransportError::Other(
                "memory transport is already listening".into(),
            ));
        };
        debug!("Memory transport listening");

        let result = loop {
            let event = tokio::select! {
                () = stop.cancelled() => break Ok(()),
                event = rx.recv() => event,
            };

            let Some(event) = event else {
                // All injectors dropped; nothing more will arrive.
                stop.cancelled().await;
                break Ok(());
            };

            tokio::select! {
                () = stop.cancelled() => break Ok(()),
                delivered = sinks.deliver(event) => {
                    if let Err(e) = delivered {
                        break Err(e);
                    }
                }
            }
        };

        *self.inbound.lock() = Some(rx);
        debug!("Memory transport stopped listening");
        result
    }

    async fn send_message(
        &self,
        chat: &Chat,
        text: &str,
        options: &SendOptions,
    ) -> TransportResult<MessageId> {
        self.record(OutboundCall::SendMessage {
            chat_id: chat.id,
            text: text.to_string(),
            options: options.clone(),
        })?;
        Ok(self.allocate_message_id())
    }

    async fn edit_message_text(
        &self,
        chat: &Chat,
        message_id: MessageId,
        text: &str,
        options: &SendOptions,
    ) -> TransportResult<()> {
        self.record(OutboundCall::EditMessageText {
            chat_id: chat.id,
            message_id,
            text: text.to_string(),
            options: options.clone(),
        })
    }

    async fn send_photo(
        &self,
        chat: &Chat,
        photo: &Photo,
        options: &SendOptions,
    ) -> TransportResult<MessageId> {
        self.record(OutboundCall::SendPhoto {
            chat_id: chat.id,
            photo: photo.clone(),
            options: options.clone(),
        })?;
        Ok(self.allocate_message_id())
    }

    async fn answer_callback(
        &self,
        callback: Option<&Callback>,
        answer: &CallbackAnswer,
    ) -> TransportResult<()> {
        self.record(OutboundCall::AnswerCallback {
            callback_id: callback.map(|c| c.id.clone()),
            answer: answer.clone(),
        })?;
        callback.map(|_| ()).ok_or(TransportError::MissingCallback)
    }

    async fn delete_message(&self, chat: &Chat, message_id: MessageId) -> TransportResult<()> {
        self.record(OutboundCall::DeleteMessage {
            chat_id: chat.id,
            message_id,
        })
    }

    async fn send_chat_action(&self, chat: &Chat, action: ChatAction) -> TransportResult<()> {
        self.record(OutboundCall::ChatAction {
            chat_id: chat.id,
            action,
        })
    }
}

impl fmt::Debug for MemoryTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryTransport")
            .field("recorded_calls", &self.calls.lock().len())
            .finish_non_exhaustive()
    }
}
