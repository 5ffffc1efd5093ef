//! The dispatch core.
//!
//! A [`Bot`] owns three inbound queues (messages, callbacks, queries) fed by
//! its transport. One long-lived task reads each queue, and every message or
//! callback it receives is handed to a freshly spawned task that runs the
//! per-event pipeline:
//!
//! ```text
//! InboundEvent ─▶ Pipe ─▶ bot-name filter ─▶ pre-listeners ─▶ Router ─▶ post-listeners
//!                  │             │                 │
//!                  ▼             ▼                 ▼
//!               Dropped       Filtered          Aborted
//! ```
//!
//! Failures never leave the per-event task. Queries are drained and logged
//! only.
//!
//! # Example
//!
//! ```rust,ignore
//! use pipebot_runtime::BotBuilder;
//! use pipebot_framework::on_command;
//!
//! let bot = BotBuilder::new("helper_bot", transport)
//!     .filter_by_bot_name(true)
//!     .handler(on_command("/ping").handle_message(|pipe| async move {
//!         pipe.send_message("pong", None).await?;
//!         Ok(())
//!     }))
//!     .build()?;
//!
//! let handle = bot.start(Duration::from_secs(1));
//! // ...
//! handle.shutdown().await?;
//! ```

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::sync::{Semaphore, mpsc};
use tokio::task::JoinHandle;
use tracing::instrument::WithSubscriber;
use tracing::{Dispatch, Instrument, Level, debug, error, info, span, trace, warn};

use pipebot_core::{
    BoxedTransport, CancellationToken, InboundEvent, InboundReceivers, Pipe, inbound_channels,
};
use pipebot_framework::{BoxedHandler, Handler, ListenerChain, RouteOutcome, Router};

use crate::config::BotSettings;
use crate::error::{RuntimeError, RuntimeResult};
use crate::signal::shutdown_signal;

/// Default capacity of each inbound queue.
pub const DEFAULT_QUEUE_CAPACITY: usize = 1;

// =============================================================================
// Outcomes & Stats
// =============================================================================

/// How far a single event got through the pipeline.
#[derive(Debug, Clone)]
pub enum DispatchOutcome {
    /// No pipe could be built from the event.
    Dropped,
    /// The command was addressed to another bot.
    Filtered,
    /// A pre-listener stopped the event before routing.
    Aborted,
    /// The event was routed; post-listeners have run.
    Routed(RouteOutcome),
}

impl DispatchOutcome {
    pub fn route(&self) -> Option<&RouteOutcome> {
        match self {
            Self::Routed(outcome) => Some(outcome),
            _ => None,
        }
    }
}

#[derive(Debug, Default)]
struct StatsCounters {
    received: AtomicU64,
    dropped: AtomicU64,
    filtered: AtomicU64,
    aborted: AtomicU64,
    handled: AtomicU64,
    failed: AtomicU64,
    unmatched: AtomicU64,
}

impl StatsCounters {
    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn record(&self, outcome: &DispatchOutcome) {
        match outcome {
            DispatchOutcome::Dropped => Self::bump(&self.dropped),
            DispatchOutcome::Filtered => Self::bump(&self.filtered),
            DispatchOutcome::Aborted => Self::bump(&self.aborted),
            DispatchOutcome::Routed(RouteOutcome::Unmatched) => Self::bump(&self.unmatched),
            DispatchOutcome::Routed(RouteOutcome::Handled { .. }) => Self::bump(&self.handled),
            DispatchOutcome::Routed(RouteOutcome::Failed { .. }) => Self::bump(&self.failed),
        }
    }

    fn snapshot(&self) -> BotStats {
        BotStats {
            received: self.received.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
            filtered: self.filtered.load(Ordering::Relaxed),
            aborted: self.aborted.load(Ordering::Relaxed),
            handled: self.handled.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            unmatched: self.unmatched.load(Ordering::Relaxed),
        }
    }
}

/// Event counters for a bot.
///
/// `received` counts messages and callbacks as soon as they are handed to the
/// bot, including ones still waiting for an in-flight slot. Every finished
/// event adds to exactly one of the other counters, so
/// `received - completed()` is the number of events still in progress.
/// Queries are never counted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BotStats {
    pub received: u64,
    pub dropped: u64,
    pub filtered: u64,
    pub aborted: u64,
    pub handled: u64,
    pub failed: u64,
    pub unmatched: u64,
}

impl BotStats {
    /// Number of events whose pipeline has finished.
    pub fn completed(&self) -> u64 {
        self.dropped + self.filtered + self.aborted + self.handled + self.failed + self.unmatched
    }
}

impl std::fmt::Display for BotStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Events: {} received ({} handled, {} failed, {} unmatched, {} aborted, {} filtered, {} dropped)",
            self.received,
            self.handled,
            self.failed,
            self.unmatched,
            self.aborted,
            self.filtered,
            self.dropped
        )
    }
}

// =============================================================================
// Bot
// =============================================================================

struct BotInner {
    name: String,
    filter_by_bot_name: bool,
    transport: BoxedTransport,
    router: Arc<Router>,
    listeners: Arc<ListenerChain>,
    queue_capacity: usize,
    limiter: Option<Semaphore>,
    log_dispatch: Option<Dispatch>,
    stats: StatsCounters,
}

/// A built bot: immutable handler and listener snapshots plus a transport.
///
/// Cloning is cheap and clones share stats.
#[derive(Clone)]
pub struct Bot {
    inner: Arc<BotInner>,
}

impl Bot {
    /// Shorthand for [`BotBuilder::new`].
    pub fn builder(name: impl Into<String>, transport: BoxedTransport) -> BotBuilder {
        BotBuilder::new(name, transport)
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn filters_by_bot_name(&self) -> bool {
        self.inner.filter_by_bot_name
    }

    pub fn transport(&self) -> &BoxedTransport {
        &self.inner.transport
    }

    pub fn router(&self) -> &Router {
        &self.inner.router
    }

    pub fn listeners(&self) -> &ListenerChain {
        &self.inner.listeners
    }

    /// Returns a snapshot of the event counters.
    pub fn stats(&self) -> BotStats {
        self.inner.stats.snapshot()
    }

    /// Runs one event through the pipeline.
    ///
    /// This is what every spawned per-event task does; calling it directly
    /// is useful for transports that push events one at a time, and for
    /// tests. Never fails: the outcome is informational.
    pub async fn handle_event(&self, event: InboundEvent) -> DispatchOutcome {
        let work = async move {
            let span = span!(
                Level::DEBUG,
                "dispatch",
                kind = event.kind(),
                event_id = %event.id()
            );
            self.process(event).instrument(span).await
        };
        match &self.inner.log_dispatch {
            Some(dispatch) => work.with_subscriber(dispatch.clone()).await,
            None => work.await,
        }
    }

    async fn process(&self, event: InboundEvent) -> DispatchOutcome {
        if let InboundEvent::Query(query) = &event {
            trace!(query_id = %query.id, "Queries are not routed, skipping");
            return DispatchOutcome::Dropped;
        }

        StatsCounters::bump(&self.inner.stats.received);

        let _permit = match &self.inner.limiter {
            Some(limiter) => limiter.acquire().await.ok(),
            None => None,
        };

        let outcome = self.run_pipeline(event).await;
        self.inner.stats.record(&outcome);
        outcome
    }

    async fn run_pipeline(&self, event: InboundEvent) -> DispatchOutcome {
        trace!(sender = event.sender().id, "Received event");

        let pipe = match Pipe::from_event(event, Arc::clone(&self.inner.transport)) {
            Ok(pipe) => Arc::new(pipe),
            Err(e) => {
                error!(error = %e, "Unable to build pipe");
                return DispatchOutcome::Dropped;
            }
        };

        if self.inner.filter_by_bot_name {
            let addressee = pipe.addressee();
            if !addressee.is_empty() && addressee != self.inner.name {
                trace!(addressee, "Skip by bot name");
                return DispatchOutcome::Filtered;
            }
        }

        if !self.inner.listeners.run_pre(&pipe) {
            return DispatchOutcome::Aborted;
        }

        let outcome = self.inner.router.route(&pipe).await;
        trace!(message_id = pipe.message_id(), "Event processed");

        self.inner.listeners.run_post(&pipe, &outcome);
        DispatchOutcome::Routed(outcome)
    }

    /// Spawns a task, attaching the injected log dispatch if there is one.
    fn spawn<F>(&self, future: F) -> JoinHandle<F::Output>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        match &self.inner.log_dispatch {
            Some(dispatch) => tokio::spawn(future.with_subscriber(dispatch.clone())),
            None => tokio::spawn(future),
        }
    }

    fn spawn_event(&self, event: InboundEvent) {
        let bot = self.clone();
        tokio::spawn(async move {
            bot.handle_event(event).await;
        });
    }

    /// Listens on the transport until `stop` is cancelled.
    ///
    /// Starts the transport's `listen` and one listening task per inbound
    /// queue. Cancelling `stop` makes the listening tasks exit without
    /// draining their queues; per-event tasks already spawned run to
    /// completion on their own. Returns the transport's listen error, if any.
    pub async fn run(&self, poll: Duration, stop: CancellationToken) -> RuntimeResult<()> {
        let (sinks, receivers) = inbound_channels(self.inner.queue_capacity);
        let InboundReceivers {
            messages,
            callbacks,
            queries,
        } = receivers;

        info!(bot = %self.inner.name, poll_ms = poll.as_millis() as u64, "Bot started");

        let transport = Arc::clone(&self.inner.transport);
        let listen_stop = stop.clone();
        let listen = self.spawn(async move { transport.listen(sinks, poll, listen_stop).await });

        let bot = self.clone();
        let message_loop = self.spawn(drain(messages, stop.clone(), move |message| {
            trace!(message_id = message.id, "Received message");
            bot.spawn_event(message.into());
        }));

        let bot = self.clone();
        let callback_loop = self.spawn(drain(callbacks, stop.clone(), move |callback| {
            trace!(callback_id = %callback.id, "Received callback");
            bot.spawn_event(callback.into());
        }));

        let query_loop = self.spawn(drain(queries, stop.clone(), |query| {
            trace!(query_id = %query.id, "Received query");
        }));

        let (listen, message_loop, callback_loop, query_loop) =
            tokio::join!(listen, message_loop, callback_loop, query_loop);
        message_loop?;
        callback_loop?;
        query_loop?;

        info!(bot = %self.inner.name, stats = %self.stats(), "Bot stopped");

        listen?.map_err(|e| {
            error!(error = %e, "Transport listen failed");
            RuntimeError::from(e)
        })
    }

    /// Spawns [`run`](Self::run) and returns a handle to stop it.
    pub fn start(&self, poll: Duration) -> BotHandle {
        let stop = CancellationToken::new();
        let bot = self.clone();
        let token = stop.clone();
        let join = tokio::spawn(async move { bot.run(poll, token).await });
        BotHandle { stop, join }
    }

    /// Runs until Ctrl+C (or SIGTERM on unix), then stops.
    pub async fn run_until_shutdown(&self, poll: Duration) -> RuntimeResult<()> {
        let handle = self.start(poll);
        info!(bot = %self.inner.name, "Bot is running. Press Ctrl+C to stop.");
        shutdown_signal().await;
        handle.shutdown().await
    }
}

impl std::fmt::Debug for Bot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bot")
            .field("name", &self.inner.name)
            .field("filter_by_bot_name", &self.inner.filter_by_bot_name)
            .field("router", &self.inner.router)
            .field("listeners", &self.inner.listeners)
            .field("queue_capacity", &self.inner.queue_capacity)
            .field("stats", &self.stats())
            .finish_non_exhaustive()
    }
}

/// Reads `rx` until `stop` is cancelled or every sender is gone.
async fn drain<T, F>(mut rx: mpsc::Receiver<T>, stop: CancellationToken, mut on_item: F)
where
    F: FnMut(T),
{
    loop {
        tokio::select! {
            biased;
            _ = stop.cancelled() => break,
            item = rx.recv() => match item {
                Some(item) => on_item(item),
                None => break,
            },
        }
    }
    debug!("Listening task stopped");
}

// =============================================================================
// BotHandle
// =============================================================================

/// Handle to a bot started with [`Bot::start`].
#[derive(Debug)]
pub struct BotHandle {
    stop: CancellationToken,
    join: JoinHandle<RuntimeResult<()>>,
}

impl BotHandle {
    /// Signals the bot to stop. Idempotent.
    pub fn stop(&self) {
        self.stop.cancel();
    }

    pub fn stop_token(&self) -> CancellationToken {
        self.stop.clone()
    }

    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }

    /// Waits for the bot to finish.
    pub async fn join(self) -> RuntimeResult<()> {
        self.join.await?
    }

    /// Stops the bot and waits for it to finish.
    pub async fn shutdown(self) -> RuntimeResult<()> {
        self.stop();
        self.join().await
    }
}

// =============================================================================
// BotBuilder
// =============================================================================

/// Builder for [`Bot`]. Handlers and listeners can only be registered here;
/// a built bot's registries never change.
pub struct BotBuilder {
    name: String,
    transport: BoxedTransport,
    filter_by_bot_name: bool,
    router: Router,
    listeners: ListenerChain,
    max_in_flight: Option<usize>,
    queue_capacity: usize,
    log_dispatch: Option<Dispatch>,
}

impl BotBuilder {
    pub fn new(name: impl Into<String>, transport: BoxedTransport) -> Self {
        Self {
            name: name.into(),
            transport,
            filter_by_bot_name: false,
            router: Router::new(),
            listeners: ListenerChain::new(),
            max_in_flight: None,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            log_dispatch: None,
        }
    }

    /// Creates a builder from loaded settings.
    pub fn from_settings(settings: &BotSettings, transport: BoxedTransport) -> Self {
        let mut builder = Self::new(settings.name.clone(), transport)
            .filter_by_bot_name(settings.filter_by_bot_name)
            .queue_capacity(settings.queue_capacity);
        builder.max_in_flight = settings.max_in_flight;
        builder
    }

    /// Drop commands addressed to a different bot name.
    pub fn filter_by_bot_name(mut self, enabled: bool) -> Self {
        self.filter_by_bot_name = enabled;
        self
    }

    /// Appends a handler. Earlier handlers take precedence.
    pub fn handler(mut self, handler: impl Handler) -> Self {
        self.router.add(handler);
        self
    }

    pub fn handler_boxed(mut self, handler: BoxedHandler) -> Self {
        self.router.add_boxed(handler);
        self
    }

    /// Replaces the router with a prebuilt one.
    pub fn router(mut self, router: Router) -> Self {
        self.router = router;
        self
    }

    /// Appends a pre-route gate; returning `false` aborts the event.
    pub fn pre_listener<F>(mut self, f: F) -> Self
    where
        F: Fn(&Pipe) -> bool + Send + Sync + 'static,
    {
        self.listeners.add_pre(f);
        self
    }

    /// Appends a post-route observer.
    pub fn post_listener<F>(mut self, f: F) -> Self
    where
        F: Fn(&Pipe, &RouteOutcome) + Send + Sync + 'static,
    {
        self.listeners.add_post(f);
        self
    }

    /// Replaces the listener chain with a prebuilt one.
    pub fn listeners(mut self, listeners: ListenerChain) -> Self {
        self.listeners = listeners;
        self
    }

    /// Bounds the number of events processed at once.
    pub fn max_in_flight(mut self, limit: usize) -> Self {
        self.max_in_flight = Some(limit);
        self
    }

    /// Sets the capacity of each inbound queue.
    pub fn queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity;
        self
    }

    /// Sends this bot's logs to `dispatch` instead of the global default.
    pub fn log_dispatch(mut self, dispatch: Dispatch) -> Self {
        self.log_dispatch = Some(dispatch);
        self
    }

    pub fn build(self) -> RuntimeResult<Bot> {
        if self.name.is_empty() {
            return Err(RuntimeError::InvalidBot("empty bot name".into()));
        }
        if self.queue_capacity == 0 {
            return Err(RuntimeError::InvalidBot(
                "queue capacity must be greater than 0".into(),
            ));
        }
        if self.max_in_flight == Some(0) {
            return Err(RuntimeError::InvalidBot(
                "max_in_flight must be greater than 0".into(),
            ));
        }
        if self.router.is_empty() {
            warn!(bot = %self.name, "Building bot without handlers; every event will be unmatched");
        }

        debug!(
            bot = %self.name,
            handlers = self.router.handler_count(),
            pre_listeners = self.listeners.pre_count(),
            post_listeners = self.listeners.post_count(),
            "Bot built"
        );

        Ok(Bot {
            inner: Arc::new(BotInner {
                name: self.name,
                filter_by_bot_name: self.filter_by_bot_name,
                transport: self.transport,
                router: Arc::new(self.router),
                listeners: Arc::new(self.listeners),
                queue_capacity: self.queue_capacity,
                limiter: self.max_in_flight.map(Semaphore::new),
                log_dispatch: self.log_dispatch,
                stats: StatsCounters::default(),
            }),
        })
    }
}

impl std::fmt::Debug for BotBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BotBuilder")
            .field("name", &self.name)
            .field("filter_by_bot_name", &self.filter_by_bot_name)
            .field("router", &self.router)
            .field("listeners", &self.listeners)
            .field("max_in_flight", &self.max_in_flight)
            .field("queue_capacity", &self.queue_capacity)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pipebot_core::{Callback, Chat, HandlerError, Message, Query, User};
    use pipebot_framework::{FnHandler, on_command};
    use pipebot_transport::{MemoryTransport, OperationKind};
    use std::sync::atomic::AtomicUsize;

    fn message(text: &str) -> Message {
        Message::new(10, User::new(1, "Ann"), Chat::group(-5, "den"), text)
    }

    fn counter() -> Arc<AtomicUsize> {
        Arc::new(AtomicUsize::new(0))
    }

    fn counting_handler(hits: Arc<AtomicUsize>) -> FnHandler {
        FnHandler::new().named("count").handle_message(move |_| {
            let hits = hits.clone();
            async move {
                hits.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        })
    }

    #[test]
    fn test_build_rejects_invalid_settings() {
        let (transport, _injector) = MemoryTransport::new();
        assert!(matches!(
            BotBuilder::new("", transport.clone()).build(),
            Err(RuntimeError::InvalidBot(_))
        ));
        assert!(
            BotBuilder::new("bot", transport.clone())
                .queue_capacity(0)
                .build()
                .is_err()
        );
        assert!(
            BotBuilder::new("bot", transport)
                .max_in_flight(0)
                .build()
                .is_err()
        );
    }

    #[test]
    fn test_from_settings() {
        let (transport, _injector) = MemoryTransport::new();
        let settings = BotSettings {
            name: "helper_bot".into(),
            filter_by_bot_name: true,
            queue_capacity: 3,
            ..Default::default()
        };
        let bot = tokio_test::assert_ok!(BotBuilder::from_settings(&settings, transport).build());
        assert_eq!(bot.name(), "helper_bot");
        assert!(bot.filters_by_bot_name());
        assert_eq!(bot.inner.queue_capacity, 3);
    }

    #[tokio::test]
    async fn test_bot_name_filter() {
        let (transport, _injector) = MemoryTransport::new();
        let hits = counter();
        let pre = counter();
        let pre_hits = pre.clone();

        let bot = BotBuilder::new("foo", transport)
            .filter_by_bot_name(true)
            .pre_listener(move |_| {
                pre_hits.fetch_add(1, Ordering::SeqCst);
                true
            })
            .handler(counting_handler(hits.clone()))
            .build()
            .unwrap();

        let outcome = bot.handle_event(message("/start@bar").into()).await;
        assert!(matches!(outcome, DispatchOutcome::Filtered));
        assert_eq!(pre.load(Ordering::SeqCst), 0);
        assert_eq!(hits.load(Ordering::SeqCst), 0);

        bot.handle_event(message("/start@foo").into()).await;
        bot.handle_event(message("/start").into()).await;
        bot.handle_event(message("plain text").into()).await;
        assert_eq!(hits.load(Ordering::SeqCst), 3);
        assert_eq!(pre.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_filter_disabled_ignores_addressee() {
        let (transport, _injector) = MemoryTransport::new();
        let hits = counter();
        let bot = BotBuilder::new("foo", transport)
            .handler(counting_handler(hits.clone()))
            .build()
            .unwrap();

        bot.handle_event(message("/start@bar").into()).await;
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_pre_listener_abort_skips_routing_and_post() {
        let (transport, _injector) = MemoryTransport::new();
        let hits = counter();
        let post = counter();
        let post_hits = post.clone();

        let bot = BotBuilder::new("foo", transport.clone())
            .pre_listener(|pipe| !pipe.text().contains("spam"))
            .post_listener(move |_, _| {
                post_hits.fetch_add(1, Ordering::SeqCst);
            })
            .handler(counting_handler(hits.clone()))
            .build()
            .unwrap();

        let outcome = bot.handle_event(message("buy spam").into()).await;
        assert!(matches!(outcome, DispatchOutcome::Aborted));
        assert_eq!(hits.load(Ordering::SeqCst), 0);
        assert_eq!(post.load(Ordering::SeqCst), 0);
        assert!(transport.calls().is_empty());

        bot.handle_event(message("hello").into()).await;
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert_eq!(post.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_post_listeners_run_for_every_route_outcome() {
        let (transport, _injector) = MemoryTransport::new();
        let post = counter();
        let post_hits = post.clone();

        let bot = BotBuilder::new("foo", transport.clone())
            .post_listener(move |_, _| {
                post_hits.fetch_add(1, Ordering::SeqCst);
            })
            .handler(on_command("/ok").handle_message(|_| async { Ok(()) }))
            .handler(
                on_command("/fail").handle_message(|_| async { Err(HandlerError::msg("bad input")) }),
            )
            .build()
            .unwrap();

        bot.handle_event(message("/ok").into()).await;
        bot.handle_event(message("/fail").into()).await;
        bot.handle_event(message("/unknown").into()).await;

        assert_eq!(post.load(Ordering::SeqCst), 3);
        assert_eq!(transport.sent_texts(), vec!["Error - bad input".to_string()]);

        let stats = bot.stats();
        assert_eq!(stats.received, 3);
        assert_eq!(stats.handled, 1);
        assert_eq!(stats.failed, 1);
        assert_eq!(stats.unmatched, 1);
        assert_eq!(stats.completed(), 3);
    }

    #[tokio::test]
    async fn test_callback_routes_through_pipeline() {
        let (transport, _injector) = MemoryTransport::new();
        let pressed = counter();
        let p = pressed.clone();

        let bot = BotBuilder::new("foo", transport.clone())
            .handler(FnHandler::new().handle_callback(move |pipe| {
                let p = p.clone();
                async move {
                    pipe.answer_callback("done", false).await?;
                    p.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                }
            }))
            .build()
            .unwrap();

        let callback = Callback::new("cb1", User::new(2, "Bob"), message("menu"), "pick");
        let outcome = bot.handle_event(callback.into()).await;

        assert!(outcome.route().is_some_and(RouteOutcome::is_matched));
        assert_eq!(pressed.load(Ordering::SeqCst), 1);
        assert_eq!(transport.calls_of(OperationKind::ChatAction).len(), 1);
        assert_eq!(transport.calls_of(OperationKind::AnswerCallback).len(), 1);
    }

    #[tokio::test]
    async fn test_query_is_dropped() {
        let (transport, _injector) = MemoryTransport::new();
        let bot = BotBuilder::new("foo", transport).build().unwrap();

        let query = Query {
            id: "q".into(),
            sender: User::new(1, "Ann"),
            text: "weather".into(),
        };
        let outcome = bot.handle_event(query.into()).await;

        assert!(matches!(outcome, DispatchOutcome::Dropped));
        assert_eq!(bot.stats(), BotStats::default());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_received_counts_events_waiting_for_a_slot() {
        let (transport, _injector) = MemoryTransport::new();
        let started = counter();
        let release = Arc::new(tokio::sync::Notify::new());

        let (s, r) = (started.clone(), release.clone());
        let bot = BotBuilder::new("foo", transport)
            .max_in_flight(1)
            .handler(FnHandler::new().handle_message(move |_| {
                let (started, release) = (s.clone(), r.clone());
                async move {
                    started.fetch_add(1, Ordering::SeqCst);
                    release.notified().await;
                    Ok(())
                }
            }))
            .build()
            .unwrap();

        let first = tokio::spawn({
            let bot = bot.clone();
            async move { bot.handle_event(message("one").into()).await }
        });
        while started.load(Ordering::SeqCst) == 0 {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }

        let second = tokio::spawn({
            let bot = bot.clone();
            async move { bot.handle_event(message("two").into()).await }
        });
        tokio::time::timeout(Duration::from_secs(5), async {
            while bot.stats().received < 2 {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("queued event was not counted");

        // The second event is counted but has not started.
        assert_eq!(started.load(Ordering::SeqCst), 1);
        assert_eq!(bot.stats().completed(), 0);

        release.notify_one();
        first.await.unwrap();
        release.notify_one();
        second.await.unwrap();

        let stats = bot.stats();
        assert_eq!(stats.received, 2);
        assert_eq!(stats.handled, 2);
    }

    #[tokio::test]
    async fn test_log_dispatch_receives_events() {
        let (transport, _injector) = MemoryTransport::new();
        let dispatch = crate::logging::LoggingBuilder::new()
            .with_level(Level::TRACE)
            .output(crate::config::LogOutput::Stderr)
            .build_dispatch();

        let bot = BotBuilder::new("foo", transport)
            .log_dispatch(dispatch)
            .build()
            .unwrap();
        let outcome = bot.handle_event(message("hello").into()).await;
        assert!(matches!(outcome, DispatchOutcome::Routed(RouteOutcome::Unmatched)));
    }
}
