//! Handler system.
//!
//! A [`Handler`] is a predicate-matched unit of work. The router asks each
//! registered handler in turn whether it [`test`](Handler::test)s true for a
//! pipe; the first that does receives the event through
//! [`on_message`](Handler::on_message) or
//! [`on_callback`](Handler::on_callback).
//!
//! Handlers can be written as types implementing the trait, or assembled
//! from closures with [`FnHandler`]:
//!
//! ```rust,ignore
//! use pipebot_framework::FnHandler;
//!
//! let ping = FnHandler::new()
//!     .named("ping")
//!     .check(|pipe| pipe.command() == "/ping")
//!     .handle_message(|pipe| async move {
//!         pipe.send_message("pong", None).await?;
//!         Ok(())
//!     });
//! ```

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::BoxFuture;
use tracing::trace;

use pipebot_core::{HandlerResult, Pipe};

// ============================================================================
// Handler Trait
// ============================================================================

/// A registered unit that may claim an event and act on it.
///
/// Handlers are stateless with respect to dispatch: the router never mutates
/// or removes them, and the same handler may run concurrently for different
/// events.
#[async_trait]
pub trait Handler: Send + Sync + 'static {
    /// Name used in logs and route outcomes.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    /// Returns `true` if this handler claims the event.
    fn test(&self, pipe: &Pipe) -> bool;

    /// Handles a message event.
    async fn on_message(&self, pipe: Arc<Pipe>) -> HandlerResult;

    /// Handles a button-press callback.
    async fn on_callback(&self, _pipe: Arc<Pipe>) -> HandlerResult {
        Ok(())
    }

    /// Handles an inline query. Not invoked by the router yet.
    async fn on_query(&self, _pipe: Arc<Pipe>) -> HandlerResult {
        Ok(())
    }
}

/// A shared handler trait object.
pub type BoxedHandler = Arc<dyn Handler>;

// ============================================================================
// FnHandler - closure-based handlers
// ============================================================================

/// A type-erased check function.
pub type CheckFn = Arc<dyn Fn(&Pipe) -> bool + Send + Sync>;

/// A type-erased handler operation.
pub type OperationFn = Arc<dyn Fn(Arc<Pipe>) -> BoxFuture<'static, HandlerResult> + Send + Sync>;

fn erase<F, Fut>(f: F) -> OperationFn
where
    F: Fn(Arc<Pipe>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    Arc::new(move |pipe: Arc<Pipe>| -> BoxFuture<'static, HandlerResult> { Box::pin(f(pipe)) })
}

/// A handler assembled from closures.
///
/// With no check, the handler claims every event. Operations left unset
/// succeed without doing anything.
#[derive(Clone, Default)]
pub struct FnHandler {
    name: Option<String>,
    check_fn: Option<CheckFn>,
    message_fn: Option<OperationFn>,
    callback_fn: Option<OperationFn>,
    query_fn: Option<OperationFn>,
}

impl FnHandler {
    /// Creates a handler that claims everything and does nothing.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Sets the check function, replacing any previous one.
    pub fn check<F>(mut self, f: F) -> Self
    where
        F: Fn(&Pipe) -> bool + Send + Sync + 'static,
    {
        self.check_fn = Some(Arc::new(f));
        self
    }

    /// Narrows the current check with an extra condition.
    pub fn and<F>(mut self, f: F) -> Self
    where
        F: Fn(&Pipe) -> bool + Send + Sync + 'static,
    {
        let check: CheckFn = match self.check_fn.take() {
            Some(prev) => Arc::new(move |pipe: &Pipe| prev(pipe) && f(pipe)),
            None => Arc::new(f),
        };
        self.check_fn = Some(check);
        self
    }

    pub fn handle_message<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(Arc<Pipe>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        self.message_fn = Some(erase(f));
        self
    }

    pub fn handle_callback<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(Arc<Pipe>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        self.callback_fn = Some(erase(f));
        self
    }

    pub fn handle_query<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(Arc<Pipe>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        self.query_fn = Some(erase(f));
        self
    }

    /// Boxes this handler for registration.
    pub fn boxed(self) -> BoxedHandler {
        Arc::new(self)
    }

    async fn run(&self, op: Option<&OperationFn>, kind: &str, pipe: Arc<Pipe>) -> HandlerResult {
        match op {
            Some(f) => f(pipe).await,
            None => {
                trace!(handler = self.label(), kind, "No operation set, skipping");
                Ok(())
            }
        }
    }

    fn label(&self) -> &str {
        self.name.as_deref().unwrap_or("unnamed")
    }
}

#[async_trait]
impl Handler for FnHandler {
    fn name(&self) -> &str {
        self.label()
    }

    fn test(&self, pipe: &Pipe) -> bool {
        match &self.check_fn {
            Some(f) => f(pipe),
            None => true,
        }
    }

    async fn on_message(&self, pipe: Arc<Pipe>) -> HandlerResult {
        self.run(self.message_fn.as_ref(), "message", pipe).await
    }

    async fn on_callback(&self, pipe: Arc<Pipe>) -> HandlerResult {
        self.run(self.callback_fn.as_ref(), "callback", pipe).await
    }

    async fn on_query(&self, pipe: Arc<Pipe>) -> HandlerResult {
        self.run(self.query_fn.as_ref(), "query", pipe).await
    }
}

impl std::fmt::Debug for FnHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnHandler")
            .field("name", &self.label())
            .field("has_check", &self.check_fn.is_some())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pipebot_core::{Chat, HandlerError, Message, User};
    use pipebot_transport::MemoryTransport;

    fn pipe(text: &str) -> Arc<Pipe> {
        let (transport, _injector) = MemoryTransport::new();
        let message = Message::new(1, User::new(2, "Ann"), Chat::private(2), text);
        Arc::new(Pipe::new(message, transport))
    }

    struct Greeter;

    #[async_trait]
    impl Handler for Greeter {
        fn test(&self, pipe: &Pipe) -> bool {
            pipe.text().starts_with("hello")
        }

        async fn on_message(&self, _pipe: Arc<Pipe>) -> HandlerResult {
            Err(HandlerError::msg("greeter is shy"))
        }
    }

    #[tokio::test]
    async fn test_trait_defaults() {
        let greeter = Greeter;
        assert!(greeter.name().ends_with("Greeter"));
        assert!(greeter.test(&pipe("hello there")));
        assert!(!greeter.test(&pipe("bye")));
        assert!(greeter.on_callback(pipe("x")).await.is_ok());
        assert!(greeter.on_query(pipe("x")).await.is_ok());
        assert_eq!(
            greeter.on_message(pipe("hello")).await.unwrap_err().message(),
            "greeter is shy"
        );
    }

    #[tokio::test]
    async fn test_fn_handler_without_check_claims_all() {
        let handler = FnHandler::new();
        assert!(handler.test(&pipe("anything")));
        assert!(handler.on_message(pipe("anything")).await.is_ok());
        assert_eq!(handler.name(), "unnamed");
    }

    #[tokio::test]
    async fn test_fn_handler_runs_operation() {
        let handler = FnHandler::new()
            .named("fails")
            .handle_message(|pipe| async move { Err(HandlerError::msg(pipe.text().to_string())) });
        let err = handler.on_message(pipe("oops")).await.unwrap_err();
        assert_eq!(err.message(), "oops");
        assert!(handler.on_callback(pipe("oops")).await.is_ok());
    }

    #[tokio::test]
    async fn test_fn_handler_operations_callable_by_method() {
        let handler = FnHandler::new()
            .named("all")
            .handle_message(|_| async { Err(HandlerError::msg("message")) })
            .handle_callback(|_| async { Err(HandlerError::msg("callback")) })
            .handle_query(|_| async { Err(HandlerError::msg("query")) });

        assert_eq!(handler.name(), "all");
        assert_eq!(handler.on_message(pipe("x")).await.unwrap_err().message(), "message");
        assert_eq!(handler.on_callback(pipe("x")).await.unwrap_err().message(), "callback");
        assert_eq!(handler.on_query(pipe("x")).await.unwrap_err().message(), "query");
    }

    #[test]
    fn test_and_narrows_check() {
        let handler = FnHandler::new()
            .check(|p| p.command() == "/ban")
            .and(|p| !p.text_without_command().is_empty());
        assert!(handler.test(&pipe("/ban spammer")));
        assert!(!handler.test(&pipe("/ban")));
        assert!(!handler.test(&pipe("/kick spammer")));
    }
}
