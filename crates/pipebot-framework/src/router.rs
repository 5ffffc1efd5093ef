//! First-match routing over an ordered handler list.
//!
//! The [`Router`] owns the reply ground rules every handler gets for free:
//! a "typing" indicator is shown before the handler runs, and a failing
//! handler's error is reported back into the chat as `Error - <message>`.
//!
//! # Tower Service Integration
//!
//! `Router` implements `tower::Service<Arc<Pipe>>`, so middleware can wrap it:
//!
//! ```rust,ignore
//! use tower::ServiceBuilder;
//! use tower::timeout::TimeoutLayer;
//!
//! let service = ServiceBuilder::new()
//!     .layer(TimeoutLayer::new(Duration::from_secs(5)))
//!     .service(router);
//! ```

use std::convert::Infallible;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use tower::Service;
use tracing::{debug, error, info, trace, warn};

use pipebot_core::{HandlerError, Pipe};

use crate::handler::{BoxedHandler, Handler};

/// Prefix of the reply sent when a handler fails.
pub const ERROR_REPLY_PREFIX: &str = "Error - ";

/// What happened to a pipe that went through the router.
#[derive(Debug, Clone)]
pub enum RouteOutcome {
    /// No handler claimed the pipe.
    Unmatched,
    /// The named handler ran to completion.
    Handled { handler: String },
    /// The named handler returned an error. The error reply has already
    /// been attempted.
    Failed { handler: String, error: HandlerError },
}

impl RouteOutcome {
    pub fn is_matched(&self) -> bool {
        !matches!(self, Self::Unmatched)
    }

    /// Name of the handler that claimed the pipe, if any.
    pub fn handler(&self) -> Option<&str> {
        match self {
            Self::Unmatched => None,
            Self::Handled { handler } | Self::Failed { handler, .. } => Some(handler),
        }
    }
}

#[derive(Clone, Default)]
struct RouterInner {
    handlers: Vec<BoxedHandler>,
}

/// An ordered, append-only list of handlers.
///
/// Cloning is cheap; the handler list sits behind an `Arc` and is only
/// copied when a shared router is extended.
#[derive(Clone, Default)]
pub struct Router {
    inner: Arc<RouterInner>,
}

impl Router {
    pub fn new() -> Self {
        Self::default()
    }

    fn inner_mut(&mut self) -> &mut RouterInner {
        Arc::make_mut(&mut self.inner)
    }

    /// Appends a handler. Earlier handlers take precedence.
    pub fn add(&mut self, handler: impl Handler) -> &mut Self {
        self.inner_mut().handlers.push(Arc::new(handler));
        self
    }

    /// Appends an already boxed handler.
    pub fn add_boxed(&mut self, handler: BoxedHandler) -> &mut Self {
        self.inner_mut().handlers.push(handler);
        self
    }

    /// Builder form of [`add`](Self::add).
    pub fn with(mut self, handler: impl Handler) -> Self {
        self.add(handler);
        self
    }

    /// Builder form of [`add_boxed`](Self::add_boxed).
    pub fn with_boxed(mut self, handler: BoxedHandler) -> Self {
        self.add_boxed(handler);
        self
    }

    pub fn handler_count(&self) -> usize {
        self.inner.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.handlers.is_empty()
    }

    /// Returns the first handler whose test passes.
    pub fn find_handler(&self, pipe: &Pipe) -> Option<&BoxedHandler> {
        self.inner.handlers.iter().find(|h| h.test(pipe))
    }

    /// Routes a pipe to its handler.
    ///
    /// Never fails: handler errors are reported into the chat and returned
    /// as [`RouteOutcome::Failed`].
    pub async fn route(&self, pipe: &Arc<Pipe>) -> RouteOutcome {
        let Some(handler) = self.find_handler(pipe) else {
            info!(
                message_id = pipe.message_id(),
                chat_id = pipe.chat().id,
                "No route matched"
            );
            return RouteOutcome::Unmatched;
        };
        let name = handler.name().to_string();

        trace!(handler = %name, callback = pipe.is_callback(), "Route matched");

        if let Err(e) = pipe.send_typing().await {
            debug!(handler = %name, error = %e, "Failed to send typing indicator");
        }

        let result = if pipe.is_callback() {
            handler.on_callback(Arc::clone(pipe)).await
        } else {
            handler.on_message(Arc::clone(pipe)).await
        };

        match result {
            Ok(()) => RouteOutcome::Handled { handler: name },
            Err(e) => {
                error!(
                    handler = %name,
                    message_id = pipe.message_id(),
                    error = %e,
                    "Handler failed"
                );
                let reply = format!("{ERROR_REPLY_PREFIX}{e}");
                if let Err(send_err) = pipe.send_message(&reply, None).await {
                    warn!(handler = %name, error = %send_err, "Failed to send error reply");
                }
                RouteOutcome::Failed {
                    handler: name,
                    error: e,
                }
            }
        }
    }
}

impl std::fmt::Debug for Router {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&str> = self.inner.handlers.iter().map(|h| h.name()).collect();
        f.debug_struct("Router").field("handlers", &names).finish()
    }
}

// ============================================================================
// Tower Service Implementation
// ============================================================================

impl Service<Arc<Pipe>> for Router {
    type Response = RouteOutcome;
    type Error = Infallible;
    type Future =
        Pin<Box<dyn std::future::Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, pipe: Arc<Pipe>) -> Self::Future {
        let router = self.clone();
        Box::pin(async move { Ok(router.route(&pipe).await) })
    }
}
