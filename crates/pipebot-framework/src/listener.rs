//! Pre- and post-route listener hooks.
//!
//! Pre-listeners are gates: each returns whether dispatch should continue,
//! and the first `false` aborts the pass. Post-listeners observe the
//! [`RouteOutcome`] after routing and cannot change it.

use std::sync::Arc;

use tracing::trace;

use pipebot_core::Pipe;

use crate::router::RouteOutcome;

/// A pre-route gate. Returning `false` aborts dispatch for this pipe.
pub type PreListener = Arc<dyn Fn(&Pipe) -> bool + Send + Sync>;

/// A post-route observer.
pub type PostListener = Arc<dyn Fn(&Pipe, &RouteOutcome) + Send + Sync>;

/// Ordered pre- and post-route listeners.
#[derive(Clone, Default)]
pub struct ListenerChain {
    pre: Vec<PreListener>,
    post: Vec<PostListener>,
}

impl ListenerChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_pre<F>(&mut self, f: F) -> &mut Self
    where
        F: Fn(&Pipe) -> bool + Send + Sync + 'static,
    {
        self.pre.push(Arc::new(f));
        self
    }

    pub fn add_post<F>(&mut self, f: F) -> &mut Self
    where
        F: Fn(&Pipe, &RouteOutcome) + Send + Sync + 'static,
    {
        self.post.push(Arc::new(f));
        self
    }

    pub fn with_pre<F>(mut self, f: F) -> Self
    where
        F: Fn(&Pipe) -> bool + Send + Sync + 'static,
    {
        self.add_pre(f);
        self
    }

    pub fn with_post<F>(mut self, f: F) -> Self
    where
        F: Fn(&Pipe, &RouteOutcome) + Send + Sync + 'static,
    {
        self.add_post(f);
        self
    }

    pub fn pre_count(&self) -> usize {
        self.pre.len()
    }

    pub fn post_count(&self) -> usize {
        self.post.len()
    }

    /// Runs pre-listeners in order, stopping at the first that returns
    /// `false`. Returns whether dispatch should continue.
    pub fn run_pre(&self, pipe: &Pipe) -> bool {
        for (index, listener) in self.pre.iter().enumerate() {
            if !listener(pipe) {
                trace!(
                    listener_index = index,
                    message_id = pipe.message_id(),
                    "Pre-listener aborted dispatch"
                );
                return false;
            }
        }
        true
    }

    /// Runs every post-listener in order.
    pub fn run_post(&self, pipe: &Pipe, outcome: &RouteOutcome) {
        for listener in &self.post {
            listener(pipe, outcome);
        }
    }
}

impl std::fmt::Debug for ListenerChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListenerChain")
            .field("pre", &self.pre.len())
            .field("post", &self.post.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use pipebot_core::{Chat, Message, User};
    use pipebot_transport::MemoryTransport;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn pipe(text: &str) -> Pipe {
        let (transport, _injector) = MemoryTransport::new();
        Pipe::new(
            Message::new(1, User::new(2, "Ann"), Chat::private(2), text),
            transport,
        )
    }

    #[test]
    fn test_empty_chain_proceeds() {
        let chain = ListenerChain::new();
        assert!(chain.run_pre(&pipe("hi")));
        chain.run_post(&pipe("hi"), &RouteOutcome::Unmatched);
    }

    #[test]
    fn test_pre_short_circuits_in_order() {
        let order = Arc::new(Mutex::new(Vec::new()));
        let (a, b, c) = (order.clone(), order.clone(), order.clone());

        let chain = ListenerChain::new()
            .with_pre(move |_| {
                a.lock().push("a");
                true
            })
            .with_pre(move |p| {
                b.lock().push("b");
                !p.text().contains("spam")
            })
            .with_pre(move |_| {
                c.lock().push("c");
                true
            });

        assert!(chain.run_pre(&pipe("hello")));
        assert_eq!(*order.lock(), vec!["a", "b", "c"]);

        order.lock().clear();
        assert!(!chain.run_pre(&pipe("buy spam")));
        assert_eq!(*order.lock(), vec!["a", "b"]);
    }

    #[test]
    fn test_post_sees_outcome() {
        let matched = Arc::new(AtomicUsize::new(0));
        let calls = Arc::new(AtomicUsize::new(0));
        let (m, c) = (matched.clone(), calls.clone());

        let chain = ListenerChain::new().with_post(move |_, outcome| {
            c.fetch_add(1, Ordering::SeqCst);
            if outcome.is_matched() {
                m.fetch_add(1, Ordering::SeqCst);
            }
        });
        assert_eq!(chain.post_count(), 1);

        let p = pipe("x");
        chain.run_post(&p, &RouteOutcome::Unmatched);
        chain.run_post(
            &p,
            &RouteOutcome::Handled {
                handler: "echo".into(),
            },
        );

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(matched.load(Ordering::SeqCst), 1);
    }
}
