//! Handler chain composition
//!
//! A [`Chain`] assembles an ordered list of handlers into one composite
//! handler. It closes over a configuration snapshot and an optional base
//! registry at build time and consults no global state afterwards: the
//! same handler list and base registry always produce a chain with
//! identical dispatch behavior.
//!
//! Chains are built once and dispatched many times; they are immutable
//! after construction and safely shared across concurrent dispatches. A
//! chain is itself a [`Handler`], so chains nest: invoking an outer chain
//! walks into a nested chain exactly as if its handlers were inlined at
//! that position, preserving both advance and short-circuit semantics.
//!
//! # Example
//!
//! ```rust,ignore
//! let chain = Chain::builder(ChainConfig::from_env())
//!     .registry(base_registry)
//!     .handler(RequestId)
//!     .handler(Injecting::new(ShowUser))
//!     .handler_fn(|ctx| async move { ctx.send(Response::text("fallback").status(404)) })
//!     .build();
//!
//! let outcome = chain.dispatch(request).await?;
//! ```

use crate::config::ChainConfig;
use crate::context::{dispatch, Context, Outcome};
use crate::error::{DispatchError, DispatchResult};
use crate::handler::{handler_fn, ArcHandler, Handler};
use crate::http::Request;
use crate::registry::Registry;
use async_trait::async_trait;
use std::future::Future;
use std::sync::Arc;

/// An ordered composition of handlers built into one composite handler
pub struct Chain {
    handlers: Arc<Vec<ArcHandler>>,
    config: ChainConfig,
    registry: Option<Arc<Registry>>,
}

impl Chain {
    /// Start building a chain with the given configuration snapshot
    pub fn builder(config: ChainConfig) -> ChainBuilder {
        ChainBuilder {
            handlers: Vec::new(),
            config,
            registry: None,
        }
    }

    /// Number of direct handler elements in this chain
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    /// Whether the chain has no handlers
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Run a complete dispatch through this chain
    ///
    /// The root context is bound to the chain's base registry and
    /// configuration.
    pub async fn dispatch(&self, request: Request) -> Result<Outcome, DispatchError> {
        dispatch(self, request, Registry::empty(), self.config.clone()).await
    }
}

#[async_trait]
impl Handler for Chain {
    async fn handle(&self, ctx: Context) -> DispatchResult {
        let handlers = self.handlers.as_ref().clone();
        match &self.registry {
            Some(own) => ctx.insert_with(Arc::clone(own), handlers).await,
            None => ctx.insert(handlers).await,
        }
    }
}

/// Builder for [`Chain`]
///
/// Handlers run in the order they are added.
pub struct ChainBuilder {
    handlers: Vec<ArcHandler>,
    config: ChainConfig,
    registry: Option<Arc<Registry>>,
}

impl ChainBuilder {
    /// Set the base registry the chain's dispatches resolve against
    pub fn registry(mut self, registry: Registry) -> Self {
        self.registry = Some(Arc::new(registry));
        self
    }

    /// Append a handler
    pub fn handler<H: Handler + 'static>(mut self, handler: H) -> Self {
        self.handlers.push(Arc::new(handler));
        self
    }

    /// Append an already-shared handler
    pub fn handler_arc(mut self, handler: ArcHandler) -> Self {
        self.handlers.push(handler);
        self
    }

    /// Append a closure-based handler
    pub fn handler_fn<F, Fut>(self, f: F) -> Self
    where
        F: Fn(Context) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = DispatchResult> + Send + 'static,
    {
        self.handler(handler_fn(f))
    }

    /// Finish building; the chain is immutable from here on
    pub fn build(self) -> Chain {
        Chain {
            handlers: Arc::new(self.handlers),
            config: self.config,
            registry: self.registry,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Committed;
    use crate::http::Response;
    use pretty_assertions::assert_eq;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Mutex;

    /// Handler that records its label then advances
    fn recording_handler(log: Arc<Mutex<Vec<&'static str>>>, label: &'static str) -> impl Handler {
        handler_fn(move |ctx: Context| {
            let log = Arc::clone(&log);
            async move {
                log.lock().unwrap().push(label);
                ctx.next().await
            }
        })
    }

    #[tokio::test]
    async fn test_handlers_run_in_registration_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let chain = Chain::builder(ChainConfig::new())
            .handler(recording_handler(Arc::clone(&log), "a"))
            .handler(recording_handler(Arc::clone(&log), "b"))
            .handler_fn(|ctx| async move { ctx.send(Response::text("end")) })
            .build();

        let outcome = chain.dispatch(Request::get("/")).await.unwrap();
        assert!(!outcome.is_fallthrough());
        assert_eq!(*log.lock().unwrap(), vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_commit_short_circuits_later_handlers() {
        let third_ran = Arc::new(AtomicBool::new(false));
        let chain = Chain::builder(ChainConfig::new())
            .handler_fn(|ctx| async move { ctx.next().await })
            .handler_fn(|ctx| async move { ctx.send(Response::text("second")) })
            .handler({
                let third_ran = Arc::clone(&third_ran);
                handler_fn(move |ctx: Context| {
                    let third_ran = Arc::clone(&third_ran);
                    async move {
                        third_ran.store(true, Ordering::SeqCst);
                        ctx.next().await
                    }
                })
            })
            .build();

        let outcome = chain.dispatch(Request::get("/")).await.unwrap();
        match outcome {
            Outcome::Committed(Committed::Response(response)) => {
                assert_eq!(response.body_text(), Some("second"));
            }
            other => panic!("expected second handler's commit, got {:?}", other),
        }
        assert!(!third_ran.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_nested_chain_runs_as_if_inlined() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let inner = Chain::builder(ChainConfig::new())
            .handler(recording_handler(Arc::clone(&log), "b"))
            .handler(recording_handler(Arc::clone(&log), "c"))
            .build();

        let outer = Chain::builder(ChainConfig::new())
            .handler(recording_handler(Arc::clone(&log), "a"))
            .handler(inner)
            .handler({
                let log = Arc::clone(&log);
                handler_fn(move |ctx: Context| {
                    let log = Arc::clone(&log);
                    async move {
                        log.lock().unwrap().push("d");
                        ctx.send(Response::text("done"))
                    }
                })
            })
            .build();

        let outcome = outer.dispatch(Request::get("/")).await.unwrap();
        assert!(!outcome.is_fallthrough());
        assert_eq!(*log.lock().unwrap(), vec!["a", "b", "c", "d"]);
    }

    #[tokio::test]
    async fn test_nested_chain_short_circuit_stops_the_outer_chain() {
        let after_ran = Arc::new(AtomicBool::new(false));
        let inner = Chain::builder(ChainConfig::new())
            .handler_fn(|ctx| async move { ctx.send(Response::text("inner")) })
            .build();

        let outer = Chain::builder(ChainConfig::new())
            .handler(inner)
            .handler({
                let after_ran = Arc::clone(&after_ran);
                handler_fn(move |ctx: Context| {
                    let after_ran = Arc::clone(&after_ran);
                    async move {
                        after_ran.store(true, Ordering::SeqCst);
                        ctx.next().await
                    }
                })
            })
            .build();

        let outcome = outer.dispatch(Request::get("/")).await.unwrap();
        match outcome {
            Outcome::Committed(Committed::Response(response)) => {
                assert_eq!(response.body_text(), Some("inner"));
            }
            other => panic!("expected inner commit, got {:?}", other),
        }
        assert!(!after_ran.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_base_registry_is_visible_to_handlers() {
        let chain = Chain::builder(ChainConfig::new())
            .registry(Registry::single("from base".to_string()))
            .handler_fn(|ctx| async move {
                let value: String = ctx.get()?;
                ctx.send(Response::text(value))
            })
            .build();

        let outcome = chain.dispatch(Request::get("/")).await.unwrap();
        match outcome {
            Outcome::Committed(Committed::Response(response)) => {
                assert_eq!(response.body_text(), Some("from base"));
            }
            other => panic!("expected commit, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_nested_chain_registry_shadows_the_outer_one() {
        let inner = Chain::builder(ChainConfig::new())
            .registry(Registry::single("inner".to_string()))
            .handler_fn(|ctx| async move {
                let value: String = ctx.get()?;
                ctx.send(Response::text(value))
            })
            .build();

        let outer = Chain::builder(ChainConfig::new())
            .registry(Registry::single("outer".to_string()))
            .handler(inner)
            .build();

        let outcome = outer.dispatch(Request::get("/")).await.unwrap();
        match outcome {
            Outcome::Committed(Committed::Response(response)) => {
                assert_eq!(response.body_text(), Some("inner"));
            }
            other => panic!("expected commit, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_same_chain_dispatches_identically_every_time() {
        let chain = Chain::builder(ChainConfig::new())
            .registry(Registry::single(7u32))
            .handler_fn(|ctx| async move {
                let n: u32 = ctx.get()?;
                ctx.send(Response::text(n.to_string()))
            })
            .build();

        for _ in 0..2 {
            let outcome = chain.dispatch(Request::get("/")).await.unwrap();
            match outcome {
                Outcome::Committed(Committed::Response(response)) => {
                    assert_eq!(response.body_text(), Some("7"));
                }
                other => panic!("expected commit, got {:?}", other),
            }
        }
    }

    #[tokio::test]
    async fn test_concurrent_dispatches_are_independent() {
        let chain = Chain::builder(ChainConfig::new())
            .registry(Registry::single("shared".to_string()))
            .handler_fn(|ctx| async move {
                let label: String = ctx.get()?;
                ctx.send(Response::text(format!("{} {}", label, ctx.request().path())))
            })
            .build();

        let (a, b) = tokio::join!(
            chain.dispatch(Request::get("/a")),
            chain.dispatch(Request::get("/b")),
        );

        match (a.unwrap(), b.unwrap()) {
            (
                Outcome::Committed(Committed::Response(first)),
                Outcome::Committed(Committed::Response(second)),
            ) => {
                assert_eq!(first.body_text(), Some("shared /a"));
                assert_eq!(second.body_text(), Some("shared /b"));
            }
            other => panic!("expected two commits, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_empty_chain_falls_through() {
        let chain = Chain::builder(ChainConfig::new()).build();
        assert!(chain.is_empty());
        assert_eq!(chain.len(), 0);
        let outcome = chain.dispatch(Request::get("/")).await.unwrap();
        assert!(outcome.is_fallthrough());
    }
}
