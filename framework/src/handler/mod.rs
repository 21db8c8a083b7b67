//! Handler contract and adapters
//!
//! A [`Handler`] is the single unit of work in a dispatch chain. There are
//! two ways to supply one, usable interchangeably wherever a handler is
//! expected:
//! - implement [`Handler`] directly (or wrap a closure with
//!   [`handler_fn`])
//! - implement [`inject::ServiceHandler`] and wrap the type in
//!   [`inject::Injecting`] to have extra parameters resolved from the
//!   registry automatically
//!
//! Handlers are stateless with respect to dispatches: all effects go
//! through the [`Context`] a handler is given, and the context is moved
//! into the call, so a handler cannot retain it afterwards.

pub mod inject;

use crate::context::Context;
use crate::error::{DispatchError, DispatchResult};
use async_trait::async_trait;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// A single unit in the dispatch chain
///
/// Given a context, a handler must either advance the chain, commit a
/// result, or return an error; doing none of these ends the dispatch as a
/// fallthrough.
///
/// # Example
///
/// ```rust,ignore
/// struct HealthCheck;
///
/// #[async_trait]
/// impl Handler for HealthCheck {
///     async fn handle(&self, ctx: Context) -> DispatchResult {
///         if ctx.request().path() == "/health" {
///             ctx.send(Response::text("ok"))
///         } else {
///             ctx.next().await
///         }
///     }
/// }
/// ```
#[async_trait]
pub trait Handler: Send + Sync {
    /// Process one dispatch step
    async fn handle(&self, ctx: Context) -> DispatchResult;
}

/// Shared handler reference used throughout chain composition
pub type ArcHandler = Arc<dyn Handler>;

/// Boxed future returned by closure-based handlers and recoveries
pub type HandlerFuture = Pin<Box<dyn Future<Output = DispatchResult> + Send>>;

/// Wrap a concrete handler for use in a chain
pub fn into_handler<H: Handler + 'static>(handler: H) -> ArcHandler {
    Arc::new(handler)
}

/// A handler backed by an async closure
///
/// Created with [`handler_fn`].
pub struct FnHandler {
    f: Box<dyn Fn(Context) -> HandlerFuture + Send + Sync>,
}

/// Build a handler from an async closure
///
/// # Example
///
/// ```rust,ignore
/// let hello = handler_fn(|ctx: Context| async move {
///     ctx.send(Response::text("hello"))
/// });
/// ```
pub fn handler_fn<F, Fut>(f: F) -> FnHandler
where
    F: Fn(Context) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = DispatchResult> + Send + 'static,
{
    FnHandler {
        f: Box::new(move |ctx| Box::pin(f(ctx))),
    }
}

#[async_trait]
impl Handler for FnHandler {
    async fn handle(&self, ctx: Context) -> DispatchResult {
        (self.f)(ctx).await
    }
}

/// A handler that deliberately recovers from downstream failures
///
/// Wraps an inner handler; when the inner handler (or anything it advanced
/// into) fails, the recovery closure runs with the same frame's context
/// and may convert the failure into a normal commit. Failures raised after
/// the response was already committed are not recoverable and propagate
/// unchanged. The dispatch core itself never recovers - this combinator is
/// the deliberate opt-in.
///
/// # Example
///
/// ```rust,ignore
/// let guarded = ErrorBoundary::new(api_chain, |ctx, err| async move {
///     tracing::warn!(%err, "request failed");
///     ctx.send(Response::text("internal error").status(500))
/// });
/// ```
pub struct ErrorBoundary<H> {
    inner: H,
    recover: Box<dyn Fn(Context, DispatchError) -> HandlerFuture + Send + Sync>,
}

impl<H: Handler> ErrorBoundary<H> {
    /// Wrap a handler with a recovery closure
    pub fn new<F, Fut>(inner: H, recover: F) -> Self
    where
        F: Fn(Context, DispatchError) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = DispatchResult> + Send + 'static,
    {
        Self {
            inner,
            recover: Box::new(move |ctx, err| Box::pin(recover(ctx, err))),
        }
    }
}

#[async_trait]
impl<H: Handler> Handler for ErrorBoundary<H> {
    async fn handle(&self, ctx: Context) -> DispatchResult {
        match self.inner.handle(ctx.clone()).await {
            Ok(()) => Ok(()),
            Err(err) if ctx.dispatch_state().is_committed() => Err(err),
            Err(err) => (self.recover)(ctx, err).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ChainConfig;
    use crate::context::{dispatch, Committed, Outcome};
    use crate::http::{Request, Response};
    use crate::registry::Registry;
    use pretty_assertions::assert_eq;

    async fn run<H: Handler>(handler: &H) -> Result<Outcome, DispatchError> {
        dispatch(
            handler,
            Request::get("/"),
            Registry::empty(),
            ChainConfig::new(),
        )
        .await
    }

    #[tokio::test]
    async fn test_handler_fn_commits() {
        let handler = handler_fn(|ctx: Context| async move { ctx.send(Response::text("hi")) });
        let outcome = run(&handler).await.unwrap();
        match outcome {
            Outcome::Committed(Committed::Response(response)) => {
                assert_eq!(response.body_text(), Some("hi"));
            }
            other => panic!("expected commit, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_error_boundary_recovers() {
        let failing =
            handler_fn(|_ctx: Context| async move { Err(DispatchError::message("boom")) });
        let guarded = ErrorBoundary::new(failing, |ctx, err| async move {
            assert!(err.to_string().contains("boom"));
            ctx.send(Response::text("recovered").status(500))
        });

        let outcome = run(&guarded).await.unwrap();
        match outcome {
            Outcome::Committed(Committed::Response(response)) => {
                assert_eq!(response.status_code().as_u16(), 500);
                assert_eq!(response.body_text(), Some("recovered"));
            }
            other => panic!("expected recovery commit, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_error_boundary_does_not_recover_after_commit() {
        let failing = handler_fn(|ctx: Context| async move {
            ctx.send(Response::text("sent"))?;
            Err(DispatchError::message("late"))
        });
        let guarded = ErrorBoundary::new(failing, |ctx, _err| async move {
            ctx.send(Response::text("should never run"))
        });

        let err = run(&guarded).await.unwrap_err();
        assert!(err.to_string().contains("late"));
    }

    #[tokio::test]
    async fn test_error_boundary_passes_success_through() {
        let ok = handler_fn(|ctx: Context| async move { ctx.send(Response::text("fine")) });
        let guarded =
            ErrorBoundary::new(ok, |ctx, _err| async move { ctx.send(Response::text("no")) });

        let outcome = run(&guarded).await.unwrap();
        match outcome {
            Outcome::Committed(Committed::Response(response)) => {
                assert_eq!(response.body_text(), Some("fine"));
            }
            other => panic!("expected pass-through commit, got {:?}", other),
        }
    }
}
