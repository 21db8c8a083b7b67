//! Per-dispatch execution context
//!
//! A [`Context`] is the handle threaded through a handler chain for one
//! dispatch. Each handler invocation gets its own context frame; frames
//! share the dispatch-wide state (the committed response slot) but track
//! their own advance flag, so "next already called" is detected per
//! handler invocation.
//!
//! All handler effects flow through the context:
//! - [`Context::next`] advances to the next handler in the chain
//! - [`Context::next_with`] advances with extra registry bindings scoped
//!   to the remainder of the chain
//! - [`Context::send`] commits a response (the single terminal act)
//! - [`Context::send_file`] designates a file as the sent artifact
//! - [`Context::render`] records an object for rendering
//! - returning `Err` from the handler terminates the dispatch with a
//!   failure that propagates out of the enclosing `next()` call
//!
//! Exactly one terminal outcome is observed per dispatch: a committed
//! response, a propagated error, or a fallthrough when the chain is
//! exhausted without either.

use crate::config::ChainConfig;
use crate::error::{DispatchError, DispatchResult, HandlerUsageError};
use crate::handler::{ArcHandler, Handler};
use crate::http::{Request, Response};
use crate::registry::Registry;
use std::any::Any;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

/// The remaining handlers of the chain, shared between frames
#[derive(Clone)]
pub(crate) struct Tail {
    handlers: Arc<Vec<ArcHandler>>,
    index: usize,
}

impl Tail {
    pub(crate) fn new(handlers: Vec<ArcHandler>) -> Self {
        Self {
            handlers: Arc::new(handlers),
            index: 0,
        }
    }

    pub(crate) fn empty() -> Self {
        Self::new(Vec::new())
    }

    fn split_first(&self) -> Option<(ArcHandler, Tail)> {
        self.handlers.get(self.index).map(|handler| {
            (
                Arc::clone(handler),
                Tail {
                    handlers: Arc::clone(&self.handlers),
                    index: self.index + 1,
                },
            )
        })
    }

    /// A new tail with `extra` inlined in front of the remaining handlers
    fn prepend(&self, extra: Vec<ArcHandler>) -> Tail {
        let remaining = &self.handlers[self.index..];
        if remaining.is_empty() {
            return Tail::new(extra);
        }
        let mut combined = extra;
        combined.extend(remaining.iter().cloned());
        Tail::new(combined)
    }
}

/// Per-frame control-flow state
struct FrameState {
    next_called: AtomicBool,
}

/// A value recorded by [`Context::render`], retrievable by expected type
pub struct Rendered {
    value: Box<dyn Any + Send + Sync>,
    type_name: &'static str,
}

impl Rendered {
    fn new<T: Any + Send + Sync>(value: T) -> Self {
        Self {
            value: Box::new(value),
            type_name: std::any::type_name::<T>(),
        }
    }

    /// View the rendered object as a concrete type
    ///
    /// Returns `None` when the type does not match what was rendered.
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.value.downcast_ref::<T>()
    }

    /// Name of the rendered object's type, for diagnostics
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }
}

impl std::fmt::Debug for Rendered {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Rendered").field(&self.type_name).finish()
    }
}

/// The artifact committed by the one terminal act of a dispatch
#[derive(Debug)]
pub enum Committed {
    /// A response committed through [`Context::send`]
    Response(Response),
    /// A file designated through [`Context::send_file`]
    File(PathBuf),
    /// An object recorded through [`Context::render`]
    Rendered(Rendered),
}

/// Terminal outcome of a dispatch that did not fail
#[derive(Debug)]
pub enum Outcome {
    /// A handler committed an artifact
    Committed(Committed),
    /// The chain was exhausted without a commit
    Fallthrough,
}

impl Outcome {
    /// Whether this outcome is a fallthrough
    pub fn is_fallthrough(&self) -> bool {
        matches!(self, Self::Fallthrough)
    }
}

/// Dispatch-wide state shared by every frame of one dispatch
pub(crate) struct DispatchState {
    config: ChainConfig,
    committed: Mutex<Option<Committed>>,
}

impl DispatchState {
    pub(crate) fn new(config: ChainConfig) -> Self {
        Self {
            config,
            committed: Mutex::new(None),
        }
    }

    /// The single commit point; a second terminal act is a usage error
    fn commit(&self, committed: Committed) -> DispatchResult {
        let mut slot = self
            .committed
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if slot.is_some() {
            return Err(HandlerUsageError::ResponseAlreadyCommitted.into());
        }
        tracing::debug!(artifact = ?committed, "dispatch committed");
        *slot = Some(committed);
        Ok(())
    }

    pub(crate) fn is_committed(&self) -> bool {
        self.committed
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    pub(crate) fn take_committed(&self) -> Option<Committed> {
        self.committed
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }

    fn take_outcome(&self) -> Outcome {
        match self.take_committed() {
            Some(committed) => Outcome::Committed(committed),
            None => Outcome::Fallthrough,
        }
    }
}

/// The per-invocation execution handle threaded through the chain
///
/// Cloning a context shares the same frame: a handler may hand clones to
/// helper futures, but the frame still advances at most once and the
/// dispatch still commits at most once.
#[derive(Clone)]
pub struct Context {
    request: Arc<Request>,
    registry: Arc<Registry>,
    tail: Tail,
    frame: Arc<FrameState>,
    dispatch: Arc<DispatchState>,
}

impl Context {
    /// Create the context frame for one handler invocation
    pub(crate) fn frame(
        request: Arc<Request>,
        registry: Arc<Registry>,
        tail: Tail,
        dispatch: Arc<DispatchState>,
    ) -> Self {
        Self {
            request,
            registry,
            tail,
            frame: Arc::new(FrameState {
                next_called: AtomicBool::new(false),
            }),
            dispatch,
        }
    }

    /// The inbound request this dispatch is serving
    pub fn request(&self) -> &Request {
        &self.request
    }

    /// The registry visible to this frame
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// The configuration snapshot the chain was built with
    pub fn config(&self) -> &ChainConfig {
        &self.dispatch.config
    }

    /// Resolve a concrete contextual service by type
    pub fn get<T: Any + Send + Sync + Clone>(&self) -> Result<T, crate::error::NotInRegistry> {
        self.registry.get::<T>()
    }

    /// Resolve a trait-object contextual service by type
    pub fn make<T: ?Sized + Send + Sync + 'static>(
        &self,
    ) -> Result<Arc<T>, crate::error::NotInRegistry> {
        self.registry.make::<T>()
    }

    /// Advance to the next handler in the chain with the same registry
    ///
    /// Any failure raised downstream propagates out of this call to the
    /// current frame, unswallowed. When the chain is exhausted the
    /// dispatch falls through; the top-level caller reports that distinct
    /// from a commit.
    pub async fn next(&self) -> DispatchResult {
        self.proceed_into(Arc::clone(&self.registry), self.tail.clone())
            .await
    }

    /// Advance with extra bindings scoped to the remainder of the chain
    ///
    /// The given bindings shadow the current registry for every handler
    /// downstream of this frame; the current frame's own registry is
    /// untouched. This is the insert-then-proceed form of chain-scoped
    /// dependency injection.
    pub async fn next_with(&self, bindings: Registry) -> DispatchResult {
        let joined = Arc::new(bindings.join(Arc::clone(&self.registry)));
        self.proceed_into(joined, self.tail.clone()).await
    }

    /// Walk into `handlers` as if they were inlined at this position
    ///
    /// Used by composite handlers: the inserted handlers run first, and if
    /// they exhaust without committing, dispatch continues with the
    /// remainder of the enclosing chain.
    pub async fn insert(&self, handlers: Vec<ArcHandler>) -> DispatchResult {
        self.proceed_into(Arc::clone(&self.registry), self.tail.prepend(handlers))
            .await
    }

    /// [`Context::insert`] with bindings shadowing the current registry
    /// for the inserted handlers and everything after them
    pub async fn insert_with(
        &self,
        bindings: Arc<Registry>,
        handlers: Vec<ArcHandler>,
    ) -> DispatchResult {
        let joined = Arc::new(bindings.join(Arc::clone(&self.registry)));
        self.proceed_into(joined, self.tail.prepend(handlers)).await
    }

    async fn proceed_into(&self, registry: Arc<Registry>, tail: Tail) -> DispatchResult {
        if self.frame.next_called.swap(true, Ordering::SeqCst) {
            return Err(HandlerUsageError::NextAlreadyCalled.into());
        }
        match tail.split_first() {
            Some((handler, rest)) => {
                let frame = Context::frame(
                    Arc::clone(&self.request),
                    registry,
                    rest,
                    Arc::clone(&self.dispatch),
                );
                handler.handle(frame).await
            }
            None => {
                tracing::debug!(path = %self.request.path(), "handler chain exhausted, falling through");
                Ok(())
            }
        }
    }

    /// Commit a response; the single terminal act of the dispatch
    ///
    /// Fails with `HandlerUsageError::ResponseAlreadyCommitted` if any
    /// terminal act already ran.
    pub fn send(&self, response: Response) -> DispatchResult {
        self.dispatch.commit(Committed::Response(response))
    }

    /// Designate a file as the sent artifact
    ///
    /// Counts as the one commit of the dispatch, but is observed
    /// separately from a sent response in the capture contract.
    pub fn send_file(&self, path: impl Into<PathBuf>) -> DispatchResult {
        self.dispatch.commit(Committed::File(path.into()))
    }

    /// Record an object for rendering; terminal like [`Context::send`]
    ///
    /// Rendering engines live outside the dispatch kernel; the recorded
    /// object is what they would receive.
    pub fn render<T: Any + Send + Sync>(&self, value: T) -> DispatchResult {
        self.dispatch.commit(Committed::Rendered(Rendered::new(value)))
    }

    pub(crate) fn next_was_called(&self) -> bool {
        self.frame.next_called.load(Ordering::SeqCst)
    }

    pub(crate) fn dispatch_state(&self) -> &Arc<DispatchState> {
        &self.dispatch
    }
}

/// Run one handler as a complete dispatch
///
/// Builds the root context bound to `registry` and `config`, invokes the
/// handler, and reports exactly one terminal outcome: the committed
/// artifact, a fallthrough, or the propagated error.
pub async fn dispatch(
    handler: &dyn Handler,
    request: Request,
    registry: Registry,
    config: ChainConfig,
) -> Result<Outcome, DispatchError> {
    tracing::debug!(method = %request.method(), path = %request.path(), "dispatching");
    let state = Arc::new(DispatchState::new(config));
    let ctx = Context::frame(
        Arc::new(request),
        Arc::new(registry),
        Tail::empty(),
        Arc::clone(&state),
    );
    handler.handle(ctx).await?;
    Ok(state.take_outcome())
}
