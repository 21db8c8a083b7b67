//! Service-injecting handler adapter
//!
//! Lets a handler be written as a method with extra, strongly-typed
//! parameters instead of querying the registry by hand. The following two
//! handlers are functionally equivalent:
//!
//! ```rust,ignore
//! struct Verbose;
//!
//! #[async_trait]
//! impl Handler for Verbose {
//!     async fn handle(&self, ctx: Context) -> DispatchResult {
//!         let repo: Arc<dyn UserRepo> = ctx.make()?;
//!         let name: AppName = ctx.get()?;
//!         ctx.send(Response::text(format!("{} / {}", name.0, repo.count())))
//!     }
//! }
//!
//! struct Succinct;
//!
//! #[async_trait]
//! impl ServiceHandler<(Arc<dyn UserRepo>, AppName)> for Succinct {
//!     async fn handle(
//!         &self,
//!         ctx: Context,
//!         (repo, name): (Arc<dyn UserRepo>, AppName),
//!     ) -> DispatchResult {
//!         ctx.send(Response::text(format!("{} / {}", name.0, repo.count())))
//!     }
//! }
//!
//! let handler = Injecting::new(Succinct);
//! ```
//!
//! Service parameters resolve left to right at invocation time; the first
//! lookup miss fails the dispatch with [`NotInRegistry`] before the
//! author's method body runs. A type with no `ServiceHandler`
//! implementation, or with an ambiguous one, does not get past
//! [`Injecting::new`] at compile time, so a malformed handler can never
//! reach a dispatch.

use crate::context::Context;
use crate::error::{DispatchResult, NotInRegistry};
use crate::handler::Handler;
use crate::registry::Registry;
use async_trait::async_trait;
use std::any::Any;
use std::marker::PhantomData;

/// A type resolvable from a [`Registry`]
///
/// Implemented for every cloneable registered type, which includes
/// `Arc<dyn Trait>` bindings made with `RegistryBuilder::bind`.
pub trait FromRegistry: Sized {
    /// Resolve this type from the registry
    fn from_registry(registry: &Registry) -> Result<Self, NotInRegistry>;
}

impl<T: Any + Send + Sync + Clone> FromRegistry for T {
    fn from_registry(registry: &Registry) -> Result<Self, NotInRegistry> {
        registry.get::<T>()
    }
}

/// An ordered group of service types resolved together
///
/// Resolution is left to right and fail-fast: the first missing binding
/// wins and nothing else is resolved. There is deliberately no
/// implementation for the empty tuple - a service-injecting handler must
/// declare at least one service parameter.
pub trait ServiceTuple: Sized + Send {
    /// Resolve every element from the registry, in declaration order
    fn resolve(registry: &Registry) -> Result<Self, NotInRegistry>;
}

macro_rules! impl_service_tuple {
    ($($ty:ident),+) => {
        impl<$($ty: FromRegistry + Send),+> ServiceTuple for ($($ty,)+) {
            fn resolve(registry: &Registry) -> Result<Self, NotInRegistry> {
                Ok(($($ty::from_registry(registry)?,)+))
            }
        }
    };
}

impl_service_tuple!(T1);
impl_service_tuple!(T1, T2);
impl_service_tuple!(T1, T2, T3);
impl_service_tuple!(T1, T2, T3, T4);
impl_service_tuple!(T1, T2, T3, T4, T5);
impl_service_tuple!(T1, T2, T3, T4, T5, T6);

/// The authoring surface for service-injecting handlers
///
/// The first parameter is the context, the second is the tuple of
/// services to resolve from it.
#[async_trait]
pub trait ServiceHandler<S: ServiceTuple>: Send + Sync {
    /// Handle the dispatch step with the resolved services
    async fn handle(&self, ctx: Context, services: S) -> DispatchResult;
}

/// Adapter that turns a [`ServiceHandler`] into a plain [`Handler`]
///
/// On each invocation it resolves the declared service tuple from the
/// context's registry and forwards the call. Failures raised by the
/// author's method propagate to the caller unmodified.
pub struct Injecting<H, S> {
    handler: H,
    services: PhantomData<fn() -> S>,
}

impl<H, S> Injecting<H, S>
where
    H: ServiceHandler<S>,
    S: ServiceTuple,
{
    /// Wrap a service-declaring handler
    ///
    /// Only compiles when the handler type has exactly one inferable
    /// service signature.
    pub fn new(handler: H) -> Self {
        Self {
            handler,
            services: PhantomData,
        }
    }
}

/// Shorthand for [`Injecting::new`]
pub fn inject<H, S>(handler: H) -> Injecting<H, S>
where
    H: ServiceHandler<S>,
    S: ServiceTuple,
{
    Injecting::new(handler)
}

#[async_trait]
impl<H, S> Handler for Injecting<H, S>
where
    H: ServiceHandler<S>,
    S: ServiceTuple + 'static,
{
    async fn handle(&self, ctx: Context) -> DispatchResult {
        let services = S::resolve(ctx.registry())?;
        self.handler.handle(ctx, services).await
    }
}
