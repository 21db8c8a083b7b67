//! Testing utilities for handler code
//!
//! Provides a deterministic way to observe the outcome of running one
//! handler without a transport in front of it:
//! - [`HandlerFixture`] fabricates the context a handler runs against
//!   (request line, headers, pre-seeded registry entries, configuration)
//! - [`HandlerCapture`] records the complete observable outcome: failure,
//!   status, headers, body, sent file, rendered object, and whether the
//!   handler advanced or committed
//!
//! The fixture drives the same dispatch contract production code uses; it
//! observes without altering handler semantics.
//!
//! # Example
//!
//! ```rust,ignore
//! let capture = HandlerFixture::new()
//!     .path("/users/7")
//!     .header("Accept", "application/json")
//!     .register(AppName("cascade".into()))
//!     .invoke(&ShowUser)
//!     .await;
//!
//! assert!(capture.sent_response());
//! assert_eq!(capture.status_code(), 200);
//! assert_eq!(capture.body_text().as_deref(), Some("ada"));
//! ```

mod capture;

pub use capture::HandlerCapture;

use crate::config::ChainConfig;
use crate::context::{Context, DispatchState, Tail};
use crate::handler::Handler;
use crate::http::{Request, RequestBuilder};
use crate::registry::{Registry, RegistryBuilder};
use http::Method;
use std::any::Any;
use std::sync::Arc;

/// Recipe for the synthetic context a handler under test runs against
pub struct HandlerFixture {
    request: RequestBuilder,
    registry: RegistryBuilder,
    config: ChainConfig,
}

impl HandlerFixture {
    /// A fixture for `GET /` with an empty registry
    pub fn new() -> Self {
        Self {
            request: Request::builder(),
            registry: Registry::builder(),
            config: ChainConfig::new(),
        }
    }

    /// Set the request method
    pub fn method(mut self, method: Method) -> Self {
        self.request = self.request.method(method);
        self
    }

    /// Set the request path
    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.request = self.request.path(path);
        self
    }

    /// Append a request header
    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.request = self.request.header(name, value);
        self
    }

    /// Pre-seed a concrete registry entry
    pub fn register<T: Any + Send + Sync>(mut self, value: T) -> Self {
        self.registry = self.registry.add(value);
        self
    }

    /// Pre-seed a trait-object registry binding
    pub fn bind<T: ?Sized + Send + Sync + 'static>(mut self, instance: Arc<T>) -> Self {
        self.registry = self.registry.bind(instance);
        self
    }

    /// Set the configuration snapshot the run observes
    pub fn config(mut self, config: ChainConfig) -> Self {
        self.config = config;
        self
    }

    /// Drive the handler against the fabricated context and record the
    /// outcome
    ///
    /// Nothing is re-thrown: a failing run yields a capture whose
    /// [`HandlerCapture::error`] is populated.
    pub async fn invoke<H: Handler>(self, handler: &H) -> HandlerCapture {
        let state = Arc::new(DispatchState::new(self.config));
        let ctx = Context::frame(
            Arc::new(self.request.build()),
            Arc::new(self.registry.build()),
            Tail::empty(),
            Arc::clone(&state),
        );

        let result = handler.handle(ctx.clone()).await;

        HandlerCapture::record(result.err(), ctx.next_was_called(), state.take_committed())
    }
}

impl Default for HandlerFixture {
    fn default() -> Self {
        Self::new()
    }
}
