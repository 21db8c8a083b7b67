pub mod chain;
pub mod config;
pub mod context;
pub mod error;
pub mod handler;
pub mod http;
pub mod registry;
pub mod testing;

pub use chain::{Chain, ChainBuilder};
pub use config::{ChainConfig, Environment};
pub use context::{dispatch, Committed, Context, Outcome, Rendered};
pub use error::{
    DispatchError, DispatchResult, HandlerUsageError, NoSuitableHandleMethod, NotInRegistry,
};
pub use handler::inject::{inject, FromRegistry, Injecting, ServiceHandler, ServiceTuple};
pub use handler::{handler_fn, into_handler, ArcHandler, ErrorBoundary, FnHandler, Handler};
pub use http::{Request, RequestBuilder, Response};
pub use registry::{Registry, RegistryBuilder};
