//! Framework-wide error types
//!
//! Provides the error taxonomy surfaced at the dispatch boundary:
//! - `NotInRegistry` - a required service type has no reachable binding
//! - `HandlerUsageError` - a handler misused its context (double advance,
//!   double commit)
//! - `NoSuitableHandleMethod` - a service-using handler without a valid
//!   handle signature
//! - `DispatchError` - the umbrella type propagated out of a dispatch
//!
//! The dispatch core never swallows an error: usage errors and wiring
//! defects surface immediately, and application errors raised by handler
//! logic propagate unmodified with their source preserved so an error
//! boundary can still inspect the original kind.

use thiserror::Error;

/// A required service type has no binding reachable from the registry
///
/// This represents an application wiring defect: the chain was dispatched
/// against a registry that never received a binding for the requested type.
/// It is propagated to the caller, never retried.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("no binding for type '{type_name}' reachable from the registry")]
pub struct NotInRegistry {
    /// The declared type that was requested
    pub type_name: &'static str,
}

impl NotInRegistry {
    /// Create a NotInRegistry error for a given type
    pub fn of<T: ?Sized>() -> Self {
        Self {
            type_name: std::any::type_name::<T>(),
        }
    }
}

/// A handler misused its context during a dispatch
///
/// These are programmer errors in handler code. They are surfaced
/// immediately and never silently ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum HandlerUsageError {
    /// The handler advanced the chain more than once in a single invocation
    #[error("handler usage error: next already called")]
    NextAlreadyCalled,

    /// A terminal operation ran after the response was already committed
    #[error("handler usage error: response already committed")]
    ResponseAlreadyCommitted,
}

/// A service-using handler type does not declare a usable handle signature
///
/// With the trait-based adapter in [`crate::handler::inject`] this class of
/// defect is rejected by the compiler before the program runs; the type is
/// kept so the boundary taxonomy stays complete for code that constructs
/// handlers through its own indirection.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("no suitable handle method found for '{type_name}'")]
pub struct NoSuitableHandleMethod {
    /// The handler type missing a valid signature
    pub type_name: &'static str,
}

impl NoSuitableHandleMethod {
    /// Create a NoSuitableHandleMethod error for a given handler type
    pub fn of<T: ?Sized>() -> Self {
        Self {
            type_name: std::any::type_name::<T>(),
        }
    }
}

/// Result type returned by handlers and dispatch operations
pub type DispatchResult = Result<(), DispatchError>;

/// Umbrella error type propagated out of a dispatch
///
/// Handlers return `Err(DispatchError)` to terminate processing with a
/// failure; the error travels out of the enclosing `next()` call frame by
/// frame until a handler deliberately recovers or it reaches the top of
/// the chain.
///
/// # Example
///
/// ```rust,ignore
/// async fn handle(&self, ctx: Context) -> DispatchResult {
///     let repo: Arc<dyn UserRepo> = ctx.make()?; // NotInRegistry propagates
///     let user = repo.find(42).map_err(DispatchError::app)?;
///     ctx.send(Response::json(serde_json::json!({ "name": user.name })))
/// }
/// ```
#[derive(Debug, Error)]
pub enum DispatchError {
    /// A service lookup failed
    #[error(transparent)]
    NotInRegistry(#[from] NotInRegistry),

    /// A handler misused its context
    #[error(transparent)]
    Usage(#[from] HandlerUsageError),

    /// A service-using handler without a valid handle signature
    #[error(transparent)]
    NoSuitableHandleMethod(#[from] NoSuitableHandleMethod),

    /// A failure raised by application handler logic
    ///
    /// The original error is carried as the source, unwrapped of any
    /// adapter indirection, so its kind stays visible to error boundaries.
    #[error("handler error: {0}")]
    Application(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl DispatchError {
    /// Wrap an application error raised by handler logic
    pub fn app<E: std::error::Error + Send + Sync + 'static>(err: E) -> Self {
        Self::Application(Box::new(err))
    }

    /// Create an ad-hoc application error from a message
    ///
    /// Use this for one-off failures when a dedicated error type is not
    /// worth defining.
    pub fn message(message: impl Into<String>) -> Self {
        Self::Application(message.into().into())
    }

    /// Whether this is an application error (as opposed to a wiring or
    /// usage defect in the dispatch machinery)
    pub fn is_application(&self) -> bool {
        matches!(self, Self::Application(_))
    }

    /// Attempt to view the underlying application error as a concrete type
    ///
    /// Returns `None` for non-application errors or when the source is of
    /// a different type. Error boundaries use this to branch on the
    /// original error kind.
    pub fn downcast_ref<E: std::error::Error + 'static>(&self) -> Option<&E> {
        match self {
            Self::Application(source) => source.downcast_ref::<E>(),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[derive(Debug, Error, PartialEq)]
    #[error("user {0} not found")]
    struct UserNotFound(u32);

    #[test]
    fn test_not_in_registry_carries_type_name() {
        let err = NotInRegistry::of::<String>();
        assert_eq!(err.type_name, "alloc::string::String");
        assert!(err.to_string().contains("alloc::string::String"));
    }

    #[test]
    fn test_usage_error_messages() {
        assert_eq!(
            HandlerUsageError::NextAlreadyCalled.to_string(),
            "handler usage error: next already called"
        );
        assert_eq!(
            HandlerUsageError::ResponseAlreadyCommitted.to_string(),
            "handler usage error: response already committed"
        );
    }

    #[test]
    fn test_application_error_downcast_preserves_kind() {
        let err = DispatchError::app(UserNotFound(7));
        assert!(err.is_application());
        assert_eq!(err.downcast_ref::<UserNotFound>(), Some(&UserNotFound(7)));
        assert!(err.downcast_ref::<std::io::Error>().is_none());
    }

    #[test]
    fn test_non_application_errors_do_not_downcast() {
        let err = DispatchError::from(NotInRegistry::of::<u32>());
        assert!(!err.is_application());
        assert!(err.downcast_ref::<UserNotFound>().is_none());
    }

    #[test]
    fn test_message_error_displays_text() {
        let err = DispatchError::message("something broke");
        assert_eq!(err.to_string(), "handler error: something broke");
    }
}
