use http::header::{HeaderMap, HeaderName, HeaderValue};
use http::Method;

/// The inbound unit of work a dispatch runs against
///
/// Carries the request line and headers only. Body plumbing belongs to the
/// transport layer in front of the dispatch kernel; handlers that need a
/// body receive it as a contextual service instead.
#[derive(Debug, Clone)]
pub struct Request {
    method: Method,
    path: String,
    headers: HeaderMap,
}

impl Request {
    /// Create a request with the given method and path
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            headers: HeaderMap::new(),
        }
    }

    /// Create a GET request for the given path
    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    /// Start building a request
    pub fn builder() -> RequestBuilder {
        RequestBuilder {
            method: Method::GET,
            path: "/".to_string(),
            headers: HeaderMap::new(),
        }
    }

    /// Get the request method
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Get the request path
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Get a header value by name
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Get all request headers
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }
}

/// Builder for [`Request`]
pub struct RequestBuilder {
    method: Method,
    path: String,
    headers: HeaderMap,
}

impl RequestBuilder {
    /// Set the request method
    pub fn method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    /// Set the request path
    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    /// Append a header; invalid header names or values are ignored
    pub fn header(mut self, name: &str, value: &str) -> Self {
        if let (Ok(name), Ok(value)) = (
            HeaderName::try_from(name),
            HeaderValue::try_from(value),
        ) {
            self.headers.append(name, value);
        }
        self
    }

    /// Build the request
    pub fn build(self) -> Request {
        Request {
            method: self.method,
            path: self.path,
            headers: self.headers,
        }
    }
}
