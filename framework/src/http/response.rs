use bytes::Bytes;
use http::StatusCode;

/// HTTP response value committed by a handler
///
/// Built fluently and handed to [`crate::Context::send`] as the single
/// terminal act of a dispatch.
///
/// # Example
///
/// ```rust,ignore
/// ctx.send(Response::text("created").status(201).header("Location", "/users/7"))
/// ```
#[derive(Debug, Clone)]
pub struct Response {
    status: StatusCode,
    headers: Vec<(String, String)>,
    body: Bytes,
}

impl Response {
    pub fn new() -> Self {
        Self {
            status: StatusCode::OK,
            headers: Vec::new(),
            body: Bytes::new(),
        }
    }

    /// Create a response with a plain-text body
    pub fn text(body: impl Into<String>) -> Self {
        Self {
            status: StatusCode::OK,
            headers: vec![("Content-Type".to_string(), "text/plain".to_string())],
            body: Bytes::from(body.into()),
        }
    }

    /// Create a JSON response from a serde_json::Value
    pub fn json(body: serde_json::Value) -> Self {
        Self {
            status: StatusCode::OK,
            headers: vec![("Content-Type".to_string(), "application/json".to_string())],
            body: Bytes::from(body.to_string()),
        }
    }

    /// Create a response with a raw byte body
    pub fn bytes(body: impl Into<Bytes>) -> Self {
        Self {
            status: StatusCode::OK,
            headers: vec![(
                "Content-Type".to_string(),
                "application/octet-stream".to_string(),
            )],
            body: body.into(),
        }
    }

    /// Set the HTTP status code
    ///
    /// Out-of-range codes fall back to 500.
    pub fn status(mut self, status: u16) -> Self {
        self.status = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        self
    }

    /// Add a header to the response
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// The response status
    pub fn status_code(&self) -> StatusCode {
        self.status
    }

    /// The canonical reason phrase for the status, if one exists
    pub fn reason(&self) -> Option<&'static str> {
        self.status.canonical_reason()
    }

    /// All response headers in the order they were added
    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    /// Get a header value by name (case-insensitive, first match)
    pub fn header_value(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// The raw response body
    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// The response body as text, if it is valid UTF-8
    pub fn body_text(&self) -> Option<&str> {
        std::str::from_utf8(&self.body).ok()
    }
}

impl Default for Response {
    fn default() -> Self {
        Self::new()
    }
}
