//! Recorded outcome of invoking a single handler

use crate::context::{Committed, Rendered};
use crate::error::DispatchError;
use bytes::Bytes;
use http::StatusCode;
use std::any::Any;
use std::path::{Path, PathBuf};

/// Immutable snapshot of everything observable from one handler run
///
/// Produced by [`crate::testing::HandlerFixture::invoke`]. Failures thrown
/// during the run are recorded here instead of being re-thrown, so a test
/// can assert on the failure and on the control-flow flags of the same
/// run.
#[derive(Debug)]
pub struct HandlerCapture {
    error: Option<DispatchError>,
    called_next: bool,
    sent_response: bool,
    status: StatusCode,
    headers: Vec<(String, String)>,
    body: Option<Bytes>,
    sent_file: Option<PathBuf>,
    rendered: Option<Rendered>,
}

impl HandlerCapture {
    pub(crate) fn record(
        error: Option<DispatchError>,
        called_next: bool,
        committed: Option<Committed>,
    ) -> Self {
        let mut capture = Self {
            error,
            called_next,
            sent_response: false,
            status: StatusCode::OK,
            headers: Vec::new(),
            body: None,
            sent_file: None,
            rendered: None,
        };
        match committed {
            Some(Committed::Response(response)) => {
                capture.sent_response = true;
                capture.status = response.status_code();
                capture.headers = response.headers().to_vec();
                capture.body = Some(response.body().clone());
            }
            Some(Committed::File(path)) => {
                // Deliberately not a "sent response": the two are observed
                // as distinct artifacts.
                capture.sent_file = Some(path);
            }
            Some(Committed::Rendered(rendered)) => {
                capture.rendered = Some(rendered);
            }
            None => {}
        }
        capture
    }

    /// The failure raised during the run, if any
    pub fn error(&self) -> Option<&DispatchError> {
        self.error.as_ref()
    }

    /// Whether the handler advanced the chain
    pub fn called_next(&self) -> bool {
        self.called_next
    }

    /// Whether a response was committed
    pub fn sent_response(&self) -> bool {
        self.sent_response
    }

    /// Status of the committed response (200 when none was committed)
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Numeric status code of the committed response
    pub fn status_code(&self) -> u16 {
        self.status.as_u16()
    }

    /// Canonical reason phrase for the status, if one exists
    pub fn reason(&self) -> Option<&'static str> {
        self.status.canonical_reason()
    }

    /// Headers of the committed response, in the order they were added
    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    /// A committed response header by name (case-insensitive, first match)
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// The committed body as text, when present and valid UTF-8
    pub fn body_text(&self) -> Option<String> {
        self.body
            .as_ref()
            .and_then(|body| std::str::from_utf8(body).ok())
            .map(|text| text.to_string())
    }

    /// The committed body as raw bytes, when present
    pub fn body_bytes(&self) -> Option<&[u8]> {
        self.body.as_deref()
    }

    /// The file designated as the sent artifact, if any
    pub fn sent_file(&self) -> Option<&Path> {
        self.sent_file.as_deref()
    }

    /// The rendered object, narrowed to the expected type
    ///
    /// Returns `None` when nothing was rendered or the type does not
    /// match.
    pub fn rendered<T: Any>(&self) -> Option<&T> {
        self.rendered
            .as_ref()
            .and_then(|rendered| rendered.downcast_ref::<T>())
    }
}
