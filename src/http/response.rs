//! HTTP response as seen by the caller.
//!
//! Bodies are held as [`Bytes`], so cloning a response shares the buffer
//! instead of consuming it. The cache snapshots a clone and hands the
//! original back untouched.

use bytes::Bytes;
use serde::de::DeserializeOwned;

use super::{Headers, StatusCode};

/// A complete HTTP response.
///
/// # Examples
///
/// ```
/// use fetch_harbor::http::{Response, StatusCode};
///
/// let response = Response::new(StatusCode::OK)
///     .header("Content-Type", "application/json")
///     .body(r#"{"status":"ok"}"#);
///
/// assert!(response.is_ok());
/// assert_eq!(response.reason(), "OK");
/// assert_eq!(response.text().unwrap(), r#"{"status":"ok"}"#);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    url: String,
    status: StatusCode,
    status_text: String,
    headers: Headers,
    body: Bytes,
}

impl Response {
    /// Creates a new response with the given status, its canonical reason
    /// phrase and an empty body.
    pub fn new(status: impl Into<StatusCode>) -> Self {
        let status = status.into();
        Self {
            url: String::new(),
            status,
            status_text: status.canonical_reason().to_owned(),
            headers: Headers::new(),
            body: Bytes::new(),
        }
    }

    /// Appends a response header. Multiple calls with the same name are additive.
    #[must_use]
    pub fn header(mut self, name: impl AsRef<str>, value: impl Into<String>) -> Self {
        self.headers.append(name, value);
        self
    }

    /// Replaces the whole header map.
    #[must_use]
    pub fn with_headers(mut self, headers: Headers) -> Self {
        self.headers = headers;
        self
    }

    /// Sets the response body.
    #[must_use]
    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// Sets the final URL the response was fetched from.
    #[must_use]
    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    /// Overrides the reason phrase.
    #[must_use]
    pub fn status_text(mut self, text: impl Into<String>) -> Self {
        self.status_text = text.into();
        self
    }

    /// Mutable access for decorators that stamp headers on the way out.
    pub fn headers_mut(&mut self) -> &mut Headers {
        &mut self.headers
    }

    /// Returns the status code of this response.
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Returns `true` for 2xx responses.
    pub fn is_ok(&self) -> bool {
        self.status.is_success()
    }

    /// Returns the reason phrase.
    pub fn reason(&self) -> &str {
        &self.status_text
    }

    /// Returns the final URL of the response.
    pub fn final_url(&self) -> &str {
        &self.url
    }

    /// Returns the response headers.
    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    /// Returns the body bytes. Cheap: the buffer is reference counted.
    pub fn bytes(&self) -> Bytes {
        self.body.clone()
    }

    /// Returns the body decoded as UTF-8.
    pub fn text(&self) -> Result<&str, std::str::Utf8Error> {
        std::str::from_utf8(&self.body)
    }

    /// Decodes the body as JSON.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_slice(&self.body)
    }
}

impl Default for Response {
    fn default() -> Self {
        Self::new(StatusCode::OK)
    }
}
