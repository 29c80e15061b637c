//! Outbound HTTP request descriptor handed to the origin.

use bytes::Bytes;

use super::{Headers, Method};

/// An outbound HTTP request.
///
/// This is the value an origin [`Fetch`](crate::Fetch) receives. The URL is
/// kept exactly as the caller supplied it; canonicalization only affects the
/// cache key, never what goes over the wire.
///
/// # Examples
///
/// ```
/// use fetch_harbor::http::{Method, Request};
///
/// let request = Request::get("https://api.example.com/users/1")
///     .header("Accept", "application/json");
///
/// assert_eq!(request.method(), &Method::Get);
/// assert_eq!(request.headers().get("accept"), Some("application/json"));
/// assert!(request.body_bytes().is_none());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    method: Method,
    url: String,
    headers: Headers,
    body: Option<Bytes>,
}

impl Request {
    /// Creates a request with the given method and URL, no headers and no body.
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: Headers::new(),
            body: None,
        }
    }

    /// Shorthand for a GET request.
    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::Get, url)
    }

    /// Shorthand for a POST request.
    pub fn post(url: impl Into<String>) -> Self {
        Self::new(Method::Post, url)
    }

    /// Appends a request header.
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

    /// Sets the request body.
    #[must_use]
    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Sets or clears the request body.
    #[must_use]
    pub fn with_body(mut self, body: Option<Bytes>) -> Self {
        self.body = body;
        self
    }

    /// Returns the HTTP method.
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Returns the request URL as supplied by the caller.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Returns the request headers.
    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    /// Returns the request body, if any.
    pub fn body_bytes(&self) -> Option<&Bytes> {
        self.body.as_ref()
    }
}
