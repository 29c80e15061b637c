//! Request normalization and cache-key derivation.
//!
//! Callers reach the decorator with one of several call shapes: a bare URL,
//! a URL plus per-call options, a pre-built [`Request`], or a loose JSON
//! descriptor. [`RequestInput`] captures those shapes as a tagged union and
//! this module resolves them, once, into:
//!
//! - the outbound [`Request`] that is actually sent to the origin, and
//! - a [`NormalizedRequest`] whose canonical URL drives cache-key equivalence.
//!
//! ```
//! use fetch_harbor::normalize::{cache_key, normalize, RequestInit, RequestInput};
//!
//! let input = RequestInput::from("https://Example.com/a/?b=2&a=1#frag");
//! let normalized = normalize(&input, &RequestInit::default()).unwrap();
//!
//! assert_eq!(normalized.url, "https://example.com/a?a=1&b=2");
//! assert_eq!(cache_key(Some("users"), &normalized), "users:GET:https://example.com/a?a=1&b=2");
//! ```

use std::collections::BTreeMap;

use bytes::Bytes;
use serde_json::Value;
use thiserror::Error;
use url::Url;

use crate::config::CallOverrides;
use crate::http::headers::HeaderValues;
use crate::http::{Headers, Method, Request};

/// No URL could be derived from the call arguments.
#[derive(Debug, Error)]
#[error("invalid input, could not create url: {reason}")]
pub struct InvalidInputError {
    reason: String,
}

impl InvalidInputError {
    fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// The ways a caller can describe the target of a call.
#[derive(Debug, Clone)]
pub enum RequestInput {
    /// An absolute URL string.
    Url(String),
    /// A pre-built request; its method, headers and body act as fallbacks
    /// behind [`RequestInit`].
    Request(Request),
    /// A loose descriptor object. The URL comes from its `url` member, then
    /// its `href` member; `method` and `headers` members are honoured.
    Object(Value),
}

impl From<&str> for RequestInput {
    fn from(url: &str) -> Self {
        Self::Url(url.to_owned())
    }
}

impl From<String> for RequestInput {
    fn from(url: String) -> Self {
        Self::Url(url)
    }
}

impl From<Request> for RequestInput {
    fn from(request: Request) -> Self {
        Self::Request(request)
    }
}

impl From<Value> for RequestInput {
    fn from(value: Value) -> Self {
        Self::Object(value)
    }
}

/// The three physical header encodings a caller may use.
#[derive(Debug, Clone)]
pub enum HeadersInit {
    /// Name → one or many values.
    Map(BTreeMap<String, HeaderValues>),
    /// Ordered `(name, value)` pairs; repeated names accumulate.
    Pairs(Vec<(String, String)>),
    /// An already-built header collection.
    Headers(Headers),
}

impl HeadersInit {
    /// Flattens the encoding into a header multimap.
    pub fn to_headers(&self) -> Headers {
        match self {
            Self::Map(map) => Headers::from(map.clone()),
            Self::Pairs(pairs) => pairs.iter().map(|(k, v)| (k, v.clone())).collect(),
            Self::Headers(headers) => headers.clone(),
        }
    }
}

impl From<Headers> for HeadersInit {
    fn from(headers: Headers) -> Self {
        Self::Headers(headers)
    }
}

impl From<Vec<(String, String)>> for HeadersInit {
    fn from(pairs: Vec<(String, String)>) -> Self {
        Self::Pairs(pairs)
    }
}

impl From<BTreeMap<String, HeaderValues>> for HeadersInit {
    fn from(map: BTreeMap<String, HeaderValues>) -> Self {
        Self::Map(map)
    }
}

/// Per-call options. Explicit values here win over anything carried by the
/// [`RequestInput`].
#[derive(Debug, Clone, Default)]
pub struct RequestInit {
    pub method: Option<Method>,
    pub headers: Option<HeadersInit>,
    pub body: Option<Bytes>,
    /// Per-call overrides of the decorator's own configuration.
    pub fh: CallOverrides,
}

impl RequestInit {
    #[must_use]
    pub fn method(mut self, method: Method) -> Self {
        self.method = Some(method);
        self
    }

    #[must_use]
    pub fn headers(mut self, headers: impl Into<HeadersInit>) -> Self {
        self.headers = Some(headers.into());
        self
    }

    #[must_use]
    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = Some(body.into());
        self
    }

    #[must_use]
    pub fn overrides(mut self, fh: CallOverrides) -> Self {
        self.fh = fh;
        self
    }
}

/// The canonical view of a request used for cache decisions.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedRequest {
    pub method: Method,
    /// Canonical URL: no fragment, sorted query, no trailing slash.
    pub url: String,
    pub headers: Headers,
}

impl NormalizedRequest {
    /// GET and HEAD only.
    pub fn is_cacheable(&self) -> bool {
        self.method.is_cacheable()
    }
}

/// Resolves the call into its canonical descriptor.
///
/// # Errors
///
/// [`InvalidInputError`] when no absolute URL can be derived.
pub fn normalize(
    input: &RequestInput,
    init: &RequestInit,
) -> Result<NormalizedRequest, InvalidInputError> {
    let raw_url = input_url(input)?;
    Ok(NormalizedRequest {
        method: resolve_method(input, init),
        url: canonical_url(&raw_url)?,
        headers: resolve_headers(input, init)?,
    })
}

/// Builds the request actually sent to the origin. The URL is the caller's,
/// not the canonical one.
///
/// Body resolution: `init.body`, then the body of a [`RequestInput::Request`].
pub fn outbound_request(
    input: &RequestInput,
    init: &RequestInit,
) -> Result<Request, InvalidInputError> {
    let raw_url = input_url(input)?;
    Url::parse(&raw_url).map_err(|e| InvalidInputError::new(format!("{raw_url}: {e}")))?;

    let body = match (&init.body, input) {
        (Some(body), _) => Some(body.clone()),
        (None, RequestInput::Request(request)) => request.body_bytes().cloned(),
        (None, _) => None,
    };

    Ok(Request::new(resolve_method(input, init), raw_url)
        .with_headers(resolve_headers(input, init)?)
        .with_body(body))
}

/// Canonicalizes an absolute URL.
///
/// Strips the fragment, sorts query parameters by key (stable, so repeated
/// keys keep their relative order), and strips trailing slashes from the
/// path. Applying it to its own output is a no-op.
pub fn canonical_url(raw: &str) -> Result<String, InvalidInputError> {
    let mut url = Url::parse(raw).map_err(|e| InvalidInputError::new(format!("{raw}: {e}")))?;

    url.set_fragment(None);

    let mut pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
    if pairs.is_empty() {
        url.set_query(None);
    } else {
        pairs.sort_by(|a, b| a.0.cmp(&b.0));
        url.query_pairs_mut().clear().extend_pairs(pairs);
    }

    if !url.cannot_be_a_base() && url.path().len() > 1 && url.path().ends_with('/') {
        let trimmed = url.path().trim_end_matches('/').to_owned();
        url.set_path(if trimmed.is_empty() { "/" } else { &trimmed });
    }

    Ok(url.to_string())
}

/// `[namespace ":"] method ":" canonical-url`.
pub fn cache_key(namespace: Option<&str>, request: &NormalizedRequest) -> String {
    match namespace {
        Some(ns) if !ns.is_empty() => format!("{ns}:{}:{}", request.method, request.url),
        _ => format!("{}:{}", request.method, request.url),
    }
}

fn input_url(input: &RequestInput) -> Result<String, InvalidInputError> {
    match input {
        RequestInput::Url(url) => Ok(url.clone()),
        RequestInput::Request(request) => Ok(request.url().to_owned()),
        RequestInput::Object(Value::String(url)) => Ok(url.clone()),
        RequestInput::Object(Value::Object(members)) => members
            .get("url")
            .or_else(|| members.get("href"))
            .and_then(Value::as_str)
            .map(str::to_owned)
            .ok_or_else(|| InvalidInputError::new("object has no `url` or `href` member")),
        RequestInput::Object(other) => Err(InvalidInputError::new(format!(
            "expected a url string or descriptor object, got {other}"
        ))),
    }
}

fn resolve_method(input: &RequestInput, init: &RequestInit) -> Method {
    if let Some(method) = &init.method {
        return method.clone();
    }
    match input {
        RequestInput::Request(request) => request.method().clone(),
        RequestInput::Object(Value::Object(members)) => members
            .get("method")
            .and_then(Value::as_str)
            .map(Method::from)
            .unwrap_or_default(),
        _ => Method::Get,
    }
}

fn resolve_headers(input: &RequestInput, init: &RequestInit) -> Result<Headers, InvalidInputError> {
    if let Some(headers) = &init.headers {
        return Ok(headers.to_headers());
    }
    match input {
        RequestInput::Request(request) => Ok(request.headers().clone()),
        RequestInput::Object(Value::Object(members)) => match members.get("headers") {
            None | Some(Value::Null) => Ok(Headers::new()),
            Some(Value::Array(pairs)) => pairs
                .iter()
                .map(|pair| {
                    serde_json::from_value::<(String, String)>(pair.clone())
                        .map_err(|e| InvalidInputError::new(format!("header pair: {e}")))
                })
                .collect::<Result<Vec<_>, _>>()
                .map(|pairs| HeadersInit::Pairs(pairs).to_headers()),
            Some(map) => serde_json::from_value::<Headers>(map.clone())
                .map_err(|e| InvalidInputError::new(format!("headers: {e}"))),
        },
        _ => Ok(Headers::new()),
    }
}
