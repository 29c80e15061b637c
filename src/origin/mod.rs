//! The wrapped origin call.
//!
//! Anything that turns a [`Request`] into a [`Response`] asynchronously can
//! sit behind the decorator: a real HTTP client, another decorator, or a
//! closure in a test. Timeouts belong here, not in the decorator.

use std::future::Future;
use std::pin::Pin;

use thiserror::Error;

use crate::http::{Request, Response};

/// A boxed, sendable future, as returned by [`Fetch::fetch`].
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// The origin failed to produce any response (connection refused, reset,
/// timed out, ...).
#[derive(Debug, Error)]
#[error("transport error: {message}")]
pub struct TransportError {
    message: String,
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl TransportError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    pub fn with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// An outbound request function.
///
/// Implemented for every `Fn(Request) -> impl Future<Output = Result<Response, TransportError>>`.
///
/// ```rust,no_run
/// use fetch_harbor::{Fetch, Request, Response, TransportError};
///
/// let origin = |_req: Request| async { Ok::<_, TransportError>(Response::default()) };
/// fn assert_fetch(_: &impl Fetch) {}
/// assert_fetch(&origin);
/// ```
pub trait Fetch: Send + Sync {
    fn fetch(&self, request: Request) -> BoxFuture<'_, Result<Response, TransportError>>;
}

impl<F, Fut> Fetch for F
where
    F: Fn(Request) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Response, TransportError>> + Send + 'static,
{
    fn fetch(&self, request: Request) -> BoxFuture<'_, Result<Response, TransportError>> {
        Box::pin(self(request))
    }
}
