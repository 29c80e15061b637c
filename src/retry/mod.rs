//! Bounded retry of transient origin failures.
//!
//! A transport error is always worth another attempt while the budget
//! lasts. A response is final when it is 2xx or when its status is not in
//! the retryable set; a retryable status on the last attempt is returned
//! as-is instead of becoming an error.

use std::future::Future;
use std::time::Duration;

use rand::Rng;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::http::Response;
use crate::origin::TransportError;

const DEFAULT_MAX_ATTEMPTS: u32 = 5;
const DEFAULT_RETRY_ON: [u16; 4] = [500, 502, 503, 504];

/// Exponential backoff between attempts.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Backoff {
    /// Delay before the first retry, in milliseconds.
    pub min_timeout_ms: u64,
    /// Growth factor per retry.
    pub factor: f64,
    /// Upper bound for any single delay, in milliseconds.
    pub max_timeout_ms: u64,
    /// Multiply each delay by a random factor in `[1, 2)`.
    pub randomize: bool,
}

impl Default for Backoff {
    fn default() -> Self {
        Self {
            min_timeout_ms: 1000,
            factor: 2.0,
            max_timeout_ms: 30_000,
            randomize: true,
        }
    }
}

impl Backoff {
    /// No waiting at all.
    pub fn none() -> Self {
        Self {
            min_timeout_ms: 0,
            factor: 1.0,
            max_timeout_ms: 0,
            randomize: false,
        }
    }

    /// Delay before retry number `retry` (1-based).
    pub fn delay(&self, retry: u32) -> Duration {
        let exponent = retry.saturating_sub(1).min(32) as i32;
        let mut ms = self.min_timeout_ms as f64 * self.factor.powi(exponent);
        if self.randomize {
            ms *= rand::thread_rng().gen_range(1.0..2.0);
        }
        Duration::from_millis(ms.min(self.max_timeout_ms as f64).max(0.0) as u64)
    }
}

/// Retry settings.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RetryConfig {
    pub enabled: bool,
    /// Total attempts including the first one.
    pub max_attempts: u32,
    /// Non-2xx statuses that count as transient.
    pub retry_on: Vec<u16>,
    pub backoff: Backoff,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            retry_on: DEFAULT_RETRY_ON.to_vec(),
            backoff: Backoff::default(),
        }
    }
}

impl RetryConfig {
    /// Default settings with retrying switched on.
    pub fn enabled() -> Self {
        Self {
            enabled: true,
            ..Self::default()
        }
    }

    fn is_retryable(&self, response: &Response) -> bool {
        self.retry_on.contains(&response.status().as_u16())
    }
}

/// Runs `call` under `config`.
///
/// With retrying disabled this is exactly one call. Otherwise up to
/// `max_attempts` calls are made; the result is always a real response
/// from `call` or the last transport error.
pub async fn attempt<F, Fut>(config: &RetryConfig, mut call: F) -> Result<Response, TransportError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Response, TransportError>>,
{
    if !config.enabled {
        return call().await;
    }

    let budget = config.max_attempts.max(1);
    let mut attempt = 1;

    loop {
        match call().await {
            Ok(response) if response.is_ok() || !config.is_retryable(&response) => {
                return Ok(response);
            }
            Ok(response) if attempt >= budget => {
                warn!(
                    status = response.status().as_u16(),
                    attempts = attempt,
                    "retries exhausted, returning last response"
                );
                return Ok(response);
            }
            Err(error) if attempt >= budget => {
                warn!(%error, attempts = attempt, "retries exhausted");
                return Err(error);
            }
            Ok(response) => {
                debug!(status = response.status().as_u16(), attempt, "retryable status");
            }
            Err(error) => {
                debug!(%error, attempt, "transport failure");
            }
        }

        tokio::time::sleep(config.backoff.delay(attempt)).await;
        attempt += 1;
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;
    use crate::http::StatusCode;

    /// Origin that answers with `statuses` in order, repeating the last one.
    fn scripted(statuses: Vec<u16>) -> (Arc<AtomicU32>, impl FnMut() -> std::future::Ready<Result<Response, TransportError>>) {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&calls);
        let call = move || {
            let n = counter.fetch_add(1, Ordering::SeqCst) as usize;
            let status = statuses[n.min(statuses.len() - 1)];
            std::future::ready(Ok(Response::new(status)))
        };
        (calls, call)
    }

    #[tokio::test(start_paused = true)]
    async fn retries_500_until_success() {
        let (calls, call) = scripted(vec![500, 500, 500, 200]);
        let response = attempt(&RetryConfig::enabled(), call).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn exhausted_budget_returns_last_response() {
        let (calls, call) = scripted(vec![503]);
        let config = RetryConfig {
            max_attempts: 3,
            ..RetryConfig::enabled()
        };
        let response = attempt(&config, call).await.unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn non_retryable_status_is_final() {
        let (calls, call) = scripted(vec![403, 200]);
        let response = attempt(&RetryConfig::enabled(), call).await.unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn custom_retry_set() {
        let (calls, call) = scripted(vec![403, 403, 403, 200]);
        let config = RetryConfig {
            retry_on: vec![403],
            ..RetryConfig::enabled()
        };
        let response = attempt(&config, call).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn disabled_is_a_single_call() {
        let (calls, call) = scripted(vec![500, 200]);
        let response = attempt(&RetryConfig::default(), call).await.unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn transport_errors_retry_then_propagate() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&calls);
        let call = move || {
            counter.fetch_add(1, Ordering::SeqCst);
            std::future::ready(Err::<Response, _>(TransportError::new("connection reset")))
        };
        let err = attempt(&RetryConfig::enabled(), call).await.unwrap_err();
        assert_eq!(err.message(), "connection reset");
        assert_eq!(calls.load(Ordering::SeqCst), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn transport_error_then_success() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&calls);
        let call = move || {
            let n = counter.fetch_add(1, Ordering::SeqCst);
            std::future::ready(if n == 0 {
                Err(TransportError::new("refused"))
            } else {
                Ok(Response::new(StatusCode::OK))
            })
        };
        assert!(attempt(&RetryConfig::enabled(), call).await.unwrap().is_ok());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn backoff_grows_and_caps() {
        let backoff = Backoff {
            randomize: false,
            ..Backoff::default()
        };
        assert_eq!(backoff.delay(1), Duration::from_millis(1000));
        assert_eq!(backoff.delay(3), Duration::from_millis(4000));
        assert_eq!(backoff.delay(10), Duration::from_millis(30_000));

        let jittered = Backoff::default().delay(2);
        assert!(jittered >= Duration::from_millis(2000) && jittered < Duration::from_millis(4000));
        assert_eq!(Backoff::none().delay(4), Duration::ZERO);
    }
}
