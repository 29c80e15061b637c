use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use fetch_harbor::config::RetryOverrides;
use fetch_harbor::{
    Backoff, CallOverrides, Client, Error, Fetch, Options, Request, RequestInit, Response,
    RetryConfig, StatusCode, TransportError,
};

/// Routes library logs to the test output; `RUST_LOG=fetch_harbor=debug` to see them.
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Origin that fails `failures` times with `status`, then answers 200.
fn flaky(failures: usize, status: u16) -> (Arc<AtomicUsize>, impl Fetch) {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    let fetch = move |_request: Request| {
        let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
        let response = if n <= failures {
            Response::new(status).body(format!("failure {n}"))
        } else {
            Response::new(StatusCode::OK).body("recovered")
        };
        std::future::ready(Ok::<_, TransportError>(response))
    };
    (calls, fetch)
}

fn retrying(config: RetryConfig) -> Options {
    Options::default().with_retrying(RetryConfig {
        backoff: Backoff::none(),
        ..config
    })
}

#[tokio::test(start_paused = true)]
async fn disabled_by_default() {
    let (calls, origin) = flaky(3, 500);
    let client = Client::new(origin, Options::default()).unwrap();

    let response = client.fetch("http://h.test/").await.unwrap();

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test(start_paused = true)]
async fn retries_until_success() {
    let (calls, origin) = flaky(3, 500);
    let client = Client::new(origin, retrying(RetryConfig::enabled())).unwrap();

    let response = client.fetch("http://h.test/").await.unwrap();

    assert_eq!(calls.load(Ordering::SeqCst), 4);
    assert_eq!(response.text().unwrap(), "recovered");
}

#[tokio::test(start_paused = true)]
async fn returns_last_response_when_attempts_run_out() {
    let (calls, origin) = flaky(10, 503);
    let client = Client::new(
        origin,
        retrying(RetryConfig {
            max_attempts: 3,
            ..RetryConfig::enabled()
        }),
    )
    .unwrap();

    let response = client.fetch("http://h.test/").await.unwrap();

    assert_eq!(calls.load(Ordering::SeqCst), 3);
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(response.text().unwrap(), "failure 3");
}

#[tokio::test(start_paused = true)]
async fn enabled_for_a_single_call() {
    let (calls, origin) = flaky(3, 500);
    let client = Client::new(origin, retrying(RetryConfig::default())).unwrap();

    let init = RequestInit::default().overrides(CallOverrides {
        retrying: Some(RetryOverrides {
            enabled: Some(true),
            ..Default::default()
        }),
        ..Default::default()
    });
    let response = client.fetch_with("http://h.test/", init).await.unwrap();

    assert_eq!(calls.load(Ordering::SeqCst), 4);
    assert!(response.is_ok());
}

#[tokio::test(start_paused = true)]
async fn non_retryable_status_is_final() {
    let (calls, origin) = flaky(3, 403);
    let client = Client::new(origin, retrying(RetryConfig::enabled())).unwrap();

    let response = client.fetch("http://h.test/").await.unwrap();

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test(start_paused = true)]
async fn retry_on_replaces_default_set() {
    let (calls, origin) = flaky(3, 403);
    let client = Client::new(
        origin,
        retrying(RetryConfig {
            retry_on: vec![403],
            ..RetryConfig::enabled()
        }),
    )
    .unwrap();

    let response = client.fetch("http://h.test/").await.unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 4);
    assert!(response.is_ok());

    let (calls, origin) = flaky(3, 500);
    let client = Client::new(
        origin,
        retrying(RetryConfig {
            retry_on: vec![403],
            ..RetryConfig::enabled()
        }),
    )
    .unwrap();
    client.fetch("http://h.test/").await.unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn transport_errors_are_retried_then_surfaced() {
    init_tracing();
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    let origin = move |_request: Request| {
        counter.fetch_add(1, Ordering::SeqCst);
        std::future::ready(Err::<Response, _>(TransportError::new("connection refused")))
    };
    let client = Client::new(origin, Options::default().with_retrying(RetryConfig::enabled()))
        .unwrap();

    let error = client.fetch("http://h.test/").await.unwrap_err();

    assert!(matches!(error, Error::Transport(ref e) if e.message() == "connection refused"));
    assert_eq!(calls.load(Ordering::SeqCst), 5);
}

#[tokio::test(start_paused = true)]
async fn options_load_from_json() {
    let options: Options = serde_json::from_str(
        r#"{
            "retrying": {
                "enabled": true,
                "maxAttempts": 2,
                "retryOn": [502],
                "backoff": { "minTimeoutMs": 10, "randomize": false }
            }
        }"#,
    )
    .unwrap();
    assert!(options.http_cache.is_none());

    let (calls, origin) = flaky(5, 502);
    let client = Client::new(origin, options).unwrap();
    let response = client.fetch("http://h.test/").await.unwrap();

    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
}
