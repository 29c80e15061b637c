//! RFC 7234 / RFC 5861 cache policy evaluator.
//!
//! The decision engine treats a policy as an opaque object: it asks whether
//! a response is storable, whether a new request can be answered without
//! contacting the origin, how long an entry should be retained, and how to
//! revalidate. Policies round-trip through [`CachePolicy::to_object`] and
//! [`CachePolicy::from_object`] so they can be persisted with the entry.
//!
//! All time-dependent questions take `now` explicitly.

use std::time::SystemTime;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::clock::{from_millis, to_millis};
use crate::http::{Headers, Method, Response, StatusCode};
use crate::normalize::NormalizedRequest;

pub mod cache_control;

pub use cache_control::CacheControl;

/// Statuses whose caching semantics are understood.
const UNDERSTOOD_STATUSES: [u16; 12] = [200, 203, 204, 206, 300, 301, 308, 404, 405, 410, 414, 501];

/// Statuses that are heuristically cacheable without explicit freshness.
const CACHEABLE_BY_DEFAULT: [u16; 10] = [200, 203, 204, 300, 301, 404, 405, 410, 414, 501];

const HOP_BY_HOP: [&str; 8] = [
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

/// Entity headers a 304 may not overwrite on the stored response.
const EXCLUDED_FROM_REVALIDATION_UPDATE: [&str; 4] = [
    "content-length",
    "content-encoding",
    "transfer-encoding",
    "content-range",
];

const FORMAT_VERSION: u32 = 1;

/// Evaluator tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CacheOptions {
    /// Behave as a shared (proxy) cache: `private` responses and
    /// authenticated requests are not stored, `s-maxage` applies.
    pub shared: bool,
    /// Fraction of `Date - Last-Modified` used as heuristic freshness.
    pub cache_heuristic: f64,
    /// Minimum freshness, in milliseconds, for `immutable` responses.
    pub immutable_min_time_to_live: u64,
    /// Ignore `pre-check`/`post-check` cargo-cult directive sets.
    pub ignore_cargo_cult: bool,
}

impl Default for CacheOptions {
    fn default() -> Self {
        Self {
            shared: true,
            cache_heuristic: 0.1,
            immutable_min_time_to_live: 24 * 3600 * 1000,
            ignore_cargo_cult: false,
        }
    }
}

/// Outcome of [`CachePolicy::revalidated_policy`].
#[derive(Debug, Clone)]
pub struct Revalidated {
    /// Policy to store in place of the old one.
    pub policy: CachePolicy,
    /// `false` when the stored body is still current.
    pub modified: bool,
    /// `true` when the origin's validators matched the stored ones.
    pub matches: bool,
}

/// Freshness and storability state for one request/response pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachePolicy {
    #[serde(rename = "v")]
    version: u32,
    #[serde(rename = "t")]
    response_time_ms: u64,
    #[serde(rename = "sh")]
    shared: bool,
    #[serde(rename = "ch")]
    cache_heuristic: f64,
    #[serde(rename = "imm")]
    immutable_min_ttl_ms: u64,
    #[serde(rename = "st")]
    status: StatusCode,
    #[serde(rename = "resh")]
    response_headers: Headers,
    #[serde(rename = "rescc")]
    response_cc: CacheControl,
    #[serde(rename = "m")]
    method: Method,
    #[serde(rename = "u")]
    url: String,
    #[serde(rename = "h")]
    host: Option<String>,
    #[serde(rename = "a")]
    no_authorization: bool,
    #[serde(rename = "reqh")]
    request_headers: Option<Headers>,
    #[serde(rename = "reqcc")]
    request_cc: CacheControl,
}

impl CachePolicy {
    /// Builds the policy for `response`, received at `now`, to `request`.
    pub fn new(
        request: &NormalizedRequest,
        response: &Response,
        options: &CacheOptions,
        now: SystemTime,
    ) -> Self {
        Self::build(request, response.status(), response.headers().clone(), options, now)
    }

    fn build(
        request: &NormalizedRequest,
        status: StatusCode,
        mut response_headers: Headers,
        options: &CacheOptions,
        now: SystemTime,
    ) -> Self {
        let mut response_cc =
            CacheControl::parse(response_headers.get_joined("cache-control").as_deref());

        if options.ignore_cargo_cult && response_cc.has("pre-check") && response_cc.has("post-check")
        {
            for directive in ["pre-check", "post-check", "no-cache", "no-store", "must-revalidate"] {
                response_cc.remove(directive);
            }
            if response_cc.is_empty() {
                response_headers.remove("cache-control");
            } else {
                response_headers.set("cache-control", response_cc.to_string());
            }
            response_headers.remove("expires");
            response_headers.remove("pragma");
        }

        if !response_headers.contains("cache-control")
            && response_headers
                .get_joined("pragma")
                .is_some_and(|p| p.contains("no-cache"))
        {
            response_cc.insert("no-cache");
        }

        let request_headers = response_headers
            .contains("vary")
            .then(|| request.headers.clone());

        Self {
            version: FORMAT_VERSION,
            response_time_ms: to_millis(now),
            shared: options.shared,
            cache_heuristic: options.cache_heuristic,
            immutable_min_ttl_ms: options.immutable_min_time_to_live,
            status,
            response_headers,
            response_cc,
            method: request.method.clone(),
            url: request.url.clone(),
            host: request.headers.get("host").map(str::to_owned),
            no_authorization: !request.headers.contains("authorization"),
            request_headers,
            request_cc: CacheControl::parse(request.headers.get_joined("cache-control").as_deref()),
        }
    }

    /// Whether the response may be stored at all.
    pub fn storable(&self) -> bool {
        let status = self.status.as_u16();
        !self.request_cc.has("no-store")
            && self.method.is_cacheable()
            && UNDERSTOOD_STATUSES.contains(&status)
            && !self.response_cc.has("no-store")
            && (!self.shared || !self.response_cc.has("private"))
            && (!self.shared || self.no_authorization || self.allows_storing_authenticated())
            && (self.response_headers.contains("expires")
                || self.response_cc.has("max-age")
                || (self.shared && self.response_cc.has("s-maxage"))
                || self.response_cc.has("public")
                || CACHEABLE_BY_DEFAULT.contains(&status))
    }

    /// Whether the stored response can answer `request` at `now` without
    /// contacting the origin.
    pub fn satisfies_without_revalidation(&self, request: &NormalizedRequest, now: SystemTime) -> bool {
        let request_cc = CacheControl::parse(request.headers.get_joined("cache-control").as_deref());
        if request_cc.has("no-cache")
            || request
                .headers
                .get_joined("pragma")
                .is_some_and(|p| p.contains("no-cache"))
        {
            return false;
        }

        let age = self.age(now);
        let max_age = self.max_age();

        if request_cc.seconds("max-age").is_some_and(|limit| age > limit) {
            return false;
        }
        if request_cc
            .seconds("min-fresh")
            .is_some_and(|min_fresh| max_age - age < min_fresh)
        {
            return false;
        }

        if max_age <= age {
            let allows_stale = request_cc.has("max-stale")
                && !self.response_cc.has("must-revalidate")
                && match request_cc.value("max-stale") {
                    None => true,
                    Some(_) => request_cc
                        .seconds("max-stale")
                        .is_some_and(|limit| limit > age - max_age),
                };
            if !allows_stale {
                return false;
            }
        }

        self.request_matches(request, false)
    }

    /// Milliseconds the entry is worth keeping at `now`: freshness left,
    /// extended by `stale-if-error` / `stale-while-revalidate` windows.
    pub fn time_to_live(&self, now: SystemTime) -> u64 {
        let fresh_left = self.max_age() - self.age(now);
        let stale_if_error = fresh_left + self.response_cc.seconds("stale-if-error").unwrap_or(0.0);
        let stale_while_revalidate =
            fresh_left + self.response_cc.seconds("stale-while-revalidate").unwrap_or(0.0);

        let seconds = fresh_left
            .max(stale_if_error)
            .max(stale_while_revalidate)
            .max(0.0);
        (seconds * 1000.0).round() as u64
    }

    /// Whether the stored response is past its freshness lifetime.
    pub fn stale(&self, now: SystemTime) -> bool {
        self.max_age() <= self.age(now)
    }

    /// Headers to serve with the stored response at `now`.
    pub fn response_headers(&self, now: SystemTime) -> Headers {
        let mut headers = without_hop_by_hop(&self.response_headers);
        headers.set("age", format!("{}", self.age(now).round() as u64));
        headers.set("date", format_http_date(now));
        headers
    }

    /// Conditional request headers for revalidating against `request`.
    pub fn revalidation_headers(&self, request: &NormalizedRequest) -> Headers {
        let mut headers = without_hop_by_hop(&request.headers);
        headers.remove("if-range");

        if !self.request_matches(request, true) || !self.storable() {
            headers.remove("if-none-match");
            headers.remove("if-modified-since");
            return headers;
        }

        if let Some(etag) = self.response_headers.get("etag") {
            let value = match headers.get_joined("if-none-match") {
                Some(existing) => format!("{existing}, {etag}"),
                None => etag.to_owned(),
            };
            headers.set("if-none-match", value);
        }

        let forbids_weak_validators = headers.contains("accept-ranges")
            || headers.contains("if-match")
            || headers.contains("if-unmodified-since")
            || self.method != Method::Get;

        if forbids_weak_validators {
            headers.remove("if-modified-since");
            if let Some(tags) = headers.get_joined("if-none-match") {
                let strong: Vec<&str> = tags
                    .split(',')
                    .map(str::trim)
                    .filter(|tag| !tag.starts_with("W/"))
                    .collect();
                if strong.is_empty() {
                    headers.remove("if-none-match");
                } else {
                    headers.set("if-none-match", strong.join(","));
                }
            }
        } else if let Some(last_modified) = self.response_headers.get("last-modified") {
            if !headers.contains("if-modified-since") {
                headers.set("if-modified-since", last_modified);
            }
        }

        headers
    }

    /// Folds the origin's answer to a revalidation request into a new policy.
    ///
    /// When validators match, the stored headers are refreshed from the new
    /// response (entity headers excepted) and the stored body stays current.
    pub fn revalidated_policy(
        &self,
        request: &NormalizedRequest,
        response: &Response,
        now: SystemTime,
    ) -> Revalidated {
        let options = self.options();
        let new_headers = response.headers();
        let old_etag = self.response_headers.get("etag");
        let new_etag = new_headers.get("etag");

        let matches = if response.status() != StatusCode::NOT_MODIFIED {
            false
        } else if let Some(strong) = new_etag.filter(|tag| !tag.trim_start().starts_with("W/")) {
            old_etag.is_some_and(|old| strip_weak(old) == strong)
        } else if let (Some(old), Some(new)) = (old_etag, new_etag) {
            strip_weak(old) == strip_weak(new)
        } else if let Some(last_modified) = self.response_headers.get("last-modified") {
            new_headers.get("last-modified") == Some(last_modified)
        } else {
            old_etag.is_none()
                && new_etag.is_none()
                && !new_headers.contains("last-modified")
        };

        if !matches {
            return Revalidated {
                policy: Self::build(request, response.status(), new_headers.clone(), &options, now),
                modified: response.status() != StatusCode::NOT_MODIFIED,
                matches: false,
            };
        }

        let mut merged = Headers::new();
        for name in self.response_headers.names() {
            let refreshed = new_headers.contains(name)
                && !EXCLUDED_FROM_REVALIDATION_UPDATE.contains(&name);
            let source = if refreshed { new_headers } else { &self.response_headers };
            for value in source.get_all(name) {
                merged.append(name, value);
            }
        }

        Revalidated {
            policy: Self::build(request, self.status, merged, &options, now),
            modified: false,
            matches: true,
        }
    }

    /// Serializable snapshot of this policy.
    pub fn to_object(&self) -> Result<Value, serde_json::Error> {
        serde_json::to_value(self)
    }

    /// Restores a policy produced by [`to_object`](Self::to_object).
    pub fn from_object(object: Value) -> Result<Self, serde_json::Error> {
        let policy: Self = serde_json::from_value(object)?;
        if policy.version != FORMAT_VERSION {
            return Err(serde::de::Error::custom(format!(
                "unsupported cache policy version {}",
                policy.version
            )));
        }
        Ok(policy)
    }

    fn options(&self) -> CacheOptions {
        CacheOptions {
            shared: self.shared,
            cache_heuristic: self.cache_heuristic,
            immutable_min_time_to_live: self.immutable_min_ttl_ms,
            ignore_cargo_cult: false,
        }
    }

    fn allows_storing_authenticated(&self) -> bool {
        self.response_cc.has("must-revalidate")
            || self.response_cc.has("public")
            || self.response_cc.has("s-maxage")
    }

    fn request_matches(&self, request: &NormalizedRequest, allow_head: bool) -> bool {
        self.url == request.url
            && self.host.as_deref() == request.headers.get("host")
            && (request.method == self.method || (allow_head && request.method == Method::Head))
            && self.vary_matches(request)
    }

    fn vary_matches(&self, request: &NormalizedRequest) -> bool {
        let Some(vary) = self.response_headers.get_joined("vary") else {
            return true;
        };
        if vary.trim() == "*" {
            return false;
        }
        let empty = Headers::new();
        let stored = self.request_headers.as_ref().unwrap_or(&empty);
        vary.split(',')
            .map(|name| name.trim().to_ascii_lowercase())
            .filter(|name| !name.is_empty())
            .all(|name| stored.get_joined(&name) == request.headers.get_joined(&name))
    }

    /// Date the origin generated the response, or when it was received.
    fn server_date_ms(&self) -> u64 {
        self.response_headers
            .get("date")
            .and_then(parse_http_date)
            .map(to_millis)
            .unwrap_or(self.response_time_ms)
    }

    /// Current age in seconds.
    fn age(&self, now: SystemTime) -> f64 {
        let header_age = self
            .response_headers
            .get("age")
            .and_then(|v| v.trim().parse::<u64>().ok())
            .unwrap_or(0) as f64;
        let resident = (to_millis(now) as f64 - self.response_time_ms as f64) / 1000.0;
        header_age + resident
    }

    /// Freshness lifetime in seconds.
    fn max_age(&self) -> f64 {
        if !self.storable() || self.response_cc.has("no-cache") {
            return 0.0;
        }

        if self.shared
            && self.response_headers.contains("set-cookie")
            && !self.response_cc.has("public")
            && !self.response_cc.has("immutable")
        {
            return 0.0;
        }

        if self
            .response_headers
            .get_joined("vary")
            .is_some_and(|v| v.trim() == "*")
        {
            return 0.0;
        }

        if self.shared {
            if self.response_cc.has("proxy-revalidate") {
                return 0.0;
            }
            if let Some(s_maxage) = self.response_cc.seconds("s-maxage") {
                return s_maxage;
            }
        }

        if let Some(max_age) = self.response_cc.seconds("max-age") {
            return max_age;
        }

        let default_min = if self.response_cc.has("immutable") {
            self.immutable_min_ttl_ms as f64 / 1000.0
        } else {
            0.0
        };

        let server_date = self.server_date_ms() as f64;

        if let Some(expires) = self.response_headers.get("expires") {
            return match parse_http_date(expires).map(|t| to_millis(t) as f64) {
                Some(at) if at >= server_date => default_min.max((at - server_date) / 1000.0),
                _ => 0.0,
            };
        }

        if let Some(last_modified) = self
            .response_headers
            .get("last-modified")
            .and_then(parse_http_date)
        {
            let last_modified = to_millis(last_modified) as f64;
            if server_date > last_modified {
                let heuristic = (server_date - last_modified) / 1000.0 * self.cache_heuristic;
                return default_min.max(heuristic);
            }
        }

        default_min
    }
}

fn strip_weak(tag: &str) -> &str {
    let trimmed = tag.trim_start();
    trimmed.strip_prefix("W/").unwrap_or(trimmed)
}

fn without_hop_by_hop(headers: &Headers) -> Headers {
    let listed: Vec<String> = headers
        .get_all("connection")
        .flat_map(|v| v.split(','))
        .map(|name| name.trim().to_ascii_lowercase())
        .collect();

    headers
        .iter()
        .filter(|(name, _)| !HOP_BY_HOP.contains(name) && !listed.iter().any(|l| l.as_str() == *name))
        .collect()
}

/// Parses an IMF-fixdate (`Sun, 06 Nov 1994 08:49:37 GMT`).
pub fn parse_http_date(value: &str) -> Option<SystemTime> {
    let parsed = DateTime::parse_from_rfc2822(value.trim()).ok()?;
    let ms = parsed.timestamp_millis();
    u64::try_from(ms).ok().map(from_millis)
}

/// Formats `time` as an IMF-fixdate.
pub fn format_http_date(time: SystemTime) -> String {
    DateTime::<Utc>::from(time)
        .format("%a, %d %b %Y %H:%M:%S GMT")
        .to_string()
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::normalize::{RequestInit, RequestInput, normalize};

    const T0: u64 = 1_700_000_000_000;

    fn at(secs: u64) -> SystemTime {
        from_millis(T0 + secs * 1000)
    }

    fn get(url: &str) -> NormalizedRequest {
        normalize(&RequestInput::from(url), &RequestInit::default()).unwrap()
    }

    fn ok_with(headers: &[(&str, &str)]) -> Response {
        headers
            .iter()
            .fold(Response::new(StatusCode::OK).body("body"), |r, (k, v)| r.header(k, *v))
    }

    fn policy(headers: &[(&str, &str)], options: &CacheOptions) -> CachePolicy {
        CachePolicy::new(&get("http://h.test/a"), &ok_with(headers), options, at(0))
    }

    #[test]
    fn public_max_age_is_fresh_then_stale() {
        let p = policy(&[("cache-control", "public, max-age=60")], &CacheOptions::default());
        let req = get("http://h.test/a");
        assert!(p.storable());
        assert_eq!(p.time_to_live(at(0)), 60_000);
        assert!(p.satisfies_without_revalidation(&req, at(30)));
        assert!(!p.satisfies_without_revalidation(&req, at(61)));
        assert!(p.stale(at(61)));
    }

    #[test]
    fn private_depends_on_shared_mode() {
        let date = format_http_date(at(0));
        let last_modified = format_http_date(at(0) - Duration::from_secs(20));
        let headers = [
            ("cache-control", "private, s-maxage=60"),
            ("date", date.as_str()),
            ("last-modified", last_modified.as_str()),
        ];

        let shared = policy(&headers, &CacheOptions::default());
        assert!(!shared.storable());

        let private = policy(&headers, &CacheOptions { shared: false, ..Default::default() });
        assert!(private.storable());
        // 10% of the 20s since last modification; s-maxage is ignored.
        assert_eq!(private.time_to_live(at(0)), 2_000);
        assert!(private.satisfies_without_revalidation(&get("http://h.test/a"), at(1)));
    }

    #[test]
    fn stale_while_revalidate_extends_ttl_only() {
        let p = policy(
            &[("cache-control", "max-age=60, stale-while-revalidate=60")],
            &CacheOptions::default(),
        );
        assert_eq!(p.time_to_live(at(0)), 120_000);
        assert!(!p.satisfies_without_revalidation(&get("http://h.test/a"), at(61)));
        assert_eq!(p.time_to_live(at(61)), 59_000);
    }

    #[test]
    fn post_and_no_store_are_not_storable() {
        let post = normalize(
            &RequestInput::from("http://h.test/a"),
            &RequestInit::default().method(Method::Post),
        )
        .unwrap();
        let p = CachePolicy::new(
            &post,
            &ok_with(&[("cache-control", "public, max-age=60")]),
            &CacheOptions::default(),
            at(0),
        );
        assert!(!p.storable());
        assert_eq!(p.time_to_live(at(0)), 0);

        let no_store = policy(&[("cache-control", "no-store")], &CacheOptions::default());
        assert!(!no_store.storable());
    }

    #[test]
    fn expires_relative_to_date() {
        let date = format_http_date(at(0));
        let expires = format_http_date(at(90));
        let p = policy(
            &[("date", date.as_str()), ("expires", expires.as_str())],
            &CacheOptions::default(),
        );
        assert_eq!(p.time_to_live(at(0)), 90_000);

        let past = format_http_date(at(0) - Duration::from_secs(5));
        let expired = policy(
            &[("date", date.as_str()), ("expires", past.as_str())],
            &CacheOptions::default(),
        );
        assert_eq!(expired.time_to_live(at(0)), 0);
    }

    #[test]
    fn request_directives_limit_reuse() {
        let p = policy(&[("cache-control", "max-age=60")], &CacheOptions::default());
        let mut no_cache = get("http://h.test/a");
        no_cache.headers.append("cache-control", "no-cache");
        assert!(!p.satisfies_without_revalidation(&no_cache, at(1)));

        let mut max_stale = get("http://h.test/a");
        max_stale.headers.append("cache-control", "max-stale=30");
        assert!(p.satisfies_without_revalidation(&max_stale, at(75)));
        assert!(!p.satisfies_without_revalidation(&max_stale, at(95)));
    }

    #[test]
    fn vary_mismatch_requires_revalidation() {
        let mut req = get("http://h.test/a");
        req.headers.append("accept-language", "en");
        let p = CachePolicy::new(
            &req,
            &ok_with(&[("cache-control", "max-age=60"), ("vary", "Accept-Language")]),
            &CacheOptions::default(),
            at(0),
        );
        assert!(p.satisfies_without_revalidation(&req, at(1)));

        let mut other = get("http://h.test/a");
        other.headers.append("accept-language", "fr");
        assert!(!p.satisfies_without_revalidation(&other, at(1)));
    }

    #[test]
    fn revalidation_headers_carry_validators() {
        let p = policy(
            &[
                ("cache-control", "max-age=60"),
                ("etag", "\"v1\""),
                ("last-modified", "Tue, 14 Nov 2023 22:13:20 GMT"),
            ],
            &CacheOptions::default(),
        );
        let headers = p.revalidation_headers(&get("http://h.test/a"));
        assert_eq!(headers.get("if-none-match"), Some("\"v1\""));
        assert_eq!(headers.get("if-modified-since"), Some("Tue, 14 Nov 2023 22:13:20 GMT"));

        let elsewhere = p.revalidation_headers(&get("http://h.test/b"));
        assert!(!elsewhere.contains("if-none-match"));
    }

    #[test]
    fn not_modified_keeps_body_and_refreshes_headers() {
        let p = policy(
            &[("cache-control", "max-age=60"), ("etag", "\"v1\""), ("content-length", "4")],
            &CacheOptions::default(),
        );
        let not_modified = Response::new(StatusCode::NOT_MODIFIED)
            .header("etag", "\"v1\"")
            .header("cache-control", "max-age=120")
            .header("content-length", "0");

        let outcome = p.revalidated_policy(&get("http://h.test/a"), &not_modified, at(61));
        assert!(outcome.matches);
        assert!(!outcome.modified);
        assert_eq!(outcome.policy.time_to_live(at(61)), 120_000);

        let served = outcome.policy.response_headers(at(61));
        assert_eq!(served.get("content-length"), Some("4"));
        assert_eq!(served.get("cache-control"), Some("max-age=120"));
    }

    #[test]
    fn full_response_is_modified() {
        let p = policy(&[("cache-control", "max-age=60"), ("etag", "\"v1\"")], &CacheOptions::default());
        let fresh = ok_with(&[("cache-control", "max-age=30"), ("etag", "\"v2\"")]);
        let outcome = p.revalidated_policy(&get("http://h.test/a"), &fresh, at(61));
        assert!(outcome.modified);
        assert!(!outcome.matches);
        assert_eq!(outcome.policy.time_to_live(at(61)), 30_000);
    }

    #[test]
    fn response_headers_drop_hop_by_hop_and_stamp_age() {
        let p = policy(
            &[("cache-control", "max-age=60"), ("connection", "x-secret"), ("x-secret", "1"), ("keep-alive", "5")],
            &CacheOptions::default(),
        );
        let headers = p.response_headers(at(10));
        assert!(!headers.contains("x-secret"));
        assert!(!headers.contains("keep-alive"));
        assert_eq!(headers.get("age"), Some("10"));
        assert_eq!(headers.get("date"), Some(format_http_date(at(10)).as_str()));
    }

    #[test]
    fn object_round_trip_preserves_decisions() {
        let p = policy(&[("cache-control", "public, max-age=60")], &CacheOptions::default());
        let restored = CachePolicy::from_object(p.to_object().unwrap()).unwrap();
        assert_eq!(restored, p);
        assert_eq!(restored.time_to_live(at(10)), 50_000);

        let mut object = p.to_object().unwrap();
        object["v"] = serde_json::json!(99);
        assert!(CachePolicy::from_object(object).is_err());
    }

    #[test]
    fn cargo_cult_directives_can_be_ignored() {
        let headers = [("cache-control", "no-cache, no-store, must-revalidate, pre-check=0, post-check=0, max-age=60")];
        assert!(!policy(&headers, &CacheOptions::default()).storable());

        let lenient = CacheOptions { ignore_cargo_cult: true, ..Default::default() };
        let p = policy(&headers, &lenient);
        assert!(p.storable());
        assert_eq!(p.time_to_live(at(0)), 60_000);
    }
}
