//! HTTP protocol types used on the outbound side.
//!
//! This module provides the primitives shared by the decorator and its
//! collaborators: [`Method`], [`StatusCode`], [`Headers`], [`Request`] and
//! [`Response`].

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

pub mod headers;
pub mod request;
pub mod response;

pub use headers::Headers;
pub use request::Request;
pub use response::Response;

/// An HTTP response status code.
///
/// Origins may answer with any three-digit code, so this is a thin wrapper
/// over `u16` with named constants for the codes the crate reasons about.
///
/// # Examples
///
/// ```
/// use fetch_harbor::http::StatusCode;
///
/// let status = StatusCode::OK;
/// assert_eq!(status.as_u16(), 200);
/// assert_eq!(status.canonical_reason(), "OK");
/// assert!(status.is_success());
/// assert!(!StatusCode::from(503).is_success());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StatusCode(u16);

impl StatusCode {
    pub const OK: Self = Self(200);
    pub const NON_AUTHORITATIVE_INFORMATION: Self = Self(203);
    pub const NO_CONTENT: Self = Self(204);
    pub const PARTIAL_CONTENT: Self = Self(206);
    pub const MULTIPLE_CHOICES: Self = Self(300);
    pub const MOVED_PERMANENTLY: Self = Self(301);
    pub const NOT_MODIFIED: Self = Self(304);
    pub const PERMANENT_REDIRECT: Self = Self(308);
    pub const FORBIDDEN: Self = Self(403);
    pub const NOT_FOUND: Self = Self(404);
    pub const METHOD_NOT_ALLOWED: Self = Self(405);
    pub const GONE: Self = Self(410);
    pub const URI_TOO_LONG: Self = Self(414);
    pub const TOO_MANY_REQUESTS: Self = Self(429);
    pub const INTERNAL_SERVER_ERROR: Self = Self(500);
    pub const NOT_IMPLEMENTED: Self = Self(501);
    pub const BAD_GATEWAY: Self = Self(502);
    pub const SERVICE_UNAVAILABLE: Self = Self(503);
    pub const GATEWAY_TIMEOUT: Self = Self(504);

    /// Returns the numeric status code as a `u16`.
    pub fn as_u16(self) -> u16 {
        self.0
    }

    /// Returns `true` for the 2xx class.
    pub fn is_success(self) -> bool {
        (200..300).contains(&self.0)
    }

    /// Returns the canonical reason phrase, or an empty string for codes
    /// without a registered phrase.
    pub fn canonical_reason(self) -> &'static str {
        match self.0 {
            100 => "Continue",
            101 => "Switching Protocols",
            200 => "OK",
            201 => "Created",
            202 => "Accepted",
            203 => "Non-Authoritative Information",
            204 => "No Content",
            206 => "Partial Content",
            300 => "Multiple Choices",
            301 => "Moved Permanently",
            302 => "Found",
            303 => "See Other",
            304 => "Not Modified",
            307 => "Temporary Redirect",
            308 => "Permanent Redirect",
            400 => "Bad Request",
            401 => "Unauthorized",
            403 => "Forbidden",
            404 => "Not Found",
            405 => "Method Not Allowed",
            408 => "Request Timeout",
            409 => "Conflict",
            410 => "Gone",
            414 => "URI Too Long",
            422 => "Unprocessable Entity",
            429 => "Too Many Requests",
            500 => "Internal Server Error",
            501 => "Not Implemented",
            502 => "Bad Gateway",
            503 => "Service Unavailable",
            504 => "Gateway Timeout",
            _ => "",
        }
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.0, self.canonical_reason())
    }
}

impl From<u16> for StatusCode {
    fn from(code: u16) -> Self {
        Self(code)
    }
}

impl From<StatusCode> for u16 {
    fn from(code: StatusCode) -> u16 {
        code.as_u16()
    }
}

impl Serialize for StatusCode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u16(self.0)
    }
}

impl<'de> Deserialize<'de> for StatusCode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        u16::deserialize(deserializer).map(Self)
    }
}

/// An HTTP request method.
///
/// Standard methods are represented as unit variants for zero-cost comparison.
/// Non-standard methods are captured in the `Custom` variant. Parsing is
/// case-insensitive and the canonical form is upper case.
///
/// # Examples
///
/// ```
/// use fetch_harbor::http::Method;
///
/// let method: Method = "get".parse().unwrap();
/// assert_eq!(method, Method::Get);
/// assert_eq!(method.as_str(), "GET");
/// assert!(method.is_cacheable());
/// assert!(!Method::Post.is_cacheable());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum Method {
    /// GET: retrieve a representation of the target resource.
    #[default]
    Get,
    /// POST: perform resource-specific processing on the request payload.
    Post,
    /// PUT: replace the target resource's current representation.
    Put,
    /// DELETE: remove the association between the target resource and its functionality.
    Delete,
    /// HEAD: identical to GET but without a response body.
    Head,
    /// OPTIONS: describe the communication options for the target resource.
    Options,
    /// PATCH: apply partial modifications to a resource.
    Patch,
    /// A non-standard extension method, stored upper-cased.
    Custom(String),
}

impl Method {
    /// Returns the method as a string slice.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
            Self::Head => "HEAD",
            Self::Options => "OPTIONS",
            Self::Patch => "PATCH",
            Self::Custom(s) => s.as_str(),
        }
    }

    /// Returns `true` for the methods whose responses may be served from the
    /// cache: GET and HEAD.
    pub fn is_cacheable(&self) -> bool {
        matches!(self, Self::Get | Self::Head)
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Method {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.to_ascii_uppercase();
        Ok(match upper.as_str() {
            "GET" => Self::Get,
            "POST" => Self::Post,
            "PUT" => Self::Put,
            "DELETE" => Self::Delete,
            "HEAD" => Self::Head,
            "OPTIONS" => Self::Options,
            "PATCH" => Self::Patch,
            _ => Self::Custom(upper),
        })
    }
}

impl From<&str> for Method {
    fn from(s: &str) -> Self {
        match s.parse() {
            Ok(method) => method,
            Err(never) => match never {},
        }
    }
}

impl AsRef<str> for Method {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl Serialize for Method {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Method {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Method::from(raw.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn method_parse_is_case_insensitive() {
        assert_eq!(Method::from("head"), Method::Head);
        assert_eq!(Method::from("purge"), Method::Custom("PURGE".into()));
    }

    #[test]
    fn status_classes() {
        assert!(StatusCode::from(204).is_success());
        assert!(!StatusCode::NOT_MODIFIED.is_success());
        assert_eq!(StatusCode::from(599).canonical_reason(), "");
        assert_eq!(StatusCode::FORBIDDEN.to_string(), "403 Forbidden");
    }
}
