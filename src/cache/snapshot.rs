//! Response snapshots: the stored form of a response.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::http::{Headers, Response, StatusCode};

/// A response captured for storage.
///
/// The body is taken from a clone of the response, so the caller still owns
/// a fully readable original.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseSnapshot {
    pub url: String,
    pub status: StatusCode,
    pub status_text: String,
    pub headers: Headers,
    #[serde(with = "body")]
    pub body: Bytes,
}

impl ResponseSnapshot {
    pub fn capture(response: &Response) -> Self {
        let copy = response.clone();
        Self {
            url: copy.final_url().to_owned(),
            status: copy.status(),
            status_text: copy.reason().to_owned(),
            headers: copy.headers().clone(),
            body: copy.bytes(),
        }
    }

    /// Rebuilds a response from the snapshot, serving `headers` (the
    /// policy's view of the stored headers) instead of the captured ones.
    pub fn rehydrate(&self, headers: Headers) -> Response {
        Response::new(self.status)
            .status_text(self.status_text.clone())
            .url(self.url.clone())
            .with_headers(headers)
            .body(self.body.clone())
    }
}

/// Text bodies are stored verbatim; anything else as base64.
mod body {
    use base64::Engine;
    use base64::engine::general_purpose::STANDARD;
    use bytes::Bytes;
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    #[derive(Serialize, Deserialize)]
    #[serde(rename_all = "lowercase")]
    enum Encoded {
        Text(String),
        Base64(String),
    }

    pub fn serialize<S: Serializer>(body: &Bytes, serializer: S) -> Result<S::Ok, S::Error> {
        match std::str::from_utf8(body) {
            Ok(text) => Encoded::Text(text.to_owned()),
            Err(_) => Encoded::Base64(STANDARD.encode(body)),
        }
        .serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Bytes, D::Error> {
        match Encoded::deserialize(deserializer)? {
            Encoded::Text(text) => Ok(Bytes::from(text)),
            Encoded::Base64(data) => STANDARD.decode(data).map(Bytes::from).map_err(D::Error::custom),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capture_leaves_original_readable() {
        let original = Response::new(StatusCode::OK)
            .url("http://h.test/a")
            .header("content-type", "text/plain")
            .body("hello");
        let snapshot = ResponseSnapshot::capture(&original);
        assert_eq!(original.text().unwrap(), "hello");
        assert_eq!(snapshot.body, Bytes::from_static(b"hello"));
        assert_eq!(snapshot.url, "http://h.test/a");
    }

    #[test]
    fn binary_bodies_survive_json() {
        let original = Response::new(StatusCode::OK).body(vec![0xff, 0x00, 0xfe]);
        let snapshot = ResponseSnapshot::capture(&original);
        let json = serde_json::to_value(&snapshot).unwrap();
        assert!(json["body"]["base64"].is_string());

        let back: ResponseSnapshot = serde_json::from_value(json).unwrap();
        assert_eq!(back.body.as_ref(), &[0xff, 0x00, 0xfe]);
    }

    #[test]
    fn rehydrate_uses_given_headers() {
        let snapshot = ResponseSnapshot::capture(
            &Response::new(404u16).header("x-old", "1").body("missing"),
        );
        let served = snapshot.rehydrate(Headers::from_iter([("x-new", "2")]));
        assert_eq!(served.status(), StatusCode::NOT_FOUND);
        assert_eq!(served.reason(), "Not Found");
        assert!(!served.headers().contains("x-old"));
        assert_eq!(served.text().unwrap(), "missing");
    }
}
