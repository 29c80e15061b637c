//! Header multimap shared by requests, responses, policies and snapshots.
//!
//! Field names compare case-insensitively (RFC 9110 §5.1) and keep their
//! insertion order. Names are stored lower-cased.

use std::collections::BTreeMap;
use std::fmt;

use serde::de::{self, MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Ordered `(name, value)` pairs; a name may repeat.
///
/// Serializes as a JSON object mapping each name to a string, or to an
/// array when the name carries several values.
///
/// # Examples
///
/// ```
/// use fetch_harbor::http::Headers;
///
/// let mut headers = Headers::new();
/// headers.append("Cache-Control", "max-age=60");
/// headers.append("Vary", "accept");
/// headers.append("Vary", "accept-encoding");
///
/// assert_eq!(headers.get("cache-control"), Some("max-age=60"));
/// assert_eq!(headers.get_joined("vary").as_deref(), Some("accept, accept-encoding"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers {
    inner: Vec<(String, String)>,
}

impl Headers {
    /// An empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a value, keeping any existing ones.
    pub fn append(&mut self, name: impl AsRef<str>, value: impl Into<String>) {
        self.inner
            .push((name.as_ref().to_ascii_lowercase(), value.into()));
    }

    /// Replaces every value of `name` with a single `value`.
    pub fn set(&mut self, name: impl AsRef<str>, value: impl Into<String>) {
        let name = name.as_ref();
        self.remove(name);
        self.append(name, value);
    }

    /// First value of `name`.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.inner
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Returns every value for `name` joined with `", "`, the combined field
    /// value of RFC 9110 §5.3.
    pub fn get_joined(&self, name: &str) -> Option<String> {
        let values: Vec<&str> = self.get_all(name).collect();
        if values.is_empty() {
            None
        } else {
            Some(values.join(", "))
        }
    }

    /// Every value of `name`, in insertion order.
    pub fn get_all<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.inner
            .iter()
            .filter(move |(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Drops every value of `name`; `true` if anything was dropped.
    pub fn remove(&mut self, name: &str) -> bool {
        let before = self.inner.len();
        self.inner.retain(|(k, _)| !k.eq_ignore_ascii_case(name));
        self.inner.len() < before
    }

    /// Whether `name` has at least one value.
    pub fn contains(&self, name: &str) -> bool {
        self.inner.iter().any(|(k, _)| k.eq_ignore_ascii_case(name))
    }

    /// Returns the distinct header names in first-seen order.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        for (k, _) in &self.inner {
            if !names.contains(&k.as_str()) {
                names.push(k);
            }
        }
        names
    }

    /// Number of values, not of distinct names.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Whether no values are stored.
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Pairs in insertion order, names lowercased.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.inner.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<N: AsRef<str>, V: Into<String>> FromIterator<(N, V)> for Headers {
    fn from_iter<I: IntoIterator<Item = (N, V)>>(iter: I) -> Self {
        let mut headers = Headers::new();
        for (name, value) in iter {
            headers.append(name, value);
        }
        headers
    }
}

impl<N: AsRef<str>, V: Into<String>> Extend<(N, V)> for Headers {
    fn extend<I: IntoIterator<Item = (N, V)>>(&mut self, iter: I) {
        for (name, value) in iter {
            self.append(name, value);
        }
    }
}

/// One multimap value on the wire: a bare string or a list of strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum HeaderValues {
    One(String),
    Many(Vec<String>),
}

impl HeaderValues {
    /// The values as a list, one element for a bare string.
    pub fn into_vec(self) -> Vec<String> {
        match self {
            Self::One(value) => vec![value],
            Self::Many(values) => values,
        }
    }
}

impl Serialize for Headers {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let names = self.names();
        let mut map = serializer.serialize_map(Some(names.len()))?;
        for name in names {
            let mut values: Vec<&str> = self.get_all(name).collect();
            if values.len() == 1 {
                map.serialize_entry(name, values.remove(0))?;
            } else {
                map.serialize_entry(name, &values)?;
            }
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Headers {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct HeadersVisitor;

        impl<'de> Visitor<'de> for HeadersVisitor {
            type Value = Headers;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of header names to a string or a list of strings")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Headers, A::Error> {
                let mut headers = Headers::new();
                while let Some((name, values)) = access.next_entry::<String, HeaderValues>()? {
                    if name.is_empty() {
                        return Err(de::Error::custom("empty header name"));
                    }
                    for value in values.into_vec() {
                        headers.append(&name, value);
                    }
                }
                Ok(headers)
            }
        }

        deserializer.deserialize_map(HeadersVisitor)
    }
}

/// Builds headers from a name → values map, keeping the map's iteration order.
impl From<BTreeMap<String, HeaderValues>> for Headers {
    fn from(map: BTreeMap<String, HeaderValues>) -> Self {
        let mut headers = Headers::new();
        for (name, values) in map {
            for value in values.into_vec() {
                headers.append(&name, value);
            }
        }
        headers
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn case_insensitive_get() {
        let mut h = Headers::new();
        h.append("Content-Type", "text/plain");
        assert_eq!(h.get("content-type"), Some("text/plain"));
        assert_eq!(h.get("CONTENT-TYPE"), Some("text/plain"));
        assert_eq!(h.iter().next(), Some(("content-type", "text/plain")));
    }

    #[test]
    fn multi_value() {
        let mut h = Headers::new();
        h.append("Set-Cookie", "a=1");
        h.append("Set-Cookie", "b=2");
        let vals: Vec<_> = h.get_all("set-cookie").collect();
        assert_eq!(vals, vec!["a=1", "b=2"]);
        assert_eq!(h.get_joined("set-cookie").as_deref(), Some("a=1, b=2"));
    }

    #[test]
    fn set_replaces_all_values() {
        let mut h = Headers::new();
        h.append("X-Foo", "bar");
        h.append("X-Foo", "baz");
        h.set("x-foo", "qux");
        assert_eq!(h.get_all("x-foo").collect::<Vec<_>>(), vec!["qux"]);
        assert!(h.remove("x-foo"));
        assert!(!h.remove("x-foo"));
    }

    #[test]
    fn serializes_as_multimap() {
        let h: Headers = [("Accept", "a"), ("Vary", "x"), ("Vary", "y")]
            .into_iter()
            .collect();
        let json = serde_json::to_value(&h).unwrap();
        assert_eq!(json, serde_json::json!({ "accept": "a", "vary": ["x", "y"] }));

        let back: Headers = serde_json::from_value(json).unwrap();
        assert_eq!(back, h);
    }
}
