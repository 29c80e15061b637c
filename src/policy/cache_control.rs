//! `Cache-Control` directive parsing.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Parsed `Cache-Control` directives. Names are lower-cased; a directive
/// without `=value` maps to `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CacheControl(BTreeMap<String, Option<String>>);

impl CacheControl {
    pub fn parse(header: Option<&str>) -> Self {
        let mut directives = BTreeMap::new();
        let Some(header) = header else {
            return Self(directives);
        };

        for part in header.trim().split(',') {
            let mut kv = part.splitn(2, '=');
            let name = kv.next().unwrap_or_default().trim().to_ascii_lowercase();
            if name.is_empty() {
                continue;
            }
            let value = kv.next().map(|v| v.trim().trim_matches('"').to_owned());
            directives.insert(name, value);
        }
        Self(directives)
    }

    pub fn has(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    pub fn value(&self, name: &str) -> Option<&str> {
        self.0.get(name).and_then(|v| v.as_deref())
    }

    /// Delta-seconds value of a directive. Present but unparsable is zero.
    pub fn seconds(&self, name: &str) -> Option<f64> {
        self.0
            .get(name)
            .map(|v| v.as_deref().and_then(|s| s.parse::<u64>().ok()).unwrap_or(0) as f64)
    }

    pub fn insert(&mut self, name: &str) {
        self.0.insert(name.to_owned(), None);
    }

    pub fn remove(&mut self, name: &str) {
        self.0.remove(name);
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for CacheControl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (name, value) in &self.0 {
            if !first {
                f.write_str(", ")?;
            }
            first = false;
            match value {
                Some(v) => write!(f, "{name}={v}")?,
                None => f.write_str(name)?,
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_flags_and_values() {
        let cc = CacheControl::parse(Some(r#"Public, max-age=60, stale-while-revalidate="30""#));
        assert!(cc.has("public"));
        assert_eq!(cc.seconds("max-age"), Some(60.0));
        assert_eq!(cc.seconds("stale-while-revalidate"), Some(30.0));
        assert_eq!(cc.seconds("s-maxage"), None);
    }

    #[test]
    fn garbage_seconds_are_zero() {
        let cc = CacheControl::parse(Some("max-age=soon, ,"));
        assert_eq!(cc.seconds("max-age"), Some(0.0));
        assert_eq!(cc.to_string(), "max-age=soon");
    }
}
