//! Header-like request metadata.
//!
//! Plain requests carry their credentials in transport headers; persistent
//! connections carry them in the connection-init payload. Both are reduced to
//! the same case-insensitive string map.

use std::collections::BTreeMap;

use {http::HeaderMap, serde_json::Value};

/// Case-insensitive mapping of metadata keys to string values.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestMetadata {
    entries: BTreeMap<String, String>,
}

impl RequestMetadata {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style [`insert`](Self::insert).
    #[must_use]
    pub fn with(mut self, key: &str, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    /// Set `key`, replacing any previous value.
    pub fn insert(&mut self, key: &str, value: impl Into<String>) {
        self.entries.insert(key.to_ascii_lowercase(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .get(&key.to_ascii_lowercase())
            .map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Collect UTF-8 header values. For repeated headers the first value wins.
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let mut entries = BTreeMap::new();
        for (name, value) in headers {
            if let Ok(value) = value.to_str() {
                entries
                    .entry(name.as_str().to_string())
                    .or_insert_with(|| value.to_string());
            }
        }
        Self { entries }
    }

    /// Collect string values from a connection-init payload.
    ///
    /// Top-level string entries are taken as-is; a nested `headers` object is
    /// merged underneath them so top-level keys take precedence.
    pub fn from_init_payload(payload: &Value) -> Self {
        let mut metadata = Self::new();
        let Some(object) = payload.as_object() else {
            return metadata;
        };
        if let Some(headers) = object.get("headers").and_then(Value::as_object) {
            for (key, value) in headers {
                if let Some(value) = value.as_str() {
                    metadata.insert(key, value);
                }
            }
        }
        for (key, value) in object {
            if let Some(value) = value.as_str() {
                metadata.insert(key, value);
            }
        }
        metadata
    }
}

impl<K: AsRef<str>, V: Into<String>> FromIterator<(K, V)> for RequestMetadata {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut metadata = Self::new();
        for (key, value) in iter {
            metadata.insert(key.as_ref(), value);
        }
        metadata
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, serde_json::json};

    #[test]
    fn keys_are_case_insensitive() {
        let md = RequestMetadata::new().with("Authentication", "ADMIN");
        assert_eq!(md.get("authentication"), Some("ADMIN"));
        assert_eq!(md.get("AUTHENTICATION"), Some("ADMIN"));
        assert_eq!(md.get("uid"), None);
    }

    #[test]
    fn from_headers_keeps_first_value() {
        let mut h = HeaderMap::new();
        h.append("uid", "1".parse().unwrap());
        h.append("uid", "2".parse().unwrap());
        h.insert("authentication", "ADMIN".parse().unwrap());
        let md = RequestMetadata::from_headers(&h);
        assert_eq!(md.get("uid"), Some("1"));
        assert_eq!(md.get("Authentication"), Some("ADMIN"));
    }

    #[test]
    fn from_headers_skips_non_utf8_values() {
        let mut h = HeaderMap::new();
        h.insert(
            "uid",
            http::HeaderValue::from_bytes(&[0xff, 0xfe]).unwrap(),
        );
        assert!(RequestMetadata::from_headers(&h).is_empty());
    }

    #[test]
    fn init_payload_merges_nested_headers() {
        let md = RequestMetadata::from_init_payload(&json!({
            "authentication": "ADMIN",
            "retries": 3,
            "headers": { "uid": "2", "authentication": "GUEST" },
        }));
        assert_eq!(md.get("authentication"), Some("ADMIN"));
        assert_eq!(md.get("uid"), Some("2"));
        assert_eq!(md.get("retries"), None);
    }

    #[test]
    fn init_payload_that_is_not_an_object_is_empty() {
        assert!(RequestMetadata::from_init_payload(&json!(["x"])).is_empty());
        assert!(RequestMetadata::from_init_payload(&Value::Null).is_empty());
    }

    #[test]
    fn collects_from_pairs() {
        let md: RequestMetadata = [("UID", "1")].into_iter().collect();
        assert_eq!(md.get("uid"), Some("1"));
    }
}
