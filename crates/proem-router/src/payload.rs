//! Route match results.

use serde::Serialize;

use crate::request::{url_decode, Params};

/// Key under which a gobbled trailing path is captured.
pub const PARAMS_KEY: &str = "params";

/// The values produced by a successful route match.
///
/// A payload only counts as a match once it has been populated; a fresh
/// [`Payload::new`] is never dispatchable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Payload {
    values: Params,
    populated: bool,
}

impl Payload {
    /// Creates an empty, unpopulated payload.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a populated payload from matched values.
    ///
    /// A `params` value made of `key/value` pairs is exploded into
    /// individual keys, see [`Payload::prepare`].
    pub fn populated(values: Params) -> Self {
        let mut payload = Self {
            values,
            populated: true,
        };
        payload.prepare();
        payload
    }

    /// Returns whether this payload came from a successful match.
    pub fn is_populated(&self) -> bool {
        self.populated
    }

    /// Gets a value.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key)
    }

    /// Sets a value.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key, value);
    }

    /// Returns whether a key is present.
    pub fn has(&self, key: &str) -> bool {
        self.values.contains(key)
    }

    /// Removes a value.
    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.values.remove(key)
    }

    /// Iterates over the values in match order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter()
    }

    /// Number of values.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns whether the payload holds no values.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Returns the underlying values.
    pub fn values(&self) -> &Params {
        &self.values
    }

    /// Explodes `params` of the form `a/b/c/d` into `a=b` and `c=d`.
    ///
    /// `params` is expected undecoded: it is split on `/` first and each key
    /// and value is URL-decoded afterwards, so `%2F` stays inside a value.
    /// The `params` key is removed once exploded. Exploded pairs never
    /// replace a key that is already present. A value that is not an even
    /// run of non-empty segments is only decoded.
    pub fn prepare(&mut self) {
        let Some(raw) = self.values.get(PARAMS_KEY) else {
            return;
        };
        let parts: Vec<&str> = raw.trim_matches('/').split('/').collect();
        if parts.len() % 2 != 0 || parts.iter().any(|p| p.is_empty()) {
            let decoded = url_decode(raw);
            self.values.insert(PARAMS_KEY, decoded);
            return;
        }

        let pairs: Vec<(String, String)> = parts
            .chunks(2)
            .map(|pair| (url_decode(pair[0]), url_decode(pair[1])))
            .collect();

        self.values.remove(PARAMS_KEY);
        for (key, value) in pairs {
            if !self.values.contains(&key) {
                self.values.insert(key, value);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_payload_is_not_populated() {
        let payload = Payload::new();
        assert!(!payload.is_populated());
        assert!(payload.is_empty());
    }

    #[test]
    fn test_params_explode() {
        let values: Params = [("controller", "user"), ("params", "a/b/c/d")]
            .into_iter()
            .collect();
        let payload = Payload::populated(values);

        assert!(payload.is_populated());
        assert_eq!(payload.get("a"), Some("b"));
        assert_eq!(payload.get("c"), Some("d"));
        assert!(!payload.has("params"));
    }

    #[test]
    fn test_params_without_pairs_stay_raw() {
        for raw in ["single", "a/b/c", "a//b/c"] {
            let payload = Payload::populated([("params", raw)].into_iter().collect());
            assert_eq!(payload.get("params"), Some(raw));
        }
    }

    #[test]
    fn test_exploded_params_do_not_replace_existing_keys() {
        let values: Params = [("id", "1"), ("params", "id/2/page/3")]
            .into_iter()
            .collect();
        let payload = Payload::populated(values);
        assert_eq!(payload.get("id"), Some("1"));
        assert_eq!(payload.get("page"), Some("3"));
    }

    #[test]
    fn test_encoded_slash_stays_in_value() {
        let payload = Payload::populated([("params", "path/a%2Fb/page/2")].into_iter().collect());
        assert_eq!(payload.get("path"), Some("a/b"));
        assert_eq!(payload.get("page"), Some("2"));
    }

    #[test]
    fn test_unexploded_params_are_decoded() {
        let payload = Payload::populated([("params", "a%20b/c/d")].into_iter().collect());
        assert_eq!(payload.get("params"), Some("a b/c/d"));
    }

    #[test]
    fn test_trailing_slash_is_ignored() {
        let payload = Payload::populated([("params", "/a/b/")].into_iter().collect());
        assert_eq!(payload.get("a"), Some("b"));
    }
}
