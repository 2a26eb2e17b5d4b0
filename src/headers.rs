//! Raw header reconstruction
//!
//! The wire gives headers as an ordered sequence of name/value occurrences.
//! [`RawHeaders`] keeps that sequence intact (order, casing and repeats), and
//! [`HeaderMap`] is the collapsed view where a repeated name keeps only its
//! last value. Encoders pick whichever fidelity they need.

use bytes::Bytes;
use serde::ser::{Serialize, SerializeMap, Serializer};
use std::borrow::Cow;

/// A single header occurrence as it appeared on the wire
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderPair {
    /// Header name with its original casing
    pub name: String,
    /// Header value bytes, untouched
    pub value: Bytes,
}

impl HeaderPair {
    /// Header value as text, replacing invalid UTF-8 sequences
    pub fn value_lossy(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.value)
    }
}

/// Ordered, duplicate-preserving header sequence
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawHeaders {
    pairs: Vec<HeaderPair>,
}

impl RawHeaders {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the sequence from interleaved `[name, value, name, value, ...]` tokens.
    ///
    /// A dangling name without a value is ignored.
    pub fn from_tokens<I, T>(tokens: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: AsRef<[u8]>,
    {
        let mut headers = Self::new();
        let mut pending: Option<String> = None;

        for token in tokens {
            match pending.take() {
                None => pending = Some(String::from_utf8_lossy(token.as_ref()).into_owned()),
                Some(name) => headers.push(name, Bytes::copy_from_slice(token.as_ref())),
            }
        }

        headers
    }

    /// Appends one header occurrence
    pub fn push(&mut self, name: impl Into<String>, value: impl Into<Bytes>) {
        self.pairs.push(HeaderPair {
            name: name.into(),
            value: value.into(),
        });
    }

    /// Iterates over header occurrences in wire order
    pub fn pairs(&self) -> std::slice::Iter<'_, HeaderPair> {
        self.pairs.iter()
    }

    /// Flattens back into the interleaved token form
    pub fn tokens(&self) -> impl Iterator<Item = &[u8]> {
        self.pairs
            .iter()
            .flat_map(|pair| [pair.name.as_bytes(), pair.value.as_ref()])
    }

    /// Number of header occurrences (not distinct names)
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Last value for `name`, compared case-insensitively
    pub fn get_ignore_case(&self, name: &str) -> Option<&Bytes> {
        self.pairs
            .iter()
            .rev()
            .find(|pair| pair.name.eq_ignore_ascii_case(name))
            .map(|pair| &pair.value)
    }

    /// Every value for `name` in wire order, compared case-insensitively
    pub fn get_all_ignore_case<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Bytes> {
        self.pairs
            .iter()
            .filter(move |pair| pair.name.eq_ignore_ascii_case(name))
            .map(|pair| &pair.value)
    }

    /// Folds the sequence into the last-wins map.
    ///
    /// Repeated names collapse: multi-value headers such as `Set-Cookie`
    /// keep only their final occurrence.
    pub fn to_map(&self) -> HeaderMap {
        self.pairs.iter().fold(HeaderMap::new(), |mut map, pair| {
            map.insert(pair.name.clone(), pair.value_lossy().into_owned());
            map
        })
    }
}

impl<'a> IntoIterator for &'a RawHeaders {
    type Item = &'a HeaderPair;
    type IntoIter = std::slice::Iter<'a, HeaderPair>;

    fn into_iter(self) -> Self::IntoIter {
        self.pairs()
    }
}

/// Header mapping keyed by exact name, last occurrence wins.
///
/// Entries keep the position of the first occurrence of their name so that
/// serialization order is stable for identical input.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderMap {
    entries: Vec<(String, String)>,
}

impl HeaderMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or overwrites the value for `name`
    pub fn insert(&mut self, name: String, value: String) {
        match self.entries.iter_mut().find(|(existing, _)| *existing == name) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((name, value)),
        }
    }

    /// Value for the exact `name`
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(existing, _)| existing == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Serialize for HeaderMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (name, value) in &self.entries {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_tokens_pairs_in_order() {
        let headers = RawHeaders::from_tokens(["Host", "localhost", "X-A", "1", "x-a", "2"]);

        let names: Vec<_> = headers.pairs().map(|p| p.name.as_str()).collect();
        assert_eq!(names, ["Host", "X-A", "x-a"]);
        assert_eq!(headers.len(), 3);
    }

    #[test]
    fn test_from_tokens_ignores_dangling_name() {
        let headers = RawHeaders::from_tokens(["Host", "localhost", "Orphan"]);
        assert_eq!(headers.len(), 1);
    }

    #[test]
    fn test_empty_sequence_gives_empty_map() {
        let headers = RawHeaders::from_tokens(Vec::<&str>::new());
        assert!(headers.is_empty());
        assert!(headers.to_map().is_empty());
    }

    #[test]
    fn test_tokens_round_trip() {
        let tokens = ["Accept", "*/*", "Cookie", "a=1", "Cookie", "b=2"];
        let headers = RawHeaders::from_tokens(tokens);
        let flattened: Vec<&[u8]> = headers.tokens().collect();
        let expected: Vec<&[u8]> = tokens.iter().map(|t| t.as_bytes()).collect();
        assert_eq!(flattened, expected);
    }

    #[test]
    fn test_map_collapses_duplicates_to_last_value() {
        let headers = RawHeaders::from_tokens([
            "Set-Cookie", "a=1", "Host", "example", "Set-Cookie", "b=2",
        ]);
        let map = headers.to_map();

        assert_eq!(map.len(), 2);
        assert_eq!(map.get("Set-Cookie"), Some("b=2"));
        // First occurrence keeps its slot
        let names: Vec<_> = map.iter().map(|(name, _)| name).collect();
        assert_eq!(names, ["Set-Cookie", "Host"]);
    }

    #[test]
    fn test_map_is_case_sensitive() {
        let headers = RawHeaders::from_tokens(["X-Token", "1", "x-token", "2"]);
        let map = headers.to_map();
        assert_eq!(map.len(), 2);
        assert_eq!(map.get("X-Token"), Some("1"));
        assert_eq!(map.get("x-token"), Some("2"));
    }

    #[test]
    fn test_get_ignore_case_returns_last() {
        let headers = RawHeaders::from_tokens(["content-length", "5", "Content-Length", "7"]);
        assert_eq!(
            headers.get_ignore_case("CONTENT-LENGTH").map(|v| v.as_ref()),
            Some(&b"7"[..])
        );
        assert_eq!(headers.get_all_ignore_case("content-length").count(), 2);
        assert!(headers.get_ignore_case("host").is_none());
    }

    #[test]
    fn test_map_serializes_as_object() {
        let headers = RawHeaders::from_tokens(["B", "2", "A", "1"]);
        let json = serde_json::to_string(&headers.to_map()).unwrap();
        assert_eq!(json, r#"{"B":"2","A":"1"}"#);
    }
}
