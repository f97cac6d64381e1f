//! Schema-free JSON documents.
//!
//! Profiles and broadcasts have no fixed schema: remote sites may carry any
//! fields. [`Document`] keeps the whole JSON object and layers typed
//! accessors for the fields Plume understands on top, so unknown fields
//! survive every read-modify-write cycle.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{Result, TypeError};
use crate::url::{same_site, SiteUrl};

/// Key of the follow list inside a profile.
pub const FOLLOWS_KEY: &str = "follows";

/// A JSON object with typed accessors for well-known fields.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Document(Map<String, Value>);

/// One entry of a profile's `follows` list.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FollowRecord {
    /// Site identifier of the followed site.
    pub url: String,
    /// Any other fields the record carries.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl FollowRecord {
    /// A record carrying only a url.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            extra: Map::new(),
        }
    }
}

impl Document {
    /// An empty document.
    pub fn new() -> Self {
        Self(Map::new())
    }

    /// Wrap a JSON value, which must be an object.
    pub fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            other => Err(TypeError::Serialization(format!(
                "expected a JSON object, found {}",
                json_kind(&other)
            ))),
        }
    }

    /// Parse a document from JSON bytes.
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let value: Value =
            serde_json::from_slice(bytes).map_err(|e| TypeError::Serialization(e.to_string()))?;
        Self::from_value(value)
    }

    /// Serialize as pretty-printed JSON.
    pub fn to_pretty_json(&self) -> Result<Vec<u8>> {
        serde_json::to_vec_pretty(&self.0).map_err(|e| TypeError::Serialization(e.to_string()))
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// A field's value if it is a string.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(key.into(), value.into())
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.0.remove(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Shallow merge: every field of `updates` replaces the field of the same
    /// name in `self`.
    pub fn merge(&mut self, updates: Document) {
        for (key, value) in updates.0 {
            self.0.insert(key, value);
        }
    }

    /// The schema.org `@type` discriminator.
    pub fn type_name(&self) -> Option<&str> {
        self.get_str("@type")
    }

    /// Returns `true` if `@type` equals `type_name`, ignoring case.
    pub fn is_type(&self, type_name: &str) -> bool {
        self.type_name()
            .is_some_and(|t| t.to_lowercase() == type_name.to_lowercase())
    }

    /// The well-formed records of the `follows` list.
    ///
    /// A missing or non-array `follows` field reads as empty; elements that
    /// are not objects with a string `url` are skipped.
    pub fn follows(&self) -> Vec<FollowRecord> {
        match self.0.get(FOLLOWS_KEY) {
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(|item| serde_json::from_value(item.clone()).ok())
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Returns `true` if the follow list contains a record for the same site
    /// as `url`.
    pub fn follows_site(&self, url: &str) -> bool {
        self.follow_items()
            .is_some_and(|items| items.iter().any(|item| record_matches(item, url)))
    }

    /// Add a follow record for `url` unless one for the same site exists.
    ///
    /// Returns `true` if a record was added.
    pub fn add_follow(&mut self, url: &SiteUrl) -> bool {
        let items = self.follow_items_mut();
        if items.iter().any(|item| record_matches(item, url.as_str())) {
            return false;
        }
        let mut record = Map::new();
        record.insert("url".into(), Value::String(url.to_string()));
        items.push(Value::Object(record));
        true
    }

    /// Remove every follow record for the same site as `url`, plus records
    /// whose url is exactly `url` even when it does not normalize.
    ///
    /// Returns `true` if anything was removed. Elements that are not follow
    /// records are kept.
    pub fn remove_follow(&mut self, url: &str) -> bool {
        let items = self.follow_items_mut();
        let before = items.len();
        items.retain(|item| !record_matches(item, url) && !record_is(item, url));
        items.len() != before
    }

    fn follow_items(&self) -> Option<&Vec<Value>> {
        self.0.get(FOLLOWS_KEY).and_then(Value::as_array)
    }

    fn follow_items_mut(&mut self) -> &mut Vec<Value> {
        let slot = self
            .0
            .entry(FOLLOWS_KEY)
            .or_insert_with(|| Value::Array(Vec::new()));
        if !slot.is_array() {
            *slot = Value::Array(Vec::new());
        }
        match slot {
            Value::Array(items) => items,
            _ => unreachable!("follows was just set to an array"),
        }
    }
}

impl From<Map<String, Value>> for Document {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl From<Document> for Value {
    fn from(doc: Document) -> Self {
        doc.into_value()
    }
}

fn record_matches(item: &Value, url: &str) -> bool {
    item.get("url")
        .and_then(Value::as_str)
        .is_some_and(|candidate| same_site(candidate, url))
}

fn record_is(item: &Value, url: &str) -> bool {
    item.get("url").and_then(Value::as_str) == Some(url)
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    fn site(url: &str) -> SiteUrl {
        SiteUrl::parse(url).unwrap()
    }

    #[test]
    fn from_value_requires_object() {
        assert!(Document::from_value(json!({"name": "alice"})).is_ok());
        let err = Document::from_value(json!([1, 2])).unwrap_err();
        assert!(err.to_string().contains("an array"));
    }

    #[test]
    fn from_slice_reports_malformed_json() {
        assert!(Document::from_slice(b"{not json").is_err());
        let doc = Document::from_slice(br#"{"name":"alice"}"#).unwrap();
        assert_eq!(doc.get_str("name"), Some("alice"));
    }

    #[test]
    fn merge_is_shallow_last_write_wins() {
        let mut doc = Document::from_value(json!({"name": "a", "bio": {"x": 1}})).unwrap();
        let updates = Document::from_value(json!({"bio": {"y": 2}, "avatar": "p.png"})).unwrap();
        doc.merge(updates);
        assert_eq!(
            doc.into_value(),
            json!({"name": "a", "bio": {"y": 2}, "avatar": "p.png"})
        );
    }

    #[test]
    fn type_comparison_ignores_case() {
        let doc = Document::from_value(json!({"@type": "Comment"})).unwrap();
        assert_eq!(doc.type_name(), Some("Comment"));
        assert!(doc.is_type("comment"));
        assert!(doc.is_type("COMMENT"));
        assert!(!doc.is_type("Article"));
        assert!(!Document::new().is_type("comment"));
    }

    #[test]
    fn follows_skips_malformed_records() {
        let doc = Document::from_value(json!({
            "follows": [{"url": "dat://a"}, 7, {"url": 3}, {"url": "dat://b", "name": "bob"}]
        }))
        .unwrap();
        let follows = doc.follows();
        assert_eq!(follows.len(), 2);
        assert_eq!(follows[0], FollowRecord::new("dat://a"));
        assert_eq!(follows[1].extra.get("name"), Some(&json!("bob")));
    }

    #[test]
    fn follows_missing_or_wrong_type_reads_empty() {
        assert!(Document::new().follows().is_empty());
        let doc = Document::from_value(json!({"follows": {"url": "dat://a"}})).unwrap();
        assert!(doc.follows().is_empty());
        assert!(!doc.follows_site("dat://a"));
    }

    #[test]
    fn add_follow_uses_normalized_comparison() {
        let mut doc = Document::from_value(json!({"follows": [{"url": "dat://a/"}]})).unwrap();
        assert!(!doc.add_follow(&site("dat://a/profile.json")));
        assert!(doc.add_follow(&site("dat://b/x")));
        assert_eq!(
            doc.get("follows"),
            Some(&json!([{"url": "dat://a/"}, {"url": "dat://b"}]))
        );
    }

    #[test]
    fn add_follow_replaces_non_array_follows() {
        let mut doc = Document::from_value(json!({"follows": "broken"})).unwrap();
        assert!(doc.add_follow(&site("dat://a")));
        assert_eq!(doc.get("follows"), Some(&json!([{"url": "dat://a"}])));
    }

    #[test]
    fn remove_follow_keeps_other_entries() {
        let mut doc = Document::from_value(json!({
            "follows": [{"url": "dat://a"}, "junk", {"url": "dat://b"}]
        }))
        .unwrap();
        assert!(doc.remove_follow("dat://a/"));
        assert!(!doc.remove_follow("dat://a"));
        assert_eq!(doc.get("follows"), Some(&json!(["junk", {"url": "dat://b"}])));
    }

    #[test]
    fn remove_follow_drops_malformed_record_by_exact_text() {
        let mut doc = Document::from_value(json!({
            "follows": [{"url": "not a url"}, {"url": "also bad"}, {"url": "dat://b"}]
        }))
        .unwrap();
        assert!(!doc.follows_site("not a url"));
        assert!(doc.remove_follow("not a url"));
        assert!(!doc.remove_follow("not a"));
        assert_eq!(
            doc.get("follows"),
            Some(&json!([{"url": "also bad"}, {"url": "dat://b"}]))
        );
    }

    #[test]
    fn unknown_fields_survive_roundtrip() {
        let raw = json!({"name": "alice", "x-custom": {"deep": [1, 2]}, "follows": []});
        let mut doc = Document::from_value(raw.clone()).unwrap();
        doc.add_follow(&site("dat://b"));
        doc.remove_follow("dat://b");
        assert_eq!(doc.into_value(), raw);
    }

    proptest! {
        #[test]
        fn repeated_follow_leaves_one_record(
            hosts in proptest::collection::vec("[a-c]", 1..20),
        ) {
            let mut doc = Document::new();
            for host in &hosts {
                doc.add_follow(&site(&format!("dat://{host}/")));
            }
            for host in &hosts {
                let url = format!("dat://{host}");
                let count = doc.follows().iter().filter(|r| same_site(&r.url, &url)).count();
                prop_assert_eq!(count, 1);
            }
        }

        #[test]
        fn follow_then_unfollow_restores(
            existing in proptest::collection::btree_set("[a-f]{1,4}", 0..6),
            target in "[g-k]{1,4}",
        ) {
            let follows: Vec<Value> = existing
                .iter()
                .map(|h| json!({"url": format!("dat://{h}")}))
                .collect();
            let original = Document::from_value(json!({"follows": follows})).unwrap();
            let mut doc = original.clone();
            let url = site(&format!("dat://{target}"));
            prop_assert!(doc.add_follow(&url));
            prop_assert!(doc.follows_site(url.as_str()));
            prop_assert!(doc.remove_follow(url.as_str()));
            prop_assert_eq!(doc, original);
        }
    }
}
