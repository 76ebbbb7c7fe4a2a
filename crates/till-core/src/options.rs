//! # Option Bags
//!
//! Free-form, string-keyed metadata attached to entries and modifiers
//! (size, color, engraving text, ...). Every value in the bag is
//! identity-relevant except the `quantity` key, which is always skipped
//! when an identity hash is computed.
//!
//! Well-known fields (quantity, price, taxable, tax) never live in the bag;
//! they are typed fields on [`crate::entry::CartEntry`] and
//! [`crate::modifier::Modifier`] and are validated on write.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Key that never participates in identity computation.
pub const QUANTITY_KEY: &str = "quantity";

/// String-keyed metadata map. Insertion order is irrelevant.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OptionBag(BTreeMap<String, Value>);

impl OptionBag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Sets a value, returning the previous one.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(key.into(), value.into())
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.0.remove(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    /// Identity-relevant pairs: sorted by key, `quantity` removed, nested
    /// objects rewritten with sorted keys and rendered as compact JSON.
    pub fn canonical_pairs(&self) -> Vec<(&str, String)> {
        self.0
            .iter()
            .filter(|(key, _)| key.as_str() != QUANTITY_KEY)
            .map(|(key, value)| (key.as_str(), canonical_value(value).to_string()))
            .collect()
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for OptionBag {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        OptionBag(
            iter.into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        )
    }
}

/// Rebuilds objects with sorted keys regardless of the map backend
/// serde_json was compiled with.
fn canonical_value(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let sorted: BTreeMap<&String, Value> =
                map.iter().map(|(k, v)| (k, canonical_value(v))).collect();
            let mut out = Map::new();
            for (key, value) in sorted {
                out.insert(key.clone(), value);
            }
            Value::Object(out)
        }
        Value::Array(items) => Value::Array(items.iter().map(canonical_value).collect()),
        other => other.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_set_get_remove() {
        let mut bag = OptionBag::new();
        assert!(bag.is_empty());

        assert_eq!(bag.set("size", "L"), None);
        assert_eq!(bag.set("size", "XL"), Some(json!("L")));
        assert_eq!(bag.get("size"), Some(&json!("XL")));
        assert!(bag.contains("size"));
        assert_eq!(bag.len(), 1);

        assert_eq!(bag.remove("size"), Some(json!("XL")));
        assert!(bag.get("size").is_none());
    }

    #[test]
    fn test_canonical_pairs_skip_quantity_and_sort() {
        let bag: OptionBag = [("color", json!("red")), ("quantity", json!(4)), ("a", json!(1))]
            .into_iter()
            .collect();

        let pairs = bag.canonical_pairs();
        let keys: Vec<&str> = pairs.iter().map(|(k, _)| *k).collect();
        assert_eq!(keys, vec!["a", "color"]);
    }

    #[test]
    fn test_canonical_pairs_ignore_insertion_order() {
        let mut first = OptionBag::new();
        first.set("size", "L");
        first.set("color", json!({ "primary": "red", "accent": "blue" }));

        let mut second = OptionBag::new();
        second.set("color", json!({ "accent": "blue", "primary": "red" }));
        second.set("size", "L");

        assert_eq!(first.canonical_pairs(), second.canonical_pairs());
    }

    #[test]
    fn test_serde_transparent() {
        let mut bag = OptionBag::new();
        bag.set("gift", true);
        let text = serde_json::to_string(&bag).unwrap();
        assert_eq!(text, r#"{"gift":true}"#);
        let back: OptionBag = serde_json::from_str(&text).unwrap();
        assert_eq!(back, bag);
    }
}
