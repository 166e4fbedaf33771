use std::collections::{BTreeMap, HashSet};
use std::fmt;

/// Provider-qualified identifier for one backend model (for example
/// `meta.llama-3.3-70b-instruct`).
#[derive(
    Clone,
    Debug,
    Default,
    Eq,
    PartialEq,
    Hash,
    Ord,
    PartialOrd,
    serde::Serialize,
    serde::Deserialize,
)]
#[serde(transparent)]
pub struct ModelKey(pub String);

impl ModelKey {
    /// Creates a model key from any string-like value.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Returns the key as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ModelKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ModelKey {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for ModelKey {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

/// Server-assigned prompt identifier.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct PromptId(pub i64);

impl fmt::Display for PromptId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Models chosen for one submission.
///
/// Keeps caller order and drops duplicates. Immutable once built so the
/// completion check always runs against the set that was requested.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct SelectionSet {
    keys: Vec<ModelKey>,
}

impl SelectionSet {
    /// Builds a selection from keys, ignoring blank keys and repeats.
    pub fn new<I, K>(keys: I) -> Self
    where
        I: IntoIterator<Item = K>,
        K: Into<ModelKey>,
    {
        let mut seen = HashSet::new();
        let mut ordered = Vec::new();
        for key in keys {
            let key = key.into();
            if key.as_str().trim().is_empty() {
                continue;
            }
            if seen.insert(key.clone()) {
                ordered.push(key);
            }
        }
        Self { keys: ordered }
    }

    pub fn contains(&self, key: &ModelKey) -> bool {
        self.keys.contains(key)
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ModelKey> {
        self.keys.iter()
    }
}

/// Provider group name to ordered model keys, as returned by `GET /api/models`.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct ModelCatalog(pub BTreeMap<String, Vec<ModelKey>>);

impl ModelCatalog {
    /// All keys across groups, groups in name order.
    pub fn all_keys(&self) -> Vec<ModelKey> {
        self.0.values().flatten().cloned().collect()
    }

    /// Selects every key in the catalog.
    pub fn select_all(&self) -> SelectionSet {
        SelectionSet::new(self.all_keys())
    }

    pub fn contains(&self, key: &ModelKey) -> bool {
        self.0.values().any(|keys| keys.contains(key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selection_drops_duplicates_and_blanks_keeping_order() {
        let selection = SelectionSet::new(["b.two", "a.one", "b.two", "  "]);
        let keys: Vec<&str> = selection.iter().map(ModelKey::as_str).collect();
        assert_eq!(keys, vec!["b.two", "a.one"]);
        assert_eq!(selection.len(), 2);
    }

    #[test]
    fn catalog_deserializes_from_group_map() {
        let catalog: ModelCatalog = serde_json::from_value(serde_json::json!({
            "meta": ["meta.llama-3"],
            "cohere": ["cohere.command-r", "cohere.command-a"]
        }))
        .expect("catalog");
        let all: Vec<String> = catalog.all_keys().into_iter().map(|k| k.0).collect();
        assert_eq!(all, vec!["cohere.command-r", "cohere.command-a", "meta.llama-3"]);
        assert!(catalog.contains(&ModelKey::new("meta.llama-3")));
        assert_eq!(catalog.select_all().len(), 3);
    }
}
