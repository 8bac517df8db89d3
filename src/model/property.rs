//! Properties and their metadata.
//!
//! A property is identified by the triple `(key, name, visibility)`. Several
//! properties may share a name: they differ by key (multivalued properties)
//! or by visibility (independent versions of the same fact).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use super::Value;
use crate::visibility::{Authorizations, Visibility};

/// Key used by single-valued properties.
pub const DEFAULT_KEY: &str = "";

// ============================================================================
// Metadata
// ============================================================================

/// A metadata value together with the visibility that gates it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetadataEntry {
    pub value: Value,
    pub visibility: Visibility,
}

/// Metadata attached to a property: name → (value, visibility).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    entries: BTreeMap<String, MetadataEntry>,
}

impl Metadata {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>, visibility: &Visibility) -> Self {
        self.insert(name, value, visibility);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>, visibility: &Visibility) {
        self.entries.insert(
            name.into(),
            MetadataEntry { value: value.into(), visibility: visibility.clone() },
        );
    }

    pub fn get(&self, name: &str) -> Option<&MetadataEntry> {
        self.entries.get(name)
    }

    pub fn value(&self, name: &str) -> Option<&Value> {
        self.entries.get(name).map(|e| &e.value)
    }

    pub fn remove(&mut self, name: &str) -> Option<MetadataEntry> {
        self.entries.remove(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &MetadataEntry)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries readable under `authorizations`.
    pub fn filtered(&self, authorizations: &Authorizations) -> Metadata {
        Metadata {
            entries: self
                .entries
                .iter()
                .filter(|(_, e)| e.visibility.can_read(authorizations))
                .map(|(k, e)| (k.clone(), e.clone()))
                .collect(),
        }
    }
}

impl FromIterator<(String, MetadataEntry)> for Metadata {
    fn from_iter<I: IntoIterator<Item = (String, MetadataEntry)>>(iter: I) -> Self {
        Self { entries: iter.into_iter().collect() }
    }
}

// ============================================================================
// Property
// ============================================================================

/// A single visibility-scoped property value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Property {
    key: String,
    name: String,
    value: Value,
    visibility: Visibility,
    metadata: Metadata,
    hidden_visibilities: SmallVec<[Visibility; 1]>,
}

impl Property {
    pub fn new(
        key: impl Into<String>,
        name: impl Into<String>,
        value: impl Into<Value>,
        visibility: Visibility,
    ) -> Self {
        Self {
            key: key.into(),
            name: name.into(),
            value: value.into(),
            visibility,
            metadata: Metadata::new(),
            hidden_visibilities: SmallVec::new(),
        }
    }

    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    pub fn visibility(&self) -> &Visibility {
        &self.visibility
    }

    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    pub fn hidden_visibilities(&self) -> &[Visibility] {
        &self.hidden_visibilities
    }

    /// True iff any hidden visibility is satisfied by `authorizations`.
    pub fn is_hidden(&self, authorizations: &Authorizations) -> bool {
        self.hidden_visibilities.iter().any(|v| v.can_read(authorizations))
    }

    /// Readable and not hidden under `authorizations`.
    pub fn is_visible(&self, authorizations: &Authorizations) -> bool {
        self.visibility.can_read(authorizations) && !self.is_hidden(authorizations)
    }

    pub fn matches(&self, key: &str, name: &str) -> bool {
        self.key == key && self.name == name
    }

    pub fn matches_triple(&self, key: &str, name: &str, visibility: &Visibility) -> bool {
        self.matches(key, name) && &self.visibility == visibility
    }

    pub(crate) fn add_hidden_visibility(&mut self, visibility: Visibility) {
        if !self.hidden_visibilities.contains(&visibility) {
            self.hidden_visibilities.push(visibility);
        }
    }

    pub(crate) fn remove_hidden_visibility(&mut self, visibility: &Visibility) {
        self.hidden_visibilities.retain(|v| v != visibility);
    }

    pub(crate) fn set_value(&mut self, value: Value) {
        self.value = value;
    }

    pub(crate) fn value_mut(&mut self) -> &mut Value {
        &mut self.value
    }

    pub(crate) fn set_visibility(&mut self, visibility: Visibility) {
        self.visibility = visibility;
    }

    pub(crate) fn metadata_mut(&mut self) -> &mut Metadata {
        &mut self.metadata
    }

    pub(crate) fn set_hidden_visibilities(&mut self, hidden: impl IntoIterator<Item = Visibility>) {
        self.hidden_visibilities = hidden.into_iter().collect();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vis(s: &str) -> Visibility {
        Visibility::new(s).unwrap()
    }

    #[test]
    fn test_hidden_under_any_satisfied_marker() {
        let mut p = Property::new(DEFAULT_KEY, "name", "joe", vis("a"));
        let a = Authorizations::new(["a"]);
        let ab = Authorizations::new(["a", "b"]);
        assert!(p.is_visible(&ab));

        p.add_hidden_visibility(vis("b"));
        p.add_hidden_visibility(vis("b"));
        assert_eq!(p.hidden_visibilities().len(), 1);
        assert!(!p.is_hidden(&a));
        assert!(p.is_hidden(&ab));
        assert!(!p.is_visible(&ab));

        p.remove_hidden_visibility(&vis("b"));
        assert!(p.is_visible(&ab));
    }

    #[test]
    fn test_metadata_filtered() {
        let md = Metadata::new()
            .with("source", "wiki", &vis("a"))
            .with("confidence", 0.5, &vis("b"));
        let seen = md.filtered(&Authorizations::new(["a"]));
        assert_eq!(seen.len(), 1);
        assert_eq!(seen.value("source"), Some(&Value::from("wiki")));
        assert!(seen.get("confidence").is_none());
    }

    #[test]
    fn test_triple_identity() {
        let p = Property::new("k1", "prop", 1, vis("a"));
        assert!(p.matches_triple("k1", "prop", &vis("a")));
        assert!(!p.matches_triple("k1", "prop", &vis("b")));
        assert!(!p.matches("k2", "prop"));
    }
}
