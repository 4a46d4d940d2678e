//! The authoritative field values of a document.
//!
//! Values persist as `WM(Formularwerte((ID 'id' VALUE 'value') ...))`.

use std::collections::BTreeMap;

use formdoc_core::{parse, ConfigError, ConfigNode};
use formdoc_eval::ValueProvider;
use tracing::error;

/// Preset value reported when the document's fields disagree.
pub const FISHY: &str = "!!!FISHY!!!";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValueStore {
    values: BTreeMap<String, String>,
}

impl ValueStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read a persisted blob. A malformed blob is logged and yields an
    /// empty store; malformed entries are logged and skipped.
    pub fn from_blob(blob: Option<&str>) -> Self {
        let mut store = ValueStore::new();
        let Some(blob) = blob else {
            return store;
        };
        let section = match parse_section(blob) {
            Ok(s) => s,
            Err(e) => {
                error!(error = %e, "form values blob is malformed");
                return store;
            }
        };
        for entry in section.children() {
            match (entry.get("ID"), entry.get("VALUE")) {
                (Ok(id), Ok(value)) => {
                    store.values.insert(id.value(), value.value());
                }
                (Err(e), _) | (_, Err(e)) => {
                    error!(entry = %entry, error = %e, "skipping malformed form value");
                }
            }
        }
        store
    }

    pub fn to_blob(&self) -> String {
        let mut section = ConfigNode::new("Formularwerte");
        for (id, value) in &self.values {
            section.add(ConfigNode::with_children(
                "",
                vec![ConfigNode::pair("ID", id), ConfigNode::pair("VALUE", value)],
            ));
        }
        ConfigNode::with_children("WM", vec![section]).to_conf_string()
    }

    pub fn get(&self, id: &str) -> Option<&str> {
        self.values.get(id).map(String::as_str)
    }

    /// The value, or `""` for an id that was never set.
    pub fn get_or_empty(&self, id: &str) -> &str {
        self.get(id).unwrap_or("")
    }

    pub fn contains(&self, id: &str) -> bool {
        self.values.contains_key(id)
    }

    /// `None` removes the entry.
    pub fn set(&mut self, id: &str, value: Option<&str>) {
        match value {
            Some(v) => {
                self.values.insert(id.to_owned(), v.to_owned());
            }
            None => {
                self.values.remove(id);
            }
        }
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn as_map(&self) -> &BTreeMap<String, String> {
        &self.values
    }
}

impl ValueProvider for ValueStore {
    fn value(&self, id: &str) -> Option<String> {
        self.values.get(id).cloned()
    }
}

fn parse_section(blob: &str) -> Result<ConfigNode, ConfigError> {
    let root = parse("Formularwerte", blob)?;
    Ok(root.get("WM")?.get("Formularwerte")?.clone())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blob_round_trip_keeps_special_characters() {
        let mut store = ValueStore::new();
        store.set("Nachname", Some("Meier"));
        store.set("Zitat", Some("it's 100%\nsure"));
        store.set("Leer", Some(""));
        let blob = store.to_blob();
        assert!(blob.starts_with("WM(Formularwerte("));
        assert_eq!(ValueStore::from_blob(Some(&blob)), store);
    }

    #[test]
    fn none_removes_and_missing_reads_empty() {
        let mut store = ValueStore::new();
        store.set("A", Some("1"));
        store.set("A", None);
        assert!(!store.contains("A"));
        assert_eq!(store.get_or_empty("A"), "");
        assert!(ValueStore::from_blob(Some(&store.to_blob())).is_empty());
    }

    #[test]
    fn malformed_entries_are_skipped() {
        let store = ValueStore::from_blob(Some(
            "WM(Formularwerte((ID 'A' VALUE 'a') (ID 'B') (ID 'C' VALUE 'c')))",
        ));
        assert_eq!(store.len(), 2);
        assert_eq!(store.get("C"), Some("c"));

        assert!(ValueStore::from_blob(Some("WM(Formularwerte(")).is_empty());
        assert!(ValueStore::from_blob(Some("Anderes('x')")).is_empty());
        assert!(ValueStore::from_blob(None).is_empty());
    }
}
