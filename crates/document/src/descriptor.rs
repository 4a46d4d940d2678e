//! The form description: `WM(Formular(...) ...)`.
//!
//! Each `Formular` section may carry `Fenster` (window layout and fields),
//! `Sichtbarkeit` (visibility conditions) and `Funktionen` (document-local
//! transformations). Several `Formular` sections are allowed; they
//! accumulate as forms are merged into a document.

use formdoc_core::{parse, ConfigNode};
use formdoc_storage::{DataId, PersistentData, StorageError};
use tracing::{debug, error};

const ROOT: &str = "WM";
const FORMULAR: &str = "Formular";
const FUNKTIONEN: &str = "Funktionen";
/// Sections whose presence with content makes a description worth storing.
const MEANINGFUL: [&str; 3] = ["Fenster", "Sichtbarkeit", FUNKTIONEN];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormDescriptor {
    root: ConfigNode,
}

impl Default for FormDescriptor {
    fn default() -> Self {
        FormDescriptor {
            root: ConfigNode::new(ROOT),
        }
    }
}

impl FormDescriptor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from the persisted blob, if any.
    pub fn load(blob: Option<&str>) -> Self {
        let mut desc = FormDescriptor::new();
        if let Some(blob) = blob {
            desc.merge(blob);
        }
        desc
    }

    /// Read the blob of `data`. A storage failure is logged and treated as
    /// an absent blob.
    pub fn load_from(data: &dyn PersistentData) -> Self {
        match data.get(DataId::FormDescription) {
            Ok(blob) => FormDescriptor::load(blob.as_deref()),
            Err(e) => {
                error!(error = %e, "cannot read form description");
                FormDescriptor::new()
            }
        }
    }

    /// Parse `text` and append every `Formular` section it contains.
    /// Empty text is ignored; unparsable text is logged and ignored.
    /// Returns how many sections were added.
    pub fn merge(&mut self, text: &str) -> usize {
        if text.trim().is_empty() {
            return 0;
        }
        let conf = match parse("Formularbeschreibung", text) {
            Ok(c) => c,
            Err(e) => {
                error!(error = %e, "form description is malformed");
                return 0;
            }
        };
        let sections: Vec<ConfigNode> = conf.query(FORMULAR).into_iter().cloned().collect();
        let added = sections.len();
        for s in sections {
            self.root.add(s);
        }
        debug!(added, "merged form description");
        added
    }

    pub fn root(&self) -> &ConfigNode {
        &self.root
    }

    /// Replace everything; `None` clears the description.
    pub fn replace(&mut self, root: Option<ConfigNode>) {
        self.root = root.unwrap_or_else(|| ConfigNode::new(ROOT));
    }

    /// True if the last of any recognised section has children.
    pub fn is_meaningful(&self) -> bool {
        MEANINGFUL
            .iter()
            .any(|name| self.root.get(name).is_ok_and(|n| n.count() > 0))
    }

    /// The blob to persist, or `None` when the description is empty.
    pub fn to_blob(&self) -> Option<String> {
        if self.is_meaningful() {
            Some(self.root.to_conf_string())
        } else {
            None
        }
    }

    /// Persist, deleting the blob when there is nothing worth storing.
    pub fn store(&self, data: &mut dyn PersistentData) -> Result<(), StorageError> {
        match self.to_blob() {
            Some(blob) => data.set(DataId::FormDescription, &blob),
            None => data.remove(DataId::FormDescription),
        }
    }

    // ──────────────────────────────────────────────
    // Functions
    // ──────────────────────────────────────────────

    /// Every function definition, in section order.
    pub fn function_definitions(&self) -> Vec<&ConfigNode> {
        self.root
            .children()
            .iter()
            .filter(|f| f.name == FORMULAR)
            .flat_map(|f| f.children().iter().filter(|s| s.name == FUNKTIONEN))
            .flat_map(|s| s.children().iter())
            .collect()
    }

    /// The last definition named `name`.
    pub fn function_definition(&self, name: &str) -> Option<&ConfigNode> {
        self.function_definitions()
            .into_iter()
            .filter(|d| d.name == name)
            .last()
    }

    pub fn function_definition_mut(&mut self, name: &str) -> Option<&mut ConfigNode> {
        self.root
            .children
            .iter_mut()
            .filter(|f| f.name == FORMULAR)
            .flat_map(|f| f.children.iter_mut().filter(|s| s.name == FUNKTIONEN))
            .flat_map(|s| s.children.iter_mut())
            .filter(|d| d.name == name)
            .last()
    }

    /// Appends `definition` to the last `Funktionen` section, creating the
    /// section (and a `Formular` section) when there is none.
    pub fn add_function(&mut self, definition: ConfigNode) {
        let sections = self.root.children();
        let target = sections
            .iter()
            .rposition(|f| f.name == FORMULAR && f.child(FUNKTIONEN).is_some())
            .or_else(|| sections.iter().rposition(|f| f.name == FORMULAR));
        let formular = match target {
            Some(i) => &mut self.root.children[i],
            None => self.root.add(ConfigNode::new(FORMULAR)),
        };
        formular.child_or_insert(FUNKTIONEN).add(definition);
    }

    /// Removes every definition for which `unused` holds. Returns the
    /// names removed.
    pub fn remove_functions(&mut self, unused: impl Fn(&str) -> bool) -> Vec<String> {
        let mut removed = Vec::new();
        for formular in self.root.children.iter_mut().filter(|f| f.name == FORMULAR) {
            for section in formular.children.iter_mut().filter(|s| s.name == FUNKTIONEN) {
                section.children.retain(|d| {
                    if unused(&d.name) {
                        removed.push(d.name.clone());
                        false
                    } else {
                        true
                    }
                });
            }
        }
        removed
    }

    /// Whether any `Formular` section has a `Fenster` section.
    pub fn has_window(&self) -> bool {
        self.root
            .children()
            .iter()
            .any(|f| f.name == FORMULAR && f.child("Fenster").is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use formdoc_storage::MemoryStore;

    #[test]
    fn empty_description_is_not_persisted() {
        let mut data = MemoryStore::new();
        data.set(DataId::FormDescription, "stale").unwrap();
        let mut desc = FormDescriptor::load(Some("WM(Formular(TITLE 'x' Funktionen()))"));
        assert!(!desc.is_meaningful());
        desc.store(&mut data).unwrap();
        assert_eq!(data.get(DataId::FormDescription).unwrap(), None);

        desc.add_function(parse("t", "F('x')").unwrap().children()[0].clone());
        desc.store(&mut data).unwrap();
        let blob = data.get(DataId::FormDescription).unwrap().unwrap();
        assert_eq!(FormDescriptor::load(Some(&blob)), desc);

        desc.remove_functions(|n| n == "F");
        desc.store(&mut data).unwrap();
        assert_eq!(data.get(DataId::FormDescription).unwrap(), None);
    }

    #[test]
    fn the_last_section_decides() {
        let desc = FormDescriptor::load(Some(
            "WM(Formular(Fenster(Tab(TITLE 'a'))) Formular(Fenster()))",
        ));
        assert!(!desc.is_meaningful());
        assert!(desc.has_window());
    }

    #[test]
    fn merge_keeps_only_formular_sections() {
        let mut desc = FormDescriptor::new();
        assert_eq!(desc.merge("WM(Formular(Sichtbarkeit(G('true'))) Anderes('x'))"), 1);
        assert_eq!(desc.merge(""), 0);
        assert_eq!(desc.merge("WM(Formular("), 0);
        assert_eq!(desc.root().count(), 1);
        assert!(desc.is_meaningful());
    }

    #[test]
    fn function_lookup_takes_the_last_definition() {
        let mut desc = FormDescriptor::load(Some(
            "WM(Formular(Funktionen(F('1') G('g'))) Formular(Funktionen(F('2'))))",
        ));
        assert_eq!(desc.function_definitions().len(), 3);
        assert_eq!(desc.function_definition("F").unwrap().value(), "2");
        desc.function_definition_mut("G").unwrap().children_mut()[0].name = "h".into();
        assert_eq!(desc.function_definition("G").unwrap().value(), "h");
        assert!(desc.function_definition("H").is_none());

        desc.add_function(ConfigNode::pair("Neu", "n"));
        let last_section = desc.root().children()[1].child(FUNKTIONEN).unwrap();
        assert_eq!(last_section.count(), 2);
    }
}
