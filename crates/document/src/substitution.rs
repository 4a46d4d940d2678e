//! Field substitution: replace every occurrence of one field id by a
//! sequence of fixed text and other fields.
//!
//! Untransformed occurrences are rewritten in place. A transformation
//! cannot be split across several fields, so transformed occurrences only
//! accept a substitution that is exactly one field; that one is applied by
//! renaming the id (in the command anchor or in the function definition).

use std::collections::BTreeSet;
use std::sync::Arc;

use formdoc_core::ConfigNode;
use formdoc_eval::{rename_value_refs, Function};
use formdoc_storage::PersistentData;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::commands::{insert_form_value_anchor, parse_command};
use crate::diagnostics::Diagnostic;
use crate::error::{DocumentError, ModelError};
use crate::fields::{FieldAnchor, FieldHandle};
use crate::host::{Span, TextDocument, TextFieldKind};
use crate::model::DocumentModel;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SubstitutionPart {
    FixedText(String),
    Field(String),
}

impl SubstitutionPart {
    /// How the part appears in freshly inserted text.
    fn placeholder(&self) -> String {
        match self {
            SubstitutionPart::FixedText(t) => t.clone(),
            SubstitutionPart::Field(id) => format!("<{}>", id),
        }
    }
}

/// Split `"<Vorname> <Nachname>"` into fields and fixed text. A `<` without
/// a closing `>` is plain text.
pub fn parse_pattern(pattern: &str) -> Vec<SubstitutionPart> {
    let mut parts = Vec::new();
    let mut text = String::new();
    let mut rest = pattern;
    while let Some(open) = rest.find('<') {
        let Some(len) = rest[open + 1..].find('>') else {
            break;
        };
        text.push_str(&rest[..open]);
        if !text.is_empty() {
            parts.push(SubstitutionPart::FixedText(std::mem::take(&mut text)));
        }
        parts.push(SubstitutionPart::Field(rest[open + 1..open + 1 + len].to_owned()));
        rest = &rest[open + len + 2..];
    }
    text.push_str(rest);
    if !text.is_empty() {
        parts.push(SubstitutionPart::FixedText(text));
    }
    parts
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SubstitutionSummary {
    /// Untransformed occurrences rewritten.
    pub replaced: usize,
    /// Transformed occurrences whose id was renamed.
    pub renamed: usize,
    /// Transformed occurrences left alone.
    pub rejected: usize,
}

impl<D: TextDocument, S: PersistentData> DocumentModel<D, S> {
    /// Replace field `id` everywhere by `parts`. An empty substitution does
    /// nothing. Occurrences that cannot be substituted are reported and
    /// skipped; the rest proceeds.
    pub fn substitute(&mut self, id: &str, parts: &[SubstitutionPart]) -> SubstitutionSummary {
        let mut summary = SubstitutionSummary::default();
        if parts.is_empty() {
            return summary;
        }
        let one_to_one = match parts {
            [SubstitutionPart::Field(f)] => Some(f.as_str()),
            _ => None,
        };

        let handles = self.fields.handles_for(id);
        let mut descriptor_changed = false;
        for handle in handles.iter().filter(|h| h.is_transformed()) {
            let Some(new_id) = one_to_one else {
                self.report(Diagnostic::with_cause(
                    "cannot substitute a transformed field",
                    ModelError::NotOneToOne { id: id.to_owned() },
                ));
                summary.rejected += 1;
                continue;
            };
            match self.rename_transformed(handle, id, new_id) {
                Ok(true) => {
                    summary.renamed += 1;
                    descriptor_changed |= !matches!(handle.anchor(), FieldAnchor::Bookmark(_));
                }
                Ok(false) => {}
                Err(e) => self.report(Diagnostic::with_cause(
                    format!("cannot rename field '{}' to '{}'", id, new_id),
                    e,
                )),
            }
        }
        if descriptor_changed {
            self.store_descriptor();
        }

        // The replacement goes in right behind the old content before that
        // is disposed, so a failed insertion leaves the field intact.
        for handle in handles.iter().filter(|h| !h.is_transformed()) {
            let native = !matches!(handle.anchor(), FieldAnchor::Bookmark(_));
            let Some(span) = handle.span(&self.doc) else {
                continue;
            };
            if let Err(e) = self.insert_parts(span.end, parts, native) {
                self.report(Diagnostic::with_cause(
                    format!("cannot substitute field '{}'", id),
                    e,
                ));
                continue;
            }
            if handle.dispose(&mut self.doc).is_some() {
                summary.replaced += 1;
            }
        }

        self.commands.update(&self.doc);
        self.collect_fields();
        self.set_value(id, None);
        let new_ids: BTreeSet<&str> = parts
            .iter()
            .filter_map(|p| match p {
                SubstitutionPart::Field(f) => Some(f.as_str()),
                SubstitutionPart::FixedText(_) => None,
            })
            .collect();
        for new_id in new_ids {
            self.update_fields(new_id);
        }
        debug!(id, ?summary, "substituted field");
        summary
    }

    /// Point one transformed occurrence at `new_id`. Returns whether
    /// anything changed.
    fn rename_transformed(
        &mut self,
        handle: &Arc<FieldHandle>,
        id: &str,
        new_id: &str,
    ) -> Result<bool, ModelError> {
        match handle.anchor() {
            FieldAnchor::Bookmark(name) => {
                let span = self
                    .doc
                    .anchor_span(name)
                    .ok_or_else(|| DocumentError::AnchorNotFound { name: name.clone() })?;
                let (mut wm, _) = parse_command(name)?;
                if let Some(node) = wm.child_mut("ID") {
                    *node = ConfigNode::pair("ID", new_id);
                }
                self.doc.insert_anchor(&wm.to_conf_string(), span)?;
                self.doc.remove_anchor(name)?;
                Ok(true)
            }
            FieldAnchor::UserField(_) | FieldAnchor::DatabaseField(_) => {
                let Some(trafo) = handle.trafo() else {
                    return Ok(false);
                };
                let Some(definition) = self.descriptor_mut().function_definition_mut(trafo) else {
                    error!(trafo, "transformation is not defined in this document");
                    return Err(ModelError::Unavailable {
                        name: trafo.to_owned(),
                    });
                };
                if rename_value_refs(definition, id, new_id) == 0 {
                    return Ok(false);
                }
                let definition = definition.clone();
                let function = Function::parse(&definition, &self.functions)?;
                self.functions.add(trafo, function);
                Ok(true)
            }
        }
    }

    /// Insert the text of `parts` at `at` and bind its field placeholders,
    /// either with `insertFormValue` anchors or with mail-merge fields.
    fn insert_parts(
        &mut self,
        at: usize,
        parts: &[SubstitutionPart],
        native: bool,
    ) -> Result<(), ModelError> {
        let text: String = parts.iter().map(SubstitutionPart::placeholder).collect();
        self.doc.replace(Span::at(at), &text)?;

        let mut placed = Vec::new();
        let mut pos = at;
        for part in parts {
            let len = part.placeholder().chars().count();
            if let SubstitutionPart::Field(f) = part {
                placed.push((f.as_str(), Span::new(pos, pos + len)));
            }
            pos += len;
        }
        // Back to front, so replacing placeholders by one-unit fields keeps
        // the earlier spans valid.
        for (field, span) in placed.into_iter().rev() {
            if native {
                let content = self.doc.text_in(span)?;
                self.doc.replace(span, "")?;
                self.doc
                    .insert_text_field(span.start, TextFieldKind::Database(field.to_owned()), &content)?;
            } else {
                self.doc.insert_anchor(&insert_form_value_anchor(field), span)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn patterns_split_into_fields_and_text() {
        assert_eq!(
            parse_pattern("<Vorname> <Nachname>"),
            vec![
                SubstitutionPart::Field("Vorname".into()),
                SubstitutionPart::FixedText(" ".into()),
                SubstitutionPart::Field("Nachname".into()),
            ]
        );
        assert_eq!(
            parse_pattern("a <b"),
            vec![SubstitutionPart::FixedText("a <b".into())]
        );
        assert!(parse_pattern("").is_empty());
    }

    #[test]
    fn parts_use_camel_case_tags() {
        let json = serde_json::to_string(&SubstitutionPart::FixedText("x".into())).unwrap();
        assert_eq!(json, r#"{"fixedText":"x"}"#);
    }
}
