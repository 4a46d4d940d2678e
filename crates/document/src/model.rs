//! The document model: one open form document and everything derived
//! from it.
//!
//! A [`DocumentModel`] owns the host document, its persisted blobs, the
//! command tree, the field registry, the value store, the form descriptor
//! and the document-local function library. Callers serialize access to it
//! (see [`crate::manager::DocumentManager`]); nothing in here is shared.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use formdoc_core::{parse, ConfigNode};
use formdoc_eval::{Function, FunctionLibrary};
use formdoc_storage::{DataId, PersistentData};
use serde::Serialize;
use tracing::{debug, error, trace};

use crate::commands::{
    is_command_anchor, parse_command, user_field_function, user_field_master, CommandKind,
    CommandTree, PrintBlockKind, UpdateSummary,
};
use crate::descriptor::FormDescriptor;
use crate::diagnostics::{Diagnostic, DiagnosticSink};
use crate::error::ModelError;
use crate::fields::{FieldAnchor, FieldHandle, FieldKind, FieldRegistry};
use crate::gc::AUTOFUNCTION_PREFIX;
use crate::host::{Span, TextDocument, TextFieldId, TextFieldKind};
use crate::print::{parse_print_functions, print_functions_blob};
use crate::values::{ValueStore, FISHY};

const FORM_DOCUMENT: &str = "formDocument";

/// A field id used in the document but missing from a schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReferencedFieldId {
    pub id: String,
    /// Whether any field showing the id carries a transformation.
    pub transformed: bool,
}

pub struct DocumentModel<D, S> {
    pub(crate) doc: D,
    pub(crate) data: S,
    pub(crate) commands: CommandTree,
    pub(crate) fields: FieldRegistry,
    pub(crate) values: ValueStore,
    /// Loaded on first access.
    pub(crate) descriptor: Option<FormDescriptor>,
    pub(crate) functions: FunctionLibrary,
    local_functions_loaded: bool,
    pub(crate) diagnostics: Arc<dyn DiagnosticSink>,
    preview_mode: bool,
    doc_type: Option<String>,
    print_functions: BTreeSet<String>,
    invisible_groups: BTreeSet<String>,
    override_frags: BTreeMap<String, String>,
}

impl<D: TextDocument, S: PersistentData> DocumentModel<D, S> {
    /// Wrap a document without interpreting its commands yet. Reads the
    /// document type, print functions and field values from `data`.
    pub fn new(
        doc: D,
        data: S,
        global: Arc<FunctionLibrary>,
        diagnostics: Arc<dyn DiagnosticSink>,
    ) -> Self {
        let doc_type = read_blob(&data, DataId::SetType);
        let print_functions = read_blob(&data, DataId::PrintFunction)
            .map(|b| parse_print_functions(&b))
            .unwrap_or_default();
        let values = ValueStore::from_blob(read_blob(&data, DataId::FormValues).as_deref());

        let mut model = DocumentModel {
            doc,
            data,
            commands: CommandTree::new(),
            fields: FieldRegistry::new(),
            values,
            descriptor: None,
            functions: FunctionLibrary::with_parent(global),
            local_functions_loaded: false,
            diagnostics,
            preview_mode: true,
            doc_type,
            print_functions,
            invisible_groups: BTreeSet::new(),
            override_frags: BTreeMap::new(),
        };
        model.commands.update(&model.doc);
        model
    }

    /// [`DocumentModel::new`] followed by [`DocumentModel::scan`].
    pub fn open(
        doc: D,
        data: S,
        global: Arc<FunctionLibrary>,
        diagnostics: Arc<dyn DiagnosticSink>,
    ) -> Self {
        let mut model = DocumentModel::new(doc, data, global, diagnostics);
        model.scan();
        model
    }

    pub fn into_parts(self) -> (D, S) {
        (self.doc, self.data)
    }

    pub fn doc(&self) -> &D {
        &self.doc
    }

    pub fn doc_mut(&mut self) -> &mut D {
        &mut self.doc
    }

    pub fn data(&self) -> &S {
        &self.data
    }

    pub fn commands(&self) -> &CommandTree {
        &self.commands
    }

    pub fn fields(&self) -> &FieldRegistry {
        &self.fields
    }

    pub fn values(&self) -> &ValueStore {
        &self.values
    }

    pub fn functions(&self) -> &FunctionLibrary {
        &self.functions
    }

    pub fn diagnostics(&self) -> &Arc<dyn DiagnosticSink> {
        &self.diagnostics
    }

    pub(crate) fn report(&self, diagnostic: Diagnostic) {
        self.diagnostics.report(diagnostic);
    }

    // ──────────────────────────────────────────────
    // Scanning
    // ──────────────────────────────────────────────

    /// Rescan the document: refresh the command tree, execute commands that
    /// are not done yet and rebuild the field registry.
    ///
    /// One-shot commands (`form`, `setPrintFunction`, `overrideFrag`) lose
    /// their anchor once executed, so they do not run again when the
    /// document is reopened. `setType` anchors stay as a marker.
    pub fn scan(&mut self) -> UpdateSummary {
        let summary = self.commands.update(&self.doc);
        if !self.local_functions_loaded {
            self.load_local_functions();
        }

        let pending: Vec<_> = self
            .commands
            .iter()
            .filter(|(_, c)| !c.is_done())
            .map(|(id, c)| (id, c.kind.clone(), c.anchor.clone()))
            .collect();
        for (id, kind, anchor) in pending {
            let done = match kind {
                CommandKind::Form => {
                    self.merge_form(&anchor);
                    true
                }
                CommandKind::SetType { doc_type } => {
                    if self.doc_type.is_none() {
                        self.doc_type = Some(doc_type);
                    }
                    false
                }
                CommandKind::SetPrintFunction { function } => {
                    if !self.print_functions.contains(&function) {
                        self.add_print_function(&function);
                    }
                    true
                }
                CommandKind::OverrideFrag {
                    frag_id,
                    new_frag_id,
                } => {
                    let target = new_frag_id.unwrap_or_default();
                    if let Err(e) = self.set_override_frag(&frag_id, &target) {
                        self.report(Diagnostic::with_cause(
                            format!("cannot execute '{}'", anchor),
                            e,
                        ));
                    }
                    true
                }
                CommandKind::SetGroups { groups } => {
                    let visible = !groups.iter().any(|g| self.invisible_groups.contains(g));
                    self.commands.set_visible(id, visible);
                    false
                }
                _ => false,
            };
            if done {
                self.commands.mark_done(id);
            }
        }
        let removed = self.commands.remove_done(&mut self.doc);
        if removed > 0 {
            trace!(removed, "removed executed command anchors");
        }

        self.collect_fields();
        debug!(
            commands = self.commands.len(),
            ids = self.fields.all_ids().len(),
            "document scanned"
        );
        summary
    }

    /// Merge the form description covered by a `form` command and remove
    /// the annotation text.
    fn merge_form(&mut self, anchor: &str) {
        let Some(span) = self.doc.anchor_span(anchor) else {
            trace!(anchor, "form command vanished before it ran");
            return;
        };
        let text = match self.doc.text_in(span) {
            Ok(t) => t,
            Err(e) => {
                error!(anchor, error = %e, "cannot read form description");
                return;
            }
        };
        if text.trim().is_empty() {
            self.report(Diagnostic::new(format!(
                "form command '{}' carries no form description",
                anchor
            )));
            return;
        }
        if self.descriptor_mut().merge(&text) > 0 {
            self.store_descriptor();
            self.load_local_functions();
        }
        if let Err(e) = self.doc.replace(span, "") {
            error!(anchor, error = %e, "cannot remove form description text");
        }
    }

    /// (Re)define every function of the form description in the local
    /// library. Broken definitions are logged and skipped.
    fn load_local_functions(&mut self) {
        self.descriptor_mut();
        let Some(desc) = &self.descriptor else {
            return;
        };
        let mut loaded = 0usize;
        for def in desc.function_definitions() {
            match self.functions.define(def) {
                Ok(()) => loaded += 1,
                Err(e) => {
                    error!(function = %def.name, error = %e, "skipping malformed function definition")
                }
            }
        }
        self.local_functions_loaded = true;
        debug!(loaded, "loaded document-local functions");
    }

    /// Rebuild the field registry from the command tree and the document's
    /// native text fields.
    pub(crate) fn collect_fields(&mut self) {
        self.fields.unregister_all();
        for (_, cmd) in self.commands.iter() {
            if let CommandKind::InsertFormValue { id, trafo } = &cmd.kind {
                let handle = FieldHandle::new(FieldAnchor::Bookmark(cmd.anchor.clone()), trafo.clone());
                self.fields.register(id, Arc::new(handle), FieldKind::Command);
            }
        }
        for tf in self.doc.text_fields() {
            match &tf.kind {
                TextFieldKind::User(master) => {
                    let Some(name) = user_field_function(master) else {
                        continue;
                    };
                    let Some(function) = self.functions.get(&name) else {
                        error!(field = %tf.id, trafo = %name, "field uses an undefined transformation");
                        continue;
                    };
                    let handle = Arc::new(FieldHandle::new(FieldAnchor::UserField(tf.id), Some(name)));
                    let params = function.parameters();
                    if params.is_empty() {
                        self.fields.register("", handle, FieldKind::Static);
                        continue;
                    }
                    for p in params.iter().filter(|p| !p.is_empty()) {
                        self.fields.register(p, Arc::clone(&handle), FieldKind::Native);
                    }
                }
                TextFieldKind::Database(column) if !column.is_empty() => {
                    let handle = FieldHandle::new(FieldAnchor::DatabaseField(tf.id), None);
                    self.fields.register(column, Arc::new(handle), FieldKind::Native);
                }
                _ => {}
            }
        }
    }

    // ──────────────────────────────────────────────
    // Persistence helpers
    // ──────────────────────────────────────────────

    pub(crate) fn descriptor_mut(&mut self) -> &mut FormDescriptor {
        let data = &self.data;
        self.descriptor.get_or_insert_with(|| {
            debug!("reading form description");
            FormDescriptor::load_from(data)
        })
    }

    /// The form description, read from the document on first access.
    pub fn form_description(&mut self) -> &FormDescriptor {
        self.descriptor_mut()
    }

    /// Replace the form description; `None` clears it.
    pub fn set_form_description(&mut self, root: Option<ConfigNode>) {
        self.descriptor_mut().replace(root);
        self.store_descriptor();
        self.doc.set_modified(true);
    }

    pub(crate) fn store_descriptor(&mut self) {
        self.descriptor_mut();
        let Some(desc) = &self.descriptor else {
            return;
        };
        if let Err(e) = desc.store(&mut self.data) {
            self.report(Diagnostic::with_cause("cannot store the form description", e));
        }
    }

    pub(crate) fn persist(&mut self, id: DataId, blob: Option<&str>) {
        let result = match blob {
            Some(b) => self.data.set(id, b),
            None => self.data.remove(id),
        };
        if let Err(e) = result {
            self.report(Diagnostic::with_cause(format!("cannot store {}", id), e));
        }
    }

    // ──────────────────────────────────────────────
    // Values
    // ──────────────────────────────────────────────

    /// Store the value of `id` (`None` removes it) and persist all values.
    /// The document is not re-rendered; see [`DocumentModel::update_fields`].
    pub fn set_value(&mut self, id: &str, value: Option<&str>) {
        self.values.set(id, value);
        let blob = self.values.to_blob();
        self.persist(DataId::FormValues, Some(&blob));
    }

    /// `value` through the transformation `trafo`, if any.
    ///
    /// With `known_values` the transformation reads each parameter from the
    /// value store; otherwise every parameter receives `value`.
    pub fn transformed_value(&self, value: &str, trafo: Option<&str>, known_values: bool) -> String {
        match trafo {
            None => value.to_owned(),
            Some(name) if known_values => self.functions.evaluate(name, &self.values),
            Some(name) => self.functions.evaluate_broadcast(name, value),
        }
    }

    /// What `handle` should show for `id` right now.
    fn expected_display(&self, id: &str, handle: &FieldHandle) -> String {
        if !self.preview_mode {
            return format!("<{}>", id);
        }
        let value = self.values.get_or_empty(id);
        let known_values = !matches!(handle.anchor(), FieldAnchor::Bookmark(_));
        self.transformed_value(value, handle.trafo(), known_values)
    }

    /// Render every field depending on `id`.
    ///
    /// In preview mode command fields get the value through their
    /// transformation fed with the value alone; native and static fields
    /// are transformed with all known values. Outside preview mode every
    /// field shows `<id>`.
    pub fn update_fields(&mut self, id: &str) {
        for handle in self.fields.fields_for(id) {
            let text = self.expected_display(id, &handle);
            handle.set_value(&mut self.doc, &text);
        }
        self.doc.set_modified(true);
    }

    pub fn update_all_fields(&mut self) {
        for id in self.fields.all_ids() {
            self.update_fields(&id);
        }
    }

    /// Reconcile the stored value of `id` with what its fields show.
    ///
    /// If no field was edited the stored value stands. If fields were
    /// edited, no field of the id is transformed and all edited fields agree,
    /// their common content is adopted. Anything else yields [`FISHY`].
    /// Vanished fields are ignored.
    pub fn preset_value(&self, id: &str) -> Option<String> {
        let stored = self.values.get(id)?;
        let mut all_untransformed = true;
        let mut edited: Option<String> = None;
        let mut edits_agree = true;
        for handle in self.fields.handles_for(id) {
            let Some(current) = handle.value(&self.doc) else {
                continue;
            };
            all_untransformed &= !handle.is_transformed();
            if current == self.expected_display(id, &handle) {
                continue;
            }
            match &edited {
                None => edited = Some(current),
                Some(v) if *v != current => edits_agree = false,
                Some(_) => {}
            }
        }
        let preset = match edited {
            None => stored.to_owned(),
            Some(v) if all_untransformed && edits_agree => v,
            Some(_) => FISHY.to_owned(),
        };
        trace!(id, preset = %preset, "preset value");
        Some(preset)
    }

    /// [`DocumentModel::preset_value`] for every stored id.
    pub fn preset_values(&self) -> BTreeMap<String, String> {
        self.values
            .ids()
            .filter_map(|id| self.preset_value(id).map(|v| (id.to_owned(), v)))
            .collect()
    }

    pub fn preview_mode(&self) -> bool {
        self.preview_mode
    }

    /// Switch between showing values and showing `<id>` placeholders.
    pub fn set_preview_mode(&mut self, preview_mode: bool) {
        self.preview_mode = preview_mode;
        self.update_all_fields();
        self.collect_garbage();
    }

    /// Put the cursor on a field of `id`: the first native field, else the
    /// first untransformed command field, else any command field.
    pub fn focus_form_field(&mut self, id: &str) {
        let native = self.fields.native_fields(id).first().cloned();
        let target = native.or_else(|| {
            let cmds = self.fields.command_fields(id);
            cmds.iter()
                .find(|h| !h.is_transformed())
                .or_else(|| cmds.first())
                .cloned()
        });
        if let Some(h) = target {
            h.focus(&mut self.doc);
        }
    }

    // ──────────────────────────────────────────────
    // Transformations
    // ──────────────────────────────────────────────

    /// Define a new document-local function with a generated name.
    ///
    /// `conf` is `Anything(DEFINITION)`; its own name is ignored.
    pub fn add_local_autofunction(&mut self, conf: &ConfigNode) -> Result<String, ModelError> {
        let name = self.functions.unique_name(AUTOFUNCTION_PREFIX);
        let definition = ConfigNode::with_children(name.clone(), conf.children().to_vec());
        let function = Function::parse(&definition, &self.functions)?;
        self.functions.add(name.clone(), function);
        self.descriptor_mut().add_function(definition);
        self.store_descriptor();
        debug!(trafo = %name, "added autofunction");
        Ok(name)
    }

    /// Replace `span` with a user field showing a new autofunction defined
    /// by `conf`. Parameters without a value are seeded with `""`.
    pub fn insert_trafo_field(&mut self, span: Span, conf: &ConfigNode) -> Result<String, ModelError> {
        let name = self.add_local_autofunction(conf)?;
        let master = user_field_master(&name);
        if !self.doc.field_masters().contains(&master) {
            self.doc.create_field_master(&master)?;
        }
        let at = self.doc.replace(span, "")?.start;
        self.doc
            .insert_text_field(at, TextFieldKind::User(master), "")?;
        self.collect_fields();

        for id in self.functions.parameters(&name) {
            if !self.values.contains(&id) {
                self.set_value(&id, Some(""));
            }
            self.update_fields(&id);
        }
        self.collect_garbage();
        Ok(name)
    }

    /// Replace the definition of the document-local function `name` with
    /// the children of `conf`.
    pub fn set_trafo(&mut self, name: &str, conf: &ConfigNode) -> Result<(), ModelError> {
        if self.descriptor_mut().function_definition(name).is_none() {
            return Err(ModelError::Unavailable {
                name: name.to_owned(),
            });
        }
        let definition = ConfigNode::with_children(name, conf.children().to_vec());
        let function = Function::parse(&definition, &self.functions)?;
        self.functions.add(name, function);
        if let Some(def) = self.descriptor_mut().function_definition_mut(name) {
            *def = definition;
        }
        self.store_descriptor();
        self.collect_fields();
        self.update_all_fields();
        Ok(())
    }

    /// The stored definition of the document-local function `name`.
    pub fn trafo_definition(&mut self, name: &str) -> Option<ConfigNode> {
        self.descriptor_mut().function_definition(name).cloned()
    }

    // ──────────────────────────────────────────────
    // Field insertion and reporting
    // ──────────────────────────────────────────────

    /// Replace `span` with a mail-merge field for `id`, seeding an empty
    /// value when `id` has none.
    pub fn insert_mail_merge_field(&mut self, id: &str, span: Span) -> Result<TextFieldId, ModelError> {
        let at = self.doc.replace(span, "")?.start;
        let content = if self.preview_mode {
            String::new()
        } else {
            format!("<{}>", id)
        };
        let field = self
            .doc
            .insert_text_field(at, TextFieldKind::Database(id.to_owned()), &content)?;
        if !self.values.contains(id) {
            self.set_value(id, Some(""));
        }
        let handle = FieldHandle::new(FieldAnchor::DatabaseField(field), None);
        self.fields.register(id, Arc::new(handle), FieldKind::Native);
        self.update_fields(id);
        Ok(field)
    }

    pub fn has_mail_merge_fields(&self) -> bool {
        self.doc
            .text_fields()
            .iter()
            .any(|f| matches!(f.kind, TextFieldKind::Database(_)))
    }

    /// Ids used by fields but absent from `schema`, sorted.
    pub fn referenced_field_ids_not_in_schema(&self, schema: &BTreeSet<String>) -> Vec<ReferencedFieldId> {
        self.fields
            .all_ids()
            .into_iter()
            .filter(|id| !schema.contains(id))
            .map(|id| {
                let transformed = self.fields.handles_for(&id).iter().any(|h| h.is_transformed());
                ReferencedFieldId { id, transformed }
            })
            .collect()
    }

    // ──────────────────────────────────────────────
    // Document type, print functions, mail merge
    // ──────────────────────────────────────────────

    pub fn doc_type(&self) -> Option<&str> {
        self.doc_type.as_deref()
    }

    /// Set and persist the document type; `None` removes it.
    pub fn set_type(&mut self, doc_type: Option<&str>) {
        self.doc_type = doc_type.map(str::to_owned);
        self.persist(DataId::SetType, doc_type);
    }

    pub fn is_form_document(&self) -> bool {
        self.doc_type
            .as_deref()
            .is_some_and(|t| t.eq_ignore_ascii_case(FORM_DOCUMENT))
    }

    pub fn print_functions(&self) -> &BTreeSet<String> {
        &self.print_functions
    }

    pub fn add_print_function(&mut self, name: &str) {
        self.print_functions.insert(name.to_owned());
        self.store_print_functions();
    }

    pub fn remove_print_function(&mut self, name: &str) {
        self.print_functions.remove(name);
        self.store_print_functions();
    }

    fn store_print_functions(&mut self) {
        let blob = print_functions_blob(&self.print_functions);
        self.persist(DataId::PrintFunction, blob.as_deref());
    }

    /// The `Seriendruck` section of the mail-merge blob; empty if there is
    /// none or it cannot be read.
    pub fn mailmerge_config(&self) -> ConfigNode {
        let empty = ConfigNode::new("Seriendruck");
        let Some(blob) = read_blob(&self.data, DataId::MailMerge) else {
            return empty;
        };
        let section = parse("Seriendruck", &blob)
            .and_then(|conf| conf.get("WM")?.get("Seriendruck").cloned());
        match section {
            Ok(s) => s,
            Err(e) => {
                error!(error = %e, "mail merge metadata is malformed");
                empty
            }
        }
    }

    /// Store the children of `conf` as `WM(Seriendruck(...))`, or delete the
    /// blob if there are none.
    pub fn set_mailmerge_config(&mut self, conf: &ConfigNode) {
        let section = ConfigNode::with_children("Seriendruck", conf.children().to_vec());
        if section.count() > 0 {
            let blob = ConfigNode::with_children("WM", vec![section]).to_conf_string();
            self.persist(DataId::MailMerge, Some(&blob));
        } else {
            self.persist(DataId::MailMerge, None);
        }
    }

    // ──────────────────────────────────────────────
    // Fragment overrides
    // ──────────────────────────────────────────────

    /// Register that fragment `frag_id` is replaced by `new_frag_id`.
    ///
    /// The first override of a fragment wins. An override whose target is
    /// itself overridden, or whose source is already a target, would form a
    /// chain and is rejected.
    pub fn set_override_frag(&mut self, frag_id: &str, new_frag_id: &str) -> Result<(), ModelError> {
        if self.override_frags.contains_key(new_frag_id) {
            return Err(ModelError::OverrideFragChain {
                frag_id: new_frag_id.to_owned(),
            });
        }
        if self.override_frags.values().any(|v| v == frag_id) {
            return Err(ModelError::OverrideFragChain {
                frag_id: frag_id.to_owned(),
            });
        }
        self.override_frags
            .entry(frag_id.to_owned())
            .or_insert_with(|| new_frag_id.to_owned());
        Ok(())
    }

    /// The fragment to use instead of `frag_id`; `frag_id` itself when it is
    /// not overridden.
    pub fn override_frag<'a>(&'a self, frag_id: &'a str) -> &'a str {
        self.override_frags
            .get(frag_id)
            .map(String::as_str)
            .unwrap_or(frag_id)
    }

    // ──────────────────────────────────────────────
    // Visibility and print blocks
    // ──────────────────────────────────────────────

    pub fn invisible_groups(&self) -> &BTreeSet<String> {
        &self.invisible_groups
    }

    /// Show or hide `group`. A group anchor is visible only if none of its
    /// groups is invisible.
    pub fn set_visible_state(&mut self, group: &str, visible: bool) {
        if visible {
            self.invisible_groups.remove(group);
        } else {
            self.invisible_groups.insert(group.to_owned());
        }
        let targets: Vec<_> = self
            .commands
            .iter()
            .filter_map(|(id, c)| match &c.kind {
                CommandKind::SetGroups { groups } => {
                    let shown = !groups.iter().any(|g| self.invisible_groups.contains(g));
                    Some((id, c.anchor.clone(), shown))
                }
                _ => None,
            })
            .collect();
        for (id, anchor, shown) in targets {
            self.commands.set_visible(id, shown);
            if let Err(e) = self.doc.set_anchor_visible(&anchor, shown) {
                trace!(anchor = %anchor, error = %e, "group anchor vanished");
            }
        }
    }

    /// Show or hide every print block of `kind`, and show or clear its
    /// highlight colour.
    pub fn set_print_blocks_props(&mut self, kind: PrintBlockKind, visible: bool, show_highlight: bool) {
        let blocks: Vec<_> = self
            .commands
            .iter()
            .filter_map(|(id, c)| match &c.kind {
                CommandKind::PrintBlock {
                    kind: k,
                    highlight_color,
                } if *k == kind => Some((id, c.anchor.clone(), *highlight_color)),
                _ => None,
            })
            .collect();
        for (id, anchor, color) in blocks {
            self.commands.set_visible(id, visible);
            if let Err(e) = self.doc.set_anchor_visible(&anchor, visible) {
                trace!(anchor = %anchor, error = %e, "print block anchor vanished");
                continue;
            }
            if let Some(c) = color {
                let shown = if show_highlight { Some(c) } else { None };
                if let Err(e) = self.doc.set_anchor_highlight(&anchor, shown) {
                    trace!(anchor = %anchor, error = %e, "print block anchor vanished");
                }
            }
        }
    }

    // ──────────────────────────────────────────────
    // Cleanup
    // ──────────────────────────────────────────────

    /// Turn the form into a plain document: drop form commands
    /// (`form`, `setGroups`, `insertFormValue`, `setType 'formDocument'`)
    /// and the form description and form values.
    pub fn de_form(&mut self) {
        for anchor in self.doc.anchors() {
            let Ok((_, kind)) = parse_command(&anchor.name) else {
                continue;
            };
            let kill = match &kind {
                CommandKind::Form | CommandKind::SetGroups { .. } | CommandKind::InsertFormValue { .. } => true,
                CommandKind::SetType { doc_type } => doc_type.eq_ignore_ascii_case(FORM_DOCUMENT),
                _ => false,
            };
            if kill {
                if let Err(e) = self.doc.remove_anchor(&anchor.name) {
                    error!(anchor = %anchor.name, error = %e, "cannot remove form command");
                }
            }
        }
        self.persist(DataId::FormDescription, None);
        self.persist(DataId::FormValues, None);
        self.descriptor = Some(FormDescriptor::new());
        self.values = ValueStore::new();
        self.commands.update(&self.doc);
        self.collect_fields();
    }

    /// Remove every anchor that does not carry a command.
    pub fn remove_non_wm_bookmarks(&mut self) -> usize {
        let mut removed = 0;
        for anchor in self.doc.anchors() {
            if is_command_anchor(&anchor.name) {
                continue;
            }
            match self.doc.remove_anchor(&anchor.name) {
                Ok(()) => removed += 1,
                Err(e) => error!(anchor = %anchor.name, error = %e, "cannot remove bookmark"),
            }
        }
        removed
    }
}

fn read_blob<S: PersistentData>(data: &S, id: DataId) -> Option<String> {
    match data.get(id) {
        Ok(blob) => blob,
        Err(e) => {
            error!(data_id = %id, error = %e, "cannot read persisted data");
            None
        }
    }
}
