//! Field handles and the registry mapping field ids to them.
//!
//! A logical field id may be shown in many places: inside `insertFormValue`
//! command anchors, in native database fields, or in user fields whose
//! master binds a transformation. Each place is one [`FieldHandle`].

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use tracing::trace;

use crate::host::{anchor_text, set_anchor_text, FocusTarget, Span, TextDocument, TextFieldId};

/// Where a handle's content lives in the host document.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FieldAnchor {
    /// Content covered by an `insertFormValue` command anchor.
    Bookmark(String),
    /// A user field bound to a transformation by its master name.
    UserField(TextFieldId),
    /// A mail-merge database field.
    DatabaseField(TextFieldId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldKind {
    /// Bound through a command anchor.
    Command,
    /// Bound through a native text field.
    Native,
    /// Transformed by a function with no parameters; has no id.
    Static,
}

/// One physical occurrence of a field.
///
/// Accessors never fail: if the host no longer has the anchor the call
/// is a no-op and getters return `None`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldHandle {
    anchor: FieldAnchor,
    trafo: Option<String>,
}

impl FieldHandle {
    pub fn new(anchor: FieldAnchor, trafo: Option<String>) -> Self {
        FieldHandle { anchor, trafo }
    }

    pub fn anchor(&self) -> &FieldAnchor {
        &self.anchor
    }

    pub fn trafo(&self) -> Option<&str> {
        self.trafo.as_deref()
    }

    pub fn is_transformed(&self) -> bool {
        self.trafo.is_some()
    }

    /// The displayed value, `None` if the anchor is gone.
    pub fn value(&self, doc: &dyn TextDocument) -> Option<String> {
        let result = match &self.anchor {
            FieldAnchor::Bookmark(name) => anchor_text(doc, name).ok(),
            FieldAnchor::UserField(id) | FieldAnchor::DatabaseField(id) => {
                doc.text_field(*id).map(|f| f.content)
            }
        };
        if result.is_none() {
            trace!(anchor = ?self.anchor, "reading a vanished field");
        }
        result
    }

    pub fn set_value(&self, doc: &mut dyn TextDocument, text: &str) {
        let result = match &self.anchor {
            FieldAnchor::Bookmark(name) => set_anchor_text(doc, name, text),
            FieldAnchor::UserField(id) | FieldAnchor::DatabaseField(id) => {
                doc.set_text_field_content(*id, text)
            }
        };
        if let Err(e) = result {
            trace!(anchor = ?self.anchor, error = %e, "ignoring write to a vanished field");
        }
    }

    pub fn focus(&self, doc: &mut dyn TextDocument) {
        let target = match &self.anchor {
            FieldAnchor::Bookmark(name) => FocusTarget::Anchor(name.clone()),
            FieldAnchor::UserField(id) | FieldAnchor::DatabaseField(id) => {
                FocusTarget::TextField(*id)
            }
        };
        if let Err(e) = doc.focus(target) {
            trace!(anchor = ?self.anchor, error = %e, "cannot focus a vanished field");
        }
    }

    pub fn is_stale(&self, doc: &dyn TextDocument) -> bool {
        self.span(doc).is_none()
    }

    /// Where the content sits now.
    pub fn span(&self, doc: &dyn TextDocument) -> Option<Span> {
        match &self.anchor {
            FieldAnchor::Bookmark(name) => doc.anchor_span(name),
            FieldAnchor::UserField(id) | FieldAnchor::DatabaseField(id) => doc
                .text_field(*id)
                .map(|f| Span::new(f.position, f.position + 1)),
        }
    }

    /// Removes the anchor and the content it shows, returning where the
    /// content was. `None` if the anchor was already gone.
    pub fn dispose(&self, doc: &mut dyn TextDocument) -> Option<usize> {
        let result = match &self.anchor {
            FieldAnchor::Bookmark(name) => doc.anchor_span(name).and_then(|span| {
                doc.replace(span, "").ok()?;
                doc.remove_anchor(name).ok()?;
                Some(span.start)
            }),
            FieldAnchor::UserField(id) | FieldAnchor::DatabaseField(id) => {
                doc.remove_text_field(*id).ok()
            }
        };
        if result.is_none() {
            trace!(anchor = ?self.anchor, "disposing a vanished field");
        }
        result
    }
}

// ──────────────────────────────────────────────
// Registry
// ──────────────────────────────────────────────

/// Field handles by id, partitioned by how they are bound.
///
/// A handle is registered in exactly one of the three collections. A user
/// field reading several ids is registered (as the same `Arc`) under each.
#[derive(Debug, Default, Clone)]
pub struct FieldRegistry {
    command_fields: BTreeMap<String, Vec<Arc<FieldHandle>>>,
    native_fields: BTreeMap<String, Vec<Arc<FieldHandle>>>,
    static_fields: Vec<Arc<FieldHandle>>,
}

impl FieldRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// `id` is ignored for [`FieldKind::Static`].
    pub fn register(&mut self, id: &str, handle: Arc<FieldHandle>, kind: FieldKind) {
        match kind {
            FieldKind::Command => self
                .command_fields
                .entry(id.to_owned())
                .or_default()
                .push(handle),
            FieldKind::Native => self
                .native_fields
                .entry(id.to_owned())
                .or_default()
                .push(handle),
            FieldKind::Static => self.static_fields.push(handle),
        }
    }

    pub fn unregister_all(&mut self) {
        self.command_fields.clear();
        self.native_fields.clear();
        self.static_fields.clear();
    }

    /// Everything to refresh when `id` changes: its command fields, then
    /// its native fields, then all static fields.
    pub fn fields_for(&self, id: &str) -> Vec<Arc<FieldHandle>> {
        let mut out = self.handles_for(id);
        out.extend(self.static_fields.iter().cloned());
        out
    }

    /// Handles bound to `id` itself: command fields first, then native ones.
    pub fn handles_for(&self, id: &str) -> Vec<Arc<FieldHandle>> {
        let mut out: Vec<Arc<FieldHandle>> = Vec::new();
        if let Some(v) = self.command_fields.get(id) {
            out.extend(v.iter().cloned());
        }
        if let Some(v) = self.native_fields.get(id) {
            out.extend(v.iter().cloned());
        }
        out
    }

    pub fn command_fields(&self, id: &str) -> &[Arc<FieldHandle>] {
        self.command_fields.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn native_fields(&self, id: &str) -> &[Arc<FieldHandle>] {
        self.native_fields.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn static_fields(&self) -> &[Arc<FieldHandle>] {
        &self.static_fields
    }

    pub fn all_ids(&self) -> BTreeSet<String> {
        self.command_fields
            .keys()
            .chain(self.native_fields.keys())
            .cloned()
            .collect()
    }

    pub fn contains_id(&self, id: &str) -> bool {
        self.command_fields.contains_key(id) || self.native_fields.contains_key(id)
    }

    /// Every distinct handle, each once.
    pub fn all_handles(&self) -> Vec<Arc<FieldHandle>> {
        let mut out: Vec<Arc<FieldHandle>> = Vec::new();
        let all = self
            .command_fields
            .values()
            .chain(self.native_fields.values())
            .flatten()
            .chain(self.static_fields.iter());
        for h in all {
            if !out.iter().any(|o| Arc::ptr_eq(o, h)) {
                out.push(Arc::clone(h));
            }
        }
        out
    }

    /// Names of all transformations used by any handle.
    pub fn used_trafos(&self) -> BTreeSet<String> {
        self.all_handles()
            .iter()
            .filter_map(|h| h.trafo().map(str::to_owned))
            .collect()
    }

    /// Pick the handle to focus or read from for `id`: the first
    /// untransformed one, else the first one.
    pub fn preferred(&self, id: &str) -> Option<Arc<FieldHandle>> {
        let handles = self.handles_for(id);
        handles
            .iter()
            .find(|h| !h.is_transformed())
            .or_else(|| handles.first())
            .cloned()
    }
}
