//! In-memory host document.
//!
//! Backs the CLI and the tests. The JSON fixture format nests anchors
//! around the content they cover:
//!
//! ```json
//! {
//!   "content": [
//!     {"text": "Sehr geehrte(r) "},
//!     {"bookmark": {"name": "WM(CMD 'insertFormValue' ID 'Nachname')",
//!                   "content": [{"text": "Muster"}]}},
//!     {"field": {"kind": {"database": "Vorname"}, "content": "Erika"}}
//!   ],
//!   "data": {"WollMuxFormularwerte": "WM(Formularwerte((ID 'Nachname' VALUE 'Muster')))"}
//! }
//! ```

use std::collections::{BTreeMap, BTreeSet};

use formdoc_storage::MemoryStore;
use serde::{Deserialize, Serialize};
use tracing::{trace, warn};

use crate::error::DocumentError;
use crate::host::{Anchor, FocusTarget, Span, TextDocument, TextField, TextFieldId, TextFieldKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Unit {
    Char(char),
    Field(TextFieldId),
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Bookmark {
    span: Span,
    visible: bool,
    highlight: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct FieldState {
    kind: TextFieldKind,
    content: String,
}

#[derive(Debug, Clone, Default)]
pub struct MemoryDocument {
    units: Vec<Unit>,
    bookmarks: BTreeMap<String, Bookmark>,
    fields: BTreeMap<TextFieldId, FieldState>,
    masters: BTreeSet<String>,
    next_field: u64,
    modified: bool,
    focus: Option<FocusTarget>,
}

// ──────────────────────────────────────────────
// Fixture format
// ──────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Segment {
    Text(String),
    Field {
        kind: TextFieldKind,
        #[serde(default)]
        content: String,
    },
    Bookmark {
        name: String,
        #[serde(default)]
        content: Vec<Segment>,
        #[serde(default = "default_visible", skip_serializing_if = "is_visible")]
        visible: bool,
    },
}

fn default_visible() -> bool {
    true
}

fn is_visible(v: &bool) -> bool {
    *v
}

/// A document plus its persisted blobs, as stored on disk.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentFixture {
    #[serde(default)]
    pub content: Vec<Segment>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub masters: Vec<String>,
    #[serde(default)]
    pub data: MemoryStore,
    #[serde(default)]
    pub modified: bool,
}

impl DocumentFixture {
    pub fn into_parts(self) -> Result<(MemoryDocument, MemoryStore), DocumentError> {
        let mut doc = MemoryDocument::from_segments(&self.content)?;
        for m in &self.masters {
            doc.masters.insert(m.clone());
        }
        doc.modified = self.modified;
        Ok((doc, self.data))
    }

    pub fn from_parts(doc: &MemoryDocument, data: &MemoryStore) -> Self {
        DocumentFixture {
            content: doc.to_segments(),
            masters: doc.masters.iter().cloned().collect(),
            data: data.clone(),
            modified: doc.modified,
        }
    }
}

// ──────────────────────────────────────────────
// MemoryDocument
// ──────────────────────────────────────────────

impl MemoryDocument {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_text(text: &str) -> Self {
        MemoryDocument {
            units: text.chars().map(Unit::Char).collect(),
            ..Self::default()
        }
    }

    pub fn from_segments(segments: &[Segment]) -> Result<Self, DocumentError> {
        let mut doc = MemoryDocument::new();
        doc.load_segments(segments)?;
        Ok(doc)
    }

    fn load_segments(&mut self, segments: &[Segment]) -> Result<(), DocumentError> {
        for seg in segments {
            match seg {
                Segment::Text(t) => self.units.extend(t.chars().map(Unit::Char)),
                Segment::Field { kind, content } => {
                    let id = self.alloc_field(kind.clone(), content);
                    self.units.push(Unit::Field(id));
                }
                Segment::Bookmark {
                    name,
                    content,
                    visible,
                } => {
                    let start = self.units.len();
                    self.load_segments(content)?;
                    let end = self.units.len();
                    if self.bookmarks.contains_key(name) {
                        return Err(DocumentError::Host(format!(
                            "duplicate anchor name '{}'",
                            name
                        )));
                    }
                    self.bookmarks.insert(
                        name.clone(),
                        Bookmark {
                            span: Span::new(start, end),
                            visible: *visible,
                            highlight: None,
                        },
                    );
                }
            }
        }
        Ok(())
    }

    pub fn to_segments(&self) -> Vec<Segment> {
        let mut list: Vec<(&String, &Bookmark)> = self.bookmarks.iter().collect();
        list.sort_by(|a, b| {
            (a.1.span.start, std::cmp::Reverse(a.1.span.end), a.0).cmp(&(
                b.1.span.start,
                std::cmp::Reverse(b.1.span.end),
                b.0,
            ))
        });
        self.build_segments(&list, 0, self.units.len())
    }

    fn build_segments(&self, list: &[(&String, &Bookmark)], start: usize, end: usize) -> Vec<Segment> {
        let mut out = Vec::new();
        let mut pos = start;
        let mut i = 0;
        while i < list.len() {
            let (name, bm) = list[i];
            let bs = bm.span.start.clamp(pos, end);
            let be = bm.span.end.min(end).max(bs);
            if be < bm.span.end {
                warn!(anchor = %name, "anchor overlaps its enclosing anchor; clipped in fixture");
            }
            out.extend(self.unit_segments(pos, bs));
            let mut j = i + 1;
            while j < list.len() && list[j].1.span.start < be {
                j += 1;
            }
            out.push(Segment::Bookmark {
                name: name.clone(),
                content: self.build_segments(&list[i + 1..j], bs, be),
                visible: bm.visible,
            });
            pos = be;
            i = j;
        }
        out.extend(self.unit_segments(pos, end));
        out
    }

    fn unit_segments(&self, start: usize, end: usize) -> Vec<Segment> {
        let mut out = Vec::new();
        let mut text = String::new();
        for unit in &self.units[start.min(end)..end] {
            match unit {
                Unit::Char(c) => text.push(*c),
                Unit::Field(id) => {
                    if !text.is_empty() {
                        out.push(Segment::Text(std::mem::take(&mut text)));
                    }
                    if let Some(f) = self.fields.get(id) {
                        out.push(Segment::Field {
                            kind: f.kind.clone(),
                            content: f.content.clone(),
                        });
                    }
                }
            }
        }
        if !text.is_empty() {
            out.push(Segment::Text(text));
        }
        out
    }

    /// Plain text of the whole document.
    pub fn text(&self) -> String {
        self.render(0, self.units.len())
    }

    /// Where the cursor was last put.
    pub fn focused(&self) -> Option<&FocusTarget> {
        self.focus.as_ref()
    }

    pub fn anchor_highlight(&self, name: &str) -> Option<u32> {
        self.bookmarks.get(name).and_then(|b| b.highlight)
    }

    fn render(&self, start: usize, end: usize) -> String {
        let mut out = String::new();
        for unit in &self.units[start..end] {
            match unit {
                Unit::Char(c) => out.push(*c),
                Unit::Field(id) => {
                    if let Some(f) = self.fields.get(id) {
                        out.push_str(&f.content);
                    }
                }
            }
        }
        out
    }

    fn alloc_field(&mut self, kind: TextFieldKind, content: &str) -> TextFieldId {
        self.next_field += 1;
        let id = TextFieldId(self.next_field);
        if let TextFieldKind::User(master) = &kind {
            self.masters.insert(master.clone());
        }
        self.fields.insert(
            id,
            FieldState {
                kind,
                content: content.to_owned(),
            },
        );
        id
    }

    fn check_span(&self, span: Span) -> Result<(), DocumentError> {
        if span.start > span.end || span.end > self.units.len() {
            return Err(DocumentError::InvalidRange {
                start: span.start,
                end: span.end,
                len: self.units.len(),
            });
        }
        Ok(())
    }

    fn position_of(&self, id: TextFieldId) -> Option<usize> {
        self.units.iter().position(|u| *u == Unit::Field(id))
    }

    /// Replace the units of `span` with `new`, keeping anchors consistent.
    fn splice(&mut self, span: Span, new: Vec<Unit>) -> Result<Span, DocumentError> {
        self.check_span(span)?;
        let n = new.len();
        let removed: Vec<Unit> = self.units.splice(span.start..span.end, new).collect();
        for unit in removed {
            if let Unit::Field(id) = unit {
                self.fields.remove(&id);
            }
        }
        for bm in self.bookmarks.values_mut() {
            bm.span = shift_span(bm.span, span, n);
        }
        self.modified = true;
        Ok(Span::new(span.start, span.start + n))
    }
}

/// Where an anchor at `s` ends up after `edited` is replaced by `n` units.
fn shift_span(s: Span, edited: Span, n: usize) -> Span {
    let removed = edited.len();
    if edited.is_empty() {
        let p = edited.start;
        if s.is_empty() && s.start == p {
            return s;
        }
        if s.start < p && p < s.end {
            return Span::new(s.start, s.end + n);
        }
        let start = if s.start >= p { s.start + n } else { s.start };
        let end = if s.end > p { s.end + n } else { s.end };
        return Span::new(start, end);
    }
    if s.contains(&edited) {
        return Span::new(s.start, s.end - removed + n);
    }
    let map = |x: usize| {
        if x <= edited.start {
            x
        } else if x >= edited.end {
            x - removed + n
        } else {
            edited.start
        }
    };
    Span::new(map(s.start), map(s.end))
}

impl TextDocument for MemoryDocument {
    fn anchors(&self) -> Vec<Anchor> {
        let mut out: Vec<Anchor> = self
            .bookmarks
            .iter()
            .map(|(name, b)| Anchor {
                name: name.clone(),
                span: b.span,
            })
            .collect();
        out.sort_by(|a, b| (a.span.start, &a.name).cmp(&(b.span.start, &b.name)));
        out
    }

    fn anchor_span(&self, name: &str) -> Option<Span> {
        self.bookmarks.get(name).map(|b| b.span)
    }

    fn insert_anchor(&mut self, name: &str, span: Span) -> Result<String, DocumentError> {
        self.check_span(span)?;
        let mut actual = name.to_owned();
        let mut suffix = 0u32;
        while self.bookmarks.contains_key(&actual) {
            suffix += 1;
            actual = format!("{} {}", name, suffix);
        }
        trace!(anchor = %actual, %span, "insert anchor");
        self.bookmarks.insert(
            actual.clone(),
            Bookmark {
                span,
                visible: true,
                highlight: None,
            },
        );
        self.modified = true;
        Ok(actual)
    }

    fn set_anchor_span(&mut self, name: &str, span: Span) -> Result<(), DocumentError> {
        self.check_span(span)?;
        let bm = self
            .bookmarks
            .get_mut(name)
            .ok_or_else(|| DocumentError::AnchorNotFound {
                name: name.to_owned(),
            })?;
        bm.span = span;
        Ok(())
    }

    fn remove_anchor(&mut self, name: &str) -> Result<(), DocumentError> {
        match self.bookmarks.remove(name) {
            Some(_) => {
                self.modified = true;
                Ok(())
            }
            None => Err(DocumentError::AnchorNotFound {
                name: name.to_owned(),
            }),
        }
    }

    fn set_anchor_visible(&mut self, name: &str, visible: bool) -> Result<(), DocumentError> {
        let bm = self
            .bookmarks
            .get_mut(name)
            .ok_or_else(|| DocumentError::AnchorNotFound {
                name: name.to_owned(),
            })?;
        bm.visible = visible;
        Ok(())
    }

    fn anchor_visible(&self, name: &str) -> Option<bool> {
        self.bookmarks.get(name).map(|b| b.visible)
    }

    fn set_anchor_highlight(
        &mut self,
        name: &str,
        color: Option<u32>,
    ) -> Result<(), DocumentError> {
        let bm = self
            .bookmarks
            .get_mut(name)
            .ok_or_else(|| DocumentError::AnchorNotFound {
                name: name.to_owned(),
            })?;
        bm.highlight = color;
        Ok(())
    }

    fn len(&self) -> usize {
        self.units.len()
    }

    fn text_in(&self, span: Span) -> Result<String, DocumentError> {
        self.check_span(span)?;
        Ok(self.render(span.start, span.end))
    }

    fn replace(&mut self, span: Span, text: &str) -> Result<Span, DocumentError> {
        self.splice(span, text.chars().map(Unit::Char).collect())
    }

    fn text_fields(&self) -> Vec<TextField> {
        self.units
            .iter()
            .enumerate()
            .filter_map(|(pos, u)| match u {
                Unit::Field(id) => self.fields.get(id).map(|f| TextField {
                    id: *id,
                    kind: f.kind.clone(),
                    content: f.content.clone(),
                    position: pos,
                }),
                Unit::Char(_) => None,
            })
            .collect()
    }

    fn text_field(&self, id: TextFieldId) -> Option<TextField> {
        let f = self.fields.get(&id)?;
        Some(TextField {
            id,
            kind: f.kind.clone(),
            content: f.content.clone(),
            position: self.position_of(id)?,
        })
    }

    fn set_text_field_content(
        &mut self,
        id: TextFieldId,
        content: &str,
    ) -> Result<(), DocumentError> {
        let f = self
            .fields
            .get_mut(&id)
            .ok_or(DocumentError::TextFieldNotFound { id })?;
        if f.content != content {
            f.content = content.to_owned();
            self.modified = true;
        }
        Ok(())
    }

    fn insert_text_field(
        &mut self,
        at: usize,
        kind: TextFieldKind,
        content: &str,
    ) -> Result<TextFieldId, DocumentError> {
        self.check_span(Span::at(at))?;
        let id = self.alloc_field(kind, content);
        self.splice(Span::at(at), vec![Unit::Field(id)])?;
        Ok(id)
    }

    fn remove_text_field(&mut self, id: TextFieldId) -> Result<usize, DocumentError> {
        let pos = self
            .position_of(id)
            .ok_or(DocumentError::TextFieldNotFound { id })?;
        self.splice(Span::new(pos, pos + 1), Vec::new())?;
        Ok(pos)
    }

    fn field_masters(&self) -> Vec<String> {
        self.masters.iter().cloned().collect()
    }

    fn create_field_master(&mut self, name: &str) -> Result<(), DocumentError> {
        self.masters.insert(name.to_owned());
        Ok(())
    }

    fn dispose_field_master(&mut self, name: &str) -> Result<(), DocumentError> {
        if !self.masters.remove(name) {
            return Err(DocumentError::Host(format!(
                "field master '{}' does not exist",
                name
            )));
        }
        let dependent: Vec<TextFieldId> = self
            .fields
            .iter()
            .filter(|(_, f)| matches!(&f.kind, TextFieldKind::User(m) if m == name))
            .map(|(id, _)| *id)
            .collect();
        for id in dependent {
            self.remove_text_field(id)?;
        }
        Ok(())
    }

    fn focus(&mut self, target: FocusTarget) -> Result<(), DocumentError> {
        match &target {
            FocusTarget::Anchor(name) if !self.bookmarks.contains_key(name) => {
                return Err(DocumentError::AnchorNotFound { name: name.clone() })
            }
            FocusTarget::TextField(id) if !self.fields.contains_key(id) => {
                return Err(DocumentError::TextFieldNotFound { id: *id })
            }
            _ => {}
        }
        self.focus = Some(target);
        Ok(())
    }

    fn is_modified(&self) -> bool {
        self.modified
    }

    fn set_modified(&mut self, modified: bool) {
        self.modified = modified;
    }
}
