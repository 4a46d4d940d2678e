//! The host document contract.
//!
//! A host document is a sequence of units (characters and atomic native text
//! fields) with named anchors marking spans of it. Offsets count units.
//! The model only talks to the host through [`TextDocument`]; every call may
//! fail because the user edited the document underneath us.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::DocumentError;

/// Half-open unit range `start..end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Span { start, end }
    }

    pub fn at(pos: usize) -> Self {
        Span {
            start: pos,
            end: pos,
        }
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }

    /// Whether `other` lies within this span. A collapsed span sitting on
    /// either boundary of a non-empty span is outside it, matching where
    /// text inserted at that point ends up.
    pub fn contains(&self, other: &Span) -> bool {
        if other.is_empty() && !self.is_empty() {
            return self.start < other.start && other.start < self.end;
        }
        self.start <= other.start && other.end <= self.end
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

/// A named marker over a span; anchor names are unique per document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Anchor {
    pub name: String,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TextFieldId(pub u64);

impl fmt::Display for TextFieldId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Native text field flavours the model understands.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextFieldKind {
    /// Shows the content of a user field master. The master's name is a
    /// command like `WM(FUNCTION 'Name')` binding it to a transformation.
    User(String),
    /// Mail-merge field showing a data source column.
    Database(String),
    /// Anything else; carries the field's hint text.
    Input(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextField {
    pub id: TextFieldId,
    pub kind: TextFieldKind,
    pub content: String,
    pub position: usize,
}

/// What to put the cursor on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FocusTarget {
    Anchor(String),
    TextField(TextFieldId),
}

pub trait TextDocument: Send {
    // ── Anchors ─────────────────────────────────────────────────────────

    /// All anchors in document order (by start, then by name).
    fn anchors(&self) -> Vec<Anchor>;

    fn anchor_span(&self, name: &str) -> Option<Span>;

    /// Creates an anchor over `span`. If `name` is taken a numeric suffix is
    /// appended; the name actually used is returned.
    fn insert_anchor(&mut self, name: &str, span: Span) -> Result<String, DocumentError>;

    /// Moves an existing anchor onto `span`.
    fn set_anchor_span(&mut self, name: &str, span: Span) -> Result<(), DocumentError>;

    /// Removes the anchor, keeping the content it covered.
    fn remove_anchor(&mut self, name: &str) -> Result<(), DocumentError>;

    fn set_anchor_visible(&mut self, name: &str, visible: bool) -> Result<(), DocumentError>;

    fn anchor_visible(&self, name: &str) -> Option<bool>;

    /// Background colour (RGB) for the anchored content, `None` to clear.
    fn set_anchor_highlight(&mut self, name: &str, color: Option<u32>)
        -> Result<(), DocumentError>;

    // ── Text ────────────────────────────────────────────────────────────

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Plain text of `span`; native fields contribute their content.
    fn text_in(&self, span: Span) -> Result<String, DocumentError>;

    /// Replaces `span` with `text` and returns the span of the new text.
    /// Anchors that contain `span` grow or shrink with it. Anchors starting
    /// at an insertion point move behind the new text; anchors collapsed
    /// exactly there stay in front of it.
    fn replace(&mut self, span: Span, text: &str) -> Result<Span, DocumentError>;

    // ── Native text fields ──────────────────────────────────────────────

    fn text_fields(&self) -> Vec<TextField>;

    fn text_field(&self, id: TextFieldId) -> Option<TextField>;

    fn set_text_field_content(&mut self, id: TextFieldId, content: &str)
        -> Result<(), DocumentError>;

    fn insert_text_field(
        &mut self,
        at: usize,
        kind: TextFieldKind,
        content: &str,
    ) -> Result<TextFieldId, DocumentError>;

    /// Removes the field and returns the position it occupied.
    fn remove_text_field(&mut self, id: TextFieldId) -> Result<usize, DocumentError>;

    /// Names of the user field masters present in the document.
    fn field_masters(&self) -> Vec<String>;

    fn create_field_master(&mut self, name: &str) -> Result<(), DocumentError>;

    /// Removes the master and every user field showing it.
    fn dispose_field_master(&mut self, name: &str) -> Result<(), DocumentError>;

    // ── Frame state ─────────────────────────────────────────────────────

    fn focus(&mut self, target: FocusTarget) -> Result<(), DocumentError>;

    fn is_modified(&self) -> bool;

    fn set_modified(&mut self, modified: bool);
}

/// Text covered by an anchor.
pub fn anchor_text(doc: &dyn TextDocument, name: &str) -> Result<String, DocumentError> {
    let span = doc
        .anchor_span(name)
        .ok_or_else(|| DocumentError::AnchorNotFound {
            name: name.to_owned(),
        })?;
    doc.text_in(span)
}

/// Replace the text covered by an anchor; the anchor then covers exactly `text`.
pub fn set_anchor_text(
    doc: &mut dyn TextDocument,
    name: &str,
    text: &str,
) -> Result<(), DocumentError> {
    let span = doc
        .anchor_span(name)
        .ok_or_else(|| DocumentError::AnchorNotFound {
            name: name.to_owned(),
        })?;
    let new = doc.replace(span, text)?;
    doc.set_anchor_span(name, new)
}
