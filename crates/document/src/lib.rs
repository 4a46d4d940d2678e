//! formdoc-document: the form document model.
//!
//! A form document is a text document whose anchors carry commands
//! (`WM(CMD 'insertFormValue' ID 'Nachname')`) and whose native fields may be
//! bound to transformation functions. This crate interprets those commands,
//! keeps field values in sync with what the document shows, and persists
//! the derived state through [`formdoc_storage::PersistentData`].
//!
//! # Public API
//!
//! - [`TextDocument`] -- what the model needs from a host document
//! - [`MemoryDocument`] / [`DocumentFixture`] -- an in-memory host and its JSON form
//! - [`DocumentModel`] -- one open document: scanning, values, transformations,
//!   substitution and autofunction collection
//! - [`DocumentManager`] / [`EventQueue`] -- serialized access to open documents
//! - [`Dialog`] / [`rendezvous()`] -- waiting for a dialog with exactly one outcome

pub mod commands;
pub mod descriptor;
pub mod diagnostics;
pub mod dialog;
pub mod error;
pub mod events;
pub mod fields;
pub mod gc;
pub mod host;
pub mod manager;
pub mod memory;
pub mod model;
pub mod print;
pub mod substitution;
pub mod values;

pub use commands::{CommandKind, CommandTree, PrintBlockKind};
pub use descriptor::FormDescriptor;
pub use diagnostics::{CollectingSink, Diagnostic, DiagnosticSink, LogSink};
pub use dialog::{rendezvous, show_and_wait, Completion, Dialog, DialogOutcome};
pub use error::{DocumentError, ModelError};
pub use events::{DocumentEvent, EventQueue, QueueClosed};
pub use fields::{FieldAnchor, FieldHandle, FieldKind, FieldRegistry};
pub use gc::{GcSummary, AUTOFUNCTION_PREFIX};
pub use host::{Span, TextDocument, TextField, TextFieldId, TextFieldKind};
pub use manager::{DocumentManager, SharedModel};
pub use memory::{DocumentFixture, MemoryDocument, Segment};
pub use model::{DocumentModel, ReferencedFieldId};
pub use substitution::{parse_pattern, SubstitutionPart, SubstitutionSummary};
pub use values::{ValueStore, FISHY};
