use formdoc_core::ConfigError;
use formdoc_eval::FunctionError;
use formdoc_storage::StorageError;

use crate::host::TextFieldId;

/// Failures reported by a host document.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DocumentError {
    /// The anchor was deleted, typically by manual editing.
    #[error("anchor '{name}' does not exist")]
    AnchorNotFound { name: String },

    #[error("text field {id} does not exist")]
    TextFieldNotFound { id: TextFieldId },

    #[error("range {start}..{end} is outside the document (length {len})")]
    InvalidRange { start: usize, end: usize, len: usize },

    #[error("host error: {0}")]
    Host(String),
}

/// Failures of document model operations.
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    /// The named transformation is not a document-local function.
    #[error("transformation '{name}' is not available in this document")]
    Unavailable { name: String },

    /// An override target is itself overridden, or an overridden fragment
    /// is used as a target.
    #[error("fragment override chain at '{frag_id}'")]
    OverrideFragChain { frag_id: String },

    /// Transformed fields can only be renamed to exactly one other field.
    #[error("field '{id}' is transformed and can only be substituted 1-to-1")]
    NotOneToOne { id: String },

    #[error(transparent)]
    Document(#[from] DocumentError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Function(#[from] FunctionError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}
