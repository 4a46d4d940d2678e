/// All errors that can be returned by a [`crate::PersistentData`] implementation.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StorageError {
    /// The host refused or failed to read or write a blob.
    #[error("storage backend error: {0}")]
    Backend(String),

    /// A blob could not be encoded or decoded.
    #[error("serialization error: {0}")]
    Serialization(String),
}
